use std::time::Duration;

use tokio::time::Instant;

/// Row geometry for a uniform-height virtual list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLayout {
    /// Uniform row height in pixels
    pub item_height: f64,
    /// Extra rows rendered above and below the visible span
    pub buffer: usize,
    /// Constant leading/trailing padding inside the scroll container
    pub padding: f64,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            item_height: 100.0,
            buffer: 2,
            padding: 0.0,
        }
    }
}

/// The subrange of rows to render for one scroll position
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// First row index to render (inclusive)
    pub start: usize,
    /// One past the last row index to render
    pub end: usize,
    /// Absolute top offset for each row in `start..end`
    pub offsets: Vec<f64>,
    /// Height of the full scrollable content
    pub total_height: f64,
}

/// Row height that is safe to divide by
///
/// A zero or negative configured height falls back to the default, the
/// same rule `Viewport::sample_item_height` applies to measurements.
fn effective_item_height(layout: &RowLayout) -> f64 {
    if layout.item_height > 0.0 {
        layout.item_height
    } else {
        RowLayout::default().item_height
    }
}

/// Absolute top offset of one row
pub fn offset_of(index: usize, layout: &RowLayout) -> f64 {
    index as f64 * effective_item_height(layout) + layout.padding
}

/// Compute the window of rows to render
///
/// Guarantees `0 <= start <= end <= item_count` and
/// `end - start <= ceil(container_height / item_height) + 2 * buffer` for
/// any scroll offset, including overscroll past the end.
pub fn compute_window(
    item_count: usize,
    scroll_offset: f64,
    container_height: f64,
    layout: &RowLayout,
) -> Window {
    if item_count == 0 {
        return Window {
            start: 0,
            end: 0,
            offsets: Vec::new(),
            total_height: 2.0 * layout.padding,
        };
    }

    let item_height = effective_item_height(layout);

    let first_visible = ((scroll_offset - layout.padding) / item_height).floor();
    let start = if first_visible <= layout.buffer as f64 {
        0
    } else {
        (first_visible as usize - layout.buffer).min(item_count)
    };

    let visible_count = (container_height / item_height).ceil() as usize + 2 * layout.buffer;
    let end = item_count.min(start.saturating_add(visible_count));

    Window {
        start,
        end,
        offsets: (start..end).map(|i| offset_of(i, layout)).collect(),
        total_height: item_count as f64 * item_height + 2.0 * layout.padding,
    }
}

/// Default frame interval for scroll throttling (~60 fps)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Scroll/measure state for one virtual list
///
/// The host UI reports events into this: container height from its resize
/// observation, the first rendered row's real height once after layout, and
/// scroll offsets as they happen. Scroll updates are accepted at most once
/// per frame interval; the newest rejected offset is kept and applied on
/// the next accepted tick, so the list always settles on the latest
/// position.
#[derive(Debug)]
pub struct Viewport {
    layout: RowLayout,
    sampled_height: Option<f64>,
    container_height: f64,
    scroll_offset: f64,
    pending_offset: Option<f64>,
    last_accept: Option<Instant>,
    frame_interval: Duration,
}

impl Viewport {
    pub fn new(layout: RowLayout) -> Self {
        Self {
            layout,
            sampled_height: None,
            container_height: 0.0,
            scroll_offset: 0.0,
            pending_offset: None,
            last_accept: None,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Effective row geometry, with the measured height once sampled
    pub fn layout(&self) -> RowLayout {
        RowLayout {
            item_height: self.sampled_height.unwrap_or(self.layout.item_height),
            ..self.layout
        }
    }

    /// Record the container's measured height (resize observation)
    pub fn set_container_height(&mut self, height: f64) {
        self.container_height = height.max(0.0);
    }

    /// Record the first rendered row's real height
    ///
    /// Accepted once; zero or negative measurements are ignored and the
    /// configured height stays in effect.
    pub fn sample_item_height(&mut self, measured: f64) {
        if self.sampled_height.is_none() && measured > 0.0 {
            self.sampled_height = Some(measured);
        }
    }

    /// Report a scroll event; returns whether it was applied this frame
    pub fn set_scroll_offset(&mut self, offset: f64) -> bool {
        let now = Instant::now();
        let due = self
            .last_accept
            .map_or(true, |last| now.duration_since(last) >= self.frame_interval);

        if due {
            self.scroll_offset = offset.max(0.0);
            self.pending_offset = None;
            self.last_accept = Some(now);
            true
        } else {
            self.pending_offset = Some(offset.max(0.0));
            false
        }
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Compute the current window, first applying a coalesced scroll
    /// update if its frame has arrived
    pub fn window(&mut self, item_count: usize) -> Window {
        if let Some(pending) = self.pending_offset {
            let now = Instant::now();
            let due = self
                .last_accept
                .map_or(true, |last| now.duration_since(last) >= self.frame_interval);
            if due {
                self.scroll_offset = pending;
                self.pending_offset = None;
                self.last_accept = Some(now);
            }
        }

        let layout = self.layout();
        compute_window(item_count, self.scroll_offset, self.container_height, &layout)
    }
}
