use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::api::SpecimenApi;
use crate::error::Result;
use crate::fontface::FontFaceLoader;
use crate::resource::Resource;
use crate::types::{FontFamilySummary, FontStyleEntry};
use crate::window::{RowLayout, Viewport, Window};

/// Observable state of the catalogue view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseState {
    Idle,
    Loading,
    Error(String),
    Empty,
    Ready,
    Searching,
}

/// Default quiet interval for the search filter
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// Delay before a visible row's face load fires
///
/// Rows that scroll out of the window before the delay elapses are
/// cancelled, so fast scrolling never loads faces it will not show.
pub const FACE_LOAD_DELAY: Duration = Duration::from_millis(50);

/// List state shared with the debounced search task
struct ListState {
    state: RwLock<BrowseState>,
    summaries: RwLock<Vec<FontFamilySummary>>,
    filtered: RwLock<Vec<FontFamilySummary>>,
    search_generation: AtomicU64,
}

/// Searchable, virtualized catalogue of font families
///
/// Owns the representatives snapshot, the search filter, the scroll
/// viewport, the per-family detail sub-resource, and the deferred face
/// loading for visible rows. A host UI renders from `state`,
/// `visible_rows` and `selected`, and reports input events back in.
pub struct CatalogueBrowser {
    api: Arc<dyn SpecimenApi>,
    loader: Arc<FontFaceLoader>,
    list: Arc<ListState>,
    viewport: Mutex<Viewport>,
    detail: RwLock<Option<(String, Resource<Vec<FontStyleEntry>>)>>,
    detail_cache: Mutex<HashMap<String, Vec<FontStyleEntry>>>,
    search_debounce: Duration,
    pending_search: Mutex<Option<JoinHandle<()>>>,
    face_delay: Duration,
    face_tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl CatalogueBrowser {
    pub fn new(api: Arc<dyn SpecimenApi>, loader: Arc<FontFaceLoader>) -> Self {
        Self::with_layout(api, loader, RowLayout::default())
    }

    pub fn with_layout(
        api: Arc<dyn SpecimenApi>,
        loader: Arc<FontFaceLoader>,
        layout: RowLayout,
    ) -> Self {
        Self {
            api,
            loader,
            list: Arc::new(ListState {
                state: RwLock::new(BrowseState::Idle),
                summaries: RwLock::new(Vec::new()),
                filtered: RwLock::new(Vec::new()),
                search_generation: AtomicU64::new(0),
            }),
            viewport: Mutex::new(Viewport::new(layout)),
            detail: RwLock::new(None),
            detail_cache: Mutex::new(HashMap::new()),
            search_debounce: SEARCH_DEBOUNCE,
            pending_search: Mutex::new(None),
            face_delay: FACE_LOAD_DELAY,
            face_tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the search quiet interval (100-300 ms is sensible)
    pub fn search_debounce(mut self, interval: Duration) -> Self {
        self.search_debounce = interval;
        self
    }

    /// Override the deferred face-load delay
    pub fn face_delay(mut self, delay: Duration) -> Self {
        self.face_delay = delay;
        self
    }

    pub async fn state(&self) -> BrowseState {
        self.list.state.read().await.clone()
    }

    /// Fetch the catalogue: `Idle -> Loading -> Error | Empty | Ready`
    pub async fn open(&self) {
        *self.list.state.write().await = BrowseState::Loading;

        match self.api.list_representatives().await {
            Err(e) => {
                *self.list.state.write().await = BrowseState::Error(e.to_string());
            }
            Ok(families) if families.is_empty() => {
                *self.list.state.write().await = BrowseState::Empty;
            }
            Ok(families) => {
                *self.list.summaries.write().await = families.clone();
                *self.list.filtered.write().await = families;
                *self.list.state.write().await = BrowseState::Ready;
            }
        }
    }

    /// Feed one search input event, debounced against the in-memory list
    ///
    /// `Ready -> Searching -> Ready`; no network involved. A cleared query
    /// restores the full snapshot immediately.
    pub async fn set_query(&self, query: &str) {
        {
            let state = self.list.state.read().await;
            if !matches!(*state, BrowseState::Ready | BrowseState::Searching) {
                return;
            }
        }

        if let Some(handle) = self.pending_search.lock().await.take() {
            handle.abort();
        }
        let gen = self.list.search_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let term = query.trim().to_lowercase();
        if term.is_empty() {
            let snapshot = self.list.summaries.read().await.clone();
            *self.list.filtered.write().await = snapshot;
            *self.list.state.write().await = BrowseState::Ready;
            return;
        }

        *self.list.state.write().await = BrowseState::Searching;

        let list = Arc::clone(&self.list);
        let debounce = self.search_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if list.search_generation.load(Ordering::SeqCst) != gen {
                return;
            }

            let matches: Vec<FontFamilySummary> = list
                .summaries
                .read()
                .await
                .iter()
                .filter(|family| family.name.to_lowercase().contains(&term))
                .cloned()
                .collect();

            if list.search_generation.load(Ordering::SeqCst) == gen {
                *list.filtered.write().await = matches;
                *list.state.write().await = BrowseState::Ready;
            }
        });
        *self.pending_search.lock().await = Some(handle);
    }

    /// Families matching the active filter
    pub async fn families(&self) -> Vec<FontFamilySummary> {
        self.list.filtered.read().await.clone()
    }

    /// Report the scroll container's measured height
    pub async fn handle_resize(&self, height: f64) {
        self.viewport.lock().await.set_container_height(height);
    }

    /// Report a scroll event (frame-throttled inside the viewport)
    pub async fn handle_scroll(&self, offset: f64) {
        self.viewport.lock().await.set_scroll_offset(offset);
    }

    /// Report the first rendered row's real height
    pub async fn sample_row_height(&self, measured: f64) {
        self.viewport.lock().await.sample_item_height(measured);
    }

    /// The window of rows to render at the current scroll position
    pub async fn visible_rows(&self) -> (Window, Vec<FontFamilySummary>) {
        let filtered = self.list.filtered.read().await;
        let window = self.viewport.lock().await.window(filtered.len());
        let rows = filtered[window.start..window.end].to_vec();
        (window, rows)
    }

    /// Schedule deferred face loads for the currently visible rows
    ///
    /// Call after every window change. Pending loads for rows that left
    /// the window are aborted before their delay fires.
    pub async fn schedule_face_loads(&self) {
        let (_, rows) = self.visible_rows().await;
        let visible: HashSet<String> = rows.into_iter().map(|family| family.name).collect();

        let mut tasks = self.face_tasks.lock().await;
        tasks.retain(|family, handle| {
            if visible.contains(family) {
                true
            } else {
                handle.abort();
                false
            }
        });

        for family in visible {
            if tasks.contains_key(&family) || self.loader.is_loaded(&family).await {
                continue;
            }

            let loader = Arc::clone(&self.loader);
            let delay = self.face_delay;
            let name = family.clone();
            tasks.insert(
                family,
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    loader.ensure_loaded(&name).await;
                }),
            );
        }
    }

    /// Select a family, driving the detail sub-resource through its own
    /// `Pending -> Ready | Failed` cycle
    ///
    /// Styles are cached per family for the session; reselecting serves
    /// the cache without refetching. A slow response for a family the user
    /// has already navigated away from is discarded.
    pub async fn select_family(&self, id: &str) {
        if let Some(styles) = self.detail_cache.lock().await.get(id).cloned() {
            *self.detail.write().await = Some((id.to_string(), Resource::Ready(styles)));
            return;
        }

        *self.detail.write().await = Some((id.to_string(), Resource::Pending));

        let outcome = self.api.list_family(id).await;

        let mut detail = self.detail.write().await;
        let still_selected = detail
            .as_ref()
            .map_or(false, |(selected, _)| selected == id);
        if !still_selected {
            return;
        }

        match outcome {
            Ok(styles) => {
                self.detail_cache
                    .lock()
                    .await
                    .insert(id.to_string(), styles.clone());
                *detail = Some((id.to_string(), Resource::Ready(styles)));
            }
            Err(e) => {
                *detail = Some((id.to_string(), Resource::Failed(e.to_string())));
            }
        }
    }

    /// Currently selected family and its detail phase
    pub async fn selected(&self) -> Option<(String, Resource<Vec<FontStyleEntry>>)> {
        self.detail.read().await.clone()
    }

    pub async fn clear_selection(&self) {
        *self.detail.write().await = None;
    }

    /// Trigger an on-demand backend scan (the empty state's action)
    pub async fn request_scan(&self, path: &str) -> Result<()> {
        self.api.scan_path(path).await
    }
}

impl Drop for CatalogueBrowser {
    fn drop(&mut self) {
        // Teardown: no late search or face-load callback may fire
        if let Some(handle) = self.pending_search.get_mut().take() {
            handle.abort();
        }
        for (_, handle) in self.face_tasks.get_mut().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;

    use crate::cache::MemoryFontCache;
    use crate::error::ClientError;
    use crate::fontface::FontRegistry;
    use crate::types::{FolderEntry, ValidationOutcome};

    fn family(id: &str, name: &str) -> FontFamilySummary {
        FontFamilySummary {
            id: id.to_string(),
            name: name.to_string(),
            extensions: vec!["ttf".to_string()],
            font_count: 1,
            path: format!("/fonts/{}", name),
        }
    }

    struct FakeCatalogue {
        families: Vec<FontFamilySummary>,
        fail_list: bool,
        family_fetches: AtomicUsize,
        font_fetches: AtomicUsize,
    }

    impl FakeCatalogue {
        fn new(families: Vec<FontFamilySummary>) -> Self {
            Self {
                families,
                fail_list: false,
                family_fetches: AtomicUsize::new(0),
                font_fetches: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                families: Vec::new(),
                fail_list: true,
                family_fetches: AtomicUsize::new(0),
                font_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpecimenApi for FakeCatalogue {
        async fn list_folders(&self) -> crate::error::Result<Vec<FolderEntry>> {
            Ok(Vec::new())
        }
        async fn add_folder(&self, _path: &str) -> crate::error::Result<FolderEntry> {
            unimplemented!()
        }
        async fn remove_folder(&self, _id: &str) -> crate::error::Result<()> {
            Ok(())
        }
        async fn validate_path(&self, _path: &str) -> crate::error::Result<ValidationOutcome> {
            unimplemented!()
        }
        async fn list_representatives(
            &self,
        ) -> crate::error::Result<Vec<FontFamilySummary>> {
            if self.fail_list {
                return Err(ClientError::Api {
                    status: 500,
                    message: "backend down".to_string(),
                });
            }
            Ok(self.families.clone())
        }
        async fn list_family(&self, id: &str) -> crate::error::Result<Vec<FontStyleEntry>> {
            self.family_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![FontStyleEntry {
                full_name: format!("Family {} Regular", id),
                path: format!("/fonts/{}/regular.ttf", id),
                style_name: "Regular".to_string(),
                representative: true,
            }])
        }
        async fn fetch_font(&self, _name: &str) -> crate::error::Result<Bytes> {
            self.font_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"wOF2fake"))
        }
        async fn scan_path(&self, _path: &str) -> crate::error::Result<()> {
            Ok(())
        }
    }

    struct AcceptingRegistry;

    #[async_trait]
    impl FontRegistry for AcceptingRegistry {
        async fn is_available(&self, _family: &str) -> bool {
            false
        }
        async fn register(&self, _family: &str, _data: Bytes) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn browser(api: Arc<FakeCatalogue>) -> CatalogueBrowser {
        let loader = Arc::new(FontFaceLoader::new(
            api.clone(),
            Arc::new(AcceptingRegistry),
            Arc::new(MemoryFontCache::new()),
        ));
        CatalogueBrowser::new(api, loader)
    }

    #[tokio::test]
    async fn test_open_transitions_to_ready() {
        let api = Arc::new(FakeCatalogue::new(vec![
            family("1", "Helvetica"),
            family("2", "Arial"),
        ]));
        let browser = browser(api);

        assert_eq!(browser.state().await, BrowseState::Idle);
        browser.open().await;
        assert_eq!(browser.state().await, BrowseState::Ready);
        assert_eq!(browser.families().await.len(), 2);
    }

    #[tokio::test]
    async fn test_open_empty_result_is_empty_not_error() {
        let api = Arc::new(FakeCatalogue::new(Vec::new()));
        let browser = browser(api);

        browser.open().await;
        assert_eq!(browser.state().await, BrowseState::Empty);
    }

    #[tokio::test]
    async fn test_open_failure_is_error_state() {
        let api = Arc::new(FakeCatalogue::failing());
        let browser = browser(api);

        browser.open().await;
        match browser.state().await {
            BrowseState::Error(message) => assert!(message.contains("500")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_filters_after_debounce() {
        let api = Arc::new(FakeCatalogue::new(vec![
            family("1", "Helvetica"),
            family("2", "Arial"),
        ]));
        let browser = browser(api);
        browser.open().await;

        browser.set_query("Helv").await;
        assert_eq!(browser.state().await, BrowseState::Searching);
        // Still unfiltered until the quiet interval elapses
        assert_eq!(browser.families().await.len(), 2);

        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
        assert_eq!(browser.state().await, BrowseState::Ready);
        let families = browser.families().await;
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Helvetica");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_queries_apply_only_the_last() {
        let api = Arc::new(FakeCatalogue::new(vec![
            family("1", "Helvetica"),
            family("2", "Arial"),
        ]));
        let browser = browser(api);
        browser.open().await;

        browser.set_query("Helv").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        browser.set_query("Ari").await;
        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;

        let families = browser.families().await;
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Arial");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_query_restores_snapshot() {
        let api = Arc::new(FakeCatalogue::new(vec![
            family("1", "Helvetica"),
            family("2", "Arial"),
        ]));
        let browser = browser(api);
        browser.open().await;

        browser.set_query("Helv").await;
        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
        assert_eq!(browser.families().await.len(), 1);

        browser.set_query("  ").await;
        assert_eq!(browser.state().await, BrowseState::Ready);
        assert_eq!(browser.families().await.len(), 2);
    }

    #[tokio::test]
    async fn test_detail_cached_per_session() {
        let api = Arc::new(FakeCatalogue::new(vec![family("7", "Helvetica")]));
        let browser = browser(api.clone());
        browser.open().await;

        browser.select_family("7").await;
        let (id, detail) = browser.selected().await.unwrap();
        assert_eq!(id, "7");
        assert_eq!(detail.value().unwrap().len(), 1);

        browser.clear_selection().await;
        browser.select_family("7").await;
        assert!(browser.selected().await.unwrap().1.value().is_some());
        assert_eq!(api.family_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_rows_trigger_deferred_face_loads() {
        let families: Vec<_> = (0..100)
            .map(|i| family(&i.to_string(), &format!("Family {}", i)))
            .collect();
        let api = Arc::new(FakeCatalogue::new(families));
        let browser = browser(api.clone());
        browser.open().await;
        browser.handle_resize(300.0).await;

        browser.schedule_face_loads().await;
        // Nothing fires before the delay
        assert_eq!(api.font_fetches.load(Ordering::SeqCst), 0);

        tokio::time::sleep(FACE_LOAD_DELAY * 2).await;
        // ceil(300/100) + 2*2 buffered rows at the top of the list
        assert_eq!(api.font_fetches.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_leaving_window_cancel_their_loads() {
        let families: Vec<_> = (0..100)
            .map(|i| family(&i.to_string(), &format!("Family {}", i)))
            .collect();
        let api = Arc::new(FakeCatalogue::new(families));
        let browser = browser(api.clone());
        browser.open().await;
        browser.handle_resize(300.0).await;

        browser.schedule_face_loads().await;
        // Jump far down before the 50 ms delay fires
        browser.handle_scroll(5_000.0).await;
        browser.schedule_face_loads().await;

        tokio::time::sleep(FACE_LOAD_DELAY * 2).await;
        // Only the rows around offset 5000 loaded; the top rows were
        // cancelled before their delay elapsed
        assert_eq!(api.font_fetches.load(Ordering::SeqCst), 7);
    }
}
