use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::api::SpecimenApi;
use crate::cache::FontBinaryCache;
use crate::error::Result;

/// Host font system the loader registers decoded faces with
///
/// In a browser host this wraps `document.fonts`; a native host wraps its
/// own font database.
#[async_trait]
pub trait FontRegistry: Send + Sync {
    /// Does the host already have this family available?
    async fn is_available(&self, family: &str) -> bool;

    /// Decode and register a face for `family` from raw font data
    async fn register(&self, family: &str, data: Bytes) -> Result<()>;
}

/// Loads each font family into the host registry at most once
///
/// The memo set lives on the instance (lifetime = page session) so tests
/// can reset it. Failures never reach the caller: a face that cannot be
/// loaded degrades to fallback rendering and a logged diagnostic, because
/// nothing in the visible-item render path may throw.
pub struct FontFaceLoader {
    api: Arc<dyn SpecimenApi>,
    registry: Arc<dyn FontRegistry>,
    binaries: Arc<dyn FontBinaryCache>,
    loaded: Mutex<HashSet<String>>,
    // Families with a fetch currently awaiting. Two rows becoming visible
    // in the same tick both pass the memo check; this set collapses the
    // second attempt into a no-op.
    in_flight: Mutex<HashSet<String>>,
}

/// Clears the in-flight marker when the load finishes or is cancelled
///
/// Face-load tasks are aborted when their row scrolls out of the window.
/// An abort can land while the fetch is awaiting, so the marker must come
/// out on drop rather than on the success path, or the family would stay
/// unloadable for the rest of the session.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    family: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.family);
    }
}

impl FontFaceLoader {
    pub fn new(
        api: Arc<dyn SpecimenApi>,
        registry: Arc<dyn FontRegistry>,
        binaries: Arc<dyn FontBinaryCache>,
    ) -> Self {
        Self {
            api,
            registry,
            binaries,
            loaded: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn lock(set: &Mutex<HashSet<String>>) -> std::sync::MutexGuard<'_, HashSet<String>> {
        match set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Ensure `family` is usable for preview rendering
    ///
    /// No-op for empty names, already-loaded families, and families with a
    /// load in flight. Never returns an error.
    pub async fn ensure_loaded(&self, family: &str) {
        if family.is_empty() {
            return;
        }
        if Self::lock(&self.loaded).contains(family) {
            return;
        }

        let _in_flight = {
            if !Self::lock(&self.in_flight).insert(family.to_string()) {
                return;
            }
            InFlightGuard {
                set: &self.in_flight,
                family: family.to_string(),
            }
        };

        if let Err(e) = self.try_load(family).await {
            tracing::warn!(family, error = %e, "font face load failed, falling back");
        }
    }

    async fn try_load(&self, family: &str) -> Result<()> {
        if self.registry.is_available(family).await {
            Self::lock(&self.loaded).insert(family.to_string());
            return Ok(());
        }

        let data = match self.binaries.get(family).await? {
            Some(cached) => {
                tracing::debug!(family, "font binary cache hit");
                cached
            }
            None => {
                let fetched = self.api.fetch_font(family).await?;
                self.binaries.set(family, fetched.clone()).await?;
                fetched
            }
        };

        self.registry.register(family, data).await?;
        Self::lock(&self.loaded).insert(family.to_string());
        Ok(())
    }

    /// Has this family been recorded as loaded?
    pub async fn is_loaded(&self, family: &str) -> bool {
        Self::lock(&self.loaded).contains(family)
    }

    /// Forget every loaded family (test hook)
    pub async fn reset(&self) {
        Self::lock(&self.loaded).clear();
        Self::lock(&self.in_flight).clear();
    }
}
