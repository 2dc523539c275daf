use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::SpecimenApi;
use crate::error::Result;
use crate::types::{FolderEntry, FolderStatus, ValidationOutcome};
use crate::validator::ValidatorFn;

/// Observable phase of a remotely-fetched value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Resource<T> {
    pub fn loading(&self) -> bool {
        matches!(self, Resource::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Resource::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Resource::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Stateful container around one remote fetch
///
/// The fetch is issued exactly once; later `load` calls are no-ops.
/// `mutate` applies a pure local transform synchronously (no round trip),
/// which is the substrate for optimistic updates.
pub struct ResourceCache<T> {
    state: RwLock<Resource<T>>,
    started: AtomicBool,
}

impl<T: Clone> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Resource::Pending),
            started: AtomicBool::new(false),
        }
    }

    /// Run the fetch if it has not run yet
    pub async fn load<F, Fut>(&self, fetch: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let next = match fetch().await {
            Ok(value) => Resource::Ready(value),
            Err(e) => Resource::Failed(e.to_string()),
        };
        *self.state.write().await = next;
    }

    /// Apply a local-only transform to a ready value
    pub async fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        if let Resource::Ready(value) = &mut *self.state.write().await {
            f(value);
        }
    }

    /// Clone the current phase
    pub async fn snapshot(&self) -> Resource<T> {
        self.state.read().await.clone()
    }
}

impl<T: Clone> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Value-level edit to the folder list with a pure inverse
///
/// Rollback applies the inverse of the captured pre-image instead of
/// splicing by live index, so concurrent edits cannot make it drift.
/// Removal matches on the stable id; insertion clamps the captured index
/// to the current length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    Insert { index: usize, entry: FolderEntry },
    Remove { index: usize, entry: FolderEntry },
}

impl Patch {
    pub fn apply(&self, list: &mut Vec<FolderEntry>) {
        match self {
            Patch::Insert { index, entry } => {
                let at = (*index).min(list.len());
                list.insert(at, entry.clone());
            }
            Patch::Remove { entry, .. } => {
                list.retain(|e| e.id != entry.id);
            }
        }
    }

    pub fn invert(&self) -> Patch {
        match self {
            Patch::Insert { index, entry } => Patch::Remove {
                index: *index,
                entry: entry.clone(),
            },
            Patch::Remove { index, entry } => Patch::Insert {
                index: *index,
                entry: entry.clone(),
            },
        }
    }
}

/// Authoritative owner of the watched-folder list
///
/// UI layers hold snapshots for rendering and dispatch add/remove back
/// through the store. Add and remove are optimistic: the local list changes
/// first, and a failed confirmation rolls the change back.
pub struct FolderStore {
    api: Arc<dyn SpecimenApi>,
    cache: ResourceCache<Vec<FolderEntry>>,
    tmp_counter: AtomicU64,
}

impl FolderStore {
    pub fn new(api: Arc<dyn SpecimenApi>) -> Self {
        Self {
            api,
            cache: ResourceCache::new(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Fetch the folder list (exactly once)
    pub async fn refresh(&self) {
        self.cache.load(|| self.api.list_folders()).await;
    }

    /// Current phase of the folder list
    pub async fn folders(&self) -> Resource<Vec<FolderEntry>> {
        self.cache.snapshot().await
    }

    /// True if the live list already watches `path`
    pub async fn contains_path(&self, path: &str) -> bool {
        match self.cache.snapshot().await {
            Resource::Ready(list) => list.iter().any(|entry| entry.path == path),
            _ => false,
        }
    }

    /// Build the validation callback for a [`PathValidator`]
    ///
    /// Duplicates of an already-watched path short-circuit locally; only
    /// unknown paths reach the backend's existence check.
    ///
    /// [`PathValidator`]: crate::validator::PathValidator
    pub fn validator(store: &Arc<Self>) -> ValidatorFn {
        let store = Arc::clone(store);
        Arc::new(move |path: String| {
            let store = Arc::clone(&store);
            Box::pin(async move {
                if store.contains_path(&path).await {
                    return Ok(ValidationOutcome {
                        valid: false,
                        error: Some("Path already saved".to_string()),
                    });
                }
                store.api.validate_path(&path).await
            })
        })
    }

    /// Optimistically register a folder
    ///
    /// A temporary entry becomes visible immediately; on confirmation the
    /// server record replaces it in place (matched by the temporary id),
    /// on failure the insertion is rolled back.
    pub async fn add(&self, path: &str) {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.contains_path(trimmed).await {
            tracing::warn!(path = trimmed, "refusing to add duplicate folder path");
            return;
        }

        let tmp_id = format!("tmp-{}", self.tmp_counter.fetch_add(1, Ordering::SeqCst) + 1);
        let temporary = FolderEntry {
            id: tmp_id.clone(),
            path: trimmed.to_string(),
            file_count: 0,
            status: FolderStatus::Scanning,
        };

        // Same precondition as remove: a mutation needs a Ready list to
        // patch locally before the request goes out.
        let index = match self.cache.snapshot().await {
            Resource::Ready(list) => list.len(),
            _ => {
                tracing::warn!(path = trimmed, "folder list not loaded, ignoring add");
                return;
            }
        };
        let patch = Patch::Insert {
            index,
            entry: temporary,
        };
        self.cache.mutate(|list| patch.apply(list)).await;

        match self.api.add_folder(trimmed).await {
            Ok(confirmed) => {
                self.cache
                    .mutate(|list| {
                        if let Some(slot) = list.iter_mut().find(|e| e.id == tmp_id) {
                            *slot = confirmed;
                        }
                    })
                    .await;
            }
            Err(e) => {
                tracing::warn!(path = trimmed, error = %e, "folder add failed, rolling back");
                let inverse = patch.invert();
                self.cache.mutate(|list| inverse.apply(list)).await;
            }
        }
    }

    /// Optimistically unregister a folder
    ///
    /// The entry disappears from the local list immediately; a failed
    /// confirmation restores it at its original index.
    pub async fn remove(&self, id: &str) {
        let captured = match self.cache.snapshot().await {
            Resource::Ready(list) => list
                .iter()
                .position(|entry| entry.id == id)
                .map(|index| (index, list[index].clone())),
            _ => None,
        };
        let Some((index, entry)) = captured else {
            return;
        };

        let patch = Patch::Remove { index, entry };
        self.cache.mutate(|list| patch.apply(list)).await;

        if let Err(e) = self.api.remove_folder(id).await {
            tracing::warn!(folder = id, error = %e, "folder removal failed, rolling back");
            let inverse = patch.invert();
            self.cache.mutate(|list| inverse.apply(list)).await;
        }
    }
}
