use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::types::{PathValidationStatus, ValidationOutcome};

/// Injected asynchronous validation callback
///
/// Receives the trimmed input and decides validity, typically by checking
/// the live folder list and then asking the backend.
pub type ValidatorFn = Arc<
    dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<ValidationOutcome>> + Send>>
        + Send
        + Sync,
>;

/// Default quiet interval before a validation fires
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounced path validator
///
/// Each call to [`validate`](Self::validate) replaces any pending timer.
/// Consumers observe [`PathValidationStatus`] through a watch channel; the
/// status carries the input value it was computed for, which is the
/// correlation key against stale responses.
pub struct PathValidator {
    validator: ValidatorFn,
    debounce: Duration,
    status_tx: Arc<watch::Sender<PathValidationStatus>>,
    pending: Option<JoinHandle<()>>,
    // Bumped on every input event; a timer task that lost the race checks
    // this before publishing, in case abort caught it mid-await.
    generation: Arc<AtomicU64>,
}

impl PathValidator {
    pub fn new(validator: ValidatorFn) -> Self {
        Self::with_debounce(validator, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(validator: ValidatorFn, debounce: Duration) -> Self {
        let (status_tx, _) = watch::channel(PathValidationStatus::empty());
        Self {
            validator,
            debounce,
            status_tx: Arc::new(status_tx),
            pending: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Feed one input event
    ///
    /// Empty or whitespace-only input resolves synchronously with no timer
    /// and no remote call. Anything else publishes a pending status and
    /// schedules the validation after the quiet interval.
    pub fn validate(&mut self, raw: &str) {
        self.cancel();
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            self.status_tx.send_replace(PathValidationStatus::empty());
            return;
        }

        self.status_tx
            .send_replace(PathValidationStatus::pending(trimmed.clone()));

        let validator = Arc::clone(&self.validator);
        let status_tx = Arc::clone(&self.status_tx);
        let generation = Arc::clone(&self.generation);
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generation.load(Ordering::SeqCst) != gen {
                return;
            }

            let status = match (*validator)(trimmed.clone()).await {
                Ok(outcome) => PathValidationStatus {
                    value: trimmed,
                    valid: outcome.valid,
                    error: outcome.error,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "path validation failed");
                    PathValidationStatus {
                        value: trimmed,
                        valid: false,
                        error: Some("Validation failed".to_string()),
                    }
                }
            };

            if generation.load(Ordering::SeqCst) == gen {
                status_tx.send_replace(status);
            }
        }));
    }

    /// Current status snapshot
    pub fn status(&self) -> PathValidationStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<PathValidationStatus> {
        self.status_tx.subscribe()
    }

    /// Reset to the initial empty status, dropping any pending timer
    pub fn reset(&mut self) {
        self.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status_tx.send_replace(PathValidationStatus::empty());
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for PathValidator {
    fn drop(&mut self) {
        self.cancel();
    }
}
