//! Debounced autosave.
//!
//! Structure edits are coalesced into a single pending payload and written
//! after a quiet window, so rapid typing produces one save instead of one per
//! keystroke. The latest payload always wins. A failed save keeps the payload
//! and returns to dirty without retrying on its own; the next edit or an
//! explicit flush retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pollboard_common::{AppError, AppResult};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Default quiet window before a pending payload is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Sink that persists an autosave payload.
#[async_trait]
pub trait Saver<T>: Send + Sync + 'static {
    async fn save(&self, payload: T) -> AppResult<()>;
}

/// Observable state of the save pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Everything written.
    Clean,
    /// Unsaved changes pending (or a save failed).
    Dirty,
    /// A write is in flight.
    Saving,
}

enum Command<T> {
    MarkDirty(T),
    Flush(oneshot::Sender<AppResult<()>>),
}

/// Handle to a background debounced-save worker.
///
/// Dropping every handle closes the channel; the worker flushes any pending
/// payload before exiting, so teardown never loses an edit.
pub struct DebouncedSaver<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    state: watch::Receiver<SaveState>,
}

impl<T> Clone for DebouncedSaver<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> DebouncedSaver<T> {
    /// Spawn the worker with the given quiet window.
    #[must_use]
    pub fn spawn(saver: Arc<dyn Saver<T>>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SaveState::Clean);
        tokio::spawn(run(saver, rx, state_tx, debounce));
        Self {
            tx,
            state: state_rx,
        }
    }

    /// Record a new payload, restarting the quiet window.
    pub fn mark_dirty(&self, payload: T) {
        let _ = self.tx.send(Command::MarkDirty(payload));
    }

    /// Write the pending payload immediately, if any, and wait for the result.
    pub async fn flush(&self) -> AppResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .map_err(|_| AppError::Internal("autosave worker stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| AppError::Internal("autosave worker stopped".to_string()))?
    }

    /// Current pipeline state.
    #[must_use]
    pub fn state(&self) -> SaveState {
        *self.state.borrow()
    }

    /// Watch for state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.clone()
    }
}

async fn run<T: Clone + Send + 'static>(
    saver: Arc<dyn Saver<T>>,
    mut rx: mpsc::UnboundedReceiver<Command<T>>,
    state_tx: watch::Sender<SaveState>,
    debounce: Duration,
) {
    let mut pending: Option<T> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::MarkDirty(payload)) => {
                    pending = Some(payload);
                    deadline = Some(Instant::now() + debounce);
                    let _ = state_tx.send(SaveState::Dirty);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = match pending.take() {
                        Some(payload) => {
                            save_one(&saver, &state_tx, payload, &mut pending).await
                        }
                        None => Ok(()),
                    };
                    let _ = reply.send(result);
                }
                None => {
                    // All handles dropped; flush what is left and stop.
                    if let Some(payload) = pending.take() {
                        if let Err(e) = saver.save(payload).await {
                            tracing::warn!(error = %e, "final autosave flush failed");
                        }
                    }
                    return;
                }
            },
            () = sleep_until_opt(deadline), if deadline.is_some() => {
                deadline = None;
                if let Some(payload) = pending.take() {
                    if let Err(e) = save_one(&saver, &state_tx, payload, &mut pending).await {
                        tracing::warn!(error = %e, "debounced autosave failed");
                    }
                }
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

async fn save_one<T: Clone + Send + 'static>(
    saver: &Arc<dyn Saver<T>>,
    state_tx: &watch::Sender<SaveState>,
    payload: T,
    pending: &mut Option<T>,
) -> AppResult<()> {
    let _ = state_tx.send(SaveState::Saving);
    match saver.save(payload.clone()).await {
        Ok(()) => {
            // Stay dirty if another edit queued while the write was in flight.
            if pending.is_none() {
                let _ = state_tx.send(SaveState::Clean);
            }
            Ok(())
        }
        Err(e) => {
            *pending = Some(payload);
            let _ = state_tx.send(SaveState::Dirty);
            Err(e)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct RecordingSaver {
        saved: Mutex<Vec<String>>,
        fail_first: AtomicUsize,
    }

    impl RecordingSaver {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                saved: Mutex::new(Vec::new()),
                fail_first: AtomicUsize::new(failures),
            })
        }
    }

    #[async_trait]
    impl Saver<String> for RecordingSaver {
        async fn save(&self, payload: String) -> AppResult<()> {
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::Database("connection lost".to_string()));
            }
            self.saved.lock().await.push(payload);
            Ok(())
        }
    }

    #[tokio::test]
    async fn flush_writes_pending_payload() {
        let saver = RecordingSaver::new(0);
        let handle = DebouncedSaver::spawn(saver.clone(), DEFAULT_DEBOUNCE);

        handle.mark_dirty("v1".to_string());
        handle.mark_dirty("v2".to_string());
        handle.flush().await.unwrap();

        // Only the latest payload is written.
        assert_eq!(*saver.saved.lock().await, vec!["v2".to_string()]);
        assert_eq!(handle.state(), SaveState::Clean);
    }

    #[tokio::test]
    async fn flush_with_nothing_pending_is_a_noop() {
        let saver = RecordingSaver::new(0);
        let handle = DebouncedSaver::spawn(saver.clone(), DEFAULT_DEBOUNCE);

        handle.flush().await.unwrap();
        assert!(saver.saved.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_payload_and_returns_to_dirty() {
        let saver = RecordingSaver::new(1);
        let handle = DebouncedSaver::spawn(saver.clone(), DEFAULT_DEBOUNCE);

        handle.mark_dirty("v1".to_string());
        assert!(handle.flush().await.is_err());
        assert_eq!(handle.state(), SaveState::Dirty);
        assert!(saver.saved.lock().await.is_empty());

        // A second flush retries with the retained payload.
        handle.flush().await.unwrap();
        assert_eq!(*saver.saved.lock().await, vec!["v1".to_string()]);
        assert_eq!(handle.state(), SaveState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_window_triggers_save() {
        let saver = RecordingSaver::new(0);
        let handle = DebouncedSaver::spawn(saver.clone(), DEFAULT_DEBOUNCE);

        handle.mark_dirty("v1".to_string());
        tokio::time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(10)).await;

        assert_eq!(*saver.saved.lock().await, vec!["v1".to_string()]);
        assert_eq!(handle.state(), SaveState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn new_edit_restarts_the_window() {
        let saver = RecordingSaver::new(0);
        let handle = DebouncedSaver::spawn(saver.clone(), DEFAULT_DEBOUNCE);

        handle.mark_dirty("v1".to_string());
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.mark_dirty("v2".to_string());
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Window restarted at the second edit, nothing written yet.
        assert!(saver.saved.lock().await.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*saver.saved.lock().await, vec!["v2".to_string()]);
    }
}
