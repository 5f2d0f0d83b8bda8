//! Debounced autosave.
//!
//! Every `schedule` restarts a fixed-delay timer; when it fires, the most
//! recent snapshot is handed to the `Persist` collaborator. Saves are
//! numbered by generation: once a newer save has started, an older save's
//! outcome is ignored. In-flight saves are never aborted, only superseded.
//!
//! A failed save never touches the document. Its snapshot is kept as the
//! unsaved state (unless something newer exists) so the next save or an
//! explicit `flush` retries it. `flush` waits for a running save to settle
//! before deciding whether anything is left to save.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tessera_sdk::Block;
use tokio::runtime::Handle;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default debounce delay.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1500);

/// Opaque persistence collaborator supplied by the host.
#[async_trait]
pub trait Persist: Send + Sync + 'static {
    async fn persist(&self, blocks: Vec<Block>) -> anyhow::Result<()>;
}

/// Save state, as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    /// Nothing scheduled since startup.
    Idle,
    /// Changes waiting for the debounce timer.
    Pending,
    /// A save is in flight.
    Saving,
    Saved { at: DateTime<Utc> },
    Failed { error: String, at: DateTime<Utc> },
}

struct State {
    /// Newest snapshot not yet handed to a save.
    latest: Option<Vec<Block>>,
    timer: Option<JoinHandle<()>>,
    /// Generation of the newest `schedule`/`flush` call.
    scheduled: u64,
    /// Generation of the newest save that started.
    started: u64,
    in_flight: usize,
}

struct Inner {
    persist: Arc<dyn Persist>,
    delay: Duration,
    state: Mutex<State>,
    status: watch::Sender<SaveStatus>,
    /// Woken whenever a save finishes.
    settled: Notify,
}

/// Cloneable handle to one document's autosave.
#[derive(Clone)]
pub struct Autosave {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Autosave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosave")
            .field("delay", &self.inner.delay)
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

impl Autosave {
    pub fn new(persist: Arc<dyn Persist>, delay: Duration) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                persist,
                delay,
                state: Mutex::new(State {
                    latest: None,
                    timer: None,
                    scheduled: 0,
                    started: 0,
                    in_flight: 0,
                }),
                status,
                settled: Notify::new(),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Record a new snapshot and restart the debounce timer.
    ///
    /// Outside a tokio runtime no timer can run; the snapshot is kept as
    /// unsaved and the next `flush` saves it.
    pub fn schedule(&self, snapshot: Vec<Block>) {
        let mut state = self.inner.state.lock();
        state.scheduled += 1;
        let generation = state.scheduled;
        state.latest = Some(snapshot);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        self.inner.status.send_replace(SaveStatus::Pending);

        let Ok(runtime) = Handle::try_current() else {
            warn!(generation, "no async runtime; autosave deferred until flush");
            return;
        };
        let inner = self.inner.clone();
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            Inner::start_save(&inner, generation);
        }));
    }

    /// Cancel the timer and save the newest unsaved snapshot now.
    ///
    /// A save already running is waited for first. If it fails and nothing
    /// newer exists, its snapshot is retried here and that outcome returned.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let (generation, snapshot) = loop {
            let settled = self.inner.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            {
                let mut state = self.inner.state.lock();
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                if let Some(snapshot) = state.latest.take() {
                    state.scheduled += 1;
                    state.started = state.scheduled;
                    state.in_flight += 1;
                    break (state.scheduled, snapshot);
                }
                if state.in_flight == 0 {
                    return Ok(());
                }
            }
            debug!("flush waiting for running save");
            settled.await;
        };
        self.inner.status.send_replace(SaveStatus::Saving);

        let result = self.inner.persist.persist(snapshot.clone()).await;
        self.inner.finish(generation, snapshot, &result);
        result.context("flushing autosave")
    }

    /// Watch save status changes.
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    pub fn current_status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    /// Whether some snapshot has not been confirmed saved.
    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.inner.state.lock();
        state.latest.is_some() || state.in_flight > 0
    }
}

impl Inner {
    /// Timer fired: hand the newest snapshot to a detached save task.
    fn start_save(inner: &Arc<Inner>, generation: u64) {
        let snapshot = {
            let mut state = inner.state.lock();
            if state.scheduled != generation {
                return;
            }
            state.timer = None;
            let Some(snapshot) = state.latest.take() else {
                return;
            };
            state.started = generation;
            state.in_flight += 1;
            snapshot
        };
        inner.status.send_replace(SaveStatus::Saving);
        debug!(generation, blocks = snapshot.len(), "autosave started");

        // Detached from the timer so a later schedule() cannot abort it.
        let inner = inner.clone();
        tokio::spawn(async move {
            let result = inner.persist.persist(snapshot.clone()).await;
            inner.finish(generation, snapshot, &result);
        });
    }

    fn finish(&self, generation: u64, snapshot: Vec<Block>, result: &anyhow::Result<()>) {
        self.record(generation, snapshot, result);
        self.settled.notify_waiters();
    }

    fn record(&self, generation: u64, snapshot: Vec<Block>, result: &anyhow::Result<()>) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if let Err(e) = result
            && state.latest.is_none()
            && state.started == generation
        {
            // Nothing newer exists: keep the failed snapshot for the retry.
            state.latest = Some(snapshot);
            warn!(generation, error = %format!("{e:#}"), "autosave failed; keeping unsaved changes");
        }

        if state.started != generation {
            debug!(generation, latest = state.started, "ignoring outcome of superseded save");
            return;
        }
        if state.scheduled != generation {
            // A newer change is already pending; its status stands.
            return;
        }

        let status = match result {
            Ok(()) => {
                info!(generation, "autosave complete");
                SaveStatus::Saved { at: Utc::now() }
            }
            Err(e) => SaveStatus::Failed {
                error: format!("{e:#}"),
                at: Utc::now(),
            },
        };
        self.status.send_replace(status);
    }
}
