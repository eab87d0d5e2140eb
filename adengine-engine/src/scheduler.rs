//! The activation scheduler (§4.C)
//!
//! Registration does not always act on the OML immediately: a campaign
//! whose window has not started yet must be linked in later, at
//! `start_instant`, and every admitted campaign must be unlinked at
//! `end_instant` regardless of when it was linked in. This module tracks
//! those deferred actions and drains them as wall-clock time passes them by,
//! independent of any particular [`Clock`] or tick source so it can be
//! driven deterministically in tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};
use parking_lot::Mutex;

use adengine_core::{ImpressionUrl, UnixSeconds};

use crate::arena::NodeHandle;
use crate::clock::Clock;
use crate::oml::OrderedMultiList;

/// A single deferred mutation against the OML.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeferredAction {
    Link(NodeHandle),
    Delete(NodeHandle),
}

/// The deferred-action table: scheduled instant (quantized to whole
/// seconds) -> actions due at that instant. Shared state guarded by the
/// same lock the engine façade takes for every other OML mutation (§5).
#[derive(Default)]
pub(crate) struct DeferredActionTable {
    actions: BTreeMap<UnixSeconds, Vec<DeferredAction>>,
}

impl DeferredActionTable {
    pub fn schedule(&mut self, at: UnixSeconds, action: DeferredAction) {
        self.actions.entry(at).or_default().push(action);
    }

    /// Removes and returns every action scheduled at an instant `<= now`,
    /// in ascending-instant order. Draining every elapsed bucket (not only
    /// one matching `now` exactly) keeps activation correct under tick
    /// jitter: a delayed tick must not skip a bucket it ran past (§9).
    fn drain_elapsed(&mut self, now: UnixSeconds) -> Vec<DeferredAction> {
        let elapsed_keys: Vec<UnixSeconds> =
            self.actions.range(..=now).map(|(k, _)| *k).collect();
        let mut drained = Vec::new();
        for key in elapsed_keys {
            if let Some(actions) = self.actions.remove(&key) {
                drained.extend(actions);
            }
        }
        drained
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.actions.values().map(|v| v.len()).sum()
    }
}

/// Every piece of mutable engine state, behind the single writer-exclusive
/// lock §5 mandates: the OML itself, the deferred-action table a scheduler
/// tick drains, and the impression-URL → node-handle binding the façade
/// maintains. Holding all three behind one `Mutex` means `register` and
/// `delete_by_url` each take exactly one lock for their entire body — a
/// handle can never become visible to one without also being visible to the
/// other, closing the gap a two-lock scheme would leave between "linked
/// into the OML" and "reachable by URL".
pub(crate) struct EngineState {
    pub(crate) oml: OrderedMultiList,
    pub(crate) table: DeferredActionTable,
    pub(crate) url_to_handle: HashMap<ImpressionUrl, NodeHandle>,
}

impl EngineState {
    pub(crate) fn new(initial_node_capacity: usize) -> Self {
        Self {
            oml: OrderedMultiList::with_capacity(initial_node_capacity),
            table: DeferredActionTable::default(),
            url_to_handle: HashMap::new(),
        }
    }
}

/// Applies every elapsed deferred action to `oml` as of `now`. Tolerates
/// firing against a handle that no longer names a live node (the node was
/// retired early by an impression-cap deletion, for instance): both
/// `OrderedMultiList::link` and `delete` are no-ops on a dead handle, so no
/// special-casing is needed here beyond a debug log (§4.C, §7).
pub(crate) fn drain_tick(
    table: &mut DeferredActionTable,
    oml: &mut OrderedMultiList,
    now: UnixSeconds,
) -> usize {
    let due = table.drain_elapsed(now);
    let count = due.len();
    for action in due {
        match action {
            DeferredAction::Link(handle) => {
                if oml.contains(handle) {
                    oml.link(handle);
                } else {
                    debug!("deferred insert fired for an already-retired node; skipping");
                }
            }
            DeferredAction::Delete(handle) => {
                oml.delete(handle);
            }
        }
    }
    count
}

/// A tick source the scheduler can wait on. `SystemTicker` drives the real
/// scheduler thread; tests drive `drain_tick` directly against a
/// [`crate::clock::ManualClock`] instead of implementing this trait, since
/// a fake tick source buys nothing a direct call doesn't.
pub trait Ticker: Send {
    /// Blocks until the next tick, or returns `false` if the ticker has
    /// been stopped and no further ticks will come.
    fn tick(&mut self) -> bool;
}

/// A ticker backed by a fixed-period sleep, suitable for production use.
pub struct IntervalTicker {
    period: std::time::Duration,
    stop: crossbeam::channel::Receiver<()>,
}

impl IntervalTicker {
    pub fn new(period: std::time::Duration, stop: crossbeam::channel::Receiver<()>) -> Self {
        Self { period, stop }
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> bool {
        match self.stop.recv_timeout(self.period) {
            Ok(()) => false,
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => true,
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Owns the scheduler's worker thread lifecycle. Constructed by the engine
/// façade, which supplies the shared, lock-protected [`EngineState`] the
/// worker mutates on each tick. Not part of the crate's public surface —
/// `EngineState` is crate-private, so a `pub` item taking it as a parameter
/// would be unreachable from outside the crate anyway; the host only ever
/// talks to [`crate::engine::Engine`].
pub(crate) struct ActivationScheduler {
    stop_tx: Option<crossbeam::channel::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ActivationScheduler {
    pub fn new() -> Self {
        Self {
            stop_tx: None,
            worker: None,
        }
    }

    /// True if the worker thread is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts the tick loop on a dedicated thread. Each tick takes the
    /// shared lock, drains elapsed deferred actions against the OML, and
    /// releases it before sleeping again (§5: no suspension points while
    /// the lock is held).
    ///
    /// Fails loudly rather than silently no-opping a second `start` — a
    /// double-start most likely means the host's lifecycle management has
    /// a bug, and two workers racing on the same deferred-action table
    /// would be a correctness hazard, not a harmless redundancy.
    pub fn start(
        &mut self,
        shared: Arc<Mutex<EngineState>>,
        clock: Arc<dyn Clock>,
        period: std::time::Duration,
    ) -> Result<(), SchedulerAlreadyStarted> {
        if self.worker.is_some() {
            return Err(SchedulerAlreadyStarted);
        }

        let (stop_tx, stop_rx) = crossbeam::channel::bounded(0);
        let mut ticker = IntervalTicker::new(period, stop_rx);

        let handle = std::thread::Builder::new()
            .name("adengine-scheduler".to_string())
            .spawn(move || {
                info!("activation scheduler started");
                while ticker.tick() {
                    let now = clock.now();
                    let mut state = shared.lock();
                    let fired = drain_tick(&mut state.table, &mut state.oml, now);
                    if fired > 0 {
                        debug!("scheduler tick at {now}: drained {fired} deferred action(s)");
                    }
                }
                info!("activation scheduler stopped");
            })
            .expect("failed to spawn activation scheduler thread");

        self.stop_tx = Some(stop_tx);
        self.worker = Some(handle);
        Ok(())
    }

    /// Signals the worker to stop and waits for it to exit. Idempotent:
    /// stopping an already-stopped (or never-started) scheduler is a no-op,
    /// since shutdown has no notion of "twice" the way a double-start does.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            drop(stop_tx);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("activation scheduler thread panicked during shutdown");
            }
        }
    }
}

impl Default for ActivationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActivationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Returned by [`ActivationScheduler::start`] when the scheduler is already
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerAlreadyStarted;

impl std::fmt::Display for SchedulerAlreadyStarted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "activation scheduler is already running")
    }
}

impl std::error::Error for SchedulerAlreadyStarted {}
