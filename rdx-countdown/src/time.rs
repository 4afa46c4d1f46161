//! The tick source a countdown registers with.
//!
//! The engine only relies on the `TickSource` contract: register a callback at
//! a frequency, remove it by the handle returned at registration, and start
//! dispatching. `TickTimer` is the bundled implementation. It can be driven by
//! hand (`advance`) or by a tokio interval loop.

use crate::common::{lock, ListenerId};
use crate::components::watcher::TickWatcher;
use slotmap::SlotMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

pub use crate::components::watcher::TickCallback;

/// The contract a countdown requires from its tick source.
///
/// `remove` must not block on a dispatch that is in progress: a countdown
/// deregisters itself from inside its own tick callback when it finishes.
/// A removed callback may still see one in-flight tick.
pub trait TickSource: Send + Sync {
    /// Registers `callback` to be invoked with a tick count roughly every
    /// `frequency_ms` milliseconds. The returned key is the only handle needed
    /// for `remove`.
    fn add(&self, callback: TickCallback, frequency_ms: u64) -> ListenerId;

    /// Deregisters a callback. Unknown or already removed keys are ignored.
    fn remove(&self, id: ListenerId);

    /// Starts dispatching. Calling it again is a no-op.
    fn start(&self);
}

/// How a `TickTimer` measures time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDriver {
    /// Time only passes through `TickTimer::advance`.
    Manual,
    /// A tokio task advances the timer by measured wall time every `resolution`.
    Realtime { resolution: Duration },
}

struct TimerInner {
    watchers: Mutex<SlotMap<ListenerId, TickWatcher>>,
    retired: Mutex<Vec<ListenerId>>,
    started: AtomicBool,
    driver: TickDriver,
    shutdown_tx: broadcast::Sender<()>,
}

/// A shared tick dispatcher. Cloning yields another handle to the same timer.
#[derive(Clone)]
pub struct TickTimer {
    inner: Arc<TimerInner>,
}

impl TickTimer {
    pub fn new(driver: TickDriver) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(TimerInner {
                watchers: Mutex::new(SlotMap::with_key()),
                retired: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                driver,
                shutdown_tx,
            }),
        }
    }

    /// A timer that only moves when `advance` is called.
    pub fn manual() -> Self {
        Self::new(TickDriver::Manual)
    }

    /// A timer driven by a tokio interval once started.
    pub fn realtime(resolution: Duration) -> Self {
        Self::new(TickDriver::Realtime { resolution })
    }

    /// Lets `elapsed` pass and dispatches to every registered callback.
    ///
    /// Nothing is dispatched before `start()`.
    pub fn advance(&self, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.inner.dispatch(elapsed_ms);
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        let mut watchers = lock(&self.inner.watchers);
        self.inner.drain_retired(&mut watchers);
        watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    pub fn driver(&self) -> TickDriver {
        self.inner.driver
    }

    /// Stops the realtime loop, if one is running.
    pub fn shutdown(&self) {
        if self.inner.shutdown_tx.send(()).is_err() {
            trace!("Tick timer shutdown requested with no running loop.");
        }
    }
}

impl TickSource for TickTimer {
    fn add(&self, callback: TickCallback, frequency_ms: u64) -> ListenerId {
        let id = lock(&self.inner.watchers).insert(TickWatcher::new(frequency_ms, callback));
        debug!("Tick listener {:?} added at {} ms.", id, frequency_ms);
        id
    }

    fn remove(&self, id: ListenerId) {
        lock(&self.inner.retired).push(id);
        // Busy means a dispatch is running (possibly on this very thread);
        // it drains the retired list before it returns.
        if let Ok(mut watchers) = self.inner.watchers.try_lock() {
            self.inner.drain_retired(&mut watchers);
        }
    }

    fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Tick timer started ({:?}).", self.inner.driver);
        if let TickDriver::Realtime { resolution } = self.inner.driver {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let inner = Arc::downgrade(&self.inner);
                    let shutdown_rx = self.inner.shutdown_tx.subscribe();
                    handle.spawn(run(inner, resolution, shutdown_rx));
                }
                Err(_) => {
                    warn!("No tokio runtime available; the realtime tick loop was not spawned.")
                }
            }
        }
    }
}

impl TimerInner {
    fn dispatch(&self, elapsed_ms: u64) {
        if !self.started.load(Ordering::Acquire) || elapsed_ms == 0 {
            return;
        }
        let mut watchers = lock(&self.watchers);
        self.drain_retired(&mut watchers);

        let ids: Vec<ListenerId> = watchers.keys().collect();
        for id in ids {
            if self.is_retired(id) {
                continue;
            }
            if let Some(watcher) = watchers.get_mut(id) {
                if let Some(count) = watcher.advance(elapsed_ms) {
                    trace!("Tick listener {:?} fired with count {}.", id, count);
                }
            }
        }

        self.drain_retired(&mut watchers);
    }

    fn is_retired(&self, id: ListenerId) -> bool {
        lock(&self.retired).contains(&id)
    }

    fn drain_retired(&self, watchers: &mut SlotMap<ListenerId, TickWatcher>) {
        for id in lock(&self.retired).drain(..) {
            if watchers.remove(id).is_some() {
                debug!("Tick listener {:?} removed.", id);
            }
        }
    }
}

#[doc(hidden)]
async fn run(
    inner: Weak<TimerInner>,
    resolution: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(resolution);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let elapsed_ms = u64::try_from(last.elapsed().as_millis()).unwrap_or(u64::MAX);
                // Only whole milliseconds are consumed; the remainder carries over.
                last += Duration::from_millis(elapsed_ms);
                inner.dispatch(elapsed_ms);
            }
        }
    }
    debug!("Tick timer loop exited.");
}
