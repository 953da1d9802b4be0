//! Cancellable reveal countdown
//!
//! One countdown per grant. Every tick recomputes the remaining time from the
//! grant's anchor, so a countdown started after a restart picks up exactly
//! where the previous one would have been.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use concierge_core::config::RevealConfig;
use concierge_core::{AccessGrant, RevealPolicy, RevealTracker, RevealWindow};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};

/// Default refresh period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

type TickFn = Box<dyn FnMut(u32) + Send>;
type ExpireFn = Box<dyn FnOnce() + Send>;

/// Where a countdown is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    /// Grant not checked in; nothing was scheduled
    Idle,
    Running,
    /// `on_expire` has fired
    Expired,
    Cancelled,
}

/// How a countdown evaluates time
#[derive(Debug, Clone)]
pub struct CountdownOptions {
    pub policy: RevealPolicy,
    pub interval: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            policy: RevealPolicy::default(),
            interval: DEFAULT_TICK_INTERVAL,
            clock: Arc::new(SystemClock),
        }
    }
}

impl CountdownOptions {
    pub fn from_config(config: &RevealConfig) -> Self {
        Self {
            policy: config.policy(),
            interval: config.tick_interval(),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

struct Sinks {
    on_tick: TickFn,
    on_expire: Option<ExpireFn>,
}

struct Inner {
    sinks: Option<Sinks>,
    status: CountdownStatus,
}

/// State shared between the handle and the countdown task.
///
/// Callbacks run with the lock released so they may cancel their own
/// countdown. The `cancelled` flag is checked right before every call.
struct Shared {
    inner: Mutex<Inner>,
    cancelled: AtomicBool,
}

impl Shared {
    fn new(sinks: Option<Sinks>, status: CountdownStatus) -> Self {
        Self {
            inner: Mutex::new(Inner { sinks, status }),
            cancelled: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Hand one evaluation to the callbacks. Returns false once the countdown
    /// is over.
    fn deliver(&self, window: RevealWindow) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let mut sinks = {
            let mut inner = self.lock();
            let Some(sinks) = inner.sinks.take() else {
                return false;
            };
            if window.expired {
                inner.status = CountdownStatus::Expired;
            }
            sinks
        };

        if window.expired {
            if self.is_cancelled() {
                self.lock().status = CountdownStatus::Cancelled;
            } else if let Some(on_expire) = sinks.on_expire.take() {
                on_expire();
            }
            return false;
        }

        if self.is_cancelled() {
            return false;
        }
        (sinks.on_tick)(window.remaining_secs);

        let mut inner = self.lock();
        if self.is_cancelled() {
            return false;
        }
        inner.sinks = Some(sinks);
        true
    }

    /// Returns true if this call stopped a live countdown
    fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::SeqCst);
        let (_sinks, stopped) = {
            let mut inner = self.lock();
            let stopped = inner.status == CountdownStatus::Running;
            if stopped {
                inner.status = CountdownStatus::Cancelled;
            }
            (inner.sinks.take(), stopped)
        };
        stopped
    }

    fn status(&self) -> CountdownStatus {
        self.lock().status
    }
}

/// Owns a running countdown. Dropping the handle cancels it.
pub struct CountdownHandle {
    grant_id: Uuid,
    shared: Arc<Shared>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    fn idle(grant_id: Uuid) -> Self {
        Self {
            grant_id,
            shared: Arc::new(Shared::new(None, CountdownStatus::Idle)),
            shutdown_tx: None,
            task: None,
        }
    }

    pub fn status(&self) -> CountdownStatus {
        self.shared.status()
    }

    /// Stop all further callbacks. Safe to call any number of times.
    pub fn cancel(&self) {
        if self.shared.cancel() {
            info!(grant_id = %self.grant_id, "Countdown cancelled");
        }
        if let Some(tx) = &self.shutdown_tx {
            let _ = tx.send(());
        }
    }

    /// Wait for the countdown task to finish (expiry or cancellation)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start counting down a grant's reveal window.
///
/// `on_tick` receives the remaining seconds once per interval while time is
/// left; `on_expire` fires exactly once when it runs out, after which nothing
/// else is called. A grant that has not checked in gets an idle handle and no
/// callbacks at all. Must be called from within a tokio runtime.
///
/// The grant is a snapshot: if its anchor changes, cancel this countdown and
/// start a new one.
pub fn start_countdown<T, E>(
    grant: &AccessGrant,
    options: CountdownOptions,
    on_tick: T,
    on_expire: E,
) -> CountdownHandle
where
    T: FnMut(u32) + Send + 'static,
    E: FnOnce() + Send + 'static,
{
    if !grant.checkin_status {
        debug!(grant_id = %grant.id, "Grant not checked in; countdown not started");
        return CountdownHandle::idle(grant.id);
    }

    let sinks = Sinks {
        on_tick: Box::new(on_tick),
        on_expire: Some(Box::new(on_expire)),
    };
    let shared = Arc::new(Shared::new(Some(sinks), CountdownStatus::Running));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    info!(
        grant_id = %grant.id,
        duration_secs = options.policy.duration_secs,
        "Countdown started"
    );

    let task = tokio::spawn(countdown_task(
        grant.clone(),
        options,
        shared.clone(),
        shutdown_rx,
    ));

    CountdownHandle {
        grant_id: grant.id,
        shared,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn countdown_task(
    grant: AccessGrant,
    options: CountdownOptions,
    shared: Arc<Shared>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut tracker = RevealTracker::new(options.policy);
    let mut ticker = tokio::time::interval_at(Instant::now() + options.interval, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let window = tracker.observe(&grant, options.clock.now());
                if !shared.deliver(window) {
                    if window.expired {
                        info!(grant_id = %grant.id, "Reveal window expired");
                    }
                    break;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!(grant_id = %grant.id, "Countdown task shutting down");
                break;
            }
        }
    }
}
