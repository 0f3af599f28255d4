// ── Data coordinator ──
//
// Owns the polling cadence and the single cached telemetry snapshot for one
// vehicle. Every refresh path (periodic task, reading update hooks, explicit
// host requests) funnels through `Coordinator::refresh`, which holds the
// client lock for the whole fetch so at most one fetch sequence is ever in
// flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use niuly_api::{NiuClient, Telemetry};

use crate::config::EntryConfig;
use crate::error::CoreError;

// ── State ────────────────────────────────────────────────────────

/// Where the coordinator is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefreshPhase {
    /// Constructed, no refresh attempted yet.
    Uninitialized,
    /// A fetch is in flight.
    Refreshing,
    /// Last fetch succeeded.
    Updated,
    /// Last fetch failed; `data` still holds the previous payload.
    Failed,
}

/// Snapshot of the coordinator cache.
///
/// Single slot: every completed refresh overwrites it. A failed refresh
/// leaves `data` untouched and only flips `last_update_success`.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorState {
    pub phase: RefreshPhase,
    pub data: Option<Arc<Telemetry>>,
    pub last_update_success: bool,
    /// Time of the last *successful* refresh.
    pub last_update_time: Option<DateTime<Utc>>,
    /// Message of the last failure, cleared on success.
    pub last_error: Option<String>,
}

impl CoordinatorState {
    fn empty() -> Self {
        Self {
            phase: RefreshPhase::Uninitialized,
            data: None,
            last_update_success: false,
            last_update_time: None,
            last_error: None,
        }
    }

    fn outcome(&self) -> Result<(), CoreError> {
        if self.last_update_success {
            Ok(())
        } else {
            Err(CoreError::UpdateFailed {
                message: self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "no successful refresh yet".into()),
            })
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polling coordinator for one vehicle.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`; readings hold clones.
/// The last handle dropped cancels the periodic task.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    name: String,
    vehicle_id: String,
    update_interval: Duration,
    /// Held for the duration of a fetch; doubles as the in-flight guard.
    client: Mutex<NiuClient>,
    state: watch::Sender<CoordinatorState>,
    /// Number of completed refresh cycles, bumped while the client lock is held.
    completed: AtomicU64,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Coordinator {
    /// Wrap a client. Does NOT fetch -- call [`start()`](Self::start) or
    /// [`refresh()`](Self::refresh).
    pub fn new(client: NiuClient, update_interval: Duration) -> Self {
        let vehicle_id = client.vehicle_id().to_owned();
        let (state, _) = watch::channel(CoordinatorState::empty());

        Self {
            inner: Arc::new(CoordinatorInner {
                name: format!("Niu Vehicle {vehicle_id}"),
                vehicle_id,
                update_interval,
                client: Mutex::new(client),
                state,
                completed: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Build the client for an entry on the host-provided HTTP session.
    pub fn from_entry(config: &EntryConfig, http: reqwest::Client) -> Result<Self, CoreError> {
        let client = NiuClient::new(&config.base_url, config.credentials.clone(), http)?;
        Ok(Self::new(client, config.scan_interval))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn vehicle_id(&self) -> &str {
        &self.inner.vehicle_id
    }

    pub fn update_interval(&self) -> Duration {
        self.inner.update_interval
    }

    // ── Cache access ─────────────────────────────────────────────

    /// Current cache snapshot (cheap: the payload is behind an `Arc`).
    pub fn state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Last successfully fetched payload, possibly stale.
    pub fn data(&self) -> Option<Arc<Telemetry>> {
        self.inner.state.borrow().data.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.state.borrow().last_update_success
    }

    /// Subscribe to completed refreshes.
    ///
    /// The receiver is marked changed once per finished refresh cycle,
    /// successful or not. Entering the `Refreshing` phase does not notify.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one refresh cycle, or join the one already in flight.
    ///
    /// A caller that arrives while another refresh holds the client waits
    /// for it and returns its outcome instead of fetching again.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.ensure_running()?;

        let seen = self.inner.completed.load(Ordering::Acquire);
        let mut client = self.inner.client.lock().await;

        if self.inner.completed.load(Ordering::Acquire) != seen {
            debug!(coordinator = %self.inner.name, "joined in-flight refresh");
            return self.inner.state.borrow().outcome();
        }
        self.ensure_running()?;

        let mut phase = PhaseGuard::enter(&self.inner.state);
        let fetched = client.fetch_vehicle_status().await;
        phase.disarm();

        let outcome = match fetched {
            Ok(payload) => {
                self.inner.state.send_modify(|s| {
                    s.phase = RefreshPhase::Updated;
                    s.data = Some(Arc::new(payload));
                    s.last_update_success = true;
                    s.last_update_time = Some(Utc::now());
                    s.last_error = None;
                });
                debug!(coordinator = %self.inner.name, "successfully updated vehicle data");
                Ok(())
            }
            Err(e) => {
                let message = format!("Error fetching data: {e}");
                warn!(coordinator = %self.inner.name, error = %e, "vehicle data update failed");
                self.inner.state.send_modify(|s| {
                    s.phase = RefreshPhase::Failed;
                    s.last_update_success = false;
                    s.last_error = Some(message.clone());
                });
                Err(CoreError::UpdateFailed { message })
            }
        };

        self.inner.completed.fetch_add(1, Ordering::Release);
        drop(client);
        outcome
    }

    /// Fire-and-log refresh for update hooks that cannot handle errors.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            debug!(coordinator = %self.inner.name, error = %e, "requested refresh failed");
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Perform the first refresh, then spawn the periodic refresh task.
    ///
    /// If the first refresh fails, the error is returned and no task is
    /// spawned; the host decides when to retry.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.refresh().await?;
        self.spawn_refresh_task().await;
        Ok(())
    }

    /// Like [`start()`](Self::start), but a failed first refresh only marks
    /// the cache unavailable and the periodic task retries it.
    ///
    /// Fails only if the coordinator is already shut down.
    pub async fn start_retrying(&self) -> Result<(), CoreError> {
        match self.refresh().await {
            Ok(()) => {}
            Err(e @ CoreError::ShutDown { .. }) => return Err(e),
            Err(e) => {
                warn!(
                    coordinator = %self.inner.name,
                    error = %e,
                    "first refresh failed, retrying on schedule"
                );
            }
        }
        self.spawn_refresh_task().await;
        Ok(())
    }

    async fn spawn_refresh_task(&self) {
        let period = self.inner.update_interval;
        if period.is_zero() {
            debug!(coordinator = %self.inner.name, "periodic refresh disabled");
            return;
        }

        let mut task = self.inner.task.lock().await;
        if task.is_none() {
            let weak = Arc::downgrade(&self.inner);
            let cancel = self.inner.cancel.clone();
            *task = Some(tokio::spawn(refresh_task(weak, period, cancel)));
            info!(
                coordinator = %self.inner.name,
                interval_secs = period.as_secs(),
                "periodic refresh started"
            );
        }
    }

    /// Stop the periodic task and refuse further refreshes.
    ///
    /// A refresh already in flight is allowed to finish; none starts after
    /// this returns.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!(coordinator = %self.inner.name, "coordinator shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown {
                vehicle_id: self.inner.vehicle_id.clone(),
            });
        }
        Ok(())
    }
}

/// Marks the cache `Refreshing` for the duration of a fetch.
///
/// Entering does not notify subscribers. If the refresh future is dropped
/// before [`disarm()`](Self::disarm), the previous phase is put back.
struct PhaseGuard<'a> {
    state: &'a watch::Sender<CoordinatorState>,
    previous: RefreshPhase,
    armed: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a watch::Sender<CoordinatorState>) -> Self {
        let mut previous = RefreshPhase::Uninitialized;
        state.send_if_modified(|s| {
            previous = s.phase;
            s.phase = RefreshPhase::Refreshing;
            false
        });
        Self {
            state,
            previous,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let previous = self.previous;
            self.state.send_if_modified(|s| {
                s.phase = previous;
                false
            });
        }
    }
}

/// Periodically refresh until cancelled or every coordinator handle is gone.
async fn refresh_task(inner: Weak<CoordinatorInner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let coordinator = Coordinator { inner };
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
    debug!("refresh task stopped");
}
