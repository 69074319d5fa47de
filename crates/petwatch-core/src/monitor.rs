// ── Monitor ──
//
// Full lifecycle of the polling engine: main poll interval, per-device
// quick rechecks while an escape is suspected, user-issued writes, and the
// re-authentication policy. Everything that mutates escape state or the
// registry runs on one task, so a poll and a write never interleave.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::escape::{EscapeStatus, EscapeTracker, Evaluation, Transition};
use crate::model::{DeviceId, DeviceSnapshot, PetMode, TrackedDevice};
use crate::registry::DeviceRegistry;
use crate::service::PetService;
use crate::sink::AccessorySink;

const COMMAND_CHANNEL_SIZE: usize = 16;
const MIN_INTERVAL: Duration = Duration::from_secs(1);

// ── Commands ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    PollNow,
    SetLight { id: DeviceId, on: bool },
    SetLostMode { id: DeviceId, lost: bool },
}

struct CommandEnvelope {
    command: Command,
    response_tx: oneshot::Sender<Result<(), CoreError>>,
}

/// Which poll is running; decides how the fetched list is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    /// Reconcile the whole registry against the list.
    All,
    /// Quick recheck: update only this device.
    Device(DeviceId),
}

// ── Monitor ──────────────────────────────────────────────────────

/// Handle to a running polling engine.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Created with
/// [`start()`](Self::start), which spawns the control task; stopped with
/// [`shutdown()`](Self::shutdown).
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    registry: Arc<DeviceRegistry>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    pending: watch::Receiver<BTreeSet<DeviceId>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        // Last handle gone: stop the control task and its timers.
        self.cancel.cancel();
    }
}

impl Monitor {
    /// Spawn the control task. The first main poll runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S: PetService>(
        service: Arc<S>,
        sink: Arc<dyn AccessorySink>,
        config: MonitorConfig,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (recheck_tx, recheck_rx) = mpsc::unbounded_channel();
        let (pending_tx, pending) = watch::channel(BTreeSet::new());
        let cancel = CancellationToken::new();

        info!(
            polling_secs = config.polling_interval.as_secs(),
            confirmations = config.confirmations(),
            recheck_secs = config.escape_check_interval.as_secs(),
            "starting monitor"
        );

        let engine = Engine {
            service,
            sink,
            config,
            registry: Arc::clone(&registry),
            devices: HashMap::new(),
            recheck_tx,
            pending: pending_tx,
            cancel: cancel.clone(),
            next_generation: 0,
        };
        let task = tokio::spawn(engine.run(command_rx, recheck_rx));

        Self {
            inner: Arc::new(MonitorInner {
                registry,
                command_tx,
                pending,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Access the device registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn devices(&self) -> Arc<Vec<Arc<TrackedDevice>>> {
        self.inner.registry.snapshot()
    }

    /// Subscribe to registry snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<TrackedDevice>>>> {
        self.inner.registry.subscribe()
    }

    pub fn escape_status(&self, id: &DeviceId) -> Option<EscapeStatus> {
        self.inner.registry.get(id).map(|d| d.escape)
    }

    /// Devices with an outstanding quick recheck.
    pub fn pending_rechecks(&self) -> BTreeSet<DeviceId> {
        self.inner.pending.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run a main poll now, outside the regular cadence.
    ///
    /// Poll failures are absorbed by the failure policy, so this only
    /// fails if the monitor has stopped.
    pub async fn poll_now(&self) -> Result<(), CoreError> {
        self.execute(Command::PollNow).await
    }

    /// Turn a collar light on or off. The registry reflects the new value
    /// only once the service acknowledged the write.
    pub async fn set_light(&self, id: &DeviceId, on: bool) -> Result<(), CoreError> {
        self.execute(Command::SetLight { id: id.clone(), on }).await
    }

    /// Switch lost-dog mode on or off.
    pub async fn set_lost_mode(&self, id: &DeviceId, lost: bool) -> Result<(), CoreError> {
        self.execute(Command::SetLostMode {
            id: id.clone(),
            lost,
        })
        .await
    }

    async fn execute(&self, command: Command) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::MonitorStopped);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::MonitorStopped)?;

        rx.await.map_err(|_| CoreError::MonitorStopped)?
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop polling and cancel every outstanding quick recheck.
    ///
    /// Waits for the control task to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "monitor task ended abnormally");
            }
        }
    }
}

// ── Engine (control path) ────────────────────────────────────────

/// Per-device state owned by the control path.
struct DeviceState {
    tracker: EscapeTracker,
    /// Pending quick recheck, cancelled on safe reading, removal, or shutdown.
    recheck: Option<PendingRecheck>,
}

struct PendingRecheck {
    generation: u64,
    token: CancellationToken,
}

/// Sent by a recheck timer when it fires. The generation tells a timer
/// that was superseded apart from the one currently scheduled.
#[derive(Debug)]
struct RecheckDue {
    id: DeviceId,
    generation: u64,
}

impl DeviceState {
    fn new(threshold: u32) -> Self {
        Self {
            tracker: EscapeTracker::new(threshold),
            recheck: None,
        }
    }

    fn cancel_recheck(&mut self) -> bool {
        match self.recheck.take() {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    fn recheck_pending(&self) -> bool {
        self.recheck.as_ref().is_some_and(|r| !r.token.is_cancelled())
    }

    /// Whether `generation` names the live timer for this device.
    fn is_current(&self, generation: u64) -> bool {
        self.recheck
            .as_ref()
            .is_some_and(|r| r.generation == generation && !r.token.is_cancelled())
    }
}

struct Engine<S: PetService> {
    service: Arc<S>,
    sink: Arc<dyn AccessorySink>,
    config: MonitorConfig,
    registry: Arc<DeviceRegistry>,
    devices: HashMap<DeviceId, DeviceState>,
    recheck_tx: mpsc::UnboundedSender<RecheckDue>,
    pending: watch::Sender<BTreeSet<DeviceId>>,
    cancel: CancellationToken,
    next_generation: u64,
}

impl<S: PetService> Engine<S> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<CommandEnvelope>,
        mut rechecks: mpsc::UnboundedReceiver<RecheckDue>,
    ) {
        let mut interval = tokio::time::interval(self.config.polling_interval.max(MIN_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(envelope) = commands.recv() => {
                    let result = self.route_command(envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                }
                Some(due) = rechecks.recv() => self.quick_recheck(due).await,
                _ = interval.tick() => self.poll(PollTarget::All).await,
            }
        }

        self.stop_timers();
        debug!("monitor stopped");
    }

    // ── Polling ──────────────────────────────────────────────────

    async fn poll(&mut self, target: PollTarget) {
        let cancel = self.cancel.clone();
        let fetched = tokio::select! {
            () = cancel.cancelled() => None,
            fetched = self.fetch_with_retry(&target) => fetched,
        };
        let Some(fetched) = fetched else {
            return;
        };

        let (ignored, devices): (Vec<_>, Vec<_>) = fetched
            .into_iter()
            .partition(|d| self.config.is_ignored(&d.name));
        if !ignored.is_empty() {
            debug!(ignored = ignored.len(), "skipping ignored pets");
        }
        for device in &ignored {
            self.service.forget(&device.id);
        }

        match target {
            PollTarget::All => self.apply_all(devices),
            PollTarget::Device(id) => self.apply_device(&id, devices),
        }
    }

    /// Fetch the device list under the failure policy. `None` means the
    /// poll failed and state must be left untouched.
    async fn fetch_with_retry(&self, target: &PollTarget) -> Option<Vec<DeviceSnapshot>> {
        match self.service.list_devices().await {
            Ok(devices) => Some(devices),
            Err(e) if e.is_auth() => {
                warn!(error = %e, ?target, "session rejected, re-authenticating");
                if let Err(login_err) = self.service.login().await {
                    error!(error = %login_err, "re-authentication failed, keeping last known state");
                    return None;
                }
                match self.service.list_devices().await {
                    Ok(devices) => Some(devices),
                    Err(retry_err) => {
                        log_poll_failure(&retry_err, target, true);
                        None
                    }
                }
            }
            Err(e) => {
                log_poll_failure(&e, target, false);
                None
            }
        }
    }

    fn apply_all(&mut self, devices: Vec<DeviceSnapshot>) {
        let incoming: HashSet<DeviceId> = devices.iter().map(|d| d.id.clone()).collect();
        for stale in self.registry.missing_from(&incoming) {
            self.remove_device(&stale);
        }
        // Escape state can outlive a registry entry only if an earlier
        // apply was interrupted; drop any such leftovers too.
        let orphaned: Vec<DeviceId> = self
            .devices
            .keys()
            .filter(|id| !incoming.contains(*id))
            .cloned()
            .collect();
        for id in orphaned {
            self.remove_device(&id);
        }

        let count = devices.len();
        for snapshot in devices {
            self.observe(snapshot);
        }
        self.registry.mark_refreshed();
        debug!(count, "updated collars");
    }

    fn apply_device(&mut self, id: &DeviceId, devices: Vec<DeviceSnapshot>) {
        match devices.into_iter().find(|d| &d.id == id) {
            Some(snapshot) => self.observe(snapshot),
            None => {
                info!(device = %id, "device no longer reported, dropping it");
                self.remove_device(id);
            }
        }
    }

    /// Run the escape tracker on a fresh snapshot, publish both, and
    /// notify the sink.
    fn observe(&mut self, snapshot: DeviceSnapshot) {
        let id = snapshot.id.clone();
        let threshold = self.config.confirmations();
        let state = self
            .devices
            .entry(id.clone())
            .or_insert_with(|| DeviceState::new(threshold));

        let eval = state.tracker.observe(snapshot.is_escaped());

        if eval.recheck {
            if !state.recheck_pending() {
                self.next_generation += 1;
                let due = RecheckDue {
                    id: id.clone(),
                    generation: self.next_generation,
                };
                state.recheck = Some(PendingRecheck {
                    generation: due.generation,
                    token: spawn_recheck(
                        self.recheck_tx.clone(),
                        &self.cancel,
                        self.config.escape_check_interval.max(MIN_INTERVAL),
                        due,
                    ),
                });
            }
        } else {
            state.cancel_recheck();
        }
        self.publish_pending();

        let is_new = self.registry.upsert(TrackedDevice {
            snapshot: snapshot.clone(),
            escape: eval.status,
        });

        if is_new {
            info!(device = %id, name = %snapshot.name, "discovered collar");
            self.sink.device_added(&snapshot);
        }
        self.sink.snapshot_updated(&snapshot, eval.status);
        self.report_transition(&snapshot, eval);
    }

    fn report_transition(&self, snapshot: &DeviceSnapshot, eval: Evaluation) {
        let Some(transition) = eval.transition else {
            return;
        };
        let id = &snapshot.id;
        match transition {
            Transition::Suspected => {
                info!(
                    device = %id,
                    name = %snapshot.name,
                    area = ?snapshot.location.area_name,
                    "outside safe zones and alone, scheduling recheck"
                );
            }
            Transition::Confirmed => {
                warn!(
                    device = %id,
                    name = %snapshot.name,
                    area = ?snapshot.location.area_name,
                    "ESCAPE ALERT: outside safe zones and alone"
                );
                self.sink.escape_confirmed(id);
            }
            Transition::Cleared => {
                info!(
                    device = %id,
                    name = %snapshot.name,
                    place = ?snapshot.safe_place(),
                    companion = ?snapshot.companion,
                    "escape alert cleared"
                );
                self.sink.escape_cleared(id);
            }
            Transition::Recovered => {
                info!(device = %id, name = %snapshot.name, "escape suspicion resolved");
            }
        }
    }

    // ── Quick rechecks ───────────────────────────────────────────

    async fn quick_recheck(&mut self, due: RecheckDue) {
        let RecheckDue { id, generation } = due;
        // The timer has fired; discard its handle so the evaluation below
        // may schedule the next one.
        let live = match self.devices.get_mut(&id) {
            Some(state) if state.is_current(generation) => {
                state.recheck = None;
                true
            }
            _ => false,
        };
        self.publish_pending();
        if !live {
            debug!(device = %id, generation, "stale recheck ignored");
            return;
        }

        debug!(device = %id, "quick recheck");
        self.poll(PollTarget::Device(id)).await;
    }

    fn remove_device(&mut self, id: &DeviceId) {
        if let Some(mut state) = self.devices.remove(id) {
            if state.cancel_recheck() {
                debug!(device = %id, "cancelled pending recheck");
            }
        }
        self.publish_pending();
        self.service.forget(id);
        if self.registry.remove(id).is_some() {
            info!(device = %id, "removing collar no longer on the account");
            self.sink.device_removed(id);
        }
    }

    fn stop_timers(&mut self) {
        for state in self.devices.values_mut() {
            state.cancel_recheck();
        }
        self.publish_pending();
    }

    fn publish_pending(&self) {
        let pending: BTreeSet<DeviceId> = self
            .devices
            .iter()
            .filter(|(_, s)| s.recheck_pending())
            .map(|(id, _)| id.clone())
            .collect();
        self.pending.send_if_modified(|current| {
            if *current == pending {
                false
            } else {
                *current = pending;
                true
            }
        });
    }

    // ── Writes ───────────────────────────────────────────────────

    async fn route_command(&mut self, command: Command) -> Result<(), CoreError> {
        match command {
            Command::PollNow => {
                self.poll(PollTarget::All).await;
                Ok(())
            }
            Command::SetLight { id, on } => self.write(&id, Write::Light(on)).await,
            Command::SetLostMode { id, lost } => self.write(&id, Write::LostMode(lost)).await,
        }
    }

    /// Issue a write, retrying once after re-login if the session was
    /// rejected, then apply it to the stored snapshot.
    async fn write(&self, id: &DeviceId, write: Write) -> Result<(), CoreError> {
        let device = self
            .registry
            .get(id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_string(),
            })?;
        let module_id = device.snapshot.module_id.as_str();

        let result = match self.send_write(module_id, write).await {
            Err(e) if e.is_auth() => {
                warn!(device = %id, error = %e, "write rejected, re-authenticating");
                self.service.login().await?;
                self.send_write(module_id, write).await
            }
            other => other,
        };
        if let Err(e) = result {
            error!(device = %id, ?write, error = %e, "collar write failed");
            return Err(e);
        }

        let mut snapshot = device.snapshot.clone();
        write.apply(&mut snapshot);
        self.registry.upsert(TrackedDevice {
            snapshot: snapshot.clone(),
            escape: device.escape,
        });
        self.sink.snapshot_updated(&snapshot, device.escape);
        info!(device = %id, ?write, "collar updated");
        Ok(())
    }

    async fn send_write(&self, module_id: &str, write: Write) -> Result<(), CoreError> {
        match write {
            Write::Light(on) => self.service.set_light(module_id, on).await,
            Write::LostMode(lost) => self.service.set_lost_mode(module_id, lost).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Write {
    Light(bool),
    LostMode(bool),
}

impl Write {
    fn apply(self, snapshot: &mut DeviceSnapshot) {
        match self {
            Self::Light(on) => snapshot.light_on = on,
            Self::LostMode(lost) => {
                snapshot.mode = if lost { PetMode::LostDog } else { PetMode::Normal };
            }
        }
    }
}

fn log_poll_failure(err: &CoreError, target: &PollTarget, after_relogin: bool) {
    if err.is_transient() {
        debug!(error = %err, ?target, "service busy, skipping this poll");
    } else if err.is_auth() {
        error!(error = %err, ?target, after_relogin, "authentication failed, keeping last known state");
    } else {
        error!(error = ?err, ?target, after_relogin, "poll failed, keeping last known state");
    }
}

/// Spawn a one-shot timer that reports `due` on `tx` after `delay` unless
/// cancelled. The returned token is a child of `parent`, so shutting the
/// monitor down cancels it as well.
fn spawn_recheck(
    tx: mpsc::UnboundedSender<RecheckDue>,
    parent: &CancellationToken,
    delay: Duration,
    due: RecheckDue,
) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = timer.cancelled() => {}
            () = tokio::time::sleep(delay) => {
                let _ = tx.send(due);
            }
        }
    });
    token
}
