//! Automation engine: periodically evaluates every monitored device.
//!
//! Each tick walks the configured device list. For every device it fetches
//! the latest snapshot and actuator state (concurrently), folds the snapshot
//! into the [`MotionTracker`], evaluates the rules and applies the resulting
//! actions through the store and the [`AuditEmitter`].
//!
//! ## Ticks never overlap
//! [`AutomationEngine::run`] awaits each tick to completion before asking the
//! interval for the next one, and the interval skips fires it missed. A timer
//! fire that lands while a tick is still running is therefore dropped rather
//! than queued: after an overrun the interval is reset to the next fire on
//! its original grid. The rules are level-triggered, so that tick catches up.
//! Motion history is only touched between awaits on the engine's own task.
//!
//! ## Failures stay local to a device
//! Every store call is bounded by [`EngineSettings::store_timeout`]. A device
//! whose fetch or apply fails is reported in the [`TickReport`] and logged;
//! the remaining devices in the tick are processed as usual and the failed
//! device is retried on the next tick.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use safelabs_domain::actuator::ActuatorState;
use safelabs_domain::automation::{self, Action, DeviceHistory, MotionTracker, RuleInput, RuleThresholds};
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;
use safelabs_domain::time::Timestamp;

use crate::audit::AuditEmitter;
use crate::ports::{ActuatorStore, Clock, EventStore, TelemetryReader};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Time between two ticks.
    pub poll_interval: Duration,
    /// Wait before the first tick.
    pub start_delay: Duration,
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
    /// Devices to evaluate on every tick.
    pub devices: Vec<DeviceId>,
    pub rules: RuleThresholds,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            start_delay: Duration::from_secs(3),
            store_timeout: Duration::from_secs(5),
            devices: Vec::new(),
            rules: RuleThresholds::default(),
        }
    }
}

/// Store call made by the engine, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    FetchSnapshot,
    FetchActuator,
    SetActuator,
    AppendEvent,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchSnapshot => "fetch snapshot",
            Self::FetchActuator => "fetch actuator state",
            Self::SetActuator => "set actuator state",
            Self::AppendEvent => "append audit event",
        })
    }
}

/// Why a device could not be fully processed on a tick.
#[derive(Debug, thiserror::Error)]
pub enum DeviceTickError {
    /// A store call did not complete within the configured timeout.
    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: StoreOperation,
        timeout: Duration,
    },

    /// A store call returned an error.
    #[error("{operation} failed")]
    Store {
        operation: StoreOperation,
        #[source]
        source: SafeLabsError,
    },

    /// The actuator was written but its audit record was not.
    #[error("actuator set {state} but its audit record was not written")]
    PartialApply {
        state: ActuatorState,
        #[source]
        source: Box<DeviceTickError>,
    },
}

impl DeviceTickError {
    /// Whether the actuator may have changed without its audit record.
    ///
    /// True for a failed append after a successful write, and for a write
    /// that timed out, since the store may still apply it.
    #[must_use]
    pub fn may_be_partial_apply(&self) -> bool {
        matches!(
            self,
            Self::PartialApply { .. }
                | Self::Timeout {
                    operation: StoreOperation::SetActuator,
                    ..
                }
        )
    }
}

/// What happened to one device during a tick.
#[derive(Debug)]
pub enum DeviceOutcome {
    /// The device has never reported; nothing was evaluated.
    Skipped,
    /// Rules were evaluated and every resulting action was applied.
    Evaluated { applied: usize },
    /// The fetch failed, or at least one action could not be applied.
    Failed {
        applied: usize,
        errors: Vec<DeviceTickError>,
    },
}

impl DeviceOutcome {
    fn fetch_failed(err: DeviceTickError) -> Self {
        Self::Failed {
            applied: 0,
            errors: vec![err],
        }
    }
}

/// Per-device results of one tick, in device order.
#[derive(Debug, Default)]
pub struct TickReport {
    pub devices: Vec<(DeviceId, DeviceOutcome)>,
}

impl TickReport {
    /// Outcome for a given device.
    #[must_use]
    pub fn outcome(&self, device_id: &DeviceId) -> Option<&DeviceOutcome> {
        self.devices
            .iter()
            .find(|(id, _)| id == device_id)
            .map(|(_, outcome)| outcome)
    }

    /// Number of actions applied across all devices.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.devices
            .iter()
            .map(|(_, outcome)| match outcome {
                DeviceOutcome::Skipped => 0,
                DeviceOutcome::Evaluated { applied } | DeviceOutcome::Failed { applied, .. } => {
                    *applied
                }
            })
            .sum()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Skipped))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeviceOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&DeviceOutcome) -> bool) -> usize {
        self.devices.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Polling automation engine.
///
/// Owns the motion history for every monitored device; nothing outside the
/// engine can read or change it.
pub struct AutomationEngine<T, A, S, C> {
    telemetry: T,
    actuators: A,
    audit: AuditEmitter<S>,
    clock: C,
    settings: EngineSettings,
    tracker: MotionTracker,
}

impl<T, A, S, C> AutomationEngine<T, A, S, C>
where
    T: TelemetryReader,
    A: ActuatorStore,
    S: EventStore,
    C: Clock,
{
    /// Create an engine with an empty motion history.
    pub fn new(
        telemetry: T,
        actuators: A,
        audit: AuditEmitter<S>,
        clock: C,
        settings: EngineSettings,
    ) -> Self {
        Self {
            telemetry,
            actuators,
            audit,
            clock,
            settings,
            tracker: MotionTracker::new(),
        }
    }

    /// Motion history for a device, if the engine has observed it.
    #[must_use]
    pub fn history(&self, device_id: &DeviceId) -> Option<&DeviceHistory> {
        self.tracker.history(device_id)
    }

    /// Run one evaluation pass over every monitored device.
    pub async fn tick(&mut self) -> TickReport {
        let devices = self.settings.devices.clone();
        let mut report = TickReport::default();

        for device_id in devices {
            let outcome = self.process_device(&device_id).await;
            if let DeviceOutcome::Failed { errors, .. } = &outcome {
                for err in errors {
                    log_failure(&device_id, err);
                }
            }
            report.devices.push((device_id, outcome));
        }

        if !report.devices.is_empty() && report.failed() == report.devices.len() {
            tracing::warn!(
                devices = report.devices.len(),
                "every device failed this tick, store looks unreachable; idling until next tick"
            );
        }

        report
    }

    async fn process_device(&mut self, device_id: &DeviceId) -> DeviceOutcome {
        let (snapshot, actuator) = tokio::join!(
            self.guarded(
                StoreOperation::FetchSnapshot,
                self.telemetry.get_snapshot(device_id)
            ),
            self.guarded(
                StoreOperation::FetchActuator,
                self.actuators.get_state(device_id)
            ),
        );

        let snapshot = match snapshot {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(device = %device_id, "no telemetry yet, skipping");
                return DeviceOutcome::Skipped;
            }
            Err(err) => return DeviceOutcome::fetch_failed(err),
        };
        let actuator = match actuator {
            Ok(actuator) => actuator,
            Err(err) => return DeviceOutcome::fetch_failed(err),
        };

        let now = self.clock.now();
        let inactivity = self.tracker.observe(device_id, &snapshot, now);
        let actions = automation::evaluate(
            &self.settings.rules,
            &RuleInput {
                snapshot: &snapshot,
                actuator,
                inactivity,
                last_alert_at: self.tracker.last_alert_at(device_id),
                now,
            },
        );

        let mut applied = 0;
        let mut errors = Vec::new();
        for action in actions {
            match self.apply(device_id, action, now).await {
                Ok(()) => applied += 1,
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            DeviceOutcome::Evaluated { applied }
        } else {
            DeviceOutcome::Failed { applied, errors }
        }
    }

    async fn apply(
        &mut self,
        device_id: &DeviceId,
        action: Action,
        now: Timestamp,
    ) -> Result<(), DeviceTickError> {
        match action {
            Action::SetActuator { state, audit } => {
                tracing::info!(
                    device = %device_id,
                    %state,
                    details = audit.details.as_deref().unwrap_or_default(),
                    "automation switching actuator"
                );
                self.guarded(
                    StoreOperation::SetActuator,
                    self.actuators.set_state(device_id, state),
                )
                .await?;
                self.guarded(
                    StoreOperation::AppendEvent,
                    self.audit.append(device_id, audit),
                )
                .await
                .map_err(|source| DeviceTickError::PartialApply {
                    state,
                    source: Box::new(source),
                })?;
            }
            Action::Alert { audit } => {
                self.guarded(
                    StoreOperation::AppendEvent,
                    self.audit.append(device_id, audit),
                )
                .await?;
                self.tracker.record_alert(device_id, now);
            }
        }
        Ok(())
    }

    async fn guarded<R>(
        &self,
        operation: StoreOperation,
        call: impl Future<Output = Result<R, SafeLabsError>>,
    ) -> Result<R, DeviceTickError> {
        let timeout = self.settings.store_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DeviceTickError::Store { operation, source }),
            Err(_) => Err(DeviceTickError::Timeout { operation, timeout }),
        }
    }
}

impl<T, A, S, C> AutomationEngine<T, A, S, C>
where
    T: TelemetryReader + Send + Sync + 'static,
    A: ActuatorStore + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Tick forever at the configured interval.
    ///
    /// The first tick happens right after `start_delay`.
    ///
    /// # Panics
    ///
    /// Panics if `poll_interval` is zero.
    pub async fn run(mut self) {
        if !self.settings.start_delay.is_zero() {
            tokio::time::sleep(self.settings.start_delay).await;
        }

        let period = self.settings.poll_interval;
        tracing::info!(
            devices = self.settings.devices.len(),
            interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "automation engine started"
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let fired_at = interval.tick().await;
            let started = Instant::now();
            let report = self.tick().await;
            let took = started.elapsed();

            tracing::debug!(
                applied = report.applied(),
                skipped = report.skipped(),
                failed = report.failed(),
                took_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
                "tick complete"
            );

            let finished = Instant::now();
            if finished >= fired_at + period {
                let next = next_fire_after(fired_at, period, finished);
                interval.reset_at(next);
                tracing::warn!(
                    took_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
                    next_in_ms = u64::try_from((next - finished).as_millis()).unwrap_or(u64::MAX),
                    "tick overran the poll interval, missed timer fires dropped"
                );
            }
        }
    }

    /// Run the engine as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// First fire on the `fired_at + k * period` grid strictly after `now`.
fn next_fire_after(fired_at: Instant, period: Duration, now: Instant) -> Instant {
    let mut next = fired_at + period;
    while next <= now {
        next += period;
    }
    next
}

fn log_failure(device_id: &DeviceId, err: &DeviceTickError) {
    match err {
        DeviceTickError::PartialApply { state, source } => tracing::error!(
            device = %device_id,
            %state,
            error = %source,
            "actuator changed without an audit record"
        ),
        DeviceTickError::Timeout {
            operation: StoreOperation::SetActuator,
            ..
        } => tracing::error!(
            device = %device_id,
            error = %err,
            "actuator write timed out and may still land without an audit record"
        ),
        DeviceTickError::Store { operation, source } => tracing::warn!(
            device = %device_id,
            %operation,
            error = %source,
            "device tick failed, retrying next tick"
        ),
        DeviceTickError::Timeout { .. } => tracing::warn!(
            device = %device_id,
            error = %err,
            "device tick timed out, retrying next tick"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safelabs_domain::audit::{AuditEvent, AuditEventType, AuditRecord};
    use safelabs_domain::id::EventId;
    use safelabs_domain::telemetry::DeviceSnapshot;
    use safelabs_domain::time::from_millis;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    // ── In-memory store backing all three ports ────────────────────

    #[derive(Default)]
    struct FakeStore {
        snapshots: Mutex<HashMap<DeviceId, DeviceSnapshot>>,
        actuators: Mutex<HashMap<DeviceId, ActuatorState>>,
        events: Mutex<Vec<AuditEvent>>,
        failing_snapshots: Mutex<HashSet<DeviceId>>,
        hanging_snapshots: Mutex<HashSet<DeviceId>>,
        fail_appends: Mutex<HashSet<AuditEventType>>,
        fail_actuator_writes: Mutex<bool>,
        hang_actuator_writes: Mutex<bool>,
        snapshot_delay: Mutex<Option<Duration>>,
        snapshot_fetches: Mutex<Vec<Instant>>,
    }

    impl FakeStore {
        fn report(&self, device: &DeviceId, snapshot: DeviceSnapshot) {
            self.snapshots
                .lock()
                .unwrap()
                .insert(device.clone(), snapshot);
        }

        fn switch(&self, device: &DeviceId, state: ActuatorState) {
            self.actuators
                .lock()
                .unwrap()
                .insert(device.clone(), state);
        }

        fn actuator(&self, device: &DeviceId) -> ActuatorState {
            self.actuators
                .lock()
                .unwrap()
                .get(device)
                .copied()
                .unwrap_or_default()
        }

        fn events_of(&self, device: &DeviceId, kind: AuditEventType) -> Vec<AuditEvent> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.device_id == device && e.event_type() == kind)
                .cloned()
                .collect()
        }
    }

    impl TelemetryReader for FakeStore {
        async fn get_snapshot(
            &self,
            device_id: &DeviceId,
        ) -> Result<Option<DeviceSnapshot>, SafeLabsError> {
            self.snapshot_fetches.lock().unwrap().push(Instant::now());
            let delay = *self.snapshot_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let hang = self.hanging_snapshots.lock().unwrap().contains(device_id);
            if hang {
                std::future::pending::<()>().await;
            }
            if self.failing_snapshots.lock().unwrap().contains(device_id) {
                return Err(SafeLabsError::Storage("connection reset".into()));
            }
            Ok(self.snapshots.lock().unwrap().get(device_id).cloned())
        }
    }

    impl ActuatorStore for FakeStore {
        async fn get_state(&self, device_id: &DeviceId) -> Result<ActuatorState, SafeLabsError> {
            Ok(self.actuator(device_id))
        }

        async fn set_state(
            &self,
            device_id: &DeviceId,
            state: ActuatorState,
        ) -> Result<(), SafeLabsError> {
            if *self.fail_actuator_writes.lock().unwrap() {
                return Err(SafeLabsError::Storage("write rejected".into()));
            }
            let hang = *self.hang_actuator_writes.lock().unwrap();
            if hang {
                std::future::pending::<()>().await;
            }
            self.switch(device_id, state);
            Ok(())
        }
    }

    impl EventStore for FakeStore {
        async fn append(
            &self,
            device_id: &DeviceId,
            record: AuditRecord,
        ) -> Result<AuditEvent, SafeLabsError> {
            if self.fail_appends.lock().unwrap().contains(&record.event_type) {
                return Err(SafeLabsError::Storage("append rejected".into()));
            }
            let event = AuditEvent {
                id: EventId::new(),
                device_id: device_id.clone(),
                record,
                timestamp: safelabs_domain::time::now(),
            };
            self.events.lock().unwrap().push(event.clone());
            Ok(event)
        }

        async fn find_by_device(
            &self,
            device_id: &DeviceId,
            limit: usize,
        ) -> Result<Vec<AuditEvent>, SafeLabsError> {
            let events = self.events.lock().unwrap();
            let matching: Vec<_> = events
                .iter()
                .filter(|e| &e.device_id == device_id)
                .cloned()
                .collect();
            let skip = matching.len().saturating_sub(limit);
            Ok(matching.into_iter().skip(skip).collect())
        }
    }

    // ── Manually driven clock ──────────────────────────────────────

    struct ManualClock(Mutex<Timestamp>);

    impl ManualClock {
        fn at(ms: i64) -> Self {
            Self(Mutex::new(epoch(ms)))
        }

        fn set(&self, ms: i64) {
            *self.0.lock().unwrap() = epoch(ms);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    // ── Clock following tokio's (pausable) time ────────────────────

    struct TokioClock {
        origin: Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> Timestamp {
            let elapsed = self.origin.elapsed();
            epoch(i64::try_from(elapsed.as_millis()).unwrap())
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    type TestEngine =
        AutomationEngine<Arc<FakeStore>, Arc<FakeStore>, Arc<FakeStore>, Arc<ManualClock>>;

    fn epoch(ms: i64) -> Timestamp {
        from_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn device(name: &str) -> DeviceId {
        DeviceId::new(name).unwrap()
    }

    fn settings(devices: &[&DeviceId]) -> EngineSettings {
        EngineSettings {
            poll_interval: Duration::from_secs(10),
            start_delay: Duration::ZERO,
            store_timeout: Duration::from_millis(50),
            devices: devices.iter().map(|d| (*d).clone()).collect(),
            rules: RuleThresholds::default(),
        }
    }

    fn make_engine(
        devices: &[&DeviceId],
    ) -> (TestEngine, Arc<FakeStore>, Arc<ManualClock>) {
        let store = Arc::new(FakeStore::default());
        let clock = Arc::new(ManualClock::at(0));
        let engine = AutomationEngine::new(
            Arc::clone(&store),
            Arc::clone(&store),
            AuditEmitter::new(Arc::clone(&store)),
            Arc::clone(&clock),
            settings(devices),
        );
        (engine, store, clock)
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_switch_off_once_after_forty_seconds_without_motion() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);

        for ms in [0, 10_000, 20_000, 30_000, 40_000] {
            clock.set(ms);
            engine.tick().await;
        }

        let auto = store.events_of(&d1, AuditEventType::AutoAction);
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].record.details.as_deref(), Some("40s without motion"));
        assert_eq!(store.actuator(&d1), ActuatorState::Off);
    }

    #[tokio::test]
    async fn should_not_repeat_auto_off_while_inactivity_persists() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);

        for tick in 0..20 {
            clock.set(tick * 10_000);
            engine.tick().await;
        }

        assert_eq!(store.events_of(&d1, AuditEventType::AutoAction).len(), 1);
    }

    #[tokio::test]
    async fn should_never_auto_off_when_actuator_is_off() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));

        for tick in 0..50 {
            clock.set(tick * 10_000);
            let report = engine.tick().await;
            assert!(matches!(
                report.outcome(&d1),
                Some(DeviceOutcome::Evaluated { applied: 0 })
            ));
        }

        assert!(store.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_alert_once_per_cooldown_window() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(35.0, false));

        for ms in [0, 60_000, 360_000] {
            clock.set(ms);
            engine.tick().await;
        }

        let alerts = store.events_of(&d1, AuditEventType::CriticalAlert);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].record.message, "Critical Temperature: 35°C");
        assert_eq!(engine.history(&d1).unwrap().last_alert_at, Some(epoch(360_000)));
    }

    #[tokio::test]
    async fn should_produce_at_most_one_alert_across_ticks_within_cooldown() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(31.0, false));

        for tick in 0..30 {
            clock.set(tick * 10_000);
            engine.tick().await;
        }
        assert_eq!(store.events_of(&d1, AuditEventType::CriticalAlert).len(), 1);

        clock.set(300_001);
        engine.tick().await;
        assert_eq!(store.events_of(&d1, AuditEventType::CriticalAlert).len(), 2);
    }

    #[tokio::test]
    async fn should_restart_inactivity_from_latest_motion() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.switch(&d1, ActuatorState::On);
        store.report(&d1, DeviceSnapshot::new(22.0, false));

        clock.set(0);
        engine.tick().await;

        store.report(&d1, DeviceSnapshot::new(22.0, true));
        clock.set(29_999);
        engine.tick().await;

        store.report(&d1, DeviceSnapshot::new(22.0, false));
        clock.set(31_000);
        engine.tick().await;
        clock.set(59_999);
        engine.tick().await;

        assert!(store.events_of(&d1, AuditEventType::AutoAction).is_empty());
        assert_eq!(store.actuator(&d1), ActuatorState::On);

        clock.set(60_000);
        engine.tick().await;
        assert_eq!(store.events_of(&d1, AuditEventType::AutoAction).len(), 1);
    }

    #[tokio::test]
    async fn should_skip_device_that_never_reported() {
        let silent = device("silent");
        let (mut engine, store, clock) = make_engine(&[&silent]);
        store.switch(&silent, ActuatorState::On);

        for tick in 0..10 {
            clock.set(tick * 10_000);
            let report = engine.tick().await;
            assert!(matches!(report.outcome(&silent), Some(DeviceOutcome::Skipped)));
        }

        assert!(engine.history(&silent).is_none());
        assert!(store.events.lock().unwrap().is_empty());
        assert_eq!(store.actuator(&silent), ActuatorState::On);
    }

    #[tokio::test]
    async fn should_keep_processing_other_devices_when_one_fails() {
        let broken = device("broken");
        let healthy = device("healthy");
        let (mut engine, store, clock) = make_engine(&[&broken, &healthy]);
        store.report(&broken, DeviceSnapshot::new(40.0, false));
        store.report(&healthy, DeviceSnapshot::new(40.0, false));
        store.failing_snapshots.lock().unwrap().insert(broken.clone());

        clock.set(0);
        let report = engine.tick().await;

        assert!(matches!(
            report.outcome(&broken),
            Some(DeviceOutcome::Failed { applied: 0, errors }) if matches!(
                errors[0],
                DeviceTickError::Store { operation: StoreOperation::FetchSnapshot, .. }
            )
        ));
        assert!(matches!(
            report.outcome(&healthy),
            Some(DeviceOutcome::Evaluated { applied: 1 })
        ));
        assert_eq!(store.events_of(&healthy, AuditEventType::CriticalAlert).len(), 1);
        assert!(engine.history(&broken).is_none());
    }

    #[tokio::test]
    async fn should_time_out_hung_store_call_without_blocking_other_devices() {
        let hung = device("hung");
        let healthy = device("healthy");
        let (mut engine, store, clock) = make_engine(&[&hung, &healthy]);
        store.report(&hung, DeviceSnapshot::new(22.0, false));
        store.report(&healthy, DeviceSnapshot::new(35.0, false));
        store.hanging_snapshots.lock().unwrap().insert(hung.clone());

        clock.set(0);
        let report = engine.tick().await;

        assert!(matches!(
            report.outcome(&hung),
            Some(DeviceOutcome::Failed { errors, .. }) if matches!(
                errors[0],
                DeviceTickError::Timeout { operation: StoreOperation::FetchSnapshot, .. }
            )
        ));
        assert_eq!(store.events_of(&healthy, AuditEventType::CriticalAlert).len(), 1);
    }

    #[tokio::test]
    async fn should_report_partial_apply_when_audit_fails_after_actuator_write() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);
        store
            .fail_appends
            .lock()
            .unwrap()
            .insert(AuditEventType::AutoAction);

        clock.set(0);
        engine.tick().await;
        clock.set(31_000);
        let report = engine.tick().await;

        assert!(matches!(
            report.outcome(&d1),
            Some(DeviceOutcome::Failed { applied: 0, errors }) if matches!(
                errors[0],
                DeviceTickError::PartialApply { state: ActuatorState::Off, .. }
            )
        ));
        assert_eq!(store.actuator(&d1), ActuatorState::Off);
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_not_audit_when_actuator_write_fails() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(35.0, false));
        store.switch(&d1, ActuatorState::On);
        *store.fail_actuator_writes.lock().unwrap() = true;

        clock.set(0);
        engine.tick().await;
        clock.set(31_000);
        let report = engine.tick().await;

        assert!(matches!(
            report.outcome(&d1),
            Some(DeviceOutcome::Failed { applied: 0, errors }) if matches!(
                errors[0],
                DeviceTickError::Store { operation: StoreOperation::SetActuator, .. }
            )
        ));
        assert!(store.events_of(&d1, AuditEventType::AutoAction).is_empty());
        assert_eq!(store.actuator(&d1), ActuatorState::On);
        // The alert raised on the first tick is still the only one.
        assert_eq!(store.events_of(&d1, AuditEventType::CriticalAlert).len(), 1);
    }

    #[tokio::test]
    async fn should_retry_alert_next_tick_when_append_fails() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(35.0, false));
        store
            .fail_appends
            .lock()
            .unwrap()
            .insert(AuditEventType::CriticalAlert);

        clock.set(0);
        engine.tick().await;
        assert_eq!(engine.history(&d1).unwrap().last_alert_at, None);

        store.fail_appends.lock().unwrap().clear();
        clock.set(10_000);
        engine.tick().await;

        assert_eq!(store.events_of(&d1, AuditEventType::CriticalAlert).len(), 1);
        assert_eq!(engine.history(&d1).unwrap().last_alert_at, Some(epoch(10_000)));
    }

    #[tokio::test]
    async fn should_switch_off_again_right_away_when_turned_back_on_without_motion() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);

        for ms in [0, 10_000, 20_000, 30_000, 40_000] {
            clock.set(ms);
            engine.tick().await;
        }
        store.switch(&d1, ActuatorState::On);
        clock.set(50_000);
        engine.tick().await;

        assert_eq!(store.events_of(&d1, AuditEventType::AutoAction).len(), 2);
        assert_eq!(store.actuator(&d1), ActuatorState::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn should_tick_on_interval_when_running() {
        let d1 = device("d1");
        let store = Arc::new(FakeStore::default());
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);

        let engine = AutomationEngine::new(
            Arc::clone(&store),
            Arc::clone(&store),
            AuditEmitter::new(Arc::clone(&store)),
            TokioClock {
                origin: Instant::now(),
            },
            settings(&[&d1]),
        );
        let handle = engine.spawn();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(store.actuator(&d1), ActuatorState::On);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.actuator(&d1), ActuatorState::Off);
        assert_eq!(store.events_of(&d1, AuditEventType::AutoAction).len(), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_drop_missed_fires_when_tick_overruns_interval() {
        let d1 = device("d1");
        let store = Arc::new(FakeStore::default());
        store.report(&d1, DeviceSnapshot::new(22.0, true));
        *store.snapshot_delay.lock().unwrap() = Some(Duration::from_secs(25));

        let origin = Instant::now();
        let engine = AutomationEngine::new(
            Arc::clone(&store),
            Arc::clone(&store),
            AuditEmitter::new(Arc::clone(&store)),
            TokioClock { origin },
            EngineSettings {
                store_timeout: Duration::from_secs(60),
                ..settings(&[&d1])
            },
        );
        let handle = engine.spawn();

        tokio::time::sleep(Duration::from_secs(80)).await;
        handle.abort();

        let starts: Vec<u64> = store
            .snapshot_fetches
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(origin).as_secs())
            .collect();
        assert_eq!(starts, [0, 30, 60]);
    }

    #[test]
    fn should_pick_next_fire_on_original_grid() {
        let fired_at = Instant::now();
        let period = Duration::from_secs(10);

        assert_eq!(
            next_fire_after(fired_at, period, fired_at + Duration::from_secs(25)),
            fired_at + Duration::from_secs(30)
        );
        assert_eq!(
            next_fire_after(fired_at, period, fired_at + Duration::from_secs(20)),
            fired_at + Duration::from_secs(30)
        );
        assert_eq!(
            next_fire_after(fired_at, period, fired_at + Duration::from_secs(10)),
            fired_at + Duration::from_secs(20)
        );
    }

    #[tokio::test]
    async fn should_flag_timed_out_actuator_write_as_possible_partial_apply() {
        let d1 = device("d1");
        let (mut engine, store, clock) = make_engine(&[&d1]);
        store.report(&d1, DeviceSnapshot::new(22.0, false));
        store.switch(&d1, ActuatorState::On);
        engine.tick().await;
        *store.hang_actuator_writes.lock().unwrap() = true;

        clock.set(40_000);
        let report = engine.tick().await;

        let Some(DeviceOutcome::Failed { applied: 0, errors }) = report.outcome(&d1) else {
            panic!("expected failed outcome, got {:?}", report.outcome(&d1));
        };
        assert!(matches!(
            errors[0],
            DeviceTickError::Timeout {
                operation: StoreOperation::SetActuator,
                ..
            }
        ));
        assert!(errors[0].may_be_partial_apply());
        assert!(store.events_of(&d1, AuditEventType::AutoAction).is_empty());
    }

    #[test]
    fn should_not_flag_fetch_timeout_as_partial_apply() {
        let err = DeviceTickError::Timeout {
            operation: StoreOperation::FetchSnapshot,
            timeout: Duration::from_millis(50),
        };
        assert!(!err.may_be_partial_apply());
    }
}
