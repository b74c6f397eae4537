//! The routine scheduler
//!
//! A [`Scheduler`] is a cheap, clonable view onto shared scheduler state.
//! Every scheduler comes as a pair of lanes sharing one set of buckets: the
//! main lane, advanced by [`Scheduler::update`], and the fixed-step lane,
//! advanced by [`Scheduler::fixed_update`]. Each lane keeps its own clock.
//!
//! A main-lane pass runs, in order: the pre-update hooks, the next-tick
//! bucket, the timed queue (bounded to the members present when the pass
//! began, in due-time order), the end-of-pass bucket, then the post-update
//! hooks. A fixed-step pass drives only the fixed-step bucket.
//!
//! All bucket iteration works on snapshots, so routine bodies may start or
//! stop routines on their own scheduler mid-pass.

mod step;

use crate::buckets::Buckets;
use crate::context::{self, UpdateScope};
use crate::events::SchedulerEvents;
use crate::frame::Resumable;
use crate::handle::RoutineHandle;
use crate::record::{DebugInfo, FaultHandler, RecordInit, RoutineRecord};
use crate::source::Source;
use crate::telemetry::{MetricsSnapshot, SchedulerTelemetry};
use crate::waitable::WaitableAdapter;
use chrono::Utc;
use routine_types::{
    BucketKind, Clock, FaultResolution, InactivePolicy, Lane, RoutineError, RoutineFault,
    RoutineId, RoutineResult, SchedulerConfig, SchedulerStats,
};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;
use std::time::Duration;

/// State shared by both lanes of a scheduler
pub(crate) struct Core {
    config: SchedulerConfig,
    buckets: RefCell<Buckets>,
    main_clock: RefCell<Clock>,
    fixed_clock: RefCell<Clock>,
    /// Lane currently mid-update; covers both lanes
    updating: Cell<Option<Lane>>,
    next_id: Cell<u64>,
    events: SchedulerEvents,
    adapters: RefCell<Vec<Rc<dyn WaitableAdapter>>>,
    telemetry: SchedulerTelemetry,
}

impl Core {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            buckets: RefCell::new(Buckets::with_capacity(config.initial_bucket_capacity)),
            main_clock: RefCell::new(Clock::new(config.time_scale)),
            fixed_clock: RefCell::new(Clock::new(config.time_scale)),
            updating: Cell::new(None),
            next_id: Cell::new(1),
            events: SchedulerEvents::default(),
            adapters: RefCell::new(Vec::new()),
            telemetry: SchedulerTelemetry::new(&config.telemetry),
            config,
        }
    }

    fn clock(&self, lane: Lane) -> &RefCell<Clock> {
        match lane {
            Lane::Main => &self.main_clock,
            Lane::FixedStep => &self.fixed_clock,
        }
    }

    /// Main-lane elapsed time; due times are always measured against it
    pub(crate) fn main_elapsed_ms(&self) -> u64 {
        self.main_clock.borrow().elapsed_ms()
    }

    fn allocate_id(&self) -> RoutineId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        RoutineId::new(id)
    }

    /// Finish a routine: take it out of its bucket, drop its frames and fire
    /// the stop notification. Returns `false` if it had already finished.
    pub(crate) fn retire(&self, handle: &RoutineHandle) -> bool {
        if !handle.record().mark_finished() {
            return false;
        }
        let bucket = self.buckets.borrow_mut().remove(handle);
        handle.record().clear();

        tracing::trace!(routine = %handle.id(), ?bucket, "Routine removed");
        self.telemetry.routine_stopped(handle);
        self.events.fire_stopped(handle);
        true
    }

    /// Move a live routine into `kind`
    pub(crate) fn park(&self, handle: &RoutineHandle, kind: BucketKind) {
        if !handle.is_alive() {
            return;
        }
        let moved = self.buckets.borrow_mut().relocate(handle, kind);
        if moved {
            tracing::trace!(routine = %handle.id(), bucket = %kind, "Routine moved");
        }
    }

    /// Queue a live routine into `kind` afresh, even if it is already there
    pub(crate) fn requeue(&self, handle: &RoutineHandle, kind: BucketKind) {
        if !handle.is_alive() {
            return;
        }
        self.buckets.borrow_mut().requeue(handle, kind);
        tracing::trace!(routine = %handle.id(), bucket = %kind, "Routine requeued");
    }

    pub(crate) fn adapters(&self) -> Vec<Rc<dyn WaitableAdapter>> {
        self.adapters.borrow().clone()
    }

    pub(crate) fn telemetry(&self) -> &SchedulerTelemetry {
        &self.telemetry
    }

    pub(crate) fn events(&self) -> &SchedulerEvents {
        &self.events
    }
}

/// Clears the updating marker when a pass ends, however it ends
struct UpdatingGuard<'a> {
    flag: &'a Cell<Option<Lane>>,
}

impl<'a> UpdatingGuard<'a> {
    fn enter(flag: &'a Cell<Option<Lane>>, lane: Lane) -> Self {
        flag.set(Some(lane));
        Self { flag }
    }
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(None);
    }
}

/// Options for starting a routine. Unset fields fall back to the
/// scheduler's configuration.
#[derive(Default)]
pub struct RoutineOptions {
    name: Option<String>,
    source: Option<Source>,
    inactive_policy: Option<InactivePolicy>,
    fault_handler: Option<FaultHandler>,
    priority: i32,
    paused: bool,
}

impl RoutineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn inactive_policy(mut self, policy: InactivePolicy) -> Self {
        self.inactive_policy = Some(policy);
        self
    }

    pub fn fault_resolution(mut self, resolution: FaultResolution) -> Self {
        self.fault_handler = Some(FaultHandler::Resolve(resolution));
        self
    }

    pub fn fault_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RoutineHandle, &RoutineFault) -> FaultResolution + 'static,
    {
        self.fault_handler = Some(FaultHandler::Custom(Rc::new(handler)));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Start the routine already paused
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// Handle to a scheduler lane.
///
/// Clones share state. [`Scheduler::fixed_step`] returns the paired view
/// that drives the fixed-step lane over the same buckets.
#[derive(Clone)]
pub struct Scheduler {
    core: Rc<Core>,
    lane: Lane,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        tracing::info!(
            scheduler = %config.name,
            time_scale = config.time_scale,
            "Routine scheduler created"
        );
        Self {
            core: Rc::new(Core::new(config)),
            lane: Lane::Main,
        }
    }

    pub(crate) fn core(&self) -> &Rc<Core> {
        &self.core
    }

    /// The lane this view drives
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// View driving the main lane of this scheduler
    pub fn main(&self) -> Scheduler {
        Scheduler {
            core: Rc::clone(&self.core),
            lane: Lane::Main,
        }
    }

    /// View driving the fixed-step lane of this scheduler
    pub fn fixed_step(&self) -> Scheduler {
        Scheduler {
            core: Rc::clone(&self.core),
            lane: Lane::FixedStep,
        }
    }

    /// Whether both views drive the same lane of the same scheduler
    pub fn same_as(&self, other: &Scheduler) -> bool {
        Rc::ptr_eq(&self.core, &other.core) && self.lane == other.lane
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.core.config
    }

    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    // ═══════════════════════════════════════════════════════════════
    // STARTING ROUTINES
    // ═══════════════════════════════════════════════════════════════

    /// Start a routine with default options.
    ///
    /// Outside an update the routine is queued for the next tick. Started
    /// from a routine running on this lane, it is stepped immediately, after
    /// the started notification; a fault it propagates during that first
    /// step is returned here.
    #[track_caller]
    pub fn start<R: Resumable + 'static>(&self, body: R) -> RoutineResult<RoutineHandle> {
        self.spawn(Some(Box::new(body)), RoutineOptions::default(), Location::caller())
    }

    #[track_caller]
    pub fn start_with<R: Resumable + 'static>(
        &self,
        body: R,
        options: RoutineOptions,
    ) -> RoutineResult<RoutineHandle> {
        self.spawn(Some(Box::new(body)), options, Location::caller())
    }

    /// Start an already boxed body; `None` is rejected with
    /// [`RoutineError::NullRoutine`]
    #[track_caller]
    pub fn start_boxed(
        &self,
        body: Option<Box<dyn Resumable>>,
        options: RoutineOptions,
    ) -> RoutineResult<RoutineHandle> {
        self.spawn(body, options, Location::caller())
    }

    fn spawn(
        &self,
        body: Option<Box<dyn Resumable>>,
        options: RoutineOptions,
        location: &'static Location<'static>,
    ) -> RoutineResult<RoutineHandle> {
        let core = &self.core;
        let Some(body) = body else {
            tracing::warn!(scheduler = %core.config.name, "Rejected routine start without a body");
            return Err(RoutineError::NullRoutine);
        };

        let main = *core.main_clock.borrow();
        let record = RoutineRecord::new(RecordInit {
            id: core.allocate_id(),
            name: options.name,
            core: Rc::downgrade(core),
            source: options.source,
            body,
            inactive_policy: options
                .inactive_policy
                .unwrap_or(core.config.default_inactive_policy),
            fault_handler: options
                .fault_handler
                .unwrap_or_else(|| core.config.default_fault_resolution.into()),
            priority: options.priority,
            paused: options.paused,
            debug: DebugInfo {
                created_at: Utc::now(),
                created_at_ms: main.elapsed_ms(),
                created_on_update: main.update_count(),
                location: core.config.capture_creation_context.then_some(location),
            },
        });
        let handle = RoutineHandle::from_record(Rc::new(record));
        core.buckets
            .borrow_mut()
            .insert(handle.clone(), BucketKind::NextTick);

        core.telemetry.routine_started(&handle);
        core.events.fire_started(&handle);

        if core.updating.get() == Some(self.lane) && handle.is_alive() {
            step::drive(self, &handle)?;
        }
        Ok(handle)
    }

    // ═══════════════════════════════════════════════════════════════
    // DRIVING
    // ═══════════════════════════════════════════════════════════════

    /// Advance this view's lane by `delta_ms` milliseconds
    pub fn update(&self, delta_ms: u64) -> RoutineResult<()> {
        self.update_by(Duration::from_millis(delta_ms))
    }

    /// Advance this view's lane by `delta`; sub-millisecond remainders carry
    /// over to the next call.
    ///
    /// Fails with [`RoutineError::ConcurrencyViolation`] while any scheduler
    /// on this thread is mid-update. A pass aborted by a propagated fault
    /// still counts as an update: the post-update hooks fire and the clock
    /// closes the pass before the error is returned.
    pub fn update_by(&self, delta: Duration) -> RoutineResult<()> {
        let core = &self.core;
        if let Some(active) = core.updating.get().or_else(context::updating_lane) {
            core.telemetry.concurrency_violation(self.lane, active);
            return Err(RoutineError::ConcurrencyViolation { active });
        }

        let _updating = UpdatingGuard::enter(&core.updating, self.lane);
        let _scope = UpdateScope::enter(self.clone());

        let delta_ms = core.clock(self.lane).borrow_mut().begin_pass(delta);
        core.events.fire_pre_pass(self);
        core.clock(self.lane).borrow_mut().advance();

        let outcome = match self.lane {
            Lane::Main => self.main_pass(),
            Lane::FixedStep => self.drive_bucket(BucketKind::FixedStep),
        };

        core.events.fire_post_pass(self);
        let elapsed_ms = {
            let mut clock = core.clock(self.lane).borrow_mut();
            clock.end_pass();
            clock.elapsed_ms()
        };
        core.telemetry
            .update_completed(self.lane, delta_ms, elapsed_ms, self.alive_count());
        outcome
    }

    /// Advance the fixed-step lane, whichever view this is
    pub fn fixed_update(&self, delta_ms: u64) -> RoutineResult<()> {
        self.fixed_step().update(delta_ms)
    }

    pub fn fixed_update_by(&self, delta: Duration) -> RoutineResult<()> {
        self.fixed_step().update_by(delta)
    }

    fn main_pass(&self) -> RoutineResult<()> {
        let timed = self.core.buckets.borrow().snapshot(BucketKind::Timed);

        self.drive_bucket(BucketKind::NextTick)?;

        let now = self.core.main_elapsed_ms();
        for handle in timed {
            if !handle.is_alive() || handle.bucket() != Some(BucketKind::Timed) {
                continue;
            }
            if handle.due_ms().is_some_and(|due| due > now) {
                break;
            }
            step::drive(self, &handle)?;
        }

        self.drive_bucket(BucketKind::EndOfPass)
    }

    fn drive_bucket(&self, kind: BucketKind) -> RoutineResult<()> {
        let members = self.core.buckets.borrow().snapshot(kind);
        for handle in members {
            if handle.is_alive() && handle.bucket() == Some(kind) {
                step::drive(self, &handle)?;
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // STOPPING AND QUERYING
    // ═══════════════════════════════════════════════════════════════

    /// Stop a routine of this scheduler. Returns `false` if it had already
    /// finished or belongs to another scheduler.
    pub fn stop(&self, handle: &RoutineHandle) -> bool {
        handle.record().belongs_to(&self.core) && self.core.retire(handle)
    }

    /// Stop every routine owned by `source`
    pub fn stop_by_source(&self, source: &Source) -> usize {
        let owned: Vec<_> = self
            .routines()
            .into_iter()
            .filter(|h| h.source() == Some(source))
            .collect();
        let stopped = owned.iter().filter(|h| self.core.retire(h)).count();
        tracing::debug!(source = %source.id(), stopped, "Stopped routines by source");
        stopped
    }

    pub fn stop_all(&self) -> usize {
        let stopped = self
            .routines()
            .iter()
            .filter(|h| self.core.retire(h))
            .count();
        tracing::debug!(scheduler = %self.name(), stopped, "Stopped all routines");
        stopped
    }

    pub fn is_alive(&self, handle: &RoutineHandle) -> bool {
        handle.record().belongs_to(&self.core) && handle.is_alive()
    }

    /// Every live routine, bucket by bucket
    pub fn routines(&self) -> Vec<RoutineHandle> {
        self.core.buckets.borrow().all()
    }

    pub fn alive_count(&self) -> usize {
        let buckets = self.core.buckets.borrow();
        BucketKind::ALL.iter().map(|kind| buckets.len(*kind)).sum()
    }

    /// Reorder the next-tick, end-of-pass and fixed-step buckets.
    ///
    /// The timed queue always stays in due-time order. The sort is stable.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&RoutineHandle, &RoutineHandle) -> Ordering,
    {
        for kind in [BucketKind::NextTick, BucketKind::EndOfPass, BucketKind::FixedStep] {
            let mut members = self.core.buckets.borrow().snapshot(kind);
            members.sort_by(&mut compare);
            self.core.buckets.borrow_mut().reorder(kind, members);
        }
    }

    /// Higher priority first; equal priorities keep their order
    pub fn sort_by_priority(&self) {
        self.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    pub fn stats(&self) -> SchedulerStats {
        let main = *self.core.main_clock.borrow();
        let fixed = *self.core.fixed_clock.borrow();
        let buckets = self.core.buckets.borrow();
        SchedulerStats {
            next_tick: buckets.len(BucketKind::NextTick),
            timed: buckets.len(BucketKind::Timed),
            end_of_pass: buckets.len(BucketKind::EndOfPass),
            fixed_step: buckets.len(BucketKind::FixedStep),
            elapsed_ms: main.elapsed_ms(),
            fixed_elapsed_ms: fixed.elapsed_ms(),
            update_count: main.update_count(),
            fixed_update_count: fixed.update_count(),
        }
    }

    /// Earliest due time in the timed queue, on the main clock
    pub fn next_due_ms(&self) -> Option<u64> {
        self.core.buckets.borrow().next_due_ms()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.telemetry.snapshot()
    }

    /// Whether either lane is mid-update
    pub fn is_updating(&self) -> bool {
        self.core.updating.get().is_some()
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Copy of this lane's clock
    pub fn clock(&self) -> Clock {
        *self.core.clock(self.lane).borrow()
    }

    pub fn delta_ms(&self) -> u64 {
        self.clock().delta_ms()
    }

    pub fn last_delta_ms(&self) -> u64 {
        self.clock().last_delta_ms()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock().elapsed_ms()
    }

    pub fn update_count(&self) -> u64 {
        self.clock().update_count()
    }

    pub fn time_scale(&self) -> f64 {
        self.clock().time_scale()
    }

    /// Scale future deltas fed to this lane
    pub fn set_time_scale(&self, time_scale: f64) {
        self.core
            .clock(self.lane)
            .borrow_mut()
            .set_time_scale(time_scale);
    }

    // ── Extension ────────────────────────────────────────────────────

    /// Register an adapter for opaque yielded values. Adapters are tried in
    /// registration order.
    pub fn register_adapter<A: WaitableAdapter + 'static>(&self, adapter: A) {
        self.core.adapters.borrow_mut().push(Rc::new(adapter));
    }

    // ── Notifications ────────────────────────────────────────────────

    /// Fired before the routine's first step, so always ahead of its
    /// stopped notification
    pub fn on_started<F: Fn(&RoutineHandle) + 'static>(&self, listener: F) {
        self.core.events.on_started(Rc::new(listener));
    }

    /// Fired exactly once per routine, whatever ended it
    pub fn on_stopped<F: Fn(&RoutineHandle) + 'static>(&self, listener: F) {
        self.core.events.on_stopped(Rc::new(listener));
    }

    /// Observes every fault before it is resolved
    pub fn on_exception<F: Fn(&RoutineHandle, &RoutineFault) + 'static>(&self, listener: F) {
        self.core.events.on_exception(Rc::new(listener));
    }

    pub fn on_pre_update<F: Fn(&Scheduler) + 'static>(&self, listener: F) {
        self.core.events.on_pre_pass(Lane::Main, Rc::new(listener));
    }

    pub fn on_post_update<F: Fn(&Scheduler) + 'static>(&self, listener: F) {
        self.core.events.on_post_pass(Lane::Main, Rc::new(listener));
    }

    pub fn on_pre_fixed_update<F: Fn(&Scheduler) + 'static>(&self, listener: F) {
        self.core.events.on_pre_pass(Lane::FixedStep, Rc::new(listener));
    }

    pub fn on_post_fixed_update<F: Fn(&Scheduler) + 'static>(&self, listener: F) {
        self.core.events.on_post_pass(Lane::FixedStep, Rc::new(listener));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name())
            .field("lane", &self.lane)
            .field("alive", &self.alive_count())
            .field("updating", &self.core.updating.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{current_routine, current_scheduler};
    use crate::frame::{from_fn, from_iter, once};
    use crate::waitable::Waitable;
    use routine_types::debug_scheduler_config;

    #[test]
    fn test_start_outside_update_queues_for_next_tick() {
        let scheduler = Scheduler::default();
        let ran = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ran);
        let handle = scheduler
            .start(once(move || {
                counter.set(counter.get() + 1);
                Ok(())
            }))
            .unwrap();

        assert_eq!(handle.bucket(), Some(BucketKind::NextTick));
        assert_eq!(ran.get(), 0);
        scheduler.update(16).unwrap();
        assert_eq!(ran.get(), 1);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_start_mid_pass_steps_immediately() {
        let scheduler = Scheduler::default();
        let child_ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&child_ran);
        scheduler
            .start(once(move || {
                let inner = Rc::clone(&flag);
                current_scheduler()?.start(once(move || {
                    inner.set(true);
                    Ok(())
                }))?;
                assert!(flag.get());
                Ok(())
            }))
            .unwrap();

        scheduler.update(1).unwrap();
        assert!(child_ran.get());
        assert_eq!(scheduler.alive_count(), 0);
    }

    #[test]
    fn test_null_body_rejected() {
        let scheduler = Scheduler::default();
        let err = scheduler
            .start_boxed(None, RoutineOptions::new())
            .unwrap_err();
        assert!(matches!(err, RoutineError::NullRoutine));
        assert_eq!(scheduler.alive_count(), 0);
    }

    #[test]
    fn test_context_bound_only_during_update() {
        let scheduler = Scheduler::default();
        let seen = Rc::new(Cell::new(0u64));
        let out = Rc::clone(&seen);
        scheduler
            .start(once(move || {
                let current = current_scheduler()?;
                out.set(current.delta_ms());
                assert_eq!(current_routine()?.depth(), 1);
                Ok(())
            }))
            .unwrap();

        assert!(current_scheduler().is_err());
        scheduler.update(25).unwrap();
        assert_eq!(seen.get(), 25);
        assert!(current_scheduler().is_err());
        assert!(current_routine().is_err());
    }

    #[test]
    fn test_foreign_handle_not_stopped() {
        let a = Scheduler::default();
        let b = Scheduler::default();
        let handle = a.start(from_iter(vec![Waitable::Tick])).unwrap();

        assert!(!b.stop(&handle));
        assert!(!b.is_alive(&handle));
        assert!(a.is_alive(&handle));
        assert!(a.stop(&handle));
        assert!(!a.stop(&handle));
    }

    #[test]
    fn test_creation_context_captured_when_enabled() {
        let scheduler = Scheduler::new(debug_scheduler_config());
        let handle = scheduler.start(from_iter(vec![Waitable::Tick])).unwrap();
        let location = handle.debug_info().location.unwrap();
        assert_eq!(location.file(), file!());

        let plain = Scheduler::default();
        let handle = plain.start(from_iter(vec![Waitable::Tick])).unwrap();
        assert!(handle.debug_info().location.is_none());
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let scheduler = Scheduler::default();
        let start = |priority: i32, name: &str| {
            scheduler
                .start_with(
                    from_fn(|| Ok(Some(Waitable::Tick))),
                    RoutineOptions::new().name(name).priority(priority),
                )
                .unwrap()
        };
        start(0, "a");
        start(5, "b");
        start(0, "c");
        start(9, "d");

        scheduler.sort_by_priority();
        let names: Vec<_> = scheduler
            .routines()
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_lanes_keep_separate_clocks() {
        let scheduler = Scheduler::default();
        scheduler.update(10).unwrap();
        scheduler.fixed_update(20).unwrap();
        scheduler.fixed_update(20).unwrap();

        let stats = scheduler.stats();
        assert_eq!(stats.elapsed_ms, 10);
        assert_eq!(stats.fixed_elapsed_ms, 40);
        assert_eq!(stats.update_count, 1);
        assert_eq!(stats.fixed_update_count, 2);
        assert_eq!(scheduler.fixed_step().elapsed_ms(), 40);
    }

    #[test]
    fn test_metrics_count_lifecycle() {
        let scheduler = Scheduler::default();
        scheduler.start(from_iter(vec![Waitable::Tick])).unwrap();
        scheduler.update(1).unwrap();
        scheduler.update(1).unwrap();

        let metrics = scheduler.metrics();
        assert_eq!(metrics.counter(crate::telemetry::ROUTINES_STARTED), 1);
        assert_eq!(metrics.counter(crate::telemetry::ROUTINES_STOPPED), 1);
        assert_eq!(metrics.counter(crate::telemetry::UPDATES), 2);
    }
}
