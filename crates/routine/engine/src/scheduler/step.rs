//! Per-routine step state machine
//!
//! [`drive`] steps one routine and applies the outcome to the buckets.
//! Stepping first checks the routine's source and pause flag, then resumes
//! frames until one of them yields something that suspends the routine,
//! the stack runs empty, or a frame faults.

use super::{Core, Scheduler};
use crate::context::RoutineScope;
use crate::handle::RoutineHandle;
use crate::record::{Pending, RoutineRecord};
use crate::waitable::Waitable;
use routine_types::{
    BucketKind, FaultResolution, InactivePolicy, RoutineError, RoutineFault, RoutineResult,
};
use std::any::Any;

/// Where a stepped routine goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    /// Leave it where it is, without progress
    Stay,
    Park(BucketKind),
    /// A newly started timer; queued behind routines already due then
    Timer,
    Finished,
    /// Already removed while it ran (stopped from inside its own step)
    Detached,
}

impl Classification {
    fn label(self) -> &'static str {
        match self {
            Classification::Stay => "stay",
            Classification::Park(BucketKind::NextTick) => "next-tick",
            Classification::Park(BucketKind::Timed) => "timed",
            Classification::Park(BucketKind::EndOfPass) => "end-of-pass",
            Classification::Park(BucketKind::FixedStep) => "fixed-step",
            Classification::Timer => "timer",
            Classification::Finished => "finished",
            Classification::Detached => "detached",
        }
    }
}

/// What the fault resolution leaves for the resume loop
enum Recovery {
    Resume,
    Settle(Classification),
}

/// Step a routine and move it to wherever it now belongs.
///
/// Errors only when a fault is propagated; the routine has been removed by
/// then.
pub(super) fn drive(scheduler: &Scheduler, handle: &RoutineHandle) -> RoutineResult<()> {
    let core = scheduler.core();
    let classification = step(core, handle)?;
    core.telemetry().routine_stepped(handle, classification.label());

    match classification {
        Classification::Finished => {
            core.retire(handle);
        }
        Classification::Park(kind) => core.park(handle, kind),
        Classification::Timer => core.requeue(handle, BucketKind::Timed),
        Classification::Stay | Classification::Detached => {}
    }
    Ok(())
}

fn step(core: &Core, handle: &RoutineHandle) -> RoutineResult<Classification> {
    let record = handle.record();

    if let Some(source) = record.source() {
        if source.is_destroyed() {
            tracing::debug!(routine = %handle.id(), "Source destroyed, finishing routine");
            return Ok(Classification::Finished);
        }
        let policy = record.inactive_policy();
        if policy != InactivePolicy::KeepExecuting && source.is_inactive() {
            return Ok(match policy {
                InactivePolicy::StopRoutine => Classification::Finished,
                _ => Classification::Stay,
            });
        }
    }

    if record.is_paused() {
        return Ok(Classification::Stay);
    }

    let _scope = RoutineScope::enter(handle.clone());
    loop {
        let fault = match resume(core, handle) {
            Ok(classification) => return Ok(classification),
            Err(fault) => fault,
        };
        if let Recovery::Settle(classification) = recover(core, handle, fault)? {
            return Ok(classification);
        }
    }
}

/// Resume frames until the routine suspends or its stack runs empty
fn resume(core: &Core, handle: &RoutineHandle) -> Result<Classification, RoutineFault> {
    let record = handle.record();
    let now = core.main_elapsed_ms();

    loop {
        if let Some(parked) = check_pending(record, now) {
            return Ok(parked);
        }

        let Some(mut body) = record.take_top_body() else {
            return Ok(if record.depth() == 0 {
                Classification::Finished
            } else {
                Classification::Stay
            });
        };
        let outcome = body.resume();
        record.restore_top_body(body);
        let yielded = outcome?;

        if !record.is_alive() {
            return Ok(Classification::Detached);
        }

        match yielded {
            None => {
                record.pop_frame();
                if record.depth() == 0 {
                    return Ok(Classification::Finished);
                }
            }
            Some(waitable) => {
                tracing::trace!(routine = %handle.id(), waitable = waitable.kind(), "Routine yielded");
                if let Some(classification) = classify(core, handle, waitable, now)? {
                    return Ok(classification);
                }
            }
        }
    }
}

/// Re-check the waitable a routine is parked on. `None` means it resolved
/// and the routine may run.
fn check_pending(record: &RoutineRecord, now: u64) -> Option<Classification> {
    let still_pending = match record.take_pending()? {
        Pending::Timer => {
            if record.due_ms().is_some_and(|due| due > now) {
                record.set_pending(Pending::Timer);
                return Some(Classification::Park(BucketKind::Timed));
            }
            record.clear_timer();
            None
        }
        Pending::Predicate(mut predicate) => predicate
            .still_waiting()
            .then_some(Pending::Predicate(predicate)),
        Pending::Awaitable(awaitable) => {
            (!awaitable.is_done()).then_some(Pending::Awaitable(awaitable))
        }
        Pending::Routine(other) => other.is_alive().then_some(Pending::Routine(other)),
    };
    still_pending.map(|pending| wait_on(record, pending))
}

/// Map a yielded waitable to a classification. `None` means the routine
/// keeps running in this step.
fn classify(
    core: &Core,
    handle: &RoutineHandle,
    waitable: Waitable,
    now: u64,
) -> Result<Option<Classification>, RoutineFault> {
    let record = handle.record();
    let classification = match waitable {
        Waitable::Tick => Classification::Park(BucketKind::NextTick),
        Waitable::Duration(ms) => {
            record.start_timer(now.saturating_add(ms));
            Classification::Timer
        }
        Waitable::Nested(frame) => {
            record.push_frame(frame);
            return Ok(None);
        }
        Waitable::Routine(other) => {
            if other.same_as(handle) {
                return Err(RoutineError::UnsupportedWaitable {
                    description: format!("routine {} waiting on itself", handle.id()),
                }
                .into());
            }
            if !other.is_alive() {
                return Ok(None);
            }
            wait_on(record, Pending::Routine(other))
        }
        Waitable::EndOfPass => Classification::Park(BucketKind::EndOfPass),
        Waitable::FixedStep => Classification::Park(BucketKind::FixedStep),
        Waitable::Predicate(mut predicate) => {
            if !predicate.still_waiting() {
                return Ok(None);
            }
            wait_on(record, Pending::Predicate(predicate))
        }
        Waitable::Awaitable(awaitable) => {
            if awaitable.is_done() {
                return Ok(None);
            }
            wait_on(record, Pending::Awaitable(awaitable))
        }
        Waitable::Value(value) => {
            let adapted = adapt(core, value)?;
            return classify(core, handle, adapted, now);
        }
    };
    Ok(Some(classification))
}

/// Park on an unresolved waitable, unless evaluating it stopped the routine
fn wait_on(record: &RoutineRecord, pending: Pending) -> Classification {
    if !record.is_alive() {
        return Classification::Detached;
    }
    record.set_pending(pending);
    Classification::Park(BucketKind::NextTick)
}

fn adapt(core: &Core, value: Box<dyn Any>) -> Result<Waitable, RoutineFault> {
    let mut value = value;
    for adapter in core.adapters() {
        match adapter.adapt(value) {
            Ok(Waitable::Value(_)) => {
                return Err(RoutineError::UnsupportedWaitable {
                    description: "adapter produced another opaque value".to_string(),
                }
                .into());
            }
            Ok(waitable) => return Ok(waitable),
            Err(unrecognised) => value = unrecognised,
        }
    }
    Err(RoutineError::UnsupportedWaitable {
        description: format!("opaque value ({:?}) matched no adapter", (*value).type_id()),
    }
    .into())
}

/// Surface a fault and apply the routine's resolution.
///
/// Popping the faulting frame resumes the enclosing one within the same
/// step, as often as faults occur.
fn recover(core: &Core, handle: &RoutineHandle, fault: RoutineFault) -> RoutineResult<Recovery> {
    let record = handle.record();
    core.telemetry().routine_faulted(handle, &fault);
    core.events().fire_exception(handle, &fault);
    if !record.is_alive() {
        return Ok(Recovery::Settle(Classification::Detached));
    }

    let resolution = record.fault_handler().resolve(handle, &fault);
    if !record.is_alive() {
        return Ok(Recovery::Settle(Classification::Detached));
    }

    match resolution {
        FaultResolution::PropagateException => {
            core.telemetry().fault_propagated(handle);
            core.retire(handle);
            Err(RoutineError::Faulted {
                routine: handle.id(),
                name: handle.name().to_string(),
                source: fault,
            })
        }
        FaultResolution::CatchAndStopRoutine => Ok(Recovery::Settle(Classification::Finished)),
        FaultResolution::CatchPopAndResume => {
            record.pop_frame();
            drop(record.take_pending());
            record.clear_timer();
            if record.depth() == 0 {
                Ok(Recovery::Settle(Classification::Finished))
            } else {
                Ok(Recovery::Resume)
            }
        }
    }
}
