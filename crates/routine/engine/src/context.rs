//! Current-context accessors
//!
//! While a scheduler is mid-update, routine bodies can reach the scheduler
//! driving them (and the routine being stepped) without an explicit
//! parameter. The binding is thread-local and scoped: every update installs
//! it through a guard that restores the previous binding on drop, so a
//! faulting or panicking pass never leaves a stale binding behind. The same
//! binding doubles as the thread-wide "currently updating" marker.

use crate::handle::RoutineHandle;
use crate::scheduler::Scheduler;
use routine_types::{Lane, RoutineError, RoutineResult};
use std::cell::RefCell;

#[derive(Clone, Default)]
struct ActiveContext {
    scheduler: Option<Scheduler>,
    routine: Option<RoutineHandle>,
}

thread_local! {
    static CURRENT: RefCell<ActiveContext> = RefCell::new(ActiveContext::default());
}

/// The scheduler whose update is running on this thread
pub fn current_scheduler() -> RoutineResult<Scheduler> {
    CURRENT
        .with(|cell| cell.borrow().scheduler.clone())
        .ok_or(RoutineError::InvalidContextAccess("current scheduler"))
}

/// The routine being stepped on this thread
pub fn current_routine() -> RoutineResult<RoutineHandle> {
    CURRENT
        .with(|cell| cell.borrow().routine.clone())
        .ok_or(RoutineError::InvalidContextAccess("current routine"))
}

/// Whether any scheduler is mid-update on this thread
pub fn in_update() -> bool {
    CURRENT.with(|cell| cell.borrow().scheduler.is_some())
}

/// Lane of the scheduler mid-update on this thread, if any
pub(crate) fn updating_lane() -> Option<Lane> {
    CURRENT.with(|cell| cell.borrow().scheduler.as_ref().map(Scheduler::lane))
}

/// Binds a scheduler for the duration of one update pass
pub(crate) struct UpdateScope {
    prev: Option<ActiveContext>,
}

impl UpdateScope {
    pub(crate) fn enter(scheduler: Scheduler) -> Self {
        let next = ActiveContext {
            scheduler: Some(scheduler),
            routine: None,
        };
        let prev = CURRENT.with(|cell| cell.replace(next));
        Self { prev: Some(prev) }
    }
}

impl Drop for UpdateScope {
    fn drop(&mut self) {
        let prev = self.prev.take().unwrap_or_default();
        // the displaced context is dropped outside the borrow
        let displaced = CURRENT.with(|cell| cell.replace(prev));
        drop(displaced);
    }
}

/// Binds the routine being stepped
pub(crate) struct RoutineScope {
    prev: Option<RoutineHandle>,
}

impl RoutineScope {
    pub(crate) fn enter(routine: RoutineHandle) -> Self {
        let prev = CURRENT.with(|cell| cell.borrow_mut().routine.replace(routine));
        Self { prev }
    }
}

impl Drop for RoutineScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        let displaced = CURRENT.with(|cell| std::mem::replace(&mut cell.borrow_mut().routine, prev));
        drop(displaced);
    }
}
