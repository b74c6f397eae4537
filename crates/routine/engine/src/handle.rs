//! Handles for inspecting and controlling running routines

use crate::record::{DebugInfo, FaultHandler, FrameInfo, RoutineRecord};
use crate::source::Source;
use routine_types::{BucketKind, FaultResolution, InactivePolicy, RoutineFault, RoutineId};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Handle to a routine started on a [`Scheduler`](crate::Scheduler).
///
/// Handles stay valid after the routine finishes: liveness reads `false`
/// and the result slot remains readable.
#[derive(Clone)]
pub struct RoutineHandle {
    record: Rc<RoutineRecord>,
}

impl RoutineHandle {
    pub(crate) fn from_record(record: Rc<RoutineRecord>) -> Self {
        Self { record }
    }

    pub(crate) fn record(&self) -> &RoutineRecord {
        &self.record
    }

    pub(crate) fn same_as(&self, other: &RoutineHandle) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }

    pub fn id(&self) -> RoutineId {
        self.record.id()
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Owner the routine was started with
    pub fn source(&self) -> Option<&Source> {
        self.record.source()
    }

    pub fn is_alive(&self) -> bool {
        self.record.is_alive()
    }

    /// Bucket the routine is parked in; `None` once finished
    pub fn bucket(&self) -> Option<BucketKind> {
        self.record.bucket()
    }

    /// Main-clock time at which a timed wait elapses
    pub fn due_ms(&self) -> Option<u64> {
        self.record.due_ms()
    }

    /// Stop the routine on the scheduler that owns it.
    ///
    /// Returns `false` if it had already finished.
    pub fn stop(&self) -> bool {
        match self.record.core() {
            Some(core) => core.retire(self),
            None => false,
        }
    }

    // ── Pause ────────────────────────────────────────────────────────

    pub fn is_paused(&self) -> bool {
        self.record.is_paused()
    }

    /// Freeze the routine in its current bucket
    pub fn pause(&self) {
        self.set_paused(true);
    }

    pub fn unpause(&self) {
        self.set_paused(false);
    }

    pub fn set_paused(&self, paused: bool) {
        if self.record.is_paused() != paused {
            tracing::trace!(routine = %self.id(), paused, "routine pause toggled");
        }
        self.record.set_paused(paused);
    }

    // ── Policies ─────────────────────────────────────────────────────

    pub fn inactive_policy(&self) -> InactivePolicy {
        self.record.inactive_policy()
    }

    pub fn set_inactive_policy(&self, policy: InactivePolicy) {
        self.record.set_inactive_policy(policy);
    }

    pub fn set_fault_resolution(&self, resolution: FaultResolution) {
        self.record.set_fault_handler(FaultHandler::Resolve(resolution));
    }

    /// Decide fault resolution per fault
    pub fn set_fault_handler<F>(&self, handler: F)
    where
        F: Fn(&RoutineHandle, &RoutineFault) -> FaultResolution + 'static,
    {
        self.record.set_fault_handler(FaultHandler::Custom(Rc::new(handler)));
    }

    pub fn priority(&self) -> i32 {
        self.record.priority()
    }

    pub fn set_priority(&self, priority: i32) {
        self.record.set_priority(priority);
    }

    // ── Result slot ──────────────────────────────────────────────────

    /// Store a value for whoever consumes this routine's output
    pub fn set_result<T: Any>(&self, value: T) {
        let previous = self.record.result().replace(Some(Box::new(value)));
        drop(previous);
    }

    pub fn has_result(&self) -> bool {
        self.record.result().borrow().is_some()
    }

    /// Remove and return the result if it has type `T`.
    /// A result of another type is left in place.
    pub fn take_result<T: Any>(&self) -> Option<T> {
        let mut slot = self.record.result().borrow_mut();
        if !slot.as_ref().is_some_and(|v| v.is::<T>()) {
            return None;
        }
        slot.take()
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Borrow the result as `T`
    pub fn with_result<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slot = self.record.result().borrow();
        slot.as_ref().and_then(|v| v.downcast_ref::<T>()).map(f)
    }

    pub fn clear_result(&self) {
        let previous = self.record.result().take();
        drop(previous);
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    pub fn debug_info(&self) -> &DebugInfo {
        self.record.debug()
    }

    /// Snapshot of the frame stack, outermost frame first
    pub fn stack(&self) -> Vec<FrameInfo> {
        self.record.stack()
    }

    /// Number of frames on the stack; 0 once finished
    pub fn depth(&self) -> usize {
        self.record.depth()
    }

    /// Whether the routine is blocked on an unresolved waitable
    pub fn is_waiting(&self) -> bool {
        self.record.has_pending()
    }
}

impl PartialEq for RoutineHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for RoutineHandle {}

impl fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("alive", &self.is_alive())
            .field("bucket", &self.bucket())
            .finish()
    }
}

impl fmt::Display for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.name())
    }
}
