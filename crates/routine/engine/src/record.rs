//! Routine records: the scheduler's per-routine state
//!
//! A record owns the routine's frame stack and everything the step state
//! machine consults between resumes. Fields use `Cell`/`RefCell` because
//! records are shared between the buckets, the handles held by callers and
//! the frames themselves; no borrow is ever held across a call into a frame.

use crate::frame::Resumable;
use crate::handle::RoutineHandle;
use crate::scheduler::Core;
use crate::source::Source;
use crate::waitable::{CustomPredicate, ExternalAwaitable};
use chrono::{DateTime, Utc};
use routine_types::{BucketKind, FaultResolution, InactivePolicy, RoutineFault, RoutineId};
use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;
use std::rc::{Rc, Weak};

/// Custom fault handler: inspects the fault and picks a resolution
pub type FaultCallback = Rc<dyn Fn(&RoutineHandle, &RoutineFault) -> FaultResolution>;

/// How a routine resolves faults raised by its frames
#[derive(Clone)]
pub enum FaultHandler {
    Resolve(FaultResolution),
    Custom(FaultCallback),
}

impl FaultHandler {
    pub(crate) fn resolve(&self, handle: &RoutineHandle, fault: &RoutineFault) -> FaultResolution {
        match self {
            FaultHandler::Resolve(resolution) => *resolution,
            FaultHandler::Custom(callback) => callback(handle, fault),
        }
    }
}

impl From<FaultResolution> for FaultHandler {
    fn from(resolution: FaultResolution) -> Self {
        FaultHandler::Resolve(resolution)
    }
}

impl fmt::Debug for FaultHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultHandler::Resolve(resolution) => write!(f, "Resolve({:?})", resolution),
            FaultHandler::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Creation metadata kept for diagnostics
#[derive(Debug, Clone)]
pub struct DebugInfo {
    /// Wall-clock creation time
    pub created_at: DateTime<Utc>,
    /// Main-clock elapsed milliseconds at creation
    pub created_at_ms: u64,
    /// Main-clock update count at creation
    pub created_on_update: u64,
    /// Caller of the start operation, when capture is enabled
    pub location: Option<&'static Location<'static>>,
}

/// Diagnostic view of one frame in a routine's stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// 0 is the routine's initial frame
    pub depth: usize,
    pub name: String,
}

/// One entry of the frame stack. The body is taken out while it runs so that
/// the stack itself stays readable from inside the frame.
struct Frame {
    name: Cow<'static, str>,
    body: Option<Box<dyn Resumable>>,
}

/// Unresolved waitable a parked routine is blocked on
pub(crate) enum Pending {
    /// Waiting for the main clock to reach `due_ms`
    Timer,
    Predicate(Box<dyn CustomPredicate>),
    Awaitable(Box<dyn ExternalAwaitable>),
    Routine(RoutineHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Alive,
    Finished,
}

pub(crate) struct RoutineRecord {
    id: RoutineId,
    name: String,
    core: Weak<Core>,
    source: Option<Source>,
    frames: RefCell<Vec<Frame>>,
    pending: RefCell<Option<Pending>>,
    due_ms: Cell<Option<u64>>,
    paused: Cell<bool>,
    liveness: Cell<Liveness>,
    bucket: Cell<Option<BucketKind>>,
    inactive_policy: Cell<InactivePolicy>,
    fault_handler: RefCell<FaultHandler>,
    priority: Cell<i32>,
    result: RefCell<Option<Box<dyn Any>>>,
    debug: DebugInfo,
}

pub(crate) struct RecordInit {
    pub id: RoutineId,
    pub name: Option<String>,
    pub core: Weak<Core>,
    pub source: Option<Source>,
    pub body: Box<dyn Resumable>,
    pub inactive_policy: InactivePolicy,
    pub fault_handler: FaultHandler,
    pub priority: i32,
    pub paused: bool,
    pub debug: DebugInfo,
}

impl RoutineRecord {
    pub(crate) fn new(init: RecordInit) -> Self {
        let frame_name = init.body.name();
        let name = init.name.unwrap_or_else(|| frame_name.to_string());
        Self {
            id: init.id,
            name,
            core: init.core,
            source: init.source,
            frames: RefCell::new(vec![Frame {
                name: frame_name,
                body: Some(init.body),
            }]),
            pending: RefCell::new(None),
            due_ms: Cell::new(None),
            paused: Cell::new(init.paused),
            liveness: Cell::new(Liveness::Alive),
            bucket: Cell::new(None),
            inactive_policy: Cell::new(init.inactive_policy),
            fault_handler: RefCell::new(init.fault_handler),
            priority: Cell::new(init.priority),
            result: RefCell::new(None),
            debug: init.debug,
        }
    }

    pub(crate) fn id(&self) -> RoutineId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn core(&self) -> Option<Rc<Core>> {
        self.core.upgrade()
    }

    pub(crate) fn belongs_to(&self, core: &Rc<Core>) -> bool {
        std::ptr::eq(self.core.as_ptr(), Rc::as_ptr(core))
    }

    pub(crate) fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub(crate) fn debug(&self) -> &DebugInfo {
        &self.debug
    }

    // ── Liveness ─────────────────────────────────────────────────────

    pub(crate) fn is_alive(&self) -> bool {
        self.liveness.get() == Liveness::Alive
    }

    /// Flip to finished. Returns `false` if the record was already finished,
    /// which keeps the stop notification to a single firing.
    pub(crate) fn mark_finished(&self) -> bool {
        self.liveness.replace(Liveness::Finished) == Liveness::Alive
    }

    // ── Bucket membership ────────────────────────────────────────────

    pub(crate) fn bucket(&self) -> Option<BucketKind> {
        self.bucket.get()
    }

    pub(crate) fn set_bucket(&self, bucket: Option<BucketKind>) {
        self.bucket.set(bucket);
    }

    pub(crate) fn due_ms(&self) -> Option<u64> {
        self.due_ms.get()
    }

    // ── Frame stack ──────────────────────────────────────────────────

    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub(crate) fn push_frame(&self, body: Box<dyn Resumable>) {
        let name = body.name();
        self.frames.borrow_mut().push(Frame {
            name,
            body: Some(body),
        });
    }

    /// Drop the innermost frame
    pub(crate) fn pop_frame(&self) {
        let popped = self.frames.borrow_mut().pop();
        drop(popped);
    }

    /// Take the innermost body out of the stack so it can run unborrowed.
    /// `None` means the stack is empty or the body is already running.
    pub(crate) fn take_top_body(&self) -> Option<Box<dyn Resumable>> {
        self.frames.borrow_mut().last_mut().and_then(|f| f.body.take())
    }

    /// Put a body taken by [`take_top_body`](Self::take_top_body) back.
    /// If the stack was cleared meanwhile (the routine was stopped from inside
    /// its own frame) the body is dropped instead.
    pub(crate) fn restore_top_body(&self, body: Box<dyn Resumable>) {
        let leftover = {
            let mut frames = self.frames.borrow_mut();
            match frames.last_mut() {
                Some(frame) if frame.body.is_none() => {
                    frame.body = Some(body);
                    None
                }
                _ => Some(body),
            }
        };
        drop(leftover);
    }

    /// Release every frame and pending waitable. Bodies are dropped after
    /// the borrows are released, since dropping may run host code.
    pub(crate) fn clear(&self) {
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        let pending = self.pending.take();
        self.due_ms.set(None);
        drop(frames);
        drop(pending);
    }

    pub(crate) fn stack(&self) -> Vec<FrameInfo> {
        self.frames
            .borrow()
            .iter()
            .enumerate()
            .map(|(depth, frame)| FrameInfo {
                depth,
                name: frame.name.to_string(),
            })
            .collect()
    }

    // ── Pending waitable ─────────────────────────────────────────────

    pub(crate) fn take_pending(&self) -> Option<Pending> {
        self.pending.take()
    }

    pub(crate) fn set_pending(&self, pending: Pending) {
        let previous = self.pending.replace(Some(pending));
        drop(previous);
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    pub(crate) fn start_timer(&self, due_ms: u64) {
        self.due_ms.set(Some(due_ms));
        self.set_pending(Pending::Timer);
    }

    pub(crate) fn clear_timer(&self) {
        self.due_ms.set(None);
    }

    // ── Policies ─────────────────────────────────────────────────────

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
    }

    pub(crate) fn inactive_policy(&self) -> InactivePolicy {
        self.inactive_policy.get()
    }

    pub(crate) fn set_inactive_policy(&self, policy: InactivePolicy) {
        self.inactive_policy.set(policy);
    }

    pub(crate) fn fault_handler(&self) -> FaultHandler {
        self.fault_handler.borrow().clone()
    }

    pub(crate) fn set_fault_handler(&self, handler: FaultHandler) {
        let previous = self.fault_handler.replace(handler);
        drop(previous);
    }

    pub(crate) fn priority(&self) -> i32 {
        self.priority.get()
    }

    pub(crate) fn set_priority(&self, priority: i32) {
        self.priority.set(priority);
    }

    // ── Result slot ──────────────────────────────────────────────────

    pub(crate) fn result(&self) -> &RefCell<Option<Box<dyn Any>>> {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{from_iter, ResumableExt};
    use crate::waitable::Waitable;

    fn record(body: Box<dyn Resumable>) -> RoutineRecord {
        RoutineRecord::new(RecordInit {
            id: RoutineId::new(1),
            name: None,
            core: Weak::new(),
            source: None,
            body,
            inactive_policy: InactivePolicy::default(),
            fault_handler: FaultResolution::default().into(),
            priority: 0,
            paused: false,
            debug: DebugInfo {
                created_at: Utc::now(),
                created_at_ms: 0,
                created_on_update: 0,
                location: None,
            },
        })
    }

    #[test]
    fn test_name_defaults_to_initial_frame() {
        let rec = record(from_iter(vec![Waitable::Tick]).named("walker").boxed());
        assert_eq!(rec.name(), "walker");
        assert_eq!(rec.depth(), 1);
    }

    #[test]
    fn test_stack_stays_visible_while_body_runs() {
        let rec = record(from_iter(Vec::<Waitable>::new()).named("outer").boxed());
        rec.push_frame(from_iter(Vec::<Waitable>::new()).named("inner").boxed());

        let body = rec.take_top_body().unwrap();
        assert!(rec.take_top_body().is_none());
        let names: Vec<_> = rec.stack().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["outer", "inner"]);

        rec.restore_top_body(body);
        assert!(rec.take_top_body().is_some());
    }

    #[test]
    fn test_restore_after_clear_drops_body() {
        let rec = record(from_iter(Vec::<Waitable>::new()).boxed());
        let body = rec.take_top_body().unwrap();
        rec.clear();
        rec.restore_top_body(body);
        assert_eq!(rec.depth(), 0);
    }

    #[test]
    fn test_mark_finished_only_once() {
        let rec = record(from_iter(Vec::<Waitable>::new()).boxed());
        assert!(rec.is_alive());
        assert!(rec.mark_finished());
        assert!(!rec.mark_finished());
        assert!(!rec.is_alive());
    }

    #[test]
    fn test_timer_sets_pending_and_due() {
        let rec = record(from_iter(Vec::<Waitable>::new()).boxed());
        rec.start_timer(1500);
        assert_eq!(rec.due_ms(), Some(1500));
        assert!(matches!(rec.take_pending(), Some(Pending::Timer)));
        rec.clear_timer();
        assert_eq!(rec.due_ms(), None);
        assert!(!rec.has_pending());
    }
}
