//! Waitables: why a routine is suspended
//!
//! Every value a frame yields is a [`Waitable`]. The set of variants is
//! closed; host integrations extend it through the two capability traits
//! ([`CustomPredicate`], [`ExternalAwaitable`]) or, for values whose type the
//! engine cannot know, through [`Waitable::Value`] plus a registered
//! [`WaitableAdapter`].

use crate::frame::Resumable;
use crate::handle::RoutineHandle;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A host-specific suspend condition evaluated once per tick
pub trait CustomPredicate {
    /// `true` while the routine must stay suspended
    fn still_waiting(&mut self) -> bool;
}

/// Generic asynchronous work the routine waits on
pub trait ExternalAwaitable {
    fn is_done(&self) -> bool;
}

/// Translates opaque yielded values into waitables.
///
/// Adapters are consulted in registration order; an adapter that does not
/// recognise the value hands it back unchanged.
pub trait WaitableAdapter {
    fn adapt(&self, value: Box<dyn Any>) -> Result<Waitable, Box<dyn Any>>;
}

/// Suspend condition yielded by a routine frame
pub enum Waitable {
    /// Resume on the next update
    Tick,
    /// Resume once the main clock has advanced by this many milliseconds
    Duration(u64),
    /// Run this frame to completion first, then resume the yielding frame
    Nested(Box<dyn Resumable>),
    /// Resume once another routine is no longer alive
    Routine(RoutineHandle),
    /// Resume at the end of the current update, after the timed queue
    EndOfPass,
    /// Resume on the next fixed-step update
    FixedStep,
    /// Resume once the predicate stops waiting
    Predicate(Box<dyn CustomPredicate>),
    /// Resume once the awaitable reports completion
    Awaitable(Box<dyn ExternalAwaitable>),
    /// Opaque value, classified by the scheduler's adapters
    Value(Box<dyn Any>),
}

impl Waitable {
    pub fn millis(ms: u64) -> Self {
        Waitable::Duration(ms)
    }

    /// Wait for a number of seconds, rounded to the nearest millisecond.
    /// Negative or NaN inputs wait zero time.
    pub fn seconds(secs: f64) -> Self {
        Waitable::Duration((secs * 1000.0).round() as u64)
    }

    pub fn nested<R: Resumable + 'static>(frame: R) -> Self {
        Waitable::Nested(Box::new(frame))
    }

    pub fn wait_while<F: FnMut() -> bool + 'static>(condition: F) -> Self {
        Waitable::Predicate(Box::new(WaitWhile(condition)))
    }

    pub fn wait_until<F: FnMut() -> bool + 'static>(condition: F) -> Self {
        Waitable::Predicate(Box::new(WaitUntil(condition)))
    }

    pub fn awaitable<A: ExternalAwaitable + 'static>(awaitable: A) -> Self {
        Waitable::Awaitable(Box::new(awaitable))
    }

    pub fn value<T: Any>(value: T) -> Self {
        Waitable::Value(Box::new(value))
    }

    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Waitable::Tick => "tick",
            Waitable::Duration(_) => "duration",
            Waitable::Nested(_) => "nested",
            Waitable::Routine(_) => "routine",
            Waitable::EndOfPass => "end-of-pass",
            Waitable::FixedStep => "fixed-step",
            Waitable::Predicate(_) => "predicate",
            Waitable::Awaitable(_) => "awaitable",
            Waitable::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Waitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waitable::Duration(ms) => write!(f, "Duration({}ms)", ms),
            Waitable::Nested(frame) => write!(f, "Nested({})", frame.name()),
            Waitable::Routine(handle) => write!(f, "Routine({})", handle.id()),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl From<Duration> for Waitable {
    fn from(duration: Duration) -> Self {
        Waitable::Duration(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<RoutineHandle> for Waitable {
    fn from(handle: RoutineHandle) -> Self {
        Waitable::Routine(handle)
    }
}

/// Waits while the condition holds
pub struct WaitWhile<F>(pub F);

impl<F: FnMut() -> bool> CustomPredicate for WaitWhile<F> {
    fn still_waiting(&mut self) -> bool {
        (self.0)()
    }
}

/// Waits until the condition holds
pub struct WaitUntil<F>(pub F);

impl<F: FnMut() -> bool> CustomPredicate for WaitUntil<F> {
    fn still_waiting(&mut self) -> bool {
        !(self.0)()
    }
}

/// Shared completion flag.
///
/// Clones observe the same flag, so a host keeps one clone and yields
/// another.
#[derive(Debug, Clone, Default)]
pub struct Flag(Rc<Cell<bool>>);

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.set(true);
    }

    pub fn reset(&self) {
        self.0.set(false);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

impl ExternalAwaitable for Flag {
    fn is_done(&self) -> bool {
        self.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_rounds_to_millis() {
        assert!(matches!(Waitable::seconds(1.5), Waitable::Duration(1500)));
        assert!(matches!(Waitable::seconds(0.0004), Waitable::Duration(0)));
        assert!(matches!(Waitable::seconds(-2.0), Waitable::Duration(0)));
    }

    #[test]
    fn test_from_std_duration() {
        let w: Waitable = Duration::from_millis(250).into();
        assert!(matches!(w, Waitable::Duration(250)));
    }

    #[test]
    fn test_wait_while_and_until() {
        let mut remaining = 2;
        let mut pred = WaitWhile(move || {
            remaining -= 1;
            remaining > 0
        });
        assert!(pred.still_waiting());
        assert!(!pred.still_waiting());

        let flag = Flag::new();
        let observed = flag.clone();
        let mut until = WaitUntil(move || observed.is_set());
        assert!(until.still_waiting());
        flag.set();
        assert!(!until.still_waiting());
    }

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = Flag::new();
        let yielded = flag.clone();
        assert!(!yielded.is_done());
        flag.set();
        assert!(yielded.is_done());
        flag.reset();
        assert!(!yielded.is_done());
    }

    #[test]
    fn test_debug_uses_kind() {
        assert_eq!(format!("{:?}", Waitable::Tick), "tick");
        assert_eq!(format!("{:?}", Waitable::millis(40)), "Duration(40ms)");
        assert_eq!(Waitable::value(3u8).kind(), "value");
    }
}
