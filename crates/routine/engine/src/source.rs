//! Routine sources: the logical owners routines are grouped under
//!
//! A [`Source`] is an opaque affinity key. It optionally carries a
//! [`SourceActivity`] capability; without one the scheduler never considers
//! the source destroyed or inactive.

use routine_types::SourceId;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Host-side lifecycle of whatever owns a group of routines
pub trait SourceActivity {
    fn is_destroyed(&self) -> bool;

    fn is_inactive(&self) -> bool {
        false
    }
}

/// Owner reference attached to a routine
#[derive(Clone)]
pub struct Source {
    id: SourceId,
    activity: Option<Rc<dyn SourceActivity>>,
}

impl Source {
    /// A plain grouping key with no lifecycle
    pub fn new() -> Self {
        Self {
            id: SourceId::generate(),
            activity: None,
        }
    }

    /// A source whose lifecycle is reported by `activity`
    pub fn tracked<A: SourceActivity + 'static>(activity: Rc<A>) -> Self {
        Self {
            id: SourceId::generate(),
            activity: Some(activity),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn is_tracked(&self) -> bool {
        self.activity.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.activity.as_ref().is_some_and(|a| a.is_destroyed())
    }

    pub fn is_inactive(&self) -> bool {
        self.activity.as_ref().is_some_and(|a| a.is_inactive())
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Source {}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("tracked", &self.is_tracked())
            .finish()
    }
}

/// Ready-made [`SourceActivity`] driven by explicit calls
#[derive(Debug, Default)]
pub struct SourceLifecycle {
    destroyed: Cell<bool>,
    inactive: Cell<bool>,
}

impl SourceLifecycle {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn destroy(&self) {
        self.destroyed.set(true);
    }

    pub fn set_inactive(&self, inactive: bool) {
        self.inactive.set(inactive);
    }
}

impl SourceActivity for SourceLifecycle {
    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn is_inactive(&self) -> bool {
        self.inactive.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_source_is_always_active() {
        let source = Source::new();
        assert!(!source.is_tracked());
        assert!(!source.is_destroyed());
        assert!(!source.is_inactive());
    }

    #[test]
    fn test_tracked_source_reports_lifecycle() {
        let lifecycle = SourceLifecycle::new();
        let source = Source::tracked(Rc::clone(&lifecycle));

        lifecycle.set_inactive(true);
        assert!(source.is_inactive());
        lifecycle.destroy();
        assert!(source.is_destroyed());
    }

    #[test]
    fn test_equality_follows_identity() {
        let a = Source::new();
        let b = Source::new();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
