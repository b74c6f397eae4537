//! Error types for the routine scheduler

use crate::ids::RoutineId;
use crate::policy::Lane;
use thiserror::Error;

/// A fault raised by a routine body
pub type RoutineFault = anyhow::Error;

pub type RoutineResult<T> = Result<T, RoutineError>;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum RoutineError {
    /// An update was requested while the scheduler (or its paired lane) was mid-update
    #[error("Scheduler is already updating its {active} lane")]
    ConcurrencyViolation { active: Lane },

    /// A current-context accessor was used outside an update
    #[error("No {0} is available outside of a scheduler update")]
    InvalidContextAccess(&'static str),

    /// A routine yielded a value the scheduler cannot classify
    #[error("Unsupported waitable: {description}")]
    UnsupportedWaitable { description: String },

    /// A routine was started without a body
    #[error("Cannot start a routine without a body")]
    NullRoutine,

    /// A routine body faulted and its handler chose to propagate
    #[error("Routine {routine} ({name}) faulted: {source}")]
    Faulted {
        routine: RoutineId,
        name: String,
        #[source]
        source: RoutineFault,
    },
}

impl RoutineError {
    /// The underlying body fault, if this error wraps one
    pub fn fault(&self) -> Option<&RoutineFault> {
        match self {
            RoutineError::Faulted { source, .. } => Some(source),
            _ => None,
        }
    }
}
