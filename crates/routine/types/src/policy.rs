//! Routine policies and scheduling classifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a routine does while its source reports itself inactive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InactivePolicy {
    /// Stop the routine the first time it is stepped while inactive
    #[default]
    StopRoutine,
    /// Leave the routine parked, without progress, until the source is active again
    SkipAndResumeWhenActive,
    /// Ignore source activity entirely
    KeepExecuting,
}

/// How a fault raised by a routine body is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaultResolution {
    /// Remove the routine and return the fault from the driving update call
    #[default]
    PropagateException,
    /// Swallow the fault and stop the routine
    CatchAndStopRoutine,
    /// Swallow the fault, discard the faulting frame and resume its parent
    CatchPopAndResume,
}

/// The pending-set a live routine occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketKind {
    /// Resumed on the next main update
    NextTick,
    /// Resumed once the main clock reaches the routine's due time
    Timed,
    /// Resumed after the timed queue has drained in the current main update
    EndOfPass,
    /// Resumed on the next fixed-step update
    FixedStep,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::NextTick,
        BucketKind::Timed,
        BucketKind::EndOfPass,
        BucketKind::FixedStep,
    ];
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKind::NextTick => write!(f, "next-tick"),
            BucketKind::Timed => write!(f, "timed"),
            BucketKind::EndOfPass => write!(f, "end-of-pass"),
            BucketKind::FixedStep => write!(f, "fixed-step"),
        }
    }
}

/// Which of the paired clocks a scheduler view drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Main,
    FixedStep,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Main => write!(f, "main"),
            Lane::FixedStep => write!(f, "fixed-step"),
        }
    }
}

/// Point-in-time bucket occupancy and clock readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub next_tick: usize,
    pub timed: usize,
    pub end_of_pass: usize,
    pub fixed_step: usize,
    pub elapsed_ms: u64,
    pub fixed_elapsed_ms: u64,
    pub update_count: u64,
    pub fixed_update_count: u64,
}

impl SchedulerStats {
    /// Number of live routines (every live routine sits in exactly one bucket)
    pub fn alive(&self) -> usize {
        self.next_tick + self.timed + self.end_of_pass + self.fixed_step
    }

    pub fn in_bucket(&self, kind: BucketKind) -> usize {
        match kind {
            BucketKind::NextTick => self.next_tick,
            BucketKind::Timed => self.timed,
            BucketKind::EndOfPass => self.end_of_pass,
            BucketKind::FixedStep => self.fixed_step,
        }
    }
}
