//! Core types for the routine scheduler
//!
//! This crate holds the value types shared by the scheduling engine and its
//! hosts: routine and source identifiers, the fixed-point [`Clock`], the
//! per-routine policies, scheduler configuration and the error taxonomy.
//!
//! Nothing here drives routines. See `routine-engine` for the scheduler.

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod errors;
pub mod ids;
pub mod policy;

pub use clock::{Clock, NANOS_PER_MILLI};
pub use config::{
    debug_scheduler_config, headless_scheduler_config, SchedulerConfig, TelemetryConfig,
};
pub use errors::{RoutineError, RoutineFault, RoutineResult};
pub use ids::{RoutineId, SourceId};
pub use policy::{BucketKind, FaultResolution, InactivePolicy, Lane, SchedulerStats};
