//! # Routine Engine
//!
//! Deterministic cooperative routines driven by caller-supplied time.
//!
//! ## Overview
//!
//! A routine is a stack of resumable frames. Each time the scheduler steps
//! a routine it resumes the innermost frame until that frame yields a
//! [`Waitable`] describing when to continue: on the next tick, after some
//! milliseconds, at the end of the pass, on the next fixed step, once
//! another routine finishes, or once a host condition resolves.
//!
//! Nothing here reads a wall clock or spawns a thread. The host calls
//! [`Scheduler::update`] (and optionally [`Scheduler::fixed_update`]) with
//! whatever delta it likes, so simulations can run faster than real time,
//! be paused, or be replayed exactly.
//!
//! ## Quick Start
//!
//! ```
//! use routine_engine::{from_iter, Scheduler, Waitable};
//!
//! let scheduler = Scheduler::default();
//! let handle = scheduler
//!     .start(from_iter(vec![Waitable::Tick, Waitable::millis(100)]))
//!     .unwrap();
//!
//! scheduler.update(16).unwrap(); // runs to the tick
//! scheduler.update(16).unwrap(); // starts the 100ms wait
//! assert!(handle.is_alive());
//!
//! scheduler.update(100).unwrap();
//! assert!(!handle.is_alive());
//! ```
//!
//! ## Lanes
//!
//! Every scheduler has a main lane and a fixed-step lane over the same
//! routines. Only one lane of a scheduler may be mid-update at a time;
//! a reentrant update fails with [`RoutineError::ConcurrencyViolation`].
//!
//! ## Faults
//!
//! Frames report faults as [`RoutineFault`] (`anyhow::Error`). Each routine
//! resolves them per its [`FaultResolution`]: propagate to the update
//! caller, stop the routine, or pop the faulting frame and resume the one
//! below it.

#![deny(unsafe_code)]

mod buckets;
pub mod context;
mod events;
pub mod frame;
pub mod handle;
mod record;
pub mod scheduler;
pub mod source;
pub mod telemetry;
pub mod waitable;

pub use context::{current_routine, current_scheduler, in_update};
pub use events::{FaultListener, PassListener, RoutineListener};
pub use frame::{from_fn, from_iter, once, Named, Resumable, ResumableExt, Step};
pub use handle::RoutineHandle;
pub use record::{DebugInfo, FaultCallback, FaultHandler, FrameInfo};
pub use scheduler::{RoutineOptions, Scheduler};
pub use source::{Source, SourceActivity, SourceLifecycle};
pub use telemetry::MetricsSnapshot;
pub use waitable::{
    CustomPredicate, ExternalAwaitable, Flag, WaitUntil, WaitWhile, Waitable, WaitableAdapter,
};

pub use routine_types::{
    debug_scheduler_config, headless_scheduler_config, BucketKind, Clock, FaultResolution,
    InactivePolicy, Lane, RoutineError, RoutineFault, RoutineId, RoutineResult, SchedulerConfig,
    SchedulerStats, SourceId, TelemetryConfig,
};
