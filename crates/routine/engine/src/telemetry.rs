//! Telemetry for the routine scheduler

use crate::handle::RoutineHandle;
use routine_types::{Lane, RoutineFault, TelemetryConfig};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

pub const ROUTINES_STARTED: &str = "routines_started";
pub const ROUTINES_STOPPED: &str = "routines_stopped";
pub const ROUTINE_FAULTS: &str = "routine_faults";
pub const FAULTS_PROPAGATED: &str = "faults_propagated";
pub const UPDATES: &str = "updates";
pub const FIXED_UPDATES: &str = "fixed_updates";
pub const CONCURRENCY_VIOLATIONS: &str = "concurrency_violations";
pub const ROUTINE_STEPS: &str = "routine_steps";

/// Scheduler telemetry.
///
/// Records stay on the scheduler's thread, so a `RefCell` is enough.
pub(crate) struct SchedulerTelemetry {
    config: TelemetryConfig,
    metrics: RefCell<MetricsCollector>,
}

impl SchedulerTelemetry {
    pub(crate) fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            metrics: RefCell::new(MetricsCollector::new()),
        }
    }

    fn counting(&self) -> bool {
        self.config.enabled && self.config.metrics_enabled
    }

    fn tracing(&self) -> bool {
        self.config.enabled && self.config.tracing_enabled
    }

    pub(crate) fn routine_started(&self, handle: &RoutineHandle) {
        if self.tracing() {
            tracing::debug!(routine = %handle.id(), name = handle.name(), "Routine started");
        }
        if self.counting() {
            self.metrics.borrow_mut().increment(ROUTINES_STARTED);
        }
    }

    pub(crate) fn routine_stopped(&self, handle: &RoutineHandle) {
        if self.tracing() {
            tracing::debug!(routine = %handle.id(), name = handle.name(), "Routine stopped");
        }
        if self.counting() {
            self.metrics.borrow_mut().increment(ROUTINES_STOPPED);
        }
    }

    pub(crate) fn routine_faulted(&self, handle: &RoutineHandle, fault: &RoutineFault) {
        if self.tracing() {
            tracing::warn!(
                routine = %handle.id(),
                name = handle.name(),
                depth = handle.depth(),
                "Routine faulted: {:#}",
                fault
            );
        }
        if self.counting() {
            self.metrics.borrow_mut().increment(ROUTINE_FAULTS);
        }
    }

    pub(crate) fn fault_propagated(&self, handle: &RoutineHandle) {
        if self.tracing() {
            tracing::error!(routine = %handle.id(), name = handle.name(), "Propagating routine fault to update caller");
        }
        if self.counting() {
            self.metrics.borrow_mut().increment(FAULTS_PROPAGATED);
        }
    }

    pub(crate) fn update_completed(&self, lane: Lane, delta_ms: u64, elapsed_ms: u64, alive: usize) {
        if self.tracing() {
            tracing::trace!(%lane, delta_ms, elapsed_ms, alive, "Update pass complete");
        }
        if !self.counting() {
            return;
        }
        let mut metrics = self.metrics.borrow_mut();
        metrics.increment(match lane {
            Lane::Main => UPDATES,
            Lane::FixedStep => FIXED_UPDATES,
        });
        metrics.record_gauge("alive_routines", alive as f64);
    }

    pub(crate) fn concurrency_violation(&self, requested: Lane, active: Lane) {
        if self.tracing() {
            tracing::error!(%requested, %active, "Update requested while already updating");
        }
        if self.counting() {
            self.metrics.borrow_mut().increment(CONCURRENCY_VIOLATIONS);
        }
    }

    /// Per-step accounting, only with detailed metrics
    pub(crate) fn routine_stepped(&self, handle: &RoutineHandle, outcome: &'static str) {
        if !self.config.detailed_metrics {
            return;
        }
        tracing::trace!(routine = %handle.id(), outcome, "Routine stepped");
        self.metrics.borrow_mut().increment(ROUTINE_STEPS);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.borrow().snapshot()
    }
}

/// Point-in-time copy of the scheduler's counters and gauges
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
}

impl MetricsSnapshot {
    /// Counter value, zero if never incremented
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).copied()
    }
}

struct MetricsCollector {
    counters: HashMap<&'static str, u64>,
    gauges: HashMap<&'static str, f64>,
}

impl MetricsCollector {
    fn new() -> Self {
        Self {
            counters: HashMap::new(),
            gauges: HashMap::new(),
        }
    }

    fn increment(&mut self, metric: &'static str) {
        *self.counters.entry(metric).or_insert(0) += 1;
    }

    fn record_gauge(&mut self, metric: &'static str, value: f64) {
        self.gauges.insert(metric, value);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            gauges: self.gauges.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_telemetry_counts_nothing() {
        let telemetry = SchedulerTelemetry::new(&TelemetryConfig {
            enabled: false,
            metrics_enabled: true,
            tracing_enabled: true,
            detailed_metrics: false,
        });
        telemetry.update_completed(Lane::Main, 16, 16, 0);
        telemetry.concurrency_violation(Lane::Main, Lane::FixedStep);
        assert_eq!(telemetry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_updates_counted_per_lane() {
        let telemetry = SchedulerTelemetry::new(&TelemetryConfig::default());
        telemetry.update_completed(Lane::Main, 16, 16, 3);
        telemetry.update_completed(Lane::Main, 16, 32, 2);
        telemetry.update_completed(Lane::FixedStep, 20, 20, 2);

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.counter(UPDATES), 2);
        assert_eq!(snapshot.counter(FIXED_UPDATES), 1);
        assert_eq!(snapshot.counter(ROUTINE_FAULTS), 0);
        assert_eq!(snapshot.gauge("alive_routines"), Some(2.0));
    }

    #[test]
    fn test_snapshot_serializes() {
        let telemetry = SchedulerTelemetry::new(&TelemetryConfig::default());
        telemetry.update_completed(Lane::Main, 1, 1, 0);
        let json = serde_json::to_value(telemetry.snapshot()).unwrap();
        assert_eq!(json["counters"]["updates"], 1);
    }
}
