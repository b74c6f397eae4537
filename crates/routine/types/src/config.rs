//! Configuration for the routine scheduler

use crate::policy::{FaultResolution, InactivePolicy};
use serde::{Deserialize, Serialize};

/// Complete scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Multiplier applied to every delta fed to either lane
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Record the caller location of every start call
    #[serde(default)]
    pub capture_creation_context: bool,

    /// Inactive-source policy for routines started without an explicit one
    #[serde(default)]
    pub default_inactive_policy: InactivePolicy,

    /// Fault resolution for routines started without an explicit handler
    #[serde(default)]
    pub default_fault_resolution: FaultResolution,

    /// Capacity reserved up front in each bucket
    #[serde(default = "default_bucket_capacity")]
    pub initial_bucket_capacity: usize,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            time_scale: default_time_scale(),
            capture_creation_context: false,
            default_inactive_policy: InactivePolicy::default(),
            default_fault_resolution: FaultResolution::default(),
            initial_bucket_capacity: default_bucket_capacity(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    /// Count individual routine steps as well as lifecycle events
    pub detailed_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_enabled: true,
            tracing_enabled: true,
            detailed_metrics: false,
        }
    }
}

fn default_name() -> String {
    "routines".to_string()
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_bucket_capacity() -> usize {
    32
}

// ═══════════════════════════════════════════════════════════════════
// PRESETS
// ═══════════════════════════════════════════════════════════════════

/// Development configuration: creation sites captured, every step counted
pub fn debug_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        name: "routines-debug".to_string(),
        capture_creation_context: true,
        telemetry: TelemetryConfig {
            enabled: true,
            metrics_enabled: true,
            tracing_enabled: true,
            detailed_metrics: true,
        },
        ..SchedulerConfig::default()
    }
}

/// Configuration for simulations that run many schedulers and want no bookkeeping
pub fn headless_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        name: "routines-headless".to_string(),
        telemetry: TelemetryConfig {
            enabled: false,
            metrics_enabled: false,
            tracing_enabled: false,
            detailed_metrics: false,
        },
        ..SchedulerConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{ "time_scale": 0.5 }"#).unwrap();
        assert_eq!(config.name, "routines");
        assert_eq!(config.time_scale, 0.5);
        assert!(!config.capture_creation_context);
        assert_eq!(config.initial_bucket_capacity, 32);
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_presets() {
        let debug = debug_scheduler_config();
        assert!(debug.capture_creation_context);
        assert!(debug.telemetry.detailed_metrics);

        let headless = headless_scheduler_config();
        assert!(!headless.telemetry.enabled);
        assert_eq!(headless.time_scale, 1.0);
    }

    #[test]
    fn test_roundtrip_preserves_policies() {
        let mut config = SchedulerConfig::named("sim");
        config.default_fault_resolution = FaultResolution::CatchAndStopRoutine;
        config.default_inactive_policy = InactivePolicy::KeepExecuting;

        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "sim");
        assert_eq!(back.default_fault_resolution, FaultResolution::CatchAndStopRoutine);
        assert_eq!(back.default_inactive_policy, InactivePolicy::KeepExecuting);
    }
}
