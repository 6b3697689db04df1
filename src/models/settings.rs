use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy of the thread-violation detector, chosen once at installation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Detector not installed; mutations are never checked.
    #[default]
    Off,
    /// Off-thread mutation is rejected before it is applied.
    Strict,
    /// Off-thread mutation is recorded and logged, then applied.
    Lenient,
}

/// Robot settings from `Robot Settings.yaml`
///
/// Timeouts and delays that control how long the robot waits for the UI
/// thread, plus the thread-violation detector policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSettings {
    #[serde(rename = "Execution Timeout Ms", default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,

    #[serde(rename = "Idle Timeout Ms", default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(rename = "Delay Between Events Ms", default)]
    pub delay_between_events_ms: u64,

    #[serde(rename = "Click On Disabled Allowed", default)]
    pub click_on_disabled_allowed: bool,

    #[serde(rename = "Thread Violation Detector", default)]
    pub detector: DetectorMode,

    #[serde(rename = "UI Thread Name", default = "default_ui_thread_name")]
    pub ui_thread_name: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            execution_timeout_ms: default_execution_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            delay_between_events_ms: 0,
            click_on_disabled_allowed: false,
            detector: DetectorMode::Off,
            ui_thread_name: default_ui_thread_name(),
            debug_mode: false,
        }
    }
}

impl RobotSettings {
    /// Bounded wait applied to bridge executions.
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    /// Bounded wait applied to the idle barrier.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Pause after each synthetic input event.
    pub fn delay_between_events(&self) -> Duration {
        Duration::from_millis(self.delay_between_events_ms)
    }
}

fn default_execution_timeout_ms() -> u64 {
    30_000
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_ui_thread_name() -> String {
    "ui-thread".to_string()
}
