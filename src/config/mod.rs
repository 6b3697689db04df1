use crate::models::RobotSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Environment variable prefix for settings overrides, e.g. `GUIROBOT_IDLE_TIMEOUT_MS=500`.
pub const ENV_PREFIX: &str = "GUIROBOT";

/// Configuration manager for loading and saving the robot settings file.
///
/// Manages `Robot Settings.yaml` inside a configuration directory. Values
/// from the file can be overridden per test run through `GUIROBOT_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (created if missing)
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("Robot Settings.yaml"),
            config_dir,
        })
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The loaded RobotSettings, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<RobotSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Robot settings not found at {}, using defaults",
                self.settings_path
            );
            return Ok(RobotSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read robot settings: {}", self.settings_path))?;

        let settings: RobotSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse robot settings: {}", self.settings_path))?;

        tracing::info!("Loaded robot settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Load the settings file, then apply `GUIROBOT_*` environment overrides.
    pub fn load_settings_with_env(&self) -> Result<RobotSettings> {
        let settings = self.load_settings()?;
        apply_env_overrides(settings, config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Save the settings file.
    ///
    /// # Arguments
    /// * `settings` - The RobotSettings to save
    pub fn save_settings(&self, settings: &RobotSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize robot settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write robot settings: {}", self.settings_path))?;

        tracing::info!("Saved robot settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

/// Layer environment values over `settings`.
///
/// Keys map to the snake_case field names (`GUIROBOT_EXECUTION_TIMEOUT_MS`,
/// `GUIROBOT_DETECTOR`, ...). Unset variables keep the current value.
pub fn apply_env_overrides(
    mut settings: RobotSettings,
    environment: config::Environment,
) -> Result<RobotSettings> {
    let layered = config::Config::builder()
        .add_source(environment.try_parsing(true))
        .build()
        .context("Failed to read robot settings from environment")?;

    if let Some(value) = env_value::<u64>(&layered, "execution_timeout_ms")? {
        settings.execution_timeout_ms = value;
    }
    if let Some(value) = env_value::<u64>(&layered, "idle_timeout_ms")? {
        settings.idle_timeout_ms = value;
    }
    if let Some(value) = env_value::<u64>(&layered, "delay_between_events_ms")? {
        settings.delay_between_events_ms = value;
    }
    if let Some(value) = env_value::<bool>(&layered, "click_on_disabled_allowed")? {
        settings.click_on_disabled_allowed = value;
    }
    if let Some(value) = env_value::<bool>(&layered, "debug_mode")? {
        settings.debug_mode = value;
    }
    if let Some(value) = env_value::<String>(&layered, "ui_thread_name")? {
        settings.ui_thread_name = value;
    }
    if let Some(value) = env_value::<String>(&layered, "detector")? {
        settings.detector = serde_yaml_ng::from_str(&value.to_lowercase())
            .with_context(|| format!("Invalid detector mode in environment: {}", value))?;
    }

    Ok(settings)
}

/// Read one key from the environment layer. `None` means the variable is unset.
fn env_value<T: serde::de::DeserializeOwned>(
    layered: &config::Config,
    key: &str,
) -> Result<Option<T>> {
    match layered.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Invalid {}_{} in environment",
                ENV_PREFIX,
                key.to_uppercase()
            )
        }),
    }
}
