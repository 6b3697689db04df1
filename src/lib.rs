// guirobot - Functional-testing robot for single-UI-thread GUI applications
//
// This is the library crate: the UI-thread marshalling core (ui), the
// simulated toolkit (models, state), input injection and drivers (services),
// and the ambient pieces (config, logging, metrics).
// The binary crate (main.rs) runs a scripted demo session.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod robot;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{RobotError, RobotResult};
pub use models::{DetectorMode, RobotSettings, Widget, WidgetId, WidgetKind};
pub use robot::Robot;
pub use state::{WidgetChange, WidgetTree};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
