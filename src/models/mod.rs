//! Data models for the robot.
//!
//! - [`Widget`]: state of one component in the simulated toolkit
//! - [`WidgetKind`]: component kinds, also used as the driver capability tag
//! - [`RobotSettings`]: timeouts, delays and detector policy loaded from `Robot Settings.yaml`
//! - [`DetectorMode`]: thread-violation detector policy

pub mod settings;
pub mod widget;

pub use settings::{DetectorMode, RobotSettings};
pub use widget::{Widget, WidgetId, WidgetKind};
