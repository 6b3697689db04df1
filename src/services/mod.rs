//! Services module - Input injection, drivers and component lookup.
//!
//! These are the consumers of the UI-thread core. None of them touch widget
//! state directly from the calling thread: reads go through the
//! [`ExecutionBridge`](crate::ui::ExecutionBridge), mutations happen when the UI
//! thread processes injected input.
//!
//! # Components
//!
//! - [`InputSource`] / [`SimulatedInput`]: synthetic mouse and keyboard events.
//!   `SimulatedInput` posts each event to the UI queue, where it is applied to
//!   the [`WidgetTree`](crate::state::WidgetTree) and followed by a repaint.
//!
//! - [`Driver`]: a single pipeline for every widget kind:
//!   1. precondition check via a query (showing, enabled, strategy-specific)
//!   2. input injection
//!   3. idle wait
//!   4. postcondition check via a query
//!
//!   Per-kind behavior lives in [`DriverStrategy`] objects keyed by
//!   [`WidgetKind`](crate::models::WidgetKind).
//!
//! - [`Locator`] / [`Matcher`]: strict widget lookup run on the UI thread.
//!
//! # Usage Example
//!
//! ```ignore
//! let tabs = robot.locator().find(&Matcher::named("tabs"))?;
//! robot.driver().select_index(tabs, 2)?;
//!
//! let slider = robot.locator().find(&Matcher::of_kind(WidgetKind::Slider))?;
//! robot.driver().slide_to(slider, 68)?;
//! ```

pub mod driver;
pub mod input;
pub mod locator;

pub use driver::{
    Action, ButtonStrategy, Driver, DriverStrategy, ItemListStrategy, SliderStrategy,
    TextStrategy, ToggleStrategy, default_strategies,
};
pub use input::{InputEvent, InputSource, Key, SimulatedInput};
pub use locator::{Locator, Matcher};
