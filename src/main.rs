//! guirobot - scripted demo session
//!
//! Builds a small window in the simulated toolkit and drives it the way a
//! functional test would.
//!
//! # Execution Flow
//!
//! 1. Load `Robot Settings.yaml` from `guirobot Data/` (defaults if missing)
//!    and apply `GUIROBOT_*` environment overrides
//! 2. Initialize logging → logs/guirobot.<date>
//! 3. Launch the robot (UI thread, bridge, idle barrier, detector)
//! 4. Build the window on the UI thread
//! 5. Drive it: toggle, select a tab, slide, type text
//! 6. Demonstrate an action failure and an off-thread mutation
//! 7. Shut down and log the metrics summary

use anyhow::Result;
use camino::Utf8Path;
use guirobot::services::Matcher;
use guirobot::{APP_NAME, ConfigManager, DetectorMode, Robot, VERSION, Widget, WidgetKind};

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("guirobot Data")?;
    let settings = config_manager.load_settings_with_env()?;

    let _log_guard =
        guirobot::logging::setup_logging(Utf8Path::new("logs"), "guirobot", settings.debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let robot = Robot::launch(settings)?;
    let result = run_session(&robot);

    if let Err(e) = &result {
        tracing::error!("Demo session failed: {:#}", e);
    }
    robot.shutdown();
    result
}

fn run_session(robot: &Robot) -> Result<()> {
    let window = robot.add_widget(Widget::new("main", WidgetKind::Window), None)?;
    robot.add_widget(
        Widget::new("bold", WidgetKind::ToggleButton).with_text("Bold"),
        Some(window),
    )?;
    robot.add_widget(
        Widget::new("tabs", WidgetKind::TabbedPane).with_items(["General", "Fonts", "Colors"]),
        Some(window),
    )?;
    robot.add_widget(
        Widget::new("size", WidgetKind::Slider).with_range(0, 100, 60),
        Some(window),
    )?;
    robot.add_widget(Widget::new("title", WidgetKind::TextField), Some(window))?;
    robot.add_widget(
        Widget::new("apply", WidgetKind::Button)
            .with_text("Apply")
            .with_enabled(false),
        Some(window),
    )?;

    let locator = robot.locator();
    let driver = robot.driver();

    let bold = locator.find(&Matcher::named("bold"))?;
    let toggled = driver.toggle(bold)?;
    tracing::info!("Toggled '{}': selected={}", toggled.name, toggled.selected);

    let tabs = locator.find(&Matcher::of_kind(WidgetKind::TabbedPane))?;
    let tabs = driver.select_item(tabs, "Colors")?;
    tracing::info!("Selected tab {:?}", tabs.selected_item());

    let size = locator.find(&Matcher::name_matching("^si")?)?;
    let size = driver.slide_to(size, 68)?;
    tracing::info!("Slider value is now {}", size.value);

    let title = locator.find(&Matcher::named("title").showing_only())?;
    driver.enter_text(title, "Quarterly report")?;
    driver.require_text(title, "Quarterly report")?;

    let apply = locator.find(&Matcher::named("apply"))?;
    match driver.click(apply) {
        Err(e) => tracing::info!("As expected, clicking a disabled button failed: {}", e),
        Ok(_) => tracing::warn!("Disabled button accepted a click"),
    }

    robot.install_detector(DetectorMode::Lenient);
    robot
        .tree()
        .update(title, "text", |w| w.text.push_str(" (draft)"))?;
    tracing::info!(
        "Lenient detector recorded {} violation(s)",
        robot.detector().violations().len()
    );
    robot.install_detector(DetectorMode::Off);

    Ok(())
}
