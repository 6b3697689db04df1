//! Integration tests for drivers and the locator
//!
//! These tests verify that:
//! - Each widget kind is driven through inputs, idle wait and postcondition
//! - Preconditions fail before any input is dispatched
//! - Postconditions catch widgets that did not react
//! - Lookup is strict about finding exactly one widget

use guirobot::services::{Driver, InputEvent, InputSource, Key, Matcher};
use guirobot::{Robot, RobotError, RobotResult, RobotSettings, Widget, WidgetId, WidgetKind};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;
use std::sync::atomic::Ordering;

mock! {
    pub Input {}

    impl InputSource for Input {
        fn dispatch(&self, event: InputEvent) -> RobotResult<()>;
    }
}

fn launch_with(settings: RobotSettings) -> Robot {
    guirobot::logging::init_test_logging();
    Robot::launch(settings).expect("robot should launch")
}

fn launch() -> Robot {
    launch_with(RobotSettings::default())
}

fn window(robot: &Robot) -> WidgetId {
    robot
        .add_widget(Widget::new("main", WidgetKind::Window), None)
        .unwrap()
}

#[test]
fn test_select_tab_by_name() {
    let robot = launch();
    let main = window(&robot);
    let tabs = robot
        .add_widget(
            Widget::new("tabs", WidgetKind::TabbedPane).with_items(["General", "Fonts", "Colors"]),
            Some(main),
        )
        .unwrap();

    let widget = robot.driver().select_item(tabs, "Colors").unwrap();
    assert_eq!(widget.selected_index, Some(2));
    assert_eq!(widget.selected_item(), Some("Colors"));
}

#[test]
fn test_select_index_out_of_bounds() {
    let robot = launch();
    let combo = robot
        .add_widget(
            Widget::new("fonts", WidgetKind::ComboBox).with_items(["Serif", "Sans"]),
            None,
        )
        .unwrap();

    let err = robot.driver().select_index(combo, 5).unwrap_err();
    assert!(matches!(err, RobotError::ActionFailed(_)));
    assert!(err.to_string().contains("between [0] and [1]"));
    assert_eq!(robot.driver().snapshot(combo).unwrap().selected_index, Some(0));
}

#[test]
fn test_slide_to_value() {
    let robot = launch();
    let slider = robot
        .add_widget(Widget::new("size", WidgetKind::Slider).with_range(0, 100, 60), None)
        .unwrap();

    assert_eq!(robot.driver().slide_to(slider, 68).unwrap().value, 68);
    assert_eq!(robot.driver().slide_to(slider, 10).unwrap().value, 10);

    let err = robot.driver().slide_to(slider, 101).unwrap_err();
    assert!(err.to_string().contains("not within the boundaries"));
}

#[test]
fn test_enter_and_delete_text() {
    let robot = launch();
    let field = robot
        .add_widget(Widget::new("title", WidgetKind::TextField), None)
        .unwrap();

    robot.driver().enter_text(field, "Quarterly").unwrap();
    robot.driver().enter_text(field, " report").unwrap();
    robot
        .driver()
        .require_text(field, "Quarterly report")
        .unwrap();

    let widget = robot.driver().delete_text(field).unwrap();
    assert!(widget.text.is_empty());
}

#[test]
fn test_toggle_twice_restores_state() {
    let robot = launch();
    let check = robot
        .add_widget(Widget::new("agree", WidgetKind::CheckBox), None)
        .unwrap();

    robot.driver().toggle(check).unwrap();
    robot.driver().require_selected(check, true).unwrap();
    robot.driver().toggle(check).unwrap();
    robot.driver().require_selected(check, false).unwrap();
}

#[test]
fn test_disabled_component_is_rejected() {
    let robot = launch();
    let apply = robot
        .add_widget(
            Widget::new("apply", WidgetKind::Button).with_enabled(false),
            None,
        )
        .unwrap();

    let err = robot.driver().click(apply).unwrap_err();
    assert!(matches!(err, RobotError::ActionFailed(_)));
    assert!(err.to_string().contains("to be enabled"));
    assert_eq!(robot.driver().snapshot(apply).unwrap().repaints, 0);
}

#[test]
fn test_click_on_disabled_allowed_by_settings() {
    let robot = launch_with(RobotSettings {
        click_on_disabled_allowed: true,
        ..RobotSettings::default()
    });
    let apply = robot
        .add_widget(
            Widget::new("apply", WidgetKind::Button).with_enabled(false),
            None,
        )
        .unwrap();

    // Input reaches the widget but the toolkit ignores it
    let widget = robot.driver().click(apply).unwrap();
    assert!(!widget.enabled);
    assert_eq!(widget.repaints, 0);
}

#[test]
fn test_hidden_component_is_rejected() {
    let robot = launch();
    let panel = robot
        .add_widget(
            Widget::new("advanced", WidgetKind::Panel).with_visible(false),
            None,
        )
        .unwrap();
    let button = robot
        .add_widget(Widget::new("reset", WidgetKind::Button), Some(panel))
        .unwrap();

    let err = robot.driver().click(button).unwrap_err();
    assert!(err.to_string().contains("to be showing on the screen"));
}

#[test]
fn test_unsupported_actions() {
    let robot = launch();
    let label = robot
        .add_widget(Widget::new("status", WidgetKind::Label), None)
        .unwrap();
    let slider = robot
        .add_widget(Widget::new("size", WidgetKind::Slider), None)
        .unwrap();

    let err = robot.driver().click(label).unwrap_err();
    assert!(err.to_string().contains("No driver available"));

    let err = robot.driver().toggle(slider).unwrap_err();
    assert!(err.to_string().contains("Cannot toggle on"));
}

#[test]
fn test_unknown_widget() {
    let robot = launch();
    let err = robot.driver().click(WidgetId(9999)).unwrap_err();
    assert!(matches!(err, RobotError::ComponentLookup(_)));
}

#[test]
fn test_postcondition_fails_when_input_is_lost() {
    let robot = launch();
    let toggle = robot
        .add_widget(Widget::new("bold", WidgetKind::ToggleButton), None)
        .unwrap();

    let mut input = MockInput::new();
    input
        .expect_dispatch()
        .with(eq(InputEvent::click(toggle)))
        .times(1)
        .returning(|_| Ok(()));

    let driver = Driver::new(
        robot.bridge().clone(),
        robot.idle().clone(),
        Arc::new(input),
        Arc::clone(robot.tree()),
    );

    let err = driver.toggle(toggle).unwrap_err();
    match err {
        RobotError::AssertionFailed { property, .. } => assert_eq!(property, "selected"),
        other => panic!("Expected AssertionFailed, got: {:?}", other),
    }
}

#[test]
fn test_slider_dispatches_one_key_per_step() {
    let robot = launch();
    let slider = robot
        .add_widget(Widget::new("size", WidgetKind::Slider).with_range(0, 100, 65), None)
        .unwrap();

    let mut input = MockInput::new();
    input
        .expect_dispatch()
        .with(eq(InputEvent::click(slider)))
        .times(1)
        .returning(|_| Ok(()));
    input
        .expect_dispatch()
        .with(eq(InputEvent::key(slider, Key::Right)))
        .times(3)
        .returning(|_| Ok(()));

    let driver = Driver::new(
        robot.bridge().clone(),
        robot.idle().clone(),
        Arc::new(input),
        Arc::clone(robot.tree()),
    );

    // The mock never moves the slider, so only the dispatch count is checked here
    let err = driver.slide_to(slider, 68).unwrap_err();
    assert!(matches!(err, RobotError::AssertionFailed { .. }));
}

#[test]
fn test_dispatch_error_aborts_action() {
    let robot = launch();
    let button = robot
        .add_widget(Widget::new("ok", WidgetKind::Button), None)
        .unwrap();

    let mut input = MockInput::new();
    input
        .expect_dispatch()
        .returning(|_| Err(RobotError::UiThreadUnavailable));

    let driver = Driver::new(
        robot.bridge().clone(),
        robot.idle().clone(),
        Arc::new(input),
        Arc::clone(robot.tree()),
    );

    let err = driver.click(button).unwrap_err();
    assert!(matches!(err, RobotError::UiThreadUnavailable));
}

#[test]
fn test_locator_is_strict() {
    let robot = launch();
    let main = window(&robot);
    let dialog = robot
        .add_widget(Widget::new("dialog", WidgetKind::Panel), Some(main))
        .unwrap();
    robot
        .add_widget(Widget::new("ok", WidgetKind::Button), Some(main))
        .unwrap();
    let dialog_ok = robot
        .add_widget(Widget::new("ok", WidgetKind::Button), Some(dialog))
        .unwrap();

    let err = robot.locator().find(&Matcher::named("ok")).unwrap_err();
    assert!(err.to_string().contains("multiple components found"));

    let err = robot.locator().find(&Matcher::named("cancel")).unwrap_err();
    assert!(err.to_string().contains("no component found"));

    let found = robot
        .locator()
        .find_in(dialog, &Matcher::named("ok"))
        .unwrap();
    assert_eq!(found, dialog_ok);

    let all = robot
        .locator()
        .find_all(&Matcher::of_kind(WidgetKind::Button))
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_locator_showing_only() {
    let robot = launch();
    robot
        .add_widget(
            Widget::new("hint", WidgetKind::Label).with_visible(false),
            None,
        )
        .unwrap();
    let visible = robot
        .add_widget(Widget::new("hint", WidgetKind::Label), None)
        .unwrap();

    let found = robot
        .locator()
        .find(&Matcher::named("hint").showing_only())
        .unwrap();
    assert_eq!(found, visible);
}

#[test]
fn test_metrics_count_actions() {
    let robot = launch();
    let button = robot
        .add_widget(Widget::new("ok", WidgetKind::Button), None)
        .unwrap();
    let label = robot
        .add_widget(Widget::new("status", WidgetKind::Label), None)
        .unwrap();

    robot.driver().click(button).unwrap();
    let _ = robot.driver().click(label);

    let metrics = robot.metrics();
    assert_eq!(metrics.actions_performed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.actions_failed.load(Ordering::Relaxed), 1);
    assert!(metrics.input_events.load(Ordering::Relaxed) >= 1);
}
