//! Integration tests for the idle-wait barrier with synthetic input
//!
//! These tests verify that:
//! - After an idle wait, the effects of already-dispatched input are visible
//! - Repaints posted by input handlers are also waited for
//! - The barrier times out on a wedged UI thread instead of hanging
//! - Shutdown still runs follow-ups queued by input handlers

use guirobot::services::{InputEvent, InputSource, Key};
use guirobot::ui::{UiScheduler, task};
use guirobot::{Robot, RobotSettings, Widget, WidgetChange, WidgetKind};
use std::time::Duration;

fn launch() -> Robot {
    guirobot::logging::init_test_logging();
    Robot::launch(RobotSettings::default()).expect("robot should launch")
}

#[test]
fn test_click_toggle_then_idle_then_query() {
    let robot = launch();
    let toggle = robot
        .add_widget(Widget::new("bold", WidgetKind::ToggleButton), None)
        .unwrap();

    robot.input().dispatch(InputEvent::click(toggle)).unwrap();
    robot.wait_for_idle().unwrap();

    let widget = robot.driver().snapshot(toggle).unwrap();
    assert!(widget.selected, "toggle should have flipped after idle");
    assert_eq!(widget.repaints, 1, "repaint should have been processed too");
}

#[test]
fn test_many_events_all_visible_after_idle() {
    let robot = launch();
    let field = robot
        .add_widget(Widget::new("name", WidgetKind::TextField), None)
        .unwrap();

    robot.input().dispatch(InputEvent::click(field)).unwrap();
    for ch in "hello world".chars() {
        robot
            .input()
            .dispatch(InputEvent::key(field, Key::Char(ch)))
            .unwrap();
    }
    robot.wait_for_idle().unwrap();

    let widget = robot.driver().snapshot(field).unwrap();
    assert_eq!(widget.text, "hello world");
    assert!(widget.focused);
}

#[test]
fn test_listener_sees_changes_in_order() {
    let robot = launch();
    let check = robot
        .add_widget(Widget::new("agree", WidgetKind::CheckBox), None)
        .unwrap();
    let mut rx = robot.tree().subscribe();

    robot.input().dispatch(InputEvent::click(check)).unwrap();
    robot.wait_for_idle().unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            WidgetChange::FocusChanged {
                id: check,
                focused: true
            },
            WidgetChange::SelectionChanged {
                id: check,
                selected: true
            },
            WidgetChange::Repainted { id: check },
        ]
    );
}

#[test]
fn test_idle_times_out_on_busy_ui_thread() {
    let robot = launch();
    robot
        .ui_thread()
        .post(Box::new(|| std::thread::sleep(Duration::from_millis(300))))
        .unwrap();

    let err = robot
        .idle()
        .wait_for_idle_timeout(Duration::from_millis(20))
        .unwrap_err();
    assert!(err.is_timeout());

    // Eventually drains
    robot.wait_for_idle().unwrap();
    assert!(robot.idle().is_idle());
}

#[test]
fn test_idle_wait_from_ui_thread_is_rejected() {
    let robot = launch();
    let idle = robot.idle().clone();

    let err = robot
        .execute(task(move || {
            idle.wait_for_idle()?;
            Ok(())
        }))
        .unwrap_err();
    assert!(err.to_string().contains("Cannot wait for the UI thread"));
}

#[test]
fn test_disabled_widget_ignores_input() {
    let robot = launch();
    let toggle = robot
        .add_widget(
            Widget::new("locked", WidgetKind::ToggleButton).with_enabled(false),
            None,
        )
        .unwrap();

    robot.input().dispatch(InputEvent::click(toggle)).unwrap();
    robot.wait_for_idle().unwrap();

    let widget = robot.driver().snapshot(toggle).unwrap();
    assert!(!widget.selected);
    assert_eq!(widget.repaints, 0);
}

#[test]
fn test_repaint_queued_behind_shutdown_still_runs() {
    let robot = launch();
    let toggle = robot
        .add_widget(Widget::new("bold", WidgetKind::ToggleButton), None)
        .unwrap();

    robot.input().dispatch(InputEvent::click(toggle)).unwrap();
    robot.ui_thread().shutdown();

    let widget = robot.tree().snapshot(toggle).unwrap();
    assert!(widget.selected);
    assert_eq!(widget.repaints, 1, "repaint follow-up should run during shutdown");
    assert!(robot.idle().is_idle());
}
