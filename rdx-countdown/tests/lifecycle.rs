//! End-to-end tests driving a countdown through a manual tick timer.

use countdown::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

fn setup(layer: ConfigLayer) -> (Countdown, TickTimer) {
    let timer = TickTimer::manual();
    let countdown = Countdown::new(layer, MarkupSurface::new(), Arc::new(timer.clone()));
    (countdown, timer)
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn actions(rx: &mut broadcast::Receiver<TransitionEvent>) -> Vec<Action> {
    drain(rx).into_iter().map(|e| e.action).collect()
}

fn value_of(countdown: &Countdown, unit: &str) -> i64 {
    countdown
        .hands()
        .into_iter()
        .find(|h| h.unit == unit)
        .map(|h| h.value)
        .expect("hand is registered")
}

fn second() -> Duration {
    Duration::from_secs(1)
}

#[test]
fn test_five_second_countdown_end_to_end() {
    let (countdown, timer) = setup(ConfigLayer::with_left_time(5.0));
    let mut lifecycle = countdown.subscribe_lifecycle_events();
    let mut transitions = countdown.subscribe_transitions();
    countdown.mount().unwrap();

    assert_eq!(countdown.frequency(), 1000);
    assert_eq!(value_of(&countdown, "s"), 5);
    assert_eq!(countdown.text(), "00:00:05");

    for _ in 0..4 {
        timer.advance(second());
    }
    assert_eq!(value_of(&countdown, "s"), 1);
    assert_eq!(countdown.text(), "00:00:01");

    timer.advance(second());
    assert_eq!(countdown.left(), 0);
    assert_eq!(countdown.text(), "00:00:00");
    assert_eq!(countdown.status(), CountdownStatus::Terminal);
    assert_eq!(
        drain(&mut lifecycle),
        vec![LifecycleEvent::Start, LifecycleEvent::Finished(0)]
    );
    let finished = drain(&mut transitions).pop().unwrap();
    assert_eq!(finished.action, Action::Finished);
    assert_eq!(finished.left, 0);

    // Torn down: later ticks do nothing.
    assert!(timer.is_empty());
    timer.advance(Duration::from_secs(3));
    assert_eq!(countdown.left(), 0);
    assert!(drain(&mut lifecycle).is_empty());
    assert!(drain(&mut transitions).is_empty());
}

#[test]
fn test_decomposition_across_units() {
    let (countdown, _timer) = setup(ConfigLayer {
        template: Some("$!d!d $!h!:$!m!:$!s!".to_string()),
        left_time: Some((86_400 + 3_600 * 2 + 60 * 3 + 4) as f64),
        ..Default::default()
    });
    countdown.mount().unwrap();
    assert_eq!(countdown.text(), "01d 02:03:04");

    let (countdown, _timer) = setup(ConfigLayer {
        template: Some("$!m!:$!s!".to_string()),
        left_time: Some(90.0),
        ..Default::default()
    });
    countdown.mount().unwrap();
    assert_eq!(value_of(&countdown, "m"), 1);
    assert_eq!(value_of(&countdown, "s"), 30);
}

#[test]
fn test_stop_is_idempotent() {
    let (countdown, timer) = setup(ConfigLayer::with_left_time(10.0));
    let mut transitions = countdown.subscribe_transitions();
    countdown.mount().unwrap();
    timer.advance(second());

    assert!(countdown.stop());
    let left = countdown.left();
    let hands = countdown.hands();
    assert!(!countdown.stop());

    assert_eq!(actions(&mut transitions), vec![Action::Start, Action::Stop]);
    assert_eq!(countdown.left(), left);
    assert_eq!(countdown.hands(), hands);
    assert!(timer.is_empty());
}

#[test]
fn test_pause_freezes_progress() {
    let (countdown, timer) = setup(ConfigLayer::with_left_time(10.0));
    countdown.mount().unwrap();
    timer.advance(Duration::from_secs(2));
    assert_eq!(countdown.left(), 8_000);

    assert!(countdown.pause());
    let frozen = countdown.hands();
    for _ in 0..5 {
        timer.advance(second());
    }
    assert_eq!(countdown.left(), 8_000);
    assert_eq!(countdown.hands(), frozen);
    assert_eq!(countdown.text(), "00:00:08");

    assert!(countdown.resume());
    timer.advance(second());
    assert_eq!(countdown.left(), 7_000);
    assert_eq!(countdown.text(), "00:00:07");
}

#[test]
fn test_notify_fires_exactly_once() {
    let (countdown, timer) = setup(ConfigLayer {
        left_time: Some(10.0),
        notify: Some(vec![3.0]),
        ..Default::default()
    });
    let mut lifecycle = countdown.subscribe_lifecycle_events();
    let mut transitions = countdown.subscribe_transitions();
    countdown.mount().unwrap();
    assert_eq!(countdown.pending_notifications(), vec![3_000]);

    for _ in 0..6 {
        timer.advance(second());
    }
    assert!(!drain(&mut lifecycle).contains(&LifecycleEvent::Notify(3_000)));

    timer.advance(second());
    assert_eq!(drain(&mut lifecycle), vec![LifecycleEvent::Notify(3_000)]);
    let notify = drain(&mut transitions).pop().unwrap();
    assert_eq!(notify.action, Action::Notify);
    assert_eq!(notify.left, 3_000);
    assert!(countdown.pending_notifications().is_empty());

    for _ in 0..3 {
        timer.advance(second());
    }
    assert_eq!(drain(&mut lifecycle), vec![LifecycleEvent::Finished(0)]);
}

#[test]
fn test_notify_is_quantized_to_tick_frequency() {
    let (countdown, timer) = setup(ConfigLayer {
        template: Some("$!s-ext!".to_string()),
        left_time: Some(2.0),
        notify: Some(vec![1.25]),
        ..Default::default()
    });
    let mut lifecycle = countdown.subscribe_lifecycle_events();
    countdown.mount().unwrap();
    assert_eq!(countdown.pending_notifications(), vec![1_200]);

    timer.advance(Duration::from_millis(800));
    assert_eq!(
        drain(&mut lifecycle),
        vec![LifecycleEvent::Start, LifecycleEvent::Notify(1_200)]
    );
}

#[test]
fn test_restart_resets_cleanly() {
    let (countdown, timer) = setup(ConfigLayer {
        left_time: Some(10.0),
        notify: Some(vec![8.0]),
        ..Default::default()
    });
    let mut transitions = countdown.subscribe_transitions();
    countdown.mount().unwrap();
    for _ in 0..3 {
        timer.advance(second());
    }
    assert_eq!(countdown.left(), 7_000);
    assert!(countdown.pending_notifications().is_empty());

    countdown.restart().unwrap();
    assert_eq!(countdown.left(), 10_000);
    assert_eq!(countdown.text(), "00:00:10");
    assert!(countdown.hands().iter().all(|h| h.last_value.is_none()));
    assert_eq!(countdown.pending_notifications(), vec![8_000]);
    assert_eq!(timer.len(), 1);

    let restart = drain(&mut transitions).pop().unwrap();
    assert_eq!(restart.action, Action::Restart);
    assert_eq!(restart.left, 10_000);

    timer.advance(second());
    assert_eq!(countdown.left(), 9_000);
}

#[test]
fn test_restart_after_finish_runs_again() {
    let (countdown, timer) = setup(ConfigLayer::with_left_time(1.0));
    let mut lifecycle = countdown.subscribe_lifecycle_events();
    countdown.mount().unwrap();
    timer.advance(second());
    assert_eq!(countdown.status(), CountdownStatus::Terminal);
    assert!(timer.is_empty());

    countdown.restart().unwrap();
    assert_eq!(countdown.status(), CountdownStatus::Running);
    assert_eq!(timer.len(), 1);
    timer.advance(second());
    assert_eq!(
        drain(&mut lifecycle),
        vec![
            LifecycleEvent::Start,
            LifecycleEvent::Finished(0),
            LifecycleEvent::Finished(0)
        ]
    );
}

#[test]
fn test_restart_after_stop_re_registers() {
    let (countdown, timer) = setup(ConfigLayer::with_left_time(5.0));
    countdown.mount().unwrap();
    countdown.stop();
    assert!(timer.is_empty());

    countdown.restart().unwrap();
    assert_eq!(timer.len(), 1);
    timer.advance(second());
    assert_eq!(countdown.left(), 4_000);
}

#[test]
fn test_repaint_skips_unchanged_hands() {
    let surface = Arc::new(Mutex::new(MarkupSurface::new()));
    let timer = TickTimer::manual();
    let countdown = Countdown::new(
        ConfigLayer {
            template: Some("$!m!:$!s!".to_string()),
            left_time: Some(90.0),
            ..Default::default()
        },
        surface.clone(),
        Arc::new(timer.clone()),
    );
    countdown.mount().unwrap();
    assert_eq!(surface.lock().unwrap().writes(), 2);
    assert!(surface.lock().unwrap().is_visible());

    timer.advance(second());
    assert_eq!(surface.lock().unwrap().writes(), 3);
    assert_eq!(surface.lock().unwrap().text(), "01:29");

    // 90s -> 59s crosses the minute boundary once.
    timer.advance(Duration::from_secs(30));
    assert_eq!(surface.lock().unwrap().writes(), 5);
    assert_eq!(surface.lock().unwrap().text(), "00:59");
}

#[test]
fn test_extended_seconds_render_tenths() {
    let (countdown, timer) = setup(ConfigLayer {
        template: Some("$!m!:$!s-ext!".to_string()),
        left_time: Some(2.5),
        ..Default::default()
    });
    countdown.mount().unwrap();
    assert_eq!(countdown.frequency(), 100);
    assert_eq!(countdown.text(), "00:02.5");

    timer.advance(Duration::from_millis(300));
    assert_eq!(countdown.left(), 2_200);
    assert_eq!(countdown.text(), "00:02.2");
}

#[test]
fn test_coalesced_ticks_advance_in_one_reflow() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let (countdown, timer) = setup(ConfigLayer {
        template: Some("$!s!".to_string()),
        left_time: Some(10.0),
        repaint: Some(Repaint::new(move |hands| {
            sink.lock().unwrap().push(hands[0].value);
        })),
        ..Default::default()
    });
    countdown.mount().unwrap();
    timer.advance(Duration::from_secs(3));
    assert_eq!(countdown.left(), 7_000);
    assert_eq!(*seen.lock().unwrap(), vec![10, 7]);
}

#[test]
fn test_stop_time_derives_remaining() {
    let now = chrono::Utc::now().timestamp_millis();
    let (countdown, _timer) = setup(ConfigLayer {
        stop_time: Some(now + 60_999),
        ..Default::default()
    });
    countdown.mount().unwrap();
    let left = countdown.left();
    assert!((59_000..=60_000).contains(&left), "left was {left}");
    assert_eq!(left % 1000, 0);
}

#[test]
fn test_past_stop_time_renders_zeros_and_finishes_at_once() {
    let now = chrono::Utc::now().timestamp_millis();
    let (countdown, timer) = setup(ConfigLayer {
        stop_time: Some(now - 90_000),
        ..Default::default()
    });
    let mut lifecycle = countdown.subscribe_lifecycle_events();
    let mut transitions = countdown.subscribe_transitions();
    countdown.init().unwrap();

    assert!(countdown.left() < 0);
    assert_eq!(countdown.text(), "00:00:00");
    assert_eq!(countdown.status(), CountdownStatus::Terminal);
    assert_eq!(drain(&mut lifecycle), vec![LifecycleEvent::Finished(0)]);
    assert_eq!(actions(&mut transitions), vec![Action::Finished]);
    assert!(timer.is_empty());

    timer.advance(Duration::from_secs(2));
    assert!(drain(&mut lifecycle).is_empty());
}

#[test]
fn test_shared_layer_applies_under_instance() {
    let timer = TickTimer::manual();
    let layers = ConfigLayers {
        defaults: CountdownConfig::default(),
        shared: Some(ConfigLayer {
            template: Some("$!m!m$!s!s".to_string()),
            demand: Some(true),
            ..Default::default()
        }),
        instance: ConfigLayer::with_left_time(61.0),
    };
    let countdown = Countdown::new(layers, MarkupSurface::new(), Arc::new(timer.clone()));
    countdown.mount().unwrap();
    assert_eq!(countdown.text(), "01m01s");
    assert_eq!(countdown.status(), CountdownStatus::Paused);
}
