use anyhow::Result;
use colored::Colorize;
use countdown::prelude::*;
use countdown::ENGINE_NAME;
use std::env;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "countdown.toml";
const DEFAULT_LEFT_TIME: f64 = 10.0;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the instance layer from a file (optional) and COUNTDOWN_* variables.
    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let mut instance = ConfigLayer::load(&path)?;
    if instance.left_time.is_none() && instance.stop_time.is_none() {
        instance.left_time = Some(DEFAULT_LEFT_TIME);
    }

    // 3. Create the tick source and the countdown.
    let timer = TickTimer::realtime(Duration::from_millis(25));
    let countdown = Countdown::new(instance, MarkupSurface::new(), Arc::new(timer.clone()));

    // 4. Spawn listeners before mounting so the start event is seen.
    spawn_event_listeners(&countdown);
    let mut lifecycle_rx = countdown.subscribe_lifecycle_events();

    // 5. Mount and render until finished or Ctrl+C.
    countdown.mount()?;
    info!("{} v{} running with config '{}'.", ENGINE_NAME.cyan(), countdown::VERSION, path);
    if countdown.is_paused() {
        info!("Countdown is on demand; beginning it now.");
        countdown.begin();
    }

    let mut frame = tokio::time::interval(Duration::from_millis(100));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                info!("Shutdown signal received.");
                countdown.stop();
                break;
            }
            event = lifecycle_rx.recv() => match event {
                Ok(LifecycleEvent::Finished(_)) | Err(broadcast::error::RecvError::Closed) => break,
                _ => {}
            },
            _ = frame.tick() => draw(&countdown),
        }
    }

    draw(&countdown);
    println!();
    timer.shutdown();
    Ok(())
}

/// Redraws the clock face in place.
fn draw(countdown: &Countdown) {
    print!("\r  {}  ", countdown.text().bold().green());
    std::io::stdout().flush().ok();
}

/// Logs every transition reported by the countdown.
fn spawn_event_listeners(countdown: &Countdown) {
    let mut transition_rx = countdown.subscribe_transitions();
    tokio::spawn(async move {
        while let Ok(event) = transition_rx.recv().await {
            info!("[TRANSITION] => {} ({} ms left)", event.action, event.left);
        }
    });

    let mut lifecycle_rx = countdown.subscribe_lifecycle_events();
    tokio::spawn(async move {
        while let Ok(event) = lifecycle_rx.recv().await {
            if let LifecycleEvent::Notify(left) = event {
                info!("[NOTIFY] => {} ms remaining", left.to_string().yellow());
            }
        }
    });
}
