use anyhow::Result;
use colored::Colorize;
use countdown::prelude::*;
use countdown::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    let rule = "-".repeat(64);
    println!("{}", rule.dimmed());
    println!("  {}", ENGINE_NAME.cyan().bold());
    println!(
        "  Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", rule.dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  new <S>               - Creates a countdown of S seconds and starts it.");
    println!("  until <UNIX_MS>       - Creates a countdown ending at an absolute timestamp.");
    println!("  template <TEXT>       - Sets the clock template, e.g. $!m!:$!s-ext!.");
    println!("  notify <S>...         - Sets notify thresholds in seconds before the end.");
    println!("  demand on|off         - Whether a new countdown waits for 'begin'.");
    println!("  load <PATH>           - Loads the configuration layer from a TOML file.");
    println!("  begin | pause | resume | stop | restart");
    println!("  show                  - Prints the clock face and status.");
    println!("  watch on|off          - Toggles printing every tick.");
    println!("  exit                  - Quits the shell.");
}

/// Everything the shell keeps between commands.
struct Session {
    timer: TickTimer,
    layer: ConfigLayer,
    countdown: Option<Arc<Countdown>>,
    watching: Arc<AtomicBool>,
}

impl Session {
    /// Replaces the live countdown with a fresh one built from the current layer.
    fn spawn(&mut self) {
        // Dropping the old handle deregisters it.
        self.countdown = None;
        let countdown = Arc::new(Countdown::new(
            self.layer.clone(),
            MarkupSurface::new(),
            Arc::new(self.timer.clone()),
        ));
        spawn_event_listeners(&countdown);
        spawn_face_watcher(&countdown, self.watching.clone());
        match countdown.mount() {
            Ok(()) => {
                println!("--> {} [{:?}]", countdown.text().bold().green(), countdown.status());
                self.countdown = Some(countdown);
            }
            Err(e) => println!("Error: {}", e),
        }
    }

    /// Pushes the edited layer to the live countdown, if there is one.
    fn apply(&mut self) {
        let Some(countdown) = &self.countdown else {
            println!("--> Saved. It applies to the next 'new'.");
            return;
        };
        match countdown.reconfigure(self.layer.clone()) {
            Ok(()) => println!("--> {}", countdown.text().bold().green()),
            Err(e) => println!("Error: {}", e),
        }
    }

    fn with_countdown(&self, f: impl FnOnce(&Countdown)) {
        match &self.countdown {
            Some(countdown) => f(countdown.as_ref()),
            None => println!("No countdown. Use 'new <S>' first."),
        }
    }
}

/// Spawns tasks that print what the countdown reports.
fn spawn_event_listeners(countdown: &Countdown) {
    let mut transition_rx = countdown.subscribe_transitions();
    tokio::spawn(async move {
        while let Ok(event) = transition_rx.recv().await {
            println!("\n<-- [{}] {} ms left", event.action.to_string().cyan(), event.left);
        }
    });

    let mut lifecycle_rx = countdown.subscribe_lifecycle_events();
    tokio::spawn(async move {
        while let Ok(event) = lifecycle_rx.recv().await {
            match event {
                LifecycleEvent::Notify(left) => {
                    println!("<-- [NOTIFY] {} ms remaining", left.to_string().yellow())
                }
                LifecycleEvent::Finished(_) => println!("<-- [FINISHED] {}", "Time is up.".bold()),
                LifecycleEvent::Start => {}
            }
        }
    });
}

/// Prints the clock face whenever it changes while watching is on.
fn spawn_face_watcher(countdown: &Arc<Countdown>, watching: Arc<AtomicBool>) {
    let countdown = Arc::downgrade(countdown);
    tokio::spawn(async move {
        let mut frame = tokio::time::interval(Duration::from_millis(100));
        let mut last = String::new();
        loop {
            frame.tick().await;
            let Some(countdown) = countdown.upgrade() else {
                break;
            };
            if !watching.load(Ordering::Relaxed) {
                continue;
            }
            let face = countdown.text();
            if face != last {
                println!("<-- [WATCH] {}", face.green());
                last = face;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    // An optional TOML file seeds the configuration layer.
    let layer = match env::args().nth(1) {
        Some(path) => ConfigLayer::load(&path)?,
        None => ConfigLayer::default(),
    };

    let timer = TickTimer::realtime(Duration::from_millis(25));
    let mut session = Session {
        timer: timer.clone(),
        layer,
        countdown: None,
        watching: Arc::new(AtomicBool::new(false)),
    };
    info!("{} ready ({:?}).", ENGINE_NAME.cyan(), timer.driver());

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!("Type 'help' for commands or 'exit' to quit.");

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting countdown shell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "new" => match args.get(1).map(|s| s.parse::<f64>()) {
                Some(Ok(seconds)) => {
                    session.layer.left_time = Some(seconds);
                    session.layer.stop_time = None;
                    session.spawn();
                }
                Some(Err(_)) => println!("Error: '{}' is not a number of seconds.", args[1]),
                None => println!("Usage: new <SECONDS>"),
            },
            "until" => match args.get(1).map(|s| s.parse::<i64>()) {
                Some(Ok(stop_time)) => {
                    session.layer.left_time = None;
                    session.layer.stop_time = Some(stop_time);
                    session.spawn();
                }
                Some(Err(_)) => println!("Error: '{}' is not a unix timestamp in ms.", args[1]),
                None => println!("Usage: until <UNIX_MS>"),
            },
            "template" => match line.trim().split_once(' ') {
                Some((_, template)) => {
                    session.layer.template = Some(template.trim().to_string());
                    session.apply();
                }
                None => println!("Usage: template <TEXT>"),
            },
            "notify" => {
                let parsed: Result<Vec<f64>, _> =
                    args[1..].iter().map(|s| s.parse::<f64>()).collect();
                match parsed {
                    Ok(thresholds) => {
                        session.layer.notify = Some(thresholds);
                        session.apply();
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "demand" => match args.get(1) {
                Some(&"on") => session.layer.demand = Some(true),
                Some(&"off") => session.layer.demand = Some(false),
                _ => println!("Usage: demand on|off"),
            },
            "load" => match args.get(1) {
                Some(path) => match ConfigLayer::load(path) {
                    Ok(layer) => {
                        session.layer = layer;
                        println!("--> Loaded '{}'.", path);
                        session.apply();
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: load <PATH>"),
            },
            "begin" => session.with_countdown(|c| c.begin()),
            "pause" => session.with_countdown(|c| {
                if !c.pause() {
                    println!("--> Not running.");
                }
            }),
            "resume" => session.with_countdown(|c| {
                if !c.resume() {
                    println!("--> Not paused.");
                }
            }),
            "stop" => session.with_countdown(|c| {
                if !c.stop() {
                    println!("--> Already stopped.");
                }
            }),
            "restart" => session.with_countdown(|c| {
                if let Err(e) = c.restart() {
                    warn!("Restart failed: {}", e);
                }
            }),
            "show" | "status" => session.with_countdown(|c| {
                println!(
                    "--> {}  [{:?}, {} ms left, {} ms/tick, pending notify: {:?}]",
                    c.text().bold().green(),
                    c.status(),
                    c.left(),
                    c.frequency(),
                    c.pending_notifications()
                );
            }),
            "watch" => match args.get(1) {
                Some(&"on") => {
                    session.watching.store(true, Ordering::Relaxed);
                    println!("--> Watching ticks.");
                }
                Some(&"off") => {
                    session.watching.store(false, Ordering::Relaxed);
                    println!("--> Stopped watching ticks.");
                }
                _ => println!("Usage: watch on|off"),
            },
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line),
        }
    }

    session.countdown = None;
    timer.shutdown();
    Ok(())
}
