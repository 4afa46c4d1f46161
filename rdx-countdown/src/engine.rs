//! The countdown engine: reflow, repaint and the lifecycle state machine.

use crate::common::{lock, ListenerId};
use crate::components::hand::Hand;
use crate::components::notify::NotifySchedule;
use crate::components::repaint;
use crate::components::scanner::{self, DEFAULT_FREQUENCY_MS};
use crate::components::surface::{plain_text, RenderSurface};
use crate::config::{ConfigLayer, ConfigLayers, CountdownConfig};
use crate::error::CountdownError;
use crate::events::{Action, LifecycleEvent, TransitionEvent};
use crate::time::TickSource;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Coarse state of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    /// Created but not initialized yet.
    Idle,
    Running,
    Paused,
    /// Stopped or finished. Only `restart` leaves this state.
    Terminal,
}

/// What `init` asks the owner to register with the tick source.
#[derive(Debug, Clone, Copy)]
struct Registration {
    generation: u64,
    frequency_ms: u64,
}

/// All mutable state of one countdown, owned by the `Countdown` handle and
/// shared only with its own tick callback.
struct CountdownState {
    layers: ConfigLayers,
    config: CountdownConfig,
    frequency: i64,
    hands: Vec<Hand>,
    notify: NotifySchedule,
    left: i64,
    initialized: bool,
    paused: bool,
    stopped: bool,
    /// Bumped on every initialization; ticks from older registrations are ignored.
    generation: u64,
    registration: Option<ListenerId>,
    surface: Box<dyn RenderSurface>,
    ticks: Arc<dyn TickSource>,
    transitions: broadcast::Sender<TransitionEvent>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
}

impl CountdownState {
    /// Resolves the configuration, scans the template, mounts the hands and
    /// renders the initial digits. Fails before touching the surface.
    fn init(&mut self, now_ms: i64) -> Result<Option<Registration>, CountdownError> {
        let config = self.layers.resolve();
        config.validate()?;
        let pattern = Regex::new(&config.pattern)?;
        let source = self
            .surface
            .initial_markup()
            .unwrap_or_else(|| config.template.clone());
        let scan = scanner::scan(&source, &pattern, &config.clock);
        let notify = NotifySchedule::new(&config.notify, scan.frequency)?;

        self.detach_hands();
        self.surface.mount(&scan.markup);
        self.hands = scan
            .hands
            .iter()
            .map(|spec| Hand::new(spec, &config.clock, self.surface.resolve(&spec.unit)))
            .collect();
        self.frequency = scan.frequency;
        self.left = config.remaining_ms(scan.frequency, now_ms);
        self.notify = notify;
        self.paused = config.demand;
        self.stopped = false;
        self.initialized = true;
        self.generation += 1;
        self.config = config;
        debug!(
            "Countdown initialized: {} hands, {} ms left, {} ms per tick, demand: {}.",
            self.hands.len(),
            self.left,
            self.frequency,
            self.paused
        );

        self.reflow(0, true);
        self.surface.set_visible(true);

        Ok((!self.stopped).then_some(Registration {
            generation: self.generation,
            frequency_ms: self.frequency.unsigned_abs(),
        }))
    }

    /// Advances by `count` ticks and refreshes every hand.
    ///
    /// `force` renders even while paused; it is used for the initial render,
    /// which also skips the notify check.
    fn reflow(&mut self, count: u32, force: bool) {
        if !force && (self.paused || self.stopped) {
            return;
        }
        self.left -= self.frequency * i64::from(count);
        for hand in &mut self.hands {
            hand.update(self.left);
        }
        trace!("Reflow by {} tick(s): {} ms left.", count, self.left);

        self.repaint();

        if !force && self.notify.check_and_consume(self.left) {
            self.lifecycle.send(LifecycleEvent::Notify(self.left)).ok();
            self.emit(Action::Notify);
        }

        if self.left < 1 {
            self.lifecycle.send(LifecycleEvent::Finished(0)).ok();
            self.stopped = true;
            self.emit(Action::Finished);
            self.teardown();
        }
    }

    fn repaint(&mut self) {
        if let Some(custom) = &self.config.repaint {
            custom.call(&self.hands);
            return;
        }
        let written = repaint::repaint(&self.hands, &mut *self.surface);
        trace!("Repainted {} of {} hands.", written, self.hands.len());
    }

    /// Deregisters from the tick source. Safe to call repeatedly.
    fn teardown(&mut self) {
        if let Some(id) = self.registration.take() {
            self.ticks.remove(id);
            debug!("Countdown deregistered tick listener {:?}.", id);
        }
    }

    fn detach_hands(&mut self) {
        for hand in &mut self.hands {
            if let Some(node) = hand.node.take() {
                self.surface.detach(node);
            }
        }
    }

    fn begin(&mut self) {
        self.paused = false;
        self.lifecycle.send(LifecycleEvent::Start).ok();
        self.emit(Action::Start);
    }

    fn restart(&mut self, now_ms: i64) -> Result<Option<Registration>, CountdownError> {
        if !self.stopped {
            self.teardown();
        }
        let registration = self.init(now_ms).inspect_err(|_| {
            // Nothing is registered any more; keep late ticks inert.
            self.stopped = true;
        })?;
        self.emit(Action::Restart);
        Ok(registration)
    }

    fn stop(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.stopped = true;
        self.teardown();
        self.emit(Action::Stop);
        true
    }

    fn pause(&mut self) -> bool {
        if self.stopped || self.paused {
            return false;
        }
        self.paused = true;
        self.emit(Action::Pause);
        true
    }

    fn resume(&mut self) -> bool {
        if self.stopped || !self.paused {
            return false;
        }
        self.paused = false;
        self.emit(Action::Resume);
        true
    }

    fn emit(&self, action: Action) {
        info!("Countdown {} ({} ms left).", action, self.left);
        self.transitions
            .send(TransitionEvent {
                action,
                left: self.left,
            })
            .ok();
    }

    fn status(&self) -> CountdownStatus {
        if !self.initialized {
            CountdownStatus::Idle
        } else if self.stopped {
            CountdownStatus::Terminal
        } else if self.paused {
            CountdownStatus::Paused
        } else {
            CountdownStatus::Running
        }
    }
}

/// Entry point of every tick delivered to a countdown.
fn on_tick(shared: &Weak<Mutex<CountdownState>>, generation: u64, count: u32) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut state = lock(&shared);
    if state.generation != generation {
        trace!("Ignoring tick from stale registration (generation {}).", generation);
        return;
    }
    state.reflow(count, false);
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A countdown bound to one render surface and one tick source.
///
/// The handle owns all countdown state. Dropping it deregisters the countdown
/// from the tick source.
pub struct Countdown {
    state: Arc<Mutex<CountdownState>>,
    ticks: Arc<dyn TickSource>,
    transitions: broadcast::Sender<TransitionEvent>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
}

impl Countdown {
    /// Creates an idle countdown. Subscribe to its events, then call
    /// [`Countdown::mount`] (or [`Countdown::init`]).
    pub fn new(
        layers: impl Into<ConfigLayers>,
        surface: impl RenderSurface + 'static,
        ticks: Arc<dyn TickSource>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (transitions, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (lifecycle, _) = broadcast::channel(64);

        let state = CountdownState {
            layers: layers.into(),
            config: CountdownConfig::default(),
            frequency: DEFAULT_FREQUENCY_MS,
            hands: Vec::new(),
            notify: NotifySchedule::default(),
            left: 0,
            initialized: false,
            paused: false,
            stopped: false,
            generation: 0,
            registration: None,
            surface: Box::new(surface),
            ticks: ticks.clone(),
            transitions: transitions.clone(),
            lifecycle: lifecycle.clone(),
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            ticks,
            transitions,
            lifecycle,
        }
    }

    /// Initializes the countdown and starts it unless `demand` is set.
    pub fn mount(&self) -> Result<(), CountdownError> {
        self.init()?;
        let mut state = lock(&self.state);
        if !state.config.demand {
            state.begin();
        }
        Ok(())
    }

    /// Initializes the countdown without emitting `start`.
    ///
    /// With `demand` set the countdown stays paused until [`Countdown::begin`].
    pub fn init(&self) -> Result<(), CountdownError> {
        let registration = {
            let mut state = lock(&self.state);
            state.teardown();
            state.init(now_ms())?
        };
        self.register(registration);
        Ok(())
    }

    /// Clears the paused flag and emits `start`.
    pub fn begin(&self) {
        let mut state = lock(&self.state);
        if state.initialized {
            state.begin();
        }
    }

    /// Tears down, re-resolves the configuration and starts a fresh run.
    ///
    /// Does nothing before the first initialization.
    pub fn restart(&self) -> Result<(), CountdownError> {
        let registration = {
            let mut state = lock(&self.state);
            if !state.initialized {
                return Ok(());
            }
            state.restart(now_ms())?
        };
        self.register(registration);
        Ok(())
    }

    /// Replaces the per-instance configuration layer. An initialized
    /// countdown restarts with the new configuration.
    pub fn reconfigure(&self, instance: ConfigLayer) -> Result<(), CountdownError> {
        let initialized = {
            let mut state = lock(&self.state);
            state.layers.instance = instance;
            state.initialized
        };
        if initialized {
            self.restart()
        } else {
            Ok(())
        }
    }

    /// Stops the countdown. Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        state.initialized && state.stop()
    }

    /// Returns `false` if the countdown is stopped or already paused.
    pub fn pause(&self) -> bool {
        let mut state = lock(&self.state);
        state.initialized && state.pause()
    }

    /// Returns `false` if the countdown is stopped or not paused.
    pub fn resume(&self) -> bool {
        let mut state = lock(&self.state);
        state.initialized && state.resume()
    }

    pub fn status(&self) -> CountdownStatus {
        lock(&self.state).status()
    }

    /// Remaining milliseconds.
    pub fn left(&self) -> i64 {
        lock(&self.state).left
    }

    /// Tick frequency in milliseconds chosen for the current template.
    pub fn frequency(&self) -> i64 {
        lock(&self.state).frequency
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// A snapshot of the hands.
    pub fn hands(&self) -> Vec<Hand> {
        lock(&self.state).hands.clone()
    }

    /// The effective configuration of the current run.
    pub fn config(&self) -> CountdownConfig {
        lock(&self.state).config.clone()
    }

    /// Notify instants (remaining milliseconds) that have not fired yet.
    pub fn pending_notifications(&self) -> Vec<i64> {
        lock(&self.state).notify.pending().collect()
    }

    /// The tick registration currently held, if any.
    pub fn registration(&self) -> Option<ListenerId> {
        lock(&self.state).registration
    }

    pub fn markup(&self) -> String {
        lock(&self.state).surface.markup()
    }

    /// The rendered clock with markup stripped, e.g. `"00:01:30"`.
    pub fn text(&self) -> String {
        plain_text(&self.markup())
    }

    /// Subscribes to the generic transition stream.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transitions.subscribe()
    }

    /// Subscribes to the dedicated `start` / `finished` / `notify` events.
    pub fn subscribe_lifecycle_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    #[doc(hidden)]
    fn register(&self, registration: Option<Registration>) {
        let Some(Registration {
            generation,
            frequency_ms,
        }) = registration
        else {
            return;
        };

        // The tick source is called without holding the state lock, since a
        // dispatch in flight may be waiting for that lock.
        let weak = Arc::downgrade(&self.state);
        let id = self.ticks.add(
            Box::new(move |count| on_tick(&weak, generation, count)),
            frequency_ms,
        );

        let stale = {
            let mut state = lock(&self.state);
            if state.generation == generation && !state.stopped {
                state.registration = Some(id);
                false
            } else {
                true
            }
        };
        if stale {
            self.ticks.remove(id);
        }
        self.ticks.start();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.teardown();
        state.detach_hands();
    }
}
