//! Defines all configuration structures for the countdown engine.
//!
//! Configuration is layered. The engine starts from a set of defaults
//! (`CountdownConfig::default()`), then applies an optional shared override
//! (one per application) and finally a per-instance override. Override layers
//! are `ConfigLayer` values whose fields are all optional, so they can be
//! deserialized with `serde` from a TOML/JSON file or the environment.

use crate::components::hand::Hand;
use crate::error::CountdownError;
use crate::radix::RadixTable;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Default template: hours, minutes and seconds separated by colons.
pub const DEFAULT_TEMPLATE: &str = "$!h!:$!m!:$!s!";

/// Default placeholder pattern. Capture group 1 holds the unit symbol.
pub const DEFAULT_PATTERN: &str = r"\$!([\-\w]+)!";

/// Environment prefix read by [`ConfigLayer::load`].
pub const ENV_PREFIX: &str = "COUNTDOWN";

/// A function that replaces the built-in repaint. It receives every hand,
/// changed or not, on each reflow.
pub type RepaintFn = Arc<dyn Fn(&[Hand]) + Send + Sync>;

/// Wrapper so a custom repaint function can live inside a cloneable, debuggable config.
///
/// The function runs while the countdown holds its state lock, so it must not
/// call back into the countdown that owns it (`left()`, `text()`, ...).
#[derive(Clone)]
pub struct Repaint(pub RepaintFn);

impl Repaint {
    pub fn new(f: impl Fn(&[Hand]) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, hands: &[Hand]) {
        (self.0)(hands)
    }
}

impl fmt::Debug for Repaint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Repaint(..)")
    }
}

/// The effective configuration of one countdown run.
///
/// It is resolved once per initialization and not mutated afterwards.
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// Markup containing unit placeholders such as `$!h!`.
    pub template: String,

    /// Regular expression matching a placeholder; capture group 1 is the unit.
    pub pattern: String,

    /// Unit radix table, finest unit first.
    pub clock: RadixTable,

    /// Target duration in seconds. Takes precedence over `stop_time` when non-zero.
    pub left_time: Option<f64>,

    /// Absolute end timestamp in epoch milliseconds.
    pub stop_time: Option<i64>,

    /// Seconds before the end at which a one-shot notify event fires.
    pub notify: Vec<f64>,

    /// When true the countdown initializes paused and waits for `begin()`.
    pub demand: bool,

    /// Replaces the built-in digit repaint when set.
    pub repaint: Option<Repaint>,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            pattern: DEFAULT_PATTERN.to_string(),
            clock: RadixTable::default(),
            left_time: None,
            stop_time: None,
            notify: Vec::new(),
            demand: false,
            repaint: None,
        }
    }
}

impl CountdownConfig {
    /// Overlays every field `layer` sets onto `self`.
    pub fn apply(mut self, layer: &ConfigLayer) -> Self {
        if let Some(template) = &layer.template {
            self.template = template.clone();
        }
        if let Some(pattern) = &layer.pattern {
            self.pattern = pattern.clone();
        }
        if let Some(clock) = &layer.clock {
            self.clock = clock.clone();
        }
        if layer.left_time.is_some() {
            self.left_time = layer.left_time;
        }
        if layer.stop_time.is_some() {
            self.stop_time = layer.stop_time;
        }
        if let Some(notify) = &layer.notify {
            self.notify = notify.clone();
        }
        if let Some(demand) = layer.demand {
            self.demand = demand;
        }
        if layer.repaint.is_some() {
            self.repaint = layer.repaint.clone();
        }
        self
    }

    /// Rejects negative or non-finite target times.
    pub fn validate(&self) -> Result<(), CountdownError> {
        if let Some(secs) = self.left_time {
            if !secs.is_finite() || secs < 0.0 {
                return Err(CountdownError::InvalidLeftTime(secs));
            }
        }
        if let Some(end) = self.stop_time {
            if end < 0 {
                return Err(CountdownError::NegativeStopTime(end));
            }
        }
        Ok(())
    }

    /// Remaining milliseconds at `now_ms`, quantized down to `frequency`.
    ///
    /// `left_time` wins when it is set and non-zero; otherwise the distance to
    /// `stop_time` is used. The result may be negative when `stop_time` is in
    /// the past.
    pub fn remaining_ms(&self, frequency: i64, now_ms: i64) -> i64 {
        let mut left = self
            .left_time
            .map_or(0, |secs| (secs * 1000.0).round() as i64);
        if left == 0 {
            if let Some(end) = self.stop_time {
                left = end - now_ms;
            }
        }
        left - left % frequency
    }
}

/// A partial configuration: every field is optional and only set fields override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub template: Option<String>,
    pub pattern: Option<String>,
    pub clock: Option<RadixTable>,
    // `config` lowercases keys: `leftTime` arrives as `lefttime`.
    #[serde(alias = "lefttime")]
    pub left_time: Option<f64>,
    #[serde(alias = "stoptime")]
    pub stop_time: Option<i64>,
    pub notify: Option<Vec<f64>>,
    pub demand: Option<bool>,
    #[serde(skip)]
    pub repaint: Option<Repaint>,
}

impl ConfigLayer {
    /// Loads a layer from a configuration file (optional) and `COUNTDOWN_*`
    /// environment variables, the latter taking precedence.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CountdownError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("notify"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parses a layer from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CountdownError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// A layer that only sets the target duration.
    pub fn with_left_time(secs: f64) -> Self {
        Self {
            left_time: Some(secs),
            ..Default::default()
        }
    }
}

/// The three configuration layers a countdown is resolved from.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub defaults: CountdownConfig,
    pub shared: Option<ConfigLayer>,
    pub instance: ConfigLayer,
}

impl ConfigLayers {
    pub fn resolve(&self) -> CountdownConfig {
        resolve(&self.defaults, self.shared.as_ref(), &self.instance)
    }
}

impl From<ConfigLayer> for ConfigLayers {
    fn from(instance: ConfigLayer) -> Self {
        Self {
            instance,
            ..Default::default()
        }
    }
}

/// Merges the layers: instance overrides shared, shared overrides defaults.
pub fn resolve(
    defaults: &CountdownConfig,
    shared: Option<&ConfigLayer>,
    instance: &ConfigLayer,
) -> CountdownConfig {
    let config = defaults.clone();
    let config = match shared {
        Some(layer) => config.apply(layer),
        None => config,
    };
    config.apply(instance)
}
