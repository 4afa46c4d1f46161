//! # Countdown
//!
//! A tick-driven countdown engine for Rust.
//!
//! Given a target duration or an absolute end timestamp, a `Countdown`
//! repeatedly computes the remaining time, splits it into unit "hands"
//! (days, hours, minutes, seconds, tenths) and writes digit markup to a render
//! surface, touching only the hands whose value changed.
//!
//! ## Core Concepts
//!
//! - **Radix table**: an ordered list of units, finest first, that defines how a
//!   flat millisecond count decomposes into hands.
//! - **Template**: markup with placeholders such as `$!m!` or `$!s-ext!`. It is
//!   scanned once per run into hand markup and hand registrations.
//! - **Tick source**: anything implementing `TickSource`. The bundled
//!   `TickTimer` is driven by hand or by a tokio interval.
//! - **Lifecycle**: `begin`, `pause`, `resume`, `stop`, `restart` and natural
//!   finish, each reported on a broadcast event stream.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use countdown::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. A realtime tick source.
//!     let timer = TickTimer::realtime(Duration::from_millis(50));
//!
//!     // 2. A ten second countdown rendering into an in-memory surface.
//!     let countdown = Countdown::new(
//!         ConfigLayer::with_left_time(10.0),
//!         MarkupSurface::new(),
//!         Arc::new(timer.clone()),
//!     );
//!
//!     // 3. Subscribe before mounting so no event is missed.
//!     let mut events = countdown.subscribe_lifecycle_events();
//!     countdown.mount()?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let LifecycleEvent::Finished(_) = event {
//!             break;
//!         }
//!     }
//!     println!("{}", countdown.text());
//!     timer.shutdown();
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Countdown Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod radix;
pub mod time;

/// A prelude module for easy importing of the most common countdown types.
pub mod prelude {
    pub use crate::common::{ListenerId, NodeId};
    pub use crate::components::hand::Hand;
    pub use crate::components::surface::{MarkupSurface, RenderSurface};
    pub use crate::config::{ConfigLayer, ConfigLayers, CountdownConfig, Repaint};
    pub use crate::engine::{Countdown, CountdownStatus};
    pub use crate::error::CountdownError;
    pub use crate::events::{Action, LifecycleEvent, TransitionEvent};
    pub use crate::radix::{RadixTable, UnitRadix};
    pub use crate::time::{TickDriver, TickSource, TickTimer};
}
