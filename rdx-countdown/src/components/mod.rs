//! Contains the building blocks the countdown engine is assembled from.
//!
//! The scanner turns a template into hand registrations, hands hold per-unit
//! state, the repaint module writes changed hands to a render surface, and
//! the notify schedule tracks one-shot thresholds. The tick watcher is the
//! per-registration state kept by the bundled tick source.

pub mod hand;
pub mod markup;
pub mod notify;
pub mod repaint;
pub mod scanner;
pub mod surface;
pub mod watcher;
