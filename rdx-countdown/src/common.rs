//! Contains common, primitive types shared across the countdown engine.
//!
//! This module defines the key types used to identify tick registrations and
//! render nodes, plus a few small helpers. Using distinct key types keeps a
//! listener handle from ever being mistaken for a node handle.

use slotmap::new_key_type;
use std::sync::{Mutex, MutexGuard, PoisonError};

new_key_type! {
    /// Uniquely and safely identifies a callback registered with a tick source.
    ///
    /// The key returned by `TickSource::add` is the one canonical handle for a
    /// registration; the same key is later handed back to `TickSource::remove`.
    pub struct ListenerId;

    /// Identifies a writable cell on a render surface.
    ///
    /// Each `Hand` holds at most one `NodeId`, resolved when the surface is mounted.
    pub struct NodeId;
}

/// Placeholder that expands into a seconds hand and a sub-second hand sharing one cell.
pub const EXTENDED_SECONDS: &str = "s-ext";

/// Unit symbol of the seconds hand.
pub const SECONDS_UNIT: &str = "s";

/// Unit symbol of the sub-second (tenths) hand.
pub const SUB_SECOND_UNIT: &str = "u";

/// Locks a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
