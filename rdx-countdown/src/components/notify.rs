//! One-shot notifications at fixed remaining-time instants.

use crate::error::CountdownError;
use std::collections::BTreeSet;

/// Pending notify instants, quantized to the tick frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifySchedule {
    pending: BTreeSet<i64>,
}

impl NotifySchedule {
    /// Builds the schedule from thresholds given in seconds before the end.
    ///
    /// Each threshold must be a positive number; anything else fails the whole
    /// configuration. The instant is `t * 1000` rounded down to a multiple of
    /// `frequency`, since `left` only ever takes such values.
    pub fn new(thresholds: &[f64], frequency: i64) -> Result<Self, CountdownError> {
        let mut pending = BTreeSet::new();
        for &secs in thresholds {
            if secs.is_nan() || secs <= 0.0 {
                return Err(CountdownError::InvalidNotify(secs));
            }
            let ms = (secs * 1000.0).round() as i64;
            pending.insert(ms - ms % frequency);
        }
        Ok(Self { pending })
    }

    /// Returns `true` exactly once for each scheduled instant equal to `left`.
    pub fn check_and_consume(&mut self, left: i64) -> bool {
        self.pending.remove(&left)
    }

    pub fn pending(&self) -> impl Iterator<Item = i64> + '_ {
        self.pending.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
