//! Defines the watcher a tick source keeps for every registered callback.

use std::fmt;

/// A callback invoked with the number of whole frequency periods that elapsed.
pub type TickCallback = Box<dyn FnMut(u32) + Send>;

/// Accumulates elapsed time for one registration and fires its callback once
/// per dispatch with the count of periods that passed.
#[doc(hidden)]
pub(crate) struct TickWatcher {
    pub frequency_ms: u64,
    carry_ms: u64,
    callback: TickCallback,
}

impl TickWatcher {
    /// Creates a new `TickWatcher`. A zero frequency is treated as 1 ms.
    pub(crate) fn new(frequency_ms: u64, callback: TickCallback) -> Self {
        Self {
            frequency_ms: frequency_ms.max(1),
            carry_ms: 0,
            callback,
        }
    }

    /// Adds `elapsed_ms` and invokes the callback if at least one period passed.
    /// Returns the tick count delivered, if any.
    pub(crate) fn advance(&mut self, elapsed_ms: u64) -> Option<u32> {
        self.carry_ms += elapsed_ms;
        let count = self.carry_ms / self.frequency_ms;
        if count == 0 {
            return None;
        }
        self.carry_ms %= self.frequency_ms;
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        (self.callback)(count);
        Some(count)
    }
}

impl fmt::Debug for TickWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickWatcher")
            .field("frequency_ms", &self.frequency_ms)
            .field("carry_ms", &self.carry_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(frequency_ms: u64) -> (TickWatcher, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let watcher = TickWatcher::new(
            frequency_ms,
            Box::new(move |count| sink.lock().unwrap().push(count)),
        );
        (watcher, seen)
    }

    #[test]
    fn test_fires_once_per_period() {
        let (mut watcher, seen) = recording(1000);
        assert_eq!(watcher.advance(400), None);
        assert_eq!(watcher.advance(600), Some(1));
        assert_eq!(watcher.advance(1000), Some(1));
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_coalesces_missed_periods() {
        let (mut watcher, seen) = recording(100);
        assert_eq!(watcher.advance(350), Some(3));
        assert_eq!(watcher.advance(50), Some(1));
        assert_eq!(*seen.lock().unwrap(), vec![3, 1]);
    }
}
