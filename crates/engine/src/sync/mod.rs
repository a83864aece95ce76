// Sync reconciler: blends local edits of the open document with server polls.
//
// `state` is the pure Clean / Editing / SaveInFlight machine; `session` drives
// it from a tokio task with the debounce timer and the poll interval.

pub mod debounce;
pub mod session;
pub mod state;

pub use debounce::SaveDebounce;
pub use session::{DocumentHost, DocumentSession, SessionClosed};
pub use state::{Draft, DocumentSyncState, DocumentView, LocalEdit, PollDecision, SyncPhase};

use std::time::Duration;

/// Default autosave debounce.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
/// Default edit-suppression window.
pub const DEFAULT_SUPPRESSION_MS: u64 = 3_000;
/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

const DEBOUNCE_RANGE_MS: (u64, u64) = (100, 10_000);
const SUPPRESSION_RANGE_MS: (u64, u64) = (500, 60_000);
const POLL_RANGE_MS: (u64, u64) = (1_000, 300_000);

/// Timer settings for one document session. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Quiet period after the last edit before a save is issued.
    pub debounce: Duration,
    /// How long after a local edit poll results are withheld from the draft.
    pub suppression_window: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            suppression_window: Duration::from_millis(DEFAULT_SUPPRESSION_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl SyncTiming {
    /// Build from milliseconds, clamping each value to its supported range.
    pub fn with_millis(debounce_ms: u64, suppression_ms: u64, poll_interval_ms: u64) -> Self {
        let clamp = |ms: u64, (min, max): (u64, u64)| Duration::from_millis(ms.clamp(min, max));
        Self {
            debounce: clamp(debounce_ms, DEBOUNCE_RANGE_MS),
            suppression_window: clamp(suppression_ms, SUPPRESSION_RANGE_MS),
            poll_interval: clamp(poll_interval_ms, POLL_RANGE_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let timing = SyncTiming::default();
        assert_eq!(timing.debounce, Duration::from_millis(1_000));
        assert_eq!(timing.suppression_window, Duration::from_millis(3_000));
        assert_eq!(timing.poll_interval, Duration::from_millis(5_000));
    }

    #[test]
    fn with_millis_clamps_each_field() {
        let timing = SyncTiming::with_millis(1, 1_000_000, 10);
        assert_eq!(timing.debounce, Duration::from_millis(100));
        assert_eq!(timing.suppression_window, Duration::from_millis(60_000));
        assert_eq!(timing.poll_interval, Duration::from_millis(1_000));
    }

    #[test]
    fn with_millis_keeps_in_range_values() {
        let timing = SyncTiming::with_millis(750, 2_000, 4_000);
        assert_eq!(timing, SyncTiming {
            debounce: Duration::from_millis(750),
            suppression_window: Duration::from_millis(2_000),
            poll_interval: Duration::from_millis(4_000),
        });
    }
}
