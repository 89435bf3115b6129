//! Percentage progress tracking for single-file downloads.
//!
//! The fetcher reports whole percentages only. Updates are monotonic,
//! clamped to `0..=100`, and a value is only emitted when it changes.
//! When the total size is unknown nothing is emitted at all.

/// Callback receiving whole-percent progress for a single download.
pub type PercentCallback<'a> = &'a dyn Fn(u8);

/// Converts a running byte count into de-duplicated percentages.
#[derive(Debug, Clone)]
pub struct PercentTracker {
    total: u64,
    done: u64,
    last: Option<u8>,
}

impl PercentTracker {
    /// Create a tracker for a body of `total` bytes.
    ///
    /// Pass `None` (or `Some(0)`) when the content length is unknown.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.unwrap_or(0),
            done: 0,
            last: None,
        }
    }

    /// Whether percentages can be reported at all.
    pub fn is_known(&self) -> bool {
        self.total > 0
    }

    /// Bytes recorded so far.
    pub fn bytes_done(&self) -> u64 {
        self.done
    }

    /// Record `bytes` more bytes.
    ///
    /// Returns the new percentage if it differs from the last one reported.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.done = self.done.saturating_add(bytes);
        if !self.is_known() {
            return None;
        }

        let pct = (self.done.saturating_mul(100) / self.total).min(100) as u8;
        match self.last {
            Some(last) if pct <= last => None,
            _ => {
                self.last = Some(pct);
                Some(pct)
            }
        }
    }
}
