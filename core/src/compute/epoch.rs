use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Error returned when a fetch or decode job notices its epoch is stale.
///
/// Jobs check their [`EpochToken`] at well-defined boundaries (top of each
/// decode row, right before publishing) and propagate this with `?` to
/// exit early. It is never surfaced to the consumer as a failure.
///
/// # Example
///
/// ```ignore
/// for row in 0..row_count {
///     token.check()?;
///     decode(row);
/// }
/// token.check()?;
/// publish(result);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("fetch cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Pipeline-wide monotonically increasing cancellation counter.
///
/// Cloning creates another handle to the same counter. Every fetch request
/// takes a [`snapshot`](FetchEpoch::snapshot); any call to
/// [`advance`](FetchEpoch::advance) on any clone invalidates every
/// outstanding token at once, across all stages.
#[derive(Clone, Debug)]
pub struct FetchEpoch {
    counter: Arc<AtomicU64>,
}

impl FetchEpoch {
    /// Creates a new epoch counter starting at zero.
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the current epoch value.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Increments the epoch, invalidating all outstanding tokens.
    ///
    /// Returns the new epoch value.
    pub fn advance(&self) -> u64 {
        let next = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("fetch epoch advanced to {next}");
        next
    }

    /// Captures the current epoch into a token a job can carry around.
    pub fn snapshot(&self) -> EpochToken {
        EpochToken {
            counter: Arc::clone(&self.counter),
            value: self.current(),
        }
    }

    /// Advances the epoch and returns a token for the new value.
    pub fn advance_and_snapshot(&self) -> EpochToken {
        let value = self.advance();
        EpochToken {
            counter: Arc::clone(&self.counter),
            value,
        }
    }
}

impl Default for FetchEpoch {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a [`FetchEpoch`] taken when a request was issued.
#[derive(Clone, Debug)]
pub struct EpochToken {
    counter: Arc<AtomicU64>,
    value: u64,
}

impl EpochToken {
    /// The epoch value this token was issued for.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Returns whether the epoch has not moved since the snapshot.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.value
    }

    /// Returns `Err(Cancelled)` if the epoch has moved since the snapshot.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_current() {
            Ok(())
        } else {
            Err(Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_current() {
        let epoch = FetchEpoch::new();
        let token = epoch.snapshot();
        assert!(token.is_current());
        assert_eq!(token.check(), Ok(()));
    }

    #[test]
    fn advance_invalidates_outstanding_tokens() {
        let epoch = FetchEpoch::new();
        let a = epoch.snapshot();
        let b = epoch.snapshot();

        epoch.advance();

        assert_eq!(a.check(), Err(Cancelled));
        assert_eq!(b.check(), Err(Cancelled));
        assert!(epoch.snapshot().is_current());
    }

    #[test]
    fn clones_share_the_counter() {
        let epoch = FetchEpoch::new();
        let other = epoch.clone();
        let token = epoch.snapshot();

        other.advance();

        assert!(!token.is_current());
        assert_eq!(epoch.current(), 1);
    }

    #[test]
    fn advance_is_monotonic() {
        let epoch = FetchEpoch::new();
        let first = epoch.advance_and_snapshot();
        let second = epoch.advance_and_snapshot();
        assert!(second.value() > first.value());
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(Cancelled.to_string(), "fetch cancelled");
    }
}
