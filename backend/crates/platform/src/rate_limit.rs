//! Rate Limiting Infrastructure
//!
//! Interval throttling: an action may be repeated only once a fixed interval
//! has passed since its previous occurrence.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Throttle check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    /// Rejected; the caller may retry after this many seconds (at least 1)
    Rejected { retry_after_secs: u64 },
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allowed)
    }
}

/// Fixed-interval throttle
///
/// `elapsed < interval` rejects, `elapsed >= interval` allows. A missing
/// previous occurrence always allows.
///
/// ## Examples
/// ```rust
/// use std::time::Duration;
/// use chrono::Utc;
/// use platform::rate_limit::IntervalThrottle;
///
/// let throttle = IntervalThrottle::new(Duration::from_secs(600));
/// assert!(throttle.check(None, Utc::now()).is_allowed());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IntervalThrottle {
    interval: Duration,
}

impl Default for IntervalThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(10 * 60))
    }
}

impl IntervalThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn check(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ThrottleDecision {
        let Some(last) = last else {
            return ThrottleDecision::Allowed;
        };

        // A timestamp in the future counts as zero elapsed time
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        if elapsed >= self.interval {
            return ThrottleDecision::Allowed;
        }

        let remaining = self.interval - elapsed;
        let mut retry_after_secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            retry_after_secs += 1;
        }
        ThrottleDecision::Rejected {
            retry_after_secs: retry_after_secs.max(1),
        }
    }
}
