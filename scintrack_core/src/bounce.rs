//! Bounce counting and the bounce-limit policy.

use serde::{Deserialize, Serialize};

/// Number of reflections a photon went through since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceCounter {
    count: u32,
}

impl BounceCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Counts one more reflection and returns the new count.
    pub fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Back to zero (exit, detection or kill).
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Maximum number of reflections before a photon is killed.
///
/// A limit of 0 disables the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceLimit(u32);

impl BounceLimit {
    /// No limit at all.
    pub const UNLIMITED: BounceLimit = BounceLimit(0);

    /// Creates a limit (0 = unlimited).
    pub fn new(limit: u32) -> Self {
        Self(limit)
    }

    /// Raw limit value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if the limit is disabled.
    pub fn is_unlimited(&self) -> bool {
        self.0 == 0
    }

    /// Returns true once `count` reflections hit the limit.
    pub fn is_reached(&self, count: u32) -> bool {
        self.0 > 0 && count >= self.0
    }
}

impl Default for BounceLimit {
    fn default() -> Self {
        Self(10_000)
    }
}

impl std::fmt::Display for BounceLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unlimited() {
            write!(f, "unlimited")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments_and_resets() {
        let mut counter = BounceCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_limit_reached_at_exact_count() {
        let limit = BounceLimit::new(3);
        assert!(!limit.is_reached(2));
        assert!(limit.is_reached(3));
        assert!(limit.is_reached(4));
    }

    #[test]
    fn test_zero_means_unlimited() {
        let limit = BounceLimit::UNLIMITED;
        assert!(limit.is_unlimited());
        assert!(!limit.is_reached(u32::MAX));
        assert_eq!(limit.to_string(), "unlimited");
    }
}
