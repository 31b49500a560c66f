//! Block cadence.
//!
//! The delay before a height is measured against a fixed epoch instead of
//! the previous block, so lateness at one height is paid back at the next
//! rather than accumulating.

use shared_types::{Height, Timestamp};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub block_time_secs: i64,
    pub min_secs: i64,
    pub max_secs: i64,
    /// Unix time the genesis height was scheduled for.
    pub epoch: Timestamp,
    pub genesis_height: Height,
}

impl Cadence {
    /// `clamp(block_time + (block_time * (height - genesis) - (now - epoch)), min, max)`
    pub fn delay_secs(&self, height: Height, now: Timestamp) -> i64 {
        let blocks = height.saturating_sub(self.genesis_height).min(i64::MAX as u64) as i64;
        let scheduled = self.block_time_secs.saturating_mul(blocks);
        let elapsed = now.saturating_sub(self.epoch);
        self.block_time_secs
            .saturating_add(scheduled.saturating_sub(elapsed))
            .clamp(self.min_secs, self.max_secs)
    }

    pub fn delay(&self, height: Height, now: Timestamp) -> Duration {
        Duration::from_secs(self.delay_secs(height, now).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cadence() -> Cadence {
        Cadence {
            block_time_secs: 10,
            min_secs: 2,
            max_secs: 30,
            epoch: 0,
            genesis_height: 0,
        }
    }

    #[test]
    fn test_on_schedule_waits_one_block_time() {
        // Height 10 is due at epoch + 100; we are exactly there.
        assert_eq!(cadence().delay_secs(10, 100), 10);
    }

    #[test]
    fn test_behind_schedule_shortens_to_min() {
        assert_eq!(cadence().delay_secs(10, 105), 5);
        assert_eq!(cadence().delay_secs(10, 500), 2);
    }

    #[test]
    fn test_ahead_of_schedule_lengthens_to_max() {
        assert_eq!(cadence().delay_secs(10, 95), 15);
        assert_eq!(cadence().delay_secs(10, 0), 30);
    }

    #[test]
    fn test_genesis_reference_offsets_height() {
        let shifted = Cadence {
            genesis_height: 100,
            ..cadence()
        };
        assert_eq!(shifted.delay_secs(110, 100), cadence().delay_secs(10, 100));
    }

    #[test]
    fn test_duration_form() {
        assert_eq!(cadence().delay(10, 100), Duration::from_secs(10));
    }
}
