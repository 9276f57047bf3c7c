//! Clock and dice implementations.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::application::ports::outbound::{ClockPort, RandomPort};

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Thread-local RNG dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomPort for ThreadRandom {
    fn random_range(&self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed dice for testing. Always lands on the same face.
#[cfg(test)]
pub struct FixedRandom(pub i32);

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn random_range(&self, min: i32, max: i32) -> i32 {
        self.0.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d20_stays_in_range() {
        let dice = ThreadRandom;
        for _ in 0..200 {
            let roll = dice.roll_d20();
            assert!((1..=20).contains(&roll));
        }
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(ThreadRandom.random_range(4, 4), 4);
    }
}
