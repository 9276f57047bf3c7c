//! Clock and dice abstractions
//!
//! Services take these instead of calling `Utc::now()` or `rand` directly so
//! tests can pin time and rolls.

use chrono::{DateTime, Utc};

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform integer in `min..=max`
    fn random_range(&self, min: i32, max: i32) -> i32;

    fn roll_d20(&self) -> i32 {
        self.random_range(1, 20)
    }
}
