//! Fixed clock with manual advancement.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::ports::clock::Clock;

/// Clock pinned to an instant that only moves when told to.
///
/// Clones share the same instant, so a test can keep a handle while the
/// context owns a boxed clone.
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Creates a clock pinned to the given RFC 3339 instant.
    ///
    /// # Panics
    ///
    /// Panics if the instant does not parse; this is a test fixture.
    #[must_use]
    pub fn at(instant: &str) -> Self {
        let parsed = DateTime::parse_from_rfc3339(instant)
            .unwrap_or_else(|e| panic!("Invalid fixed-clock instant {instant}: {e}"))
            .with_timezone(&Utc);
        Self { now: Arc::new(Mutex::new(parsed)) }
    }

    /// Moves the clock forward by the given number of hours.
    ///
    /// # Panics
    ///
    /// Panics if the shared instant lock is poisoned.
    pub fn advance_hours(&self, hours: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::hours(hours);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
