use chrono::Utc;

/// Source of the current instant, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time. Requested instants are ignored.
    #[default]
    System,
    /// Wall-clock time unless the caller supplies a positive instant.
    Deterministic,
}

impl Clock {
    pub fn from_test_mode(test_mode: bool) -> Self {
        if test_mode {
            Clock::Deterministic
        } else {
            Clock::System
        }
    }

    pub fn now(&self, requested: Option<i64>) -> i64 {
        match self {
            Clock::Deterministic => requested
                .filter(|ms| *ms > 0)
                .unwrap_or_else(wall_clock_ms),
            Clock::System => wall_clock_ms(),
        }
    }
}

fn wall_clock_ms() -> i64 {
    Utc::now().timestamp_millis()
}
