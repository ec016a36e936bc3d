//! Driver configuration.

use std::time::Duration;

/// When a pixel-data read resizes the live buffer to the device-reported length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthSync {
    /// Resize only if the local length differs from the device's.
    #[default]
    OnMismatch,
    /// Resize on every pixel-data read.
    Always,
}

/// Settings for a [`StripController`](crate::StripController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Live buffer resync policy for pixel-data reads.
    pub length_sync: LengthSync,
    /// Shortest blink period; shorter requested periods are raised to this.
    pub min_blink_period: Duration,
    /// Name given to the blink thread.
    pub scheduler_thread_name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            length_sync: LengthSync::default(),
            min_blink_period: Duration::from_millis(1),
            scheduler_thread_name: String::from("ws2812-blink"),
        }
    }
}

impl DriverConfig {
    /// Set the live buffer resync policy.
    pub fn with_length_sync(mut self, length_sync: LengthSync) -> Self {
        self.length_sync = length_sync;
        self
    }

    /// Set the shortest blink period.
    pub fn with_min_blink_period(mut self, period: Duration) -> Self {
        self.min_blink_period = period;
        self
    }

    /// Set the blink thread name.
    pub fn with_scheduler_thread_name(mut self, name: impl Into<String>) -> Self {
        self.scheduler_thread_name = name.into();
        self
    }
}
