use chrono::Duration;

/// Upper bound on the idle threshold; anything longer is treated as this.
const MAX_IDLE_THRESHOLD_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for segment building with tunable thresholds.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Longest gap between pings still credited to the earlier ping's classification.
    /// Time beyond it is idle: counted in the session total, never as locked-in.
    /// Zero is read as one second.
    pub idle_threshold_secs: u64,
    /// How far past the server's clock a ping may be stamped. Such pings are pulled back to
    /// "now"; anything further ahead rejects the batch.
    pub max_clock_skew_secs: u64,
}

impl SegmentationConfig {
    pub fn idle_threshold(&self) -> Duration {
        Duration::seconds(self.idle_threshold_secs.clamp(1, MAX_IDLE_THRESHOLD_SECS) as i64)
    }

    pub fn max_clock_skew(&self) -> Duration {
        Duration::seconds(self.max_clock_skew_secs.min(MAX_IDLE_THRESHOLD_SECS) as i64)
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: 300,
            max_clock_skew_secs: 60,
        }
    }
}
