use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub total_session_seconds: u64,
    pub locked_in_seconds: u64,
    pub focus_rate: f64,
}

impl SessionMetrics {
    pub fn from_totals(total_session_seconds: u64, locked_in_seconds: u64) -> Self {
        Self {
            total_session_seconds,
            locked_in_seconds,
            focus_rate: focus_rate(locked_in_seconds, total_session_seconds),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::from_totals(0, 0)
    }
}

/// `locked / total`, clamped to [0, 1]; zero when there is no time at all.
pub fn focus_rate(locked_in_seconds: u64, total_session_seconds: u64) -> f64 {
    if total_session_seconds == 0 {
        return 0.0;
    }
    (locked_in_seconds as f64 / total_session_seconds as f64).clamp(0.0, 1.0)
}
