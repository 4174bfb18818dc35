//! Activity classification and focus aggregation for "locked-in" sessions.
//!
//! Clients report which domain was in the foreground while a session runs. The engine classifies
//! each domain (per-user override, then the shared master list), folds the pings into a timeline
//! of locked-in / not-locked-in segments, meters each session and rolls sessions up into
//! dashboards, a leaderboard and a feed. [`SessionTracker`] is the request-facing entry point;
//! the modules below it are pure apart from [`store`] and [`db`].

pub mod aggregation;
pub mod classify;
pub mod clock;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod segmentation;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod utils;

pub use aggregation::{Dashboard, DashboardWindow, FeedItem, LeaderboardEntry, LeaderboardRange, TimeRange};
pub use classify::{Domain, DomainClassifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{is_retryable, EngineError};
pub use metrics::SessionMetrics;
pub use models::{
    ActivityPing, ActivitySegment, Classification, DomainLabel, DomainOverride, MasterDomainEntry,
    Session, SessionState, SessionSummary,
};
pub use segmentation::{SegmentBuilder, SegmentationConfig};
pub use settings::{EngineSettings, SettingsStore};
pub use store::{MemoryStore, Store};
pub use tracker::{SessionDetail, SessionTracker};
pub use utils::logging::init_logging;
