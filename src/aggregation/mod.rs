pub mod feed;
pub mod leaderboard;
pub mod window;

pub use feed::{build_feed, FeedItem};
pub use leaderboard::{rank_leaderboard, LeaderboardEntry, LeaderboardRange};
pub use window::{aggregate_window, build_dashboard, Dashboard, DashboardWindow, TimeRange};
