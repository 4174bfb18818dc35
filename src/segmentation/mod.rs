pub mod algorithm;
pub mod config;
pub mod merge;

pub use algorithm::{materialize, SegmentBuilder};
pub use config::SegmentationConfig;
