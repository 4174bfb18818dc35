pub mod controller;
pub mod locks;

pub use controller::{SessionDetail, SessionTracker};
pub use locks::SessionLocks;
