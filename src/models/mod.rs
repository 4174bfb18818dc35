pub mod domain;
pub mod ping;
pub mod segment;
pub mod session;

pub use domain::{Classification, DomainLabel, DomainOverride, MasterDomainEntry};
pub use ping::ActivityPing;
pub use segment::{ActivitySegment, Cursor, Timeline};
pub use session::{Session, SessionState, SessionSummary};
