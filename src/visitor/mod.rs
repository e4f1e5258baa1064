//! Visitor presence: records, persistence and the authoritative store.

pub mod persist;
pub mod record;
pub mod store;

pub use persist::{JsonFilePersistence, VisitorPersistence};
pub use record::{TIMESTAMP_FORMAT, VisitRecord, VisitorMap, format_timestamp, now_local};
pub use store::{PresenceStore, StoreOptions};
