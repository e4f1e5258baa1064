//! Visitor presence register.
//!
//! Tracks who is on site: visitors sign in and out over HTTP, every change is
//! written through to a JSON state file before it is acknowledged, and a
//! notification goes out for each transition plus once a day for anyone who
//! never signed out.
//!
//! # Architecture
//!
//! - **Persistence**: atomic JSON file replace (`visitor::persist`)
//! - **Presence store**: the single authoritative visitor map (`visitor::store`)
//! - **Notifier gateway**: timeout-bounded, best-effort transports (`notify`)
//! - **Scheduler**: daily overdue summary on its own tokio task (`scheduler`)
//! - **HTTP surface**: axum handlers over the store (`http`)

pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod scheduler;
pub mod visitor;

pub use config::VisitorConfig;
pub use error::{Result, VisitorError};
pub use notify::{Notification, Notifier};
pub use scheduler::SummaryScheduler;
pub use visitor::{PresenceStore, VisitRecord};
