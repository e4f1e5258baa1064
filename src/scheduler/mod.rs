//! Background scheduler for the daily overdue-visitor summary.
//!
//! Runs on its own tokio task, independent of request handling, and only
//! reads the presence store through its public operations.

pub mod runner;
pub mod tasks;

pub use runner::SummaryScheduler;
pub use tasks::{DailyTrigger, SchedulerPhase, SummaryOutcome, run_daily_summary};
