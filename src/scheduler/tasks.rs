//! Daily trigger definition and the overdue-visitor summary job.

use crate::error::VisitorError;
use crate::notify::{self, Notifier, message};
use crate::visitor::PresenceStore;
use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local wall-clock time of day at which the summary fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DailyTrigger {
    hour: u8,
    min: u8,
}

impl DailyTrigger {
    /// Out-of-range values are clamped to 23:59.
    pub const fn new(hour: u8, min: u8) -> Self {
        Self {
            hour: if hour > 23 { 23 } else { hour },
            min: if min > 59 { 59 } else { min },
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.min), 0)
            .unwrap_or_default()
    }

    /// First trigger instant strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time());
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }
}

impl std::fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.min)
    }
}

impl std::str::FromStr for DailyTrigger {
    type Err = VisitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || VisitorError::Config(format!("invalid daily trigger '{s}' (expected HH:MM)"));
        let (hour, min) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let min: u8 = min.parse().map_err(|_| invalid())?;
        if hour > 23 || min > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, min })
    }
}

impl TryFrom<String> for DailyTrigger {
    type Error = VisitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DailyTrigger> for String {
    fn from(trigger: DailyTrigger) -> Self {
        trigger.to_string()
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Waiting for `next_fire`.
    Idle { next_fire: NaiveDateTime },
    /// Running the summary job.
    Firing,
}

/// Outcome of one summary run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Nobody was on site; nothing was sent.
    Skipped,
    /// One summary listing `visitors` people was delivered.
    Sent { visitors: usize },
    /// The summary could not be delivered.
    Failed { visitors: usize, error: String },
}

impl SummaryOutcome {
    pub fn summary(&self) -> String {
        match self {
            Self::Skipped => "no overdue visitors".to_owned(),
            Self::Sent { visitors } => format!("summary sent for {visitors} overdue visitor(s)"),
            Self::Failed { visitors, error } => {
                format!("summary for {visitors} overdue visitor(s) failed: {error}")
            }
        }
    }
}

/// Send one aggregate notification listing every visitor still on site.
pub async fn run_daily_summary(
    store: &PresenceStore,
    notifier: &dyn Notifier,
    timeout: Duration,
) -> SummaryOutcome {
    let overdue = store.list_overdue().await;
    if overdue.is_empty() {
        return SummaryOutcome::Skipped;
    }

    let visitors = overdue.len();
    match notify::dispatch(notifier, &message::daily_summary(&overdue), timeout).await {
        Ok(()) => SummaryOutcome::Sent { visitors },
        Err(e) => SummaryOutcome::Failed {
            visitors,
            error: e.to_string(),
        },
    }
}
