//! Scheduler background loop.
//!
//! Spawns a tokio task that wakes every tick, checks the wall clock against
//! the daily trigger, and runs the overdue-visitor summary at most once per
//! day. It talks to the store only through its public operations.

use crate::notify::Notifier;
use crate::scheduler::tasks::{DailyTrigger, SchedulerPhase, SummaryOutcome, run_daily_summary};
use crate::visitor::{PresenceStore, now_local};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default interval between scheduler ticks.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound on the summary send.
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Background scheduler for the daily overdue-visitor summary.
pub struct SummaryScheduler {
    store: Arc<PresenceStore>,
    notifier: Arc<dyn Notifier>,
    trigger: DailyTrigger,
    phase: SchedulerPhase,
    tick_interval: Duration,
    notify_timeout: Duration,
    /// Optional observer for run outcomes.
    outcome_tx: Option<mpsc::UnboundedSender<SummaryOutcome>>,
}

impl SummaryScheduler {
    /// Create a scheduler whose first fire is the next `trigger` after now.
    pub fn new(
        store: Arc<PresenceStore>,
        notifier: Arc<dyn Notifier>,
        trigger: DailyTrigger,
    ) -> Self {
        Self {
            store,
            notifier,
            trigger,
            phase: SchedulerPhase::Idle {
                next_fire: trigger.next_after(now_local()),
            },
            tick_interval: DEFAULT_TICK_INTERVAL,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            outcome_tx: None,
        }
    }

    /// Override the interval between wall-clock checks.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Override the first fire time.
    pub fn with_first_fire(mut self, at: NaiveDateTime) -> Self {
        self.phase = SchedulerPhase::Idle { next_fire: at };
        self
    }

    /// Report every run outcome on `tx`.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<SummaryOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    pub fn trigger(&self) -> DailyTrigger {
        self.trigger
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Start the scheduler background loop.
    pub fn run(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(trigger = %self.trigger, "summary scheduler started");
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.tick_at(now_local()).await;
            }
        })
    }

    /// Advance the state machine to wall-clock time `now`.
    ///
    /// Returns the outcome when the summary ran on this tick. After a run the
    /// next fire is the first trigger after `now`, so a late or repeated tick
    /// never fires twice for the same day.
    pub async fn tick_at(&mut self, now: NaiveDateTime) -> Option<SummaryOutcome> {
        let SchedulerPhase::Idle { next_fire } = self.phase else {
            return None;
        };
        if now < next_fire {
            debug!(%next_fire, "summary not due");
            return None;
        }

        self.phase = SchedulerPhase::Firing;
        let outcome =
            run_daily_summary(&self.store, self.notifier.as_ref(), self.notify_timeout).await;
        let next_fire = self.trigger.next_after(now);
        self.phase = SchedulerPhase::Idle { next_fire };

        match &outcome {
            SummaryOutcome::Failed { .. } => warn!(%next_fire, "{}", outcome.summary()),
            _ => info!(%next_fire, "{}", outcome.summary()),
        }

        if let Some(tx) = &self.outcome_tx {
            if tx.send(outcome.clone()).is_err() {
                debug!("summary outcome channel closed");
                self.outcome_tx = None;
            }
        }

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::visitor::{JsonFilePersistence, StoreOptions, TIMESTAMP_FORMAT};

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).unwrap()
    }

    fn make_store(dir: &tempfile::TempDir) -> Arc<PresenceStore> {
        Arc::new(
            PresenceStore::open(
                Arc::new(JsonFilePersistence::new(dir.path().join("visitors.json"))),
                Arc::new(RecordingNotifier::new()),
                StoreOptions::default(),
            )
            .unwrap(),
        )
    }

    fn make_scheduler(
        store: Arc<PresenceStore>,
        notifier: Arc<RecordingNotifier>,
        start: &str,
    ) -> SummaryScheduler {
        let trigger = DailyTrigger::new(16, 30);
        SummaryScheduler::new(store, notifier, trigger)
            .with_first_fire(trigger.next_after(at(start)))
    }

    #[tokio::test]
    async fn fires_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        store.sign_in("Jane Doe", "Acme", "1", "Bob").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut scheduler = make_scheduler(store, notifier.clone(), "2024-05-01 09:00:00");

        assert!(scheduler.tick_at(at("2024-05-01 16:29:59")).await.is_none());
        assert_eq!(
            scheduler.tick_at(at("2024-05-01 16:30:00")).await,
            Some(SummaryOutcome::Sent { visitors: 1 })
        );
        assert!(scheduler.tick_at(at("2024-05-01 16:30:30")).await.is_none());
        assert!(scheduler.tick_at(at("2024-05-01 23:59:59")).await.is_none());
        assert_eq!(notifier.count(), 1);

        assert!(scheduler.tick_at(at("2024-05-02 16:31:00")).await.is_some());
        assert_eq!(notifier.count(), 2);
    }

    #[tokio::test]
    async fn start_after_trigger_waits_for_next_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        store.sign_in("Jane Doe", "Acme", "1", "Bob").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut scheduler = make_scheduler(store, notifier.clone(), "2024-05-01 17:00:00");

        assert!(scheduler.tick_at(at("2024-05-01 17:00:30")).await.is_none());
        assert_eq!(
            scheduler.phase(),
            SchedulerPhase::Idle {
                next_fire: at("2024-05-02 16:30:00")
            }
        );
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn failed_send_returns_to_idle_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        store.sign_in("Jane Doe", "Acme", "1", "Bob").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.set_failing(true);
        let mut scheduler = make_scheduler(store, notifier.clone(), "2024-05-01 09:00:00");

        let outcome = scheduler.tick_at(at("2024-05-01 16:30:00")).await;
        assert!(matches!(outcome, Some(SummaryOutcome::Failed { .. })));
        assert!(scheduler.tick_at(at("2024-05-01 16:31:00")).await.is_none());
        assert_eq!(
            scheduler.phase(),
            SchedulerPhase::Idle {
                next_fire: at("2024-05-02 16:30:00")
            }
        );
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn missed_days_fire_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        store.sign_in("Jane Doe", "Acme", "1", "Bob").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut scheduler = make_scheduler(store, notifier.clone(), "2024-05-01 09:00:00");

        assert!(scheduler.tick_at(at("2024-05-04 10:00:00")).await.is_some());
        assert!(scheduler.tick_at(at("2024-05-04 10:01:00")).await.is_none());
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            scheduler.phase(),
            SchedulerPhase::Idle {
                next_fire: at("2024-05-04 16:30:00")
            }
        );
    }

    #[tokio::test]
    async fn run_starts_and_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        store.sign_in("Jane Doe", "Acme", "1", "Bob").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let past = now_local() - chrono::Duration::minutes(1);
        let handle = SummaryScheduler::new(store, notifier.clone(), DailyTrigger::new(16, 30))
            .with_first_fire(past)
            .with_tick_interval(Duration::from_millis(10))
            .with_outcomes(tx)
            .run();

        let result = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(
            result.expect("scheduler fired in time"),
            Some(SummaryOutcome::Sent { visitors: 1 })
        );
        assert_eq!(notifier.count(), 1);

        handle.abort();
    }
}
