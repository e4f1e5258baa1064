//! Authoritative in-memory visitor log with write-through persistence.
//!
//! All mutations take the write lock, apply the change, and persist the whole
//! log before releasing it. If the write fails the change is reverted, so
//! readers only ever see fully committed states. A write that times out is
//! still awaited under the lock, so two writes never overlap on disk.
//!
//! Once a change is on disk the write guard is downgraded and the
//! notification goes out under the read guard. Readers proceed, but the next
//! mutation waits, so notifications leave in commit order. A notification
//! failure never affects stored state.

use crate::error::{Result, VisitorError};
use crate::notify::{self, Notifier, message};
use crate::visitor::persist::VisitorPersistence;
use crate::visitor::record::{VisitRecord, VisitorMap, now_local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Timeouts applied by the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Upper bound on one state write.
    pub io_timeout: Duration,
    /// Upper bound on one notification send.
    pub notify_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(15),
        }
    }
}

/// Process-wide register of visitors keyed by full name.
pub struct PresenceStore {
    visitors: RwLock<VisitorMap>,
    persistence: Arc<dyn VisitorPersistence>,
    notifier: Arc<dyn Notifier>,
    options: StoreOptions,
}

impl PresenceStore {
    /// Load the persisted log and build the store around it.
    ///
    /// # Errors
    /// Propagates `CorruptState` / `Io` from the persistence backend. Callers
    /// should treat either as fatal rather than start with an empty log.
    pub fn open(
        persistence: Arc<dyn VisitorPersistence>,
        notifier: Arc<dyn Notifier>,
        options: StoreOptions,
    ) -> Result<Self> {
        let visitors = persistence.load()?;
        let present = visitors.values().filter(|r| !r.signed_out()).count();
        info!(records = visitors.len(), present, "visitor log loaded");
        Ok(Self {
            visitors: RwLock::new(visitors),
            persistence,
            notifier,
            options,
        })
    }

    /// Record a new visit for `name`.
    ///
    /// A name whose previous visit is closed is overwritten in place; a name
    /// that is still on site is rejected.
    ///
    /// # Errors
    /// `DuplicateActiveVisitor` if `name` is currently signed in, `Io` if the
    /// log cannot be persisted (the sign-in is then discarded).
    pub async fn sign_in(
        &self,
        name: &str,
        company: &str,
        mobile_number: &str,
        site_contact: &str,
    ) -> Result<VisitRecord> {
        let record = VisitRecord::new(company, mobile_number, site_contact, now_local());

        let mut visitors = self.visitors.write().await;
        if visitors.get(name).is_some_and(|existing| !existing.signed_out()) {
            return Err(VisitorError::DuplicateActiveVisitor(name.to_owned()));
        }

        let previous = visitors.insert(name.to_owned(), record.clone());
        if let Err(e) = self.persist(&visitors).await {
            match previous {
                Some(previous) => {
                    visitors.insert(name.to_owned(), previous);
                }
                None => {
                    visitors.shift_remove(name);
                }
            }
            error!(visitor = %name, error = %e, "sign-in rolled back");
            return Err(e);
        }

        let _committed = visitors.downgrade();
        info!(visitor = %name, company = %record.company, "visitor signed in");
        let _ = notify::dispatch(
            self.notifier.as_ref(),
            &message::sign_in(name, &record),
            self.options.notify_timeout,
        )
        .await;
        Ok(record)
    }

    /// Close the open visit for `name`.
    ///
    /// # Errors
    /// `NotFound` for unknown names, `AlreadySignedOut` for closed visits,
    /// `Io` if the log cannot be persisted (the visit then stays open).
    pub async fn sign_out(&self, name: &str) -> Result<VisitRecord> {
        let mut visitors = self.visitors.write().await;
        let Some(record) = visitors.get_mut(name) else {
            return Err(VisitorError::NotFound(name.to_owned()));
        };
        if record.signed_out() {
            return Err(VisitorError::AlreadySignedOut(name.to_owned()));
        }
        record.close(now_local());
        let record = record.clone();

        if let Err(e) = self.persist(&visitors).await {
            if let Some(open) = visitors.get_mut(name) {
                open.reopen();
            }
            error!(visitor = %name, error = %e, "sign-out rolled back");
            return Err(e);
        }

        let _committed = visitors.downgrade();
        info!(visitor = %name, "visitor signed out");
        let _ = notify::dispatch(
            self.notifier.as_ref(),
            &message::sign_out(name, &record),
            self.options.notify_timeout,
        )
        .await;
        Ok(record)
    }

    /// Names of everyone currently on site, in sign-in order.
    pub async fn list_present(&self) -> Vec<String> {
        self.visitors
            .read()
            .await
            .iter()
            .filter(|(_, record)| !record.signed_out())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Everyone currently on site with their full records, in sign-in order.
    pub async fn list_overdue(&self) -> Vec<(String, VisitRecord)> {
        self.visitors
            .read()
            .await
            .iter()
            .filter(|(_, record)| !record.signed_out())
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<VisitRecord> {
        self.visitors.read().await.get(name).cloned()
    }

    /// Copy of the whole log.
    pub async fn snapshot(&self) -> VisitorMap {
        self.visitors.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.visitors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.visitors.read().await.is_empty()
    }

    /// Write `visitors` on the blocking pool, bounded by `io_timeout`.
    ///
    /// On timeout the write is told to abandon itself before it replaces the
    /// state file, and is then awaited so the caller's lock covers it. A write
    /// that had already replaced the file when told to stop counts as
    /// committed.
    async fn persist(&self, visitors: &VisitorMap) -> Result<()> {
        let snapshot = visitors.clone();
        let persistence = Arc::clone(&self.persistence);
        let abort = CancellationToken::new();
        let abort_for_write = abort.clone();

        let mut write =
            tokio::task::spawn_blocking(move || persistence.save(&snapshot, &abort_for_write));

        let late = match tokio::time::timeout(self.options.io_timeout, &mut write).await {
            Ok(joined) => return flatten_write(joined),
            Err(_) => {
                abort.cancel();
                flatten_write(write.await)
            }
        };

        match late {
            Ok(()) => {
                warn!(
                    timeout = ?self.options.io_timeout,
                    "state write finished after its timeout; keeping it"
                );
                Ok(())
            }
            Err(e) => {
                warn!(timeout = ?self.options.io_timeout, error = %e, "state write abandoned");
                Err(VisitorError::Io(format!(
                    "state write timed out after {:?}",
                    self.options.io_timeout
                )))
            }
        }
    }
}

fn flatten_write(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.unwrap_or_else(|join_err| {
        Err(VisitorError::Io(format!("state write task failed: {join_err}")))
    })
}
