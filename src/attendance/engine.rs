use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::attendance::locks::UserLocks;
use crate::model::attendance::AttendanceRecord;
use crate::model::user::UserId;
use crate::store::{AttendanceStore, StoreError};

#[derive(Debug, Error)]
pub enum AttendanceError {
    /// Carries the session that is still open.
    #[error("already checked in")]
    AlreadyCheckedIn(Box<AttendanceRecord>),
    #[error("not checked in")]
    NotCheckedIn,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to microseconds to match `DATETIME(6)` columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Per-user check-in/check-out state machine.
///
/// A user is either without an open session or has exactly one. Every
/// transition runs under that user's lock from [`UserLocks`], and the store
/// independently rejects a second open record, which covers writers in other
/// processes sharing the same database.
#[derive(Clone)]
pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    locks: UserLocks,
    clock: Arc<dyn Clock>,
}

impl AttendanceEngine {
    pub fn new(store: Arc<dyn AttendanceStore>, locks: UserLocks) -> Self {
        Self::with_clock(store, locks, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn AttendanceStore>,
        locks: UserLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn check_in(&self, user_id: UserId) -> Result<AttendanceRecord, AttendanceError> {
        let _guard = self.locks.acquire(user_id).await;

        if let Some(open) = self.store.find_open(user_id).await? {
            info!(record_id = %open.id, "check-in refused, session already open");
            return Err(AttendanceError::AlreadyCheckedIn(Box::new(open)));
        }

        let record = AttendanceRecord::open(user_id, self.clock.now());
        match self.store.insert_open(&record).await {
            Ok(()) => {
                info!(record_id = %record.id, check_in = %record.check_in, "checked in");
                Ok(record)
            }
            // another process opened a session between our read and write
            Err(StoreError::OpenSessionExists(_)) => match self.store.find_open(user_id).await? {
                Some(open) => {
                    info!(record_id = %open.id, "check-in lost race to concurrent writer");
                    Err(AttendanceError::AlreadyCheckedIn(Box::new(open)))
                }
                None => Err(StoreError::OpenSessionExists(user_id).into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn check_out(&self, user_id: UserId) -> Result<AttendanceRecord, AttendanceError> {
        let _guard = self.locks.acquire(user_id).await;

        let open = self
            .store
            .find_open(user_id)
            .await?
            .ok_or(AttendanceError::NotCheckedIn)?;

        let now = self.clock.now();
        let check_out = open.check_out_time(now);
        if check_out != now {
            warn!(
                record_id = %open.id,
                check_in = %open.check_in,
                clock = %now,
                "server clock is behind check-in, clamping check-out"
            );
        }

        // None: closed by a writer in another process since find_open
        let closed = self
            .store
            .close(open.id, check_out)
            .await?
            .ok_or(AttendanceError::NotCheckedIn)?;

        info!(record_id = %closed.id, check_out = %check_out, "checked out");
        Ok(closed)
    }

    /// The user's records, latest check-in first. Equal check-in times keep
    /// insertion order.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let mut records = self.store.list_by_user(user_id).await?;
        records.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        Ok(records)
    }

    /// The open session, if any.
    pub async fn current(&self, user_id: UserId) -> Result<Option<AttendanceRecord>, AttendanceError> {
        Ok(self.store.find_open(user_id).await?)
    }
}
