//! Session accumulator - reconciles live sessions with stored playtime.
//!
//! Both entry points mutate the [`SessionTable`] synchronously and hand the
//! storage work to a background job on the [`UserWriteQueue`]. Neither waits
//! for storage. Jobs for the same user run in dispatch order, so a connect's
//! record update can never overwrite the increment written by a later
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use playtime_domain::{ConnectionId, PlayMinutes, Session, UserId, UserRecord};

use crate::infrastructure::ports::{RecordStore, RepoError};
use crate::stores::{SessionTable, UserWriteQueue};

/// Tracks open sessions and writes their playtime back to storage.
pub struct SessionAccumulator {
    records: Arc<dyn RecordStore>,
    sessions: Arc<SessionTable>,
    writes: Arc<UserWriteQueue>,
    session_cap: PlayMinutes,
}

impl SessionAccumulator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        sessions: Arc<SessionTable>,
        writes: Arc<UserWriteQueue>,
        session_cap: PlayMinutes,
    ) -> Self {
        Self {
            records,
            sessions,
            writes,
            session_cap,
        }
    }

    /// Open a session for `connection_id` and load the user's record in the background.
    ///
    /// Must be called once per connect event. A second call for a connection
    /// that is still open is refused and schedules nothing.
    pub fn on_connect(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), PlaytimeError> {
        let session = Session::open(connection_id, user_id, now, self.session_cap);
        if !self.sessions.try_open(session) {
            return Err(PlaytimeError::SessionAlreadyOpen(connection_id));
        }

        let records = Arc::clone(&self.records);
        let sessions = Arc::clone(&self.sessions);
        self.writes.enqueue(user_id, async move {
            if let Err(e) =
                load_on_connect(records.as_ref(), &sessions, connection_id, user_id, now).await
            {
                tracing::error!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to load playtime record on connect"
                );
            }
        });

        Ok(())
    }

    /// Close the session for `connection_id` and merge its minutes in the background.
    ///
    /// Returns the minutes being merged. Nothing is written when no session
    /// is open for the connection.
    pub fn on_disconnect(
        &self,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
    ) -> Result<PlayMinutes, PlaytimeError> {
        let session = self
            .sessions
            .close(connection_id)
            .ok_or(PlaytimeError::MissingSession(connection_id))?;

        let user_id = session.user_id();
        let elapsed = session.elapsed_minutes(now);
        if session.is_past_provisional_cap(now) {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                provisional_disconnect = %session.provisional_disconnect_time(),
                "Session outlived its provisional disconnect time"
            );
        }

        let records = Arc::clone(&self.records);
        self.writes.enqueue(user_id, async move {
            if let Err(e) = merge_on_disconnect(records.as_ref(), user_id, elapsed, now).await {
                tracing::error!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    minutes = elapsed.get(),
                    error = %e,
                    "Failed to save playtime on disconnect; minutes lost"
                );
            }
        });

        Ok(elapsed)
    }

    /// Prior cumulative minutes plus the current session, for an open connection.
    pub fn live_play_minutes(
        &self,
        connection_id: ConnectionId,
        now: DateTime<Utc>,
    ) -> Option<PlayMinutes> {
        self.sessions
            .get(connection_id)
            .map(|session| session.total_play_minutes(now))
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Wait up to `timeout` for background writes dispatched so far.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.writes.flush(timeout).await
    }
}

async fn load_on_connect(
    records: &dyn RecordStore,
    sessions: &SessionTable,
    connection_id: ConnectionId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<(), RepoError> {
    match records.get(user_id).await? {
        Some(mut record) => {
            let prior = record.cumulative_play_minutes();
            if !sessions.attach_prior(connection_id, prior) {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "Session closed before its record loaded"
                );
            }
            record.record_login(now);
            records.upsert(&record).await?;
            tracing::info!(user_id = %user_id, minutes = prior.get(), "Found playtime record");
        }
        None => {
            records.upsert(&UserRecord::first_login(user_id, now)).await?;
            tracing::info!(user_id = %user_id, "Inserted new playtime record");
        }
    }
    Ok(())
}

async fn merge_on_disconnect(
    records: &dyn RecordStore,
    user_id: UserId,
    elapsed: PlayMinutes,
    now: DateTime<Utc>,
) -> Result<(), RepoError> {
    let (mut record, created) = match records.get(user_id).await? {
        Some(record) => (record, false),
        None => (UserRecord::first_login(user_id, now), true),
    };
    record.accrue(elapsed, now);
    records.upsert(&record).await?;

    tracing::info!(
        user_id = %user_id,
        minutes = elapsed.get(),
        total = record.cumulative_play_minutes().get(),
        created,
        "Saved playtime after disconnect"
    );
    Ok(())
}

/// Errors from the session lifecycle.
///
/// Storage failures never appear here: they happen in background jobs and
/// are logged there.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaytimeError {
    #[error("No open session for connection {0}")]
    MissingSession(ConnectionId),
    #[error("Session already open for connection {0}")]
    SessionAlreadyOpen(ConnectionId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockRecordStore;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use mockall::predicate::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn user() -> UserId {
        UserId::new(76_561_198_000_000_000)
    }

    fn accumulator(records: MockRecordStore) -> (SessionAccumulator, Arc<SessionTable>) {
        let sessions = Arc::new(SessionTable::new());
        let accumulator = SessionAccumulator::new(
            Arc::new(records),
            Arc::clone(&sessions),
            Arc::new(UserWriteQueue::new()),
            PlayMinutes::new(30),
        );
        (accumulator, sessions)
    }

    #[tokio::test]
    async fn connect_attaches_prior_minutes_and_stamps_login() {
        let mut records = MockRecordStore::new();
        let earlier = t0() - ChronoDuration::days(3);

        records
            .expect_get()
            .with(eq(user()))
            .times(1)
            .returning(move |id| Ok(Some(UserRecord::restore(id, earlier, PlayMinutes::new(47)))));
        records
            .expect_upsert()
            .withf(|record| {
                record.cumulative_play_minutes() == PlayMinutes::new(47)
                    && record.last_login() == t0()
            })
            .times(1)
            .returning(|_| Ok(()));

        let (accumulator, sessions) = accumulator(records);
        accumulator
            .on_connect(ConnectionId::new(1), user(), t0())
            .expect("connect");

        assert!(accumulator.flush(WAIT).await);
        let session = sessions.get(ConnectionId::new(1)).expect("open session");
        assert_eq!(session.prior_cumulative_minutes(), PlayMinutes::new(47));
        assert_eq!(
            accumulator.live_play_minutes(ConnectionId::new(1), t0() + ChronoDuration::minutes(13)),
            Some(PlayMinutes::new(60))
        );
    }

    #[tokio::test]
    async fn connect_creates_record_for_new_user() {
        let mut records = MockRecordStore::new();
        records.expect_get().times(1).returning(|_| Ok(None));
        records
            .expect_upsert()
            .withf(|record| *record == UserRecord::first_login(user(), t0()))
            .times(1)
            .returning(|_| Ok(()));

        let (accumulator, sessions) = accumulator(records);
        accumulator
            .on_connect(ConnectionId::new(1), user(), t0())
            .expect("connect");

        assert!(accumulator.flush(WAIT).await);
        let session = sessions.get(ConnectionId::new(1)).expect("open session");
        assert_eq!(session.prior_cumulative_minutes(), PlayMinutes::ZERO);
    }

    #[tokio::test]
    async fn duplicate_connect_is_refused_without_storage_access() {
        let mut records = MockRecordStore::new();
        records.expect_get().times(1).returning(|_| Ok(None));
        records.expect_upsert().times(1).returning(|_| Ok(()));

        let (accumulator, sessions) = accumulator(records);
        accumulator
            .on_connect(ConnectionId::new(1), user(), t0())
            .expect("first connect");
        let later = t0() + ChronoDuration::minutes(2);

        assert_eq!(
            accumulator.on_connect(ConnectionId::new(1), user(), later),
            Err(PlaytimeError::SessionAlreadyOpen(ConnectionId::new(1)))
        );
        assert!(accumulator.flush(WAIT).await);
        assert_eq!(
            sessions.get(ConnectionId::new(1)).map(|s| s.connect_time()),
            Some(t0())
        );
    }

    #[tokio::test]
    async fn disconnect_without_session_touches_nothing() {
        // No expectations: any storage call fails the test.
        let records = MockRecordStore::new();
        let (accumulator, _sessions) = accumulator(records);

        assert_eq!(
            accumulator.on_disconnect(ConnectionId::new(5), t0()),
            Err(PlaytimeError::MissingSession(ConnectionId::new(5)))
        );
        assert!(accumulator.flush(WAIT).await);
    }

    #[tokio::test]
    async fn disconnect_merges_elapsed_minutes() {
        let mut records = MockRecordStore::new();
        let mut seq = mockall::Sequence::new();
        let end = t0() + ChronoDuration::minutes(47) + ChronoDuration::seconds(30);

        records
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        records
            .expect_upsert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        records
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| Ok(Some(UserRecord::first_login(id, t0()))));
        records
            .expect_upsert()
            .withf(move |record| {
                record.cumulative_play_minutes() == PlayMinutes::new(47)
                    && record.last_login() == end
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let (accumulator, sessions) = accumulator(records);
        accumulator
            .on_connect(ConnectionId::new(1), user(), t0())
            .expect("connect");
        let merged = accumulator
            .on_disconnect(ConnectionId::new(1), end)
            .expect("disconnect");

        assert_eq!(merged, PlayMinutes::new(47));
        assert!(sessions.is_empty());
        assert!(accumulator.flush(WAIT).await);
    }

    #[tokio::test]
    async fn storage_failure_is_contained_in_the_background_job() {
        let mut records = MockRecordStore::new();
        records
            .expect_get()
            .returning(|_| Err(RepoError::database("user_records.get", "disk I/O error")));
        records.expect_upsert().never();

        let (accumulator, sessions) = accumulator(records);
        accumulator
            .on_connect(ConnectionId::new(1), user(), t0())
            .expect("connect");
        let merged = accumulator
            .on_disconnect(ConnectionId::new(1), t0() + ChronoDuration::minutes(9))
            .expect("disconnect");

        assert_eq!(merged, PlayMinutes::new(9));
        assert!(accumulator.flush(WAIT).await);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn failed_upsert_on_disconnect_is_not_retried() {
        let mut records = MockRecordStore::new();
        records.expect_get().times(1).returning(|_| Ok(None));
        records
            .expect_upsert()
            .times(1)
            .returning(|_| Err(RepoError::database("user_records.upsert", "database is locked")));

        let (accumulator, sessions) = accumulator(records);
        sessions.try_open(Session::open(
            ConnectionId::new(2),
            user(),
            t0(),
            PlayMinutes::new(30),
        ));

        accumulator
            .on_disconnect(ConnectionId::new(2), t0() + ChronoDuration::minutes(4))
            .expect("disconnect");
        assert!(accumulator.flush(WAIT).await);
        assert!(sessions.is_empty());
    }
}
