//! Live session storage.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use playtime_domain::{ConnectionId, PlayMinutes, Session};

/// Open sessions, at most one per connection token.
///
/// Safe to share between the event-delivery path and background jobs.
#[derive(Default)]
pub struct SessionTable {
    sessions: DashMap<ConnectionId, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` unless one is already open for its connection.
    ///
    /// Returns `false` and leaves the existing session untouched on conflict.
    pub fn try_open(&self, session: Session) -> bool {
        match self.sessions.entry(session.connection_id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    /// Remove and return the session for `connection_id`.
    pub fn close(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions
            .remove(&connection_id)
            .map(|(_, session)| session)
    }

    /// Set prior cumulative minutes on a session that is still open.
    ///
    /// Returns `false` when the session has already been closed.
    pub fn attach_prior(&self, connection_id: ConnectionId, minutes: PlayMinutes) -> bool {
        match self.sessions.get_mut(&connection_id) {
            Some(mut session) => {
                session.attach_prior(minutes);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.get(&connection_id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use playtime_domain::UserId;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn session(connection: u64, at: DateTime<Utc>) -> Session {
        Session::open(
            ConnectionId::new(connection),
            UserId::new(76_561_198_000_000_000),
            at,
            PlayMinutes::new(30),
        )
    }

    #[test]
    fn second_open_for_same_connection_is_refused() {
        let table = SessionTable::new();
        assert!(table.try_open(session(1, t0())));
        assert!(!table.try_open(session(1, t0() + Duration::minutes(5))));

        let kept = table.get(ConnectionId::new(1)).expect("still open");
        assert_eq!(kept.connect_time(), t0());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn close_removes_and_returns_session() {
        let table = SessionTable::new();
        table.try_open(session(1, t0()));

        let closed = table.close(ConnectionId::new(1)).expect("open session");
        assert_eq!(closed.connection_id(), ConnectionId::new(1));
        assert!(table.is_empty());
        assert!(table.close(ConnectionId::new(1)).is_none());
    }

    #[test]
    fn close_unknown_connection_is_none() {
        let table = SessionTable::new();
        assert!(table.close(ConnectionId::new(99)).is_none());
    }

    #[test]
    fn attach_prior_only_touches_open_sessions() {
        let table = SessionTable::new();
        table.try_open(session(1, t0()));

        assert!(table.attach_prior(ConnectionId::new(1), PlayMinutes::new(47)));
        assert_eq!(
            table
                .get(ConnectionId::new(1))
                .map(|s| s.prior_cumulative_minutes()),
            Some(PlayMinutes::new(47))
        );

        table.close(ConnectionId::new(1));
        assert!(!table.attach_prior(ConnectionId::new(1), PlayMinutes::new(50)));
        assert!(table.is_empty());
    }

    #[test]
    fn distinct_connections_for_one_user_coexist() {
        let table = SessionTable::new();
        assert!(table.try_open(session(1, t0())));
        assert!(table.try_open(session(2, t0())));
        assert_eq!(table.len(), 2);
    }
}
