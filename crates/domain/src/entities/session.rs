//! Session entity - Timing state for one live connection
//!
//! A session exists from an observed connect until the matching
//! disconnect. It is never persisted; only the minutes it accrued are
//! merged into the user's [`UserRecord`](crate::UserRecord).

use chrono::{DateTime, Duration, Utc};

use crate::{ConnectionId, PlayMinutes, UserId};

/// Default provisional disconnect offset from connect time.
pub const DEFAULT_SESSION_CAP_MINUTES: u32 = 30;

/// An open connection's timing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    connection_id: ConnectionId,
    user_id: UserId,
    connect_time: DateTime<Utc>,
    provisional_disconnect_time: DateTime<Utc>,
    prior_cumulative_minutes: PlayMinutes,
}

impl Session {
    /// Open a session at `now` with the provisional disconnect `cap` ahead.
    pub fn open(
        connection_id: ConnectionId,
        user_id: UserId,
        now: DateTime<Utc>,
        cap: PlayMinutes,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            connect_time: now,
            provisional_disconnect_time: now + Duration::minutes(i64::from(cap.get())),
            prior_cumulative_minutes: PlayMinutes::ZERO,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn connect_time(&self) -> DateTime<Utc> {
        self.connect_time
    }

    pub fn provisional_disconnect_time(&self) -> DateTime<Utc> {
        self.provisional_disconnect_time
    }

    pub fn prior_cumulative_minutes(&self) -> PlayMinutes {
        self.prior_cumulative_minutes
    }

    /// Record the cumulative total loaded from storage after connect.
    pub fn attach_prior(&mut self, minutes: PlayMinutes) {
        self.prior_cumulative_minutes = minutes;
    }

    /// Minutes played in this session as of `now`.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> PlayMinutes {
        PlayMinutes::elapsed_between(self.connect_time, now)
    }

    /// Prior cumulative minutes plus this session's minutes as of `now`.
    pub fn total_play_minutes(&self, now: DateTime<Utc>) -> PlayMinutes {
        self.prior_cumulative_minutes
            .saturating_add(self.elapsed_minutes(now))
    }

    /// True once `now` is past the provisional disconnect time.
    pub fn is_past_provisional_cap(&self, now: DateTime<Utc>) -> bool {
        now > self.provisional_disconnect_time
    }
}
