//! User record entity - Durable per-user playtime totals
//!
//! One record exists per distinct user identity. It is created on the
//! user's first observed connect and updated on every later connect and
//! disconnect. This subsystem never deletes records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PlayMinutes, UserId};

/// Cumulative playtime for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    user_id: UserId,
    last_login: DateTime<Utc>,
    cumulative_play_minutes: PlayMinutes,
}

impl UserRecord {
    /// A record for a user seen for the first time.
    pub fn first_login(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            last_login: now,
            cumulative_play_minutes: PlayMinutes::ZERO,
        }
    }

    /// Rebuild a record from storage.
    pub fn restore(
        user_id: UserId,
        last_login: DateTime<Utc>,
        cumulative_play_minutes: PlayMinutes,
    ) -> Self {
        Self {
            user_id,
            last_login,
            cumulative_play_minutes,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn last_login(&self) -> DateTime<Utc> {
        self.last_login
    }

    pub fn cumulative_play_minutes(&self) -> PlayMinutes {
        self.cumulative_play_minutes
    }

    /// Stamp a login without touching the total.
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login = now;
    }

    /// Merge a finished session into the total.
    pub fn accrue(&mut self, minutes: PlayMinutes, now: DateTime<Utc>) {
        self.cumulative_play_minutes = self.cumulative_play_minutes.saturating_add(minutes);
        self.last_login = now;
    }
}
