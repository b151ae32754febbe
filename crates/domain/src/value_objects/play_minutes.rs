//! Whole-minute playtime value object

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A non-negative count of whole minutes played.
///
/// Arithmetic saturates instead of wrapping so a cumulative total can only
/// ever grow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayMinutes(u32);

impl PlayMinutes {
    pub const ZERO: Self = Self(0);

    pub const fn new(minutes: u32) -> Self {
        Self(minutes)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Wall-clock minutes between `start` and `end`.
    ///
    /// Partial minutes are truncated. A negative span (clock skew, or an end
    /// observed before the start) yields zero.
    pub fn elapsed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let minutes = end.signed_duration_since(start).num_minutes();
        if minutes <= 0 {
            return Self::ZERO;
        }
        Self(u32::try_from(minutes).unwrap_or(u32::MAX))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for PlayMinutes {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(DomainError::validation(format!(
                "play minutes cannot be negative: {value}"
            )));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::validation(format!("play minutes out of range: {value}")))
    }
}

impl From<PlayMinutes> for i64 {
    fn from(value: PlayMinutes) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for PlayMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}
