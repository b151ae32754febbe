//! Testability ports for injecting time.

use chrono::{DateTime, Utc};

// =============================================================================
// Testability Ports
// =============================================================================

/// Source of the current time. Tests substitute a fixed or hand-stepped clock.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
