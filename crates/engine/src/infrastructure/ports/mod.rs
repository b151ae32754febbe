//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Playtime record storage (could swap SQLite -> Postgres)
//! - The host game-server runtime (player lookup by slot)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::RecordStore;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{HostRuntime, PlayerInfo};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockHostRuntime;
#[cfg(test)]
pub use repos::MockRecordStore;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::RepoError;
