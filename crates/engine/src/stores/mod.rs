//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `SessionTable` - Open sessions keyed by connection token
//! - `UserWriteQueue` - Per-user ordering of background record writes

pub mod session;
pub mod user_queue;

// Re-export store types
pub use session::SessionTable;
pub use user_queue::UserWriteQueue;
