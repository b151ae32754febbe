//! Playtime domain types.
//!
//! Pure data and invariants for per-user playtime tracking: identifiers,
//! the whole-minute value object, the durable [`UserRecord`] and the
//! transient [`Session`]. Nothing here performs I/O.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{Session, UserRecord, DEFAULT_SESSION_CAP_MINUTES};
pub use error::DomainError;
pub use ids::{ConnectionId, PlayerSlot, UserId};
pub use value_objects::PlayMinutes;
