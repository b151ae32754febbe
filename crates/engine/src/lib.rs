//! Playtime tracker engine library.
//!
//! Tracks per-user play sessions on a game server and keeps a durable
//! cumulative total in SQLite.
//!
//! ## Structure
//!
//! - `stores/` - In-memory session state and per-user write ordering
//! - `use_cases/` - Session accumulation against stored records
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - Host lifecycle event entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
