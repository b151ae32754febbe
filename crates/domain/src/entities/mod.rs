//! Domain entities

mod session;
mod user_record;

pub use session::{Session, DEFAULT_SESSION_CAP_MINUTES};
pub use user_record::UserRecord;
