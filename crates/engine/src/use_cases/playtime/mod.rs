//! Playtime use cases.
//!
//! Opens and closes live sessions and merges their minutes into durable
//! user records.

use std::sync::Arc;

mod accumulator;


pub use accumulator::{PlaytimeError, SessionAccumulator};

/// Container for playtime use cases.
pub struct PlaytimeUseCases {
    pub accumulator: Arc<SessionAccumulator>,
}

impl PlaytimeUseCases {
    pub fn new(accumulator: Arc<SessionAccumulator>) -> Self {
        Self { accumulator }
    }
}
