//! Value objects - Immutable objects defined by their attributes

mod play_minutes;

pub use play_minutes::PlayMinutes;
