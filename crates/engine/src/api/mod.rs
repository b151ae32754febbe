//! API layer - entry points for host lifecycle events.

pub mod events;
pub mod lifecycle;

pub use events::{subscribe, EventSubscription, LifecycleEvent};
pub use lifecycle::{EventOutcome, LifecycleAdapter};
