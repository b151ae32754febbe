//! Ports for services owned by the host game-server runtime.

use playtime_domain::{PlayerSlot, UserId};

/// What the host knows about the player occupying a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub slot: PlayerSlot,
    pub user_id: UserId,
    pub name: String,
    pub is_bot: bool,
}

/// Player lookup provided by the host runtime.
#[cfg_attr(test, mockall::automock)]
pub trait HostRuntime: Send + Sync {
    /// Resolve the player in `slot`, or `None` if the host no longer has one.
    fn resolve(&self, slot: PlayerSlot) -> Option<PlayerInfo>;
}
