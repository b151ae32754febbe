//! Host lifecycle adapter.
//!
//! Translates slot-based connect/disconnect notifications from the host
//! runtime into accumulator calls. Each observed connect mints a fresh
//! [`ConnectionId`], so a slot the host reuses quickly can never pick up
//! data that belongs to its previous occupant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use playtime_domain::{ConnectionId, PlayMinutes, PlayerSlot, UserId};

use crate::infrastructure::ports::{ClockPort, HostRuntime, PlayerInfo};
use crate::use_cases::playtime::{PlaytimeError, SessionAccumulator};

/// Which connection currently occupies a slot.
#[derive(Debug, Clone, Copy)]
struct SlotBinding {
    connection_id: ConnectionId,
    user_id: UserId,
}

/// What a lifecycle event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A session was opened under this token.
    Opened(ConnectionId),
    /// A session was closed and its minutes handed to storage.
    Closed {
        connection_id: ConnectionId,
        minutes: PlayMinutes,
    },
    /// No player in the slot, or a bot.
    Ignored,
    /// Connect for a player whose session on this slot is still open.
    AlreadyOpen(ConnectionId),
    /// Disconnect with no matching connect.
    MissingSession,
}

/// Adapter between host slot events and the session accumulator.
pub struct LifecycleAdapter {
    host: Arc<dyn HostRuntime>,
    clock: Arc<dyn ClockPort>,
    accumulator: Arc<SessionAccumulator>,
    bindings: DashMap<PlayerSlot, SlotBinding>,
    next_connection: AtomicU64,
}

impl LifecycleAdapter {
    pub fn new(
        host: Arc<dyn HostRuntime>,
        clock: Arc<dyn ClockPort>,
        accumulator: Arc<SessionAccumulator>,
    ) -> Self {
        Self {
            host,
            clock,
            accumulator,
            bindings: DashMap::new(),
            next_connection: AtomicU64::new(1),
        }
    }

    /// A player was put into `slot`. Resolves the occupant now.
    pub fn on_client_put_in_server(&self, slot: PlayerSlot) -> EventOutcome {
        self.player_put_in_server(slot, self.host.resolve(slot))
    }

    /// The player in `slot` disconnected. Resolves the occupant now.
    pub fn on_client_disconnect(&self, slot: PlayerSlot) -> EventOutcome {
        self.player_disconnected(slot, self.host.resolve(slot))
    }

    /// Connect for `slot` with the occupant as resolved when the event happened.
    pub fn player_put_in_server(
        &self,
        slot: PlayerSlot,
        occupant: Option<PlayerInfo>,
    ) -> EventOutcome {
        let Some(player) = human(slot, occupant) else {
            return EventOutcome::Ignored;
        };
        let now = self.clock.now();

        match self.bindings.entry(slot) {
            Entry::Occupied(mut bound) => {
                let stale = *bound.get();
                if stale.user_id == player.user_id {
                    tracing::warn!(
                        slot = %slot,
                        user_id = %player.user_id,
                        connection_id = %stale.connection_id,
                        "Duplicate connect for an open session; ignoring"
                    );
                    return EventOutcome::AlreadyOpen(stale.connection_id);
                }

                // The previous occupant left without a disconnect event.
                tracing::warn!(
                    slot = %slot,
                    previous_user_id = %stale.user_id,
                    user_id = %player.user_id,
                    "Slot reused before its disconnect was seen; closing previous session"
                );
                if let Err(e) = self.accumulator.on_disconnect(stale.connection_id, now) {
                    tracing::warn!(slot = %slot, error = %e, "Previous session was already closed");
                }

                let connection_id = self.mint_connection_id();
                match self.open(connection_id, &player, now) {
                    Ok(()) => {
                        bound.insert(SlotBinding {
                            connection_id,
                            user_id: player.user_id,
                        });
                        EventOutcome::Opened(connection_id)
                    }
                    Err(outcome) => {
                        bound.remove();
                        outcome
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let connection_id = self.mint_connection_id();
                match self.open(connection_id, &player, now) {
                    Ok(()) => {
                        vacant.insert(SlotBinding {
                            connection_id,
                            user_id: player.user_id,
                        });
                        EventOutcome::Opened(connection_id)
                    }
                    Err(outcome) => outcome,
                }
            }
        }
    }

    /// Disconnect for `slot` with the occupant as resolved when the event happened.
    ///
    /// The slot binding decides which session closes, even if the occupant
    /// could not be resolved.
    pub fn player_disconnected(
        &self,
        slot: PlayerSlot,
        occupant: Option<PlayerInfo>,
    ) -> EventOutcome {
        let Some((_, binding)) = self.bindings.remove(&slot) else {
            match human(slot, occupant) {
                Some(player) => {
                    tracing::warn!(
                        slot = %slot,
                        user_id = %player.user_id,
                        name = %player.name,
                        "Disconnect without an open session; no playtime recorded"
                    );
                    return EventOutcome::MissingSession;
                }
                None => return EventOutcome::Ignored,
            }
        };

        match self
            .accumulator
            .on_disconnect(binding.connection_id, self.clock.now())
        {
            Ok(minutes) => EventOutcome::Closed {
                connection_id: binding.connection_id,
                minutes,
            },
            Err(e) => {
                tracing::warn!(
                    slot = %slot,
                    user_id = %binding.user_id,
                    error = %e,
                    "Failed to remove session on disconnect"
                );
                EventOutcome::MissingSession
            }
        }
    }

    /// Live playtime (stored total plus current session) for the player in `slot`.
    pub fn play_minutes(&self, slot: PlayerSlot) -> Option<PlayMinutes> {
        let connection_id = self.bindings.get(&slot)?.connection_id;
        self.accumulator
            .live_play_minutes(connection_id, self.clock.now())
    }

    /// Slots with an open session.
    pub fn bound_slots(&self) -> usize {
        self.bindings.len()
    }

    fn open(
        &self,
        connection_id: ConnectionId,
        player: &PlayerInfo,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), EventOutcome> {
        match self.accumulator.on_connect(connection_id, player.user_id, now) {
            Ok(()) => {
                tracing::debug!(
                    slot = %player.slot,
                    user_id = %player.user_id,
                    connection_id = %connection_id,
                    "Session opened"
                );
                Ok(())
            }
            Err(PlaytimeError::SessionAlreadyOpen(existing)) => {
                tracing::warn!(connection_id = %existing, "Connection token already in use");
                Err(EventOutcome::AlreadyOpen(existing))
            }
            Err(e @ PlaytimeError::MissingSession(_)) => {
                tracing::warn!(error = %e, "Unexpected accumulator error on connect");
                Err(EventOutcome::MissingSession)
            }
        }
    }

    fn mint_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }
}

fn human(slot: PlayerSlot, occupant: Option<PlayerInfo>) -> Option<PlayerInfo> {
    match occupant {
        Some(player) if !player.is_bot => Some(player),
        Some(_) => {
            tracing::debug!(slot = %slot, "Ignoring bot");
            None
        }
        None => {
            tracing::debug!(slot = %slot, "Ignoring unresolvable slot");
            None
        }
    }
}
