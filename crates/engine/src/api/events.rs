//! Lifecycle event subscription.
//!
//! The host pushes [`LifecycleEvent`]s into a bounded channel. A single
//! dispatch task drains it in order and drives the [`LifecycleAdapter`].
//! Dropping the subscription without calling [`EventSubscription::unload`]
//! stops dispatch but does not wait for pending record writes.

use std::sync::Arc;
use std::time::Duration;

use playtime_domain::PlayerSlot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::lifecycle::{EventOutcome, LifecycleAdapter};
use crate::infrastructure::ports::{HostRuntime, PlayerInfo};
use crate::use_cases::playtime::SessionAccumulator;

/// Slot notifications the host delivers.
///
/// Each event carries the slot's occupant as the host resolved it when the
/// event was raised, so later changes to the slot cannot retarget it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    ClientPutInServer {
        slot: PlayerSlot,
        occupant: Option<PlayerInfo>,
    },
    ClientDisconnect {
        slot: PlayerSlot,
        occupant: Option<PlayerInfo>,
    },
}

impl LifecycleEvent {
    /// Connect event for `slot`, resolving its occupant now.
    pub fn put_in_server(host: &dyn HostRuntime, slot: PlayerSlot) -> Self {
        Self::ClientPutInServer {
            slot,
            occupant: host.resolve(slot),
        }
    }

    /// Disconnect event for `slot`, resolving its occupant now.
    pub fn disconnect(host: &dyn HostRuntime, slot: PlayerSlot) -> Self {
        Self::ClientDisconnect {
            slot,
            occupant: host.resolve(slot),
        }
    }

    pub fn slot(&self) -> PlayerSlot {
        match self {
            Self::ClientPutInServer { slot, .. } | Self::ClientDisconnect { slot, .. } => *slot,
        }
    }
}

/// Handle for a running dispatch task.
pub struct EventSubscription {
    sender: mpsc::Sender<LifecycleEvent>,
    cancel: CancellationToken,
    dispatch: JoinHandle<()>,
    accumulator: Arc<SessionAccumulator>,
}

/// Start dispatching lifecycle events to `adapter`.
pub fn subscribe(
    adapter: Arc<LifecycleAdapter>,
    accumulator: Arc<SessionAccumulator>,
    buffer: usize,
) -> EventSubscription {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    let cancel = CancellationToken::new();
    let dispatch = tokio::spawn(dispatch_loop(adapter, receiver, cancel.clone()));

    EventSubscription {
        sender,
        cancel,
        dispatch,
        accumulator,
    }
}

async fn dispatch_loop(
    adapter: Arc<LifecycleAdapter>,
    mut receiver: mpsc::Receiver<LifecycleEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            event = receiver.recv() => match event {
                Some(event) => {
                    let slot = event.slot();
                    let outcome = dispatch(&adapter, event);
                    tracing::trace!(slot = %slot, ?outcome, "Lifecycle event handled");
                }
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }

    // Events already queued when unload was requested are still applied.
    receiver.close();
    while let Ok(event) = receiver.try_recv() {
        dispatch(&adapter, event);
    }
    tracing::debug!("Lifecycle dispatch stopped");
}

fn dispatch(adapter: &LifecycleAdapter, event: LifecycleEvent) -> EventOutcome {
    match event {
        LifecycleEvent::ClientPutInServer { slot, occupant } => {
            adapter.player_put_in_server(slot, occupant)
        }
        LifecycleEvent::ClientDisconnect { slot, occupant } => {
            adapter.player_disconnected(slot, occupant)
        }
    }
}

impl EventSubscription {
    /// Sender the host uses to deliver events.
    pub fn sender(&self) -> mpsc::Sender<LifecycleEvent> {
        self.sender.clone()
    }

    /// Stop dispatch, then wait up to `grace` for pending record writes.
    ///
    /// Returns `false` if writes were still running when the grace period
    /// ran out. Those writes are abandoned with the runtime.
    pub async fn unload(self, grace: Duration) -> bool {
        self.cancel.cancel();
        if let Err(e) = self.dispatch.await {
            tracing::error!(error = %e, "Lifecycle dispatch task failed");
        }

        let flushed = self.accumulator.flush(grace).await;
        if flushed {
            tracing::info!("All playtime writes flushed");
        } else {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                open_sessions = self.accumulator.open_sessions(),
                "Playtime writes still pending at unload; they may be lost"
            );
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockHostRuntime, MockRecordStore};
    use crate::stores::{SessionTable, UserWriteQueue};
    use chrono::{TimeZone, Utc};
    use playtime_domain::{PlayMinutes, UserId};

    fn occupant(slot: PlayerSlot) -> PlayerInfo {
        PlayerInfo {
            slot,
            user_id: UserId::new(500 + slot.get() as u64),
            name: format!("player{slot}"),
            is_bot: false,
        }
    }

    fn build(
        records: MockRecordStore,
    ) -> (
        Arc<MockHostRuntime>,
        Arc<LifecycleAdapter>,
        Arc<SessionAccumulator>,
    ) {
        let mut host = MockHostRuntime::new();
        host.expect_resolve().returning(|slot| Some(occupant(slot)));
        let host = Arc::new(host);
        let now = Utc
            .with_ymd_and_hms(2025, 6, 15, 18, 0, 0)
            .single()
            .expect("valid timestamp");
        let accumulator = Arc::new(SessionAccumulator::new(
            Arc::new(records),
            Arc::new(SessionTable::new()),
            Arc::new(UserWriteQueue::new()),
            PlayMinutes::new(30),
        ));
        let adapter = Arc::new(LifecycleAdapter::new(
            host.clone(),
            Arc::new(FixedClock(now)),
            accumulator.clone(),
        ));
        (host, adapter, accumulator)
    }

    #[test]
    fn events_capture_the_occupant_when_raised() {
        let mut host = MockHostRuntime::new();
        host.expect_resolve().returning(|slot| Some(occupant(slot)));
        let slot = PlayerSlot::new(7);

        let connect = LifecycleEvent::put_in_server(&host, slot);
        assert_eq!(
            connect,
            LifecycleEvent::ClientPutInServer {
                slot,
                occupant: Some(occupant(slot))
            }
        );
        assert_eq!(connect.slot(), slot);
        assert_eq!(LifecycleEvent::disconnect(&host, slot).slot(), slot);
    }

    #[tokio::test]
    async fn queued_events_are_applied_before_unload_flushes() {
        let mut records = MockRecordStore::new();
        // Two connects then two disconnects, each loading the record once.
        records.expect_get().times(4).returning(|_| Ok(None));
        records.expect_upsert().times(4).returning(|_| Ok(()));
        let (host, adapter, accumulator) = build(records);

        let subscription = subscribe(adapter.clone(), accumulator.clone(), 8);
        let events = subscription.sender();
        let (one, two) = (PlayerSlot::new(1), PlayerSlot::new(2));
        for event in [
            LifecycleEvent::put_in_server(host.as_ref(), one),
            LifecycleEvent::put_in_server(host.as_ref(), two),
            LifecycleEvent::disconnect(host.as_ref(), one),
            LifecycleEvent::disconnect(host.as_ref(), two),
        ] {
            events.send(event).await.expect("dispatch running");
        }

        assert!(subscription.unload(Duration::from_secs(5)).await);
        assert_eq!(accumulator.open_sessions(), 0);
        assert_eq!(adapter.bound_slots(), 0);
    }

    #[tokio::test]
    async fn sender_fails_after_unload() {
        let (host, adapter, accumulator) = build(MockRecordStore::new());
        let subscription = subscribe(adapter, accumulator, 1);
        let events = subscription.sender();

        assert!(subscription.unload(Duration::from_secs(1)).await);
        assert!(events
            .send(LifecycleEvent::disconnect(host.as_ref(), PlayerSlot::new(1)))
            .await
            .is_err());
    }
}
