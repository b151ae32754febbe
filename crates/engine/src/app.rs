//! Application state and composition.

use std::sync::Arc;
use std::time::Duration;

use playtime_domain::PlayerSlot;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

use crate::api::{subscribe, EventSubscription, LifecycleAdapter, LifecycleEvent};
use crate::infrastructure::{
    clock::SystemClock,
    config::TrackerConfig,
    ports::{ClockPort, HostRuntime, RecordStore, RepoError},
    records::SqliteRecordStore,
};
use crate::stores::{SessionTable, UserWriteQueue};
use crate::use_cases::playtime::{PlaytimeUseCases, SessionAccumulator};

/// Main application state.
///
/// Owns the record store, the playtime use cases and the running lifecycle
/// dispatch. Built once per load and torn down by [`App::unload`].
pub struct App {
    pub records: Arc<dyn RecordStore>,
    pub use_cases: UseCases,
    pub lifecycle: Arc<LifecycleAdapter>,
    host: Arc<dyn HostRuntime>,
    subscription: EventSubscription,
    shutdown_grace: Duration,
}

/// Container for all use cases.
pub struct UseCases {
    pub playtime: PlaytimeUseCases,
}

impl App {
    /// Open the record store named by `config` and start event dispatch.
    ///
    /// The database file exists before any event can be handled.
    pub async fn load(
        config: &TrackerConfig,
        host: Arc<dyn HostRuntime>,
    ) -> Result<Self, RepoError> {
        let store = SqliteRecordStore::open(&config.db_path).await?;
        let known_users = store.count().await?;
        tracing::info!(
            path = %config.db_path.display(),
            known_users,
            "Playtime database ready"
        );

        Ok(Self::new(
            Arc::new(store),
            host,
            Arc::new(SystemClock::new()),
            config,
        ))
    }

    /// Wire the components around an already-open record store.
    pub fn new(
        records: Arc<dyn RecordStore>,
        host: Arc<dyn HostRuntime>,
        clock: Arc<dyn ClockPort>,
        config: &TrackerConfig,
    ) -> Self {
        let accumulator = Arc::new(SessionAccumulator::new(
            records.clone(),
            Arc::new(SessionTable::new()),
            Arc::new(UserWriteQueue::new()),
            config.session_cap,
        ));
        let lifecycle = Arc::new(LifecycleAdapter::new(
            host.clone(),
            clock,
            accumulator.clone(),
        ));
        let subscription = subscribe(lifecycle.clone(), accumulator.clone(), config.event_buffer);

        Self {
            records,
            use_cases: UseCases {
                playtime: PlaytimeUseCases::new(accumulator),
            },
            lifecycle,
            host,
            subscription,
            shutdown_grace: config.shutdown_grace,
        }
    }

    /// Sender for host lifecycle events.
    pub fn events(&self) -> mpsc::Sender<LifecycleEvent> {
        self.subscription.sender()
    }

    /// Raise a connect for `slot` with its current occupant.
    pub async fn client_put_in_server(
        &self,
        slot: PlayerSlot,
    ) -> Result<(), SendError<LifecycleEvent>> {
        let event = LifecycleEvent::put_in_server(self.host.as_ref(), slot);
        self.subscription.sender().send(event).await
    }

    /// Raise a disconnect for `slot` with its current occupant.
    pub async fn client_disconnect(
        &self,
        slot: PlayerSlot,
    ) -> Result<(), SendError<LifecycleEvent>> {
        let event = LifecycleEvent::disconnect(self.host.as_ref(), slot);
        self.subscription.sender().send(event).await
    }

    /// Stop handling events and give pending writes the configured grace period.
    pub async fn unload(self) -> bool {
        tracing::info!(
            open_sessions = self.use_cases.playtime.accumulator.open_sessions(),
            "Unloading playtime tracker"
        );
        self.subscription.unload(self.shutdown_grace).await
    }
}
