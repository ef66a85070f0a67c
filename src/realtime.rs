//! Real-time layer lifecycle.
//!
//! Ties the connection manager, event router, store, and reconciler together
//! as one explicitly owned resource: created when the application mounts its
//! real-time layer, torn down when it unmounts. Exactly one instance exists
//! at a time; this is deliberate process-wide shared state with an explicit
//! constructor/destructor pair instead of ambient globals.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::reconcile::{DashboardApi, Reconciler};
use crate::store::DashboardStore;
use crate::ws::{
    ConnectionStatus, EventRouter, StreamConnection, SubscriptionHandle, WsConfig, WsError,
};

/// The mounted real-time layer.
pub struct RealtimeLayer {
    connection: Arc<StreamConnection>,
    router: Arc<EventRouter>,
    store: Arc<DashboardStore>,
    reconciler: Arc<Reconciler>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl std::fmt::Debug for RealtimeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeLayer")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl RealtimeLayer {
    /// Mounts the real-time layer: attaches the consumer hooks, performs the
    /// initial bot and log sync, and opens the stream connection.
    ///
    /// A failed initial connection is not an error; the manager keeps
    /// retrying with backoff until [`unmount`](Self::unmount).
    ///
    /// # Errors
    ///
    /// Returns an error only if the stream configuration is invalid.
    pub async fn mount(config: WsConfig, api: Arc<dyn DashboardApi>) -> Result<Self, WsError> {
        let router = Arc::new(EventRouter::new());
        let store = Arc::new(DashboardStore::new());
        let reconciler = Reconciler::new(Arc::clone(&store), api);
        let subscriptions = reconciler.attach(&router);

        let connection = StreamConnection::new(config, Arc::clone(&router))?;

        // Seed the store before the first push arrives; the order mirror in
        // particular only merges events for orders it already holds.
        reconciler.refresh_bots().await;
        reconciler.refresh_logs().await;
        reconciler.refresh_orders().await;

        connection.connect().await;
        info!("real-time layer mounted");

        Ok(Self {
            connection,
            router,
            store,
            reconciler,
            subscriptions: Mutex::new(subscriptions),
        })
    }

    /// Unmounts the layer: disposes the consumer hooks, closes the socket,
    /// and cancels the keepalive and any pending reconnect timer.
    pub async fn unmount(&self) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.connection.close().await;
        info!("real-time layer unmounted");
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> Arc<DashboardStore> {
        Arc::clone(&self.store)
    }

    /// Returns the event router, for per-widget subscriptions such as
    /// `price_update`.
    #[must_use]
    pub fn router(&self) -> Arc<EventRouter> {
        Arc::clone(&self.router)
    }

    /// Returns the reconciler, for REST actions that follow the
    /// apply-locally-then-resync protocol.
    #[must_use]
    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    /// Returns the current connection status, for the connectivity
    /// indicator.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }
}
