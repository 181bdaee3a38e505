//! Main controller implementation.
//!
//! Wires the store, coordinator notifier, reconciler, lifecycle engine and
//! auditor together, then runs the HTTP server and the audit loop until
//! either exits.

use crate::api::{self, AppState};
use crate::audit::Auditor;
use crate::config::InventoryConfig;
use crate::error::ControllerError;
use crate::identity::ControllerIdentity;
use crate::lifecycle::LifecycleEngine;
use crate::locks::HostLocks;
use crate::metrics::InventoryMetrics;
use crate::notify::Notifier;
use crate::reconciler::Reconciler;
use crate::store::InventoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The running reconciler: HTTP server plus audit loop.
pub struct Controller {
    server: JoinHandle<Result<(), ControllerError>>,
    auditor: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Build every component and bind the listener.
    pub async fn new(config: InventoryConfig, identity: Arc<ControllerIdentity>) -> Result<Self, ControllerError> {
        info!("Initializing inventory controller");
        let config = Arc::new(config);

        let metrics = InventoryMetrics::new()?;
        let store = Arc::new(InventoryStore::new());
        let locks = Arc::new(HostLocks::new());
        let notifier = Notifier::from_config(&config)?;

        let reconciler = Reconciler::new(
            Arc::clone(&store),
            notifier.clone(),
            Arc::clone(&config),
            Arc::clone(&locks),
        );
        let lifecycle = LifecycleEngine::new(
            reconciler.clone(),
            identity,
            Arc::clone(&locks),
            metrics.clone(),
        );
        let auditor = Auditor::new(
            Arc::clone(&store),
            notifier,
            locks,
            Arc::clone(&config),
            metrics.clone(),
        );

        let listener = TcpListener::bind(config.listen_addr).await?;
        info!("Listening on {}", config.listen_addr);
        let app = api::router(Arc::new(AppState {
            reconciler,
            lifecycle,
            metrics,
        }));

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.map_err(ControllerError::Io)
        });
        let auditor = tokio::spawn(auditor.run());

        Ok(Self { server, auditor })
    }

    /// Runs the controller until the server or the audit loop stops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Inventory controller running");
        tokio::select! {
            result = &mut self.server => {
                result.map_err(|e| ControllerError::Internal(format!("HTTP server panicked: {e}")))??;
                error!("HTTP server exited");
            }
            result = &mut self.auditor => {
                result.map_err(|e| ControllerError::Internal(format!("audit loop panicked: {e}")))??;
                error!("audit loop exited");
            }
        }
        Ok(())
    }
}
