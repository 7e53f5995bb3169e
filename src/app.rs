//! Server bootstrap: store, module registry, and HTTP lifecycle.

use std::future::Future;

use anyhow::Context;
use axum::Router;
use shelf_db::SharedStore;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use tokio::net::TcpListener;

use crate::modules;

/// A fully initialized application: modules registered, initialized and started.
pub struct App {
    settings: Settings,
    store: SharedStore,
    registry: ModuleRegistry,
}

impl App {
    /// Open the configured store and bring every module up.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let store = shelf_db::open(settings.database.backend, &settings.database.path)
            .await
            .with_context(|| "failed to open document store")?;

        Self::with_store(settings, store).await
    }

    /// Bring every module up on an already opened store.
    pub async fn with_store(settings: Settings, store: SharedStore) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &store, &settings);

        let ctx = InitCtx {
            settings: &settings,
            db: &store,
        };
        registry.init_modules(&ctx).await?;
        registry.start_modules(&ctx).await?;

        Ok(Self {
            settings,
            store,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The HTTP router with every module mounted.
    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings)
    }

    /// Bind the configured address and serve until `shutdown` resolves, then stop modules.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = shelf_http::start_server(&self.registry, &self.settings, shutdown).await;
        self.stop(served).await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then stop modules.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = shelf_http::serve(listener, self.router(), shutdown).await;
        self.stop(served).await
    }

    async fn stop(self, served: anyhow::Result<()>) -> anyhow::Result<()> {
        let stopped = self.registry.stop_modules().await;
        served?;
        stopped
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
