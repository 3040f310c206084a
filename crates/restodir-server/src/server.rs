//! Application assembly and serving

use anyhow::{Context, Result};
use axum::Router;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::audit::{AuditLayer, AuditRecorder, ClientAddressPolicy, AUDIT_KEY_FIELD};
use crate::bootstrap::{Bootstrapper, DIRECTORY_KEY_FIELD};
use crate::config::{Config, GeoConfig, StoreBackend};
use crate::features::{self, FeatureState};
use crate::geo::{CachedResolver, CountryResolver, GeoError, HttpGeoResolver};
use crate::middleware;
use crate::store::{DynamoStore, MemoryStore, SharedStore};

/// Open the configured store backend
pub async fn connect_store(config: &Config) -> Result<SharedStore> {
    match config.store.backend {
        StoreBackend::DynamoDb => {
            let store = DynamoStore::connect(&config.store).await?;
            Ok(Arc::new(store))
        },
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            store
                .create_table(&config.tables.restaurants, DIRECTORY_KEY_FIELD)
                .await;
            store
                .create_table(&config.tables.audit_logs, AUDIT_KEY_FIELD)
                .await;
            info!("Using in-memory store");
            Ok(Arc::new(store))
        },
    }
}

/// HTTP resolver, wrapped in a TTL cache unless the TTL is zero
pub fn build_resolver(config: &GeoConfig) -> Result<Arc<dyn CountryResolver>, GeoError> {
    let http = Arc::new(HttpGeoResolver::new(&config.lookup_url, config.timeout())?);
    if config.cache_ttl_secs == 0 {
        return Ok(http);
    }
    Ok(Arc::new(CachedResolver::new(
        http,
        Duration::from_secs(config.cache_ttl_secs),
    )))
}

/// Audit interceptor configured from `config`
pub fn audit_layer(
    config: &Config,
    store: SharedStore,
    resolver: Arc<dyn CountryResolver>,
    tracker: TaskTracker,
) -> AuditLayer {
    let recorder = Arc::new(AuditRecorder::new(store, &config.tables.audit_logs));
    AuditLayer::new(recorder, resolver, tracker)
        .with_address_policy(ClientAddressPolicy::new(&config.audit.trusted_proxy_headers))
        .with_country_header(config.geo.country_header_name())
        .with_mode(config.audit.mode)
}

/// Create the application router with all routes and middleware
pub fn create_router(config: &Config, store: SharedStore, audit: AuditLayer) -> Router {
    let state = FeatureState {
        store,
        restaurants_table: config.tables.restaurants.clone(),
        audit_logs_table: config.tables.audit_logs.clone(),
        admin_password: config.admin.password.clone(),
    };

    // Layers from innermost to outermost
    features::router(state)
        .layer(audit)
        .layer(middleware::cors_layer(&config.cors))
        .layer(middleware::tracing_layer())
}

/// Bootstrap the directory, then serve until SIGINT/SIGTERM.
///
/// Any bootstrap failure is returned before the listener is bound.
pub async fn run(config: Config) -> Result<()> {
    let store = connect_store(&config).await?;

    let outcome = Bootstrapper::new(
        store.clone(),
        &config.tables.restaurants,
        &config.bootstrap.seed_path,
    )
    .run()
    .await
    .context("Bootstrap failed")?;
    info!(?outcome, "Bootstrap finished");

    let resolver = build_resolver(&config.geo)?;
    let tracker = TaskTracker::new();
    let audit = audit_layer(&config, store.clone(), resolver, tracker.clone());
    let app = create_router(&config, store, audit);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // In-flight requests are done; drain audit writes still running
    tracker.close();
    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(timeout, tracker.wait()).await.is_err() {
        warn!(
            pending = tracker.len(),
            "Timed out waiting for audit tasks to finish"
        );
    }

    info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_builds_plain_resolver() {
        let mut config = Config::for_memory("pw").geo;
        config.cache_ttl_secs = 0;
        assert!(build_resolver(&config).is_ok());

        config.cache_ttl_secs = 60;
        assert!(build_resolver(&config).is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend_declares_tables() {
        let config = Config::for_memory("pw");
        let store = connect_store(&config).await.unwrap();

        let mut record = restodir_common::Record::new();
        record.insert(DIRECTORY_KEY_FIELD.into(), "r1".into());
        store.put(&config.tables.restaurants, record.clone()).await.unwrap();
        store.put(&config.tables.restaurants, record).await.unwrap();

        // Same key replaces rather than appends
        assert_eq!(store.count(&config.tables.restaurants).await.unwrap(), 1);
    }
}
