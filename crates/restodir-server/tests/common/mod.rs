//! Shared helpers for the HTTP integration tests
//!
//! Every test gets its own in-memory store, a stub country resolver and a
//! router assembled exactly as the binary assembles it.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use restodir_common::Record;
use restodir_server::{
    audit::AUDIT_KEY_FIELD,
    bootstrap::DIRECTORY_KEY_FIELD,
    config::Config,
    geo::{CountryResolver, GeoError},
    server,
    store::{MemoryStore, SharedStore, Store},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "integration-secret";
pub const PEER: &str = "203.0.113.7:51000";

/// Resolver answering a fixed country and counting lookups
pub struct FixedResolver {
    country: &'static str,
    calls: AtomicUsize,
}

impl FixedResolver {
    pub fn new(country: &'static str) -> Self {
        Self {
            country,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountryResolver for FixedResolver {
    async fn resolve(&self, _address: &str) -> Result<String, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.country.to_string())
    }
}

pub struct TestApp {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub resolver: Arc<FixedResolver>,
    pub tracker: TaskTracker,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Config::for_memory(ADMIN_PASSWORD);

        let store = Arc::new(MemoryStore::new());
        store
            .create_table(&config.tables.restaurants, DIRECTORY_KEY_FIELD)
            .await;
        store
            .create_table(&config.tables.audit_logs, AUDIT_KEY_FIELD)
            .await;
        let shared: SharedStore = store.clone();

        let resolver = Arc::new(FixedResolver::new("US"));
        let tracker = TaskTracker::new();
        let audit = server::audit_layer(&config, shared.clone(), resolver.clone(), tracker.clone());
        let router = server::create_router(&config, shared, audit);

        Self {
            config,
            store,
            resolver,
            tracker,
            router,
        }
    }

    pub fn shared_store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Send a request as if it arrived over TCP from [`PEER`]
    pub async fn send(&self, mut request: Request<Body>) -> (StatusCode, Value) {
        let peer: SocketAddr = PEER.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, ADMIN_PASSWORD);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn audit_rows(&self) -> Vec<Record> {
        self.store.dump(&self.config.tables.audit_logs).await
    }

    pub async fn insert_restaurant(&self, restaurant: Value) {
        let record: Record = serde_json::from_value(restaurant).unwrap();
        self.store
            .put(&self.config.tables.restaurants, record)
            .await
            .unwrap();
    }
}
