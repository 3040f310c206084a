//! Audit interceptor for public requests
//!
//! Every request whose path is not skip-listed produces exactly one audit
//! entry holding the canonical query string, the client address and its
//! resolved country. The audit work never changes the response:
//! - geo lookup failures fall back to `"unknown"`
//! - write failures are logged at `warn` and dropped
//! - the work runs in a tracked task, so a cancelled request cannot abort
//!   a write half way
//!
//! In [`AuditMode::Inline`] the task is awaited before the request is
//! forwarded. In [`AuditMode::Background`] the request is forwarded
//! immediately and the task is drained at shutdown.

use axum::{extract::Request, response::Response};
use http::HeaderName;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio_util::task::TaskTracker;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::client_addr::{ClientAddressPolicy, UNKNOWN_ADDRESS};
use super::recorder::AuditSink;
use crate::config::AuditMode;
use crate::geo::{resolve_or_unknown, CountryResolver, UNKNOWN_COUNTRY};

/// Paths that are never audited
#[derive(Debug, Clone)]
pub struct SkipRules {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for SkipRules {
    fn default() -> Self {
        Self {
            exact: vec!["/readiness".to_string(), "/liveness".to_string()],
            prefixes: vec!["/admin/logs".to_string()],
        }
    }
}

impl SkipRules {
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { exact, prefixes }
    }

    pub fn should_skip(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p))
    }
}

/// Canonical form of a raw query string.
///
/// Pairs are decoded, stably sorted by key (values of a repeated key keep
/// their order) and re-encoded as `application/x-www-form-urlencoded`.
/// `~` stays literal and `*` is percent-encoded, so rows match those written
/// by QueryEscape-style encoders.
pub fn canonical_query(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|q| !q.is_empty()) else {
        return String::new();
    };

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Audit logging layer
#[derive(Clone)]
pub struct AuditLayer {
    sink: Arc<dyn AuditSink>,
    resolver: Arc<dyn CountryResolver>,
    skip: SkipRules,
    addresses: ClientAddressPolicy,
    country_header: Option<HeaderName>,
    mode: AuditMode,
    tracker: TaskTracker,
}

impl AuditLayer {
    pub fn new(
        sink: Arc<dyn AuditSink>,
        resolver: Arc<dyn CountryResolver>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            sink,
            resolver,
            skip: SkipRules::default(),
            addresses: ClientAddressPolicy::default(),
            country_header: None,
            mode: AuditMode::default(),
            tracker,
        }
    }

    pub fn with_skip_rules(mut self, skip: SkipRules) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_address_policy(mut self, addresses: ClientAddressPolicy) -> Self {
        self.addresses = addresses;
        self
    }

    /// Trust a country header set by the edge instead of looking it up
    pub fn with_country_header(mut self, header: Option<HeaderName>) -> Self {
        self.country_header = header;
        self
    }

    pub fn with_mode(mut self, mode: AuditMode) -> Self {
        self.mode = mode;
        self
    }

    /// Collect the audit fields from the request and build the detached write
    fn audit_job(&self, request: &Request) -> impl Future<Output = ()> + Send + 'static {
        let query = canonical_query(request.uri().query());
        let client_address = self.addresses.client_address(request);
        let edge_country = self
            .country_header
            .as_ref()
            .and_then(|name| request.headers().get(name))
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let sink = self.sink.clone();
        let resolver = self.resolver.clone();

        async move {
            let country = match edge_country {
                Some(country) => country,
                None if client_address == UNKNOWN_ADDRESS => UNKNOWN_COUNTRY.to_string(),
                None => {
                    let resolution = resolve_or_unknown(resolver.as_ref(), &client_address).await;
                    if let Some(error) = &resolution.error {
                        warn!(
                            client_address = %client_address,
                            error = %error,
                            "Geo lookup failed, recording unknown country"
                        );
                    }
                    resolution.country
                },
            };

            match sink.record(&query, &client_address, &country).await {
                Ok(entry) => {
                    debug!(
                        log_id = %entry.log_id,
                        query = %entry.query,
                        client_address = %entry.client_address,
                        country = %entry.country,
                        "Audit log entry created"
                    );
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        query = %query,
                        client_address = %client_address,
                        "Failed to create audit log entry"
                    );
                },
            }
        }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

/// Audit middleware service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    layer: AuditLayer,
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();

        if self.layer.skip.should_skip(request.uri().path()) {
            return Box::pin(async move { inner.call(request).await });
        }

        let handle = self.layer.tracker.spawn(self.layer.audit_job(&request));
        let mode = self.layer.mode;

        Box::pin(async move {
            if mode == AuditMode::Inline {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Audit task did not complete");
                }
            }

            inner.call(request).await
        })
    }
}
