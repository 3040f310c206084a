//! Shared-secret gate for admin routes
//!
//! The `Authorization` header must carry the configured admin password
//! verbatim. Anything else is answered with 401 before the inner service
//! runs.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;

#[derive(Clone)]
pub struct AdminAuthLayer {
    password: Arc<str>,
}

impl AdminAuthLayer {
    pub fn new(password: impl AsRef<str>) -> Self {
        Self {
            password: Arc::from(password.as_ref()),
        }
    }
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuth {
            inner,
            password: self.password.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminAuth<S> {
    inner: S,
    password: Arc<str>,
}

/// Compare without short-circuiting on the first differing byte
fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl<S> Service<Request> for AdminAuth<S>
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
        let authorized = request
            .headers()
            .get(AUTHORIZATION)
            .is_some_and(|value| secret_matches(value.as_bytes(), self.password.as_bytes()));

        if !authorized {
            warn!(path = %request.uri().path(), "Rejected admin request");
            return Box::pin(async {
                Ok(AppError::Unauthorized("Unauthorized".to_string()).into_response())
            });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}
