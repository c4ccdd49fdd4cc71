//! Tower Service implementation for the request pipeline.
//!
//! Provides `PipelineService`, which runs the pipeline in front of an inner
//! service such as an axum `Router`.

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use futures::future::BoxFuture;
use http::Request;
use licensa_core::{Fault, RaisedFault};
use std::task::{Context, Poll};
use tower_service::Service;

use crate::context::RequestContext;
use crate::pipeline::Pipeline;
use crate::stage::Endpoint;

/// Tower Service that wraps an inner service with the pipeline.
///
/// The inner service sees the request only after every stage passed it, with
/// the [`RequestContext`] and, when resolved, the
/// [`TenantId`](licensa_core::TenantId) in its extensions.
///
/// # Type Parameters
///
/// * `S` - The inner service type
#[derive(Debug, Clone)]
pub struct PipelineService<S> {
    inner: S,
    pipeline: Pipeline,
}

impl<S> PipelineService<S> {
    /// Create a new PipelineService.
    pub fn new(inner: S, pipeline: Pipeline) -> Self {
        Self { inner, pipeline }
    }
}

impl<S> Service<Request<Body>> for PipelineService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // The ready instance goes to this request; a fresh clone stays behind.
        let inner = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, inner);
        let pipeline = self.pipeline.clone();

        Box::pin(async move {
            let mut endpoint = ServiceEndpoint { inner };
            Ok(pipeline.handle(req, &mut endpoint).await)
        })
    }
}

/// Adapts an inner service to the [`Endpoint`] contract.
struct ServiceEndpoint<S> {
    inner: S,
}

#[async_trait]
impl<S> Endpoint for ServiceEndpoint<S>
where
    S: Service<Request<Body>, Response = Response> + Send,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    async fn call(
        &mut self,
        mut request: Request<Body>,
        cx: &RequestContext,
    ) -> Result<Response, Fault> {
        if let Some(tenant) = cx.tenant() {
            request.extensions_mut().insert(tenant.clone());
        }
        request.extensions_mut().insert(cx.clone());

        let mut response = self
            .inner
            .call(request)
            .await
            .map_err(|err| Fault::Internal(anyhow::Error::new(err)))?;

        match RaisedFault::take(&mut response) {
            Some(fault) => Err(fault),
            None => Ok(response),
        }
    }
}
