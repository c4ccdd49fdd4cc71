//! Stage and endpoint contracts.
//!
//! A pipeline is an ordered list of [`Stage`]s in front of one [`Endpoint`].
//! Each stage receives the request, the request context and a [`Next`]
//! handle; calling [`Next::run`] hands control to the following stage, or to
//! the endpoint once the stages are exhausted. A stage that does not call
//! `Next::run` short-circuits the request.

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::Request;
use licensa_core::Fault;
use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;

/// The downstream handler of a pipeline.
#[async_trait]
pub trait Endpoint: Send {
    /// Handle a request that passed every stage.
    async fn call(
        &mut self,
        request: Request<Body>,
        cx: &RequestContext,
    ) -> Result<Response, Fault>;
}

/// One link of the request pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name, used in logs and for introspection.
    fn name(&self) -> &'static str;

    /// Process the request, usually by delegating to `next`.
    async fn handle(
        &self,
        request: Request<Body>,
        cx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, Fault>;
}

/// Handle to the remainder of the pipeline.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    endpoint: &'a mut dyn Endpoint,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Stage>], endpoint: &'a mut dyn Endpoint) -> Self {
        Self { stages, endpoint }
    }

    /// Run the remaining stages and the endpoint.
    pub async fn run(
        self,
        request: Request<Body>,
        cx: &mut RequestContext,
    ) -> Result<Response, Fault> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    endpoint: self.endpoint,
                };
                stage.handle(request, cx, next).await
            }
            None => self.endpoint.call(request, cx).await,
        }
    }
}

/// [`Endpoint`] backed by a closure. Mostly useful in tests.
pub struct FnEndpoint<F> {
    f: F,
}

/// Build an [`Endpoint`] from an async closure.
///
/// The closure receives an owned copy of the request context.
pub fn endpoint_fn<F, Fut>(f: F) -> FnEndpoint<F>
where
    F: FnMut(Request<Body>, RequestContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
{
    FnEndpoint { f }
}

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: FnMut(Request<Body>, RequestContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
{
    async fn call(
        &mut self,
        request: Request<Body>,
        cx: &RequestContext,
    ) -> Result<Response, Fault> {
        (self.f)(request, cx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use http::StatusCode;
    use licensa_core::RequestId;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        short_circuit: bool,
    }

    #[async_trait]
    impl Stage for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(
            &self,
            request: Request<Body>,
            cx: &mut RequestContext,
            next: Next<'_>,
        ) -> Result<Response, Fault> {
            self.log.lock().unwrap().push(self.name);
            if self.short_circuit {
                return Ok(StatusCode::NO_CONTENT.into_response());
            }
            next.run(request, cx).await
        }
    }

    fn stage(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        short_circuit: bool,
    ) -> Arc<dyn Stage> {
        Arc::new(Recording {
            name,
            log: Arc::clone(log),
            short_circuit,
        })
    }

    fn context() -> RequestContext {
        RequestContext::new(RequestId::new(), http::Method::GET, "/")
    }

    #[tokio::test]
    async fn test_stages_run_in_order_then_endpoint() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![stage("a", &log, false), stage("b", &log, false)];

        let endpoint_log = Arc::clone(&log);
        let mut endpoint = endpoint_fn(move |_req, _cx| {
            endpoint_log.lock().unwrap().push("endpoint");
            async { Ok(StatusCode::OK.into_response()) }
        });

        let mut cx = context();
        let response = Next::new(&stages, &mut endpoint)
            .run(Request::new(Body::empty()), &mut cx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "endpoint"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![stage("a", &log, true), stage("b", &log, false)];

        let endpoint_log = Arc::clone(&log);
        let mut endpoint = endpoint_fn(move |_req, _cx| {
            endpoint_log.lock().unwrap().push("endpoint");
            async { Ok(StatusCode::OK.into_response()) }
        });

        let mut cx = context();
        let response = Next::new(&stages, &mut endpoint)
            .run(Request::new(Body::empty()), &mut cx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_endpoint_fault_propagates() {
        let stages: Vec<Arc<dyn Stage>> = Vec::new();
        let mut endpoint =
            endpoint_fn(|_req, _cx| async { Err(Fault::not_found("License", None)) });

        let mut cx = context();
        let result = Next::new(&stages, &mut endpoint)
            .run(Request::new(Body::empty()), &mut cx)
            .await;

        assert!(matches!(result, Err(Fault::NotFound { .. })));
    }
}
