//! Request logging stage.
//!
//! Emits a "request started" record on entry and exactly one closing record
//! per request: "request completed" with the final status, or "request
//! cancelled" when the request future is dropped before it finishes.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::response::Response;
use futures::{FutureExt, StreamExt};
use http::{header, Request, StatusCode};
use http_body::Body as _;
use licensa_core::Fault;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{Dispatch, Span};

use crate::classify::classify;
use crate::context::RequestContext;
use crate::fault::client_closed_request;
use crate::stage::{Next, Stage};

/// Stage that times requests and logs their start and end.
#[derive(Debug, Clone)]
pub struct ObservabilityStage {
    capture_limit: usize,
    logger: Option<Dispatch>,
}

impl ObservabilityStage {
    pub const NAME: &'static str = "observability";

    /// Create the stage. Bodies shorter than `capture_limit` bytes are
    /// logged at debug level.
    #[must_use]
    pub fn new(capture_limit: usize) -> Self {
        Self {
            capture_limit,
            logger: None,
        }
    }

    /// Use `logger` for records emitted while a cancelled request is torn
    /// down, when no subscriber context is active.
    #[must_use]
    pub fn with_logger(mut self, logger: Option<Dispatch>) -> Self {
        self.logger = logger;
        self
    }

    fn should_capture(&self, request: &Request<Body>) -> bool {
        if request.method().is_safe() {
            return false;
        }
        declared_length(request).is_some_and(|len| len > 0 && len < self.capture_limit as u64)
    }

    /// Read a small body, log it and hand downstream a body that replays
    /// exactly what the client sent, including a read error if one occurred.
    async fn capture_body(&self, request: Request<Body>) -> Request<Body> {
        if !self.should_capture(&request) {
            return request;
        }

        let (parts, body) = request.into_parts();
        let mut stream = body.into_data_stream();
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut captured = 0usize;
        let mut failure = None;

        while captured < self.capture_limit {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    captured += chunk.len();
                    chunks.push(chunk);
                }
                Some(Err(err)) => {
                    failure = Some(err);
                    break;
                }
                None => break,
            }
        }

        match &failure {
            Some(err) => tracing::debug!(error = %err, bytes = captured, "request body not captured"),
            None if captured < self.capture_limit => tracing::debug!(
                bytes = captured,
                body = %String::from_utf8_lossy(&chunks.concat()),
                "request body"
            ),
            None => tracing::debug!(bytes = captured, "request body exceeds capture limit"),
        }

        // Nothing is read past a failure.
        let rest = failure.is_none().then_some(stream);
        let replay = futures::stream::iter(chunks.into_iter().map(Ok))
            .chain(futures::stream::iter(failure.map(Err)))
            .chain(futures::stream::iter(rest).flatten());

        Request::from_parts(parts, Body::from_stream(replay))
    }
}

fn declared_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| request.body().size_hint().exact())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Logs "request cancelled" if dropped before [`CompletionGuard::finish`].
struct CompletionGuard {
    span: Span,
    logger: Option<Dispatch>,
    request_id: String,
    started: Instant,
    finished: bool,
}

impl CompletionGuard {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let emit = || {
            self.span.in_scope(|| {
                tracing::info!(
                    request_id = %self.request_id,
                    duration_ms = elapsed_ms(self.started),
                    "request cancelled"
                );
            });
        };

        match &self.logger {
            Some(logger) => tracing::dispatcher::with_default(logger, emit),
            None => emit(),
        }
    }
}

#[async_trait]
impl Stage for ObservabilityStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        request: Request<Body>,
        cx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, Fault> {
        let started = Instant::now();
        let query = request.uri().query().unwrap_or_default().to_string();

        tracing::info!(
            method = %cx.method(),
            path = %cx.path(),
            query = %query,
            request_id = %cx.request_id(),
            tenant_id = %cx.tenant_or_unknown(),
            "request started"
        );

        let guard = CompletionGuard {
            span: cx.span().clone(),
            logger: self.logger.clone(),
            request_id: cx.request_id().to_string(),
            started,
            finished: false,
        };

        let outcome = AssertUnwindSafe(async {
            let request = self.capture_body(request).await;
            next.run(request, cx).await
        })
        .catch_unwind()
        .await;

        let status = match &outcome {
            Ok(Ok(response)) => response.status(),
            Ok(Err(fault)) if fault.is_cancelled() => client_closed_request(),
            Ok(Err(fault)) => classify(fault).status,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::info!(
            method = %cx.method(),
            path = %cx.path(),
            query = %query,
            request_id = %cx.request_id(),
            tenant_id = %cx.tenant_or_unknown(),
            status = status.as_u16(),
            duration_ms = elapsed_ms(started),
            "request completed"
        );
        guard.finish();

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
