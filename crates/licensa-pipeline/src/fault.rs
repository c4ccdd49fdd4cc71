//! Fault boundary stage.
//!
//! Outermost stage of every pipeline. Turns returned faults and panics from
//! anywhere inside into a classified [`ErrorEnvelope`] response, so nothing
//! but a well-formed response ever leaves the pipeline.

use async_trait::async_trait;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use http::{Request, StatusCode};
use licensa_core::{ErrorEnvelope, Fault};
use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;

use crate::classify::classify;
use crate::context::RequestContext;
use crate::stage::{Next, Stage};

/// Non-standard 499 "client closed request", used for cancelled requests.
#[must_use]
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Stage that converts failures into error responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultBoundaryStage;

impl FaultBoundaryStage {
    pub const NAME: &'static str = "fault_boundary";

    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the response for `fault`, logging it first.
    #[must_use]
    pub fn fault_response(&self, fault: &Fault, cx: &RequestContext) -> Response {
        if fault.is_cancelled() {
            tracing::info!(
                request_id = %cx.request_id(),
                tenant_id = %cx.tenant_or_unknown(),
                method = %cx.method(),
                path = %cx.path(),
                "request cancelled before completion"
            );
            return (client_closed_request(), Body::empty()).into_response();
        }

        let class = classify(fault);
        let chain = error_chain(fault);

        if class.status.is_server_error() {
            tracing::error!(
                fault_kind = fault.kind(),
                category = class.category,
                status = class.status.as_u16(),
                error = %chain,
                request_id = %cx.request_id(),
                tenant_id = %cx.tenant_or_unknown(),
                method = %cx.method(),
                path = %cx.path(),
                "request failed"
            );
        } else {
            tracing::warn!(
                fault_kind = fault.kind(),
                category = class.category,
                status = class.status.as_u16(),
                error = %chain,
                request_id = %cx.request_id(),
                tenant_id = %cx.tenant_or_unknown(),
                method = %cx.method(),
                path = %cx.path(),
                "request failed"
            );
        }

        ErrorEnvelope::new(class.code, class.message, cx.request_id().as_str())
            .into_response_with(class.status)
    }
}

#[async_trait]
impl Stage for FaultBoundaryStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        request: Request<Body>,
        cx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, Fault> {
        let outcome = AssertUnwindSafe(next.run(request, cx)).catch_unwind().await;

        let fault = match outcome {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(fault)) => fault,
            Err(panic) => Fault::internal(format!("handler panicked: {}", panic_message(&*panic))),
        };

        Ok(self.fault_response(&fault, cx))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .map_or_else(|| "Unknown panic".to_string(), ToString::to_string)
        },
        ToString::to_string,
    )
}

/// Render a fault and all of its sources as `outer: inner: root`.
fn error_chain(fault: &Fault) -> String {
    let mut rendered = fault.to_string();
    let mut source = StdError::source(fault);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use http::Method;
    use licensa_core::RequestId;

    fn context() -> RequestContext {
        RequestContext::new(RequestId::new(), Method::GET, "/api/documents/5")
    }

    #[test]
    fn test_client_closed_request_is_499() {
        assert_eq!(client_closed_request().as_u16(), 499);
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*payload), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*payload), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(&*payload), "Unknown panic");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let fault: Fault = Err::<(), _>(std::io::Error::other("disk unplugged"))
            .context("loading license 5")
            .unwrap_err()
            .into();
        let chain = error_chain(&fault);
        assert!(chain.starts_with("loading license 5"));
        assert!(chain.contains("disk unplugged"));
    }

    #[test]
    fn test_cancelled_response_has_no_body() {
        let response = FaultBoundaryStage::new().fault_response(&Fault::Cancelled, &context());
        assert_eq!(response.status().as_u16(), 499);
        assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_fault_response_uses_classification() {
        let response = FaultBoundaryStage::new()
            .fault_response(&Fault::not_found("Document", Some("5".into())), &context());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
