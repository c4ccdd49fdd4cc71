//! Pipeline composition.
//!
//! [`Pipeline`] owns the fixed stage order and is the single per-request
//! entry point. It is cheap to clone and shared by every request.

use axum::body::Body;
use axum::response::Response;
use http::{HeaderValue, Request};
use std::fmt;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument};

use crate::config::{ConfigError, PipelineConfig};
use crate::context::{RequestContext, REQUEST_ID_HEADER};
use crate::fault::FaultBoundaryStage;
use crate::observability::ObservabilityStage;
use crate::stage::{Endpoint, Next, Stage};
use crate::tenant::TenantResolutionStage;

/// The composed request pipeline.
///
/// Stage order is always fault boundary, observability, tenant resolution.
///
/// # Example
///
/// ```rust,ignore
/// use licensa_pipeline::{endpoint_fn, Pipeline, PipelineConfig};
///
/// let pipeline = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .build()?;
///
/// let mut endpoint = endpoint_fn(|_req, cx| async move {
///     Ok(format!("hello {}", cx.tenant_or_unknown()).into_response())
/// });
/// let response = pipeline.handle(request, &mut endpoint).await;
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
    config: Arc<PipelineConfig>,
    logger: Option<Dispatch>,
}

impl Pipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Names of the stages, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// The configuration the pipeline was built with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request through the stages and `endpoint`.
    ///
    /// Always yields a response. The response carries the request's
    /// correlation id in `x-request-id` unless the endpoint already set one.
    pub async fn handle(&self, request: Request<Body>, endpoint: &mut dyn Endpoint) -> Response {
        match &self.logger {
            Some(logger) => self.run(request, endpoint).with_subscriber(logger.clone()).await,
            None => self.run(request, endpoint).await,
        }
    }

    async fn run(&self, request: Request<Body>, endpoint: &mut dyn Endpoint) -> Response {
        // Created here so the span belongs to the injected subscriber.
        let mut cx = RequestContext::from_request(&request);
        let span = cx.span().clone();

        let result = Next::new(&self.stages, endpoint)
            .run(request, &mut cx)
            .instrument(span)
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(fault) => FaultBoundaryStage::new().fault_response(&fault, &cx),
        };

        if !response.headers().contains_key(REQUEST_ID_HEADER) {
            if let Ok(value) = HeaderValue::from_str(cx.request_id().as_str()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }
        response
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    logger: Option<Dispatch>,
}

impl PipelineBuilder {
    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Send every record of every request to `logger`.
    ///
    /// Without a logger, records go to whatever subscriber is current where
    /// the request runs.
    #[must_use]
    pub fn logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate the configuration and assemble the stages.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(FaultBoundaryStage::new()),
            Arc::new(
                ObservabilityStage::new(config.body_capture_limit_bytes)
                    .with_logger(self.logger.clone()),
            ),
            Arc::new(TenantResolutionStage::new(Arc::clone(&config))?),
        ];

        tracing::debug!(
            stages = ?stages.iter().map(|stage| stage.name()).collect::<Vec<_>>(),
            tenant_header = %config.tenant_header,
            "request pipeline built"
        );

        Ok(Pipeline {
            stages: stages.into(),
            config,
            logger: self.logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::endpoint_fn;
    use axum::response::IntoResponse;
    use http::StatusCode;

    #[test]
    fn test_stage_order_is_fixed() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["fault_boundary", "observability", "tenant_resolution"]
        );
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = Pipeline::builder()
            .config(PipelineConfig::builder().tenant_header("not a header").build())
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidHeaderName(_))));
    }

    #[tokio::test]
    async fn test_response_echoes_request_id() {
        let pipeline = Pipeline::builder().build().unwrap();
        let mut endpoint = endpoint_fn(|_req, _cx| async { Ok(StatusCode::OK.into_response()) });

        let request = Request::builder()
            .uri("/healthz")
            .header(REQUEST_ID_HEADER, "req-abc")
            .body(Body::empty())
            .unwrap();
        let response = pipeline.handle(request, &mut endpoint).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-abc");
    }

    #[tokio::test]
    async fn test_endpoint_request_id_header_is_kept() {
        let pipeline = Pipeline::builder().build().unwrap();
        let mut endpoint = endpoint_fn(|_req, _cx| async {
            Ok(([(REQUEST_ID_HEADER, "from-endpoint")], StatusCode::OK).into_response())
        });

        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = pipeline.handle(request, &mut endpoint).await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "from-endpoint");
    }

    #[test]
    fn test_debug_lists_stages() {
        let pipeline = Pipeline::builder().build().unwrap();
        let rendered = format!("{pipeline:?}");
        assert!(rendered.contains("tenant_resolution"));
    }
}
