//! Tower Layer for the request pipeline.

use crate::config::{ConfigError, PipelineConfig};
use crate::pipeline::Pipeline;
use crate::service::PipelineService;
use tower_layer::Layer;

/// Tower Layer that runs every request through a [`Pipeline`].
///
/// The wrapped service becomes the pipeline's endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{routing::get, Router};
/// use licensa_pipeline::{Pipeline, PipelineLayer};
///
/// let pipeline = Pipeline::builder().logger(dispatch).build()?;
///
/// let app = Router::new()
///     .route("/api/licenses", get(list_licenses))
///     .layer(PipelineLayer::new(pipeline));
/// ```
#[derive(Debug, Clone)]
pub struct PipelineLayer {
    pipeline: Pipeline,
}

impl PipelineLayer {
    /// Create a layer around an already built pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Build a pipeline from `config` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Pipeline::builder().config(config).build()?))
    }

    /// The wrapped pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl<S> Layer<S> for PipelineLayer {
    type Service = PipelineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PipelineService::new(inner, self.pipeline.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_pipeline() {
        let layer = PipelineLayer::from_config(
            PipelineConfig::builder().tenant_header("X-Org-ID").build(),
        )
        .unwrap();
        assert_eq!(layer.pipeline().config().tenant_header, "X-Org-ID");
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = PipelineConfig::builder()
            .exempt_path_prefixes(["healthz"])
            .build();
        assert_eq!(
            PipelineLayer::from_config(config).unwrap_err(),
            ConfigError::InvalidPathPrefix("healthz".to_string())
        );
    }
}
