use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Image build failed: {0}")]
    Build(String),

    #[error("Container failed to start: {0}")]
    Run(String),

    #[error("Container {0} not found")]
    NotFound(String),

    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),
}

/// Builds and runs container images
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Builds `context_dir` (which holds a `Dockerfile`) and returns the image id
    async fn build(&self, context_dir: &Path, image_name: &str) -> Result<String, RuntimeError>;

    /// Starts `image` with `container_port` published on `host_port`; returns the container id
    async fn run(
        &self,
        image_name: &str,
        host_port: u16,
        container_port: u16,
    ) -> Result<String, RuntimeError>;

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError>;

    async fn logs(&self, container_id: &str) -> Result<String, RuntimeError>;

    fn name(&self) -> &str;
}
