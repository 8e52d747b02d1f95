//! Docker engine runtime over the local socket

use super::runtime::{ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use bollard::container::{Config, LogsOptions, StartContainerOptions, StopContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::image::BuildImageOptions;
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(format!("Failed to connect to Docker: {}", e)))?;
        Ok(Self { docker })
    }

    /// Confirms the daemon answers
    pub async fn ping(&self) -> Result<String, RuntimeError> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(version.api_version.unwrap_or_else(|| "unknown".to_string()))
    }

    fn context_tarball(dir: &Path) -> std::io::Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", dir)?;
        builder.into_inner()?.finish()
    }
}

fn is_not_found(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn build(&self, context_dir: &Path, image_name: &str) -> Result<String, RuntimeError> {
        let dir: PathBuf = context_dir.to_path_buf();
        let context = tokio::task::spawn_blocking(move || Self::context_tarball(&dir))
            .await
            .map_err(|e| RuntimeError::Build(format!("context task aborted: {}", e)))?
            .map_err(|e| RuntimeError::Build(format!("cannot pack build context: {}", e)))?;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: image_name.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self
            .docker
            .build_image(options, None, Some(Bytes::from(context)));
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| RuntimeError::Build(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(RuntimeError::Build(error));
            }
            if let Some(line) = info.stream.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
                debug!(image = %image_name, "{}", line);
            }
        }

        let inspect = self
            .docker
            .inspect_image(image_name)
            .await
            .map_err(|e| RuntimeError::Build(format!("image missing after build: {}", e)))?;
        let image_id = inspect.id.unwrap_or_else(|| image_name.to_string());

        info!(image = %image_name, image_id = %image_id, "Image built");
        Ok(image_id)
    }

    async fn run(
        &self,
        image_name: &str,
        host_port: u16,
        container_port: u16,
    ) -> Result<String, RuntimeError> {
        let port_key = format!("{}/tcp", container_port);
        let config = Config {
            image: Some(image_name.to_string()),
            env: Some(vec![format!("PORT={}", container_port)]),
            exposed_ports: Some([(port_key.clone(), HashMap::new())].into_iter().collect()),
            host_config: Some(HostConfig {
                port_bindings: Some(
                    [(
                        port_key,
                        Some(vec![PortBinding {
                            host_ip: Some("127.0.0.1".to_string()),
                            host_port: Some(host_port.to_string()),
                        }]),
                    )]
                    .into_iter()
                    .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container::<String, String>(None, config)
            .await
            .map_err(|e| RuntimeError::Run(format!("create failed: {}", e)))?;

        self.docker
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Run(format!("start failed: {}", e)))?;

        info!(image = %image_name, container_id = %container.id, host_port, "Container started");
        Ok(container.id)
    }

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(container_id, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    RuntimeError::NotFound(container_id.to_string())
                } else {
                    RuntimeError::Unavailable(e.to_string())
                }
            })
    }

    async fn logs(&self, container_id: &str) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(container_id, Some(options));
        let mut output = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => output.push_str(&chunk.to_string()),
                Err(e) if is_not_found(&e) => {
                    return Err(RuntimeError::NotFound(container_id.to_string()))
                }
                Err(e) => return Err(RuntimeError::Unavailable(e.to_string())),
            }
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "docker"
    }
}
