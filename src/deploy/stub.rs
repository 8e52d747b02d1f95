//! In-process runtime that records what it was asked to do

use super::runtime::{ContainerRuntime, RuntimeError};
use crate::intelligence::recipe::has_from_instruction;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Runtime that never touches a container engine
///
/// Builds only check that the context holds a Dockerfile with a `FROM` line.
/// Image ids are content hashes; container ids are random.
#[derive(Debug, Default)]
pub struct StubRuntime {
    logs: Mutex<HashMap<String, Vec<String>>>,
    builds: AtomicUsize,
    build_failure: Option<String>,
    run_failure: Option<String>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every build fails with `message`
    pub fn with_build_failure(mut self, message: impl Into<String>) -> Self {
        self.build_failure = Some(message.into());
        self
    }

    /// Every run fails with `message`
    pub fn with_run_failure(mut self, message: impl Into<String>) -> Self {
        self.run_failure = Some(message.into());
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    fn append_log(&self, container_id: &str, line: String) -> Result<(), RuntimeError> {
        let mut logs = self.logs.lock().unwrap_or_else(|p| p.into_inner());
        match logs.get_mut(container_id) {
            Some(lines) => {
                lines.push(line);
                Ok(())
            }
            None => Err(RuntimeError::NotFound(container_id.to_string())),
        }
    }
}

fn stamp(message: &str) -> String {
    format!("{} {}", Utc::now().to_rfc3339(), message)
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn build(&self, context_dir: &Path, image_name: &str) -> Result<String, RuntimeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.build_failure {
            return Err(RuntimeError::Build(message.clone()));
        }

        let dockerfile = tokio::fs::read_to_string(context_dir.join("Dockerfile"))
            .await
            .map_err(|e| RuntimeError::Build(format!("cannot read Dockerfile: {}", e)))?;
        if !has_from_instruction(&dockerfile) {
            return Err(RuntimeError::Build(
                "Dockerfile has no FROM instruction".to_string(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(image_name.as_bytes());
        hasher.update(dockerfile.as_bytes());
        let image_id = format!("sha256:{}", hex::encode(hasher.finalize()));

        info!(image = %image_name, image_id = %image_id, "Stub image built");
        Ok(image_id)
    }

    async fn run(
        &self,
        image_name: &str,
        host_port: u16,
        container_port: u16,
    ) -> Result<String, RuntimeError> {
        if let Some(message) = &self.run_failure {
            return Err(RuntimeError::Run(message.clone()));
        }

        let container_id = Uuid::new_v4().simple().to_string();
        let line = stamp(&format!(
            "started {} publishing {}->{}",
            image_name, host_port, container_port
        ));
        self.logs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(container_id.clone(), vec![line]);

        info!(image = %image_name, container_id = %container_id, host_port, "Stub container started");
        Ok(container_id)
    }

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.append_log(container_id, stamp("stopped"))
    }

    async fn logs(&self, container_id: &str) -> Result<String, RuntimeError> {
        let logs = self.logs.lock().unwrap_or_else(|p| p.into_inner());
        logs.get(container_id)
            .map(|lines| lines.join("\n"))
            .ok_or_else(|| RuntimeError::NotFound(container_id.to_string()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_is_content_addressed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        let runtime = StubRuntime::new();

        let first = runtime.build(dir.path(), "demo").await.unwrap();
        let second = runtime.build(dir.path(), "demo").await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("sha256:"));
        assert_eq!(runtime.build_count(), 2);
    }

    #[tokio::test]
    async fn test_build_requires_from() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "RUN true\n").unwrap();
        let result = StubRuntime::new().build(dir.path(), "demo").await;
        assert!(matches!(result, Err(RuntimeError::Build(_))));
    }

    #[tokio::test]
    async fn test_run_stop_logs() {
        let runtime = StubRuntime::new();
        let id = runtime.run("demo", 41000, 3000).await.unwrap();
        runtime.stop(&id).await.unwrap();

        let logs = runtime.logs(&id).await.unwrap();
        assert!(logs.contains("publishing 41000->3000"));
        assert!(logs.contains("stopped"));
        assert!(matches!(
            runtime.logs("missing").await,
            Err(RuntimeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let runtime = StubRuntime::new().with_run_failure("port clash");
        assert!(matches!(
            runtime.run("demo", 1, 1).await,
            Err(RuntimeError::Run(_))
        ));
    }
}
