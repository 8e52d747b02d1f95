use super::registry::{ContainerRecord, ContainerRegistry, PortReservation};
use super::runtime::{ContainerRuntime, RuntimeError};
use crate::analyzer::validate_relative_path;
use crate::intelligence::recipe::exposed_port;
use crate::intelligence::SERVER_DIR;
use crate::pipeline::{
    finish, run_stage, ErrorKind, PipelineConfig, PipelineError, RepoLocks, ScratchDir, Stage,
};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::store::{Deployment, DeploymentStatus, RecordStatus, RecordStore, RepositoryRecord};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub scratch_dir: PathBuf,
    /// Bound on materialize, build and run each
    pub stage_timeout: Duration,
    /// Base domain for deployment URLs; `http://localhost:<port>` when unset
    pub domain: Option<String>,
}

impl DeployConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            scratch_dir: config.scratch_dir.clone(),
            stage_timeout: config.stage_timeout,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain.filter(|d| !d.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub port: Option<u16>,
    pub subdomain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub deployment: Deployment,
    pub container: ContainerRecord,
    pub image_id: String,
}

pub struct DeploymentManager {
    store: Arc<dyn RecordStore>,
    runtime: Arc<dyn ContainerRuntime>,
    registry: ContainerRegistry,
    locks: RepoLocks,
    progress: Arc<dyn ProgressHandler>,
    config: DeployConfig,
}

impl DeploymentManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        runtime: Arc<dyn ContainerRuntime>,
        locks: RepoLocks,
        progress: Arc<dyn ProgressHandler>,
        config: DeployConfig,
    ) -> Self {
        Self {
            store,
            runtime,
            registry: ContainerRegistry::new(),
            locks,
            progress,
            config,
        }
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Builds and runs the repository's recipe and records the deployment
    ///
    /// Never triggers generation: a repository without a recipe fails with
    /// `NoBuildRecipe` and its record is left untouched.
    pub async fn deploy(
        &self,
        repo_id: &str,
        options: DeployOptions,
    ) -> Result<DeployOutcome, PipelineError> {
        let repo_id = repo_id.trim();
        if repo_id.is_empty() {
            return Err(PipelineError::input("repoId must be a non-empty string"));
        }
        if let Some(subdomain) = &options.subdomain {
            validate_subdomain(subdomain).map_err(|e| e.for_repo(repo_id))?;
        }
        let _guard = self.locks.try_acquire(repo_id)?;

        let start = Instant::now();
        self.progress.on_progress(&ProgressEvent::Started {
            repo_id: repo_id.to_string(),
            operation: "deploy".to_string(),
        });
        let result = self.run_deploy(repo_id, options).await;
        finish(self.progress.as_ref(), repo_id, start, result)
    }

    async fn run_deploy(
        &self,
        repo_id: &str,
        options: DeployOptions,
    ) -> Result<DeployOutcome, PipelineError> {
        let record = self
            .store
            .get(repo_id)
            .await?
            .filter(RepositoryRecord::has_build_recipe)
            .ok_or_else(|| no_build_recipe(repo_id))?;
        let recipe = record.build_recipe.clone().unwrap_or_default();

        // held until the container is registered; dropping it on any error frees the port
        let reservation = self.reserve_port(repo_id, options.port)?;
        let host_port = reservation.port();
        let container_port = exposed_port(&recipe).unwrap_or(host_port);
        let image_name = image_name(repo_id);

        let scratch = ScratchDir::create(&self.config.scratch_dir, "deploy").map_err(|e| {
            PipelineError::new(
                ErrorKind::Internal,
                format!("Cannot create deployment directory: {}", e),
            )
            .at(Stage::Materialize)
            .for_repo(repo_id)
        })?;

        let dir = scratch.path().to_path_buf();
        run_stage(
            self.progress.as_ref(),
            repo_id,
            Stage::Materialize,
            self.config.stage_timeout,
            ErrorKind::Internal,
            async move {
                tokio::task::spawn_blocking(move || materialize(&dir, &record))
                    .await
                    .map_err(|e| PipelineError::new(ErrorKind::Internal, e.to_string()))?
                    .map_err(|e| {
                        PipelineError::new(
                            ErrorKind::Internal,
                            format!("Cannot write deployment files: {}", e),
                        )
                    })
            },
        )
        .await?;

        let runtime = self.runtime.clone();
        let image_id = run_stage(
            self.progress.as_ref(),
            repo_id,
            Stage::Build,
            self.config.stage_timeout,
            ErrorKind::BuildFailed,
            async {
                runtime
                    .build(scratch.path(), &image_name)
                    .await
                    .map_err(|e| runtime_error(e, ErrorKind::BuildFailed))
            },
        )
        .await?;

        // a failed run does not rebuild
        let container_id = run_stage(
            self.progress.as_ref(),
            repo_id,
            Stage::Run,
            self.config.stage_timeout,
            ErrorKind::RunFailed,
            async {
                runtime
                    .run(&image_name, host_port, container_port)
                    .await
                    .map_err(|e| runtime_error(e, ErrorKind::RunFailed))
            },
        )
        .await?;

        if let Err(e) = scratch.close() {
            warn!(repo_id = %repo_id, error = %e, "Deployment directory cleanup failed");
        }

        let now = Utc::now();
        let container = ContainerRecord {
            id: container_id.clone(),
            image_name: image_name.clone(),
            port: host_port,
            status: DeploymentStatus::Running,
            repo_id: repo_id.to_string(),
            created_at: now,
            stopped_at: None,
        };
        self.registry.insert(container.clone());
        drop(reservation);

        let deployment = Deployment {
            deployment_id: Uuid::new_v4().to_string(),
            port: host_port,
            url: self.url_for(repo_id, options.subdomain.as_deref(), host_port),
            container_id: container_id.clone(),
            subdomain: options.subdomain,
            status: DeploymentStatus::Running,
            created_at: now,
            updated_at: now,
        };

        let stored = deployment.clone();
        self.store
            .update(
                repo_id,
                Box::new(move |record| {
                    record.deployment = Some(stored);
                    record.status = RecordStatus::Deployed;
                    record.touch();
                }),
            )
            .await
            .map_err(|e| PipelineError::from(e).at(Stage::Run).for_repo(repo_id))?;

        info!(
            repo_id = %repo_id,
            container_id = %container_id,
            port = host_port,
            url = %deployment.url,
            "Deployment running"
        );

        Ok(DeployOutcome {
            deployment,
            container,
            image_id,
        })
    }

    fn reserve_port(
        &self,
        repo_id: &str,
        requested: Option<u16>,
    ) -> Result<PortReservation, PipelineError> {
        match requested {
            Some(0) => Err(PipelineError::input("port must be between 1 and 65535").for_repo(repo_id)),
            Some(port) => self.registry.reserve(port).ok_or_else(|| {
                PipelineError::input(format!(
                    "Port {} is already used by another deployment",
                    port
                ))
                .for_repo(repo_id)
            }),
            None => self.registry.reserve_any().map_err(|e| {
                PipelineError::new(ErrorKind::RunFailed, format!("Port allocation failed: {}", e))
                    .at(Stage::Run)
                    .for_repo(repo_id)
            }),
        }
    }

    fn url_for(&self, repo_id: &str, subdomain: Option<&str>, port: u16) -> String {
        match &self.config.domain {
            Some(domain) => {
                let host = subdomain
                    .map(str::to_string)
                    .unwrap_or_else(|| dns_label(repo_id));
                format!("https://{}.{}", host, domain)
            }
            None => format!("http://localhost:{}", port),
        }
    }

    /// First stop succeeds; a second stop reports `AlreadyStopped`
    pub async fn stop(&self, container_id: &str) -> Result<ContainerRecord, PipelineError> {
        let container = self
            .registry
            .get(container_id)
            .ok_or_else(|| PipelineError::container_not_found(container_id))?;
        if !container.is_running() {
            return Err(PipelineError::new(
                ErrorKind::AlreadyStopped,
                format!("Container {} is already stopped", container_id),
            )
            .for_container(container_id)
            .for_repo(container.repo_id));
        }

        self.runtime
            .stop(container_id)
            .await
            .map_err(|e| runtime_error(e, ErrorKind::Internal).for_container(container_id))?;

        let stopped = self.registry.mark_stopped(container_id).ok_or_else(|| {
            PipelineError::new(
                ErrorKind::AlreadyStopped,
                format!("Container {} is already stopped", container_id),
            )
            .for_container(container_id)
        })?;

        let id = container_id.to_string();
        let result = self
            .store
            .update(
                &stopped.repo_id,
                Box::new(move |record| {
                    if let Some(deployment) = record
                        .deployment
                        .as_mut()
                        .filter(|d| d.container_id == id)
                    {
                        deployment.status = DeploymentStatus::Stopped;
                        deployment.updated_at = Utc::now();
                        record.touch();
                    }
                }),
            )
            .await;
        if let Err(e) = result {
            debug!(container_id = %container_id, error = %e, "No record to update after stop");
        }

        info!(container_id = %container_id, repo_id = %stopped.repo_id, "Container stopped");
        Ok(stopped)
    }

    pub async fn logs(&self, container_id: &str) -> Result<String, PipelineError> {
        if self.registry.get(container_id).is_none() {
            return Err(PipelineError::container_not_found(container_id));
        }
        self.runtime
            .logs(container_id)
            .await
            .map_err(|e| runtime_error(e, ErrorKind::Internal).for_container(container_id))
    }

    pub fn list(&self, repo_id: Option<&str>) -> Vec<ContainerRecord> {
        self.registry.list(repo_id)
    }
}

fn no_build_recipe(repo_id: &str) -> PipelineError {
    PipelineError::new(
        ErrorKind::NoBuildRecipe,
        format!(
            "Repository {} has no build recipe; run analyze-and-generate first",
            repo_id
        ),
    )
    .for_repo(repo_id)
}

fn runtime_error(err: RuntimeError, kind: ErrorKind) -> PipelineError {
    match err {
        RuntimeError::NotFound(id) => PipelineError::container_not_found(&id),
        other => PipelineError::new(kind, other.to_string()),
    }
}

/// Lowercase DNS label derived from an arbitrary id
fn dns_label(id: &str) -> String {
    let label: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let label = label.trim_matches('-');
    if label.is_empty() {
        "app".to_string()
    } else {
        label.chars().take(63).collect()
    }
}

fn image_name(repo_id: &str) -> String {
    format!("repoforge-{}:latest", dns_label(repo_id))
}

fn validate_subdomain(subdomain: &str) -> Result<(), PipelineError> {
    let valid = !subdomain.is_empty()
        && subdomain.len() <= 63
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-')
        && subdomain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PipelineError::input(format!(
            "subdomain '{}' must be a lowercase DNS label",
            subdomain
        )))
    }
}

/// Names the generated files own at the build-context root
const RESERVED_NAMES: &[&str] = &["Dockerfile", "mcp-tools.json", "DOCUMENTATION.md"];

fn is_reserved(path: &str) -> bool {
    RESERVED_NAMES.contains(&path)
        || path == SERVER_DIR
        || path
            .strip_prefix(SERVER_DIR)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn write_file(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, content)
}

/// Lays out the build context
///
/// Repository files sit at the root, where the recipes `COPY` their manifests
/// from. The recipe, tool catalogue, docs and `mcp-server/` are generated and
/// take precedence over repository files with the same names.
fn materialize(dir: &Path, record: &RepositoryRecord) -> std::io::Result<()> {
    let mut written = 0usize;
    for file in &record.important_files {
        let relative = match validate_relative_path(&file.path) {
            Ok(relative) if !is_reserved(&relative) => relative,
            Ok(relative) => {
                debug!(path = %relative, "Repository file shadowed by generated file");
                continue;
            }
            Err(_) => {
                warn!(path = %file.path, "Skipping file with unsafe path");
                continue;
            }
        };
        write_file(dir, &relative, &file.content)?;
        written += 1;
    }

    let recipe = record.build_recipe.as_deref().unwrap_or_default();
    std::fs::write(dir.join("Dockerfile"), recipe)?;

    let tools = serde_json::to_string_pretty(&record.generated_tools)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(dir.join("mcp-tools.json"), tools)?;

    if !record.documentation.is_empty() {
        std::fs::write(dir.join("DOCUMENTATION.md"), &record.documentation)?;
    }

    let server_dir = dir.join(SERVER_DIR);
    for (path, content) in &record.server_files {
        match validate_relative_path(path) {
            Ok(relative) => write_file(&server_dir, &relative, content)?,
            Err(_) => warn!(path = %path, "Skipping server file with unsafe path"),
        }
    }

    debug!(
        dir = %dir.display(),
        files = written,
        server_files = record.server_files.len(),
        "Deployment context written"
    );
    Ok(())
}
