//! Configuration management for repoforge
//!
//! Settings are loaded from environment variables with defaults, then validated.
//!
//! # Environment Variables
//!
//! - `REPOFORGE_WORKSPACE_ROOT`: default workspace for analyze-and-generate - default: current directory
//! - `REPOFORGE_SCRATCH_DIR`: parent of per-run scratch directories - default: temp dir + "repoforge-scratch"
//! - `REPOFORGE_MAX_FILES`: default important-file bound - default: "20"
//! - `REPOFORGE_INTELLIGENCE`: `llm` or `template` - default: "template"
//! - `REPOFORGE_PROVIDER`: ollama|openai|anthropic|gemini|xai|groq - default: "ollama"
//! - `REPOFORGE_MODEL`: model identifier - default: "qwen2.5-coder:7b" for ollama, required otherwise
//! - `REPOFORGE_API_BASE_URL`: custom code-intelligence endpoint
//! - `REPOFORGE_REQUEST_TIMEOUT`: seconds per model request - default: "60"
//! - `REPOFORGE_STAGE_TIMEOUT`: seconds per pipeline stage - default: "120"
//! - `REPOFORGE_RUNTIME`: `stub` or `docker` - default: "stub"
//! - `REPOFORGE_DEPLOY_DOMAIN`: base domain for deployment URLs
//! - `REPOFORGE_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials are read by genai from the provider's own variable
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...). Selecting the `llm` backend for a
//! provider whose variable is unset fails validation.

use crate::deploy::{ContainerRuntime, DeployConfig, DockerRuntime, StubRuntime};
use crate::intelligence::{CodeIntelligence, LlmIntelligence, TemplateIntelligence};
use crate::llm::GenAIClient;
use crate::pipeline::{PipelineConfig, DEFAULT_MAX_FILES};
use crate::tools::implementations::MAX_FILES_LIMIT;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Provider {provider} requires {env_var} to be set; no default credential exists")]
    MissingCredential {
        provider: String,
        env_var: &'static str,
    },

    #[error("REPOFORGE_MODEL is required for provider {0}")]
    MissingModel(String),

    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelligenceMode {
    Llm,
    Template,
}

impl fmt::Display for IntelligenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntelligenceMode::Llm => f.write_str("llm"),
            IntelligenceMode::Template => f.write_str("template"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Stub,
    Docker,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Stub => f.write_str("stub"),
            RuntimeKind::Docker => f.write_str("docker"),
        }
    }
}

pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "ollama" => Ok(AdapterKind::Ollama),
        "openai" => Ok(AdapterKind::OpenAI),
        "anthropic" | "claude" => Ok(AdapterKind::Anthropic),
        "gemini" => Ok(AdapterKind::Gemini),
        "xai" | "grok" => Ok(AdapterKind::Xai),
        "groq" => Ok(AdapterKind::Groq),
        other => Err(ConfigError::InvalidProvider(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ForgeConfig {
    pub workspace_root: PathBuf,
    pub scratch_dir: PathBuf,
    pub max_files: usize,
    pub intelligence: IntelligenceMode,
    pub provider: AdapterKind,
    /// `None` only when the provider has no default model
    pub model: Option<String>,
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub stage_timeout_secs: u64,
    pub runtime: RuntimeKind,
    pub deploy_domain: Option<String>,
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            workspace_root: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            scratch_dir: env::temp_dir().join("repoforge-scratch"),
            max_files: DEFAULT_MAX_FILES,
            intelligence: IntelligenceMode::Template,
            provider: AdapterKind::Ollama,
            model: Some(DEFAULT_OLLAMA_MODEL.to_string()),
            api_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            runtime: RuntimeKind::Stub,
            deploy_domain: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
            field: key.to_string(),
            error: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl ForgeConfig {
    /// Defaults overlaid with `REPOFORGE_*` variables; unparseable values are errors
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let provider = match var("REPOFORGE_PROVIDER") {
            Some(name) => parse_provider(&name)?,
            None => defaults.provider,
        };

        let model = var("REPOFORGE_MODEL").or_else(|| match provider {
            AdapterKind::Ollama => Some(DEFAULT_OLLAMA_MODEL.to_string()),
            _ => None,
        });

        let intelligence = match var("REPOFORGE_INTELLIGENCE").map(|v| v.to_lowercase()) {
            None => defaults.intelligence,
            Some(v) if v == "llm" => IntelligenceMode::Llm,
            Some(v) if v == "template" => IntelligenceMode::Template,
            Some(other) => {
                return Err(ConfigError::ParseError {
                    field: "REPOFORGE_INTELLIGENCE".to_string(),
                    error: format!("expected llm or template, got {}", other),
                })
            }
        };

        let runtime = match var("REPOFORGE_RUNTIME").map(|v| v.to_lowercase()) {
            None => defaults.runtime,
            Some(v) if v == "stub" => RuntimeKind::Stub,
            Some(v) if v == "docker" => RuntimeKind::Docker,
            Some(other) => {
                return Err(ConfigError::ParseError {
                    field: "REPOFORGE_RUNTIME".to_string(),
                    error: format!("expected stub or docker, got {}", other),
                })
            }
        };

        let log_json = var("REPOFORGE_LOG_JSON");
        if let Some(raw) = &log_json {
            raw.parse::<bool>().map_err(|e| ConfigError::ParseError {
                field: "REPOFORGE_LOG_JSON".to_string(),
                error: e.to_string(),
            })?;
        }

        Ok(Self {
            workspace_root: var("REPOFORGE_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            scratch_dir: var("REPOFORGE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            max_files: parse_number("REPOFORGE_MAX_FILES", defaults.max_files)?,
            intelligence,
            provider,
            model,
            api_base_url: var("REPOFORGE_API_BASE_URL"),
            request_timeout_secs: parse_number(
                "REPOFORGE_REQUEST_TIMEOUT",
                defaults.request_timeout_secs,
            )?,
            stage_timeout_secs: parse_number("REPOFORGE_STAGE_TIMEOUT", defaults.stage_timeout_secs)?,
            runtime,
            deploy_domain: var("REPOFORGE_DEPLOY_DOMAIN"),
            log_level: var("REPOFORGE_LOG_LEVEL")
                .unwrap_or(defaults.log_level)
                .to_lowercase(),
        })
    }

    /// Environment variable holding the provider's credential, if it needs one
    pub fn credential_env(&self) -> Option<&'static str> {
        self.provider.default_key_env_name()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_files > MAX_FILES_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max files cannot exceed {}",
                MAX_FILES_LIMIT
            )));
        }

        for (name, secs) in [
            ("Request timeout", self.request_timeout_secs),
            ("Stage timeout", self.stage_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.intelligence == IntelligenceMode::Llm {
            if self.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
                return Err(ConfigError::MissingModel(self.provider.as_str().to_string()));
            }
            if let Some(env_var) = self.credential_env() {
                if var(env_var).is_none() {
                    return Err(ConfigError::MissingCredential {
                        provider: self.provider.as_str().to_string(),
                        env_var,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_max_files(self.max_files)
            .with_stage_timeout(self.stage_timeout())
            .with_request_timeout(self.request_timeout())
            .with_scratch_dir(self.scratch_dir.clone())
    }

    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig::from_pipeline(&self.pipeline_config()).with_domain(self.deploy_domain.clone())
    }

    /// Builds the configured code-intelligence backend; validates first
    pub fn create_intelligence(&self) -> Result<Arc<dyn CodeIntelligence>, ConfigError> {
        self.validate()?;
        match self.intelligence {
            IntelligenceMode::Template => Ok(Arc::new(TemplateIntelligence::new())),
            IntelligenceMode::Llm => {
                let model = self
                    .model
                    .clone()
                    .ok_or_else(|| ConfigError::MissingModel(self.provider.as_str().to_string()))?;
                let client = GenAIClient::new(
                    self.provider,
                    model,
                    self.api_base_url.clone(),
                    self.request_timeout(),
                );
                Ok(Arc::new(LlmIntelligence::new(Arc::new(client))))
            }
        }
    }

    pub fn create_runtime(&self) -> Result<Arc<dyn ContainerRuntime>, ConfigError> {
        match self.runtime {
            RuntimeKind::Stub => Ok(Arc::new(StubRuntime::new())),
            RuntimeKind::Docker => DockerRuntime::connect()
                .map(|runtime| Arc::new(runtime) as Arc<dyn ContainerRuntime>)
                .map_err(|e| ConfigError::RuntimeUnavailable(e.to_string())),
        }
    }

    /// Secret-free view for health output
    pub fn to_display_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();

        map.insert(
            "workspace_root".to_string(),
            self.workspace_root.display().to_string(),
        );
        map.insert("scratch_dir".to_string(), self.scratch_dir.display().to_string());
        map.insert("max_files".to_string(), self.max_files.to_string());
        map.insert("intelligence".to_string(), self.intelligence.to_string());
        map.insert("provider".to_string(), self.provider.as_str().to_string());
        if let Some(model) = &self.model {
            map.insert("model".to_string(), model.clone());
        }
        if let Some(url) = &self.api_base_url {
            map.insert("api_base_url".to_string(), url.clone());
        }
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "stage_timeout_secs".to_string(),
            self.stage_timeout_secs.to_string(),
        );
        map.insert("runtime".to_string(), self.runtime.to_string());
        if let Some(domain) = &self.deploy_domain {
            map.insert("deploy_domain".to_string(), domain.clone());
        }
        if let Some(env_var) = self.credential_env() {
            let state = if var(env_var).is_some() { "set" } else { "missing" };
            map.insert("credential".to_string(), format!("{} ({})", env_var, state));
        }
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for ForgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repoforge Configuration:")?;
        writeln!(f, "  Workspace Root: {}", self.workspace_root.display())?;
        writeln!(f, "  Scratch Dir: {}", self.scratch_dir.display())?;
        writeln!(f, "  Max Files: {}", self.max_files)?;
        writeln!(f, "  Intelligence: {}", self.intelligence)?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model.as_deref().unwrap_or("(unset)"))?;
        if let Some(url) = &self.api_base_url {
            writeln!(f, "  API Base URL: {}", url)?;
        }
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Stage Timeout: {}s", self.stage_timeout_secs)?;
        writeln!(f, "  Runtime: {}", self.runtime)?;
        if let Some(domain) = &self.deploy_domain {
            writeln!(f, "  Deploy Domain: {}", domain)?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
