//! Error kinds surfaced across the tool boundary

use crate::analyzer::AnalyzerError;
use crate::archive::ArchiveError;
use crate::intelligence::IntelligenceError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline and deployment stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Archive,
    Extract,
    Analyze,
    Select,
    Persist,
    Generate,
    Cleanup,
    Materialize,
    Build,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Archive => "archive",
            Stage::Extract => "extract",
            Stage::Analyze => "analyze",
            Stage::Select => "select",
            Stage::Persist => "persist",
            Stage::Generate => "generate",
            Stage::Cleanup => "cleanup",
            Stage::Materialize => "materialize",
            Stage::Build => "build",
            Stage::Run => "run",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InputValidation,
    ArchiveFailed,
    ExtractionFailed,
    AnalysisFailed,
    GenerationFailed,
    RecordNotFound,
    NoBuildRecipe,
    BuildFailed,
    RunFailed,
    Busy,
    AlreadyStopped,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputValidation => "InputValidation",
            ErrorKind::ArchiveFailed => "ArchiveFailed",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::AnalysisFailed => "AnalysisFailed",
            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::RecordNotFound => "RecordNotFound",
            ErrorKind::NoBuildRecipe => "NoBuildRecipe",
            ErrorKind::BuildFailed => "BuildFailed",
            ErrorKind::RunFailed => "RunFailed",
            ErrorKind::Busy => "Busy",
            ErrorKind::AlreadyStopped => "AlreadyStopped",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of one externally invoked operation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub stage: Option<Stage>,
    pub repo_id: Option<String>,
    pub container_id: Option<String>,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage: None,
            repo_id: None,
            container_id: None,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputValidation, message)
    }

    pub fn busy(repo_id: &str) -> Self {
        Self::new(
            ErrorKind::Busy,
            format!("Repository {} has an operation in progress", repo_id),
        )
        .for_repo(repo_id)
    }

    pub fn record_not_found(repo_id: &str) -> Self {
        Self::new(
            ErrorKind::RecordNotFound,
            format!("Repository {} not found", repo_id),
        )
        .for_repo(repo_id)
    }

    pub fn container_not_found(container_id: &str) -> Self {
        Self::new(
            ErrorKind::RecordNotFound,
            format!("Container {} not found", container_id),
        )
        .for_container(container_id)
    }

    pub fn at(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn for_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = Some(repo_id.into());
        self
    }

    pub fn for_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn timed_out(kind: ErrorKind, stage: Stage, seconds: u64) -> Self {
        Self::new(kind, format!("{} stage timed out after {}s", stage, seconds)).at(stage)
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        PipelineError::new(ErrorKind::ArchiveFailed, err.to_string()).at(Stage::Archive)
    }
}

impl From<AnalyzerError> for PipelineError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::ExtractionFailed(_) => {
                PipelineError::new(ErrorKind::ExtractionFailed, err.to_string()).at(Stage::Extract)
            }
            AnalyzerError::AnalysisFailed { .. } => {
                PipelineError::new(ErrorKind::AnalysisFailed, err.to_string()).at(Stage::Analyze)
            }
            AnalyzerError::InvalidPath { .. } => PipelineError::input(err.to_string()),
        }
    }
}

impl From<IntelligenceError> for PipelineError {
    fn from(err: IntelligenceError) -> Self {
        PipelineError::new(ErrorKind::GenerationFailed, err.to_string()).at(Stage::Generate)
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => PipelineError::record_not_found(&id),
            StoreError::Unavailable(_) => {
                PipelineError::new(ErrorKind::Internal, err.to_string()).at(Stage::Persist)
            }
        }
    }
}
