//! Pipeline context for managing dependencies

use std::sync::Arc;

use crate::analyzer::{RepositoryAnalyzer, StaticAnalyzer};
use crate::archive::{Archiver, TarGzArchiver};
use crate::intelligence::{CodeIntelligence, TemplateIntelligence};
use crate::progress::{LoggingHandler, ProgressHandler};
use crate::store::{MemoryRecordStore, RecordStore};

use super::config::PipelineConfig;

/// Context that owns all long-lived pipeline dependencies
#[derive(Clone)]
pub struct PipelineContext {
    pub archiver: Arc<dyn Archiver>,

    pub analyzer: Arc<dyn RepositoryAnalyzer>,

    /// Ranking and generation backend
    pub intelligence: Arc<dyn CodeIntelligence>,

    /// Shared with the deployment manager
    pub store: Arc<dyn RecordStore>,

    pub progress: Arc<dyn ProgressHandler>,

    pub config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(
        archiver: Arc<dyn Archiver>,
        analyzer: Arc<dyn RepositoryAnalyzer>,
        intelligence: Arc<dyn CodeIntelligence>,
        store: Arc<dyn RecordStore>,
        progress: Arc<dyn ProgressHandler>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            archiver,
            analyzer,
            intelligence,
            store,
            progress,
            config,
        }
    }

    /// Tar.gz archiver, static analyzer and logging progress around the given backends
    pub fn with_defaults(
        intelligence: Arc<dyn CodeIntelligence>,
        store: Arc<dyn RecordStore>,
        config: PipelineConfig,
    ) -> Self {
        Self::new(
            Arc::new(TarGzArchiver::new()),
            Arc::new(StaticAnalyzer::new()),
            intelligence,
            store,
            Arc::new(LoggingHandler),
            config,
        )
    }

    /// Fully offline context: template intelligence over a fresh in-memory store
    pub fn offline(config: PipelineConfig) -> Self {
        Self::with_defaults(
            Arc::new(TemplateIntelligence::new()),
            Arc::new(MemoryRecordStore::new()),
            config,
        )
    }
}
