//! Post-processing pipeline
//!
//! A database's `postprocessing` option lists stage identifiers, separated by
//! commas. Each identifier is a short alias (`Bzip`) or a fully-qualified
//! reference (`dumpy.stages.compress.Compress`). The pipeline resolves the
//! whole list through the [`StageRegistry`], then runs the dump file through
//! the stages in exactly the configured order, handing each stage's output to
//! the next.
//!
//! Stages own the file they are given. A stage either returns it unchanged
//! (pass-through) or releases it and returns a new [`DumpFile`], so exactly
//! one handle is live between stages.

mod file;
mod registry;

pub use file::{extension_of, DumpFile, HandleLedger};
pub use registry::{ResolutionError, ResolvedStage, StageRegistry};

use crate::config::{database_section, ConfigError, ConfigLookup, GlobalSettings};
use crate::database::BackupTarget;
use crate::utils::{CommandExecutor, CommandPolicy, ObjectStore, RealExecutor};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration key listing a database's stages
pub const POSTPROCESSING_KEY: &str = "postprocessing";

/// One unit of post-processing
pub trait Stage {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Transform or route the file, returning the file for the next stage
    fn process(&self, file: DumpFile) -> anyhow::Result<DumpFile>;
}

/// Builds a stage for one database
pub type StageFactory =
    Arc<dyn Fn(&StageContext<'_>) -> anyhow::Result<Box<dyn Stage>> + Send + Sync>;

/// Collaborators shared by all stages of a run
#[derive(Clone)]
pub struct StageServices {
    pub executor: Arc<dyn CommandExecutor>,
    pub policy: CommandPolicy,
    /// Injected object store; when unset, upload stages connect to S3 from
    /// their own options
    pub object_store: Option<Arc<dyn ObjectStore>>,
}

impl StageServices {
    pub fn from_settings(settings: &GlobalSettings) -> Self {
        Self {
            executor: Arc::new(RealExecutor::new()),
            policy: CommandPolicy::from_settings(settings),
            object_store: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }
}

/// Everything a stage factory may read while building a stage
pub struct StageContext<'a> {
    pub target: &'a BackupTarget,
    pub config: &'a dyn ConfigLookup,
    pub services: &'a StageServices,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read postprocessing for database '{target}': {source}")]
    Config {
        target: String,
        #[source]
        source: ConfigError,
    },

    #[error("Failed to resolve post-processing stage for database '{target}': {source}")]
    ProcessorResolution {
        target: String,
        #[source]
        source: ResolutionError,
    },

    #[error("{stage} failed for database '{target}': {source:#}")]
    StageExecution {
        stage: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

pub struct Pipeline {
    config: Arc<dyn ConfigLookup>,
    registry: StageRegistry,
    services: StageServices,
}

impl Pipeline {
    pub fn new(config: Arc<dyn ConfigLookup>, registry: StageRegistry, services: StageServices) -> Self {
        Self {
            config,
            registry,
            services,
        }
    }

    /// Configured stage identifiers for a database, in order.
    ///
    /// Read fresh on every call. Blank entries are skipped.
    pub fn stage_spec(&self, target: &BackupTarget) -> Result<Vec<String>, PipelineError> {
        let stages = self
            .config
            .get_string(&database_section(target.name()), POSTPROCESSING_KEY)
            .map_err(|source| PipelineError::Config {
                target: target.to_string(),
                source,
            })?;

        Ok(stages.map(|s| parse_stage_list(&s)).unwrap_or_default())
    }

    /// Resolve every configured stage without running anything
    pub fn resolve(&self, target: &BackupTarget) -> Result<Vec<ResolvedStage>, PipelineError> {
        self.stage_spec(target)?
            .iter()
            .map(|token| {
                self.registry
                    .resolve(token)
                    .map_err(|source| PipelineError::ProcessorResolution {
                        target: target.to_string(),
                        source,
                    })
            })
            .collect()
    }

    /// Instantiate a resolved stage for a database
    pub fn instantiate(
        &self,
        stage: &ResolvedStage,
        target: &BackupTarget,
    ) -> Result<Box<dyn Stage>, PipelineError> {
        let ctx = StageContext {
            target,
            config: self.config.as_ref(),
            services: &self.services,
        };

        stage
            .instantiate(&ctx)
            .map_err(|source| PipelineError::StageExecution {
                stage: stage.name.clone(),
                target: target.to_string(),
                source,
            })
    }

    /// Run `file` through the configured stages.
    ///
    /// With no stages configured the file is returned unchanged. Resolution
    /// errors surface before any stage runs; a failing stage aborts the rest
    /// of the chain.
    pub fn run(&self, target: &BackupTarget, file: DumpFile) -> Result<DumpFile, PipelineError> {
        let stages = self.resolve(target)?;

        if stages.is_empty() {
            debug!("{} - No post-processing configured", target);
            return Ok(file);
        }

        info!(
            "{} - Post-processing with {} stage(s): {}",
            target,
            stages.len(),
            stages
                .iter()
                .map(|s| s.token.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut file = file;
        for resolved in &stages {
            let stage = self.instantiate(resolved, target)?;

            debug!("{} - {} - Processing {}", target, stage.name(), file.path().display());

            file = stage
                .process(file)
                .map_err(|source| PipelineError::StageExecution {
                    stage: stage.name().to_string(),
                    target: target.to_string(),
                    source,
                })?;
        }

        Ok(file)
    }
}

/// Split a comma-separated stage list, trimming whitespace and dropping blanks
pub fn parse_stage_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
