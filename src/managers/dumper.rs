//! Dump manager - runs the backup and post-processing of each database

use crate::config::{database_names, ConfigLookup};
use crate::database::{BackupSource, BackupTarget, DatabaseBackup, DatabaseType};
use crate::pipeline::{Pipeline, StageRegistry, StageServices};
use crate::utils::locker::with_database_lock;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Result of dumping one database
#[derive(Debug, Clone, Serialize)]
pub struct DumpOutcome {
    pub database: String,
    /// Final file left on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl DumpOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of a multi-database run, in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct DumpSummary {
    pub outcomes: Vec<DumpOutcome>,
}

impl DumpSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> Vec<&DumpOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    /// Error listing every failed database, if any failed
    pub fn into_result(self) -> Result<Self> {
        let failed = self.failed();
        if !failed.is_empty() {
            anyhow::bail!(
                "{} database(s) failed to dump:\n{}",
                failed.len(),
                failed
                    .iter()
                    .map(|o| format!("{}: {}", o.database, o.error.as_deref().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
        Ok(self)
    }
}

/// Configured settings of one database, as shown by `list`
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub backup_type: Option<String>,
    pub stages: Vec<String>,
}

/// A problem found by [`DumpManager::validate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub database: String,
    pub message: String,
}

pub struct DumpManager {
    config: Arc<dyn ConfigLookup>,
    source: Box<dyn BackupSource>,
    pipeline: Pipeline,
    lock_dir: PathBuf,
}

impl DumpManager {
    /// Manager using the real dump tools and the built-in stages
    pub fn new(config: Arc<dyn ConfigLookup>) -> Self {
        let services = StageServices::from_settings(config.global());
        Self::with_services(config, StageRegistry::builtin(), services)
    }

    /// Manager with explicit stages and collaborators; the dump commands run
    /// through `services.executor` as well
    pub fn with_services(
        config: Arc<dyn ConfigLookup>,
        registry: StageRegistry,
        services: StageServices,
    ) -> Self {
        let source = DatabaseBackup::new(Arc::clone(&config), Arc::clone(&services.executor));
        let lock_dir = config.global().lock_directory();

        Self {
            pipeline: Pipeline::new(Arc::clone(&config), registry, services),
            source: Box::new(source),
            config,
            lock_dir,
        }
    }

    /// Replace the backup source
    pub fn with_source(mut self, source: Box<dyn BackupSource>) -> Self {
        self.source = source;
        self
    }

    /// Names of all configured databases, sorted
    pub fn databases(&self) -> Vec<String> {
        database_names(self.config.as_ref())
    }

    pub fn database_info(&self, name: &str) -> Result<DatabaseInfo> {
        let target = BackupTarget::new(name);
        Ok(DatabaseInfo {
            name: name.to_string(),
            backup_type: self.config.get_string(&target.section(), "type")?,
            stages: self.pipeline.stage_spec(&target)?,
        })
    }

    /// Dump one database and run its post-processing.
    ///
    /// Returns the path of the final file, which is left on disk.
    pub fn dump_database(&self, name: &str) -> Result<PathBuf> {
        let target = BackupTarget::new(name);

        with_database_lock(&self.lock_dir, name, || {
            info!("{} - Starting dump", target);

            let file = self.source.backup(&target)?;
            let file = self.pipeline.run(&target, file)?;

            info!("{} - Finished, final file {}", target, file.path().display());
            Ok(file.into_path())
        })
    }

    /// Dump each database in turn.
    ///
    /// A failure stops that database's chain only; the rest still run.
    pub fn dump(&self, names: &[String]) -> DumpSummary {
        if names.is_empty() {
            warn!("No databases to dump");
        }

        let mut summary = DumpSummary::default();

        for name in names {
            let start = Instant::now();
            let result = self.dump_database(name);
            let duration_secs = start.elapsed().as_secs_f64();

            let outcome = match result {
                Ok(file) => DumpOutcome {
                    database: name.clone(),
                    file: Some(file),
                    error: None,
                    duration_secs,
                },
                Err(e) => {
                    error!("Failed to dump database '{}': {:#}", name, e);
                    DumpOutcome {
                        database: name.clone(),
                        file: None,
                        error: Some(format!("{:#}", e)),
                        duration_secs,
                    }
                }
            };
            summary.outcomes.push(outcome);
        }

        info!(
            "Dump summary: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed().len()
        );

        summary
    }

    /// Dump every configured database
    pub fn dump_all(&self) -> DumpSummary {
        let names = self.databases();
        info!("Found {} configured databases", names.len());
        self.dump(&names)
    }

    /// Check every database's backup type and post-processing stages
    /// without dumping anything
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let names = self.databases();
        if names.is_empty() {
            return vec![ValidationIssue {
                database: String::new(),
                message: "No [database.<name>] sections configured".to_string(),
            }];
        }

        let mut issues = Vec::new();
        for name in &names {
            let target = BackupTarget::new(name);
            let mut issue = |message: String| {
                issues.push(ValidationIssue {
                    database: name.clone(),
                    message,
                })
            };

            match self.config.get_string(&target.section(), "type") {
                Ok(Some(t)) if DatabaseType::from_name(&t).is_some() => {}
                Ok(Some(t)) => issue(format!("Unsupported backup type '{}'", t)),
                Ok(None) => issue("No backup type configured".to_string()),
                Err(e) => issue(e.to_string()),
            }

            match self.pipeline.resolve(&target) {
                Ok(stages) => {
                    for stage in &stages {
                        if let Err(e) = self.pipeline.instantiate(stage, &target) {
                            issue(e.to_string());
                        }
                    }
                }
                Err(e) => issue(e.to_string()),
            }
        }

        issues
    }
}
