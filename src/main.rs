use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dumpy::config::{self, ConfigLookup};
use dumpy::managers::logging::{self, LoggingConfig};
use dumpy::managers::DumpManager;
use dumpy::pipeline::StageRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dumpy")]
#[command(about = "Dump databases and post-process the dump files", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to ~/.dumpy.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a database and run its post-processing
    Run {
        /// Database to dump
        #[arg(short = 'D', long, default_value = "db1")]
        database: String,

        /// Dump every configured database
        #[arg(short, long)]
        all_databases: bool,

        /// Print a JSON summary of the run
        #[arg(long)]
        json: bool,
    },

    /// List configured databases
    List,

    /// Show the available post-processing stages
    Stages,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stages doesn't need a config file
    if let Commands::Stages = cli.command {
        logging::init_console_logging(cli.verbose);
        return handle_stages();
    }

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let logging_config = LoggingConfig::from_settings(config.global(), cli.verbose);
    let _log_guard = logging::init_logging(&logging_config)?;

    let manager = DumpManager::new(Arc::new(config));

    match cli.command {
        Commands::Run {
            database,
            all_databases,
            json,
        } => {
            let summary = if all_databases {
                manager.dump_all()
            } else {
                manager.dump(&[database])
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for outcome in &summary.outcomes {
                    match (&outcome.file, &outcome.error) {
                        (Some(file), _) => {
                            println!("✓ {}: {}", outcome.database, file.display())
                        }
                        (None, Some(error)) => println!("✗ {}: {}", outcome.database, error),
                        (None, None) => {}
                    }
                }
            }

            summary.into_result()?;
        }

        Commands::List => {
            let names = manager.databases();
            if names.is_empty() {
                println!("No databases configured");
            }
            for name in names {
                let info = manager.database_info(&name)?;
                println!("  {}", info.name);
                println!("    Type: {}", info.backup_type.as_deref().unwrap_or("(not set)"));
                if info.stages.is_empty() {
                    println!("    Post-processing: (none)");
                } else {
                    println!("    Post-processing: {}", info.stages.join(" -> "));
                }
                println!();
            }
        }

        Commands::Validate => {
            let issues = manager.validate();
            if !issues.is_empty() {
                for issue in &issues {
                    if issue.database.is_empty() {
                        eprintln!("✗ {}", issue.message);
                    } else {
                        eprintln!("✗ {}: {}", issue.database, issue.message);
                    }
                }
                anyhow::bail!("Configuration has {} problem(s)", issues.len());
            }

            println!("Configuration is valid!");
            println!("Databases: {}", manager.databases().len());
        }

        Commands::Stages => handle_stages()?,
    }

    Ok(())
}

fn handle_stages() -> Result<()> {
    let registry = StageRegistry::builtin();

    println!("Aliases:");
    for (alias, reference) in registry.aliases() {
        println!("  {:<20} {}", alias, reference);
    }

    println!();
    println!("Stages:");
    for reference in registry.references() {
        println!("  {}", reference);
    }

    Ok(())
}
