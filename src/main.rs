use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use shipwright::commands::{self, context_map};
use shipwright::config::ToolConfig;
use shipwright::error::{
    ErrorDetails, ErrorHandler, ErrorKind, ErrorRecord, MessageFormatter,
};
use shipwright::logging::{init_logging, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(version)]
#[command(about = "Build and publish hardened container images for web application runtimes")]
struct Cli {
    /// Path to the configuration file [default: shipwright.toml]
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Disable colors (also respects the NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a hardened image from a build context
    Build {
        /// Build context directory
        #[arg(long, default_value = ".")]
        context: PathBuf,

        /// Override the configured tag
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Push the built image to the configured registry
    Push {
        /// Override the configured registry
        #[arg(long, short)]
        registry: Option<String>,

        /// Override the configured tag
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Create a multi-arch manifest list in the registry
    Manifest {
        /// Override the configured tag
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Run a local smoke test against the built image
    Test {
        /// Override the configured tag
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Generate a hardened Dockerfile for the configured runtime
    Generate {
        /// Output path for the Dockerfile
        #[arg(long, short, default_value = "Dockerfile")]
        output: PathBuf,
    },
}

impl Commands {
    /// The operation name used in error context maps.
    fn operation(&self) -> &'static str {
        match self {
            Commands::Build { .. } => "build",
            Commands::Push { .. } => "push",
            Commands::Manifest { .. } => "manifest",
            Commands::Test { .. } => "test",
            Commands::Generate { .. } => "generate",
        }
    }

    /// Folds CLI overrides into the loaded configuration.
    fn apply_overrides(&self, config: &mut ToolConfig) {
        match self {
            Commands::Build { tag, .. }
            | Commands::Manifest { tag }
            | Commands::Test { tag } => {
                if let Some(tag) = tag {
                    config.tag = tag.clone();
                }
            }
            Commands::Push { registry, tag } => {
                if let Some(registry) = registry {
                    config.registry = Some(registry.clone());
                }
                if let Some(tag) = tag {
                    config.tag = tag.clone();
                }
            }
            Commands::Generate { .. } => {}
        }
    }

    async fn run(&self, config: &ToolConfig) -> Result<(), ErrorRecord> {
        match self {
            Commands::Build { context, .. } => commands::build::run(config, context).await,
            Commands::Push { .. } => commands::push::run(config).await,
            Commands::Manifest { .. } => commands::manifest::run(config).await,
            Commands::Test { .. } => commands::test::run(config).await,
            Commands::Generate { output } => commands::generate::run(config, output).await,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Error
    } else {
        LogLevel::from_verbosity(cli.verbose)
    };
    init_logging(level);

    let use_color = !cli.no_color && std::env::var("NO_COLOR").is_err();

    let mut config = match ToolConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            // Configuration failures go through the same engine as everything
            // else, with a default-configured handler.
            let mut handler = ErrorHandler::new(Default::default())
                .with_formatter(MessageFormatter::new().with_color(use_color));
            let record = ErrorRecord::new(ErrorKind::ConfigLoad, err.to_string())
                .with_details(ErrorDetails {
                    path: cli
                        .config
                        .as_ref()
                        .map(|p| p.display().to_string()),
                    ..ErrorDetails::default()
                })
                .with_suggestion("Create shipwright.toml or pass --config with a valid file");
            let _ = handler.handle(record, None).await;
            return ExitCode::from(1);
        }
    };
    cli.command.apply_overrides(&mut config);

    let mut handler = ErrorHandler::new(config.errors.to_handler_config())
        .with_formatter(MessageFormatter::new().with_color(use_color));

    let operation = cli.command.operation();
    // Recovery only waits; retrying the command is this caller's job, bounded
    // by its own retry budget since every occurrence gets a fresh identity.
    let max_attempts = config.errors.max_retries.saturating_add(1);
    let mut last_failure = None;
    for _ in 0..max_attempts {
        match cli.command.run(&config).await {
            Ok(()) => return ExitCode::SUCCESS,
            Err(record) => {
                let context = context_map(operation, &config);
                match handler.handle(record, Some(context)).await {
                    // The recovery delay elapsed; try our call again.
                    Ok(()) => continue,
                    Err(record) => {
                        last_failure = Some(record);
                        break;
                    }
                }
            }
        }
    }

    if let Some(record) = last_failure {
        tracing::error!(kind = %record.kind, operation, "command failed: {record}");
    } else {
        tracing::error!(operation, "command failed after exhausting retries");
    }
    if cli.verbose > 0 {
        let stats = handler.statistics();
        if let Ok(json) = serde_json::to_string_pretty(&stats) {
            tracing::info!("error statistics for this run:\n{json}");
        }
    }
    ExitCode::from(1)
}
