use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timeline_pager_config::RuntimeConfig;
use timeline_pager_core::{EntryKind, TimelineFilters, TimelineSlice};

mod commands;
mod init;

/// Replay viewport requests against a sparse timeline cache
#[derive(Parser)]
#[command(name = "timeline-pager")]
#[command(version)]
#[command(about = "Replay viewport requests against a sparse timeline cache", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply viewports in order and print one JSON report per viewport
    Replay {
        #[command(flatten)]
        fixture: FixtureArgs,

        /// Viewport as START:END (inclusive); repeatable
        #[arg(
            long = "viewport",
            value_name = "START:END",
            required = true,
            allow_hyphen_values = true
        )]
        viewports: Vec<TimelineSlice>,

        /// Entries per page (overrides config file)
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
    },
    /// Print the timeline distribution and total count
    Summary {
        #[command(flatten)]
        fixture: FixtureArgs,
    },
}

#[derive(clap::Args)]
struct FixtureArgs {
    /// JSON fixture of timeline entries (falls back to source.fixture)
    #[arg(long, value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Earliest date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Latest date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,

    /// Entry kind to include (image, video); repeatable
    #[arg(long = "kind", value_name = "KIND")]
    kinds: Vec<EntryKind>,
}

impl FixtureArgs {
    fn filters(&self) -> TimelineFilters {
        TimelineFilters {
            start_date: self.from,
            end_date: self.to,
            kinds: self.kinds.clone(),
        }
    }

    fn resolve(&self, config: &RuntimeConfig) -> Result<PathBuf> {
        self.fixture
            .clone()
            .or_else(|| config.source.fixture.as_ref().map(PathBuf::from))
            .context("No fixture given: pass --fixture or set source.fixture")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli)?;

    init::init_tracing(&config);

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Command::Replay {
            fixture, viewports, ..
        } => {
            let path = fixture.resolve(&config)?;
            commands::replay(&config, &path, fixture.filters(), viewports, &mut stdout).await
        }
        Command::Summary { fixture } => {
            let path = fixture.resolve(&config)?;
            commands::summary(&config, &path, fixture.filters(), &mut stdout).await
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) -> Result<()> {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    if let Command::Replay {
        page_size: Some(page_size),
        ..
    } = &cli.command
    {
        config.source.page_size = *page_size;
    }

    config
        .validate()
        .context("Invalid configuration after CLI overrides")
}
