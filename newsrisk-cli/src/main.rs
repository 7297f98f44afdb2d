use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use newsrisk_cli::commands::{self, QueryArgs};
use newsrisk_common::logging::init_logging;
use newsrisk_common::Config;
use newsrisk_ingest::SourceKind;

/// Vendor risk-news pipeline.
#[derive(Parser, Debug)]
#[command(name = "newsrisk")]
#[command(version)]
#[command(about = "Collect, merge, risk-tag and query vendor news.", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.newsrisk/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Gnews,
    Rss,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Gnews => SourceKind::GNews,
            SourceArg::Rss => SourceKind::Rss,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect raw articles from one news source
    Ingest {
        #[arg(value_enum)]
        source: SourceArg,
    },

    /// Merge the configured sources into the canonical file
    Merge,

    /// Classify the merged file and write the tagged store
    Classify,

    /// Merge, classify and write the tagged store in one run
    Run,

    /// Filter the tagged store
    Query {
        /// Keep only these vendors (repeatable)
        #[arg(long = "vendor")]
        vendors: Vec<String>,

        /// Keep articles carrying any of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only articles from the last N days (1-30)
        #[arg(long)]
        days: Option<u32>,

        /// Only articles published at or after this RFC 3339 time
        #[arg(long, conflicts_with = "days")]
        since: Option<String>,

        /// Only articles that need review
        #[arg(long)]
        review_only: bool,

        /// Also write the matches as CSV in the store schema
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Serve the read-only dashboard API
    Serve {
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the classifier backend and label vocabulary
    Labels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_and_validate(cli.config.as_deref())?;
    init_logging(&config.observability.log_level, &config.observability.log_format);

    match cli.command {
        Commands::Ingest { source } => commands::run_ingest(&config, source.into()).await,
        Commands::Merge => commands::run_merge(&config).await,
        Commands::Classify => commands::run_classify(&config).await,
        Commands::Run => commands::run_pipeline(&config).await,
        Commands::Query {
            vendors,
            tags,
            days,
            since,
            review_only,
            export,
        } => {
            let args = QueryArgs {
                vendors,
                tags,
                days,
                since,
                review_only,
                export,
            };
            print!("{}", commands::run_query(&config, &args, chrono::Utc::now())?);
            Ok(())
        }
        Commands::Serve { bind, port } => newsrisk_cli::serve(&config, bind, port).await,
        Commands::Labels => {
            print!("{}", commands::labels_report(&config)?);
            Ok(())
        }
    }
}
