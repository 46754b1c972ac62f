mod ask;
mod embed;
mod ingest;
mod report;

use std::path::PathBuf;

use anyhow::Context;
use artintel_core::AppConfig;
use artintel_db::PoolConfig;
use artintel_llm::OllamaClient;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "artintel")]
#[command(about = "Article impact metrics, embeddings and summaries")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import articles from a CSV export
    Import {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// Generate embeddings for comments that do not have one yet
    Embed {
        /// Rows fetched per batch
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(i64).range(1..))]
        batch_size: i64,
        /// Stop after storing this many embeddings
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show embedding coverage
    Status,
    /// Find the comments closest to a free-text query
    Similar {
        query: String,
        /// Number of results
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(i64).range(1..))]
        k: i64,
    },
    /// Print the impact metrics report as JSON
    Aggregate,
    /// Print a natural-language summary of the impact metrics
    Summarise,
    /// Ingest (optional), aggregate and summarise in one run
    Report {
        /// CSV to ingest first; defaults to ARTICLES_CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Answer a question by running model-written read-only SQL
    Ask {
        question: String,
        /// Run the generated query without asking for confirmation
        #[arg(long)]
        yes: bool,
        /// Maximum rows returned to the model
        #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(i64).range(1..))]
        max_rows: i64,
    },
    /// Migrate, import ARTICLES_CSV, embed pending comments and show status
    Bootstrap,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_bootstrap(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let csv = config
        .articles_csv
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("ARTICLES_CSV is not set; cannot bootstrap"))?;

    ingest::run_import(pool, csv).await?;

    let client = OllamaClient::new(config).context("failed to build model client")?;
    let stored = embed::embed_pending(pool, &client, 50, config.auto_embed_limit).await?;
    println!("stored {stored} embeddings");

    embed::run_status(pool).await
}

async fn run(command: Commands, config: &AppConfig, pool: &sqlx::PgPool) -> anyhow::Result<()> {
    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            artintel_db::ping(pool).await.context("database ping failed")?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = artintel_db::run_migrations(pool)
                .await
                .context("failed to run migrations")?;
            println!("applied {applied} migration(s)");
        }
        Commands::Import { path } => ingest::run_import(pool, &path).await?,
        Commands::Embed { batch_size, limit } => {
            embed::run_embed(pool, config, batch_size, limit).await?;
        }
        Commands::Status => embed::run_status(pool).await?,
        Commands::Similar { query, k } => embed::run_similar(pool, config, &query, k).await?,
        Commands::Aggregate => report::run_aggregate(pool, config).await?,
        Commands::Summarise => report::run_summarise(pool, config).await?,
        Commands::Report { csv } => report::run_report(pool, config, csv.as_deref()).await?,
        Commands::Ask {
            question,
            yes,
            max_rows,
        } => ask::run_ask(pool, config, &question, yes, max_rows).await?,
        Commands::Bootstrap => run_bootstrap(pool, config).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = artintel_core::load_app_config().context("failed to load configuration")?;
    init_tracing(&config.log_level);
    tracing::debug!(env = %config.env, "configuration loaded");

    // The pool connects on first use so an unreachable database is reported
    // by the command that needed it.
    let pool = artintel_db::connect_pool_lazy(
        &config.database_url,
        PoolConfig::from_app_config(&config),
    )
    .context("invalid DATABASE_URL")?;

    let result = run(command, &config, &pool).await;
    pool.close().await;
    result
}

#[cfg(test)]
mod tests;
