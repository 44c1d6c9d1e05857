use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::index::{AssetIndex, DEFAULT_SIMILAR_LIMIT, SeaOrmAssetIndex};
use server::kind::AssetKind;
use server::sync::SyncJob;

#[derive(Parser)]
#[command(name = "pantry", version, about = "Pantry image cache tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical key for a label
    Normalize {
        label: String,
        /// Truncate the key to at most this many characters
        #[arg(long)]
        max_len: Option<usize>,
    },
    /// Index shared-pool blobs that have no row yet
    Sync,
    /// Look up an asset by name
    Lookup { name: String },
    /// Search assets whose name contains the query
    Search {
        query: String,
        #[arg(long)]
        kind: Option<AssetKind>,
        #[arg(long, default_value_t = DEFAULT_SIMILAR_LIMIT)]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { label, max_len } => {
            let key = match max_len {
                Some(max) => common::normalize_bounded(&label, max),
                None => common::normalize(&label),
            };
            if key.is_empty() {
                anyhow::bail!("'{label}' has no usable characters");
            }
            println!("{key}");
        }
        Command::Sync => {
            let config = AppConfig::load().context("Failed to load config")?;
            let index = open_index(&config).await?;
            let blobs = common::storage::open_store(&config.storage)
                .await
                .context("Failed to open blob store")?;

            let job = SyncJob::new(
                blobs,
                index,
                config.assets.shared_pools(),
                config.assets.key_rules(),
            );
            let report = job.sync_all().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed > 0 {
                anyhow::bail!("{} blob(s) could not be indexed", report.failed);
            }
        }
        Command::Lookup { name } => {
            let config = AppConfig::load().context("Failed to load config")?;
            let index = open_index(&config).await?;

            match index.find_exact(&name).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => anyhow::bail!("No asset named '{name}'"),
            }
        }
        Command::Search { query, kind, limit } => {
            let config = AppConfig::load().context("Failed to load config")?;
            let index = open_index(&config).await?;

            let records = index.find_similar(&query, kind, limit.clamp(1, 100)).await?;
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    record.canonical_name, record.kind, record.public_url
                );
            }
        }
    }

    Ok(())
}

async fn open_index(config: &AppConfig) -> anyhow::Result<Arc<dyn AssetIndex>> {
    let db = server::database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    Ok(Arc::new(SeaOrmAssetIndex::new(db)))
}
