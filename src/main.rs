use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tag_genius::config::{self, AppConfig, FileConfig};
use tag_genius::enrichment::build_enrichment;
use tag_genius::{export_library, Pipeline, SqliteTrackStore, TagGenerator, TrackStore};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path))
}

fn parse_file(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.is_file() {
        return Err(format!("File does not exist: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
#[command(version, about = "Tag a DJ library with generated descriptive tags")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_file)]
    pub config: Option<PathBuf>,

    /// Path to the track database. Defaults to tag_genius.db.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// URL of the enrichment lookup endpoint.
    #[clap(long)]
    pub enrichment_url: Option<String>,

    /// Do not query the enrichment service.
    #[clap(long)]
    pub no_enrichment: bool,

    /// Tag limit for this run only; the stored setting is left unchanged.
    #[clap(long)]
    pub tag_limit: Option<u32>,

    /// Number of tracks enriched and tagged concurrently.
    #[clap(long)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a library file, tagging every new track.
    Import {
        #[clap(value_parser = parse_file)]
        file: PathBuf,
    },
    /// Write the stored library, with generated tags merged in, to a file.
    Export {
        #[clap(value_parser = parse_path)]
        out: PathBuf,
    },
    /// Show the stored tag limit, or store a new one.
    TagLimit { value: Option<u32> },
    /// Regenerate tags for one track, or for every track.
    Retag {
        #[clap(long)]
        id: Option<i64>,
    },
    /// Remove generated tags from one track, or from every track.
    ClearTags {
        #[clap(long)]
        id: Option<i64>,
    },
    /// List stored tracks.
    List,
    /// Delete a stored track.
    Delete { id: i64 },
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_path: args.db.clone(),
            enrichment_url: args.enrichment_url.clone(),
            no_enrichment: args.no_enrichment,
            tag_limit: args.tag_limit,
            concurrency: args.concurrency,
        }
    }
}

fn build_pipeline(app_config: &AppConfig, store: Arc<SqliteTrackStore>) -> Result<Pipeline> {
    let enrichment = build_enrichment(&app_config.enrichment, &app_config.pipeline)?;
    let generator = TagGenerator::from_settings(&app_config.generation, &app_config.pipeline);
    Ok(Pipeline::new(
        store,
        enrichment,
        generator,
        app_config.pipeline.concurrency,
    ))
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = config::CliConfig::from(&cli_args);
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    let store = Arc::new(SqliteTrackStore::new(&app_config.db_path)?);

    match cli_args.command {
        Command::Import { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read library file {:?}", file))?;
            let pipeline = build_pipeline(&app_config, store)?;
            let tagging = pipeline.tagging_config(&app_config.tagging)?;
            let report = pipeline.import_library(&bytes, &tagging).await?;
            println!("Import complete: {}", report);
        }
        Command::Export { out } => {
            let outcome = export_library(store.as_ref())?;
            tokio::fs::write(&out, outcome.xml.as_bytes())
                .await
                .with_context(|| format!("Failed to write export file {:?}", out))?;
            println!(
                "Exported {} tracks to {:?} ({} skipped)",
                outcome.exported, out, outcome.skipped
            );
        }
        Command::TagLimit { value: Some(limit) } => {
            store.set_tag_limit(limit)?;
            println!("Tag limit set to {}", limit);
        }
        Command::TagLimit { value: None } => {
            println!("Tag limit: {}", store.get_tag_limit()?);
        }
        Command::Retag { id } => {
            let pipeline = build_pipeline(&app_config, store)?;
            let tagging = pipeline.tagging_config(&app_config.tagging)?;
            let report = pipeline.retag(id, &tagging).await?;
            println!("Retag complete: {}", report);
        }
        Command::ClearTags { id } => {
            let cleared = store.clear_generated_tags(id)?;
            if let (Some(id), 0) = (id, cleared) {
                bail!("Track {} not found", id);
            }
            println!("Cleared tags on {} tracks", cleared);
        }
        Command::List => {
            for record in store.list_all()? {
                let tags = record.tags();
                println!(
                    "{:>6}  {}  {} - {}  [{}]",
                    record.id,
                    format_timestamp(record.created_at),
                    record.artist,
                    record.name,
                    if tags.is_empty() {
                        "untagged".to_string()
                    } else {
                        tags.flat_list()
                    }
                );
            }
        }
        Command::Delete { id } => {
            if !store.delete(id)? {
                bail!("Track {} not found", id);
            }
            println!("Deleted track {}", id);
        }
    }

    Ok(())
}
