use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use log_data_writers::{build_writer, LogRow, WriterConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Insert, list and clear persisted log rows", long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Persist one log row
    Insert {
        #[arg(short, long, default_value = "info")]
        level: String,
        message: String,
    },
    /// Print every persisted row
    List,
    /// Remove every persisted row
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => WriterConfig::from_file(path)?,
        None => WriterConfig::default(),
    };
    let writer = build_writer(&config)?;

    match args.command {
        Command::Insert { level, message } => {
            if writer.read_only() {
                info!("Writer is read-only, row will not be persisted (set read_only: false)");
            }
            let existing = writer.get_rows().await.context("Failed to read rows")?.into_vec();
            let row = LogRow::new(&level, &message).with_length_at_insertion(existing.len());
            writer.log_row_created(&row);
            let inserted = writer
                .insert_rows(vec![row], &existing)
                .await
                .context("Failed to insert row")?;
            for row in inserted {
                info!("Inserted {}", row.id);
            }
        }
        Command::List => {
            let rows = writer.get_rows().await.context("Failed to read rows")?;
            for row in rows.iter() {
                println!(
                    "{} [{}] {} {}",
                    row.time_stamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    row.level,
                    row.id,
                    row.message
                );
            }
            info!("{} rows", rows.len());
        }
        Command::Clear => {
            writer.clear().await.context("Failed to clear rows")?;
            info!("Cleared all rows");
        }
    }

    Ok(())
}
