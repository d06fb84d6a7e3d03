use anyhow::{Context, Result};
use lotto6::{config, database, import};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = config::load();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(config.import_dir);

    let conn = database::create_database(&config.database_url)
        .with_context(|| format!("opening database {}", config.database_url))?;

    println!("🎲 Importing Lotto 6aus49 draws from {}", dir.display());
    let summary = import::import_directory(&conn, &dir)
        .with_context(|| format!("importing from {}", dir.display()))?;

    println!(
        "✅ {} files read: {} inserted, {} already stored, {} rejected",
        summary.files,
        summary.inserted,
        summary.duplicates,
        summary.rejected.len()
    );
    for rejection in &summary.rejected {
        println!("❌ {}: {}", rejection.source, rejection.reason);
    }
    if !summary.missing_dates.is_empty() {
        println!("⚠ {} draw dates have no record:", summary.missing_dates.len());
        for date in &summary.missing_dates {
            println!("   • {}", date.format("%d.%m.%Y"));
        }
    }

    Ok(())
}
