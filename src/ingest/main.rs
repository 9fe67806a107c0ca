//! Shapefile to SQLite conversion.
//!
//! Reads the tz_world multipolygon shapefile, packs every zone's rings and
//! writes a single indexed table that can be merged into other databases.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use tzbounds::config::Config;
use tzbounds::convert::{convert_with_progress, ConversionReport, ConvertOptions};
use tzbounds::source::ShapefileSource;
use tzbounds::store::WriteMode;
use tzbounds::ConvertError;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Convert the tz_world multipolygon shapefile to an indexed SQLite table")]
struct Args {
    /// tz_world dataset directory (default "tz_world")
    #[arg(long)]
    db: Option<PathBuf>,

    /// Output SQLite file
    #[arg(short, long, default_value = "tz_world_mp.sqlite")]
    out: PathBuf,

    /// Merge into an existing SQLite file; re-creates only the boundary table
    #[arg(short, long, conflicts_with = "force")]
    merge: bool,

    /// Overwrite an existing SQLite file
    #[arg(short, long)]
    force: bool,

    /// Boundary table name (default "tztools_tz0")
    #[arg(long)]
    table: Option<String>,

    /// Attribute field holding the zone name (default: first field)
    #[arg(long)]
    name_field: Option<String>,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install log subscriber");
    }

    match run(args) {
        Ok(report) => {
            info!(
                "Done: {} boundaries written, {} records skipped",
                report.written,
                report.skipped.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<ConvertError>()
                .map(ConvertError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(args: Args) -> Result<ConversionReport> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.db {
        config.source.dir = dir;
    }
    if let Some(field) = args.name_field {
        config.source.name_field = Some(field);
    }
    if let Some(table) = args.table {
        config.store.table = table;
    }

    let mode = if args.force {
        WriteMode::Overwrite
    } else if args.merge {
        WriteMode::Merge
    } else {
        WriteMode::Create
    };

    let options = ConvertOptions {
        destination: args.out,
        mode,
        table: config.table_names()?,
        batch_size: config.store.batch_size,
    };

    info!("tz_world: {}", config.source.dir.display());
    info!("Output: {} ({:?})", options.destination.display(), mode);

    let mut source = ShapefileSource::open(
        &config.source.dir,
        &config.source.base_name,
        config.source.name_field.as_deref(),
    )
    .map_err(ConvertError::from)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
            )
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let report = convert_with_progress(&mut source, &options, &pb)?;
    pb.finish_with_message("Conversion complete");

    for skipped in &report.skipped {
        info!(
            "Skipped record {} ({}): {}",
            skipped.index, skipped.name, skipped.reason
        );
    }

    Ok(report)
}
