//! Render one time zone's boundaries to KML for visual checks.
//!
//! Boundaries can come from the tz_world shapefile, from a converted SQLite
//! store (decoding the packed blob), or live from OpenStreetMap via Overpass.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tzbounds::config::Config;
use tzbounds::kml;
use tzbounds::models::{Ring, ShapeType};
use tzbounds::overpass::OverpassFetcher;
use tzbounds::source::{ShapefileSource, VertexSource};
use tzbounds::store::BoundaryStore;
use tzbounds::FetchError;

/// Exit status when the zone is not in the chosen source
const NOT_FOUND: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Render a named time zone's boundaries to KML")]
struct Args {
    /// Time zone to render (e.g. America/New_York)
    tz: String,

    /// Output KML file; derived from the zone name by default
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    source: Origin,
}

#[derive(Subcommand, Debug)]
enum Origin {
    /// Read the tz_world shapefile
    Shapefile {
        /// tz_world dataset directory
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Decode a store written by `ingest`
    Store {
        #[arg(long, default_value = "tz_world_mp.sqlite")]
        path: PathBuf,
    },
    /// Query OpenStreetMap through the Overpass API
    Osm,
}

/// Rings to draw plus a description for the placemark
struct Rendered {
    rings: Vec<Ring>,
    description: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install log subscriber");
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(NOT_FOUND),
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns false when the zone was not found
async fn run(args: Args) -> Result<bool> {
    let config = Config::load(args.config.as_deref())?;

    let rendered = match &args.source {
        Origin::Shapefile { db } => {
            let dir = db.clone().unwrap_or_else(|| config.source.dir.clone());
            from_shapefile(&config, dir, &args.tz)?
        }
        Origin::Store { path } => from_store(&config, path, &args.tz)?,
        Origin::Osm => from_osm(&config, &args.tz).await?,
    };

    let Some(rendered) = rendered else {
        error!("Time zone not found: {}", args.tz);
        return Ok(false);
    };

    let out = args
        .out
        .unwrap_or_else(|| kml::default_output_path(&args.tz));
    info!("Writing {} rings to {}", rendered.rings.len(), out.display());
    kml::write_file(&out, &args.tz, &rendered.description, &rendered.rings)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    Ok(true)
}

fn from_shapefile(config: &Config, dir: PathBuf, tz: &str) -> Result<Option<Rendered>> {
    let mut source = ShapefileSource::open(
        &dir,
        &config.source.base_name,
        config.source.name_field.as_deref(),
    )?;

    info!("Searching {}...", source.describe());
    let mut rings = Vec::new();
    let mut found = false;
    while let Some(record) = source.next_record()? {
        if record.name != tz {
            continue;
        }
        if record.shape_type == ShapeType::Polygon {
            found = true;
            rings.extend(record.rings);
        } else {
            warn!(
                "Unknown shape type {} at {}",
                record.shape_type, record.index
            );
        }
    }

    Ok(found.then(|| Rendered {
        rings,
        description: format!("Time zone borders for {} as retrieved from tz_world", tz),
    }))
}

fn from_store(config: &Config, path: &Path, tz: &str) -> Result<Option<Rendered>> {
    let store = BoundaryStore::open(path, config.table_names()?)
        .with_context(|| format!("Failed to open store {}", path.display()))?;

    let Some(boundary) = store.get(tz)? else {
        return Ok(None);
    };

    Ok(Some(Rendered {
        rings: boundary.rings_degrees()?,
        description: format!(
            "Time zone borders for {} as decoded from {}",
            tz,
            path.display()
        ),
    }))
}

async fn from_osm(config: &Config, tz: &str) -> Result<Option<Rendered>> {
    let fetcher = OverpassFetcher::new(&config.overpass.endpoint, config.overpass.timeout_secs)?;
    let now = Utc::now();

    match fetcher.fetch_timezone(tz).await {
        Ok(record) => Ok(Some(Rendered {
            rings: record.rings,
            description: format!(
                "Time zone borders for {} as retrieved from OpenStreetMap on {}",
                tz,
                now.format("%Y-%m-%dT%H:%M:%SZ")
            ),
        })),
        Err(FetchError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
