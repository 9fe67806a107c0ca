//! Conversion pipeline: vertex source → packer → store.
//!
//! Whole-run preconditions (destination conflict, unreadable source) are
//! checked before the store is touched. Per-record problems are collected in
//! the report and never stop the run.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::codec::pack;
use crate::error::{ConvertError, PackError};
use crate::models::{Boundary, ShapeType, SourceRecord};
use crate::source::VertexSource;
use crate::store::{StoreWriter, TableNames, WriteMode};

/// Where and how to write the store
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub destination: PathBuf,
    pub mode: WriteMode,
    pub table: TableNames,
    /// Rows per commit
    pub batch_size: usize,
}

impl ConvertOptions {
    pub fn new(destination: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            destination: destination.into(),
            mode,
            table: TableNames::default(),
            batch_size: 1000,
        }
    }
}

/// Why a record produced no row
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnsupportedShapeType(ShapeType),
    Degenerate(PackError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnsupportedShapeType(t) => write!(f, "unknown shape type {}", t),
            SkipReason::Degenerate(e) => write!(f, "degenerate geometry: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub read: usize,
    pub written: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Turn one source record into a storable boundary
pub fn pack_record(record: &SourceRecord) -> Result<Boundary, SkipReason> {
    if record.shape_type != ShapeType::Polygon {
        return Err(SkipReason::UnsupportedShapeType(record.shape_type));
    }
    let packed = pack(&record.rings).map_err(SkipReason::Degenerate)?;
    Ok(Boundary {
        name: record.name.clone(),
        bounds: packed.bounds,
        region: packed.values,
    })
}

/// Validate the destination against the write mode without changing anything
pub fn check_destination(path: &Path, mode: WriteMode) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(ConvertError::OutputDirMissing(parent.to_path_buf()));
        }
    }
    if path.exists() && mode == WriteMode::Create {
        return Err(ConvertError::DestinationConflict(path.to_path_buf()));
    }
    Ok(())
}

pub fn convert<S: VertexSource>(
    source: &mut S,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    convert_with_progress(source, options, &ProgressBar::hidden())
}

/// Run a full conversion, ticking `progress` once per record
pub fn convert_with_progress<S: VertexSource>(
    source: &mut S,
    options: &ConvertOptions,
    progress: &ProgressBar,
) -> Result<ConversionReport, ConvertError> {
    check_destination(&options.destination, options.mode)?;

    info!("Reading {}...", source.describe());
    let records = source.read_all()?;
    info!("Read {} records", records.len());

    if options.mode == WriteMode::Overwrite && options.destination.exists() {
        info!("Removing existing {}", options.destination.display());
        std::fs::remove_file(&options.destination).map_err(|source| ConvertError::Io {
            path: options.destination.clone(),
            source,
        })?;
    }

    let mut writer = StoreWriter::open(
        &options.destination,
        options.table.clone(),
        options.batch_size,
    )?;
    writer.create_schema()?;

    progress.set_length(records.len() as u64);
    let mut report = ConversionReport {
        read: records.len(),
        ..Default::default()
    };

    for record in &records {
        progress.inc(1);
        match pack_record(record) {
            Ok(boundary) => {
                let (min_lon, min_lat, max_lon, max_lat) = boundary.bounds.to_degrees();
                debug!(
                    "Packed {} ({} rings, {} values) within [{}, {}, {}, {}]",
                    boundary.name,
                    record.rings.len(),
                    boundary.region.len(),
                    min_lon,
                    min_lat,
                    max_lon,
                    max_lat
                );
                writer.insert(&boundary)?;
                progress.set_message(format!("{} written", writer.written()));
            }
            Err(reason) => {
                warn!("Skipping {} at {}: {}", record.name, record.index, reason);
                report.skipped.push(SkippedRecord {
                    index: record.index,
                    name: record.name.clone(),
                    reason,
                });
            }
        }
    }

    report.written = writer.finish()?;
    info!(
        "Converted {} of {} records ({} skipped)",
        report.written,
        report.read,
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{unpack, DELIMITER, SCALE};
    use crate::models::Bounds;
    use crate::source::fixtures::{square, write_dataset, Shape};
    use crate::source::{MemorySource, ShapefileSource};
    use crate::store::BoundaryStore;
    use geo::Coord;
    use rusqlite::Connection;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn unit_square() -> Vec<Coord<f64>> {
        ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
    }

    fn store(path: &Path) -> BoundaryStore {
        BoundaryStore::open(path, TableNames::default()).unwrap()
    }

    #[test]
    fn test_single_square_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        let mut src = MemorySource::new(
            "memory",
            vec![SourceRecord::polygon(0, "Test/Zone", vec![unit_square()])],
        );

        let report = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap();
        assert_eq!(report.written, 1);
        assert!(report.skipped.is_empty());

        let zone = store(&out).get("Test/Zone").unwrap().unwrap();
        assert_eq!(zone.bounds, Bounds::new(0, 0, SCALE, SCALE));
        assert_eq!(
            zone.rings().unwrap(),
            vec![vec![(0, 0), (SCALE, 0), (SCALE, SCALE), (0, SCALE)]]
        );
    }

    #[test]
    fn test_two_rings_one_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        let second = ring(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0)]);
        let mut src = MemorySource::new(
            "memory",
            vec![SourceRecord::polygon(0, "Test/Islands", vec![unit_square(), second])],
        );

        convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap();

        let zone = store(&out).get("Test/Islands").unwrap().unwrap();
        assert_eq!(zone.region.iter().filter(|v| **v == DELIMITER).count(), 1);
        assert_eq!(unpack(&zone.region).unwrap().len(), 2);
        assert_eq!(zone.bounds, Bounds::new(0, 0, 6 * SCALE, 6 * SCALE));
    }

    #[test]
    fn test_unsupported_shape_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        let mut src = MemorySource::new(
            "memory",
            vec![
                SourceRecord {
                    index: 0,
                    name: "Test/Line".to_string(),
                    shape_type: ShapeType::PolyLine,
                    rings: vec![unit_square()],
                },
                SourceRecord::polygon(1, "Test/Zone", vec![unit_square()]),
                SourceRecord::polygon(2, "Test/Nothing", vec![]),
            ],
        );

        let report = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap();
        assert_eq!(report.read, 3);
        assert_eq!(report.written, 1);
        assert_eq!(
            report.skipped,
            vec![
                SkippedRecord {
                    index: 0,
                    name: "Test/Line".to_string(),
                    reason: SkipReason::UnsupportedShapeType(ShapeType::PolyLine),
                },
                SkippedRecord {
                    index: 2,
                    name: "Test/Nothing".to_string(),
                    reason: SkipReason::Degenerate(PackError::NoRings),
                },
            ]
        );

        let store = store(&out);
        assert_eq!(store.names().unwrap(), vec!["Test/Zone"]);
    }

    #[test]
    fn test_merge_keeps_unrelated_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app.sqlite");
        {
            let conn = Connection::open(&out).unwrap();
            conn.execute_batch(
                "CREATE TABLE cities(name TEXT, population INTEGER);
                 INSERT INTO cities VALUES ('Paris', 2100000), ('Oslo', 700000);
                 CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT);
                 INSERT INTO settings VALUES ('theme', 'dark');",
            )
            .unwrap();
        }

        let records = vec![SourceRecord::polygon(0, "Test/Zone", vec![unit_square()])];
        let mut src = MemorySource::new("memory", records.clone());
        convert(&mut src, &ConvertOptions::new(&out, WriteMode::Merge)).unwrap();

        // Merging again replaces the boundary table rather than duplicating rows
        let mut src = MemorySource::new("memory", records);
        convert(&mut src, &ConvertOptions::new(&out, WriteMode::Merge)).unwrap();

        let conn = Connection::open(&out).unwrap();
        let count = |table: &str| -> i64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count("cities"), 2);
        assert_eq!(count("settings"), 1);
        assert_eq!(count("tztools_tz0"), 1);
    }

    #[test]
    fn test_duplicate_name_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        let mut src = MemorySource::new(
            "memory",
            vec![
                SourceRecord::polygon(0, "Test/Zone", vec![unit_square()]),
                SourceRecord::polygon(1, "Test/Zone", vec![unit_square()]),
            ],
        );

        let err = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap_err();
        assert!(matches!(&err, ConvertError::DuplicateName(name) if name == "Test/Zone"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_destination_conflict_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        std::fs::write(&out, b"not a database").unwrap();

        let mut src = MemorySource::new(
            "memory",
            vec![SourceRecord::polygon(0, "Test/Zone", vec![unit_square()])],
        );
        let err = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap_err();
        assert!(matches!(err, ConvertError::DestinationConflict(_)));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(std::fs::read(&out).unwrap(), b"not a database");
    }

    #[test]
    fn test_overwrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tz.sqlite");
        std::fs::write(&out, b"not a database").unwrap();

        let mut src = MemorySource::new(
            "memory",
            vec![SourceRecord::polygon(0, "Test/Zone", vec![unit_square()])],
        );
        convert(&mut src, &ConvertOptions::new(&out, WriteMode::Overwrite)).unwrap();
        assert_eq!(store(&out).count().unwrap(), 1);
    }

    #[test]
    fn test_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nope").join("tz.sqlite");
        let err = check_destination(&out, WriteMode::Create).unwrap_err();
        assert!(matches!(err, ConvertError::OutputDirMissing(_)));
        assert!(check_destination(Path::new("tz.sqlite"), WriteMode::Merge).is_ok());
    }

    #[test]
    fn test_unreadable_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("tz_world");
        std::fs::create_dir(&data).unwrap();
        write_dataset(
            &data,
            "tz_world_mp",
            &[
                Shape::Polygon(vec![square(0.0, 0.0, 1.0)]),
                Shape::Polygon(vec![square(2.0, 2.0, 1.0)]),
            ],
            // One name short
            &["Test/Zone"],
        );

        let out = dir.path().join("tz.sqlite");
        let mut src = ShapefileSource::open(&data, "tz_world_mp", None).unwrap();
        let err = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap_err();
        assert!(matches!(err, ConvertError::SourceUnreadable(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_shapefile_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            dir.path(),
            "tz_world_mp",
            &[
                Shape::Polygon(vec![square(-74.0, 40.0, 1.0)]),
                Shape::Point(1.0, 1.0),
                Shape::Polygon(vec![square(2.0, 48.0, 1.0), square(9.0, 42.0, 0.5)]),
            ],
            &["America/New_York", "Test/Point", "Europe/Paris"],
        );

        let out = dir.path().join("tz.sqlite");
        let mut src = ShapefileSource::open(dir.path(), "tz_world_mp", None).unwrap();
        let report = convert(&mut src, &ConvertOptions::new(&out, WriteMode::Create)).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);

        let store = store(&out);
        let paris = store.candidates(2.5, 48.5).unwrap();
        assert_eq!(paris.len(), 1);
        assert_eq!(paris[0].name, "Europe/Paris");
        assert_eq!(paris[0].ring_count(), 2);
        assert_eq!(
            paris[0].bounds,
            Bounds::new(2 * SCALE, 42 * SCALE, 95 * SCALE / 10, 49 * SCALE)
        );
    }
}
