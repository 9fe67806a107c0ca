//! Batched boundary writer.

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, info};

use super::TableNames;
use crate::codec::encode_blob;
use crate::error::StoreError;
use crate::models::Boundary;

/// How the destination store file is prepared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Destination must not exist yet
    Create,
    /// Existing destination file is removed first
    Overwrite,
    /// Existing destination is kept; only the boundary table is re-created
    Merge,
}

/// Lifecycle of the boundary table within one writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Connected, table not (re)built yet
    Absent,
    /// Table and index freshly created, no rows
    Created,
    /// At least one row inserted
    Populated,
    /// Final commit done; no more writes
    Closed,
}

/// Writes boundaries into a store, committing every `batch_size` rows
pub struct StoreWriter {
    conn: Connection,
    names: TableNames,
    insert_sql: String,
    state: StoreState,
    batch_size: usize,
    pending: usize,
    written: usize,
}

impl StoreWriter {
    pub fn open(path: &Path, names: TableNames, batch_size: usize) -> Result<Self, StoreError> {
        info!("Opening store {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn, names, batch_size))
    }

    pub fn with_connection(conn: Connection, names: TableNames, batch_size: usize) -> Self {
        let insert_sql = names.insert_sql();
        Self {
            conn,
            names,
            insert_sql,
            state: StoreState::Absent,
            batch_size: batch_size.max(1),
            pending: 0,
            written: 0,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Rows inserted so far, committed or not
    pub fn written(&self) -> usize {
        self.written
    }

    /// Drop any previous boundary table and index, then create both.
    /// Other tables in the store are left alone.
    pub fn create_schema(&mut self) -> Result<(), StoreError> {
        self.require_state(&[StoreState::Absent], "create schema")?;

        info!(
            "Re-creating table {} with index {}",
            self.names.table(),
            self.names.index()
        );
        self.conn.execute_batch(&self.names.drop_sql())?;
        self.conn.execute_batch(&self.names.create_sql())?;

        self.state = StoreState::Created;
        Ok(())
    }

    /// Insert one boundary row. A name that is already stored is fatal.
    pub fn insert(&mut self, boundary: &Boundary) -> Result<(), StoreError> {
        self.require_state(&[StoreState::Created, StoreState::Populated], "insert")?;

        if self.pending == 0 {
            self.conn.execute_batch("BEGIN")?;
        }

        let b = &boundary.bounds;
        let result = self.conn.prepare_cached(&self.insert_sql)?.execute(params![
            b.min_lon,
            b.min_lat,
            b.max_lon,
            b.max_lat,
            boundary.name,
            encode_blob(&boundary.region),
        ]);

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateName(boundary.name.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        self.pending += 1;
        self.written += 1;
        self.state = StoreState::Populated;

        if self.pending >= self.batch_size {
            self.checkpoint()?;
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<(), StoreError> {
        if self.pending > 0 {
            self.conn.execute_batch("COMMIT")?;
            debug!("Committed {} rows ({} total)", self.pending, self.written);
            self.pending = 0;
        }
        Ok(())
    }

    /// Commit outstanding rows and close the table for writing.
    /// Returns the number of rows written.
    pub fn finish(&mut self) -> Result<usize, StoreError> {
        self.require_state(&[StoreState::Created, StoreState::Populated], "finish")?;
        self.checkpoint()?;
        self.state = StoreState::Closed;
        info!("Wrote {} boundaries to {}", self.written, self.names.table());
        Ok(self.written)
    }

    fn require_state(
        &self,
        allowed: &[StoreState],
        action: &'static str,
    ) -> Result<(), StoreError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(StoreError::InvalidState {
                state: self.state,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_region, pack, DELIMITER};
    use crate::models::Bounds;

    fn boundary(name: &str, region: Vec<i32>) -> Boundary {
        Boundary {
            name: name.to_string(),
            bounds: Bounds::new(0, 0, 10, 10),
            region,
        }
    }

    fn writer() -> StoreWriter {
        StoreWriter::with_connection(
            Connection::open_in_memory().unwrap(),
            TableNames::default(),
            2,
        )
    }

    fn row_count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut w = writer();
        assert_eq!(w.state(), StoreState::Absent);
        assert!(matches!(
            w.insert(&boundary("A", vec![0, 0])),
            Err(StoreError::InvalidState {
                state: StoreState::Absent,
                ..
            })
        ));

        w.create_schema().unwrap();
        assert_eq!(w.state(), StoreState::Created);
        assert!(w.create_schema().is_err());

        w.insert(&boundary("A", vec![0, 0])).unwrap();
        assert_eq!(w.state(), StoreState::Populated);

        assert_eq!(w.finish().unwrap(), 1);
        assert_eq!(w.state(), StoreState::Closed);
        assert!(w.insert(&boundary("B", vec![0, 0])).is_err());
    }

    #[test]
    fn test_rows_and_index_written() {
        let mut w = writer();
        w.create_schema().unwrap();
        for name in ["A", "B", "C"] {
            w.insert(&boundary(name, vec![1, 2, DELIMITER, 3, 4])).unwrap();
        }
        w.finish().unwrap();

        assert_eq!(row_count(&w.conn, "tztools_tz0"), 3);

        let index_count: i64 = w
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'tztools_tz0_bounds'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);

        let blob: Vec<u8> = w
            .conn
            .query_row("SELECT region FROM tztools_tz0 WHERE name = 'B'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(
            decode_region(&blob).unwrap(),
            vec![vec![(1, 2)], vec![(3, 4)]]
        );
    }

    #[test]
    fn test_duplicate_name_fails() {
        let mut w = writer();
        w.create_schema().unwrap();
        w.insert(&boundary("Test/Zone", vec![0, 0])).unwrap();

        let err = w.insert(&boundary("Test/Zone", vec![1, 1])).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(name) if name == "Test/Zone"));
    }

    #[test]
    fn test_create_schema_replaces_previous_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let mut first = StoreWriter::with_connection(conn, TableNames::default(), 10);
        first.create_schema().unwrap();
        first.insert(&boundary("Old", vec![0, 0])).unwrap();
        first.finish().unwrap();

        let mut second = StoreWriter::with_connection(first.conn, TableNames::default(), 10);
        second.create_schema().unwrap();
        second.insert(&boundary("New", vec![0, 0])).unwrap();
        second.finish().unwrap();

        assert_eq!(row_count(&second.conn, "tztools_tz0"), 1);
    }

    #[test]
    fn test_bounds_columns_match_packed_rectangle() {
        let rings = vec![vec![
            geo::Coord { x: -1.5, y: 2.0 },
            geo::Coord { x: 3.25, y: -4.0 },
        ]];
        let packed = pack(&rings).unwrap();
        let mut w = writer();
        w.create_schema().unwrap();
        w.insert(&Boundary {
            name: "Test/Zone".to_string(),
            bounds: packed.bounds,
            region: packed.values,
        })
        .unwrap();
        w.finish().unwrap();

        let row: (i32, i32, i32, i32) = w
            .conn
            .query_row(
                "SELECT minlon, minlat, maxlon, maxlat FROM tztools_tz0",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(row, (-15_000_000, -40_000_000, 32_500_000, 20_000_000));
    }

    #[test]
    fn test_duplicate_keeps_committed_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        let mut w = StoreWriter::open(&path, TableNames::default(), 2).unwrap();
        w.create_schema().unwrap();
        for name in ["A", "B", "C"] {
            w.insert(&boundary(name, vec![0, 0])).unwrap();
        }
        assert_eq!(w.written(), 3);
        assert!(matches!(
            w.insert(&boundary("A", vec![0, 0])),
            Err(StoreError::DuplicateName(name)) if name == "A"
        ));
        drop(w);

        // A and B were committed together; C sat in the open batch
        let conn = Connection::open(&path).unwrap();
        assert_eq!(row_count(&conn, "tztools_tz0"), 2);
        let names: Vec<String> = conn
            .prepare("SELECT name FROM tztools_tz0 ORDER BY name")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["A", "B"]);
    }
}
