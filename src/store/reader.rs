//! Read-only access to a boundary store.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};

use super::TableNames;
use crate::codec::{decode_blob, quantize};
use crate::error::StoreError;
use crate::models::{Boundary, Bounds};

/// Read side of a boundary store
pub struct BoundaryStore {
    conn: Connection,
    names: TableNames,
}

impl BoundaryStore {
    pub fn open(path: &Path, names: TableNames) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self::with_connection(conn, names))
    }

    pub fn with_connection(conn: Connection, names: TableNames) -> Self {
        Self { conn, names }
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.names.table()),
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// All boundary names, sorted
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name FROM {} ORDER BY name",
            self.names.table()
        ))?;
        let names = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Result<Option<Boundary>, StoreError> {
        let row = self
            .conn
            .query_row(&self.names.select_sql("WHERE name = ?1"), [name], read_row)
            .optional()?;
        row.map(to_boundary).transpose()
    }

    pub fn all(&self) -> Result<Vec<Boundary>, StoreError> {
        let mut stmt = self.conn.prepare(&self.names.select_sql(""))?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(to_boundary).collect()
    }

    /// Boundaries whose rectangle contains the point, edges included.
    ///
    /// This is the coarse filter only: callers still test the decoded rings.
    pub fn candidates(&self, lon: f64, lat: f64) -> Result<Vec<Boundary>, StoreError> {
        let (lon, lat) = (quantize(lon), quantize(lat));
        let mut stmt = self.conn.prepare_cached(&self.names.select_sql(
            "WHERE minlon <= ?1 AND maxlon >= ?1 AND minlat <= ?2 AND maxlat >= ?2",
        ))?;
        let rows = stmt
            .query_map([lon, lat], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(to_boundary).collect()
    }
}

struct RawRow {
    name: String,
    bounds: Bounds,
    region: Vec<u8>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        bounds: Bounds::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?),
        name: row.get(4)?,
        region: row.get(5)?,
    })
}

fn to_boundary(raw: RawRow) -> Result<Boundary, StoreError> {
    let region = decode_blob(&raw.region).map_err(|source| StoreError::Region {
        name: raw.name.clone(),
        source,
    })?;
    Ok(Boundary {
        name: raw.name,
        bounds: raw.bounds,
        region,
    })
}
