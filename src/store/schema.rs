//! Table and index DDL.

use crate::error::StoreError;

/// Table name used when none is configured
pub const DEFAULT_TABLE: &str = "tztools_tz0";

/// Validated names of the boundary table and its rectangle index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    table: String,
    index: String,
}

impl TableNames {
    pub fn new(table: &str) -> Result<Self, StoreError> {
        let mut chars = table.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidTableName(table.to_string()));
        }

        Ok(Self {
            table: table.to_string(),
            index: format!("{}_bounds", table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub(crate) fn drop_sql(&self) -> String {
        format!(
            "DROP INDEX IF EXISTS {}; DROP TABLE IF EXISTS {};",
            self.index, self.table
        )
    }

    pub(crate) fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE {table}(
                minlon INTEGER, minlat INTEGER, maxlon INTEGER, maxlat INTEGER,
                name TEXT PRIMARY KEY, region BLOB);
             CREATE INDEX {index} ON {table}(minlon, minlat, maxlon, maxlat);",
            table = self.table,
            index = self.index
        )
    }

    pub(crate) fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {}(minlon, minlat, maxlon, maxlat, name, region) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            self.table
        )
    }

    pub(crate) fn select_sql(&self, filter: &str) -> String {
        format!(
            "SELECT minlon, minlat, maxlon, maxlat, name, region FROM {} {} ORDER BY name",
            self.table, filter
        )
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            index: format!("{}_bounds", DEFAULT_TABLE),
        }
    }
}
