//! Error types for boundary conversion.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreState;

/// Errors reading a vertex source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Dataset directory is missing.
    #[error("dataset directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// One of the dataset files is missing.
    #[error("dataset file does not exist: {0}")]
    MissingFile(PathBuf),

    /// The shape file does not start with the shapefile file code.
    #[error("not a shapefile: file code {0}, expected 9994")]
    BadFileCode(i32),

    /// A file ended in the middle of a header or record.
    #[error("unexpected end of file while reading {0}")]
    Truncated(&'static str),

    #[error("malformed shape record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// The configured name field is not in the attribute table.
    #[error("name field {0:?} not present in attribute table")]
    MissingField(String),

    #[error("shape and attribute record counts differ ({shapes} vs {attributes})")]
    RecordCountMismatch { shapes: usize, attributes: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a record's geometry cannot be packed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackError {
    #[error("boundary has no rings")]
    NoRings,

    #[error("ring {ring} has no vertices")]
    EmptyRing { ring: usize },

    #[error("vertex {vertex} of ring {ring} is out of range: ({lon}, {lat})")]
    OutOfRange {
        ring: usize,
        vertex: usize,
        lon: f64,
        lat: f64,
    },
}

/// Errors decoding a packed region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("region blob length {0} is not a multiple of 4")]
    TruncatedBlob(usize),

    #[error("region is empty")]
    Empty,

    /// Delimiter at the start or end, or two in a row.
    #[error("ring {ring} is empty")]
    EmptyRing { ring: usize },

    #[error("ring {ring} has an odd number of values ({len})")]
    OddLength { ring: usize, len: usize },
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("boundary {0:?} already exists in the store")]
    DuplicateName(String),

    #[error("store is {state:?}, cannot {action}")]
    InvalidState {
        state: StoreState,
        action: &'static str,
    },

    #[error("invalid table name {0:?}")]
    InvalidTableName(String),

    #[error("stored region for {name:?} is malformed: {source}")]
    Region {
        name: String,
        #[source]
        source: RegionError,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors fetching boundaries from Overpass.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("time zone not found: {0}")]
    NotFound(String),

    #[error("way {way} references unknown node {node}")]
    MissingNode { way: i64, node: i64 },

    #[error("Overpass returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid Overpass endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Fatal conversion errors. Each kind maps to its own process exit code.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("source unreadable: {0}")]
    SourceUnreadable(#[from] SourceError),

    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("output file exists: {0} (pass overwrite or merge)")]
    DestinationConflict(PathBuf),

    #[error("duplicate boundary name {0:?}")]
    DuplicateName(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Process exit status for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::SourceUnreadable(_) | ConvertError::OutputDirMissing(_) => 1,
            ConvertError::DestinationConflict(_) => 3,
            ConvertError::DuplicateName(_) => 4,
            ConvertError::Store(_) | ConvertError::Io { .. } => 5,
        }
    }
}

impl From<StoreError> for ConvertError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => ConvertError::DuplicateName(name),
            other => ConvertError::Store(other),
        }
    }
}
