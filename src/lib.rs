//! tzbounds - time zone boundaries packed for point-to-zone lookup
//!
//! Converts polygon boundary datasets into a single SQLite table: one row per
//! zone with its bounding rectangle and a packed ring blob, plus an index over
//! the rectangle columns for coarse spatial pre-filtering.

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod index;
pub mod kml;
pub mod models;
pub mod overpass;
pub mod source;
pub mod store;

pub use error::{ConvertError, FetchError, PackError, RegionError, SourceError, StoreError};
pub use models::{Boundary, Bounds, ShapeType, SourceRecord};
