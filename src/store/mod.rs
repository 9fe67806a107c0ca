//! SQLite record store for packed boundaries.
//!
//! One table holds a row per boundary; one index spans the rectangle columns
//! so a point lookup can pre-filter candidates before exact containment.

mod reader;
mod schema;
mod writer;

pub use reader::BoundaryStore;
pub use schema::{TableNames, DEFAULT_TABLE};
pub use writer::{StoreState, StoreWriter, WriteMode};
