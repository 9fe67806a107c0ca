//! Live time-zone boundaries from the OpenStreetMap Overpass API.

mod fetcher;

pub use fetcher::{overpass_query, record_from_elements, Element, OverpassFetcher, OverpassResponse};
