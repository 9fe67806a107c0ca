//! In-memory R-tree over boundary rectangles.

use std::sync::Arc;

use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::codec::quantize;
use crate::error::StoreError;
use crate::models::Boundary;
use crate::store::BoundaryStore;

/// Wrapper for R-tree indexing of boundaries
#[derive(Clone)]
pub struct IndexedBoundary {
    pub boundary: Arc<Boundary>,
    envelope: AABB<[i32; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[i32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedBoundary {
    pub fn new(boundary: Boundary) -> Option<Self> {
        if boundary.bounds.is_empty() {
            return None;
        }
        let b = boundary.bounds;
        Some(Self {
            envelope: AABB::from_corners([b.min_lon, b.min_lat], [b.max_lon, b.max_lat]),
            boundary: Arc::new(boundary),
        })
    }
}

/// Coarse spatial filter over a whole boundary table
pub struct BoundsIndex {
    tree: RTree<IndexedBoundary>,
}

impl BoundsIndex {
    pub fn build(boundaries: Vec<Boundary>) -> Self {
        info!(
            "Building bounds index for {} boundaries...",
            boundaries.len()
        );

        let indexed: Vec<IndexedBoundary> = boundaries
            .into_iter()
            .filter_map(IndexedBoundary::new)
            .collect();
        let tree = RTree::bulk_load(indexed);

        info!("Bounds index built with {} entries", tree.size());
        Self { tree }
    }

    /// Load every row of a store into an index
    pub fn from_store(store: &BoundaryStore) -> Result<Self, StoreError> {
        Ok(Self::build(store.all()?))
    }

    /// Boundaries whose rectangle contains the point, sorted by name.
    /// No polygon containment is performed.
    pub fn candidates(&self, lon: f64, lat: f64) -> Vec<Arc<Boundary>> {
        let query_envelope = AABB::from_point([quantize(lon), quantize(lat)]);

        let mut found: Vec<Arc<Boundary>> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .map(|ib| Arc::clone(&ib.boundary))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
