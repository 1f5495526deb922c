/*
Publishing a rebuilt geometry to the threads that compute distances.

The geometry itself is never modified in place. A rebuild creates a new
value and swaps the pointer under the write lock; readers clone the `Arc`
under the read lock and then work without any locking until they ask
for the next snapshot. A reader therefore sees either the old or the new
geometry, never a mix.
*/

use crate::pbc::cell::CellMatrix;
use crate::pbc::classify::PeriodicityMode;
use crate::pbc::geometry::BoxGeometry;
use log::debug;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
pub struct SharedGeometry {
    current: RwLock<Arc<BoxGeometry>>,
}

impl SharedGeometry {
    pub fn new(geometry: BoxGeometry) -> Self {
        Self {
            current: RwLock::new(Arc::new(geometry)),
        }
    }

    /// The geometry as of the last publication.
    pub fn snapshot(&self) -> Arc<BoxGeometry> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the geometry; snapshots taken after this returns see the new one.
    pub fn publish(&self, geometry: BoxGeometry) {
        let geometry = Arc::new(geometry);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = geometry;
    }

    /// Rebuild for a new box and publish the result.
    pub fn rebuild(&self, mode: Option<PeriodicityMode>, cell: &CellMatrix) -> Arc<BoxGeometry> {
        let geometry = Arc::new(BoxGeometry::new(mode, cell));
        debug!("publishing rebuilt pbc geometry, {:?}", geometry.kind());
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&geometry);
        geometry
    }
}
