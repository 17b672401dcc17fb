//! Picking results: mapping a hit triangle back to the cell it belongs to.

use crate::axis::{CellId, FaceOrientation};

/// Result of resolving a triangle hit on a mesh partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickResult {
    /// Index of the partition that was hit.
    pub partition: usize,

    /// Submesh inside the partition.
    pub submesh: usize,

    /// Triangle index local to the submesh.
    pub triangle: usize,

    /// The cell owning the triangle, in global grid coordinates.
    pub cell: CellId,

    /// Which face of the cell the triangle lies on.
    pub face: FaceOrientation,
}

/// Objects whose triangles can be traced back to cells.
pub trait Pickable {
    /// Resolves a flat triangle index (counted across all submeshes of the
    /// partition, in submesh order) to the cell it belongs to.
    fn resolve_triangle(&self, partition: usize, triangle: usize) -> Option<PickResult>;

    /// Returns the total number of triangles in a partition.
    fn num_triangles(&self, partition: usize) -> usize;
}
