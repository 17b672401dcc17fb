//! Cuboid-cell meshes of a voxel volume.
//!
//! # Overview
//!
//! The volume is divided into a grid of cells, `subcube_size` voxels per
//! edge. Every cell owns 24 vertices: three copies of its eight corners, one
//! copy per face-orientation group so each face can carry its own UVs.
//!
//! ```text
//! vertex = 24 * cell + 8 * group + corner
//! group:  0 = X-facing, 1 = Y-facing, 2 = Z-facing
//! corner: bit 0 = x side, bit 1 = y side, bit 2 = z side
//! ```
//!
//! Because a mesh has a vertex ceiling, the grid is cut along Z into
//! [`MeshPartition`]s (see [`plan_partitions`]). Inside a partition, faces
//! are grouped into one [`Submesh`] per (axis, layer) so that each layer of
//! slices can be given its own texture and render priority.
//!
//! Hiding a cell collapses its 24 vertices onto the origin; topology, UVs and
//! index buffers never change after a build.

mod builder;
mod partition;
mod plane_box;

pub use builder::{RebuildReport, VolumeMeshBuilder};
pub use partition::{plan_partitions, PartitionLayout};
pub use plane_box::PlaneBox;

use std::ops::Range;

use glam::{UVec3, Vec2, Vec3};
use stackscope_core::{
    Axis, CellId, FaceOrientation, PickResult, Pickable, Result, Sign, StackscopeError,
    VERTICES_PER_CELL,
};

use crate::voxel_volume::VoxelVolume;

/// Triangles emitted per cell into each axis submesh (two per face, two faces).
pub const TRIANGLES_PER_CELL_AXIS: usize = 4;

/// The global grid of cells covering a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    counts: UVec3,
    y_aspect_ratio: f32,
}

impl CellGrid {
    /// Creates a grid with explicit cell counts.
    pub fn new(counts: UVec3, y_aspect_ratio: f32) -> Result<Self> {
        if counts.min_element() == 0 {
            return Err(StackscopeError::InvalidConfig(format!(
                "cell counts must be positive, got {counts}"
            )));
        }
        Ok(Self {
            counts,
            y_aspect_ratio,
        })
    }

    /// Sizes the grid for a volume.
    ///
    /// `x = height / s`, `y = ceil(aspect * layers / s)`, `z = width / s`. A
    /// volume smaller than one cell along an axis still gets one cell.
    pub fn from_volume(volume: &VoxelVolume, subcube_size: u32, y_aspect_ratio: f32) -> Result<Self> {
        if subcube_size == 0 {
            return Err(StackscopeError::InvalidConfig(
                "subcube_size must be at least 1".into(),
            ));
        }
        let stacked = y_aspect_ratio * volume.layer_count() as f32 / subcube_size as f32;
        let counts = UVec3::new(
            volume.height() / subcube_size,
            stacked.ceil() as u32,
            volume.width() / subcube_size,
        )
        .max(UVec3::ONE);
        Self::new(counts, y_aspect_ratio)
    }

    /// Number of cells along each axis.
    pub fn counts(&self) -> UVec3 {
        self.counts
    }

    /// Vertical stretch applied to Y positions.
    pub fn y_aspect_ratio(&self) -> f32 {
        self.y_aspect_ratio
    }

    /// Total number of cells.
    pub fn total_cells(&self) -> usize {
        self.counts.x as usize * self.counts.y as usize * self.counts.z as usize
    }
}

/// All faces of one axis layer inside a partition.
#[derive(Debug, Clone)]
pub struct Submesh {
    axis: Axis,
    layer: u32,
    indices: Vec<u32>,
    triangle_cells: Vec<u32>,
}

impl Submesh {
    /// Axis the faces are perpendicular to.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Global layer index along [`Submesh::axis`].
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Triangle list, three indices per triangle.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Partition-local cell index of every triangle.
    pub fn triangle_cells(&self) -> &[u32] {
        &self.triangle_cells
    }

    pub fn num_triangles(&self) -> usize {
        self.triangle_cells.len()
    }

    /// Which face of its cell a triangle lies on.
    ///
    /// Every cell contributes two negative-face triangles followed by two
    /// positive-face triangles.
    pub fn face_of_triangle(&self, triangle: usize) -> FaceOrientation {
        let sign = if triangle % TRIANGLES_PER_CELL_AXIS < 2 {
            Sign::Negative
        } else {
            Sign::Positive
        };
        FaceOrientation::new(self.axis, sign)
    }
}

/// A renderable mesh covering a contiguous Z-range of cells.
#[derive(Debug, Clone)]
pub struct MeshPartition {
    z_range: Range<u32>,
    counts: UVec3,
    positions: Vec<Vec3>,
    original_positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    submeshes: Vec<Submesh>,
    hidden: Vec<bool>,
    revision: u64,
}

impl MeshPartition {
    /// Z-cells covered by this partition.
    pub fn z_range(&self) -> Range<u32> {
        self.z_range.clone()
    }

    /// Cell counts local to this partition: full X and Y, partial Z.
    pub fn cell_counts(&self) -> UVec3 {
        self.counts
    }

    pub fn num_cells(&self) -> usize {
        self.hidden.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Current vertex positions; hidden cells sit at the origin.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as built, before any cell was hidden.
    pub fn original_positions(&self) -> &[Vec3] {
        &self.original_positions
    }

    /// Current positions as raw bytes for a vertex buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    /// Incremented every time positions are committed for upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the partition-local index of a global cell, if it lives here.
    ///
    /// `index = z_rel * (cy * cx) + y * cx + x`.
    pub fn cell_index_of(&self, cell: CellId) -> Option<u32> {
        if cell.x >= self.counts.x || cell.y >= self.counts.y || !self.z_range.contains(&cell.z) {
            return None;
        }
        let z_rel = cell.z - self.z_range.start;
        Some(z_rel * self.counts.y * self.counts.x + cell.y * self.counts.x + cell.x)
    }

    /// Inverse of [`MeshPartition::cell_index_of`].
    pub fn cell_of_index(&self, index: u32) -> Option<CellId> {
        if index as usize >= self.num_cells() {
            return None;
        }
        let layer = self.counts.x * self.counts.y;
        Some(CellId::new(
            index % self.counts.x,
            (index % layer) / self.counts.x,
            self.z_range.start + index / layer,
        ))
    }

    /// Vertex range owned by a local cell.
    pub fn cell_vertices(index: u32) -> Range<usize> {
        let start = index as usize * VERTICES_PER_CELL;
        start..start + VERTICES_PER_CELL
    }

    pub fn is_cell_hidden(&self, index: u32) -> bool {
        self.hidden.get(index as usize).copied().unwrap_or(false)
    }

    /// Collapses a cell onto the origin. Returns false if it was already hidden.
    pub fn hide_cell(&mut self, index: u32) -> bool {
        match self.hidden.get_mut(index as usize) {
            Some(hidden) if !*hidden => {
                *hidden = true;
                self.positions[Self::cell_vertices(index)].fill(Vec3::ZERO);
                true
            }
            _ => false,
        }
    }

    /// Restores a cell from the snapshot. Returns false if it was visible.
    pub fn reveal_cell(&mut self, index: u32) -> bool {
        match self.hidden.get_mut(index as usize) {
            Some(hidden) if *hidden => {
                *hidden = false;
                let range = Self::cell_vertices(index);
                self.positions[range.clone()].copy_from_slice(&self.original_positions[range]);
                true
            }
            _ => false,
        }
    }

    /// Marks the positions as ready for upload.
    pub fn commit(&mut self) {
        self.revision += 1;
    }

    /// Restores every cell. Commits only if something changed.
    pub fn reset_positions(&mut self) -> bool {
        if !self.hidden.iter().any(|&h| h) {
            return false;
        }
        self.positions.copy_from_slice(&self.original_positions);
        self.hidden.fill(false);
        self.commit();
        true
    }
}

/// The full cell mesh: an arena of partitions indexed by integer.
#[derive(Debug, Clone)]
pub struct VolumeMesh {
    grid: CellGrid,
    extents: Vec3,
    layout: PartitionLayout,
    partitions: Vec<MeshPartition>,
}

impl VolumeMesh {
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn cell_counts(&self) -> UVec3 {
        self.grid.counts()
    }

    /// Physical extents the mesh was built with.
    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    pub fn partitions(&self) -> &[MeshPartition] {
        &self.partitions
    }

    pub fn partition(&self, index: usize) -> Option<&MeshPartition> {
        self.partitions.get(index)
    }

    pub fn partition_mut(&mut self, index: usize) -> Option<&mut MeshPartition> {
        self.partitions.get_mut(index)
    }

    pub fn num_vertices(&self) -> usize {
        self.partitions.iter().map(MeshPartition::num_vertices).sum()
    }

    pub fn num_submeshes(&self) -> usize {
        self.partitions.iter().map(|p| p.submeshes().len()).sum()
    }

    /// Finds the partition and local index of a global cell.
    pub fn locate(&self, cell: CellId) -> Option<(usize, u32)> {
        let partition = self.layout.partition_of_z(cell.z)?;
        let index = self.partitions.get(partition)?.cell_index_of(cell)?;
        Some((partition, index))
    }

    /// Like [`VolumeMesh::locate`] but failing with [`StackscopeError::CellOutOfRange`].
    pub fn require_cell(&self, cell: CellId) -> Result<(usize, u32)> {
        self.locate(cell).ok_or(StackscopeError::CellOutOfRange {
            x: cell.x,
            y: cell.y,
            z: cell.z,
        })
    }

    /// Returns true if the cell exists and has not been hidden.
    pub fn is_cell_visible(&self, cell: CellId) -> bool {
        self.locate(cell)
            .is_some_and(|(p, i)| !self.partitions[p].is_cell_hidden(i))
    }

    /// Axis-aligned bounds of a cell in mesh space (from the snapshot).
    pub fn cell_bounds(&self, cell: CellId) -> Option<(Vec3, Vec3)> {
        let (p, index) = self.locate(cell)?;
        let corners = &self.partitions[p].original_positions()[MeshPartition::cell_vertices(index)];
        let (min, max) = corners
            .iter()
            .take(8)
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), &c| {
                (lo.min(c), hi.max(c))
            });
        Some((min, max))
    }
}

impl Pickable for VolumeMesh {
    /// Walks the submeshes of the partition in order, the same order their
    /// index buffers are concatenated in a collision mesh.
    fn resolve_triangle(&self, partition: usize, triangle: usize) -> Option<PickResult> {
        let part = self.partitions.get(partition)?;
        let mut remaining = triangle;
        for (submesh_index, submesh) in part.submeshes().iter().enumerate() {
            if remaining < submesh.num_triangles() {
                let cell = part.cell_of_index(submesh.triangle_cells()[remaining])?;
                return Some(PickResult {
                    partition,
                    submesh: submesh_index,
                    triangle: remaining,
                    cell,
                    face: submesh.face_of_triangle(remaining),
                });
            }
            remaining -= submesh.num_triangles();
        }
        None
    }

    fn num_triangles(&self, partition: usize) -> usize {
        self.partitions
            .get(partition)
            .map_or(0, |p| p.submeshes().iter().map(Submesh::num_triangles).sum())
    }
}
