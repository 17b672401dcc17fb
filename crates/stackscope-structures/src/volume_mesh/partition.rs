//! Splitting the cell grid into vertex-bounded mesh partitions.

use std::ops::Range;

use glam::UVec3;
use stackscope_core::{Result, StackscopeError, VERTICES_PER_CELL};

/// Consecutive Z-slabs of cells, each small enough for one mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    z_per_mesh: u32,
    ranges: Vec<Range<u32>>,
}

impl PartitionLayout {
    /// Z-cells per partition (the last one may hold fewer).
    pub fn z_per_mesh(&self) -> u32 {
        self.z_per_mesh
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.ranges.len()
    }

    /// Z-range of each partition, in order.
    pub fn ranges(&self) -> &[Range<u32>] {
        &self.ranges
    }

    /// Returns the partition holding Z-cell `z`, or `None` past the last slab.
    pub fn partition_of_z(&self, z: u32) -> Option<usize> {
        let end = self.ranges.last().map_or(0, |r| r.end);
        (z < end).then(|| (z / self.z_per_mesh) as usize)
    }
}

/// Plans the partitions for a grid of `counts` cells under `vertex_ceiling`.
///
/// Each slab holds `cz / meshes_needed` Z-layers, with the fractional
/// `meshes_needed = cx * cy * cz * 24 / ceiling`. That quotient is computed
/// in integers as `ceiling / (cx * cy * 24)`, clamped to `cz`.
///
/// Fails with [`StackscopeError::CapacityExceeded`] if one cell, or one
/// Z-slab of cells, does not fit under the ceiling.
pub fn plan_partitions(counts: UVec3, vertex_ceiling: usize) -> Result<PartitionLayout> {
    if vertex_ceiling < VERTICES_PER_CELL {
        return Err(StackscopeError::CapacityExceeded {
            required: VERTICES_PER_CELL,
            ceiling: vertex_ceiling,
        });
    }

    let slab_vertices = counts.x as usize * counts.y as usize * VERTICES_PER_CELL;
    if slab_vertices > vertex_ceiling {
        return Err(StackscopeError::CapacityExceeded {
            required: slab_vertices,
            ceiling: vertex_ceiling,
        });
    }

    let cz = counts.z.max(1);
    let z_per_mesh = u32::try_from(vertex_ceiling / slab_vertices.max(1))
        .unwrap_or(u32::MAX)
        .clamp(1, cz);

    let ranges = (0..cz)
        .step_by(z_per_mesh as usize)
        .map(|start| start..(start + z_per_mesh).min(cz))
        .collect::<Vec<_>>();

    log::debug!(
        "partition layout: {} partitions of up to {z_per_mesh} z-cells",
        ranges.len()
    );

    Ok(PartitionLayout { z_per_mesh, ranges })
}
