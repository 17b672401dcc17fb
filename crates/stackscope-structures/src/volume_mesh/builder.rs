//! Geometry emission for cell meshes.

use std::ops::Range;

use glam::{UVec3, Vec2, Vec3};
use stackscope_core::{
    Axis, CellId, Result, Sign, StackscopeError, VolumeOptions, VERTICES_PER_CELL,
};

use super::partition::{plan_partitions, PartitionLayout};
use super::{CellGrid, MeshPartition, Submesh, VolumeMesh, TRIANGLES_PER_CELL_AXIS};

/// Outcome of [`VolumeMeshBuilder::rebuild`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Partitions whose buffers were kept (positions restored).
    pub reused: Vec<usize>,
    /// Partitions that were regenerated.
    pub rebuilt: Vec<usize>,
    /// Old partitions that no longer exist.
    pub dropped: usize,
}

/// Builds [`VolumeMesh`]es that respect a per-partition vertex ceiling.
#[derive(Debug, Clone, Copy)]
pub struct VolumeMeshBuilder {
    vertex_ceiling: usize,
}

impl VolumeMeshBuilder {
    /// Creates a builder, rejecting ceilings that cannot hold one cell.
    pub fn new(vertex_ceiling: usize) -> Result<Self> {
        if vertex_ceiling < VERTICES_PER_CELL {
            return Err(StackscopeError::CapacityExceeded {
                required: VERTICES_PER_CELL,
                ceiling: vertex_ceiling,
            });
        }
        Ok(Self { vertex_ceiling })
    }

    pub fn from_options(options: &VolumeOptions) -> Result<Self> {
        Self::new(options.vertex_ceiling)
    }

    pub fn vertex_ceiling(&self) -> usize {
        self.vertex_ceiling
    }

    /// Builds every partition of `grid`, scaled to `extents`.
    pub fn build(&self, grid: CellGrid, extents: Vec3) -> Result<VolumeMesh> {
        let layout = plan_partitions(grid.counts(), self.vertex_ceiling)?;
        let partitions = layout
            .ranges()
            .iter()
            .map(|range| build_partition(&grid, extents, range.clone()))
            .collect::<Vec<_>>();

        let mesh = VolumeMesh {
            grid,
            extents,
            layout,
            partitions,
        };
        log::info!(
            "built volume mesh: {} cells in {} partitions, {} vertices, {} submeshes",
            grid.total_cells(),
            mesh.partitions.len(),
            mesh.num_vertices(),
            mesh.num_submeshes()
        );
        Ok(mesh)
    }

    /// Rebuilds `mesh` for a new grid, regenerating only partitions whose
    /// shape changed. Reused partitions are restored to their built positions.
    ///
    /// On error the mesh is left untouched.
    pub fn rebuild(&self, mesh: &mut VolumeMesh, grid: CellGrid, extents: Vec3) -> Result<RebuildReport> {
        let layout = plan_partitions(grid.counts(), self.vertex_ceiling)?;
        let same_geometry = mesh.grid == grid && mesh.extents == extents;

        let mut old: Vec<Option<MeshPartition>> =
            std::mem::take(&mut mesh.partitions).into_iter().map(Some).collect();
        let mut report = RebuildReport::default();

        let partitions = layout
            .ranges()
            .iter()
            .enumerate()
            .map(|(i, range)| {
                let reusable = same_geometry
                    && old
                        .get(i)
                        .and_then(Option::as_ref)
                        .is_some_and(|p| p.z_range == *range);
                match old.get_mut(i).and_then(Option::take) {
                    Some(mut partition) if reusable => {
                        partition.reset_positions();
                        report.reused.push(i);
                        partition
                    }
                    _ => {
                        report.rebuilt.push(i);
                        build_partition(&grid, extents, range.clone())
                    }
                }
            })
            .collect::<Vec<_>>();

        report.dropped = old.len().saturating_sub(layout.partition_count());
        log::info!(
            "rebuilt volume mesh: {} reused, {} rebuilt, {} dropped",
            report.reused.len(),
            report.rebuilt.len(),
            report.dropped
        );

        mesh.grid = grid;
        mesh.extents = extents;
        mesh.layout = layout;
        mesh.partitions = partitions;
        Ok(report)
    }

    /// Returns the layout `build` would produce without allocating buffers.
    pub fn plan(&self, grid: &CellGrid) -> Result<PartitionLayout> {
        plan_partitions(grid.counts(), self.vertex_ceiling)
    }
}

/// `[min, max]` of cell `i` out of `count`, as fractions of the volume.
fn cell_span(i: u32, count: u32) -> [f32; 2] {
    [i as f32 / count as f32, (i + 1) as f32 / count as f32]
}

fn build_partition(grid: &CellGrid, extents: Vec3, z_range: Range<u32>) -> MeshPartition {
    let counts = grid.counts();
    let aspect = grid.y_aspect_ratio();
    let local = UVec3::new(counts.x, counts.y, z_range.end - z_range.start);
    let cell_count = local.x as usize * local.y as usize * local.z as usize;

    let mut positions = vec![Vec3::ZERO; cell_count * VERTICES_PER_CELL];
    let mut uvs = vec![Vec2::ZERO; cell_count * VERTICES_PER_CELL];

    let mut cell = 0usize;
    for z in z_range.clone() {
        let zs = cell_span(z, counts.z);
        for y in 0..counts.y {
            let ys = cell_span(y, counts.y);
            for x in 0..counts.x {
                // X runs opposite to the mesh frame
                let [x0, x1] = cell_span(x, counts.x);
                let xs = [1.0 - x0, 1.0 - x1];

                let base = cell * VERTICES_PER_CELL;
                for corner in 0..8 {
                    let (bx, by, bz) = (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);
                    let position = Vec3::new(
                        extents.x * (xs[bx] - 0.5),
                        extents.y * (ys[by] - 0.5) * aspect,
                        extents.z * (zs[bz] - 0.5),
                    );
                    positions[base + corner] = position;
                    positions[base + 8 + corner] = position;
                    positions[base + 16 + corner] = position;

                    uvs[base + corner] = Vec2::new(zs[bz], ys[by]);
                    uvs[base + 8 + corner] = Vec2::new(zs[bz], xs[bx]);
                    uvs[base + 16 + corner] = Vec2::new(xs[bx], ys[by]);
                }
                cell += 1;
            }
        }
    }

    let mut submeshes = Vec::with_capacity((local.x + local.y + local.z) as usize);
    for axis in Axis::ALL {
        let (a1, a2) = axis.others();
        for layer in 0..axis.count(local) {
            let submesh = build_submesh(local, axis, a1, a2, layer);
            let global_layer = match axis {
                Axis::Z => z_range.start + layer,
                Axis::X | Axis::Y => layer,
            };
            submeshes.push(Submesh {
                layer: global_layer,
                ..submesh
            });
        }
    }

    MeshPartition {
        z_range,
        counts: local,
        original_positions: positions.clone(),
        positions,
        uvs,
        submeshes,
        hidden: vec![false; cell_count],
        revision: 0,
    }
}

/// Emits both faces of every cell in one axis layer of a partition.
fn build_submesh(local: UVec3, axis: Axis, a1: Axis, a2: Axis, layer: u32) -> Submesh {
    let i = axis.index();
    // index distance between the two sides of a cell along each axis
    let held = 1u32 << i;
    let dim1 = 1u32 << a1.index();
    let dim2 = 1u32 << a2.index();

    let faces = a1.count(local) as usize * a2.count(local) as usize;
    let mut indices = Vec::with_capacity(faces * TRIANGLES_PER_CELL_AXIS * 3);
    let mut triangle_cells = Vec::with_capacity(faces * TRIANGLES_PER_CELL_AXIS);

    for u in 0..a1.count(local) {
        for v in 0..a2.count(local) {
            let cell = CellId::new(0, 0, 0).with(axis, layer).with(a1, u).with(a2, v);
            let cell_index = cell.z * local.y * local.x + cell.y * local.x + cell.x;

            for sign in Sign::BOTH {
                let base = VERTICES_PER_CELL as u32 * cell_index
                    + 8 * i as u32
                    + held * sign.index() as u32;
                let v0 = base;
                let v1 = base + dim1;
                let v2 = base + dim2;
                let v3 = base + dim1 + dim2;

                // opposite winding so both faces point outward
                let tris = match sign {
                    Sign::Negative => [v0, v1, v3, v3, v2, v0],
                    Sign::Positive => [v3, v1, v0, v0, v2, v3],
                };
                indices.extend_from_slice(&tris);
                triangle_cells.extend_from_slice(&[cell_index, cell_index]);
            }
        }
    }

    Submesh {
        axis,
        layer,
        indices,
        triangle_cells,
    }
}
