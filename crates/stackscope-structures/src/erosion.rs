//! Peeling layers of cells off the sides of a volume mesh.
//!
//! Each axis has two erosion counters, one per side. Scrolling moves one
//! counter and hides (or reveals) the layer of cells it passed over, limited
//! to the window left visible by the other axes. At least one layer always
//! remains along every axis.
//!
//! Cells can also be carved out individually. Carved cells stay hidden when
//! erosion later reveals their layer, until [`ErosionController::restore_carved`].

use std::collections::BTreeSet;
use std::ops::Range;

use glam::{UVec3, Vec3};
use stackscope_core::{Axis, CellId, Result, Sign};

use crate::volume_mesh::VolumeMesh;

/// What a successful [`ErosionController::scroll`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErosionUpdate {
    pub axis: Axis,
    pub sign: Sign,
    /// Layers removed from this side after the scroll.
    pub removed: u32,
    /// Cell layers along `axis` that were hidden or revealed.
    pub layers: Range<u32>,
    /// True if the layers were revealed rather than hidden.
    pub revealed: bool,
    /// Number of cells whose vertices changed.
    pub cells_changed: usize,
    /// Partitions whose positions were committed, ascending.
    pub partitions: Vec<usize>,
}

/// Tracks the erosion state of one [`VolumeMesh`].
#[derive(Debug, Clone, Default)]
pub struct ErosionController {
    counts: UVec3,
    removed: [[u32; 2]; 3],
    carved: BTreeSet<CellId>,
}

impl ErosionController {
    /// Creates an uneroded controller for a grid of `counts` cells.
    pub fn new(counts: UVec3) -> Self {
        Self {
            counts,
            removed: [[0; 2]; 3],
            carved: BTreeSet::new(),
        }
    }

    /// Creates a controller matching `mesh`'s grid.
    pub fn for_mesh(mesh: &VolumeMesh) -> Self {
        Self::new(mesh.cell_counts())
    }

    /// Cell counts the controller was created for.
    pub fn cell_counts(&self) -> UVec3 {
        self.counts
    }

    /// Layers removed from the `sign` side of `axis`.
    pub fn removed(&self, axis: Axis, sign: Sign) -> u32 {
        self.removed[axis.index()][sign.index()]
    }

    /// Cell layers still visible along `axis`.
    pub fn visible_range(&self, axis: Axis) -> Range<u32> {
        let [low, high] = self.removed[axis.index()];
        low..axis.count(self.counts) - high
    }

    fn window(&self) -> [Range<u32>; 3] {
        Axis::ALL.map(|axis| self.visible_range(axis))
    }

    /// Returns true if the cell is inside the visible window and not carved.
    pub fn is_cell_visible(&self, cell: CellId) -> bool {
        cell.is_within(self.counts)
            && Axis::ALL
                .iter()
                .all(|&axis| self.visible_range(axis).contains(&cell.get(axis)))
            && !self.carved.contains(&cell)
    }

    /// Cells carved out individually.
    pub fn carved(&self) -> impl Iterator<Item = CellId> + '_ {
        self.carved.iter().copied()
    }

    fn sync_counts(&mut self, mesh: &VolumeMesh) {
        if self.counts != mesh.cell_counts() {
            log::warn!(
                "erosion state was for {} cells, mesh has {}; starting over",
                self.counts,
                mesh.cell_counts()
            );
            *self = Self::for_mesh(mesh);
        }
    }

    /// Erodes (`delta > 0`) or restores (`delta < 0`) `delta` layers on the
    /// `sign` side of `axis`.
    ///
    /// The counter is clamped so the opposite side keeps at least one layer.
    /// Returns `None` if the clamped counter did not move.
    pub fn scroll(
        &mut self,
        mesh: &mut VolumeMesh,
        axis: Axis,
        sign: Sign,
        delta: i32,
    ) -> Option<ErosionUpdate> {
        self.sync_counts(mesh);

        let count = axis.count(self.counts);
        let limit = count - 1 - self.removed(axis, sign.opposite());
        let old = self.removed(axis, sign);
        let new = (i64::from(old) + i64::from(delta)).clamp(0, i64::from(limit)) as u32;
        if new == old {
            return None;
        }

        let revealed = new < old;
        let (lo, hi) = (old.min(new), old.max(new));
        let layers = match sign {
            Sign::Negative => lo..hi,
            Sign::Positive => count - hi..count - lo,
        };

        let mut window = self.window();
        window[axis.index()] = layers.clone();

        let mut touched = BTreeSet::new();
        let mut cells_changed = 0;
        for_each_cell(&window, |cell| {
            if revealed && self.carved.contains(&cell) {
                return;
            }
            let Some((p, index)) = mesh.locate(cell) else {
                return;
            };
            let Some(partition) = mesh.partition_mut(p) else {
                return;
            };
            let changed = if revealed {
                partition.reveal_cell(index)
            } else {
                partition.hide_cell(index)
            };
            if changed {
                cells_changed += 1;
                touched.insert(p);
            }
        });
        let partitions = commit(mesh, touched);

        self.removed[axis.index()][sign.index()] = new;
        log::debug!(
            "erosion {axis:?} {sign:?}: {old} -> {new} ({cells_changed} cells, {} partitions)",
            partitions.len()
        );

        Some(ErosionUpdate {
            axis,
            sign,
            removed: new,
            layers,
            revealed,
            cells_changed,
            partitions,
        })
    }

    /// Hides one cell and remembers it as carved.
    ///
    /// Returns `Ok(false)` if the cell was already hidden.
    pub fn carve_cell(&mut self, mesh: &mut VolumeMesh, cell: CellId) -> Result<bool> {
        self.sync_counts(mesh);
        let (p, index) = mesh.require_cell(cell)?;
        if !self.is_cell_visible(cell) {
            return Ok(false);
        }
        self.carved.insert(cell);
        if let Some(partition) = mesh.partition_mut(p) {
            if partition.hide_cell(index) {
                partition.commit();
            }
        }
        Ok(true)
    }

    /// Carves every visible cell whose box intersects the sphere.
    ///
    /// `center` and `radius` are in mesh space. Returns the carved cells.
    pub fn carve_sphere(&mut self, mesh: &mut VolumeMesh, center: Vec3, radius: f32) -> Vec<CellId> {
        self.sync_counts(mesh);
        let radius_sq = radius * radius;

        let mut hits = Vec::new();
        for_each_cell(&self.window(), |cell| {
            if self.carved.contains(&cell) {
                return;
            }
            if let Some((min, max)) = mesh.cell_bounds(cell) {
                if center.clamp(min, max).distance_squared(center) <= radius_sq {
                    hits.push(cell);
                }
            }
        });

        let mut touched = BTreeSet::new();
        for &cell in &hits {
            self.carved.insert(cell);
            if let Some((p, index)) = mesh.locate(cell) {
                if mesh.partition_mut(p).is_some_and(|part| part.hide_cell(index)) {
                    touched.insert(p);
                }
            }
        }
        commit(mesh, touched);

        if !hits.is_empty() {
            log::debug!("carved {} cells around {center}", hits.len());
        }
        hits
    }

    /// Forgets every carved cell and reveals those inside the visible window.
    ///
    /// Returns the number of cells revealed.
    pub fn restore_carved(&mut self, mesh: &mut VolumeMesh) -> usize {
        self.sync_counts(mesh);
        let carved = std::mem::take(&mut self.carved);

        let mut touched = BTreeSet::new();
        let mut revealed = 0;
        for cell in carved {
            if !self.is_cell_visible(cell) {
                continue;
            }
            if let Some((p, index)) = mesh.locate(cell) {
                if mesh.partition_mut(p).is_some_and(|part| part.reveal_cell(index)) {
                    revealed += 1;
                    touched.insert(p);
                }
            }
        }
        commit(mesh, touched);
        revealed
    }

    /// Clears all erosion and carving and restores every cell of `mesh`.
    ///
    /// Returns the number of partitions that had to be re-uploaded.
    pub fn reset(&mut self, mesh: &mut VolumeMesh) -> usize {
        *self = Self::for_mesh(mesh);
        (0..mesh.partitions().len())
            .filter(|&p| mesh.partition_mut(p).is_some_and(|part| part.reset_positions()))
            .count()
    }
}

/// Calls `f` for every cell in the box spanned by `ranges`.
fn for_each_cell(ranges: &[Range<u32>; 3], mut f: impl FnMut(CellId)) {
    for z in ranges[2].clone() {
        for y in ranges[1].clone() {
            for x in ranges[0].clone() {
                f(CellId::new(x, y, z));
            }
        }
    }
}

fn commit(mesh: &mut VolumeMesh, touched: BTreeSet<usize>) -> Vec<usize> {
    for &p in &touched {
        if let Some(partition) = mesh.partition_mut(p) {
            partition.commit();
        }
    }
    touched.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume_mesh::{CellGrid, VolumeMeshBuilder};
    use proptest::prelude::*;

    fn mesh(x: u32, y: u32, z: u32, ceiling: usize) -> VolumeMesh {
        let grid = CellGrid::new(UVec3::new(x, y, z), 1.0).unwrap();
        VolumeMeshBuilder::new(ceiling)
            .unwrap()
            .build(grid, Vec3::ONE)
            .unwrap()
    }

    fn revisions(mesh: &VolumeMesh) -> Vec<u64> {
        mesh.partitions().iter().map(|p| p.revision()).collect()
    }

    /// Checks that mesh positions match the controller's view of visibility.
    fn assert_consistent(controller: &ErosionController, mesh: &VolumeMesh) {
        let counts = mesh.cell_counts();
        for z in 0..counts.z {
            for y in 0..counts.y {
                for x in 0..counts.x {
                    let cell = CellId::new(x, y, z);
                    assert_eq!(
                        mesh.is_cell_visible(cell),
                        controller.is_cell_visible(cell),
                        "{cell:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_erode_and_restore_exactly() {
        let mut mesh = mesh(4, 3, 5, 65_536);
        let original = mesh.partitions()[0].positions().to_vec();
        let mut erosion = ErosionController::for_mesh(&mesh);

        let update = erosion.scroll(&mut mesh, Axis::Z, Sign::Negative, 2).unwrap();
        assert_eq!(update.layers, 0..2);
        assert!(!update.revealed);
        assert_eq!(update.cells_changed, 4 * 3 * 2);
        assert_eq!(erosion.visible_range(Axis::Z), 2..5);
        assert!(!mesh.is_cell_visible(CellId::new(0, 0, 1)));
        assert!(mesh.is_cell_visible(CellId::new(0, 0, 2)));

        let update = erosion.scroll(&mut mesh, Axis::Z, Sign::Negative, -2).unwrap();
        assert!(update.revealed);
        assert_eq!(mesh.partitions()[0].positions(), original.as_slice());
    }

    #[test]
    fn test_positive_side_erodes_high_indices() {
        let mut mesh = mesh(4, 3, 5, 65_536);
        let mut erosion = ErosionController::for_mesh(&mesh);

        let update = erosion.scroll(&mut mesh, Axis::X, Sign::Positive, 1).unwrap();
        assert_eq!(update.layers, 3..4);
        assert!(!mesh.is_cell_visible(CellId::new(3, 1, 1)));
        assert!(mesh.is_cell_visible(CellId::new(2, 1, 1)));
        assert_consistent(&erosion, &mesh);
    }

    #[test]
    fn test_clamped_to_one_layer() {
        let mut mesh = mesh(4, 3, 5, 65_536);
        let mut erosion = ErosionController::for_mesh(&mesh);

        erosion.scroll(&mut mesh, Axis::Y, Sign::Positive, 1).unwrap();
        let update = erosion.scroll(&mut mesh, Axis::Y, Sign::Negative, 100).unwrap();
        assert_eq!(update.removed, 1);
        assert_eq!(erosion.visible_range(Axis::Y), 1..2);
        assert!(erosion.scroll(&mut mesh, Axis::Y, Sign::Negative, 1).is_none());
    }

    #[test]
    fn test_no_op_does_not_commit() {
        let mut mesh = mesh(2, 2, 6, 2 * 2 * 24 * 2);
        let mut erosion = ErosionController::for_mesh(&mesh);
        let before = revisions(&mesh);

        assert!(erosion.scroll(&mut mesh, Axis::X, Sign::Negative, -1).is_none());
        assert!(erosion.scroll(&mut mesh, Axis::Z, Sign::Positive, 0).is_none());
        assert_eq!(revisions(&mesh), before);
    }

    #[test]
    fn test_only_touched_partitions_commit() {
        let mut mesh = mesh(2, 2, 6, 2 * 2 * 24 * 2);
        assert_eq!(mesh.partitions().len(), 3);
        let mut erosion = ErosionController::for_mesh(&mesh);

        let update = erosion.scroll(&mut mesh, Axis::Z, Sign::Positive, 1).unwrap();
        assert_eq!(update.partitions, vec![2]);
        assert_eq!(revisions(&mesh), vec![0, 0, 1]);

        let update = erosion.scroll(&mut mesh, Axis::X, Sign::Negative, 1).unwrap();
        assert_eq!(update.partitions, vec![0, 1, 2]);
        assert_eq!(revisions(&mesh), vec![1, 1, 2]);
    }

    #[test]
    fn test_reveal_respects_other_axes() {
        let mut mesh = mesh(3, 3, 3, 65_536);
        let mut erosion = ErosionController::for_mesh(&mesh);

        erosion.scroll(&mut mesh, Axis::X, Sign::Negative, 1).unwrap();
        erosion.scroll(&mut mesh, Axis::Z, Sign::Negative, 1).unwrap();
        erosion.scroll(&mut mesh, Axis::X, Sign::Negative, -1).unwrap();

        // x = 0 came back, but not where z = 0 is still eroded
        assert!(mesh.is_cell_visible(CellId::new(0, 0, 1)));
        assert!(!mesh.is_cell_visible(CellId::new(0, 0, 0)));
        assert_consistent(&erosion, &mesh);
    }

    #[test]
    fn test_carved_cell_survives_reveal() {
        let mut mesh = mesh(3, 3, 3, 65_536);
        let mut erosion = ErosionController::for_mesh(&mesh);
        let cell = CellId::new(1, 1, 0);

        assert!(erosion.carve_cell(&mut mesh, cell).unwrap());
        assert!(!erosion.carve_cell(&mut mesh, cell).unwrap());
        assert!(!mesh.is_cell_visible(cell));

        erosion.scroll(&mut mesh, Axis::Z, Sign::Negative, 1).unwrap();
        erosion.scroll(&mut mesh, Axis::Z, Sign::Negative, -1).unwrap();
        assert!(!mesh.is_cell_visible(cell));
        assert_consistent(&erosion, &mesh);

        assert_eq!(erosion.restore_carved(&mut mesh), 1);
        assert!(mesh.is_cell_visible(cell));
        assert!(erosion.carve_cell(&mut mesh, CellId::new(5, 0, 0)).is_err());
    }

    #[test]
    fn test_carve_sphere() {
        let mut mesh = mesh(3, 3, 3, 65_536);
        let mut erosion = ErosionController::for_mesh(&mesh);

        let carved = erosion.carve_sphere(&mut mesh, Vec3::ZERO, 0.01);
        assert_eq!(carved, vec![CellId::new(1, 1, 1)]);

        let carved = erosion.carve_sphere(&mut mesh, Vec3::ZERO, 0.2);
        // the six face neighbours, not the diagonals
        assert_eq!(carved.len(), 6);
        assert_consistent(&erosion, &mesh);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut mesh = mesh(3, 3, 3, 65_536);
        let original = mesh.partitions()[0].original_positions().to_vec();
        let mut erosion = ErosionController::for_mesh(&mesh);

        erosion.scroll(&mut mesh, Axis::Y, Sign::Positive, 2).unwrap();
        erosion.carve_cell(&mut mesh, CellId::new(0, 0, 0)).unwrap();
        assert_eq!(erosion.reset(&mut mesh), 1);
        assert_eq!(erosion.removed(Axis::Y, Sign::Positive), 0);
        assert_eq!(erosion.carved().count(), 0);
        assert_eq!(mesh.partitions()[0].positions(), original.as_slice());
        assert_eq!(erosion.reset(&mut mesh), 0);
    }

    proptest! {
        #[test]
        fn prop_erosion_never_empties_an_axis(
            ops in prop::collection::vec((0usize..3, any::<bool>(), -4i32..5), 1..30),
        ) {
            let mut mesh = mesh(3, 4, 5, 3 * 4 * 24 * 2);
            let mut erosion = ErosionController::for_mesh(&mesh);

            for (axis, positive, delta) in ops {
                let axis = Axis::from_index(axis);
                let sign = if positive { Sign::Positive } else { Sign::Negative };
                erosion.scroll(&mut mesh, axis, sign, delta);

                for axis in Axis::ALL {
                    let removed = erosion.removed(axis, Sign::Negative)
                        + erosion.removed(axis, Sign::Positive);
                    prop_assert!(removed < axis.count(mesh.cell_counts()));
                }
            }
            assert_consistent(&erosion, &mesh);

            for axis in Axis::ALL {
                for sign in Sign::BOTH {
                    erosion.scroll(&mut mesh, axis, sign, -10);
                }
            }
            for partition in mesh.partitions() {
                prop_assert_eq!(partition.positions(), partition.original_positions());
            }
        }
    }
}
