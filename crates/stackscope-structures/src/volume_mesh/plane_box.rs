//! The single-box layout: six faces showing the slices at a scrollable window.

use glam::{Vec2, Vec3};
use stackscope_core::{
    Axis, CellId, FaceOrientation, PickResult, Pickable, PlaneDescriptor, Sign, VERTICES_PER_CELL,
};

/// A single cuboid whose six faces show the volume at the edges of a
/// per-axis `[min, max]` window.
///
/// Scrolling moves one edge of the window; the box shrinks and its faces are
/// retextured with the slice at the new edge.
#[derive(Debug, Clone)]
pub struct PlaneBox {
    extents: Vec3,
    window: [[f32; 2]; 3],
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    submeshes: Vec<[u32; 6]>,
    revision: u64,
}

impl PlaneBox {
    /// Creates a box spanning `window` (fractions of the volume per axis).
    pub fn new(extents: Vec3, window: [[f32; 2]; 3]) -> Self {
        let window = window.map(|[min, max]| {
            let min = min.clamp(0.0, 1.0);
            [min, max.clamp(min, 1.0)]
        });
        let mut plane_box = Self {
            extents,
            window,
            positions: vec![Vec3::ZERO; VERTICES_PER_CELL],
            uvs: vec![Vec2::ZERO; VERTICES_PER_CELL],
            submeshes: face_indices(),
            revision: 0,
        };
        plane_box.emit_vertices();
        plane_box
    }

    /// A box covering the whole volume.
    pub fn full(extents: Vec3) -> Self {
        Self::new(extents, [[0.0, 1.0]; 3])
    }

    fn emit_vertices(&mut self) {
        let [xs, ys, zs] = self.window;
        for corner in 0..8 {
            let (x, y, z) = (xs[corner & 1], ys[(corner >> 1) & 1], zs[(corner >> 2) & 1]);
            let position = self.extents * (Vec3::new(x, y, z) - 0.5);
            for group in 0..3 {
                self.positions[group * 8 + corner] = position;
            }
            self.uvs[corner] = Vec2::new(z, y);
            self.uvs[8 + corner] = Vec2::new(z, x);
            self.uvs[16 + corner] = Vec2::new(x, y);
        }
    }

    /// The `[min, max]` window along `axis`.
    pub fn window(&self, axis: Axis) -> [f32; 2] {
        self.window[axis.index()]
    }

    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Index buffers of the six faces, in [`FaceOrientation::ALL`] order.
    pub fn submeshes(&self) -> &[[u32; 6]] {
        &self.submeshes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Texture plane for each face, in [`FaceOrientation::ALL`] order.
    pub fn face_planes(&self) -> [PlaneDescriptor; 6] {
        FaceOrientation::ALL.map(|face| {
            let edge = self.window[face.axis.index()][face.sign.index()];
            let offset = match face.axis {
                Axis::X => 1.0 - edge,
                Axis::Y | Axis::Z => edge,
            };
            PlaneDescriptor::for_axis(face.axis, offset)
        })
    }

    /// Moves the `sign` edge of the window along `axis` by `ticks` voxels of
    /// a volume `extent` voxels deep. The opposite edge follows if the window
    /// would invert, so at least one plane stays visible.
    ///
    /// Returns true if the window changed.
    pub fn scroll(&mut self, axis: Axis, sign: Sign, ticks: f32, extent: u32) -> bool {
        let step = ticks / extent.saturating_sub(1).max(1) as f32;
        let before = self.window[axis.index()];
        let [min, max] = &mut self.window[axis.index()];
        match sign {
            Sign::Positive => {
                *max = (*max + step).clamp(0.0, 1.0);
                *min = min.min(*max);
            }
            Sign::Negative => {
                *min = (*min - step).clamp(0.0, 1.0);
                *max = max.max(*min);
            }
        }

        if self.window[axis.index()] == before {
            return false;
        }
        self.emit_vertices();
        self.revision += 1;
        true
    }
}

/// Two triangles per face. Winding is the reverse of the cell meshes because
/// X is not inverted here.
fn face_indices() -> Vec<[u32; 6]> {
    FaceOrientation::ALL
        .iter()
        .map(|face| {
            let i = face.axis.index();
            let (a1, a2) = face.axis.others();
            let (dim1, dim2) = (1u32 << a1.index(), 1u32 << a2.index());
            let base = 8 * i as u32 + (1u32 << i) * face.sign.index() as u32;
            let (v0, v1, v2, v3) = (base, base + dim1, base + dim2, base + dim1 + dim2);
            match face.sign {
                Sign::Negative => [v3, v1, v0, v0, v2, v3],
                Sign::Positive => [v0, v1, v3, v3, v2, v0],
            }
        })
        .collect()
}

impl Pickable for PlaneBox {
    fn resolve_triangle(&self, partition: usize, triangle: usize) -> Option<PickResult> {
        if partition != 0 || triangle >= self.num_triangles(0) {
            return None;
        }
        let submesh = triangle / 2;
        Some(PickResult {
            partition,
            submesh,
            triangle: triangle % 2,
            cell: CellId::new(0, 0, 0),
            face: FaceOrientation::ALL[submesh],
        })
    }

    fn num_triangles(&self, partition: usize) -> usize {
        if partition == 0 {
            self.submeshes.len() * 2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_box() {
        let plane_box = PlaneBox::full(Vec3::new(2.0, 1.0, 4.0));
        assert_eq!(plane_box.positions().len(), 24);
        assert_eq!(plane_box.submeshes().len(), 6);
        assert_eq!(plane_box.positions()[0], Vec3::new(-1.0, -0.5, -2.0));
        assert_eq!(plane_box.positions()[7], Vec3::new(1.0, 0.5, 2.0));
        assert_eq!(plane_box.uvs()[16 + 1], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_faces_point_outward() {
        let plane_box = PlaneBox::full(Vec3::ONE);
        for (face, indices) in FaceOrientation::ALL.iter().zip(plane_box.submeshes()) {
            for tri in indices.chunks(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| plane_box.positions()[i as usize]);
                let normal = (b - a).cross(c - a).normalize();
                assert!(normal.abs_diff_eq(face.normal(), 1e-6), "{face:?}: {normal}");
            }
        }
    }

    #[test]
    fn test_face_planes() {
        let plane_box = PlaneBox::new(Vec3::ONE, [[0.25, 0.75], [0.0, 0.5], [0.1, 0.9]]);
        let planes = plane_box.face_planes();
        let offsets: Vec<f32> = planes.iter().map(PlaneDescriptor::offset).collect();
        assert_eq!(offsets, vec![0.75, 0.25, 0.0, 0.5, 0.1, 0.9]);
        assert_eq!(planes[2].axis().unwrap(), Axis::Y);
    }

    #[test]
    fn test_scroll_keeps_window_ordered() {
        let mut plane_box = PlaneBox::full(Vec3::ONE);
        // 11 voxels deep: one tick is 0.1
        assert!(plane_box.scroll(Axis::Z, Sign::Positive, -3.0, 11));
        let [min, max] = plane_box.window(Axis::Z);
        assert_eq!(min, 0.0);
        assert!((max - 0.7).abs() < 1e-6);

        assert!(plane_box.scroll(Axis::Z, Sign::Positive, -20.0, 11));
        assert_eq!(plane_box.window(Axis::Z), [0.0, 0.0]);
        assert!(!plane_box.scroll(Axis::Z, Sign::Positive, -1.0, 11));

        assert!(plane_box.scroll(Axis::Z, Sign::Negative, -20.0, 11));
        assert_eq!(plane_box.window(Axis::Z), [1.0, 1.0]);
        assert_eq!(plane_box.revision(), 3);
    }

    #[test]
    fn test_pick_face() {
        let plane_box = PlaneBox::full(Vec3::ONE);
        let pick = plane_box.resolve_triangle(0, 7).unwrap();
        assert_eq!(pick.face, FaceOrientation::new(Axis::Y, Sign::Positive));
        assert!(plane_box.resolve_triangle(0, 12).is_none());
        assert!(plane_box.resolve_triangle(1, 0).is_none());
    }
}
