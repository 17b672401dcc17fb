//! Voxel volume built from an ordered stack of layer images.
//!
//! Layer `i` of the stack is the Y-layer `i`; inside a layer, rows run along
//! the X axis of the volume and columns along Z. Buffers are kept in texture
//! row order (row 0 is the first row uploaded to the GPU, which is the bottom
//! of the source image once the dataset loader has flipped it).

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use stackscope_core::{Axis, PlaneDescriptor, Result, StackscopeError};

/// Anything that can produce axis-aligned slices of a volume.
///
/// [`crate::SliceCache`] only talks to volumes through this trait.
pub trait SliceSource {
    /// Number of distinct slices along `axis`.
    fn extent(&self, axis: Axis) -> u32;

    /// Resamples the slice at `index` along `axis`.
    ///
    /// `index` must be below [`SliceSource::extent`]. Indices computed by
    /// [`SliceSource::index_for`] always are.
    fn sample_slice(&self, axis: Axis, index: u32) -> Arc<RgbaImage>;

    /// Converts a normalized offset into a slice index.
    ///
    /// The offset runs from the low to the high end of the mesh frame. X and Y
    /// are stored in the opposite direction to that frame (image rows and the
    /// layer stack both run top-down), so their offsets are inverted first.
    /// Rounds half up.
    fn index_for(&self, axis: Axis, offset: f32) -> u32 {
        let extent = self.extent(axis).max(1);
        let offset = offset.clamp(0.0, 1.0);
        let directed = match axis {
            Axis::X | Axis::Y => 1.0 - offset,
            Axis::Z => offset,
        };
        let index = (directed * (extent - 1) as f32 + 0.5).floor() as u32;
        index.min(extent - 1)
    }
}

/// An immutable 3D voxel field, one RGBA image per Y-layer.
#[derive(Debug, Clone)]
pub struct VoxelVolume {
    layers: Vec<Arc<RgbaImage>>,
    width: u32,
    height: u32,
    aspect_ratio_y: f32,
}

impl VoxelVolume {
    /// Builds a volume from decoded layers.
    ///
    /// Fails with [`StackscopeError::EmptyDataset`] when `layers` is empty and
    /// with [`StackscopeError::DimensionMismatch`] when any layer differs in
    /// size from the first.
    pub fn load(layers: Vec<RgbaImage>, aspect_ratio_y: f32) -> Result<Self> {
        Self::from_shared(layers.into_iter().map(Arc::new).collect(), aspect_ratio_y)
    }

    /// Builds a volume from already shared layers.
    pub fn from_shared(layers: Vec<Arc<RgbaImage>>, aspect_ratio_y: f32) -> Result<Self> {
        let first = layers.first().ok_or(StackscopeError::EmptyDataset)?;
        let expected = first.dimensions();

        if let Some((layer, img)) = layers
            .iter()
            .enumerate()
            .find(|(_, img)| img.dimensions() != expected)
        {
            return Err(StackscopeError::DimensionMismatch {
                layer,
                expected,
                actual: img.dimensions(),
            });
        }

        log::debug!(
            "voxel volume: {} layers of {}x{}",
            layers.len(),
            expected.0,
            expected.1
        );

        Ok(Self {
            width: expected.0,
            height: expected.1,
            layers,
            aspect_ratio_y,
        })
    }

    /// Image width, the Z extent.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height, the X extent.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers, the Y extent.
    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Vertical stretch factor of the layer axis.
    pub fn aspect_ratio_y(&self) -> f32 {
        self.aspect_ratio_y
    }

    /// Returns one layer image.
    pub fn layer(&self, index: usize) -> Option<&Arc<RgbaImage>> {
        self.layers.get(index)
    }

    /// Returns the voxel at (`layer`, `row`, `column`).
    pub fn voxel(&self, layer: u32, row: u32, column: u32) -> Option<Rgba<u8>> {
        let img = self.layers.get(layer as usize)?;
        (row < self.height && column < self.width).then(|| *img.get_pixel(column, row))
    }

    /// Resamples the slice described by `plane`.
    ///
    /// Fails with [`StackscopeError::PlaneResolution`] for planes that are not
    /// perpendicular to one of the three axes.
    pub fn sample_plane(&self, plane: &PlaneDescriptor) -> Result<Arc<RgbaImage>> {
        let axis = plane.axis()?;
        Ok(self.sample_slice(axis, self.index_for(axis, plane.offset())))
    }

    /// Gathers row `row` of every layer; layer `i` lands on output row `n-1-i`.
    fn gather_rows(&self, row: u32) -> RgbaImage {
        let n = self.layer_count();
        let row_len = self.width as usize * 4;
        let start = row as usize * row_len;
        let mut out = RgbaImage::new(self.width, n);
        let dst: &mut [u8] = &mut out;
        for (i, layer) in self.layers.iter().enumerate() {
            let dst_row = (n as usize - 1 - i) * row_len;
            dst[dst_row..dst_row + row_len].copy_from_slice(&layer.as_raw()[start..start + row_len]);
        }
        out
    }

    /// Gathers column `column` of every layer, read bottom to top, into output row `n-1-i`.
    fn gather_columns(&self, column: u32) -> RgbaImage {
        let n = self.layer_count();
        let mut out = RgbaImage::new(self.height, n);
        for (i, layer) in self.layers.iter().enumerate() {
            let dst_row = n - 1 - i as u32;
            for row in 0..self.height {
                out.put_pixel(row, dst_row, *layer.get_pixel(column, row));
            }
        }
        out
    }
}

impl SliceSource for VoxelVolume {
    fn extent(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.height,
            Axis::Y => self.layer_count(),
            Axis::Z => self.width,
        }
    }

    /// Y slices are the stored layers and are shared, not copied. X and Z
    /// slices are assembled from one row (or column) of every layer.
    fn sample_slice(&self, axis: Axis, index: u32) -> Arc<RgbaImage> {
        debug_assert!(
            index < self.extent(axis),
            "{axis:?} slice {index} out of range (extent {})",
            self.extent(axis)
        );
        let index = index.min(self.extent(axis).saturating_sub(1));
        match axis {
            Axis::Y => Arc::clone(&self.layers[index as usize]),
            Axis::X => Arc::new(self.gather_rows(index)),
            Axis::Z => Arc::new(self.gather_columns(index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// Layer `l` holds pixel `(c, r)` = `[l, r, c, 255]`.
    fn coded_volume(width: u32, height: u32, layers: u32) -> VoxelVolume {
        let images = (0..layers)
            .map(|l| RgbaImage::from_fn(width, height, |c, r| Rgba([l as u8, r as u8, c as u8, 255])))
            .collect();
        VoxelVolume::load(images, 2.0).unwrap()
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            VoxelVolume::load(Vec::new(), 1.0),
            Err(StackscopeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let images = vec![RgbaImage::new(4, 4), RgbaImage::new(4, 4), RgbaImage::new(4, 3)];
        match VoxelVolume::load(images, 1.0) {
            Err(StackscopeError::DimensionMismatch {
                layer,
                expected,
                actual,
            }) => {
                assert_eq!(layer, 2);
                assert_eq!(expected, (4, 4));
                assert_eq!(actual, (4, 3));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_extents() {
        let volume = coded_volume(6, 5, 3);
        assert_eq!(volume.extent(Axis::X), 5);
        assert_eq!(volume.extent(Axis::Y), 3);
        assert_eq!(volume.extent(Axis::Z), 6);
        assert_eq!(volume.voxel(2, 4, 5), Some(Rgba([2, 4, 5, 255])));
        assert_eq!(volume.voxel(3, 0, 0), None);
    }

    #[test]
    fn test_index_inverts_x_and_y() {
        let volume = coded_volume(11, 11, 11);
        assert_eq!(volume.index_for(Axis::X, 0.0), 10);
        assert_eq!(volume.index_for(Axis::X, 1.0), 0);
        assert_eq!(volume.index_for(Axis::Y, 0.0), 10);
        assert_eq!(volume.index_for(Axis::Z, 0.0), 0);
        assert_eq!(volume.index_for(Axis::Z, 1.0), 10);
        // 0.25 * 10 = 2.5 rounds up
        assert_eq!(volume.index_for(Axis::Z, 0.25), 3);
        assert_eq!(volume.index_for(Axis::Z, 7.0), 10);
    }

    #[test]
    fn test_y_slice_is_shared() {
        let volume = coded_volume(4, 4, 3);
        let slice = volume.sample_slice(Axis::Y, 1);
        assert!(Arc::ptr_eq(&slice, volume.layer(1).unwrap()));
    }

    #[test]
    fn test_x_slice_layout() {
        let volume = coded_volume(4, 3, 5);
        let slice = volume.sample_slice(Axis::X, 2);
        assert_eq!(slice.dimensions(), (4, 5));
        for i in 0..5u32 {
            for c in 0..4u32 {
                // layer i lands on row n-1-i
                assert_eq!(*slice.get_pixel(c, 4 - i), Rgba([i as u8, 2, c as u8, 255]));
            }
        }
    }

    #[test]
    fn test_z_slice_layout() {
        let volume = coded_volume(4, 3, 5);
        let slice = volume.sample_slice(Axis::Z, 1);
        assert_eq!(slice.dimensions(), (3, 5));
        for i in 0..5u32 {
            for r in 0..3u32 {
                assert_eq!(*slice.get_pixel(r, 4 - i), Rgba([i as u8, r as u8, 1, 255]));
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_slice_index_past_extent() {
        let volume = coded_volume(4, 3, 5);
        volume.sample_slice(Axis::Z, 4);
    }

    #[test]
    fn test_sample_plane() {
        let volume = coded_volume(4, 3, 5);
        let top = volume
            .sample_plane(&PlaneDescriptor::for_axis(Axis::Y, 1.0))
            .unwrap();
        assert!(Arc::ptr_eq(&top, volume.layer(0).unwrap()));

        let oblique = PlaneDescriptor::new(Vec3::new(0.0, 1.0, 1.0).normalize(), 0.5);
        assert!(matches!(
            volume.sample_plane(&oblique),
            Err(StackscopeError::PlaneResolution { .. })
        ));
    }
}
