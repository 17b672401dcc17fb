//! The viewer session: one volume and everything derived from it.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use image::RgbaImage;
use stackscope_core::{
    Axis, CellId, MeshLayout, PickResult, Pickable, PlaneDescriptor, QualityLevel, Result, Sign,
    StackscopeError, VolumeOptions,
};
use stackscope_structures::{
    main_axis_and_sign, CellGrid, DrawOrderPlanner, DrawPlan, ErosionController, PlaneBox,
    SliceCache, SliceSource, SubmeshDraw, VolumeMesh, VolumeMeshBuilder, VoxelVolume,
};

use crate::dataset::load_dataset_dir_with_aspect;

/// Geometry for the active [`MeshLayout`].
#[derive(Debug)]
enum Geometry {
    Cells {
        mesh: VolumeMesh,
        erosion: ErosionController,
        planner: DrawOrderPlanner,
    },
    Box(PlaneBox),
}

/// Physical size of the mesh: the image width is normalized to 2 units.
///
/// Width is applied along X and height along Z, even though cell X follows
/// the image height. Non-square layers are stretched accordingly.
pub fn mesh_extents(volume: &VoxelVolume) -> Vec3 {
    let scale = 2.0 / volume.width().max(1) as f32;
    Vec3::new(
        scale * volume.width() as f32,
        scale * volume.layer_count() as f32,
        scale * volume.height() as f32,
    )
}

/// An interactive session over one [`VoxelVolume`].
///
/// The session owns the mesh, slice cache, erosion state and draw plan, and
/// replaces them together when the volume or options change.
#[derive(Debug)]
pub struct VolumeViewer {
    options: VolumeOptions,
    volume: VoxelVolume,
    cache: SliceCache,
    geometry: Geometry,
}

impl VolumeViewer {
    /// Builds a session for `volume`.
    ///
    /// The cell grid is stretched by `options.y_aspect_ratio`, not by the
    /// volume's own aspect ratio.
    pub fn new(volume: VoxelVolume, options: VolumeOptions) -> Result<Self> {
        options.validate()?;
        let geometry = build_geometry(&volume, &options)?;
        log::info!(
            "viewer ready: {}x{}x{} voxels, {:?} layout",
            volume.height(),
            volume.layer_count(),
            volume.width(),
            options.layout
        );
        Ok(Self {
            cache: SliceCache::new(options.cache_policy),
            options,
            volume,
            geometry,
        })
    }

    /// Loads a dataset directory and builds a session for it.
    ///
    /// The dataset's aspect ratio file replaces `options.y_aspect_ratio`; the
    /// option is kept when the file is missing.
    pub fn open(path: impl AsRef<Path>, mut options: VolumeOptions) -> Result<Self> {
        let dataset = load_dataset_dir_with_aspect(path, options.y_aspect_ratio)?;
        options.y_aspect_ratio = dataset.volume.aspect_ratio_y();
        Self::new(dataset.volume, options)
    }

    /// Replaces the volume. All derived state is rebuilt before anything is
    /// swapped, so on error the session is unchanged.
    pub fn replace_volume(&mut self, volume: VoxelVolume) -> Result<()> {
        *self = Self::new(volume, self.options.clone())?;
        Ok(())
    }

    /// Rebuilds with the subcube size of a quality level (1 to 4).
    pub fn set_quality(&mut self, level: u8) -> Result<()> {
        let options = self
            .options
            .clone()
            .with_quality(QualityLevel::from_level(level)?);
        self.set_options(options)
    }

    /// Applies new options, rebuilding the geometry.
    ///
    /// Erosion and carving are reset and the slice cache is cleared. With the
    /// cuboid layout, partitions whose shape did not change keep their buffers.
    pub fn set_options(&mut self, options: VolumeOptions) -> Result<()> {
        options.validate()?;

        let rebuilt_in_place = match &mut self.geometry {
            Geometry::Cells {
                mesh,
                erosion,
                planner,
            } if options.layout == MeshLayout::Cuboid => {
                let grid = cell_grid(&self.volume, &options)?;
                let builder = VolumeMeshBuilder::from_options(&options)?;
                builder.rebuild(mesh, grid, mesh_extents(&self.volume))?;
                *erosion = ErosionController::for_mesh(mesh);
                *planner = DrawOrderPlanner::new(options.draw_order);
                true
            }
            _ => false,
        };
        if !rebuilt_in_place {
            self.geometry = build_geometry(&self.volume, &options)?;
        }

        self.cache.set_policy(options.cache_policy);
        self.cache.invalidate_all();
        self.options = options;
        Ok(())
    }

    pub fn options(&self) -> &VolumeOptions {
        &self.options
    }

    pub fn volume(&self) -> &VoxelVolume {
        &self.volume
    }

    /// The cell mesh, if the cuboid layout is active.
    pub fn mesh(&self) -> Option<&VolumeMesh> {
        match &self.geometry {
            Geometry::Cells { mesh, .. } => Some(mesh),
            Geometry::Box(_) => None,
        }
    }

    /// The plane box, if that layout is active.
    pub fn plane_box(&self) -> Option<&PlaneBox> {
        match &self.geometry {
            Geometry::Box(plane_box) => Some(plane_box),
            Geometry::Cells { .. } => None,
        }
    }

    pub fn erosion(&self) -> Option<&ErosionController> {
        match &self.geometry {
            Geometry::Cells { erosion, .. } => Some(erosion),
            Geometry::Box(_) => None,
        }
    }

    pub fn cache(&self) -> &SliceCache {
        &self.cache
    }

    /// Peels (`delta > 0`) or restores (`delta < 0`) layers on one side.
    ///
    /// With the cuboid layout `delta` counts cells, with the plane box it
    /// counts voxels. Returns true if anything changed.
    pub fn scroll(&mut self, axis: Axis, sign: Sign, delta: i32) -> bool {
        match &mut self.geometry {
            Geometry::Cells { mesh, erosion, .. } => {
                erosion.scroll(mesh, axis, sign, delta).is_some()
            }
            Geometry::Box(plane_box) => {
                plane_box.scroll(axis, sign, -(delta as f32), self.volume.extent(axis))
            }
        }
    }

    /// Scrolls the side of the volume facing a camera looking along `camera_dir`.
    pub fn scroll_toward_view(&mut self, camera_dir: Vec3, ticks: i32) -> bool {
        let (axis, sign) = main_axis_and_sign(camera_dir);
        self.scroll(axis, sign.opposite(), ticks)
    }

    /// Updates the draw order for a new camera direction (in mesh space).
    ///
    /// Returns true if the plan was recomputed.
    pub fn update_camera(&mut self, camera_dir: Vec3) -> bool {
        match &mut self.geometry {
            Geometry::Cells { mesh, planner, .. } => planner.update(mesh, camera_dir),
            Geometry::Box(_) => false,
        }
    }

    /// The current draw plan, if [`VolumeViewer::update_camera`] has run.
    pub fn draw_plan(&self) -> Option<&DrawPlan> {
        match &self.geometry {
            Geometry::Cells { planner, .. } => planner.plan(),
            Geometry::Box(_) => None,
        }
    }

    /// Draws in submission order.
    pub fn sorted_draws(&self) -> Vec<SubmeshDraw> {
        match &self.geometry {
            Geometry::Cells { planner, .. } => planner.sorted(),
            Geometry::Box(_) => Vec::new(),
        }
    }

    /// Returns the slice texture for a plane, from the cache when possible.
    pub fn texture_for(&mut self, plane: &PlaneDescriptor) -> Result<Arc<RgbaImage>> {
        self.cache.texture_for(&self.volume, plane)
    }

    /// Returns the texture a submesh shows.
    pub fn submesh_texture(&mut self, partition: usize, submesh: usize) -> Result<Arc<RgbaImage>> {
        let plane = self.submesh_plane(partition, submesh)?;
        self.texture_for(&plane)
    }

    /// Plane whose slice a submesh shows.
    pub fn submesh_plane(&self, partition: usize, submesh: usize) -> Result<PlaneDescriptor> {
        let missing = StackscopeError::SubmeshOutOfRange { partition, submesh };
        match &self.geometry {
            Geometry::Cells { mesh, .. } => {
                let sub = mesh
                    .partition(partition)
                    .and_then(|p| p.submeshes().get(submesh))
                    .ok_or(missing)?;
                let count = sub.axis().count(mesh.cell_counts());
                let offset = if count > 1 {
                    sub.layer() as f32 / (count - 1) as f32
                } else {
                    0.0
                };
                Ok(PlaneDescriptor::for_axis(sub.axis(), offset))
            }
            Geometry::Box(plane_box) => {
                if partition != 0 {
                    return Err(missing);
                }
                plane_box.face_planes().get(submesh).copied().ok_or(missing)
            }
        }
    }

    /// Resolves a hit triangle (flat index across the partition's submeshes).
    pub fn pick(&self, partition: usize, triangle: usize) -> Result<PickResult> {
        let pick = match &self.geometry {
            Geometry::Cells { mesh, .. } => mesh.resolve_triangle(partition, triangle),
            Geometry::Box(plane_box) => plane_box.resolve_triangle(partition, triangle),
        };
        pick.ok_or(StackscopeError::TriangleOutOfRange {
            partition,
            triangle,
        })
    }

    /// Carves out the cell owning a hit triangle and returns it.
    pub fn carve_at(&mut self, partition: usize, triangle: usize) -> Result<CellId> {
        let pick = self.pick(partition, triangle)?;
        match &mut self.geometry {
            Geometry::Cells { mesh, erosion, .. } => {
                erosion.carve_cell(mesh, pick.cell)?;
                Ok(pick.cell)
            }
            Geometry::Box(_) => Err(StackscopeError::UnsupportedLayout("carving")),
        }
    }

    /// Carves every visible cell touching a sphere given in mesh space.
    pub fn carve_sphere(&mut self, center: Vec3, radius: f32) -> Result<Vec<CellId>> {
        match &mut self.geometry {
            Geometry::Cells { mesh, erosion, .. } => Ok(erosion.carve_sphere(mesh, center, radius)),
            Geometry::Box(_) => Err(StackscopeError::UnsupportedLayout("carving")),
        }
    }

    /// Brings back every carved cell still inside the erosion window.
    pub fn restore_carved(&mut self) -> usize {
        match &mut self.geometry {
            Geometry::Cells { mesh, erosion, .. } => erosion.restore_carved(mesh),
            Geometry::Box(_) => 0,
        }
    }
}

fn cell_grid(volume: &VoxelVolume, options: &VolumeOptions) -> Result<CellGrid> {
    CellGrid::from_volume(volume, options.subcube_size, options.y_aspect_ratio)
}

fn build_geometry(volume: &VoxelVolume, options: &VolumeOptions) -> Result<Geometry> {
    let extents = mesh_extents(volume);
    match options.layout {
        MeshLayout::Cuboid => {
            let grid = cell_grid(volume, options)?;
            let mesh = VolumeMeshBuilder::from_options(options)?.build(grid, extents)?;
            Ok(Geometry::Cells {
                erosion: ErosionController::for_mesh(&mesh),
                planner: DrawOrderPlanner::new(options.draw_order),
                mesh,
            })
        }
        MeshLayout::PlaneBox => Ok(Geometry::Box(PlaneBox::full(extents))),
    }
}
