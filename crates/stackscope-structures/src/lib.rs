//! Volume engine for stackscope.
//!
//! This crate turns a stack of layer images into viewable geometry:
//! - [`VoxelVolume`]: the layer stack and axis-aligned slice resampling
//! - [`SliceCache`]: memoized slice textures keyed by plane
//! - [`VolumeMeshBuilder`]: partitioned cuboid-cell meshes and the plane box
//! - [`ErosionController`]: peeling and carving cells
//! - [`DrawOrderPlanner`]: back-to-front render priorities

// Geometry code converts freely between cell indices, counts and fractions
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod draw_order;
pub mod erosion;
pub mod slice_cache;
pub mod volume_mesh;
pub mod voxel_volume;

pub use draw_order::{main_axis_and_sign, DrawOrderPlanner, DrawPlan, SubmeshDraw};
pub use erosion::{ErosionController, ErosionUpdate};
pub use slice_cache::SliceCache;
pub use volume_mesh::{
    plan_partitions, CellGrid, MeshPartition, PartitionLayout, PlaneBox, RebuildReport, Submesh,
    VolumeMesh, VolumeMeshBuilder, TRIANGLES_PER_CELL_AXIS,
};
pub use voxel_volume::{SliceSource, VoxelVolume};
