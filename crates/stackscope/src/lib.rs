//! stackscope: explore image stacks as peelable, sliceable 3D volumes.
//!
//! A dataset is a directory of same-sized layer images (for example a CT or
//! microscopy stack). stackscope turns it into a grid of textured cells that
//! can be peeled away layer by layer from any side, carved cell by cell, and
//! drawn back to front from any viewpoint.
//!
//! # Quick Start
//!
//! ```no_run
//! use stackscope::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut viewer = VolumeViewer::open("datasets/kidney", VolumeOptions::default())?;
//!
//!     // Peel two cell layers off the top
//!     viewer.scroll(Axis::Y, Sign::Positive, 2);
//!
//!     // Order the submeshes for a camera looking down
//!     viewer.update_camera(Vec3::NEG_Y);
//!     for draw in viewer.sorted_draws() {
//!         let texture = viewer.submesh_texture(draw.partition, draw.submesh)?;
//!         println!("{:?} layer {} -> {}x{}", draw.axis, draw.layer, texture.width(), texture.height());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layouts
//!
//! - [`MeshLayout::Cuboid`]: cells of `subcube_size` voxels, split into
//!   partitions under a vertex ceiling. Supports erosion, carving and draw
//!   ordering.
//! - [`MeshLayout::PlaneBox`]: a single box whose six faces show the slices
//!   at the edges of a shrinking window.

// Conversions between voxel counts and scroll amounts
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod dataset;
mod init;
mod viewer;

pub use dataset::{
    layer_files, load_dataset_dir, load_dataset_dir_with_aspect, read_aspect_ratio, Dataset,
    ASPECT_RATIO_FILE, LAYER_EXTENSIONS,
};
pub use init::{init_logging, init_logging_with_default};
pub use viewer::{mesh_extents, VolumeViewer};

// Re-export core types
pub use stackscope_core::{
    Axis, CachePolicy, CellId, DrawOrderConfig, FaceOrientation, MeshLayout, PickResult, Pickable,
    PlaneDescriptor, QualityLevel, Result, Sign, StackscopeError, UVec3, Vec2, Vec3,
    VolumeOptions, DEFAULT_ASPECT_RATIO, DEFAULT_SUBCUBE_SIZE, DEFAULT_VERTEX_CEILING,
    VERTICES_PER_CELL,
};

// Re-export the volume engine
pub use stackscope_structures::{
    main_axis_and_sign, plan_partitions, CellGrid, DrawOrderPlanner, DrawPlan, ErosionController,
    ErosionUpdate, MeshPartition, PartitionLayout, PlaneBox, RebuildReport, SliceCache,
    SliceSource, Submesh, SubmeshDraw, VolumeMesh, VolumeMeshBuilder, VoxelVolume,
};

// Pixel buffers handed out by the slice cache
pub use image::{Rgba, RgbaImage};
