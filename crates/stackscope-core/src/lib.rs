//! Core abstractions for stackscope.
//!
//! This crate provides the value types shared by the volume engine:
//! - [`StackscopeError`] and the crate-wide [`Result`] alias
//! - [`VolumeOptions`] and the quality preset table
//! - [`Axis`], [`Sign`], [`FaceOrientation`] and [`CellId`] for addressing cells
//! - [`PlaneDescriptor`] for requesting slice textures
//! - [`PickResult`] for tracing triangles back to cells

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod axis;
pub mod error;
pub mod options;
pub mod pick;
pub mod plane;

pub use axis::{Axis, CellId, FaceOrientation, Sign};
pub use error::{Result, StackscopeError};
pub use options::{
    CachePolicy, DrawOrderConfig, MeshLayout, QualityLevel, VolumeOptions, DEFAULT_ASPECT_RATIO,
    DEFAULT_SUBCUBE_SIZE, DEFAULT_VERTEX_CEILING, VERTICES_PER_CELL,
};
pub use pick::{PickResult, Pickable};
pub use plane::{PlaneDescriptor, PLANE_SQR_EPSILON};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec2, Vec3};
