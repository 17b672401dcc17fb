//! Axis-aligned plane descriptors used to request and cache slice textures.
//!
//! A plane is a unit normal plus a normalized offset in `[0, 1]` along that
//! normal, measured across the whole volume. Only the three positive axis
//! normals are resolvable; anything else is rejected.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::{Result, StackscopeError};

/// Squared tolerance used when comparing plane normals and offsets.
pub const PLANE_SQR_EPSILON: f32 = 1e-8;

/// A plane through the volume, identified by normal and normalized offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneDescriptor {
    /// Unit normal of the plane.
    normal: Vec3,
    /// Position along the normal, 0 at the low end of the volume and 1 at the high end.
    offset: f32,
}

impl PlaneDescriptor {
    /// Creates a plane from a raw normal and offset.
    ///
    /// The normal is stored as given; resolution happens in [`PlaneDescriptor::axis`].
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Creates the plane perpendicular to `axis` at `offset`.
    pub fn for_axis(axis: Axis, offset: f32) -> Self {
        Self {
            normal: axis.unit(),
            offset,
        }
    }

    /// Returns the plane normal.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Returns the normalized offset.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Resolves the axis this plane is perpendicular to.
    ///
    /// Fails with [`StackscopeError::PlaneResolution`] for oblique or
    /// negative normals.
    pub fn axis(&self) -> Result<Axis> {
        Axis::ALL
            .into_iter()
            .find(|axis| (self.normal - axis.unit()).length_squared() < PLANE_SQR_EPSILON)
            .ok_or(StackscopeError::PlaneResolution {
                normal: self.normal,
            })
    }

    /// Approximate equality on both normal and offset.
    ///
    /// Planes produced by repeated float arithmetic drift slightly between
    /// frames, so exact equality would miss cache entries.
    pub fn approx_eq(&self, other: &PlaneDescriptor) -> bool {
        (self.normal - other.normal).length_squared() < PLANE_SQR_EPSILON
            && (self.offset - other.offset).powi(2) < PLANE_SQR_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_resolution() {
        assert_eq!(PlaneDescriptor::for_axis(Axis::Z, 0.5).axis().unwrap(), Axis::Z);
        assert_eq!(
            PlaneDescriptor::new(Vec3::new(0.0, 1.0 + 1e-6, 0.0), 0.0)
                .axis()
                .unwrap(),
            Axis::Y
        );
    }

    #[test]
    fn test_oblique_plane_rejected() {
        let plane = PlaneDescriptor::new(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.5);
        assert!(matches!(
            plane.axis(),
            Err(StackscopeError::PlaneResolution { .. })
        ));
        let flipped = PlaneDescriptor::new(Vec3::NEG_X, 0.5);
        assert!(flipped.axis().is_err());
    }

    #[test]
    fn test_approx_eq_tolerance() {
        let a = PlaneDescriptor::for_axis(Axis::X, 0.25);
        let b = PlaneDescriptor::for_axis(Axis::X, 0.25 + 1e-5);
        let c = PlaneDescriptor::for_axis(Axis::X, 0.26);
        let d = PlaneDescriptor::for_axis(Axis::Y, 0.25);
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
        assert!(!a.approx_eq(&d));
    }
}
