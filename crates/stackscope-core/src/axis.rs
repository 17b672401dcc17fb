//! Axis, sign, face orientation and cell coordinate value types.
//!
//! Cells are addressed in cell-index space: `x` runs along the image height,
//! `y` along the layer stack and `z` along the image width.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

/// One of the three volume axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the component index (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Returns the axis for a component index, wrapping modulo 3.
    #[must_use]
    pub const fn from_index(index: usize) -> Axis {
        match index % 3 {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }

    /// Returns the two remaining axes in cyclic order `(a+1, a+2)`.
    #[must_use]
    pub const fn others(self) -> (Axis, Axis) {
        (
            Axis::from_index(self.index() + 1),
            Axis::from_index(self.index() + 2),
        )
    }

    /// Returns the unit vector along this axis.
    #[must_use]
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// Returns the component of `v` along this axis.
    #[must_use]
    pub fn component(self, v: Vec3) -> f32 {
        v[self.index()]
    }

    /// Returns the component of a count vector along this axis.
    #[must_use]
    pub fn count(self, counts: UVec3) -> u32 {
        counts[self.index()]
    }
}

/// Which end of an axis: the low (negative) or high (positive) side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Negative,
    Positive,
}

impl Sign {
    /// Both signs, negative first.
    pub const BOTH: [Sign; 2] = [Sign::Negative, Sign::Positive];

    /// Returns 0 for negative and 1 for positive.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Sign::Negative => 0,
            Sign::Positive => 1,
        }
    }

    /// Returns the other sign.
    #[must_use]
    pub const fn opposite(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Positive => Sign::Negative,
        }
    }

    /// Sign of a scalar; zero counts as positive.
    #[must_use]
    pub fn of(value: f32) -> Sign {
        if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    /// Returns `-1.0` or `1.0`.
    #[must_use]
    pub fn as_f32(self) -> f32 {
        match self {
            Sign::Negative => -1.0,
            Sign::Positive => 1.0,
        }
    }
}

/// The outward direction of a cuboid face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceOrientation {
    pub axis: Axis,
    pub sign: Sign,
}

impl FaceOrientation {
    /// The six face orientations: -x, +x, -y, +y, -z, +z.
    pub const ALL: [FaceOrientation; 6] = [
        FaceOrientation::new(Axis::X, Sign::Negative),
        FaceOrientation::new(Axis::X, Sign::Positive),
        FaceOrientation::new(Axis::Y, Sign::Negative),
        FaceOrientation::new(Axis::Y, Sign::Positive),
        FaceOrientation::new(Axis::Z, Sign::Negative),
        FaceOrientation::new(Axis::Z, Sign::Positive),
    ];

    #[must_use]
    pub const fn new(axis: Axis, sign: Sign) -> Self {
        Self { axis, sign }
    }

    /// Returns the outward unit normal.
    #[must_use]
    pub fn normal(self) -> Vec3 {
        self.axis.unit() * self.sign.as_f32()
    }

    /// Returns the index into [`FaceOrientation::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.axis.index() * 2 + self.sign.index()
    }
}

/// A cell coordinate in the global cell grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl CellId {
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinate along `axis`.
    #[must_use]
    pub const fn get(self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Returns a copy with the coordinate along `axis` replaced.
    #[must_use]
    pub const fn with(mut self, axis: Axis, value: u32) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// Returns true if the cell lies inside a grid of `counts` cells.
    #[must_use]
    pub fn is_within(self, counts: UVec3) -> bool {
        self.x < counts.x && self.y < counts.y && self.z < counts.z
    }

    #[must_use]
    pub fn as_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }
}

impl From<UVec3> for CellId {
    fn from(v: UVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}
