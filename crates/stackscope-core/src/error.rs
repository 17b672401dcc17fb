//! Error types for stackscope.

use std::path::PathBuf;

use glam::Vec3;
use thiserror::Error;

/// The main error type for stackscope operations.
#[derive(Error, Debug)]
pub enum StackscopeError {
    /// The dataset contained no layer images.
    #[error("dataset contains no layer images")]
    EmptyDataset,

    /// A layer image does not share the dimensions of the first layer.
    #[error("layer {layer} is {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    DimensionMismatch {
        layer: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The configured vertex ceiling cannot hold the requested geometry.
    #[error("{required} vertices required but the per-mesh ceiling is {ceiling}")]
    CapacityExceeded { required: usize, ceiling: usize },

    /// A plane is not aligned with one of the three volume axes.
    #[error("plane normal {normal} is not axis-aligned")]
    PlaneResolution { normal: Vec3 },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The quality level has no subcube size preset.
    #[error("unknown quality level {0}")]
    UnknownQualityLevel(u8),

    /// A cell coordinate lies outside the cell grid.
    #[error("cell ({x}, {y}, {z}) is outside the cell grid")]
    CellOutOfRange { x: u32, y: u32, z: u32 },

    /// A triangle index does not belong to the given partition.
    #[error("triangle {triangle} not found in partition {partition}")]
    TriangleOutOfRange { partition: usize, triangle: usize },

    /// A submesh index does not exist in the current geometry.
    #[error("submesh {submesh} not found in partition {partition}")]
    SubmeshOutOfRange { partition: usize, submesh: usize },

    /// The operation is not available with the current mesh layout.
    #[error("{0} is not supported by the plane box layout")]
    UnsupportedLayout(&'static str),

    /// A layer image could not be decoded.
    #[error("failed to decode '{}': {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for stackscope operations.
pub type Result<T> = std::result::Result<T, StackscopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = StackscopeError::DimensionMismatch {
            layer: 3,
            expected: (128, 64),
            actual: (64, 64),
        };
        assert_eq!(err.to_string(), "layer 3 is 64x64, expected 128x64");
    }

    #[test]
    fn test_capacity_message() {
        let err = StackscopeError::CapacityExceeded {
            required: 96,
            ceiling: 48,
        };
        assert!(err.to_string().contains("ceiling is 48"));
    }
}
