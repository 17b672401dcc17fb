//! Configuration options for volume construction.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackscopeError};

/// Vertices owned by one cell: three copies of its eight corners.
pub const VERTICES_PER_CELL: usize = 24;

/// Default per-mesh vertex ceiling (16-bit index buffers).
pub const DEFAULT_VERTEX_CEILING: usize = 65_536;

/// Vertical stretch applied when a dataset carries no aspect ratio.
pub const DEFAULT_ASPECT_RATIO: f32 = 2.8;

/// Default voxels per cell edge.
pub const DEFAULT_SUBCUBE_SIZE: u32 = 64;

/// Options controlling how a volume is meshed, cached and ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeOptions {
    /// Voxels per cell edge. Smaller values give a finer mesh and more partitions.
    pub subcube_size: u32,

    /// Vertical stretch factor applied to the layer axis.
    pub y_aspect_ratio: f32,

    /// Maximum number of vertices in a single mesh partition.
    pub vertex_ceiling: usize,

    /// Geometry layout.
    pub layout: MeshLayout,

    /// Slice texture cache retention.
    pub cache_policy: CachePolicy,

    /// Render-priority parameters.
    pub draw_order: DrawOrderConfig,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            subcube_size: DEFAULT_SUBCUBE_SIZE,
            y_aspect_ratio: DEFAULT_ASPECT_RATIO,
            vertex_ceiling: DEFAULT_VERTEX_CEILING,
            layout: MeshLayout::Cuboid,
            cache_policy: CachePolicy::RetainAll,
            draw_order: DrawOrderConfig::default(),
        }
    }
}

impl VolumeOptions {
    /// Returns options using the subcube size preset of a quality level.
    pub fn with_quality(mut self, level: QualityLevel) -> Self {
        self.subcube_size = level.subcube_size();
        self
    }

    /// Checks every knob before any buffer is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.subcube_size == 0 {
            return Err(StackscopeError::InvalidConfig(
                "subcube_size must be at least 1".into(),
            ));
        }
        if !(self.y_aspect_ratio.is_finite() && self.y_aspect_ratio > 0.0) {
            return Err(StackscopeError::InvalidConfig(format!(
                "y_aspect_ratio must be positive, got {}",
                self.y_aspect_ratio
            )));
        }
        if self.vertex_ceiling < VERTICES_PER_CELL {
            return Err(StackscopeError::CapacityExceeded {
                required: VERTICES_PER_CELL,
                ceiling: self.vertex_ceiling,
            });
        }
        if let CachePolicy::Bounded { max_entries: 0 } = self.cache_policy {
            return Err(StackscopeError::InvalidConfig(
                "bounded cache needs at least one entry".into(),
            ));
        }
        self.draw_order.validate()
    }

    /// Parses options from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How the volume is turned into geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MeshLayout {
    /// A grid of cuboid cells split into vertex-bounded partitions.
    #[default]
    Cuboid,
    /// A single box with one textured plane per face.
    PlaneBox,
}

/// Retention policy of the slice texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CachePolicy {
    /// Keep every slice for the lifetime of the loaded dataset.
    #[default]
    RetainAll,
    /// Keep at most `max_entries` slices, evicting the least recently used.
    Bounded { max_entries: usize },
}

/// Parameters of the render-priority keys assigned to submeshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOrderConfig {
    /// Queue value every key is offset from.
    pub base_queue: i32,
    /// Half-width of the per-slice depth term.
    pub depth_span: i32,
    /// Added to every submesh not on the dominant axis.
    pub non_dominant_offset: i32,
}

impl Default for DrawOrderConfig {
    fn default() -> Self {
        Self {
            base_queue: 3000,
            depth_span: 2000,
            non_dominant_offset: 4000,
        }
    }
}

impl DrawOrderConfig {
    /// The depth term spans `2 * depth_span`; a smaller offset would let the
    /// dominant stack interleave with the others.
    pub fn validate(&self) -> Result<()> {
        if self.depth_span <= 0 {
            return Err(StackscopeError::InvalidConfig(
                "depth_span must be positive".into(),
            ));
        }
        if self.non_dominant_offset < 2 * self.depth_span {
            return Err(StackscopeError::InvalidConfig(format!(
                "non_dominant_offset {} is below twice the depth span {}",
                self.non_dominant_offset, self.depth_span
            )));
        }
        Ok(())
    }
}

/// Load quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLevel {
    Coarse,
    Medium,
    Fine,
    Finest,
}

impl QualityLevel {
    /// Resolves a numeric level (1 to 4).
    pub fn from_level(level: u8) -> Result<Self> {
        match level {
            1 => Ok(Self::Coarse),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Fine),
            4 => Ok(Self::Finest),
            other => Err(StackscopeError::UnknownQualityLevel(other)),
        }
    }

    /// Voxels per cell edge for this level.
    pub fn subcube_size(self) -> u32 {
        match self {
            Self::Coarse => 70,
            Self::Medium => 50,
            Self::Fine => 30,
            Self::Finest => 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = VolumeOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.vertex_ceiling, 65_536);
        assert!((options.y_aspect_ratio - 2.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_quality_presets() {
        let sizes: Vec<u32> = (1..=4)
            .map(|l| QualityLevel::from_level(l).unwrap().subcube_size())
            .collect();
        assert_eq!(sizes, vec![70, 50, 30, 20]);
        assert!(matches!(
            QualityLevel::from_level(5),
            Err(StackscopeError::UnknownQualityLevel(5))
        ));
        let options = VolumeOptions::default().with_quality(QualityLevel::Fine);
        assert_eq!(options.subcube_size, 30);
    }

    #[test]
    fn test_ceiling_below_one_cell() {
        let options = VolumeOptions {
            vertex_ceiling: 23,
            ..VolumeOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(StackscopeError::CapacityExceeded {
                required: 24,
                ceiling: 23
            })
        ));
    }

    #[test]
    fn test_invalid_scalars() {
        let zero = VolumeOptions {
            subcube_size: 0,
            ..VolumeOptions::default()
        };
        assert!(zero.validate().is_err());

        let negative = VolumeOptions {
            y_aspect_ratio: -1.0,
            ..VolumeOptions::default()
        };
        assert!(negative.validate().is_err());

        let overlapping = VolumeOptions {
            draw_order: DrawOrderConfig {
                non_dominant_offset: 3000,
                ..DrawOrderConfig::default()
            },
            ..VolumeOptions::default()
        };
        assert!(overlapping.validate().is_err());
    }

    #[test]
    fn test_json_partial_fields() {
        let options =
            VolumeOptions::from_json_str(r#"{ "subcube_size": 20, "layout": "PlaneBox" }"#)
                .unwrap();
        assert_eq!(options.subcube_size, 20);
        assert_eq!(options.layout, MeshLayout::PlaneBox);
        assert_eq!(options.vertex_ceiling, DEFAULT_VERTEX_CEILING);

        let text = options.to_json_string().unwrap();
        assert_eq!(VolumeOptions::from_json_str(&text).unwrap(), options);
    }
}
