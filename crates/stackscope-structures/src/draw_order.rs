//! Render priorities for the submeshes of a volume mesh.
//!
//! The cell faces are translucent, so they have to be drawn back to front.
//! Every submesh gets an integer key (lower draws first): faces perpendicular
//! to the axis the camera looks along most directly are drawn first, ordered
//! by depth, and all other faces come after them.

use glam::Vec3;
use stackscope_core::{Axis, DrawOrderConfig, PlaneDescriptor, Sign};

use crate::volume_mesh::VolumeMesh;

/// Draw parameters of one submesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmeshDraw {
    pub partition: usize,
    pub submesh: usize,
    pub axis: Axis,
    pub layer: u32,
    pub priority: i32,
    /// Plane whose slice texture the submesh shows.
    pub plane: PlaneDescriptor,
}

/// Draw parameters of every submesh for one view direction.
#[derive(Debug, Clone)]
pub struct DrawPlan {
    main_axis: Axis,
    main_sign: Sign,
    draws: Vec<SubmeshDraw>,
}

impl DrawPlan {
    /// The dominant axis and direction the plan was computed for.
    pub fn view(&self) -> (Axis, Sign) {
        (self.main_axis, self.main_sign)
    }

    /// Draws in partition and submesh order.
    pub fn draws(&self) -> &[SubmeshDraw] {
        &self.draws
    }

    /// Looks up the draw of one submesh.
    pub fn draw(&self, partition: usize, submesh: usize) -> Option<&SubmeshDraw> {
        self.draws
            .iter()
            .find(|d| d.partition == partition && d.submesh == submesh)
    }
}

/// Computes and caches [`DrawPlan`]s.
#[derive(Debug, Clone, Default)]
pub struct DrawOrderPlanner {
    config: DrawOrderConfig,
    plan: Option<DrawPlan>,
}

/// Returns the axis `dir` is most aligned with, and the sign along it.
///
/// Ties go to the lower axis; a zero component counts as positive.
pub fn main_axis_and_sign(dir: Vec3) -> (Axis, Sign) {
    let abs = dir.abs();
    let axis = if abs.x >= abs.y && abs.x >= abs.z {
        Axis::X
    } else if abs.y >= abs.z {
        Axis::Y
    } else {
        Axis::Z
    };
    (axis, Sign::of(axis.component(dir)))
}

impl DrawOrderPlanner {
    pub fn new(config: DrawOrderConfig) -> Self {
        Self { config, plan: None }
    }

    pub fn config(&self) -> &DrawOrderConfig {
        &self.config
    }

    /// Priority key of layer `layer` out of `layer_count` along `axis`.
    ///
    /// `dir_component` is the view direction's component along `axis`; it
    /// orders the layers of the stack back to front. X positions run opposite
    /// to the layer index, so its depth term is mirrored.
    pub fn priority(
        &self,
        axis: Axis,
        layer: u32,
        layer_count: u32,
        is_dominant: bool,
        dir_component: f32,
    ) -> i32 {
        let mirror = if axis == Axis::X { -1.0 } else { 1.0 };
        let span = self.config.depth_span as f32;
        let depth =
            (span * -dir_component * layer as f32 / layer_count.max(1) as f32 * mirror) as i32;
        let offset = if is_dominant {
            0
        } else {
            self.config.non_dominant_offset
        };
        self.config.base_queue + depth + self.config.depth_span + offset
    }

    /// Recomputes the plan if the dominant (axis, sign) of `dir` changed or
    /// there is no plan yet. Returns true if it recomputed.
    ///
    /// `dir` need not be unit length.
    pub fn update(&mut self, mesh: &VolumeMesh, dir: Vec3) -> bool {
        let dir = dir.normalize_or_zero();
        let view = main_axis_and_sign(dir);
        if self.plan.as_ref().is_some_and(|plan| plan.view() == view) {
            return false;
        }

        let counts = mesh.cell_counts();
        let draws = mesh
            .partitions()
            .iter()
            .enumerate()
            .flat_map(|(p, partition)| {
                partition.submeshes().iter().enumerate().map(move |(s, submesh)| (p, s, submesh))
            })
            .map(|(partition, submesh_index, submesh)| {
                let axis = submesh.axis();
                let count = axis.count(counts);
                let layer = submesh.layer();
                let offset = if count > 1 {
                    layer as f32 / (count - 1) as f32
                } else {
                    0.0
                };
                SubmeshDraw {
                    partition,
                    submesh: submesh_index,
                    axis,
                    layer,
                    priority: self.priority(axis, layer, count, axis == view.0, axis.component(dir)),
                    plane: PlaneDescriptor::for_axis(axis, offset),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "draw order recomputed for {:?} {:?} ({} submeshes)",
            view.0,
            view.1,
            draws.len()
        );
        self.plan = Some(DrawPlan {
            main_axis: view.0,
            main_sign: view.1,
            draws,
        });
        true
    }

    /// The current plan, if any.
    pub fn plan(&self) -> Option<&DrawPlan> {
        self.plan.as_ref()
    }

    /// The current draws in the order they should be issued.
    pub fn sorted(&self) -> Vec<SubmeshDraw> {
        let mut draws = self.plan.as_ref().map(|p| p.draws.clone()).unwrap_or_default();
        draws.sort_by_key(|d| (d.priority, d.partition, d.submesh));
        draws
    }

    /// Drops the current plan so the next [`DrawOrderPlanner::update`] recomputes.
    pub fn invalidate(&mut self) {
        self.plan = None;
    }
}
