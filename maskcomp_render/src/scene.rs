// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenes rendered into layer views.

use maskcomp_core::plan::{DrawItem, RenderPlan};
use maskcomp_core::runtime::{FrameInfo, ViewInfo};
use maskcomp_core::state::{NUM_MASK_PLANES, PlaneConfig};
use maskcomp_core::transform::Transform3d;

/// Something that can be drawn into the views of a layer.
pub trait Scene {
    /// Advances scene state for a new frame.
    ///
    /// The default implementation does nothing.
    fn update(&mut self, frame: &FrameInfo) {
        let _ = frame;
    }

    /// Appends draw items for one view to `plan`.
    fn render(&self, view_index: usize, view: &ViewInfo, plan: &mut RenderPlan);
}

#[derive(Clone, Debug, PartialEq)]
struct ScenePlane {
    enabled: bool,
    model: Transform3d,
    color: [f32; 4],
}

impl Default for ScenePlane {
    fn default() -> Self {
        Self {
            enabled: false,
            model: Transform3d::IDENTITY,
            color: [1.0; 4],
        }
    }
}

/// Mask planes drawn as flat colored quads.
#[derive(Clone, Debug, Default)]
pub struct MaskScene {
    planes: [ScenePlane; NUM_MASK_PLANES],
}

impl MaskScene {
    /// Creates a scene with every plane disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the plane array.
    ///
    /// Tracking planes without a bound marker are disabled.
    pub fn update_planes(&mut self, configs: &[PlaneConfig; NUM_MASK_PLANES]) {
        for (plane, config) in self.planes.iter_mut().zip(configs) {
            plane.enabled = config.is_rendered();
            plane.model = config.model_transform();
            plane.color = config.color;
        }
    }

    /// Number of planes that will be drawn.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.planes.iter().filter(|p| p.enabled).count()
    }
}

impl Scene for MaskScene {
    fn render(&self, _view_index: usize, view: &ViewInfo, plan: &mut RenderPlan) {
        for (plane_index, plane) in self.planes.iter().enumerate() {
            if !plane.enabled {
                continue;
            }
            plan.items.push(DrawItem {
                plane_index,
                model: plane.model,
                view: view.view,
                projection: view.projection,
                color: plane.color,
            });
        }
    }
}
