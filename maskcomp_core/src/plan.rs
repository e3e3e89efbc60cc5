// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: an ordered sequence of draw items for one view of one layer.

use crate::transform::Transform3d;

/// A single draw command in the render plan.
///
/// Items are produced in plane array order. The mask layer has no depth test
/// between items, so order only matters for overlapping colors.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    /// Index of the mask plane this item originates from.
    pub plane_index: usize,
    /// Model transform (plane space to world space).
    pub model: Transform3d,
    /// View transform (world space to eye space).
    pub view: Transform3d,
    /// Projection transform (eye space to clip space).
    pub projection: Transform3d,
    /// Fragment color written into the target.
    pub color: [f32; 4],
}

impl DrawItem {
    /// Combined `projection · view · model` transform.
    #[must_use]
    pub fn model_view_projection(&self) -> Transform3d {
        self.projection * self.view * self.model
    }
}

/// An ordered list of draw commands for a single view.
///
/// Backends translate this into GPU draw calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPlan {
    /// Target view index.
    pub view_index: usize,
    /// Draw items in submission order.
    pub items: Vec<DrawItem>,
}

impl RenderPlan {
    /// Creates an empty render plan for the given view.
    #[must_use]
    pub fn new(view_index: usize) -> Self {
        Self {
            view_index,
            items: Vec::new(),
        }
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns `true` if no items have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
