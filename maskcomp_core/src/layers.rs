// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer configuration and submission records.
//!
//! A frame consists of an ordered list of [`LayerSubmission`]s handed to
//! [`Runtime::end_frame`](crate::runtime::Runtime::end_frame). Each layer
//! carries one [`RenderPlan`] per view plus [`SubmitParams`] that control
//! how the compositor blends it. View extensions are typed records chained
//! onto individual views for features the base submit API does not cover.

use crate::plan::RenderPlan;
use crate::runtime::SwapchainId;
use crate::state::{DebugMode, MaskingMode};

/// Swapchain texture format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit sRGB color with alpha.
    #[default]
    R8G8B8A8Srgb,
    /// 8-bit single-channel alpha (mask only).
    A8Unorm,
}

/// Index of the color layer in a two-layer view.
pub const COLOR_LAYER: usize = 0;

/// Index of the mask layer in a two-layer view.
pub const MASK_LAYER: usize = 1;

/// Resolution and format of one layer.
///
/// Context views render at `1 / context_divider` of the runtime's
/// recommended size, focus views at `1 / focus_divider`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerConfig {
    /// Divider applied to context views.
    pub context_divider: u32,
    /// Divider applied to focus views.
    pub focus_divider: u32,
    /// Swapchain format.
    pub format: TextureFormat,
}

impl LayerConfig {
    /// Full-resolution sRGB color layer.
    pub const COLOR: Self = Self {
        context_divider: 1,
        focus_divider: 1,
        format: TextureFormat::R8G8B8A8Srgb,
    };

    /// Creates a layer configuration; dividers are clamped to at least 1.
    #[must_use]
    pub fn new(context_divider: u32, focus_divider: u32, format: TextureFormat) -> Self {
        Self {
            context_divider: context_divider.max(1),
            focus_divider: focus_divider.max(1),
            format,
        }
    }

    /// Divider for the given view; the first two views are context views.
    #[inline]
    #[must_use]
    pub const fn divider_for_view(&self, view_index: usize) -> u32 {
        if view_index < 2 {
            self.context_divider
        } else {
            self.focus_divider
        }
    }
}

/// Per-view blend control for the mask layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendControlMask {
    /// Force the global VR view offset for this view.
    pub force_global_view_offset: bool,
    /// How mask coverage is interpreted.
    pub masking_mode: MaskingMode,
    /// Compositor debug visualization.
    pub debug_mode: DebugMode,
}

/// A typed record chained onto a single view of a layer submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewExtension {
    /// Mask blend control.
    BlendControlMask(BlendControlMask),
}

/// Layer depth range used for depth testing against video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthTestRange {
    /// Whether the range is applied.
    pub enabled: bool,
    /// Near limit in meters.
    pub near: f64,
    /// Far limit in meters.
    pub far: f64,
}

impl Default for DepthTestRange {
    fn default() -> Self {
        Self {
            enabled: false,
            near: 0.0,
            far: 1.5,
        }
    }
}

/// Parameters for one layer submission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmitParams {
    /// Submit color data.
    pub submit_color: bool,
    /// Submit depth data.
    pub submit_depth: bool,
    /// Depth test the layer against video.
    pub depth_test_enabled: bool,
    /// Depth range for the depth test.
    pub depth_test_range: DepthTestRange,
    /// Chroma keying for this layer.
    pub chroma_key_enabled: bool,
    /// Alpha blend the layer over layers below it.
    pub alpha_blend: bool,
    /// View extensions; entry `i` is chained onto view `i`.
    pub view_extensions: Vec<ViewExtension>,
}

/// Clear values applied before rendering into a layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearParams {
    /// RGBA clear color.
    pub color: [f32; 4],
    /// Depth clear value.
    pub depth: f32,
}

impl ClearParams {
    /// Fully transparent color, far depth.
    pub const TRANSPARENT: Self = Self {
        color: [0.0; 4],
        depth: 1.0,
    };
}

/// Per-view contents of a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSubmission {
    /// Clear applied before the plan, if any.
    pub clear: Option<ClearParams>,
    /// Draw commands for this view.
    pub plan: RenderPlan,
}

/// One layer of a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSubmission {
    /// Layer index within the view.
    pub layer_index: usize,
    /// Swapchain the layer was rendered into.
    pub swapchain: SwapchainId,
    /// Layer configuration.
    pub config: LayerConfig,
    /// Blend and depth parameters.
    pub params: SubmitParams,
    /// One entry per view, in view order.
    pub views: Vec<ViewSubmission>,
}

impl LayerSubmission {
    /// Returns the blend control attached to `view_index`, if any.
    #[must_use]
    pub fn blend_control(&self, view_index: usize) -> Option<&BlendControlMask> {
        match self.params.view_extensions.get(view_index) {
            Some(ViewExtension::BlendControlMask(mask)) => Some(mask),
            None => None,
        }
    }
}
