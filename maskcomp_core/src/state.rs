// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application state: options, mask planes and live counters.
//!
//! [`State`] is the user-editable part (what presets and the saved config
//! file describe). [`General`] holds values the logic derives at runtime.
//! [`AppState`] bundles both and is what gets swapped atomically by the
//! application logic.

use core::fmt;

use crate::layers::{LayerConfig, TextureFormat};
use crate::transform::Transform3d;

/// Number of mask planes in a [`State`].
pub const NUM_MASK_PLANES: usize = 4;

/// Resolution dividers accepted for the mask layer.
pub const RESOLUTION_DIVIDERS: [u32; 5] = [1, 2, 4, 8, 16];

/// Frame-skip values accepted by [`Options::frame_skip`].
pub const FRAME_SKIP_VALUES: [u32; 4] = [0, 1, 2, 3];

/// Error returned when converting an out-of-range integer into one of the
/// state enums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value}")]
pub struct InvalidEnumValue {
    /// Which enum was being decoded.
    pub kind: &'static str,
    /// The rejected value.
    pub value: i64,
}

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// All variants in numeric order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Returns the numeric value used by the runtime and the preset files.
            #[inline]
            #[must_use]
            pub const fn to_i64(self) -> i64 {
                self as i64
            }

            /// Returns the variant following `self`, wrapping around.
            #[must_use]
            pub fn cycle(self) -> Self {
                let i = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
                Self::ALL[(i + 1) % Self::ALL.len()]
            }
        }

        impl TryFrom<i64> for $name {
            type Error = InvalidEnumValue;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err(InvalidEnumValue { kind: $kind, value }),
                }
            }
        }
    };
}

int_enum! {
    /// How the compositor interprets mask coverage.
    MaskingMode, "masking mode" {
        /// Chroma-key everywhere; mask ignored.
        None = 0,
        /// Inside mask chroma-key; outside always VR.
        Restricted = 1,
        /// Inside mask always VR; outside chroma-key.
        #[default]
        Extended = 2,
        /// Inside mask always video; outside chroma-key.
        Reduced = 3,
        /// Inside mask depth test; outside fail.
        DepthTestOrFail = 4,
        /// Inside mask depth test; outside pass.
        DepthTestOrPass = 5,
    }
}

int_enum! {
    /// Compositor debug visualization.
    DebugMode, "debug mode" {
        /// No visualization.
        #[default]
        None = 0,
        /// Visualize the mask alpha channel.
        VisualizeMask = 1,
        /// Visualize mask plane colors.
        VisualizeColors = 2,
    }
}

#[cfg(feature = "video-depth-test")]
int_enum! {
    /// Global video depth test mode.
    VideoDepthTestMode, "video depth test mode" {
        /// Leave the runtime default in place.
        #[default]
        Default = 0,
        /// Depth test over the full range.
        FullRange = 1,
        /// Depth test limited to the configured range.
        LimitedRange = 2,
        /// Depth test forced within the configured range.
        ForcedRange = 3,
    }
}

#[cfg(feature = "video-depth-test")]
int_enum! {
    /// How the video depth test range combines with layer ranges.
    VideoDepthTestBehavior, "video depth test behavior" {
        /// Layer range wins.
        #[default]
        PreferLayerRange = 0,
        /// Video range wins.
        PreferVideoRange = 1,
        /// Intersect both ranges.
        CombineRanges = 2,
    }
}

/// Texture format of the mask layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaskFormat {
    /// Single-channel alpha.
    #[default]
    A8Unorm,
    /// Full color sRGB.
    R8G8B8A8Srgb,
}

impl MaskFormat {
    /// Returns the canonical name used in preset files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A8Unorm => "A8_UNORM",
            Self::R8G8B8A8Srgb => "R8G8B8A8_SRGB",
        }
    }

    /// Parses the canonical preset-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A8_UNORM" => Some(Self::A8Unorm),
            "R8G8B8A8_SRGB" => Some(Self::R8G8B8A8Srgb),
            _ => None,
        }
    }

    /// Returns the runtime's numeric texture format code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::A8Unorm => 4,
            Self::R8G8B8A8Srgb => 1,
        }
    }

    /// Parses a runtime texture format code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            4 => Some(Self::A8Unorm),
            1 => Some(Self::R8G8B8A8Srgb),
            _ => None,
        }
    }

    /// Returns the texture format used for the layer swapchain.
    #[must_use]
    pub const fn texture_format(self) -> TextureFormat {
        match self {
            Self::A8Unorm => TextureFormat::A8Unorm,
            Self::R8G8B8A8Srgb => TextureFormat::R8G8B8A8Srgb,
        }
    }
}

impl fmt::Display for MaskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing configuration block.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Masking mode attached to the mask layer.
    pub masking_mode: MaskingMode,
    /// Debug visualization attached to the mask layer.
    pub debug_mode: DebugMode,
    /// Video pass-through rendering.
    pub vst_rendering: bool,
    /// Wait for the compositor's frame slot each tick.
    pub vr_frame_sync: bool,
    /// Produce frames at all.
    pub vr_frame_update: bool,
    /// Submit produced frames.
    pub vr_frame_submit: bool,
    /// Submit the color layer.
    pub vr_layer_submit_color: bool,
    /// Submit the mask layer.
    pub vr_layer_submit_mask: bool,
    /// Submit depth with layers.
    pub vr_layer_submit_depth: bool,
    /// Enable depth testing against video for the layers.
    pub vr_layer_depth_test_mask: bool,
    /// Rasterize planes into the layers (otherwise layers are submitted cleared).
    pub vr_render_mask: bool,
    /// Mask layer context resolution divider, one of [`RESOLUTION_DIVIDERS`].
    pub res_divider: u32,
    /// Number of frames skipped between submissions, one of [`FRAME_SKIP_VALUES`].
    pub frame_skip: u32,
    /// Mask layer texture format.
    pub mask_format: MaskFormat,
    /// VR view offset in `[0, 1]`.
    pub vr_view_offset: f64,
    /// Force the global view offset for the mask layer.
    pub force_global_view_offset: bool,
    /// Global video depth test mode.
    #[cfg(feature = "video-depth-test")]
    pub video_depth_test_mode: VideoDepthTestMode,
    /// Global video depth test behavior.
    #[cfg(feature = "video-depth-test")]
    pub video_depth_test_behavior: VideoDepthTestBehavior,
    /// Global video depth test range in meters.
    #[cfg(feature = "video-depth-test")]
    pub video_depth_test_range: [f64; 2],
}

impl Default for Options {
    fn default() -> Self {
        Self {
            masking_mode: MaskingMode::Extended,
            debug_mode: DebugMode::None,
            vst_rendering: true,
            vr_frame_sync: true,
            vr_frame_update: true,
            vr_frame_submit: true,
            vr_layer_submit_color: false,
            vr_layer_submit_mask: true,
            vr_layer_submit_depth: false,
            vr_layer_depth_test_mask: false,
            vr_render_mask: true,
            res_divider: 2,
            frame_skip: 1,
            mask_format: MaskFormat::A8Unorm,
            vr_view_offset: 1.0,
            force_global_view_offset: true,
            #[cfg(feature = "video-depth-test")]
            video_depth_test_mode: VideoDepthTestMode::Default,
            #[cfg(feature = "video-depth-test")]
            video_depth_test_behavior: VideoDepthTestBehavior::PreferLayerRange,
            #[cfg(feature = "video-depth-test")]
            video_depth_test_range: [0.0, 0.75],
        }
    }
}

impl Options {
    /// Whether runtime video depth estimation is needed for these options.
    #[inline]
    #[must_use]
    pub const fn depth_estimation(&self) -> bool {
        self.vr_layer_submit_depth && self.vr_layer_depth_test_mask
    }

    /// Layer configuration for the mask layer.
    ///
    /// The focus views use twice the context divider.
    #[must_use]
    pub fn mask_layer_config(&self) -> LayerConfig {
        let context = self.res_divider.max(1);
        LayerConfig::new(context, context * 2, self.mask_format.texture_format())
    }

    /// Returns `true` if any field of the video depth test group differs.
    #[cfg(feature = "video-depth-test")]
    #[must_use]
    pub fn video_depth_test_differs(&self, other: &Self) -> bool {
        self.video_depth_test_mode != other.video_depth_test_mode
            || self.video_depth_test_behavior != other.video_depth_test_behavior
            || self.video_depth_test_range != other.video_depth_test_range
    }
}

/// One mask plane.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneConfig {
    /// Whether the plane is drawn.
    pub enabled: bool,
    /// Position relative to the tracked pose.
    pub position: [f32; 3],
    /// XYZ Euler rotation in degrees.
    pub rotation: [f32; 3],
    /// Size along the plane's X and Z axes.
    pub scale: [f32; 2],
    /// RGBA color written into the mask.
    pub color: [f32; 4],
    /// Follow a fiducial marker.
    pub tracking: bool,
    /// Bound marker id, `<= 0` when unassigned.
    pub tracked_id: i64,
    /// Last observed pose of the bound marker.
    pub tracked_pose: Transform3d,
    /// Request a prediction reset for the bound marker on the next tick.
    pub reset_marker_prediction: bool,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 2],
            color: [1.0; 4],
            tracking: false,
            tracked_id: 0,
            tracked_pose: Transform3d::IDENTITY,
            reset_marker_prediction: false,
        }
    }
}

impl PlaneConfig {
    /// Whether the plane holds a marker id.
    #[inline]
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.tracked_id > 0
    }

    /// Whether the plane is drawn.
    ///
    /// A tracking plane without a marker stays hidden until one is bound.
    #[inline]
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        self.enabled && !(self.tracking && !self.is_assigned())
    }

    /// Model transform: `tracked_pose · T(position) · R(rotation) · S(scale.x, 1, scale.y)`.
    #[must_use]
    pub fn model_transform(&self) -> Transform3d {
        let [px, py, pz] = self.position.map(f64::from);
        let [sx, sz] = self.scale.map(f64::from);
        self.tracked_pose
            * Transform3d::from_translation(px, py, pz)
            * Transform3d::from_euler_degrees(self.rotation.map(f64::from))
            * Transform3d::from_scale(sx, 1.0, sz)
    }

    /// Binds the plane to `id`, zeroing its local offset and requesting a
    /// prediction reset.
    pub fn bind_to_marker(&mut self, id: i64) {
        self.tracked_id = id;
        self.position = [0.0; 3];
        self.rotation = [0.0; 3];
        self.reset_marker_prediction = true;
    }
}

/// Options plus the plane array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct State {
    /// Configuration block.
    pub options: Options,
    /// Mask planes, drawn in array order.
    pub planes: [PlaneConfig; NUM_MASK_PLANES],
}

impl State {
    /// Whether any plane requests marker tracking.
    #[must_use]
    pub fn any_tracking(&self) -> bool {
        self.planes.iter().any(|p| p.tracking)
    }
}

/// Live values derived by the application logic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct General {
    /// Last synced frame number.
    pub frame_count: i64,
    /// Accumulated frame time in seconds.
    pub frame_time: f64,
    /// Mixed reality features are available.
    pub mr_available: bool,
    /// Depth estimation value last applied to the runtime.
    pub vst_depth_estimation: bool,
}

/// Complete application state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Live values.
    pub general: General,
    /// User-editable state.
    pub state: State,
}
