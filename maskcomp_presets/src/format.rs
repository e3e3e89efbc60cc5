// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partial records mirroring the JSON layout.
//!
//! Every field is optional. Decoding a document never builds a [`State`]
//! directly; instead [`StateDoc::overlay`] writes the present fields onto a
//! complete base and leaves the rest untouched.

use maskcomp_core::state::{
    DebugMode, FRAME_SKIP_VALUES, InvalidEnumValue, MaskFormat, MaskingMode, Options,
    PlaneConfig, RESOLUTION_DIVIDERS, State,
};
#[cfg(feature = "video-depth-test")]
use maskcomp_core::state::{VideoDepthTestBehavior, VideoDepthTestMode};
use maskcomp_core::transform::Transform3d;
use serde::{Deserialize, Serialize};

use crate::PresetError;

/// Top level of a presets document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresetsDoc {
    pub(crate) default_id: Option<String>,
    pub(crate) reset_state: Option<serde_json::Value>,
    pub(crate) preset_metadata: Option<Vec<MetadataDoc>>,
    pub(crate) preset_states: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataDoc {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) desc: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct StateDoc {
    options: Option<OptionsDoc>,
    planes: Option<Vec<PlaneDoc>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsDoc {
    masking_mode: Option<i64>,
    vst_rendering: Option<bool>,
    vr_frame_sync: Option<bool>,
    vr_frame_update: Option<bool>,
    vr_frame_submit: Option<bool>,
    vr_layer_submit_color: Option<bool>,
    vr_layer_submit_mask: Option<bool>,
    vr_layer_submit_depth: Option<bool>,
    vr_layer_depth_test_mask: Option<bool>,
    vr_render_mask: Option<bool>,
    res_divider: Option<u32>,
    frame_skip: Option<u32>,
    mask_format: Option<MaskFormatDoc>,
    vr_view_offset: Option<f64>,
    force_global_view_offset: Option<bool>,
    debug_mode: Option<i64>,
    // Read in every build so unsupported presets can be recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    video_depth_test_mode: Option<i64>,
    #[cfg(feature = "video-depth-test")]
    video_depth_test_behavior: Option<i64>,
    #[cfg(feature = "video-depth-test")]
    video_depth_test_range: Option<[f64; 2]>,
}

/// Mask format as written by this tool, or as a raw runtime format code.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum MaskFormatDoc {
    Name(String),
    Code(i64),
}

impl MaskFormatDoc {
    fn decode(&self) -> Result<MaskFormat, PresetError> {
        match self {
            Self::Name(name) => {
                MaskFormat::from_name(name).ok_or_else(|| PresetError::invalid("maskFormat", name))
            }
            Self::Code(code) => {
                MaskFormat::from_code(*code).ok_or_else(|| PresetError::invalid("maskFormat", code))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaneDoc {
    enabled: Option<bool>,
    position: Option<[f32; 3]>,
    rotation: Option<[f32; 3]>,
    scale: Option<[f32; 2]>,
    color: Option<[f32; 4]>,
    tracking: Option<bool>,
    tracked_id: Option<i64>,
    /// Column-major.
    tracked_pose: Option<[f64; 16]>,
}

#[inline]
fn set<T>(dst: &mut T, src: Option<T>) {
    if let Some(v) = src {
        *dst = v;
    }
}

fn enum_value<E>(field: &'static str, value: i64) -> Result<E, PresetError>
where
    E: TryFrom<i64, Error = InvalidEnumValue>,
{
    E::try_from(value).map_err(|e| PresetError::invalid(field, e.value))
}

impl StateDoc {
    pub(crate) fn from_value(value: &serde_json::Value) -> Result<Self, PresetError> {
        Ok(Self::deserialize(value)?)
    }

    /// Writes the present fields onto `state`.
    ///
    /// On success returns the first field this build cannot honor, if any.
    /// On error `state` may be partially updated; callers overlay onto a copy.
    pub(crate) fn overlay(&self, state: &mut State) -> Result<Option<&'static str>, PresetError> {
        let mut unsupported = None;
        if let Some(options) = &self.options {
            unsupported = options.overlay(&mut state.options)?;
        }
        if let Some(planes) = &self.planes {
            // Planes beyond the fixed array are ignored.
            for (plane, doc) in state.planes.iter_mut().zip(planes) {
                doc.overlay(plane);
            }
        }
        Ok(unsupported)
    }

    /// Complete record of `state` for the saved state file.
    pub(crate) fn from_state(state: &State) -> Self {
        Self {
            options: Some(OptionsDoc::from_options(&state.options)),
            planes: Some(state.planes.iter().map(PlaneDoc::from_plane).collect()),
        }
    }
}

impl OptionsDoc {
    fn overlay(&self, o: &mut Options) -> Result<Option<&'static str>, PresetError> {
        if let Some(v) = self.masking_mode {
            o.masking_mode = enum_value::<MaskingMode>("maskingMode", v)?;
        }
        if let Some(v) = self.debug_mode {
            o.debug_mode = enum_value::<DebugMode>("debugMode", v)?;
        }
        set(&mut o.vst_rendering, self.vst_rendering);
        set(&mut o.vr_frame_sync, self.vr_frame_sync);
        set(&mut o.vr_frame_update, self.vr_frame_update);
        set(&mut o.vr_frame_submit, self.vr_frame_submit);
        set(&mut o.vr_layer_submit_color, self.vr_layer_submit_color);
        set(&mut o.vr_layer_submit_mask, self.vr_layer_submit_mask);
        set(&mut o.vr_layer_submit_depth, self.vr_layer_submit_depth);
        set(&mut o.vr_layer_depth_test_mask, self.vr_layer_depth_test_mask);
        set(&mut o.vr_render_mask, self.vr_render_mask);
        if let Some(v) = self.res_divider {
            if !RESOLUTION_DIVIDERS.contains(&v) {
                return Err(PresetError::invalid("resDivider", v));
            }
            o.res_divider = v;
        }
        if let Some(v) = self.frame_skip {
            if !FRAME_SKIP_VALUES.contains(&v) {
                return Err(PresetError::invalid("frameSkip", v));
            }
            o.frame_skip = v;
        }
        if let Some(format) = &self.mask_format {
            o.mask_format = format.decode()?;
        }
        set(&mut o.vr_view_offset, self.vr_view_offset);
        set(&mut o.force_global_view_offset, self.force_global_view_offset);
        self.overlay_video_depth_test(o)
    }

    #[cfg(feature = "video-depth-test")]
    fn overlay_video_depth_test(&self, o: &mut Options) -> Result<Option<&'static str>, PresetError> {
        if let Some(v) = self.video_depth_test_mode {
            o.video_depth_test_mode = enum_value::<VideoDepthTestMode>("videoDepthTestMode", v)?;
        }
        if let Some(v) = self.video_depth_test_behavior {
            o.video_depth_test_behavior =
                enum_value::<VideoDepthTestBehavior>("videoDepthTestBehavior", v)?;
        }
        set(&mut o.video_depth_test_range, self.video_depth_test_range);
        Ok(None)
    }

    #[cfg(not(feature = "video-depth-test"))]
    fn overlay_video_depth_test(&self, _: &mut Options) -> Result<Option<&'static str>, PresetError> {
        Ok(self
            .video_depth_test_mode
            .filter(|mode| *mode != 0)
            .map(|_| "videoDepthTestMode"))
    }

    fn from_options(o: &Options) -> Self {
        Self {
            masking_mode: Some(o.masking_mode.to_i64()),
            vst_rendering: Some(o.vst_rendering),
            vr_frame_sync: Some(o.vr_frame_sync),
            vr_frame_update: Some(o.vr_frame_update),
            vr_frame_submit: Some(o.vr_frame_submit),
            vr_layer_submit_color: Some(o.vr_layer_submit_color),
            vr_layer_submit_mask: Some(o.vr_layer_submit_mask),
            vr_layer_submit_depth: Some(o.vr_layer_submit_depth),
            vr_layer_depth_test_mask: Some(o.vr_layer_depth_test_mask),
            vr_render_mask: Some(o.vr_render_mask),
            res_divider: Some(o.res_divider),
            frame_skip: Some(o.frame_skip),
            mask_format: Some(MaskFormatDoc::Name(o.mask_format.as_str().to_owned())),
            vr_view_offset: Some(o.vr_view_offset),
            force_global_view_offset: Some(o.force_global_view_offset),
            debug_mode: Some(o.debug_mode.to_i64()),
            #[cfg(feature = "video-depth-test")]
            video_depth_test_mode: Some(o.video_depth_test_mode.to_i64()),
            #[cfg(not(feature = "video-depth-test"))]
            video_depth_test_mode: None,
            #[cfg(feature = "video-depth-test")]
            video_depth_test_behavior: Some(o.video_depth_test_behavior.to_i64()),
            #[cfg(feature = "video-depth-test")]
            video_depth_test_range: Some(o.video_depth_test_range),
        }
    }
}

impl PlaneDoc {
    fn overlay(&self, p: &mut PlaneConfig) {
        set(&mut p.enabled, self.enabled);
        set(&mut p.position, self.position);
        set(&mut p.rotation, self.rotation);
        set(&mut p.scale, self.scale);
        set(&mut p.color, self.color);
        set(&mut p.tracking, self.tracking);
        set(&mut p.tracked_id, self.tracked_id);
        set(
            &mut p.tracked_pose,
            self.tracked_pose.map(Transform3d::from_cols_array),
        );
    }

    fn from_plane(p: &PlaneConfig) -> Self {
        Self {
            enabled: Some(p.enabled),
            position: Some(p.position),
            rotation: Some(p.rotation),
            scale: Some(p.scale),
            color: Some(p.color),
            // Tracking never resumes on its own after a restart.
            tracking: Some(false),
            tracked_id: Some(p.tracked_id),
            tracked_pose: Some(p.tracked_pose.to_cols_array()),
        }
    }
}
