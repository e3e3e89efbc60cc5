// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plane mesh and shader constant layouts.
//!
//! Every mask plane is the same unit quad in the XZ plane, scaled and placed
//! by its model transform. Backends upload [`PLANE_VERTICES`] and
//! [`PLANE_INDICES`] once and draw each [`DrawItem`] with its own
//! [`VertexConstants`] and [`PixelConstants`].

use bytemuck::{Pod, Zeroable};
use maskcomp_core::plan::DrawItem;

/// Half the side length of the unit plane.
pub const PLANE_HALF_SIZE: f32 = 0.5;

/// One vertex of the plane mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Texture coordinate.
    pub tex_coord: [f32; 2],
}

const R: f32 = PLANE_HALF_SIZE;

/// Plane corners, counter-clockwise seen from +Y.
pub static PLANE_VERTICES: [PlaneVertex; 4] = [
    PlaneVertex {
        position: [-R, 0.0, -R],
        tex_coord: [0.0, 1.0],
    },
    PlaneVertex {
        position: [R, 0.0, -R],
        tex_coord: [1.0, 1.0],
    },
    PlaneVertex {
        position: [R, 0.0, R],
        tex_coord: [1.0, 0.0],
    },
    PlaneVertex {
        position: [-R, 0.0, R],
        tex_coord: [0.0, 0.0],
    },
];

/// Triangle list indices into [`PLANE_VERTICES`].
pub static PLANE_INDICES: [u32; 6] = [0, 2, 1, 0, 3, 2];

/// Vertex stage constants for one draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexConstants {
    /// Model matrix, column-major.
    pub model: [[f32; 4]; 4],
    /// View matrix, column-major.
    pub view: [[f32; 4]; 4],
    /// Projection matrix, column-major.
    pub projection: [[f32; 4]; 4],
}

/// Pixel stage constants for one draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PixelConstants {
    /// Output color.
    pub color: [f32; 4],
}

impl From<&DrawItem> for VertexConstants {
    fn from(item: &DrawItem) -> Self {
        Self {
            model: item.model.to_cols_f32(),
            view: item.view.to_cols_f32(),
            projection: item.projection.to_cols_f32(),
        }
    }
}

impl From<&DrawItem> for PixelConstants {
    fn from(item: &DrawItem) -> Self {
        Self { color: item.color }
    }
}

/// Clip-space positions of the plane's corners for `item`.
#[must_use]
pub fn clip_corners(item: &DrawItem) -> [[f64; 4]; 4] {
    let mvp = item.model_view_projection();
    PLANE_VERTICES.map(|v| {
        let [x, y, z] = v.position.map(f64::from);
        mvp.transform_point4([x, y, z, 1.0])
    })
}
