// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D affine transforms the masking client
//! needs: plane model matrices, marker poses and per-view camera matrices.

use core::ops::Mul;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs and by the runtime's pose matrices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Creates a transform from 16 column-major values.
    #[inline]
    #[must_use]
    pub const fn from_cols_array(m: [f64; 16]) -> Self {
        Self {
            cols: [
                [m[0], m[1], m[2], m[3]],
                [m[4], m[5], m[6], m[7]],
                [m[8], m[9], m[10], m[11]],
                [m[12], m[13], m[14], m[15]],
            ],
        }
    }

    /// Returns the 16 values in column-major order.
    #[inline]
    #[must_use]
    pub const fn to_cols_array(self) -> [f64; 16] {
        let c = self.cols;
        [
            c[0][0], c[0][1], c[0][2], c[0][3], c[1][0], c[1][1], c[1][2], c[1][3], c[2][0],
            c[2][1], c[2][2], c[2][3], c[3][0], c[3][1], c[3][2], c[3][3],
        ]
    }

    /// Returns the columns narrowed to `f32` for GPU constant buffers.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "shader constants are single precision"
    )]
    pub fn to_cols_f32(self) -> [[f32; 4]; 4] {
        self.cols.map(|col| col.map(|v| v as f32))
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Y axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_y(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation from XYZ Euler angles in degrees.
    ///
    /// The result is `Rz · Ry · Rx`: a vector is rotated about X first, then
    /// Y, then Z.
    #[must_use]
    pub fn from_euler_degrees(degrees: [f64; 3]) -> Self {
        let [x, y, z] = degrees.map(f64::to_radians);
        Self::from_rotation_z(z) * Self::from_rotation_y(y) * Self::from_rotation_x(x)
    }

    /// Transforms a homogeneous point `[x, y, z, w]`.
    #[inline]
    #[must_use]
    pub fn transform_point4(self, p: [f64; 4]) -> [f64; 4] {
        let c = &self.cols;
        let mut out = [0.0_f64; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = c[0][i] * p[0] + c[1][i] * p[1] + c[2][i] * p[2] + c[3][i] * p[3];
        }
        out
    }

    /// Returns `true` if every element is within `eps` of `other`.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &Self, eps: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}
