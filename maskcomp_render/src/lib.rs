// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-layer view and mask scene rendering.
//!
//! - [`view::MultiLayerView`] sequences the compositor's frame protocol and
//!   owns the layer swapchains.
//! - [`scene::MaskScene`] turns the mask plane array into per-view
//!   [`RenderPlan`](maskcomp_core::plan::RenderPlan)s.
//! - [`mesh`] defines the plane geometry and shader constant layouts that a
//!   GPU backend uploads to rasterize those plans.

pub mod mesh;
pub mod scene;
pub mod view;
