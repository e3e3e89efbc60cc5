// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-layer view over the compositor's frame protocol.
//!
//! A [`MultiLayerView`] owns one runtime swapchain per configured layer and
//! sequences a frame:
//!
//! ```text
//!   sync_frame() ──► begin_frame() ──► begin_layer(i) ─┬─► clear()
//!                                                      ├─► render_scene()
//!                                                      └─► end()
//!                                   ...more layers...
//!                ──► end_frame()    (all prepared layers in one submit)
//! ```
//!
//! A view's layer configuration is fixed. Changing resolution or format
//! means dropping the view and building a new one.

use maskcomp_core::layers::{ClearParams, LayerConfig, LayerSubmission, SubmitParams, ViewSubmission};
use maskcomp_core::plan::RenderPlan;
use maskcomp_core::runtime::{FrameInfo, RuntimeError, SwapchainId};
use maskcomp_core::session::Session;
use tracing::{debug, info};

use crate::scene::Scene;

/// A frame could not be assembled or submitted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayerSubmitError {
    /// No frame has been synced yet.
    #[error("no synced frame")]
    NotSynced,
    /// [`MultiLayerView::end_frame`] or a layer pass was used outside a frame.
    #[error("frame not begun")]
    NotBegun,
    /// The layer index does not exist in this view.
    #[error("layer index {0} out of range")]
    InvalidLayer(usize),
    /// The runtime refused to begin the frame.
    #[error("begin frame failed: {0}")]
    Begin(#[source] RuntimeError),
    /// The runtime refused the submission.
    #[error("frame submission failed: {0}")]
    Submit(#[source] RuntimeError),
}

#[derive(Debug)]
struct Layer {
    config: LayerConfig,
    swapchain: SwapchainId,
}

/// Layered view of the compositor frame protocol.
#[derive(Debug)]
pub struct MultiLayerView<'s> {
    session: &'s Session,
    layers: Vec<Layer>,
    frame: Option<FrameInfo>,
    prepared: Vec<LayerSubmission>,
    in_frame: bool,
    invalidated: bool,
}

impl<'s> MultiLayerView<'s> {
    /// Creates one swapchain per entry of `configs`, in order.
    ///
    /// # Errors
    ///
    /// Returns the runtime error if any swapchain cannot be created; those
    /// already created are destroyed.
    pub fn new(session: &'s Session, configs: &[LayerConfig]) -> Result<Self, RuntimeError> {
        let mut view = Self {
            session,
            layers: Vec::with_capacity(configs.len()),
            frame: None,
            prepared: Vec::new(),
            in_frame: false,
            invalidated: false,
        };
        for config in configs {
            // On error `view` drops and releases the swapchains made so far.
            let swapchain = session.runtime().create_swapchain(*config)?;
            view.layers.push(Layer {
                config: *config,
                swapchain,
            });
        }
        info!(layers = configs.len(), "multi-layer view created");
        Ok(view)
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Configuration of layer `index`.
    #[must_use]
    pub fn layer_config(&self, index: usize) -> Option<LayerConfig> {
        self.layers.get(index).map(|l| l.config)
    }

    /// Blocks until the compositor grants the next frame slot.
    ///
    /// # Errors
    ///
    /// Returns the runtime error; the previous frame info is kept.
    pub fn sync_frame(&mut self) -> Result<&FrameInfo, RuntimeError> {
        let frame = self.session.runtime().wait_sync()?;
        debug!(frame = frame.frame_number, "frame synced");
        Ok(self.frame.insert(frame))
    }

    /// The most recently synced frame.
    #[must_use]
    pub fn frame_info(&self) -> Option<&FrameInfo> {
        self.frame.as_ref()
    }

    /// Number of the most recently synced frame, or 0 before the first sync.
    #[must_use]
    pub fn frame_number(&self) -> i64 {
        self.frame.as_ref().map_or(0, |f| f.frame_number)
    }

    /// Number of views in the most recently synced frame.
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.views.len())
    }

    /// Starts a frame on the runtime.
    ///
    /// # Errors
    ///
    /// Fails if no frame has been synced or the runtime refuses.
    pub fn begin_frame(&mut self) -> Result<(), LayerSubmitError> {
        if self.frame.is_none() {
            return Err(LayerSubmitError::NotSynced);
        }
        self.session
            .runtime()
            .begin_frame()
            .map_err(LayerSubmitError::Begin)?;
        self.prepared.clear();
        self.in_frame = true;
        Ok(())
    }

    /// Starts recording layer `index`.
    ///
    /// The layer is added to the frame when [`LayerPass::end`] is called;
    /// dropping the pass discards it.
    ///
    /// # Errors
    ///
    /// Fails outside a frame or for an unknown layer.
    pub fn begin_layer(
        &mut self,
        index: usize,
        params: SubmitParams,
    ) -> Result<LayerPass<'_, 's>, LayerSubmitError> {
        if !self.in_frame {
            return Err(LayerSubmitError::NotBegun);
        }
        let layer = self
            .layers
            .get(index)
            .ok_or(LayerSubmitError::InvalidLayer(index))?;
        let views = (0..self.view_count())
            .map(|i| ViewSubmission {
                clear: None,
                plan: RenderPlan::new(i),
            })
            .collect();
        let submission = LayerSubmission {
            layer_index: index,
            swapchain: layer.swapchain,
            config: layer.config,
            params,
            views,
        };
        Ok(LayerPass {
            view: self,
            submission,
        })
    }

    /// Submits all ended layers in one call.
    ///
    /// # Errors
    ///
    /// Fails outside a frame or if the runtime rejects the submission.
    pub fn end_frame(&mut self) -> Result<(), LayerSubmitError> {
        if !self.in_frame {
            return Err(LayerSubmitError::NotBegun);
        }
        self.in_frame = false;
        let layers = core::mem::take(&mut self.prepared);
        self.session
            .runtime()
            .end_frame(&layers)
            .map_err(LayerSubmitError::Submit)?;
        self.invalidated = false;
        Ok(())
    }

    /// Drops this client's contribution with an empty submit.
    ///
    /// Only the first call after a submitted frame reaches the runtime.
    pub fn invalidate_frame(&mut self) {
        self.prepared.clear();
        self.in_frame = false;
        if self.invalidated {
            return;
        }
        debug!("invalidating frame");
        let result = self.session.runtime().end_frame(&[]);
        self.session.check("end_frame", result);
        self.invalidated = true;
    }
}

impl Drop for MultiLayerView<'_> {
    fn drop(&mut self) {
        for layer in self.layers.drain(..) {
            self.session.runtime().destroy_swapchain(layer.swapchain);
        }
    }
}

/// Recording of one layer within a frame.
#[derive(Debug)]
pub struct LayerPass<'v, 's> {
    view: &'v mut MultiLayerView<'s>,
    submission: LayerSubmission,
}

impl LayerPass<'_, '_> {
    /// Clears every view of the layer.
    pub fn clear(&mut self, params: ClearParams) {
        for view in &mut self.submission.views {
            view.clear = Some(params);
            view.plan.clear();
        }
    }

    /// Renders `scene` into every view of the layer.
    pub fn render_scene(&mut self, scene: &dyn Scene) {
        let Some(frame) = self.view.frame.as_ref() else {
            return;
        };
        for (index, (info, target)) in frame
            .views
            .iter()
            .zip(&mut self.submission.views)
            .enumerate()
        {
            scene.render(index, info, &mut target.plan);
        }
    }

    /// Finishes the layer and queues it for [`MultiLayerView::end_frame`].
    pub fn end(self) {
        self.view.prepared.push(self.submission);
    }
}
