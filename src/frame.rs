use ndarray::prelude::*;

use crate::config::ModelDims;
use crate::error::Error;
use crate::tensor::{view_2d, view_3d};

pub const OFFSET_CHANNELS: usize = 2;
pub const TRANSLATION_CHANNELS: usize = 4;
pub const ROTATION_CHANNELS: usize = 12;

/// Raw network output of one video frame. All tensors are flat, row-major
/// and laid out over the heatmap grid.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub timestamp: f32, // in seconds
    pub heatmap: &'a [f32],
    pub offsets: &'a [f32],
    pub lr_logits: &'a [f32],
    pub translation: &'a [f32],
    pub rotation: &'a [f32],
    pub disparity: &'a [f32],
}

/// Shaped views over a [`Frame`], built only once every length checks out.
#[derive(Debug, Clone)]
pub struct FrameViews<'a> {
    pub heatmap: ArrayView2<'a, f32>,
    pub offsets: ArrayView3<'a, f32>,
    pub lr_logits: ArrayView2<'a, f32>,
    pub translation: ArrayView3<'a, f32>,
    pub rotation: ArrayView3<'a, f32>,
    pub disparity: ArrayView2<'a, f32>,
}

impl<'a> Frame<'a> {
    pub fn views(&self, dims: &ModelDims) -> Result<FrameViews<'a>, Error> {
        let shape = dims.heatmap_shape();

        Ok(FrameViews {
            heatmap: view_2d("heatmap", self.heatmap, shape)?,
            offsets: view_3d("offsets", self.offsets, shape, OFFSET_CHANNELS)?,
            lr_logits: view_2d("lr_logits", self.lr_logits, shape)?,
            translation: view_3d("translation", self.translation, shape, TRANSLATION_CHANNELS)?,
            rotation: view_3d("rotation", self.rotation, shape, ROTATION_CHANNELS)?,
            disparity: view_2d("disparity", self.disparity, shape)?,
        })
    }

    #[inline]
    pub fn timestamp(&self) -> Option<f32> {
        if self.timestamp.is_finite() {
            Some(self.timestamp)
        } else {
            None
        }
    }
}
