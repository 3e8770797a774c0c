use nalgebra as na;
use ndarray::prelude::*;

use crate::config::DecoderConfig;
use crate::detection::Detection;
use crate::math::{clip, logit};
use crate::tensor::argsort_threshold;

#[derive(Debug, Clone)]
pub struct CenterDecoderConfig {
    pub min_detection_score: f32,
    pub nms_radius: f32,
    pub maximum_num_feet: usize,
    pub input_size: (f32, f32),
}

impl CenterDecoderConfig {
    pub fn new(min_detection_score: f32, nms_radius: f32, maximum_num_feet: usize) -> Self {
        Self {
            min_detection_score,
            nms_radius,
            maximum_num_feet,
            input_size: (256.0, 256.0),
        }
    }
}

impl From<&DecoderConfig> for CenterDecoderConfig {
    fn from(cfg: &DecoderConfig) -> Self {
        Self {
            min_detection_score: cfg.min_detection_score,
            nms_radius: cfg.nms_radius,
            maximum_num_feet: cfg.maximum_num_feet,
            input_size: (cfg.dims.input_width as f32, cfg.dims.input_height as f32),
        }
    }
}

/// Turns the center heatmap into a short list of well separated foot
/// centers.
#[derive(Debug, Clone)]
pub struct CenterDecoder {
    config: CenterDecoderConfig,
    min_logit: f32,
}

impl CenterDecoder {
    pub fn new(config: CenterDecoderConfig) -> Self {
        let min_logit = logit(config.min_detection_score);

        Self { config, min_logit }
    }

    #[inline]
    pub fn config(&self) -> &CenterDecoderConfig {
        &self.config
    }

    /// Decodes `heatmap` (`H×W` logits) and `offsets` (`H×W×2`, `dx, dy` in
    /// input pixels) into at most `maximum_num_feet` centers, best first.
    pub fn decode(
        &self,
        heatmap: ArrayView2<'_, f32>,
        offsets: ArrayView3<'_, f32>,
    ) -> Vec<Detection> {
        let (_, width) = heatmap.dim();

        // ascending, so the best candidate is always at the end
        let mut candidates: Vec<(usize, na::Point2<f32>)> =
            argsort_threshold(heatmap.iter(), Some(self.min_logit))
                .into_iter()
                .map(|idx| (idx, self.location(idx, &heatmap, &offsets)))
                .collect();

        let mut centers = Vec::with_capacity(self.config.maximum_num_feet);

        while centers.len() < self.config.maximum_num_feet {
            let (idx, pt) = match candidates.pop() {
                Some(c) => c,
                None => break,
            };

            centers.push(Detection::new(pt.x, pt.y, heatmap[[idx / width, idx % width]]));

            let radius = self.config.nms_radius;
            candidates.retain(|(_, other)| na::distance(other, &pt) > radius);
        }

        centers
    }

    // heatmap cell to offset-corrected input pixel, clipped to the input
    fn location(
        &self,
        idx: usize,
        heatmap: &ArrayView2<'_, f32>,
        offsets: &ArrayView3<'_, f32>,
    ) -> na::Point2<f32> {
        let (height, width) = heatmap.dim();
        let (in_w, in_h) = self.config.input_size;

        let (row, col) = (idx / width, idx % width);
        let x = col as f32 * in_w / (width - 1) as f32;
        let y = row as f32 * in_h / (height - 1) as f32;

        na::Point2::new(
            clip(x + offsets[[row, col, 0]], 0.0, in_w - 1.0),
            clip(y + offsets[[row, col, 1]], 0.0, in_h - 1.0),
        )
    }
}
