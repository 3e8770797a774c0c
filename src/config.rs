use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Parameters of one One-Euro filter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct OneEuroParams {
    pub mincutoff: f32,
    pub beta: f32,
    pub dcutoff: f32,
}

impl OneEuroParams {
    pub const fn new(mincutoff: f32, beta: f32, dcutoff: f32) -> Self {
        Self {
            mincutoff,
            beta,
            dcutoff,
        }
    }
}

/// Ranking used when choosing the displayed pair of feet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairCriterion {
    #[default]
    TrackDuration,
    Score,
}

/// Sizes of the camera image, of the model input ("texture") and of the
/// output tensors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    pub image_width: u32,
    pub image_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub heatmap_width: u32,
    pub heatmap_height: u32,
}

impl ModelDims {
    pub fn validate(&self) -> Result<(), Error> {
        if self.heatmap_width < 2 || self.heatmap_height < 2 {
            return Err(Error::InvalidDimensions(format!(
                "heatmap must be at least 2x2, got {}x{}",
                self.heatmap_width, self.heatmap_height
            )));
        }

        if self.input_width == 0 || self.input_height == 0 {
            return Err(Error::InvalidDimensions(format!(
                "empty model input {}x{}",
                self.input_width, self.input_height
            )));
        }

        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::InvalidDimensions(format!(
                "empty camera image {}x{}",
                self.image_width, self.image_height
            )));
        }

        Ok(())
    }

    /// Number of cells of one heatmap channel.
    #[inline]
    pub fn cells(&self) -> usize {
        self.heatmap_width as usize * self.heatmap_height as usize
    }

    #[inline]
    pub fn heatmap_shape(&self) -> (usize, usize) {
        (self.heatmap_height as usize, self.heatmap_width as usize)
    }

    /// Ratio of model input to heatmap resolution.
    #[inline]
    pub fn stride(&self) -> f32 {
        (self.input_width as f32 / self.heatmap_width as f32).round()
    }
}

impl Default for ModelDims {
    fn default() -> Self {
        Self {
            image_width: 256,
            image_height: 256,
            input_width: 256,
            input_height: 256,
            heatmap_width: 64,
            heatmap_height: 64,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub dims: ModelDims,

    // ratio of input size to output size
    pub stride: f32,

    #[serde(alias = "minDetectionScore")]
    pub min_detection_score: f32,
    pub nms_radius: f32,
    #[serde(alias = "maximumNumFeet")]
    pub maximum_num_feet: usize,

    pub tracking_radius: f32,
    // carried tracks are never displayed, keep at 0 unless the host checks `matched`
    pub memory_cliff: u32,
    pub min_track_length: u32,

    pub hysteresis_enabled: bool,
    pub hysteresis_ub: f32,

    pub pair_criterion: PairCriterion,
    #[serde(alias = "only_onePair")]
    pub only_one_pair: bool,

    #[serde(alias = "oneEuro2d_enabled")]
    pub one_euro_2d_enabled: bool,
    #[serde(alias = "oneEuro3d_enabled")]
    pub one_euro_3d_enabled: bool,
    #[serde(alias = "oneEuroRotation_enabled")]
    pub one_euro_rotation_enabled: bool,

    // in Hz, used until two timestamps are known
    pub freq: f32,
    pub filter_2d: OneEuroParams,
    pub filter_xy: OneEuroParams,
    pub filter_z: OneEuroParams,
    pub filter_rotation: OneEuroParams,
}

impl DecoderConfig {
    /// Builds the default configuration for the given model, deriving the
    /// stride from the input and heatmap widths.
    pub fn with_dims(dims: ModelDims) -> Self {
        Self {
            dims,
            stride: dims.stride(),
            ..Default::default()
        }
    }

    /// Reports suspicious values through `log`. Nothing is rejected: the
    /// decoder keeps running with whatever it was given.
    pub fn validate(&self) {
        if !(self.min_detection_score > 0.0 && self.min_detection_score < 1.0) {
            log::warn!(
                "min_detection_score should be in (0, 1), got {}",
                self.min_detection_score
            );
        }

        if self.stride <= 0.0 {
            log::warn!("stride should be positive, got {}", self.stride);
        }

        if self.maximum_num_feet == 0 {
            log::warn!("maximum_num_feet is 0, nothing will be detected");
        }

        if self.freq <= 0.0 {
            log::warn!("freq should be >0, got {}", self.freq);
        }

        for (name, params) in [
            ("filter_2d", &self.filter_2d),
            ("filter_xy", &self.filter_xy),
            ("filter_z", &self.filter_z),
            ("filter_rotation", &self.filter_rotation),
        ] {
            if params.mincutoff <= 0.0 {
                log::warn!("{}.mincutoff should be >0, got {}", name, params.mincutoff);
            }

            if params.dcutoff <= 0.0 {
                log::warn!("{}.dcutoff should be >0, got {}", name, params.dcutoff);
            }
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        let dims = ModelDims::default();

        Self {
            dims,
            stride: dims.stride(),
            min_detection_score: 0.5,
            nms_radius: 20.0,
            maximum_num_feet: 6,
            tracking_radius: 20.0,
            memory_cliff: 0,
            min_track_length: 1,
            hysteresis_enabled: true,
            hysteresis_ub: 0.7,
            pair_criterion: PairCriterion::TrackDuration,
            only_one_pair: false,
            one_euro_2d_enabled: true,
            one_euro_3d_enabled: true,
            one_euro_rotation_enabled: true,
            freq: 20.0,
            filter_2d: OneEuroParams::new(0.05, 0.1, 1.0),
            filter_xy: OneEuroParams::new(0.1, 0.9, 10.0),
            filter_z: OneEuroParams::new(1.0, 1.0, 1.0),
            filter_rotation: OneEuroParams::new(2.0, 2.0, 3.0),
        }
    }
}
