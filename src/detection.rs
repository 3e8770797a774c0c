use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Foot center decoded from the heatmap, in model input pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    // raw heatmap logit
    #[serde(rename = "p")]
    pub score: f32,
}

impl Detection {
    #[inline]
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    #[inline(always)]
    pub fn position(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, other: &Detection) -> f32 {
        na::distance(&self.position(), &other.position())
    }
}
