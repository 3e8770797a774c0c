use nalgebra as na;

use crate::config::DecoderConfig;
use crate::detection::Detection;

/// Reconstructed 3-D pose of a foot in camera space.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub translation: na::Vector3<f32>,
    pub rotation: na::Matrix3<f32>,
    pub quat: na::UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(translation: na::Vector3<f32>, quat: na::UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation: quat.to_rotation_matrix().into_inner(),
            quat,
        }
    }

    /// Replaces the orientation, keeping matrix and quaternion in sync.
    pub fn set_quat(&mut self, quat: na::UnitQuaternion<f32>) {
        self.rotation = quat.to_rotation_matrix().into_inner();
        self.quat = quat;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u32,

    // in model input px
    pub x: f32,
    pub y: f32,

    pub score: f32,
    pub is_right: bool,
    pub lr_score: f32,

    // frames since the last match
    pub age: u32,
    // frames this track has been carried
    pub track_duration: u32,
    pub matched: bool,
    pub selected_pair: bool,

    pub pose: Option<Pose>,
}

impl Track {
    /// Fresh, never matched track.
    pub fn new(id: u32, det: &Detection) -> Self {
        Self {
            id,
            x: det.x,
            y: det.y,
            score: det.score,
            is_right: false,
            lr_score: 0.0,
            age: 0,
            track_duration: 0,
            matched: false,
            selected_pair: false,
            pose: None,
        }
    }

    /// Continuation of `prev` by the detection it was matched with.
    pub fn matched_from(prev: &Track, det: &Detection) -> Self {
        Self {
            age: 0,
            matched: true,
            track_duration: prev.track_duration + 1,
            ..Self::new(prev.id, det)
        }
    }

    /// `prev` carried one more frame without a match.
    pub fn carried_from(prev: &Track) -> Self {
        Self {
            age: prev.age + 1,
            track_duration: prev.track_duration + 1,
            matched: false,
            ..prev.clone()
        }
    }

    #[inline(always)]
    pub fn position(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, det: &Detection) -> f32 {
        na::distance(&self.position(), &det.position())
    }

    /// Whether the host should draw this track: matched this frame, alive
    /// for longer than `min_track_length` and, in one-pair mode, part of the
    /// selected pair.
    pub fn is_displayable(&self, cfg: &DecoderConfig) -> bool {
        self.matched
            && self.track_duration > cfg.min_track_length
            && (self.selected_pair || !cfg.only_one_pair)
    }
}
