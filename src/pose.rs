use nalgebra as na;
use ndarray::prelude::*;

use crate::math::{rotation_from_ortho6d, Intrinsics};
use crate::tensor::{sample_2d, sample_3d};
use crate::track::{Pose, Track};

const DISPARITY_EPSILON: f32 = 1e-4;

/// Recovers the 3-D pose of every track from the parametric tensors.
#[derive(Debug, Clone)]
pub struct PoseReconstructor {
    intrinsics: Intrinsics,
    stride: f32,
    flip: na::UnitQuaternion<f32>,
}

impl PoseReconstructor {
    /// `intrinsics` must already be expressed in model input pixels.
    pub fn new(intrinsics: Intrinsics, stride: f32) -> Self {
        Self {
            intrinsics,
            stride,
            // camera looks down -Z in the target convention
            flip: na::UnitQuaternion::from_euler_angles(std::f32::consts::PI, 0.0, 0.0),
        }
    }

    #[inline]
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn set_intrinsics(&mut self, intrinsics: Intrinsics) {
        self.intrinsics = intrinsics;
    }

    /// `translation` is `H×W×4` (left dx, dy, right dx, dy), `rotation` is
    /// `H×W×12` (left ortho-6D, right ortho-6D), `log_disparity` is `H×W`.
    pub fn reconstruct(
        &self,
        track: &Track,
        translation: &ArrayView3<'_, f32>,
        rotation: &ArrayView3<'_, f32>,
        log_disparity: &ArrayView2<'_, f32>,
    ) -> Pose {
        let (x, y) = (track.x, track.y);

        let t = sample_3d(translation, x, y, self.stride);
        let r = sample_3d(rotation, x, y, self.stride);
        let disparity = sample_2d(log_disparity, x, y, self.stride).exp();

        let (t, r) = if track.is_right {
            (&t[2..4], &r[6..12])
        } else {
            (&t[0..2], &r[0..6])
        };

        let mut ortho6d = [0.0; 6];
        ortho6d.copy_from_slice(r);
        let rotmat = rotation_from_ortho6d(&ortho6d);

        let Intrinsics { fx, cx, cy, .. } = self.intrinsics;
        let inv_disparity = 1.0 / (disparity + DISPARITY_EPSILON);
        let position = na::Vector3::new(
            inv_disparity * (x + t[0] - cx),
            inv_disparity * (y + t[1] - cy),
            inv_disparity * fx,
        );

        let rotmat = na::Rotation3::from_matrix_unchecked(rotmat);
        let quat = na::UnitQuaternion::from_rotation_matrix(&rotmat);

        Pose::new(self.flip * position, self.flip * quat)
    }

    /// Reconstructs and stores the pose of every track.
    pub fn reconstruct_all(
        &self,
        tracks: &mut [Track],
        translation: &ArrayView3<'_, f32>,
        rotation: &ArrayView3<'_, f32>,
        log_disparity: &ArrayView2<'_, f32>,
    ) {
        for track in tracks.iter_mut() {
            track.pose = Some(self.reconstruct(track, translation, rotation, log_disparity));
        }
    }
}
