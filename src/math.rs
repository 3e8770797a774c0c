use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

#[inline]
pub fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

#[inline]
pub fn clip(x: f32, lo: f32, hi: f32) -> f32 {
    lo.max(x.min(hi))
}

/// Smallest box with the crop aspect ratio that fully contains a `w x h`
/// image, centered on it. Returned as `(cx, cy, width, height)`.
pub fn person_agnostic_crop(
    w: f32,
    h: f32,
    crop_width: f32,
    crop_height: f32,
) -> (f32, f32, f32, f32) {
    let aspect_ratio = crop_width / crop_height;

    let (mut new_w, mut new_h) = (w, h);
    if w > aspect_ratio * h {
        new_h = w / aspect_ratio;
    } else {
        new_w = h * aspect_ratio;
    }

    (w / 2.0, h / 2.0, new_w, new_h)
}

/// Maps a point from model input (texture) space to camera image space.
pub fn tex_to_image_coords(
    p: na::Point2<f32>,
    w: f32,
    h: f32,
    crop_width: f32,
    crop_height: f32,
) -> na::Point2<f32> {
    let (_, _, new_w, new_h) = person_agnostic_crop(w, h, crop_width, crop_height);

    na::Point2::new(
        (p.x - crop_width / 2.0) * new_w / crop_width + w / 2.0,
        (p.y - crop_height / 2.0) * new_h / crop_height + h / 2.0,
    )
}

/// Maps a point from camera image space to model input (texture) space.
pub fn image_to_tex_coords(
    p: na::Point2<f32>,
    w: f32,
    h: f32,
    crop_width: f32,
    crop_height: f32,
) -> na::Point2<f32> {
    let (_, _, new_w, new_h) = person_agnostic_crop(w, h, crop_width, crop_height);

    na::Point2::new(
        (p.x - w / 2.0) * crop_width / new_w + crop_width / 2.0,
        (p.y - h / 2.0) * crop_height / new_h + crop_height / 2.0,
    )
}

/// Affine `2x3` transform from camera image coordinates to crop coordinates.
pub fn crop_transform(w: f32, h: f32, crop_width: f32, crop_height: f32) -> na::Matrix2x3<f32> {
    let (cx, cy, _, src_h) = person_agnostic_crop(w, h, crop_width, crop_height);
    let r = crop_height / src_h;

    na::Matrix2x3::new(
        r, 0.0, -r * cx + crop_width / 2.0,
        0.0, r, -r * cy + crop_height / 2.0,
    )
}

#[inline]
pub fn transform_jacobian(trans: &na::Matrix2x3<f32>) -> f32 {
    trans[(0, 0)] * trans[(1, 1)] - trans[(0, 1)] * trans[(1, 0)]
}

/// Pinhole camera intrinsics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Square-pixel intrinsics of a `width x height` image with the given
    /// vertical field of view (radians), principal point at the center.
    pub fn from_fov(width: f32, height: f32, fov: f32) -> Self {
        let f = (height / 2.0) / (fov / 2.0).tan();

        Self::new(f, f, width / 2.0, height / 2.0)
    }

    /// Intrinsics of the image after applying the affine `trans`: focal
    /// lengths scale with the square root of the area change, the principal
    /// point is mapped like any other point.
    pub fn transform(&self, trans: &na::Matrix2x3<f32>) -> Self {
        let scale = transform_jacobian(trans).abs().sqrt();
        let c = trans * na::Vector3::new(self.cx, self.cy, 1.0);

        Self::new(self.fx * scale, self.fy * scale, c.x, c.y)
    }
}

/// Rotation matrix from the continuous 6D representation: the first three
/// values give the x axis, the last three a vector in the xy plane.
pub fn rotation_from_ortho6d(poses: &[f32; 6]) -> na::Matrix3<f32> {
    let x_raw = na::Vector3::new(poses[0], poses[1], poses[2]);
    let y_raw = na::Vector3::new(poses[3], poses[4], poses[5]);

    let x = x_raw / (x_raw.norm() + 1e-8);
    let z_raw = x.cross(&y_raw);
    let z = z_raw / (z_raw.norm() + 1e-8);
    let y = z.cross(&x);

    na::Matrix3::from_columns(&[x, y, z])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn logit_inverts_sigmoid() {
        assert_abs_diff_eq!(logit(0.5), 0.0);
        assert_relative_eq!(1.0 / (1.0 + (-logit(0.9)).exp()), 0.9, epsilon = 1e-6);
    }

    #[test]
    fn crop_keeps_aspect_ratio() {
        let (cx, cy, w, h) = person_agnostic_crop(1280.0, 720.0, 256.0, 256.0);

        assert_eq!((cx, cy), (640.0, 360.0));
        assert_eq!((w, h), (1280.0, 1280.0));

        let (_, _, w, h) = person_agnostic_crop(720.0, 1280.0, 256.0, 512.0);
        assert_eq!((w, h), (720.0, 1440.0));
    }

    #[test]
    fn texture_image_round_trip() {
        let sizes = [
            (1280.0, 720.0, 256.0, 256.0),
            (720.0, 1280.0, 192.0, 256.0),
            (256.0, 256.0, 256.0, 256.0),
        ];

        for (w, h, cw, ch) in sizes {
            for p in [
                na::Point2::new(0.0, 0.0),
                na::Point2::new(17.25, 201.5),
                na::Point2::new(cw - 1.0, ch - 1.0),
            ] {
                let back = image_to_tex_coords(tex_to_image_coords(p, w, h, cw, ch), w, h, cw, ch);
                assert_relative_eq!(back, p, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn crop_transform_agrees_with_point_mapping() {
        let (w, h, cw, ch) = (1280.0, 720.0, 256.0, 256.0);
        let trans = crop_transform(w, h, cw, ch);
        let p = na::Point2::new(300.0, 500.0);

        let by_matrix = trans * na::Vector3::new(p.x, p.y, 1.0);
        let by_fn = image_to_tex_coords(p, w, h, cw, ch);

        assert_relative_eq!(by_matrix.x, by_fn.x, epsilon = 1e-3);
        assert_relative_eq!(by_matrix.y, by_fn.y, epsilon = 1e-3);
        assert_relative_eq!(transform_jacobian(&trans), 0.04, epsilon = 1e-6);
    }

    #[test]
    fn intrinsics_follow_the_crop() {
        let cam = Intrinsics::new(1000.0, 1000.0, 640.0, 360.0);
        let out = cam.transform(&crop_transform(1280.0, 720.0, 256.0, 256.0));

        assert_relative_eq!(out.fx, 200.0, epsilon = 1e-3);
        assert_relative_eq!(out.fy, 200.0, epsilon = 1e-3);
        assert_relative_eq!(out.cx, 128.0, epsilon = 1e-3);
        assert_relative_eq!(out.cy, 128.0, epsilon = 1e-3);
    }

    #[test]
    fn fov_intrinsics() {
        let k = Intrinsics::from_fov(640.0, 480.0, std::f32::consts::FRAC_PI_2);

        assert_relative_eq!(k.fy, 240.0, epsilon = 1e-3);
        assert_eq!((k.cx, k.cy), (320.0, 240.0));
    }

    #[test]
    fn ortho6d_is_orthonormal() {
        let m = rotation_from_ortho6d(&[2.0, 0.1, -0.3, 0.4, 3.0, 0.2]);

        assert_relative_eq!(m.transpose() * m, na::Matrix3::identity(), epsilon = 1e-5);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-5);

        let id = rotation_from_ortho6d(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_relative_eq!(id, na::Matrix3::identity(), epsilon = 1e-6);
    }
}
