use nalgebra as na;
use std::collections::HashMap;

use crate::config::{DecoderConfig, ModelDims};
use crate::math::{image_to_tex_coords, tex_to_image_coords};
use crate::one_euro::{OneEuroFilter, OneEuroFilterQuat, OneEuroFilterXY};
use crate::Track;

/// Smoothing state of one track.
#[derive(Debug, Clone)]
pub struct FilterGroup {
    pub position: OneEuroFilterXY<f32>,
    pub translation_xy: OneEuroFilterXY<f32>,
    pub translation_z: OneEuroFilter<f32>,
    pub rotation: OneEuroFilterQuat,
}

impl FilterGroup {
    pub fn new(cfg: &DecoderConfig) -> Self {
        Self {
            position: (cfg.freq, cfg.filter_2d).into(),
            translation_xy: (cfg.freq, cfg.filter_xy).into(),
            translation_z: (cfg.freq, cfg.filter_z).into(),
            rotation: (cfg.freq, cfg.filter_rotation).into(),
        }
    }
}

/// Per-track filters, keyed by track id.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    groups: HashMap<u32, FilterGroup>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.groups.contains_key(&id)
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&FilterGroup> {
        self.groups.get(&id)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Drops filters of tracks that are gone and creates filters for tracks
    /// born this frame.
    pub fn reconcile(&mut self, tracks: &[Track], cfg: &DecoderConfig) {
        self.groups.retain(|id, _| tracks.iter().any(|t| t.id == *id));

        for t in tracks.iter().filter(|t| t.track_duration == 0) {
            self.groups.insert(t.id, FilterGroup::new(cfg));
        }
    }

    fn group_mut(&mut self, id: u32) -> Option<&mut FilterGroup> {
        let group = self.groups.get_mut(&id);
        if group.is_none() {
            log::warn!("no One-Euro filter for track {}, left unfiltered", id);
        }

        group
    }

    /// Smooths 2-D locations. Filtering runs in camera image pixels so the
    /// cutoffs do not depend on the model input size.
    pub fn smooth_positions(
        &mut self,
        tracks: &mut [Track],
        dims: &ModelDims,
        timestamp: Option<f32>,
    ) {
        let (w, h) = (dims.image_width as f32, dims.image_height as f32);
        let (cw, ch) = (dims.input_width as f32, dims.input_height as f32);

        for t in tracks.iter_mut() {
            let group = match self.group_mut(t.id) {
                Some(g) => g,
                None => continue,
            };

            let img = tex_to_image_coords(t.position(), w, h, cw, ch);
            let filtered = group.position.filter(img.coords, timestamp);
            let tex = image_to_tex_coords(na::Point2::from(filtered), w, h, cw, ch);

            t.x = tex.x;
            t.y = tex.y;
        }
    }

    /// Smooths 3-D translations: x/y jointly, z on its own.
    pub fn smooth_translations(&mut self, tracks: &mut [Track], timestamp: Option<f32>) {
        for t in tracks.iter_mut() {
            let pose = match t.pose.as_mut() {
                Some(p) => p,
                None => continue,
            };

            let group = match self.group_mut(t.id) {
                Some(g) => g,
                None => continue,
            };

            let xy = group.translation_xy.filter(pose.translation.xy(), timestamp);
            let z = group.translation_z.filter(pose.translation.z, timestamp);

            pose.translation = na::Vector3::new(xy.x, xy.y, z);
        }
    }

    pub fn smooth_rotations(&mut self, tracks: &mut [Track], timestamp: Option<f32>) {
        for t in tracks.iter_mut() {
            let pose = match t.pose.as_mut() {
                Some(p) => p,
                None => continue,
            };

            let group = match self.group_mut(t.id) {
                Some(g) => g,
                None => continue,
            };

            let quat = group.rotation.filter(pose.quat, timestamp);
            pose.set_quat(quat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::track::Pose;
    use approx::assert_relative_eq;

    fn track(id: u32, duration: u32, x: f32) -> Track {
        Track {
            track_duration: duration,
            ..Track::new(id, &Detection::new(x, 10.0, 1.0))
        }
    }

    #[test]
    fn registry_follows_live_tracks() {
        let cfg = DecoderConfig::default();
        let mut reg = FilterRegistry::new();

        reg.reconcile(&[track(0, 0, 1.0), track(1, 0, 2.0)], &cfg);
        assert_eq!(reg.len(), 2);

        // track 0 died, track 2 was born, track 1 keeps its filters
        reg.reconcile(&[track(1, 1, 2.0), track(2, 0, 3.0)], &cfg);
        assert!(!reg.contains(0));
        assert!(reg.contains(1));
        assert!(reg.contains(2));

        reg.reconcile(&[], &cfg);
        assert!(reg.is_empty());
    }

    #[test]
    fn missing_filter_leaves_track_untouched() {
        let mut reg = FilterRegistry::new();
        let mut tracks = vec![track(5, 3, 42.0)];

        reg.smooth_positions(&mut tracks, &ModelDims::default(), None);
        assert_eq!(tracks[0].x, 42.0);
    }

    #[test]
    fn positions_are_smoothed_in_image_space() {
        let cfg = DecoderConfig {
            dims: ModelDims {
                image_width: 1280,
                image_height: 720,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut reg = FilterRegistry::new();

        let mut tracks = vec![track(0, 0, 100.0)];
        reg.reconcile(&tracks, &cfg);
        reg.smooth_positions(&mut tracks, &cfg.dims, Some(0.0));
        // first sample passes through the round trip
        assert_relative_eq!(tracks[0].x, 100.0, epsilon = 1e-3);

        let mut tracks = vec![track(0, 1, 120.0)];
        reg.smooth_positions(&mut tracks, &cfg.dims, Some(0.05));
        assert!(tracks[0].x > 100.0 && tracks[0].x < 120.0);
        assert_relative_eq!(tracks[0].y, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn poses_are_smoothed() {
        let cfg = DecoderConfig::default();
        let mut reg = FilterRegistry::new();

        let mut a = track(0, 0, 0.0);
        a.pose = Some(Pose::new(
            na::Vector3::new(0.0, 0.0, -10.0),
            na::UnitQuaternion::identity(),
        ));
        reg.reconcile(std::slice::from_ref(&a), &cfg);

        let mut tracks = vec![a];
        reg.smooth_translations(&mut tracks, None);
        reg.smooth_rotations(&mut tracks, None);
        assert_eq!(tracks[0].pose.as_ref().unwrap().translation.z, -10.0);

        let turned = na::UnitQuaternion::from_euler_angles(0.0, 0.4, 0.0);
        tracks[0].pose = Some(Pose::new(na::Vector3::new(1.0, 1.0, -12.0), turned));
        tracks[0].track_duration = 1;

        reg.smooth_translations(&mut tracks, None);
        reg.smooth_rotations(&mut tracks, None);

        let pose = tracks[0].pose.as_ref().unwrap();
        assert!(pose.translation.z < -10.0 && pose.translation.z > -12.0);
        assert!(pose.translation.x > 0.0 && pose.translation.x < 1.0);
        assert!(pose.quat.angle() > 0.0 && pose.quat.angle() < 0.4);
        assert_relative_eq!(
            pose.quat.to_rotation_matrix().into_inner(),
            pose.rotation,
            epsilon = 1e-6
        );
    }
}
