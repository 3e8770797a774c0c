use crate::config::DecoderConfig;
use crate::decoder::CenterDecoder;
use crate::error::Error;
use crate::filters::FilterRegistry;
use crate::frame::Frame;
use crate::math::{crop_transform, Intrinsics};
use crate::pose::PoseReconstructor;
use crate::tracker::{classify_sides, gate_new_tracks, select_best_pair, stabilize_sides, Tracker};
use crate::Track;

/// Per-source foot decoding pipeline.
///
/// Owns everything that survives between frames: the tracker memory, the
/// per-track One-Euro filters and the latest output. Every call to
/// [`FootDecoder::decode_feet`] runs the same stages in the same order:
///
/// decode centers, track, classify sides, hysteresis, reconcile filters,
/// select the best pair, smooth 2-D, reconstruct poses, smooth 3-D.
#[derive(Debug, Clone)]
pub struct FootDecoder {
    config: DecoderConfig,
    camera: Intrinsics,
    centers: CenterDecoder,
    tracker: Tracker,
    poses: PoseReconstructor,
    filters: FilterRegistry,
    tracks: Vec<Track>,
    feet_found: bool,
    frame_count: u64,
}

impl FootDecoder {
    /// `camera` are the intrinsics of the full camera image; they are mapped
    /// into model input pixels here.
    pub fn new(config: DecoderConfig, camera: Intrinsics) -> Result<Self, Error> {
        config.dims.validate()?;
        config.validate();

        let intrinsics = Self::input_intrinsics(&config, &camera);
        log::debug!("model input intrinsics {:?}", intrinsics);

        Ok(Self {
            centers: CenterDecoder::new((&config).into()),
            tracker: (&config).into(),
            poses: PoseReconstructor::new(intrinsics, config.stride),
            filters: FilterRegistry::new(),
            tracks: Vec::new(),
            feet_found: false,
            frame_count: 0,
            camera,
            config,
        })
    }

    fn input_intrinsics(config: &DecoderConfig, camera: &Intrinsics) -> Intrinsics {
        let dims = &config.dims;
        let trans = crop_transform(
            dims.image_width as f32,
            dims.image_height as f32,
            dims.input_width as f32,
            dims.input_height as f32,
        );

        camera.transform(&trans)
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[inline]
    pub fn camera_intrinsics(&self) -> &Intrinsics {
        &self.camera
    }

    /// Intrinsics in model input pixels, as used for back-projection.
    #[inline]
    pub fn intrinsics(&self) -> &Intrinsics {
        self.poses.intrinsics()
    }

    pub fn set_camera_intrinsics(&mut self, camera: Intrinsics) {
        self.poses.set_intrinsics(Self::input_intrinsics(&self.config, &camera));
        self.camera = camera;
    }

    /// Tracks produced by the last frame, in tracker order.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Tracks of the last frame the host should render.
    pub fn displayable(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| t.is_displayable(&self.config))
            .cloned()
            .collect()
    }

    /// Raised by the first frame with exactly two tracks, then stays up.
    #[inline]
    pub fn feet_found(&self) -> bool {
        self.feet_found
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Forgets every track and filter. Ids keep counting up.
    pub fn reset(&mut self) {
        self.tracker.clear();
        self.filters.clear();
        self.tracks.clear();
        self.feet_found = false;
    }

    /// Runs the whole pipeline on one frame.
    ///
    /// Tensor shapes are checked first; on error nothing is changed.
    pub fn decode_feet(&mut self, frame: &Frame<'_>) -> Result<&[Track], Error> {
        let views = frame.views(&self.config.dims)?;
        let timestamp = frame.timestamp();
        let stride = self.config.stride;

        let centers = self.centers.decode(views.heatmap.view(), views.offsets.view());
        let mut tracks = self.tracker.match_centers(&centers);

        classify_sides(&mut tracks, &views.lr_logits, stride);

        if self.config.hysteresis_enabled {
            gate_new_tracks(&mut tracks, self.config.hysteresis_ub);
            stabilize_sides(&mut tracks, self.tracker.previous());
        }

        self.filters.reconcile(&tracks, &self.config);

        select_best_pair(&mut tracks, self.config.pair_criterion);

        if self.config.one_euro_2d_enabled {
            self.filters.smooth_positions(&mut tracks, &self.config.dims, timestamp);
        }

        self.poses.reconstruct_all(
            &mut tracks,
            &views.translation,
            &views.rotation,
            &views.disparity,
        );

        if self.config.one_euro_3d_enabled {
            self.filters.smooth_translations(&mut tracks, timestamp);
        }

        if self.config.one_euro_rotation_enabled {
            self.filters.smooth_rotations(&mut tracks, timestamp);
        }

        log::debug!(
            "frame {}: {} centers, {} tracks, {} filtered",
            self.frame_count,
            centers.len(),
            tracks.len(),
            self.filters.len()
        );

        self.tracker.remember(&tracks);

        if !self.feet_found && tracks.len() == 2 {
            log::debug!("both feet found at frame {}", self.frame_count);
            self.feet_found = true;
        }

        self.frame_count += 1;
        self.tracks = tracks;

        Ok(&self.tracks)
    }
}
