use approx::assert_relative_eq;
use shoetrack::{DecoderConfig, FootDecoder, FootTracker, Frame, Intrinsics, ModelDims, Tracking};

const HW: usize = 16;
const INPUT: f32 = 64.0;

/// Synthetic network output on a `HW x HW` grid.
struct Output {
    heatmap: Vec<f32>,
    offsets: Vec<f32>,
    lr: Vec<f32>,
    translation: Vec<f32>,
    rotation: Vec<f32>,
    disparity: Vec<f32>,
}

impl Output {
    fn empty() -> Self {
        let rotation = (0..HW * HW)
            .flat_map(|_| [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .collect();

        Self {
            heatmap: vec![-8.0; HW * HW],
            offsets: vec![0.0; HW * HW * 2],
            lr: vec![0.0; HW * HW],
            translation: vec![0.0; HW * HW * 4],
            rotation,
            disparity: vec![0.0; HW * HW],
        }
    }

    /// Center peak with a left/right logit painted over its column band.
    fn foot(mut self, row: usize, col: usize, lr: f32) -> Self {
        self.heatmap[row * HW + col] = 4.0;
        for r in 0..HW {
            for c in col.saturating_sub(2)..(col + 3).min(HW) {
                self.lr[r * HW + c] = lr;
            }
        }

        self
    }

    fn frame(&self, timestamp: f32) -> Frame<'_> {
        Frame {
            timestamp,
            heatmap: &self.heatmap,
            offsets: &self.offsets,
            lr_logits: &self.lr,
            translation: &self.translation,
            rotation: &self.rotation,
            disparity: &self.disparity,
        }
    }
}

fn cell(i: usize) -> f32 {
    i as f32 * INPUT / (HW - 1) as f32
}

fn config() -> DecoderConfig {
    DecoderConfig::with_dims(ModelDims {
        image_width: 64,
        image_height: 64,
        input_width: 64,
        input_height: 64,
        heatmap_width: HW as u32,
        heatmap_height: HW as u32,
    })
}

fn camera() -> Intrinsics {
    Intrinsics::new(80.0, 80.0, 32.0, 32.0)
}

fn ids(decoder: &FootDecoder) -> Vec<u32> {
    decoder.tracks().iter().map(|t| t.id).collect()
}

#[test]
fn single_cell_heatmap() {
    let mut decoder = FootDecoder::new(config(), camera()).unwrap();
    let out = Output::empty().foot(5, 9, -3.0);

    let tracks = decoder.decode_feet(&out.frame(0.0)).unwrap();
    assert_eq!(tracks.len(), 1);

    let t = &tracks[0];
    assert_eq!(t.id, 0);
    assert_eq!(t.age, 0);
    assert_eq!(t.track_duration, 0);
    assert!(!t.matched);
    assert!(!t.is_right);
    assert_relative_eq!(t.x, cell(9), epsilon = 1e-3);
    assert_relative_eq!(t.y, cell(5), epsilon = 1e-3);

    let pose = t.pose.as_ref().unwrap();
    // camera looks down -z after the flip
    assert!(pose.translation.z < 0.0);
}

#[test]
fn two_tracks_continue() {
    let mut decoder = FootDecoder::new(config(), camera()).unwrap();

    for step in 0..6 {
        let out = Output::empty().foot(8, 3 + step / 2, -3.0).foot(8, 11 + step / 2, 3.0);
        decoder.decode_feet(&out.frame(step as f32 * 0.05)).unwrap();

        let mut got = ids(&decoder);
        got.sort_unstable();
        assert_eq!(got, vec![0, 1], "step {}", step);
    }

    let tracks = decoder.tracks();
    assert!(tracks.iter().all(|t| t.matched && t.track_duration == 5));
    assert!(tracks.iter().all(|t| t.selected_pair));

    let left = tracks.iter().find(|t| !t.is_right).unwrap();
    let right = tracks.iter().find(|t| t.is_right).unwrap();
    assert!(left.x < right.x);

    assert_eq!(decoder.displayable().len(), 2);
    assert!(decoder.feet_found());
}

#[test]
fn unmatched_track_is_evicted_after_memory_window() {
    let mut cfg = config();
    cfg.memory_cliff = 2;
    let mut decoder = FootDecoder::new(cfg, camera()).unwrap();

    let foot = Output::empty().foot(7, 7, 0.0);
    let none = Output::empty();

    decoder.decode_feet(&foot.frame(0.0)).unwrap();
    assert_eq!(ids(&decoder), vec![0]);

    // carried for memory_cliff frames
    for (i, ts) in [0.05, 0.10].iter().enumerate() {
        decoder.decode_feet(&none.frame(*ts)).unwrap();
        let t = &decoder.tracks()[0];
        assert_eq!(t.id, 0);
        assert_eq!(t.age, i as u32 + 1);
        assert!(!t.matched);
        assert!(decoder.displayable().is_empty());
    }

    decoder.decode_feet(&none.frame(0.15)).unwrap();
    assert!(decoder.tracks().is_empty());
    assert!(decoder.filters().is_empty());

    // same place, but the identity is gone
    decoder.decode_feet(&foot.frame(0.20)).unwrap();
    assert_eq!(ids(&decoder), vec![1]);
}

#[test]
fn identity_survives_a_short_gap() {
    let mut cfg = config();
    cfg.memory_cliff = 2;
    let mut decoder = FootDecoder::new(cfg, camera()).unwrap();

    let foot = Output::empty().foot(7, 7, 0.0);
    let none = Output::empty();

    decoder.decode_feet(&foot.frame(0.0)).unwrap();
    decoder.decode_feet(&none.frame(0.05)).unwrap();
    decoder.decode_feet(&foot.frame(0.10)).unwrap();

    let t = &decoder.tracks()[0];
    assert_eq!(decoder.tracks().len(), 1);
    assert_eq!(t.id, 0);
    assert_eq!(t.age, 0);
    assert!(t.matched);
    assert_eq!(t.track_duration, 2);
}

#[test]
fn only_one_pair_hides_the_rest() {
    let mut cfg = config();
    cfg.only_one_pair = true;
    let mut decoder = FootDecoder::new(cfg, camera()).unwrap();

    let two = Output::empty().foot(4, 2, -3.0).foot(4, 13, -3.0);
    let three = Output::empty().foot(4, 2, -3.0).foot(4, 13, -3.0).foot(12, 7, 3.0);

    // ids 0 and 1 get a head start
    decoder.decode_feet(&two.frame(0.0)).unwrap();
    for i in 1..4 {
        decoder.decode_feet(&three.frame(i as f32 * 0.05)).unwrap();
    }

    let shown = decoder.displayable();
    assert_eq!(shown.len(), 2);
    // oldest left foot plus the only right foot
    assert!(shown.iter().any(|t| t.id == 0 && !t.is_right));
    assert!(shown.iter().any(|t| t.id == 2 && t.is_right));
}

#[test]
fn sources_are_tracked_independently() {
    let mut tracker = FootTracker::new(config(), camera());
    let a = Output::empty().foot(3, 3, 0.0);
    let b = Output::empty().foot(12, 12, 0.0).foot(3, 3, 0.0);

    for i in 0..3 {
        let ts = i as f32 * 0.05;
        tracker.update(&a.frame(ts), "left-cam").unwrap();
        tracker.update(&b.frame(ts), "right-cam").unwrap();
    }

    assert_eq!(tracker.tracks("left-cam").len(), 1);
    assert_eq!(tracker.tracks("right-cam").len(), 2);
    assert!(tracker.tracks("unknown").is_empty());

    // ids are per source
    assert_eq!(tracker.decoder("left-cam").unwrap().tracks()[0].id, 0);
    assert!(tracker.decoder("right-cam").unwrap().feet_found());
    assert!(!tracker.decoder("left-cam").unwrap().feet_found());

    assert!(tracker.remove("left-cam").is_some());
    assert!(tracker.decoder("left-cam").is_none());
}

#[test]
fn malformed_frame_is_rejected() {
    let mut tracker = FootTracker::new(config(), camera());
    let out = Output::empty().foot(3, 3, 0.0);

    let mut frame = out.frame(0.0);
    frame.heatmap = &out.heatmap[..HW];

    assert!(tracker.update(&frame, "cam").is_err());
    assert!(tracker.tracks("cam").is_empty());
}
