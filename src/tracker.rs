use ndarray::prelude::*;
use std::collections::HashMap;

use crate::config::{DecoderConfig, PairCriterion};
use crate::detection::Detection;
use crate::tensor::sample_2d;
use crate::Track;

/// Frame-to-frame identity association.
///
/// Keeps the tracks of the previous frame and hands out ids. Matching is
/// greedy: previous tracks are visited oldest id first and each one claims
/// the nearest unclaimed detection within `tracking_radius`.
#[derive(Debug, Clone)]
pub struct Tracker {
    previous: Vec<Track>,
    next_id: u32,
    tracking_radius: f32,
    memory_cliff: u32,
}

impl Tracker {
    pub fn new(tracking_radius: f32, memory_cliff: u32) -> Self {
        Self {
            previous: Vec::new(),
            next_id: 0,
            tracking_radius,
            memory_cliff,
        }
    }

    #[inline]
    pub fn previous(&self) -> &[Track] {
        &self.previous
    }

    #[inline]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Stores the final tracks of this frame for matching the next one.
    pub fn remember(&mut self, tracks: &[Track]) {
        self.previous.clear();
        self.previous.extend_from_slice(tracks);
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }

    /// Associates `detections` with the remembered tracks.
    ///
    /// The result holds matched continuations first (in matching order),
    /// then new tracks, then unmatched tracks still inside the memory
    /// window. The remembered tracks are not modified.
    pub fn match_centers(&mut self, detections: &[Detection]) -> Vec<Track> {
        let mut order: Vec<usize> = (0..self.previous.len()).collect();
        order.sort_by_key(|&i| (self.previous[i].id, self.previous[i].age));

        let mut claimed = vec![false; detections.len()];
        let mut prev_matched = vec![false; self.previous.len()];
        let mut tracks = Vec::with_capacity(detections.len() + self.previous.len());

        for &p in &order {
            let prev = &self.previous[p];

            let nearest = detections
                .iter()
                .enumerate()
                .filter(|(c, _)| !claimed[*c])
                .map(|(c, det)| (c, prev.distance(det)))
                .fold(None, |best: Option<(usize, f32)>, (c, dist)| match best {
                    Some((_, d)) if d <= dist => best,
                    _ => Some((c, dist)),
                });

            if let Some((c, dist)) = nearest {
                if dist < self.tracking_radius {
                    claimed[c] = true;
                    prev_matched[p] = true;
                    tracks.push(Track::matched_from(prev, &detections[c]));
                }
            }
        }

        for (det, _) in detections.iter().zip(&claimed).filter(|(_, taken)| !**taken) {
            let track = Track::new(self.next_id, det);
            log::trace!("track {} born at ({:.1}, {:.1})", track.id, track.x, track.y);

            self.next_id += 1;
            tracks.push(track);
        }

        for &p in &order {
            let prev = &self.previous[p];

            if prev_matched[p] {
                continue;
            }

            if prev.age < self.memory_cliff {
                tracks.push(Track::carried_from(prev));
            } else {
                log::trace!("track {} evicted after {} frames", prev.id, prev.track_duration);
            }
        }

        tracks
    }
}

impl From<&DecoderConfig> for Tracker {
    fn from(cfg: &DecoderConfig) -> Self {
        Self::new(cfg.tracking_radius, cfg.memory_cliff)
    }
}

/// Samples the left/right logit at every track: positive means right.
pub fn classify_sides(tracks: &mut [Track], lr_logits: &ArrayView2<'_, f32>, stride: f32) {
    for t in tracks.iter_mut() {
        t.lr_score = sample_2d(lr_logits, t.x, t.y, stride);
        t.is_right = t.lr_score > 0.0;
    }
}

/// Drops brand-new tracks whose score is below `upper_bound`.
pub fn gate_new_tracks(tracks: &mut Vec<Track>, upper_bound: f32) {
    tracks.retain(|t| {
        let keep = t.track_duration > 0 || t.score >= upper_bound;
        if !keep {
            log::trace!("track {} below hysteresis bound ({})", t.id, t.score);
        }

        keep
    });
}

/// Makes the side of known tracks sticky: a right foot stays right until
/// its logit drops to -1 or below, a left foot turns right only above 1.
pub fn stabilize_sides(tracks: &mut [Track], previous: &[Track]) {
    let sides: HashMap<u32, bool> = previous.iter().map(|p| (p.id, p.is_right)).collect();

    for t in tracks.iter_mut() {
        if let Some(&was_right) = sides.get(&t.id) {
            t.is_right = if was_right {
                t.lr_score > -1.0
            } else {
                t.lr_score > 1.0
            };
        }
    }
}

#[inline]
fn rank(t: &Track, criterion: PairCriterion) -> f32 {
    match criterion {
        PairCriterion::TrackDuration => t.track_duration as f32,
        PairCriterion::Score => t.score,
    }
}

// index of the first maximum
fn best_by<'a, I>(tracks: I, criterion: PairCriterion) -> Option<usize>
where
    I: Iterator<Item = (usize, &'a Track)>,
{
    tracks
        .fold(None, |best: Option<(usize, f32)>, (i, t)| {
            let r = rank(t, criterion);
            match best {
                Some((_, b)) if b >= r => best,
                _ => Some((i, r)),
            }
        })
        .map(|(i, _)| i)
}

/// Marks the best track and the best track of the opposite side as the
/// selected pair. Returns the selected indices.
pub fn select_best_pair(
    tracks: &mut [Track],
    criterion: PairCriterion,
) -> (Option<usize>, Option<usize>) {
    for t in tracks.iter_mut() {
        t.selected_pair = false;
    }

    let first = match best_by(tracks.iter().enumerate(), criterion) {
        Some(i) => i,
        None => return (None, None),
    };

    let side = tracks[first].is_right;
    // the partner must rank above zero: a brand-new foot never completes a pair
    let second = best_by(
        tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_right != side && rank(t, criterion) > 0.0),
        criterion,
    );

    tracks[first].selected_pair = true;
    if let Some(i) = second {
        tracks[i].selected_pair = true;
    }

    (Some(first), second)
}
