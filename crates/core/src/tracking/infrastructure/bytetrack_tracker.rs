/// Simplified ByteTrack multi-object tracker.
///
/// High-confidence boxes are associated first; low-confidence boxes may only
/// extend tracks that are already alive, so a momentary confidence drop does
/// not break a face's track while weak boxes never open new ones.
use std::collections::HashSet;

use crate::tracking::domain::multi_object_tracker::{
    MultiObjectTracker, TrackedObject, TrackerFactory,
};

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
pub struct Observation {
    pub bbox: [f64; 4],
    pub score: f64,
}

#[derive(Clone, Debug)]
pub struct Track {
    pub id: u32,
    pub bbox: [f64; 4],
    pub observation: Option<usize>,
}

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    frames_lost: usize,
    matched: bool,
    observation: Option<usize>,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    max_lost: usize,
}

impl ByteTracker {
    pub fn new(max_lost: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
        }
    }

    /// Factory producing independent trackers with the same `max_lost`.
    pub fn factory(max_lost: usize) -> TrackerFactory {
        Box::new(move || Box::new(ByteTracker::new(max_lost)))
    }

    pub fn update(&mut self, observations: &[Observation]) -> Vec<Track> {
        let (high, low) = split_by_confidence(observations);

        for track in &mut self.tracks {
            track.matched = false;
            track.observation = None;
        }
        let num_existing = self.tracks.len();

        let all_refs = self.track_refs(|_| true);
        let mut matched_high = HashSet::new();
        for (ti, oi) in greedy_match(&all_refs, &high) {
            self.apply_match(ti, oi, &observations[oi].bbox);
            matched_high.insert(oi);
        }

        let unmatched_refs = self.track_refs(|t| !t.matched);
        for (ti, oi) in greedy_match(&unmatched_refs, &low) {
            self.apply_match(ti, oi, &observations[oi].bbox);
        }

        for (oi, obs) in &high {
            if !matched_high.contains(oi) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: obs.bbox,
                    frames_lost: 0,
                    matched: true,
                    observation: Some(*oi),
                });
                self.next_id += 1;
            }
        }

        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        // Lost tracks stay internal for re-association but are not reported.
        self.tracks
            .iter()
            .filter(|t| t.matched)
            .map(|t| Track {
                id: t.id,
                bbox: t.bbox,
                observation: t.observation,
            })
            .collect()
    }

    fn track_refs(&self, keep: impl Fn(&TrackState) -> bool) -> Vec<(usize, [f64; 4])> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| keep(t))
            .map(|(i, t)| (i, t.bbox))
            .collect()
    }

    fn apply_match(&mut self, track_idx: usize, obs_idx: usize, bbox: &[f64; 4]) {
        let track = &mut self.tracks[track_idx];
        track.bbox = *bbox;
        track.frames_lost = 0;
        track.matched = true;
        track.observation = Some(obs_idx);
    }
}

impl MultiObjectTracker for ByteTracker {
    fn process(
        &mut self,
        objects: &[TrackedObject],
        _frame_index: u64,
    ) -> Result<Vec<TrackedObject>, Box<dyn std::error::Error>> {
        let observations: Vec<Observation> = objects
            .iter()
            .map(|o| Observation {
                bbox: o.rect.to_bbox(),
                score: o.confidence as f64,
            })
            .collect();

        self.update(&observations)
            .into_iter()
            .filter_map(|track| track.observation.map(|i| (track.id, i)))
            .map(|(id, i)| -> Result<TrackedObject, Box<dyn std::error::Error>> {
                let object = objects
                    .get(i)
                    .ok_or_else(|| format!("track {id} refers to missing object {i}"))?;
                Ok(TrackedObject {
                    object_id: Some(id as i64),
                    ..*object
                })
            })
            .collect()
    }
}

type IndexedObservations<'a> = Vec<(usize, &'a Observation)>;

fn split_by_confidence(
    observations: &[Observation],
) -> (IndexedObservations<'_>, IndexedObservations<'_>) {
    observations
        .iter()
        .enumerate()
        .partition(|(_, o)| o.score >= HIGH_THRESH)
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track and
/// observation used at most once.
fn greedy_match(
    tracks: &[(usize, [f64; 4])],
    observations: &[(usize, &Observation)],
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for (oi, obs) in observations {
            let score = bbox_iou(bbox, &obs.bbox);
            if score >= MATCH_THRESH {
                pairs.push((*ti, *oi, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_observations = HashSet::new();
    let mut matches = Vec::new();

    for (ti, oi, _) in pairs {
        if !used_tracks.contains(&ti) && !used_observations.contains(&oi) {
            used_tracks.insert(ti);
            used_observations.insert(oi);
            matches.push((ti, oi));
        }
    }
    matches
}

/// IoU between two boxes in `[x1, y1, x2, y2]` form.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::rect::PixelRect;

    fn obs(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Observation {
        Observation {
            bbox: [x1, y1, x2, y2],
            score,
        }
    }

    fn object(x: i32, y: i32, confidence: f32, frame_index: u64) -> TrackedObject {
        TrackedObject::new(PixelRect::new(x, y, 50, 50), confidence, frame_index)
    }

    #[test]
    fn test_new_observations_get_unique_ids() {
        let mut tracker = ByteTracker::new(5);
        let tracks = tracker.update(&[
            obs(0.0, 0.0, 50.0, 50.0, 0.9),
            obs(100.0, 100.0, 150.0, 150.0, 0.8),
        ]);
        assert_eq!(tracks.len(), 2);
        assert_ne!(tracks[0].id, tracks[1].id);
    }

    #[test]
    fn test_track_survives_within_max_lost() {
        let mut tracker = ByteTracker::new(3);
        let id = tracker.update(&[obs(10.0, 10.0, 60.0, 60.0, 0.9)])[0].id;

        tracker.update(&[]);
        tracker.update(&[]);

        let again = tracker.update(&[obs(12.0, 12.0, 62.0, 62.0, 0.9)]);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, id);
    }

    #[test]
    fn test_lost_track_removed() {
        let mut tracker = ByteTracker::new(1);
        let id = tracker.update(&[obs(10.0, 10.0, 60.0, 60.0, 0.9)])[0].id;
        tracker.update(&[]);
        tracker.update(&[]);
        let again = tracker.update(&[obs(10.0, 10.0, 60.0, 60.0, 0.9)]);
        assert_ne!(again[0].id, id);
    }

    #[test]
    fn test_low_confidence_extends_but_never_starts_track() {
        let mut tracker = ByteTracker::new(5);
        assert!(tracker.update(&[obs(200.0, 200.0, 250.0, 250.0, 0.3)]).is_empty());

        let id = tracker.update(&[obs(10.0, 10.0, 60.0, 60.0, 0.9)])[0].id;
        let t = tracker.update(&[obs(12.0, 12.0, 62.0, 62.0, 0.3)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].id, id);
    }

    #[test]
    fn test_process_echoes_objects_with_ids() {
        let mut tracker = ByteTracker::new(5);
        let input = [object(0, 0, 0.9, 4), object(200, 200, 0.95, 4)];

        let out = tracker.process(&input, 4).unwrap();

        assert_eq!(out.len(), 2);
        for o in &out {
            assert!(o.object_id.is_some());
            assert!(input.iter().any(|i| i.rect == o.rect && i.frame_index == 4));
        }
    }

    #[test]
    fn test_process_keeps_id_for_moving_object() {
        let mut tracker = ByteTracker::new(5);
        let a = tracker.process(&[object(10, 10, 0.9, 0)], 0).unwrap();
        let b = tracker.process(&[object(14, 12, 0.9, 2)], 2).unwrap();
        assert_eq!(a[0].object_id, b[0].object_id);
        assert_eq!(b[0].rect, PixelRect::new(14, 12, 50, 50));
    }

    #[test]
    fn test_factory_builds_independent_trackers() {
        let factory = ByteTracker::factory(5);
        let mut first = factory();
        let mut second = factory();
        first.process(&[object(0, 0, 0.9, 0)], 0).unwrap();
        first.process(&[object(100, 100, 0.9, 1)], 1).unwrap();
        let fresh = second.process(&[object(0, 0, 0.9, 0)], 0).unwrap();
        assert_eq!(fresh[0].object_id, Some(1));
    }

    #[test]
    fn test_iou_no_overlap() {
        assert_eq!(bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let expected = 25.0 / 175.0;
        let iou = bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 5.0, 15.0, 15.0]);
        assert!((iou - expected).abs() < 1e-9);
    }
}
