use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::recognition::domain::detection::Detection;
use crate::shared::error::PipelineError;
use crate::shared::event::Event;
use crate::shared::frame::Frame;
use crate::shared::rect::PixelRect;

use super::id_mapper::IdMapper;
use super::multi_object_tracker::{MultiObjectTracker, TrackedObject};

/// Key that survives a trip through the tracker, which only sees geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct CompositeDetectionId {
    frame_index: u64,
    rect: PixelRect,
}

/// Detections with stable track ids, plus the events they produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerResult {
    pub detections: Vec<Detection>,
    pub events: Vec<Event>,
}

/// Per-session tracking stage: runs the tracker, restores the recognition
/// payload of each detection, stabilizes ids and derives lifecycle events.
pub struct FaceTracker {
    tracker: Box<dyn MultiObjectTracker>,
    id_mapper: IdMapper,
    detection_active: bool,
}

impl FaceTracker {
    pub fn new(tracker: Box<dyn MultiObjectTracker>) -> Self {
        Self {
            tracker,
            id_mapper: IdMapper::new(),
            detection_active: false,
        }
    }

    pub fn is_detection_active(&self) -> bool {
        self.detection_active
    }

    pub fn run(
        &mut self,
        frame: &Frame,
        detections: Vec<Detection>,
    ) -> Result<TrackerResult, PipelineError> {
        let (fw, fh) = (frame.width(), frame.height());
        let frame_index = frame.index();

        let mut payloads: BTreeMap<CompositeDetectionId, VecDeque<Detection>> = BTreeMap::new();
        let mut objects = Vec::with_capacity(detections.len());
        for detection in detections {
            let rect = detection.bounding_box.to_pixel_rect(fw, fh);
            objects.push(TrackedObject::new(rect, detection.confidence, frame_index));
            payloads
                .entry(CompositeDetectionId { frame_index, rect })
                .or_default()
                .push_back(detection);
        }

        let tracked = self
            .tracker
            .process(&objects, frame_index)
            .map_err(|e| PipelineError::Tracking(e.to_string()))?;

        let timestamp_us = frame.timestamp_us();
        let mut result = TrackerResult::default();
        let mut live_ids = HashSet::new();

        for object in tracked {
            let object_id = object.object_id.ok_or_else(|| {
                PipelineError::Tracking(format!("tracked object at {:?} has no id", object.rect))
            })?;
            let key = CompositeDetectionId {
                frame_index: object.frame_index,
                rect: object.rect,
            };
            let mut detection = payloads
                .get_mut(&key)
                .and_then(|queue| queue.pop_front())
                .ok_or_else(|| {
                    PipelineError::Tracking(format!(
                        "no detection for tracked object {object_id} at {:?}",
                        object.rect
                    ))
                })?;

            detection.track_id = self.id_mapper.get(object_id);
            live_ids.insert(detection.track_id);
            result
                .events
                .push(Event::object_detected(timestamp_us, &detection.class_label));
            result.detections.push(detection);
        }

        self.id_mapper.remove_all_except(&live_ids);

        if !result.detections.is_empty() && !self.detection_active {
            self.detection_active = true;
            result.events.insert(0, Event::detection_started(timestamp_us));
        } else if result.detections.is_empty() && self.detection_active {
            self.detection_active = false;
            result.events.push(Event::detection_finished(timestamp_us));
        }

        Ok(result)
    }
}
