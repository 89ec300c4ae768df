use crate::shared::rect::PixelRect;

/// Tracker-native view of one detection: geometry and confidence only.
///
/// `frame_index` and `rect` are echoed back unchanged so callers can
/// re-associate tracker output with their own records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedObject {
    pub rect: PixelRect,
    pub confidence: f32,
    pub frame_index: u64,
    /// Per-session track id; `None` on input, set on output.
    pub object_id: Option<i64>,
}

impl TrackedObject {
    pub fn new(rect: PixelRect, confidence: f32, frame_index: u64) -> Self {
        Self {
            rect,
            confidence,
            frame_index,
            object_id: None,
        }
    }
}

/// Frame-to-frame association of bounding boxes.
///
/// Returns the objects that belong to a live track in this frame, each with
/// `object_id` set. Ids are stable for the lifetime of the instance only.
pub trait MultiObjectTracker: Send {
    fn process(
        &mut self,
        objects: &[TrackedObject],
        frame_index: u64,
    ) -> Result<Vec<TrackedObject>, Box<dyn std::error::Error>>;
}

/// Builds a fresh tracker, used whenever the frame geometry changes.
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn MultiObjectTracker> + Send>;
