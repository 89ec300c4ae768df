use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::rect::Rect;

use super::recognizer::RecognitionMatch;

pub const FACE_CLASS_LABEL: &str = "face";
pub const FACE_CLASS_LABEL_CAPITALIZED: &str = "Face";
pub const UNKNOWN_NAME: &str = "unknown";

/// The detector does not regress landmarks; detections carry this many
/// zeroed placeholder points.
pub const NUM_LANDMARKS: usize = 5;

/// Watchlist category of a known identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Watchlist {
    Whitelist,
    Blacklist,
    #[default]
    Unknown,
}

impl Watchlist {
    /// Categories backed by a database subdirectory.
    pub const LISTED: [Watchlist; 2] = [Watchlist::Whitelist, Watchlist::Blacklist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Watchlist::Whitelist => "whitelist",
            Watchlist::Blacklist => "blacklist",
            Watchlist::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Watchlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// One detected face in one frame.
///
/// Created by the detection engine with a nil `track_id`; the tracker
/// stage fills in the stable id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bounding_box: Rect,
    pub confidence: f32,
    pub landmarks: Vec<Landmark>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub track_id: Uuid,
    pub class_label: String,
    pub recognized_name: String,
    pub similarity_score: f32,
    pub watchlist: Watchlist,
}

impl Detection {
    pub fn new(
        bounding_box: Rect,
        confidence: f32,
        embedding: Vec<f32>,
        recognition: RecognitionMatch,
    ) -> Self {
        Self {
            bounding_box,
            confidence,
            landmarks: vec![Landmark::default(); NUM_LANDMARKS],
            embedding,
            track_id: Uuid::nil(),
            class_label: FACE_CLASS_LABEL.to_string(),
            recognized_name: recognition.name,
            similarity_score: recognition.score,
            watchlist: recognition.watchlist,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.recognized_name != UNKNOWN_NAME
    }
}
