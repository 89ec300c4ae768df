use serde::Serialize;

use crate::recognition::domain::detection::{Detection, Watchlist, FACE_CLASS_LABEL_CAPITALIZED};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DetectionStarted,
    DetectionFinished,
    ObjectDetected,
    WatchlistMatchWhitelist,
    WatchlistMatchBlacklist,
}

impl EventKind {
    /// Event type identifier understood by the downstream sink.
    pub fn type_id(&self) -> &'static str {
        match self {
            EventKind::DetectionStarted | EventKind::DetectionFinished => {
                "facewatch.face.detection"
            }
            EventKind::ObjectDetected => "facewatch.face.detected",
            EventKind::WatchlistMatchWhitelist => "facewatch.face.whitelist",
            EventKind::WatchlistMatchBlacklist => "facewatch.face.blacklist",
        }
    }
}

/// A lifecycle or alert event produced while processing one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub type_id: &'static str,
    pub timestamp_us: i64,
    pub caption: String,
    pub description: String,
    pub is_active: bool,
}

impl Event {
    fn new(kind: EventKind, timestamp_us: i64, caption: String, description: String) -> Self {
        Self {
            kind,
            type_id: kind.type_id(),
            timestamp_us,
            caption,
            description,
            is_active: kind != EventKind::DetectionFinished,
        }
    }

    pub fn detection_started(timestamp_us: i64) -> Self {
        let caption = format!("{FACE_CLASS_LABEL_CAPITALIZED} detection STARTED");
        Self::new(
            EventKind::DetectionStarted,
            timestamp_us,
            caption.clone(),
            caption,
        )
    }

    pub fn detection_finished(timestamp_us: i64) -> Self {
        let caption = format!("{FACE_CLASS_LABEL_CAPITALIZED} detection FINISHED");
        Self::new(
            EventKind::DetectionFinished,
            timestamp_us,
            caption.clone(),
            caption,
        )
    }

    pub fn object_detected(timestamp_us: i64, class_label: &str) -> Self {
        let label = capitalize(class_label);
        Self::new(
            EventKind::ObjectDetected,
            timestamp_us,
            format!("{label} detected"),
            format!("{label} detected in frame"),
        )
    }

    /// Alert for a recognized identity on a watchlist; `None` for unknown
    /// faces.
    pub fn watchlist_match(timestamp_us: i64, detection: &Detection) -> Option<Self> {
        if !detection.is_recognized() {
            return None;
        }
        let (kind, prefix) = match detection.watchlist {
            Watchlist::Blacklist => (EventKind::WatchlistMatchBlacklist, "Blacklisted"),
            Watchlist::Whitelist => (EventKind::WatchlistMatchWhitelist, "Whitelisted"),
            Watchlist::Unknown => return None,
        };
        Some(Self::new(
            kind,
            timestamp_us,
            format!("{prefix} person: {}", detection.recognized_name),
            format!("Similarity: {:.1}%", detection.similarity_score * 100.0),
        ))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
