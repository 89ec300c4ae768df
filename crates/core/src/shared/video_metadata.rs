use std::path::PathBuf;

/// Properties of a frame source, known after opening it.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Zero when the container does not report a frame count.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Microsecond timestamp of frame `index` at the nominal rate; zero
    /// when the rate is unknown.
    pub fn nominal_timestamp_us(&self, index: u64) -> i64 {
        if self.fps > 0.0 {
            (index as f64 * 1_000_000.0 / self.fps).round() as i64
        } else {
            0
        }
    }
}
