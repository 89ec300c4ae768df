pub const DETECTOR_MODEL_NAME: &str = "retina.onnx";
pub const EMBEDDER_MODEL_NAME: &str = "arc.onnx";

/// Subdirectories of a plugin-style home directory.
pub const MODELS_DIR_NAME: &str = "models";
pub const FACE_DB_DIR_NAME: &str = "face_db";

/// Embedding length produced by the ArcFace-style embedder.
pub const EMBEDDING_DIMENSION: usize = 512;
pub const EMBEDDING_EXTENSIONS: &[&str] = &["bin", "npy"];

/// Detector rows at or below this confidence are dropped.
pub const DETECTION_CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Cosine similarity must strictly exceed this to assign an identity.
pub const RECOGNITION_THRESHOLD: f32 = 0.7;
/// Crops narrower or shorter than this (pixels) are not embedded.
pub const MIN_FACE_SIZE: i32 = 10;

pub const DETECTOR_INPUT_SIZE: u32 = 640;
pub const DETECTOR_SCALE: f32 = 1.0;
pub const DETECTOR_MEAN: [f32; 3] = [104.0, 177.0, 123.0];

pub const EMBEDDER_INPUT_SIZE: u32 = 112;
pub const EMBEDDER_SCALE: f32 = 1.0 / 255.0;
pub const EMBEDDER_MEAN: [f32; 3] = [0.0, 0.0, 0.0];

/// Run detection and tracking on every Nth frame.
pub const DETECTION_FRAME_PERIOD: u64 = 2;

/// Sampled frames a track can go unmatched before it is dropped.
pub const TRACKER_MAX_LOST: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
