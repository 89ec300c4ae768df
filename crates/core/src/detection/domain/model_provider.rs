use crate::shared::config::FaceWatchConfig;

use super::face_detector::FaceDetectorModel;
use super::face_embedder::FaceEmbedderModel;

/// Constructs the inference models for a detection engine.
///
/// Each call yields a fresh, exclusively owned model instance.
pub trait ModelProvider: Send {
    fn load_detector(
        &self,
        config: &FaceWatchConfig,
    ) -> Result<Box<dyn FaceDetectorModel>, Box<dyn std::error::Error>>;

    fn load_embedder(
        &self,
        config: &FaceWatchConfig,
    ) -> Result<Box<dyn FaceEmbedderModel>, Box<dyn std::error::Error>>;
}
