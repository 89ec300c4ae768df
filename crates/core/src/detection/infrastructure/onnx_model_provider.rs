use crate::detection::domain::face_detector::FaceDetectorModel;
use crate::detection::domain::face_embedder::FaceEmbedderModel;
use crate::detection::domain::model_provider::ModelProvider;
use crate::shared::config::FaceWatchConfig;

use super::onnx_face_detector::OnnxFaceDetector;
use super::onnx_face_embedder::OnnxFaceEmbedder;

/// Loads both models from `config.model_dir`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OnnxModelProvider;

impl ModelProvider for OnnxModelProvider {
    fn load_detector(
        &self,
        config: &FaceWatchConfig,
    ) -> Result<Box<dyn FaceDetectorModel>, Box<dyn std::error::Error>> {
        let path = config.detector_model_path();
        if !path.is_file() {
            return Err(format!("face detector model not found: {}", path.display()).into());
        }
        Ok(Box::new(OnnxFaceDetector::new(&path, config.detector)?))
    }

    fn load_embedder(
        &self,
        config: &FaceWatchConfig,
    ) -> Result<Box<dyn FaceEmbedderModel>, Box<dyn std::error::Error>> {
        let path = config.embedder_model_path();
        if !path.is_file() {
            return Err(format!("face embedder model not found: {}", path.display()).into());
        }
        Ok(Box::new(OnnxFaceEmbedder::new(
            &path,
            config.embedder,
            config.embedding_dimension,
        )?))
    }
}
