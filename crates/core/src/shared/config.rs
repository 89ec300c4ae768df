use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Input tensor preparation for one model: square resize, then
/// `(pixel - mean) * scale` per RGB channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobSettings {
    pub input_size: u32,
    pub scale: f32,
    pub mean: [f32; 3],
}

impl BlobSettings {
    pub fn detector() -> Self {
        Self {
            input_size: DETECTOR_INPUT_SIZE,
            scale: DETECTOR_SCALE,
            mean: DETECTOR_MEAN,
        }
    }

    pub fn embedder() -> Self {
        Self {
            input_size: EMBEDDER_INPUT_SIZE,
            scale: EMBEDDER_SCALE,
            mean: EMBEDDER_MEAN,
        }
    }
}

/// All tunables for one pipeline instance. Every field has a default, so a
/// JSON file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceWatchConfig {
    pub model_dir: PathBuf,
    pub face_db_dir: PathBuf,
    pub detector_model: String,
    pub embedder_model: String,
    pub embedding_dimension: usize,
    pub embedding_extensions: Vec<String>,
    pub confidence_threshold: f32,
    pub recognition_threshold: f32,
    pub min_face_size: i32,
    pub detector: BlobSettings,
    pub embedder: BlobSettings,
    pub detection_frame_period: u64,
    pub tracker_max_lost: usize,
}

impl Default for FaceWatchConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(MODELS_DIR_NAME),
            face_db_dir: PathBuf::from(FACE_DB_DIR_NAME),
            detector_model: DETECTOR_MODEL_NAME.to_string(),
            embedder_model: EMBEDDER_MODEL_NAME.to_string(),
            embedding_dimension: EMBEDDING_DIMENSION,
            embedding_extensions: EMBEDDING_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            confidence_threshold: DETECTION_CONFIDENCE_THRESHOLD,
            recognition_threshold: RECOGNITION_THRESHOLD,
            min_face_size: MIN_FACE_SIZE,
            detector: BlobSettings::detector(),
            embedder: BlobSettings::embedder(),
            detection_frame_period: DETECTION_FRAME_PERIOD,
            tracker_max_lost: TRACKER_MAX_LOST,
        }
    }
}

impl FaceWatchConfig {
    /// Defaults rooted at `home`: models in `home/models`, database in
    /// `home/face_db`.
    pub fn with_home_dir(home: &Path) -> Self {
        Self {
            model_dir: home.join(MODELS_DIR_NAME),
            face_db_dir: home.join(FACE_DB_DIR_NAME),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection_frame_period == 0 {
            return Err(ConfigError::Invalid(
                "detection_frame_period must be >= 1".into(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding_dimension must be >= 1".into(),
            ));
        }
        if self.detector.input_size == 0 || self.embedder.input_size == 0 {
            return Err(ConfigError::Invalid("model input size must be >= 1".into()));
        }
        Ok(())
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.detector_model)
    }

    pub fn embedder_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.embedder_model)
    }
}
