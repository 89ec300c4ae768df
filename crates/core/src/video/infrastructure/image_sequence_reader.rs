use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Adapts a still image, or a directory of them, to the [`VideoReader`]
/// interface.
///
/// Files are read in name order and stamped at a nominal `fps`. Images may
/// differ in size; the pipeline treats that as a resolution change.
pub struct ImageSequenceReader {
    fps: f64,
    paths: Vec<PathBuf>,
    metadata: Option<VideoMetadata>,
}

impl ImageSequenceReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            paths: Vec::new(),
            metadata: None,
        }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new(1.0)
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_bgr_frame(
    path: &Path,
    timestamp_us: i64,
    index: u64,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.into_rgb8();
    let (width, height) = img.dimensions();
    let mut data = img.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(Frame::packed_bgr(data, width, height, timestamp_us, index)?)
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            list_images(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(format!("No such image or directory: {}", path.display()).into());
        };
        let first = paths
            .first()
            .ok_or_else(|| format!("No images found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        let metadata = VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: paths.len(),
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(metadata) = self.metadata.as_ref() else {
            return Box::new(std::iter::once(Err("ImageSequenceReader: not opened".into())));
        };
        Box::new(self.paths.iter().enumerate().map(move |(i, path)| {
            let index = i as u64;
            load_bgr_frame(path, metadata.nominal_timestamp_us(index), index)
        }))
    }

    fn close(&mut self) {
        self.paths.clear();
        self.metadata = None;
    }
}
