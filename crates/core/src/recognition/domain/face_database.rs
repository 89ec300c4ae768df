use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::detection::Watchlist;
use super::known_face::KnownFace;
use super::recognizer::l2_normalize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaceDatabaseError {
    #[error("face database directory not found: {0}")]
    NotFound(PathBuf),
    #[error("no valid face embeddings found in database directory: {0}")]
    Empty(PathBuf),
}

/// In-memory set of known identities, read once from disk.
///
/// Layout on disk:
///
/// ```text
/// <root>/whitelist/<name>.<ext>
/// <root>/blacklist/<name>.<ext>
/// ```
///
/// Each file is a headerless little-endian `f32` vector of exactly
/// `dimension` elements. Read-only after loading, so one instance may be
/// shared between sessions.
#[derive(Clone, Debug, Default)]
pub struct FaceDatabase {
    faces: Vec<KnownFace>,
}

impl FaceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_faces(faces: Vec<KnownFace>) -> Self {
        Self { faces }
    }

    /// Loads every valid embedding file under `root`. A no-op once any
    /// entries are present.
    ///
    /// Missing watchlist subdirectories, unreadable files, files with other
    /// extensions and files of the wrong size are skipped.
    pub fn load(
        &mut self,
        root: &Path,
        dimension: usize,
        extensions: &[String],
    ) -> Result<usize, FaceDatabaseError> {
        if !self.faces.is_empty() {
            return Ok(self.faces.len());
        }
        if !root.is_dir() {
            return Err(FaceDatabaseError::NotFound(root.to_path_buf()));
        }

        for watchlist in Watchlist::LISTED {
            let dir = root.join(watchlist.as_str());
            for path in embedding_files(&dir, extensions) {
                let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                if self
                    .faces
                    .iter()
                    .any(|f| f.watchlist == watchlist && f.name == name)
                {
                    log::warn!(
                        "Skipping {}: {} already has an entry named {name}",
                        path.display(),
                        watchlist.as_str()
                    );
                    continue;
                }
                match read_embedding(&path, dimension) {
                    Some(embedding) => self.faces.push(KnownFace {
                        name,
                        watchlist,
                        embedding,
                    }),
                    None => log::debug!("Skipping invalid embedding file {}", path.display()),
                }
            }
        }

        if self.faces.is_empty() {
            return Err(FaceDatabaseError::Empty(root.to_path_buf()));
        }
        log::info!(
            "Loaded {} known faces from {}",
            self.faces.len(),
            root.display()
        );
        Ok(self.faces.len())
    }

    pub fn faces(&self) -> &[KnownFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Regular files in `dir` with a matching extension, sorted by path.
fn embedding_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        })
        .collect();
    files.sort();
    files
}

fn read_embedding(path: &Path, dimension: usize) -> Option<Vec<f32>> {
    let expected = dimension * std::mem::size_of::<f32>();
    let len = fs::metadata(path).ok()?.len();
    if len != expected as u64 {
        return None;
    }
    let bytes = fs::read(path).ok()?;
    if bytes.len() != expected {
        return None;
    }
    let mut embedding: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    l2_normalize(&mut embedding);
    Some(embedding)
}
