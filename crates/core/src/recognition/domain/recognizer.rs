use super::detection::{Watchlist, UNKNOWN_NAME};
use super::face_database::FaceDatabase;
use super::known_face::KnownFace;

/// Score reported for embeddings that cannot be compared.
pub const INVALID_SIMILARITY: f32 = -1.0;

/// Best database match for one embedding.
///
/// `score` is the best similarity seen even when it did not clear the
/// threshold; `name` and `watchlist` stay unknown in that case.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionMatch {
    pub name: String,
    pub watchlist: Watchlist,
    pub score: f32,
}

impl Default for RecognitionMatch {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            watchlist: Watchlist::Unknown,
            score: 0.0,
        }
    }
}

/// Linear-scan matcher over a [`FaceDatabase`].
#[derive(Clone, Copy, Debug)]
pub struct Recognizer {
    dimension: usize,
    threshold: f32,
}

impl Recognizer {
    pub fn new(dimension: usize, threshold: f32) -> Self {
        Self {
            dimension,
            threshold,
        }
    }

    pub fn match_embedding(&self, embedding: &[f32], database: &FaceDatabase) -> RecognitionMatch {
        match_embedding(embedding, database.faces(), self.dimension, self.threshold)
    }
}

/// Scans `faces` for the highest cosine similarity. Identity fields are
/// only taken from a face whose similarity strictly exceeds `threshold`.
pub fn match_embedding(
    embedding: &[f32],
    faces: &[KnownFace],
    dimension: usize,
    threshold: f32,
) -> RecognitionMatch {
    let mut best = RecognitionMatch::default();
    for face in faces {
        let similarity = cosine_similarity(embedding, &face.embedding, dimension);
        if similarity > best.score {
            best.score = similarity;
            if similarity > threshold {
                best.name = face.name.clone();
                best.watchlist = face.watchlist;
            }
        }
    }
    best
}

/// Dot product of L2-normalized vectors equals cosine similarity.
///
/// Returns [`INVALID_SIMILARITY`] unless both vectors have exactly
/// `dimension` elements.
pub fn cosine_similarity(a: &[f32], b: &[f32], dimension: usize) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != dimension || b.len() != dimension {
        return INVALID_SIMILARITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum::<f64>() as f32
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
