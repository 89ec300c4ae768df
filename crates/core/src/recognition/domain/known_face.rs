use super::detection::Watchlist;

/// A reference identity loaded from the face database.
#[derive(Clone, Debug, PartialEq)]
pub struct KnownFace {
    pub name: String,
    pub watchlist: Watchlist,
    pub embedding: Vec<f32>,
}
