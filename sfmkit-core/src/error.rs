//! Error types for sfmkit model construction

use thiserror::Error;

/// Invariant violations raised while constructing model records
#[derive(Error, Debug)]
pub enum Error {
    #[error("camera {id}: model {model} expects {expected} parameters, got {got}")]
    ParamCount {
        id: u64,
        model: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("image {id}: {xys} observations but {ids} point ids")]
    ObservationLength { id: u64, xys: usize, ids: usize },

    #[error("point {id}: {image_ids} track image ids but {idxs} 2D indices")]
    TrackLength {
        id: u64,
        image_ids: usize,
        idxs: usize,
    },
}

/// Result type alias for model construction
pub type Result<T> = std::result::Result<T, Error>;
