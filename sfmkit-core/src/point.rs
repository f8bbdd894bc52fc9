//! Sparse 3D point records

use crate::error::{Error, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A reconstructed 3D point with color and observation track
///
/// `image_ids` and `point2d_idxs` are parallel sequences: each pair names an
/// image and the index of the observation within that image's `xys` that sees
/// this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub id: u64,
    pub xyz: Point3<f64>,
    pub rgb: [u8; 3],
    pub error: f64,
    pub image_ids: Vec<u64>,
    pub point2d_idxs: Vec<u32>,
}

impl Point3D {
    /// Create a point, validating the parallel track sequences
    pub fn new(
        id: u64,
        xyz: Point3<f64>,
        rgb: [u8; 3],
        error: f64,
        image_ids: Vec<u64>,
        point2d_idxs: Vec<u32>,
    ) -> Result<Self> {
        if image_ids.len() != point2d_idxs.len() {
            return Err(Error::TrackLength {
                id,
                image_ids: image_ids.len(),
                idxs: point2d_idxs.len(),
            });
        }
        Ok(Self {
            id,
            xyz,
            rgb,
            error,
            image_ids,
            point2d_idxs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_length_mismatch() {
        let result = Point3D::new(
            1,
            Point3::new(0.0, 0.0, 0.0),
            [0, 0, 0],
            0.0,
            vec![1, 2],
            vec![0],
        );
        assert!(matches!(result, Err(Error::TrackLength { .. })));
    }
}
