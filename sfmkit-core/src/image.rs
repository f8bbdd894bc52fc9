//! Posed image records

use crate::error::{Error, Result};
use nalgebra::{Point2, Point3, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Sentinel marking a 2D observation with no associated 3D point
pub const NO_POINT3D: i64 = -1;

/// A rendered view with its world-to-camera pose
///
/// `qvec` is the world-to-camera rotation as a unit quaternion in scalar-first
/// order (w, x, y, z); `tvec` the world-to-camera translation, so that
/// `x_cam = R(qvec) * x_world + tvec`. `xys` and `point3d_ids` are parallel:
/// one 3D point id (or [`NO_POINT3D`]) per 2D observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosedImage {
    pub id: u64,
    pub qvec: [f64; 4],
    pub tvec: Vector3<f64>,
    pub camera_id: u64,
    pub name: String,
    pub xys: Vec<Point2<f64>>,
    pub point3d_ids: Vec<i64>,
}

impl PosedImage {
    /// Create a posed image, validating the parallel observation sequences
    pub fn new(
        id: u64,
        qvec: [f64; 4],
        tvec: Vector3<f64>,
        camera_id: u64,
        name: String,
        xys: Vec<Point2<f64>>,
        point3d_ids: Vec<i64>,
    ) -> Result<Self> {
        if xys.len() != point3d_ids.len() {
            return Err(Error::ObservationLength {
                id,
                xys: xys.len(),
                ids: point3d_ids.len(),
            });
        }
        Ok(Self {
            id,
            qvec,
            tvec,
            camera_id,
            name,
            xys,
            point3d_ids,
        })
    }

    /// World-to-camera rotation as a unit quaternion
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(
            self.qvec[0],
            self.qvec[1],
            self.qvec[2],
            self.qvec[3],
        ))
    }

    /// Camera position in world coordinates, `-R^T * tvec`
    pub fn camera_center(&self) -> Point3<f64> {
        Point3::from(-(self.rotation().inverse() * self.tvec))
    }
}
