//! Camera intrinsic models and parameter derivation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Intrinsic camera model tag
///
/// The tag fixes the arity and meaning of the parameter vector:
/// `Pinhole` = (fx, fy, cx, cy), `OpenCv` = (fx, fy, cx, cy, k1, k2, p1, p2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraModel {
    Pinhole,
    OpenCv,
}

impl CameraModel {
    /// Number of intrinsic parameters the model carries
    pub fn param_count(&self) -> usize {
        match self {
            CameraModel::Pinhole => 4,
            CameraModel::OpenCv => 8,
        }
    }

    /// Model tag as written in the text encoding
    pub fn name(&self) -> &'static str {
        match self {
            CameraModel::Pinhole => "PINHOLE",
            CameraModel::OpenCv => "OPENCV",
        }
    }

    /// Parse a text encoding model tag
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PINHOLE" => Some(CameraModel::Pinhole),
            "OPENCV" => Some(CameraModel::OpenCv),
            _ => None,
        }
    }

    /// Integer code used by the binary encoding
    pub fn code(&self) -> i32 {
        match self {
            CameraModel::Pinhole => 0,
            CameraModel::OpenCv => 1,
        }
    }

    /// Parse a binary encoding model code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CameraModel::Pinhole),
            1 => Some(CameraModel::OpenCv),
            _ => None,
        }
    }
}

/// Physical lens parameters of a host camera
///
/// Used to derive pixel-space intrinsics for a given render resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub focal_length_mm: f64,
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
}

impl Lens {
    /// Derive OpenCV-model parameters for a render of `width` x `height` pixels
    ///
    /// The principal point is assumed centered and distortion is zeroed.
    pub fn opencv_params(&self, width: u64, height: u64) -> [f64; 8] {
        let fx = self.focal_length_mm * width as f64 / self.sensor_width_mm;
        let fy = self.focal_length_mm * height as f64 / self.sensor_height_mm;
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        [fx, fy, cx, cy, 0.0, 0.0, 0.0, 0.0]
    }
}

/// A camera with intrinsic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: u64,
    pub model: CameraModel,
    pub width: u64,
    pub height: u64,
    pub params: Vec<f64>,
}

impl Camera {
    /// Create a camera, validating the parameter arity against the model
    pub fn new(
        id: u64,
        model: CameraModel,
        width: u64,
        height: u64,
        params: Vec<f64>,
    ) -> Result<Self> {
        if params.len() != model.param_count() {
            return Err(Error::ParamCount {
                id,
                model: model.name(),
                expected: model.param_count(),
                got: params.len(),
            });
        }
        Ok(Self {
            id,
            model,
            width,
            height,
            params,
        })
    }

    /// Create an OpenCV-model camera from physical lens parameters
    pub fn opencv(id: u64, width: u64, height: u64, lens: &Lens) -> Self {
        Self {
            id,
            model: CameraModel::OpenCv,
            width,
            height,
            params: lens.opencv_params(width, height).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_param_arity() {
        let ok = Camera::new(
            1,
            CameraModel::Pinhole,
            1920,
            1080,
            vec![1000.0, 1000.0, 960.0, 540.0],
        );
        assert!(ok.is_ok());

        let bad = Camera::new(
            1,
            CameraModel::Pinhole,
            1920,
            1080,
            vec![1000.0, 1000.0, 960.0, 540.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert!(matches!(
            bad,
            Err(Error::ParamCount {
                expected: 4,
                got: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_model_codes_and_names() {
        for model in [CameraModel::Pinhole, CameraModel::OpenCv] {
            assert_eq!(CameraModel::from_name(model.name()), Some(model));
            assert_eq!(CameraModel::from_code(model.code()), Some(model));
        }
        assert_eq!(CameraModel::from_name("FISHEYE"), None);
        assert_eq!(CameraModel::from_code(7), None);
    }

    #[test]
    fn test_lens_intrinsics() {
        let lens = Lens {
            focal_length_mm: 50.0,
            sensor_width_mm: 36.0,
            sensor_height_mm: 24.0,
        };
        let params = lens.opencv_params(1920, 1080);
        assert_relative_eq!(params[0], 50.0 * 1920.0 / 36.0);
        assert_relative_eq!(params[1], 50.0 * 1080.0 / 24.0);
        assert_relative_eq!(params[2], 960.0);
        assert_relative_eq!(params[3], 540.0);
        assert_eq!(&params[4..], &[0.0, 0.0, 0.0, 0.0]);

        let camera = Camera::opencv(2, 1920, 1080, &lens);
        assert_eq!(camera.model, CameraModel::OpenCv);
        assert_eq!(camera.params.len(), 8);
    }
}
