//! Point sampling from host geometry attribute streams

use crate::point::Point3D;
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

/// Default color assigned to samples without a color attribute
pub const DEFAULT_RGB: [u8; 3] = [128, 128, 128];

/// One record of a host-supplied dense point attribute stream
///
/// Color is a normalized RGBA float; the alpha channel is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub position: Point3<f64>,
    pub color: Option<[f32; 4]>,
}

impl PointSample {
    /// Sample with position only; quantizes to [`DEFAULT_RGB`]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            color: None,
        }
    }

    /// Sample with a normalized RGBA color
    pub fn with_color(position: Point3<f64>, color: [f32; 4]) -> Self {
        Self {
            position,
            color: Some(color),
        }
    }
}

/// Quantize a normalized [0, 1] color channel to an 8-bit value
///
/// `floor(channel * 255)`, clamped to [0, 255].
fn quantize_channel(channel: f32) -> u8 {
    (f64::from(channel) * 255.0).floor().clamp(0.0, 255.0) as u8
}

/// Map a sample stream to [`Point3D`] records
///
/// Order-preserving, one record per sample, with sequential 1-based ids,
/// zero reprojection error and empty tracks. `world_from_object`, when
/// given, is applied to every position; `None` means positions are already
/// world-space.
pub fn points_from_samples<I>(
    samples: I,
    world_from_object: Option<&Matrix4<f64>>,
) -> Vec<Point3D>
where
    I: IntoIterator<Item = PointSample>,
{
    samples
        .into_iter()
        .enumerate()
        .map(|(i, sample)| {
            let xyz = match world_from_object {
                Some(matrix) => matrix.transform_point(&sample.position),
                None => sample.position,
            };
            let rgb = match sample.color {
                Some(color) => [
                    quantize_channel(color[0]),
                    quantize_channel(color[1]),
                    quantize_channel(color[2]),
                ],
                None => DEFAULT_RGB,
            };
            Point3D {
                id: i as u64 + 1,
                xyz,
                rgb,
                error: 0.0,
                image_ids: Vec::new(),
                point2d_idxs: Vec::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_color_default_and_quantization() {
        let samples = vec![
            PointSample::new(Point3::new(0.0, 0.0, 0.0)),
            PointSample::with_color(Point3::new(1.0, 0.0, 0.0), [1.0, 0.0, 0.0, 1.0]),
            PointSample::with_color(Point3::new(2.0, 0.0, 0.0), [0.5, 0.25, 0.999, 1.0]),
        ];
        let points = points_from_samples(samples, None);

        assert_eq!(points[0].rgb, DEFAULT_RGB);
        assert_eq!(points[1].rgb, [255, 0, 0]);
        assert_eq!(points[2].rgb, [127, 63, 254]);
    }

    #[test]
    fn test_quantization_clamps_out_of_range() {
        let points = points_from_samples(
            vec![PointSample::with_color(
                Point3::origin(),
                [-0.5, 1.5, 0.0, 1.0],
            )],
            None,
        );
        assert_eq!(points[0].rgb, [0, 255, 0]);
    }

    #[test]
    fn test_sequential_ids_and_empty_tracks() {
        let samples = (0..5).map(|i| PointSample::new(Point3::new(i as f64, 0.0, 0.0)));
        let points = points_from_samples(samples, None);

        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.id, i as u64 + 1);
            assert_eq!(point.error, 0.0);
            assert!(point.image_ids.is_empty());
            assert!(point.point2d_idxs.is_empty());
        }
    }

    #[test]
    fn test_world_transform_applied() {
        let world = Matrix4::new_translation(&Vector3::new(10.0, 0.0, -5.0));
        let points = points_from_samples(
            vec![PointSample::new(Point3::new(1.0, 2.0, 3.0))],
            Some(&world),
        );
        assert_relative_eq!(points[0].xyz, Point3::new(11.0, 2.0, -2.0));
    }
}
