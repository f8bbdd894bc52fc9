//! Host-to-target camera pose conversion
//!
//! Converts a scene camera pose from the host convention (right-handed,
//! Z-up, camera looking down local -Z) into the reconstruction convention
//! (world-to-camera, camera looking down +Z, Y-down image space).

use nalgebra::{Point3, Quaternion, Rotation3, UnitQuaternion, Vector3};

/// Rotation of a host scene camera, in the host's native axis convention
///
/// Non-quaternion variants are converted to an equivalent unit quaternion
/// before the axis remap; the conversion is deterministic and preserves the
/// rotation exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostRotation {
    Quaternion(UnitQuaternion<f64>),
    /// Euler angles in radians, applied in X, Y, Z order
    EulerXyz { x: f64, y: f64, z: f64 },
    Matrix(Rotation3<f64>),
}

impl HostRotation {
    /// Equivalent unit quaternion of the host rotation
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        match self {
            HostRotation::Quaternion(q) => *q,
            HostRotation::EulerXyz { x, y, z } => UnitQuaternion::from_euler_angles(*x, *y, *z),
            HostRotation::Matrix(m) => UnitQuaternion::from_rotation_matrix(m),
        }
    }
}

/// Convert a host camera pose into a world-to-camera (qvec, tvec) pair
///
/// With host quaternion components (w, x, y, z), the corrected quaternion is
/// (w', x', y', z') = (x, w, z, -y): a half-turn about the camera X axis
/// folded together with the inverted host rotation. The coefficients are a
/// fixed, tested contract for the host axis layout; a different host
/// convention needs a different remap.
///
/// The returned pair satisfies `x_cam = R(qvec) * x_world + tvec`; the
/// camera's world position is recovered as `-R(qvec)^T * tvec`.
pub fn world_to_camera(rotation: &HostRotation, position: &Point3<f64>) -> ([f64; 4], Vector3<f64>) {
    let q = rotation.quaternion();
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    let corrected = UnitQuaternion::from_quaternion(Quaternion::new(x, w, z, -y));
    let tvec = -(corrected * position.coords);
    (
        [corrected.w, corrected.i, corrected.j, corrected.k],
        tvec,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn quaternion_of(qvec: [f64; 4]) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(qvec[0], qvec[1], qvec[2], qvec[3]))
    }

    #[test]
    fn test_identity_pose_maps_to_axis_correction() {
        let rotation = HostRotation::Quaternion(UnitQuaternion::identity());
        let (qvec, tvec) = world_to_camera(&rotation, &Point3::origin());
        assert_relative_eq!(qvec[0], 0.0);
        assert_relative_eq!(qvec[1], 1.0);
        assert_relative_eq!(qvec[2], 0.0);
        assert_relative_eq!(qvec[3], 0.0);
        assert_relative_eq!(tvec, Vector3::zeros());
    }

    #[test]
    fn test_identity_rotation_translation() {
        let rotation = HostRotation::Quaternion(UnitQuaternion::identity());
        let position = Point3::new(1.0, 2.0, 3.0);
        let (qvec, tvec) = world_to_camera(&rotation, &position);
        // t = -(R * p) with R the half-turn about X
        assert_relative_eq!(tvec, Vector3::new(-1.0, 2.0, 3.0));
        let recovered = -(quaternion_of(qvec).inverse() * tvec);
        assert_relative_eq!(recovered, position.coords);
    }

    #[test]
    fn test_inverse_consistency_random_poses() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let rotation = HostRotation::EulerXyz {
                x: rng.gen_range(-3.0..3.0),
                y: rng.gen_range(-3.0..3.0),
                z: rng.gen_range(-3.0..3.0),
            };
            let position = Point3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let (qvec, tvec) = world_to_camera(&rotation, &position);
            let q = quaternion_of(qvec);
            assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);
            let recovered = -(q.inverse() * tvec);
            assert_relative_eq!(recovered, position.coords, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rotation_representations_agree() {
        let (x, y, z) = (0.3, -0.8, 1.4);
        let euler = HostRotation::EulerXyz { x, y, z };
        let quat = HostRotation::Quaternion(UnitQuaternion::from_euler_angles(x, y, z));
        let matrix = HostRotation::Matrix(Rotation3::from_euler_angles(x, y, z));

        let position = Point3::new(2.0, -1.0, 0.5);
        let (q_e, t_e) = world_to_camera(&euler, &position);
        let (q_q, t_q) = world_to_camera(&quat, &position);
        let (q_m, t_m) = world_to_camera(&matrix, &position);

        for i in 0..4 {
            assert_relative_eq!(q_e[i], q_q[i], epsilon = 1e-12);
        }
        // Matrix extraction may yield the sign-flipped equivalent quaternion;
        // compare rotations, not components.
        let angle = quaternion_of(q_e).angle_to(&quaternion_of(q_m));
        assert_relative_eq!(angle, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t_e, t_q, epsilon = 1e-12);
        assert_relative_eq!(t_e, t_m, epsilon = 1e-12);
    }
}
