//! Poses, hit-test matrices and device-orientation samples.
//!
//! Poses travel as plain arrays (`[x, y, z]` and `[x, y, z, w]`) so hosts can
//! pass WebXR or engine values straight through; math happens in nalgebra.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::OrientationConfig;

/// Position + orientation in AR world space (meters, y up).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    /// Unit quaternion `[x, y, z, w]`.
    pub orientation: [f32; 4],
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub const fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub const fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Decompose a column-major rigid 4x4 transform (the layout of `XRRigidTransform.matrix`).
    pub fn from_matrix(m: &[f32; 16]) -> Self {
        let mat = Matrix4::from_column_slice(m);
        let rot: Matrix3<f32> = mat.fixed_view::<3, 3>(0, 0).into_owned();
        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&rot));
        Self {
            position: [mat[(0, 3)], mat[(1, 3)], mat[(2, 3)]],
            orientation: [q.i, q.j, q.k, q.w],
        }
    }

    /// Column-major homogeneous matrix for this pose.
    pub fn to_matrix(&self) -> [f32; 16] {
        let iso = self.isometry();
        let mut out = [0.0; 16];
        out.copy_from_slice(iso.to_homogeneous().as_slice());
        out
    }

    /// Same pose moved along the ground plane.
    pub fn translated_on_ground(&self, dx: f32, dz: f32) -> Self {
        let mut moved = *self;
        moved.position[0] += dx;
        moved.position[2] += dz;
        moved
    }

    fn rotation(&self) -> UnitQuaternion<f32> {
        let [x, y, z, w] = self.orientation;
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z))
    }

    fn isometry(&self) -> Isometry3<f32> {
        let [x, y, z] = self.position;
        Isometry3::from_parts(Translation3::new(x, y, z), self.rotation())
    }
}

/// The authoritative hit among one frame's results: the first one, as ordered by the host.
/// No re-ranking by distance or confidence is applied.
pub fn first_hit(results: &[Pose]) -> Option<Pose> {
    results.first().copied()
}

/// A `deviceorientation` sample, degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation around the vertical axis (compass), 0..360.
    pub alpha: f32,
    /// Front-to-back tilt, -180..180.
    pub beta: f32,
    /// Left-to-right tilt, -90..90.
    pub gamma: f32,
}

impl Orientation {
    /// Camera rotation for this sample: euler (beta, alpha, -gamma) in YXZ order,
    /// then a -90 degree turn about X so the camera looks out of the screen's back.
    pub fn camera_rotation(&self) -> UnitQuaternion<f32> {
        let (a, b, g) = (
            self.alpha.to_radians(),
            self.beta.to_radians(),
            (-self.gamma).to_radians(),
        );
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), a);
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), b);
        let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), g);
        let screen = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f32::consts::FRAC_PI_2);
        yaw * pitch * roll * screen
    }

    /// Where the camera's forward ray meets the ground, as a reticle pose facing the viewer.
    /// `None` when the device points at or above the horizon or the hit is out of range.
    pub fn ground_pose(&self, cfg: &OrientationConfig) -> Option<Pose> {
        if !(self.alpha.is_finite() && self.beta.is_finite() && self.gamma.is_finite()) {
            return None;
        }
        let forward = self.camera_rotation() * Vector3::new(0.0, 0.0, -1.0);
        if forward.y > -1e-4 {
            return None;
        }
        let eye = Point3::new(0.0, cfg.eye_height, 0.0);
        let t = cfg.eye_height / -forward.y;
        let hit = eye + forward * t;
        if (hit.x * hit.x + hit.z * hit.z).sqrt() > cfg.max_distance {
            return None;
        }
        let yaw = (-hit.x).atan2(-hit.z);
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
        Some(Pose {
            position: [hit.x, 0.0, hit.z],
            orientation: [q.i, q.j, q.k, q.w],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_roundtrip_keeps_translation_and_rotation() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.75);
        let pose = Pose {
            position: [0.5, -1.2, -2.0],
            orientation: [q.i, q.j, q.k, q.w],
        };
        let back = Pose::from_matrix(&pose.to_matrix());
        for i in 0..3 {
            assert_relative_eq!(back.position[i], pose.position[i], epsilon = 1e-5);
        }
        let dot: f32 = (0..4).map(|i| back.orientation[i] * pose.orientation[i]).sum();
        assert_relative_eq!(dot.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn translation_lives_in_the_last_column() {
        let mut m = [0.0f32; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        m[12] = 3.0;
        m[13] = 0.0;
        m[14] = -4.0;
        let pose = Pose::from_matrix(&m);
        assert_eq!(pose.position, [3.0, 0.0, -4.0]);
    }

    #[test]
    fn first_hit_is_authoritative() {
        let near = Pose::at([0.0, 0.0, -0.5]);
        let far = Pose::at([0.0, 0.0, -3.0]);
        assert_eq!(first_hit(&[far, near]), Some(far));
        assert_eq!(first_hit(&[]), None);
    }

    #[test]
    fn tilted_device_hits_ground_ahead() {
        let cfg = OrientationConfig::default();
        let sample = Orientation {
            alpha: 0.0,
            beta: 45.0,
            gamma: 0.0,
        };
        let pose = sample.ground_pose(&cfg).expect("ground hit");
        assert_relative_eq!(pose.position[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(pose.position[2], -cfg.eye_height, epsilon = 1e-4);
    }

    #[test]
    fn upright_device_has_no_ground_hit() {
        let cfg = OrientationConfig::default();
        let upright = Orientation {
            alpha: 0.0,
            beta: 90.0,
            gamma: 0.0,
        };
        assert!(upright.ground_pose(&cfg).is_none());
    }
}
