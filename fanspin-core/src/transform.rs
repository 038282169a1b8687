//! 3D transformation matrices for scene graph nodes

use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector3};

/// Local transform carried by a `Transform` node: translation, then rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vector3::new(x, y, z),
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Matrix applied to the children: `T * R`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation) * self.rotation.to_homogeneous()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation of `angle` radians about `axis`; a zero axis gives the identity.
pub fn rotation_about(axis: Vector3<f32>, angle: f32) -> UnitQuaternion<f32> {
    match Unit::try_new(axis, 1e-9) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
        None => UnitQuaternion::identity(),
    }
}

/// Axis and angle (radians) of a rotation, `+Z` and `0` for the identity.
pub fn axis_angle(rotation: &UnitQuaternion<f32>) -> (Vector3<f32>, f32) {
    match rotation.axis_angle() {
        Some((axis, angle)) => (axis.into_inner(), angle),
        None => (Vector3::z(), 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity_transform() {
        assert_relative_eq!(Transform::identity().matrix(), Matrix4::identity());
    }

    #[test]
    fn test_translation_applies_after_rotation() {
        let transform = Transform {
            translation: Vector3::new(0.0, 0.005, 0.0),
            rotation: rotation_about(Vector3::x(), FRAC_PI_2),
        };
        let moved = transform.matrix().transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(moved, Point3::new(0.0, 0.005, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_axis_angle_of_identity_is_default() {
        let (axis, angle) = axis_angle(&UnitQuaternion::identity());
        assert_eq!(axis, Vector3::z());
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(rotation_about(Vector3::zeros(), 1.0), UnitQuaternion::identity());
    }
}
