//! Camera and projection utilities

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

use crate::geometry::Aabb;

/// Perspective camera for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view, radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn focal_distance(&self) -> f32 {
        (self.target - self.position).norm()
    }

    /// Rotation taking the default `-Z` viewing direction onto the camera's.
    pub fn orientation(&self) -> UnitQuaternion<f32> {
        let direction = self.target - self.position;
        UnitQuaternion::rotation_between(&-Vector3::z(), &direction)
            .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI))
    }

    /// Place the camera on `+Z` of the bounds so their bounding sphere fits
    /// the narrower field of view. Clip planes hug the sphere.
    pub fn view_all(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let radius = bounds.radius().max(1e-4);
        let half_vertical = self.fov / 2.0;
        let half_horizontal = (half_vertical.tan() * self.aspect).atan();
        let distance = radius / half_vertical.min(half_horizontal).sin();

        self.target = center;
        self.position = center + Vector3::new(0.0, 0.0, distance);
        self.near = (distance - radius).max(distance * 0.01);
        self.far = distance + radius;
    }

    /// Move back along the viewing axis to `z * (1 + fraction)`, recentred on
    /// the Z axis.
    pub fn pull_back(&mut self, fraction: f32) {
        let z = self.position.z;
        let offset = z * fraction;
        self.position = Point3::new(0.0, 0.0, z + offset);
        self.target = Point3::new(0.0, 0.0, self.target.z);
        self.far += offset.abs();
    }

    /// Project a 3D point to 2D screen space
    ///
    /// Returns `(x, y, depth)` with depth in normalized device coordinates,
    /// or `None` when the point lies outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        let clip = mvp * point.to_homogeneous();

        // Behind the eye or degenerate
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        // Clip test
        if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) || !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
