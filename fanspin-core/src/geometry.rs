//! Geometry primitives shared by the loaders, the scene graph and the rasterizer

use nalgebra::{Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }

    /// Vertex at `position` with a zero normal, for formats that carry none.
    pub fn at(position: Point3<f32>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding of the vertex positions.
    ///
    /// Degenerate triangles yield a zero vector instead of NaNs.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.positions();
        (b - a).cross(&(c - a)).try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }

    pub fn positions(&self) -> [Point3<f32>; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Local-space bounds, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.triangles.iter().flat_map(|t| t.positions()))
    }

    /// Axis-aligned cube centred on the origin, two triangles per face.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // (normal, the four corners of the face in counter-clockwise order)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
            ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
            ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
            ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
        ];

        let mut mesh = Self::with_capacity(12);
        for ([nx, ny, nz], quad) in faces {
            let v = |[x, y, z]: [f32; 3]| Vertex::new(x, y, z, nx, ny, nz);
            mesh.add_triangle(Triangle::new(v(quad[0]), v(quad[1]), v(quad[2])));
            mesh.add_triangle(Triangle::new(v(quad[0]), v(quad[2]), v(quad[3])));
        }
        mesh
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |mut aabb, p| {
            aabb.min = aabb.min.inf(&p);
            aabb.max = aabb.max.sup(&p);
            aabb
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Radius of the sphere through the corners.
    pub fn radius(&self) -> f32 {
        (self.max - self.min).norm() / 2.0
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Box around the eight transformed corners.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Aabb {
        let corners = self.corners().map(|c| matrix.transform_point(&c));
        // Eight corners, never empty.
        Aabb::from_points(corners).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_has_twelve_outward_triangles() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangle_count(), 12);

        for triangle in &cube.triangles {
            let stored = triangle.vertices[0].normal;
            assert_relative_eq!(triangle.calculate_normal(), stored, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cube_bounds() {
        let bounds = Mesh::cube(2.0).bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(bounds.radius(), 3.0f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn test_degenerate_triangle_normal_is_zero() {
        let p = Vertex::at(Point3::origin());
        assert_eq!(Triangle::new(p, p, p).calculate_normal(), Vector3::zeros());
    }

    #[test]
    fn test_aabb_transform_translates() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let moved = aabb.transform(&Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)));
        assert_eq!(moved.min, Point3::new(0.0, 2.0, 0.0));
        assert_eq!(moved.max, Point3::new(1.0, 3.0, 1.0));
    }
}
