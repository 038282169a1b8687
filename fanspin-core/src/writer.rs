//! Open Inventor ASCII writer.
//!
//! Writes a [`Scene`] as an `#Inventor V2.1 ascii` file that Inventor and
//! Coin3D viewers can open. Named nodes are written with `DEF`, and only
//! fields that differ from their Inventor defaults are emitted.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use thiserror::Error;

use crate::geometry::Mesh;
use crate::projection::Camera;
use crate::scene::{Node, NodeId, NodeKind, Scene, SceneVisitor};
use crate::transform::{axis_angle, Transform};

pub const HEADER: &str = "#Inventor V2.1 ascii";

const INDENT: &str = "  ";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Write the whole graph to `out`.
pub fn write_scene<W: Write>(scene: &Scene, out: &mut W) -> Result<(), WriteError> {
    writeln!(out, "{HEADER}\n")?;
    let mut writer = InventorWriter {
        out,
        depth: 0,
        result: Ok(()),
    };
    scene.walk(&mut writer);
    writer.result?;
    Ok(())
}

/// Write the whole graph to a new file at `path`.
pub fn write_scene_to_path(scene: &Scene, path: &Path) -> Result<(), WriteError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_scene(scene, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Turn a display name into a valid Inventor identifier.
///
/// Characters Inventor reserves become `_`, and a leading digit gets a `_`
/// prefix.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && !"\"'+.\\{}[]#,".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) || sanitized.is_empty() {
        sanitized.insert(0, '_');
    }
    sanitized
}

struct InventorWriter<'w, W: Write> {
    out: &'w mut W,
    depth: usize,
    result: io::Result<()>,
}

impl<W: Write> InventorWriter<'_, W> {
    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}{text}", INDENT.repeat(self.depth))
    }

    fn open(&mut self, node: &Node) -> io::Result<()> {
        let type_name = node.kind.type_name();
        match &node.name {
            Some(name) => self.line(&format!("DEF {} {type_name} {{", sanitize_name(name)))?,
            None => self.line(&format!("{type_name} {{"))?,
        }
        self.depth += 1;

        match &node.kind {
            NodeKind::PerspectiveCamera(camera) => self.camera_fields(camera),
            NodeKind::Transform(transform) => self.transform_fields(transform),
            NodeKind::Rotation(rotation) => self.rotation_field("rotation", rotation),
            NodeKind::Mesh(mesh) => self.mesh_nodes(mesh),
            NodeKind::Separator | NodeKind::Group | NodeKind::EventCallback => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    fn vec3_field(&mut self, field: &str, v: &Vector3<f32>, default: Vector3<f32>) -> io::Result<()> {
        if *v == default {
            return Ok(());
        }
        self.line(&format!("{field} {} {} {}", v.x, v.y, v.z))
    }

    fn float_field(&mut self, field: &str, value: f32, default: f32) -> io::Result<()> {
        if (value - default).abs() <= f32::EPSILON {
            return Ok(());
        }
        self.line(&format!("{field} {value}"))
    }

    fn rotation_field(&mut self, field: &str, rotation: &UnitQuaternion<f32>) -> io::Result<()> {
        let (axis, angle) = axis_angle(rotation);
        if angle == 0.0 {
            return Ok(());
        }
        self.line(&format!("{field} {} {} {}  {angle}", axis.x, axis.y, axis.z))
    }

    fn camera_fields(&mut self, camera: &Camera) -> io::Result<()> {
        self.vec3_field("position", &camera.position.coords, Vector3::z())?;
        self.rotation_field("orientation", &camera.orientation())?;
        self.float_field("nearDistance", camera.near, 1.0)?;
        self.float_field("farDistance", camera.far, 10.0)?;
        self.float_field("focalDistance", camera.focal_distance(), 5.0)?;
        self.float_field("heightAngle", camera.fov, std::f32::consts::FRAC_PI_4)
    }

    fn transform_fields(&mut self, transform: &Transform) -> io::Result<()> {
        self.vec3_field("translation", &transform.translation, Vector3::zeros())?;
        self.rotation_field("rotation", &transform.rotation)
    }

    fn mesh_nodes(&mut self, mesh: &Mesh) -> io::Result<()> {
        if mesh.is_empty() {
            return Ok(());
        }

        self.line("Coordinate3 {")?;
        self.depth += 1;
        let points: Vec<String> = mesh
            .triangles
            .iter()
            .map(|t| {
                t.positions()
                    .iter()
                    .map(|p| format!("{} {} {}", p.x, p.y, p.z))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        self.list("point", &points)?;
        self.close()?;

        self.line("IndexedFaceSet {")?;
        self.depth += 1;
        let faces: Vec<String> = (0..mesh.triangle_count())
            .map(|i| format!("{}, {}, {}, -1", 3 * i, 3 * i + 1, 3 * i + 2))
            .collect();
        self.list("coordIndex", &faces)?;
        self.close()
    }

    /// `field [ a,\n  b,\n  c ]`, one entry per line.
    fn list(&mut self, field: &str, entries: &[String]) -> io::Result<()> {
        let last = entries.len().saturating_sub(1);
        for (i, entry) in entries.iter().enumerate() {
            let prefix = if i == 0 { format!("{field} [ ") } else { INDENT.repeat(2) };
            let suffix = if i == last { " ]" } else { "," };
            self.line(&format!("{prefix}{entry}{suffix}"))?;
        }
        Ok(())
    }
}

impl<W: Write> SceneVisitor for InventorWriter<'_, W> {
    fn enter_node(&mut self, _id: NodeId, node: &Node, _model: &Matrix4<f32>) -> bool {
        if self.result.is_ok() {
            self.result = self.open(node);
        }
        self.result.is_ok()
    }

    fn exit_node(&mut self, _id: NodeId, _node: &Node) {
        if self.result.is_ok() {
            self.result = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Triangle, Vertex};
    use crate::transform::rotation_about;
    use nalgebra::Point3;

    fn write_to_string(scene: &Scene) -> String {
        let mut out = Vec::new();
        write_scene(scene, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Root Node"), "Root_Node");
        assert_eq!(sanitize_name("noctua nf-a15.blade"), "noctua_nf-a15_blade");
        assert_eq!(sanitize_name("3d"), "_3d");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn test_writes_nested_nodes_with_defaults_omitted() {
        let mut scene = Scene::new("Root Node");
        let sep = scene.add_child(scene.root(), None, NodeKind::Separator).unwrap();
        scene
            .add_child(sep, Some("Blade Transformation"), NodeKind::Transform(Transform::from_translation(0.0, 0.5, 0.0)))
            .unwrap();
        scene.add_child(sep, Some("Spin"), NodeKind::Rotation(UnitQuaternion::identity())).unwrap();
        scene.add_child(sep, None, NodeKind::EventCallback).unwrap();
        scene.add_child(sep, None, NodeKind::Mesh(Mesh::new())).unwrap();

        let expected = "\
#Inventor V2.1 ascii

DEF Root_Node Separator {
  Separator {
    DEF Blade_Transformation Transform {
      translation 0 0.5 0
    }
    DEF Spin Rotation {
    }
    EventCallback {
    }
    Separator {
    }
  }
}
";
        assert_eq!(write_to_string(&scene), expected);
    }

    #[test]
    fn test_writes_rotation_as_axis_angle() {
        let mut scene = Scene::new("root");
        scene
            .add_child(scene.root(), None, NodeKind::Rotation(rotation_about(Vector3::x(), 0.5)))
            .unwrap();
        let text = write_to_string(&scene);
        let values: Vec<f32> = text
            .lines()
            .find_map(|l| l.strip_prefix("    rotation "))
            .unwrap()
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        let expected = [1.0, 0.0, 0.0, 0.5];
        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-5);
        }
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_writes_mesh_as_face_set() {
        let mut mesh = Mesh::new();
        let v = |x, y| Vertex::at(Point3::new(x, y, 0.0));
        mesh.add_triangle(Triangle::new(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)));
        mesh.add_triangle(Triangle::new(v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)));

        let mut scene = Scene::new("root");
        scene.add_child(scene.root(), Some("Blade"), NodeKind::Mesh(mesh)).unwrap();
        let text = write_to_string(&scene);

        assert!(text.contains("  DEF Blade Separator {\n    Coordinate3 {\n"));
        assert!(text.contains("      point [ 0 0 0, 1 0 0, 0 1 0,\n"));
        assert!(text.contains("          1 0 0, 1 1 0, 0 1 0 ]\n"));
        assert!(text.contains("      coordIndex [ 0, 1, 2, -1,\n          3, 4, 5, -1 ]\n"));
    }

    #[test]
    fn test_writes_camera_fields() {
        let mut camera = Camera::default();
        camera.position = Point3::new(0.0, 0.0, 12.0);
        camera.near = 2.0;
        camera.far = 20.0;
        let mut scene = Scene::new("root");
        scene.add_child(scene.root(), None, NodeKind::PerspectiveCamera(camera)).unwrap();
        let text = write_to_string(&scene);

        assert!(text.contains("position 0 0 12\n"));
        assert!(text.contains("focalDistance 12\n"));
        assert!(!text.contains("orientation"));
        assert!(!text.contains("heightAngle"));
    }
}
