//! The fan demo's scene graph.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::SceneConfig;
use crate::geometry::Mesh;
use crate::projection::Camera;
use crate::scene::{NodeId, NodeKind, Scene, SceneError};
use crate::transform::{rotation_about, Transform};

pub const ROOT: &str = "Root Node";
pub const VIEW_GROUP: &str = "Viewing Group Node";
pub const GLOBAL_TRANSFORM: &str = "Global Transformation";
pub const FRAME_SEPARATOR: &str = "Frame Separator Node";
pub const FRAME_GEOMETRY: &str = "Frame Geometry Node";
pub const BLADE_SEPARATOR: &str = "Blade Separator Node";
pub const BLADE_TRANSFORM: &str = "Blade Transformation";
pub const EVENT_CALLBACK: &str = "My Event Callback";
pub const ACTIVE_ROTATION: &str = "Active Rotation Matrix";
pub const BLADE_GEOMETRY: &str = "Blade Geometry Node";

/// The assembled fan and handles to the nodes the viewer drives.
#[derive(Debug, Clone)]
pub struct FanScene {
    pub scene: Scene,
    /// Rotation node animated by the spin controller.
    pub rotation: NodeId,
    pub camera: NodeId,
}

impl FanScene {
    /// Builds:
    ///
    /// ```text
    /// Root Node (Separator)
    /// ├── Viewing Group Node (Group): camera, Global Transformation
    /// ├── Frame Separator Node: frame geometry
    /// └── Blade Separator Node: Blade Transformation, event callback,
    ///     Active Rotation Matrix, blade geometry
    /// ```
    ///
    /// The global transformation sits in a plain group so it tilts both parts.
    pub fn build(blade: Mesh, frame: Mesh, config: &SceneConfig) -> Result<Self, SceneError> {
        let mut scene = Scene::new(ROOT);
        let root = scene.root();

        let view = scene.add_child(root, Some(VIEW_GROUP), NodeKind::Group)?;
        let frame_sep = scene.add_child(root, Some(FRAME_SEPARATOR), NodeKind::Separator)?;
        let blade_sep = scene.add_child(root, Some(BLADE_SEPARATOR), NodeKind::Separator)?;

        let camera = scene.add_child(view, None, NodeKind::PerspectiveCamera(Camera::default()))?;
        let tilt = rotation_about(Vector3::x(), config.tilt_degrees.to_radians());
        scene.add_child(view, Some(GLOBAL_TRANSFORM), NodeKind::Transform(Transform::from_rotation(tilt)))?;

        scene.add_child(frame_sep, Some(FRAME_GEOMETRY), NodeKind::Mesh(frame))?;

        let [x, y, z] = config.blade_offset;
        scene.add_child(
            blade_sep,
            Some(BLADE_TRANSFORM),
            NodeKind::Transform(Transform::from_translation(x, y, z)),
        )?;
        scene.add_child(blade_sep, Some(EVENT_CALLBACK), NodeKind::EventCallback)?;
        let rotation = scene.add_child(
            blade_sep,
            Some(ACTIVE_ROTATION),
            NodeKind::Rotation(UnitQuaternion::identity()),
        )?;
        scene.add_child(blade_sep, Some(BLADE_GEOMETRY), NodeKind::Mesh(blade))?;

        log::info!("The scene graph is generated ({} nodes)", scene.len());
        Ok(Self {
            scene,
            rotation,
            camera,
        })
    }

    /// Point the camera at the whole model for a viewport of `aspect`, then
    /// back off by `zoom_back` of the distance.
    ///
    /// An empty scene leaves the camera where it is.
    pub fn frame_camera(&mut self, aspect: f32, zoom_back: f32) -> Result<(), SceneError> {
        let bounds = self.scene.bounds();
        let camera = self.scene.camera_mut(self.camera)?;
        camera.aspect = aspect;
        match bounds {
            Some(bounds) => {
                camera.view_all(&bounds);
                camera.pull_back(zoom_back);
            }
            None => log::warn!("Scene has no geometry; keeping the default camera"),
        }
        Ok(())
    }
}
