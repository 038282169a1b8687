//! fanspin core library - scene graph, mesh loading and spin animation
//!
//! Everything that does not touch the terminal lives here: STL and VRML
//! loading, the Inventor-style scene graph and its writer, the camera, and
//! the keyboard-driven spin ramp.

pub mod animation;
pub mod assembly;
pub mod config;
pub mod geometry;
pub mod loader;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod transform;
pub mod vrml;
pub mod writer;

// Re-export commonly used types
pub use animation::{SpinCommand, SpinController, SpinStatus, SpinStep};
pub use assembly::FanScene;
pub use config::{AnimationConfig, ConfigError, FanConfig, SceneConfig, ViewerConfig};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use loader::{load_mesh, load_mesh_or_empty, LoadError, MeshError, MeshFormat};
pub use projection::Camera;
pub use scene::{Node, NodeId, NodeKind, RenderItem, Scene, SceneError, SceneVisitor};
pub use transform::Transform;
pub use writer::{write_scene, write_scene_to_path, WriteError};

/// Short description of a nom failure: error kind and byte offset.
pub(crate) fn describe_nom_error(input: &str, err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("{:?} at byte {}", e.code, input.len() - e.input.len())
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    }
}
