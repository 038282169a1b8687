//! Arena-backed scene graph with Open Inventor traversal semantics.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Order of
//! children matters: transform nodes affect the siblings that follow them.
//! A [`NodeKind::Separator`] isolates that state from the rest of the graph,
//! a [`NodeKind::Group`] does not.

use nalgebra::{Matrix4, UnitQuaternion};
use thiserror::Error;

use crate::geometry::{Aabb, Mesh};
use crate::projection::Camera;
use crate::transform::Transform;

/// Unique identifier for a node in the scene graph.
pub type NodeId = usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("No node with id {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} cannot have children")]
    NotAGroup(NodeId),

    #[error("Node {id} is not a {expected} node")]
    WrongKind { id: NodeId, expected: &'static str },
}

/// What a node contributes to the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Grouping node that saves and restores traversal state.
    Separator,
    /// Grouping node that lets traversal state leak to later siblings.
    Group,
    PerspectiveCamera(Camera),
    Transform(Transform),
    Rotation(UnitQuaternion<f32>),
    /// Marks the subgraph that receives keyboard events.
    EventCallback,
    Mesh(Mesh),
}

impl NodeKind {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Separator | Self::Group)
    }

    /// Inventor class name, used by the writer.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Separator | Self::Mesh(_) => "Separator",
            Self::Group => "Group",
            Self::PerspectiveCamera(_) => "PerspectiveCamera",
            Self::Transform(_) => "Transform",
            Self::Rotation(_) => "Rotation",
            Self::EventCallback => "EventCallback",
        }
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Callbacks invoked while walking the graph depth-first.
pub trait SceneVisitor {
    /// Called before the node's own effect on the traversal state is applied.
    ///
    /// `model` is the accumulated transform in effect at the node. Returns
    /// false to skip the node's children.
    fn enter_node(&mut self, id: NodeId, node: &Node, model: &Matrix4<f32>) -> bool;

    /// Called after the node's children have been visited.
    fn exit_node(&mut self, _id: NodeId, _node: &Node) {}
}

/// A scene graph with a single root.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Scene {
    /// Creates a graph whose root is a named separator.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: Some(root_name.to_string()),
                kind: NodeKind::Separator,
                parent: None,
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Appends a new node as the last child of `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        kind: NodeKind,
    ) -> Result<NodeId, SceneError> {
        let parent_node = self.nodes.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        if !parent_node.kind.is_group() {
            return Err(SceneError::NotAGroup(parent));
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.map(str::to_string),
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// First node with the given name, in depth-first order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        struct Finder<'a> {
            name: &'a str,
            found: Option<NodeId>,
        }

        impl SceneVisitor for Finder<'_> {
            fn enter_node(&mut self, id: NodeId, node: &Node, _: &Matrix4<f32>) -> bool {
                if self.found.is_none() && node.name.as_deref() == Some(self.name) {
                    self.found = Some(id);
                }
                self.found.is_none()
            }
        }

        let mut finder = Finder { name, found: None };
        self.walk(&mut finder);
        finder.found
    }

    pub fn rotation(&self, id: NodeId) -> Result<UnitQuaternion<f32>, SceneError> {
        match &self.nodes.get(id).ok_or(SceneError::UnknownNode(id))?.kind {
            NodeKind::Rotation(rotation) => Ok(*rotation),
            _ => Err(SceneError::WrongKind { id, expected: "Rotation" }),
        }
    }

    pub fn set_rotation(&mut self, id: NodeId, value: UnitQuaternion<f32>) -> Result<(), SceneError> {
        match &mut self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?.kind {
            NodeKind::Rotation(rotation) => {
                *rotation = value;
                Ok(())
            }
            _ => Err(SceneError::WrongKind { id, expected: "Rotation" }),
        }
    }

    pub fn camera(&self, id: NodeId) -> Result<&Camera, SceneError> {
        match &self.nodes.get(id).ok_or(SceneError::UnknownNode(id))?.kind {
            NodeKind::PerspectiveCamera(camera) => Ok(camera),
            _ => Err(SceneError::WrongKind { id, expected: "PerspectiveCamera" }),
        }
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Result<&mut Camera, SceneError> {
        match &mut self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?.kind {
            NodeKind::PerspectiveCamera(camera) => Ok(camera),
            _ => Err(SceneError::WrongKind { id, expected: "PerspectiveCamera" }),
        }
    }

    /// True when some node in the graph handles keyboard events.
    pub fn has_event_callback(&self) -> bool {
        self.nodes.iter().any(|n| n.kind == NodeKind::EventCallback)
    }

    /// Walks the whole graph from the root.
    pub fn walk<V: SceneVisitor>(&self, visitor: &mut V) {
        let mut model = Matrix4::identity();
        self.walk_node(self.root, &mut model, visitor);
    }

    fn walk_node<V: SceneVisitor>(&self, id: NodeId, model: &mut Matrix4<f32>, visitor: &mut V) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };

        let visit_children = visitor.enter_node(id, node, model);

        match &node.kind {
            NodeKind::Transform(transform) => *model *= transform.matrix(),
            NodeKind::Rotation(rotation) => *model *= rotation.to_homogeneous(),
            NodeKind::Separator if visit_children => {
                let mut local = *model;
                for &child in &node.children {
                    self.walk_node(child, &mut local, visitor);
                }
            }
            NodeKind::Group if visit_children => {
                for &child in &node.children {
                    self.walk_node(child, model, visitor);
                }
            }
            _ => {}
        }

        visitor.exit_node(id, node);
    }

    /// Every mesh with the model matrix it is drawn with.
    pub fn render_items(&self) -> Vec<RenderItem<'_>> {
        struct Collector<'a> {
            scene: &'a Scene,
            items: Vec<RenderItem<'a>>,
        }

        impl SceneVisitor for Collector<'_> {
            fn enter_node(&mut self, id: NodeId, _: &Node, model: &Matrix4<f32>) -> bool {
                // Borrow through the scene so items outlive the visit.
                if let Some(NodeKind::Mesh(mesh)) = self.scene.node(id).map(|n| &n.kind) {
                    if !mesh.is_empty() {
                        self.items.push(RenderItem { mesh, model: *model });
                    }
                }
                true
            }
        }

        let mut collector = Collector { scene: self, items: Vec::new() };
        self.walk(&mut collector);
        collector.items
    }

    /// World-space bounds of all meshes, `None` when nothing has geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.render_items()
            .iter()
            .filter_map(|item| item.mesh.bounds().map(|b| b.transform(&item.model)))
            .reduce(|a, b| a.union(&b))
    }
}

/// A mesh to draw and its accumulated model matrix.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    pub mesh: &'a Mesh,
    pub model: Matrix4<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::rotation_about;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn origin_of(item: &RenderItem) -> Point3<f32> {
        item.model.transform_point(&Point3::origin())
    }

    #[test]
    fn test_add_child_requires_group_parent() {
        let mut scene = Scene::new("root");
        let rot = scene
            .add_child(scene.root(), Some("rot"), NodeKind::Rotation(UnitQuaternion::identity()))
            .unwrap();

        assert_eq!(
            scene.add_child(rot, None, NodeKind::Group),
            Err(SceneError::NotAGroup(rot))
        );
        assert_eq!(
            scene.add_child(99, None, NodeKind::Group),
            Err(SceneError::UnknownNode(99))
        );
        assert_eq!(scene.node(rot).unwrap().parent(), Some(scene.root()));
    }

    #[test]
    fn test_separator_isolates_and_group_leaks_transforms() {
        let mut scene = Scene::new("root");
        let root = scene.root();
        let group = scene.add_child(root, None, NodeKind::Group).unwrap();
        scene
            .add_child(group, None, NodeKind::Transform(Transform::from_translation(1.0, 0.0, 0.0)))
            .unwrap();
        let sep = scene.add_child(root, None, NodeKind::Separator).unwrap();
        scene
            .add_child(sep, None, NodeKind::Transform(Transform::from_translation(0.0, 2.0, 0.0)))
            .unwrap();
        scene.add_child(sep, Some("a"), NodeKind::Mesh(Mesh::cube(1.0))).unwrap();
        scene.add_child(root, Some("b"), NodeKind::Mesh(Mesh::cube(1.0))).unwrap();

        let items = scene.render_items();
        assert_eq!(items.len(), 2);
        // Group translation reaches both meshes, the separator's only the first.
        assert_relative_eq!(origin_of(&items[0]), Point3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(origin_of(&items[1]), Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_accessors() {
        let mut scene = Scene::new("root");
        let rot = scene
            .add_child(scene.root(), None, NodeKind::Rotation(UnitQuaternion::identity()))
            .unwrap();
        let turned = rotation_about(Vector3::y(), 0.5);

        scene.set_rotation(rot, turned).unwrap();
        assert_eq!(scene.rotation(rot).unwrap(), turned);
        assert!(matches!(
            scene.rotation(scene.root()),
            Err(SceneError::WrongKind { expected: "Rotation", .. })
        ));
    }

    #[test]
    fn test_find_by_name_and_event_callback() {
        let mut scene = Scene::new("root");
        assert!(!scene.has_event_callback());
        let sep = scene.add_child(scene.root(), Some("sep"), NodeKind::Separator).unwrap();
        let cb = scene.add_child(sep, Some("events"), NodeKind::EventCallback).unwrap();

        assert_eq!(scene.find_by_name("events"), Some(cb));
        assert_eq!(scene.find_by_name("root"), Some(scene.root()));
        assert_eq!(scene.find_by_name("missing"), None);
        assert!(scene.has_event_callback());
    }

    #[test]
    fn test_empty_meshes_have_no_bounds() {
        let mut scene = Scene::new("root");
        scene.add_child(scene.root(), None, NodeKind::Mesh(Mesh::new())).unwrap();
        assert!(scene.render_items().is_empty());
        assert!(scene.bounds().is_none());
    }
}
