//! The shared scene graph: a flat, ordered collection of drawable nodes.
//!
//! Scene objects add nodes during attach and remove them again through their
//! disposer. Nodes own their GPU resources (buffers, pipelines, bind
//! groups), so removing a node and dropping it releases everything it
//! allocated exactly once. All mutation happens on the animation-loop
//! thread; the scene is shared through `Rc<RefCell<Scene>>` with no locking.

/// A drawable unit living in the scene.
///
/// `draw` is called once per rendered frame from inside the base scene pass,
/// after the shared camera bind group has been set on group 0. Nodes bind
/// their own state from group 1 upward and issue their draw calls.
pub trait SceneNode {
    fn draw(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>);
}

/// Identifies a node for later removal. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// The scene root. Draw order is insertion order.
pub struct Scene {
    nodes: Vec<(NodeId, Box<dyn SceneNode>)>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a node, returning the id needed to remove it later.
    pub fn add(&mut self, node: Box<dyn SceneNode>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        id
    }

    /// Remove a node. Unknown ids return `None` and change nothing, so
    /// teardown paths may remove unconditionally.
    pub fn remove(&mut self, id: NodeId) -> Option<Box<dyn SceneNode>> {
        let index = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &dyn SceneNode> {
        self.nodes.iter().map(|(_, node)| node.as_ref())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    impl SceneNode for Marker {
        fn draw(&self, _queue: &wgpu::Queue, _pass: &mut wgpu::RenderPass<'_>) {}
    }

    #[test]
    fn add_and_remove_restore_node_count() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());

        let a = scene.add(Box::new(Marker));
        let b = scene.add(Box::new(Marker));
        assert_eq!(scene.len(), 2);

        assert!(scene.remove(a).is_some());
        assert!(scene.remove(b).is_some());
        assert!(scene.is_empty());
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut scene = Scene::new();
        let id = scene.add(Box::new(Marker));
        assert!(scene.remove(id).is_some());
        assert!(scene.remove(id).is_none());
        assert_eq!(scene.len(), 0);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add(Box::new(Marker));
        scene.remove(a);
        let b = scene.add(Box::new(Marker));
        assert_ne!(a, b);
    }
}
