//! The render context handed to scene objects at attach time, and the
//! disposer handle they return.
//!
//! Objects see the scene, the camera, the frame registry, and cloned GPU
//! handles — never the surface or the chain, so a scene object cannot
//! present frames or reorder passes. Everything lives on the event-loop
//! thread and is shared through `Rc`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::camera::Camera;
use crate::registry::FrameRegistry;
use crate::scene::Scene;

/// Everything a scene object may touch while attaching.
///
/// `device` and `queue` are wgpu's internally ref-counted handles, cloned
/// from the mounted GPU context; objects use them to build buffers,
/// textures, and pipelines that they own outright.
pub struct RenderContext {
    pub scene: Rc<RefCell<Scene>>,
    pub camera: Rc<RefCell<Camera>>,
    pub registry: Rc<FrameRegistry>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Layout for bind group 0, the shared camera uniforms.
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    /// Color format of the chain's intermediate buffers.
    pub color_format: wgpu::TextureFormat,
    /// Depth format of the base scene pass.
    pub depth_format: wgpu::TextureFormat,
}

/// Something that can be attached to a mounted rendering host.
///
/// `attach` inserts the object's nodes into the scene and registers its
/// per-frame callbacks, returning a [`Disposer`] that undoes exactly those
/// insertions. Objects are attached once, after the GPU context exists and
/// before the first tick.
pub trait SceneObject {
    fn attach(&self, ctx: &RenderContext) -> Disposer;
}

/// Undoes one attachment: removes the object's scene nodes and unregisters
/// its frame callbacks.
///
/// Runs at most once, on the first of an explicit [`dispose`](Self::dispose)
/// call or drop. The host drains disposers in reverse attach order during
/// teardown.
pub struct Disposer {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl Disposer {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// A disposer that does nothing, for objects with no teardown.
    pub fn noop() -> Self {
        Self { cleanup: None }
    }

    /// Run the cleanup now. Calling again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispose_runs_exactly_once() {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let mut disposer = Disposer::new(move || inner.set(inner.get() + 1));

        disposer.dispose();
        disposer.dispose();
        assert_eq!(count.get(), 1);

        drop(disposer);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn dropping_an_undisposed_disposer_runs_cleanup() {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        {
            let _disposer = Disposer::new(move || inner.set(inner.get() + 1));
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn attach_then_dispose_restores_scene_and_registry() {
        use crate::scene::{NodeId, SceneNode};

        struct Marker;
        impl SceneNode for Marker {
            fn draw(&self, _queue: &wgpu::Queue, _pass: &mut wgpu::RenderPass<'_>) {}
        }

        let scene = Rc::new(RefCell::new(Scene::new()));
        let registry = Rc::new(FrameRegistry::new());

        // The attach/dispose shape every scene object follows.
        let attach = |scene: &Rc<RefCell<Scene>>, registry: &Rc<FrameRegistry>| -> Disposer {
            let node_id: NodeId = scene.borrow_mut().add(Box::new(Marker));
            let token = registry.register(|| {});

            let scene = Rc::clone(scene);
            let registry = Rc::clone(registry);
            Disposer::new(move || {
                registry.unregister(token);
                scene.borrow_mut().remove(node_id);
            })
        };

        let mut disposer = attach(&scene, &registry);
        assert_eq!(scene.borrow().len(), 1);
        assert_eq!(registry.len(), 1);

        disposer.dispose();
        assert_eq!(scene.borrow().len(), 0);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn noop_disposer_is_inert() {
        let mut disposer = Disposer::noop();
        disposer.dispose();
    }
}
