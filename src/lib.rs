//! # Helioscope
//!
//! **An animated sun-and-starfield viewer built on wgpu.**
//!
//! A small frame-orchestration core: a shared scene graph, a per-frame
//! callback registry, a damped orbit camera, and a post-processing chain
//! (scene pass + bloom), driven by a start/stoppable animation loop on a
//! winit event loop.
//!
//! ## Quick Start
//!
//! ```no_run
//! use helioscope::{Starfield, Sun, run};
//!
//! fn main() {
//!     run(vec![Box::new(Starfield::default()), Box::new(Sun::default())]).unwrap();
//! }
//! ```
//!
//! Scene objects implement [`SceneObject`]: `attach` builds GPU resources,
//! inserts nodes into the scene, optionally registers per-frame callbacks,
//! and returns a [`Disposer`] that undoes all of it. The host attaches
//! objects after mounting and disposes them in reverse order at teardown, so
//! a closed window always leaves the scene and registry empty.

mod app;
mod bloom;
mod camera;
mod chain;
mod context;
mod frame_loop;
mod gpu;
mod input;
mod orbit;
mod registry;
mod scene;
mod scene_pass;
mod starfield;
mod sun;
mod texture;

pub use app::{AppConfig, RunError, run, run_with_config};
pub use bloom::{BloomPass, BloomSettings};
pub use camera::Camera;
pub use chain::{ChainPass, PassContext, PostChain, RenderTarget};
pub use context::{Disposer, RenderContext, SceneObject};
pub use frame_loop::{FrameLoop, LoopState};
pub use gpu::{GpuContext, MountError, TONEMAP_EXPOSURE};
pub use input::Input;
pub use orbit::{DEFAULT_DAMPING, OrbitController};
pub use registry::{FrameRegistry, FrameToken};
pub use scene::{NodeId, Scene, SceneNode};
pub use scene_pass::{CameraUniforms, DEPTH_FORMAT, ScenePass};
pub use starfield::Starfield;
pub use sun::Sun;
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
