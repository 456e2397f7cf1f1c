//! The rendering host: winit event loop, mount/teardown, and the per-tick
//! frame sequence.
//!
//! Mounting happens on the first `resumed` event: window, GPU context, scene,
//! camera, chain, and registry are built in order, the render context is
//! assembled only once every part exists, and then each provided scene object
//! attaches. Teardown reverses attachment before the GPU context drops.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::bloom::{BloomPass, BloomSettings};
use crate::camera::Camera;
use crate::chain::PostChain;
use crate::context::{Disposer, RenderContext, SceneObject};
use crate::frame_loop::FrameLoop;
use crate::gpu::{GpuContext, MountError};
use crate::input::Input;
use crate::orbit::OrbitController;
use crate::registry::FrameRegistry;
use crate::scene::Scene;
use crate::scene_pass::{DEPTH_FORMAT, ScenePass};

/// Configuration for the app window.
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Helioscope".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Failure to run the application to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Run the viewer with the default window configuration.
///
/// Blocks until the window closes. Each object in `objects` is attached once
/// after the GPU context is mounted and detached again at teardown.
pub fn run(objects: Vec<Box<dyn SceneObject>>) -> Result<(), RunError> {
    run_with_config(AppConfig::default(), objects)
}

/// Run the viewer with a custom window configuration.
pub fn run_with_config(
    config: AppConfig,
    objects: Vec<Box<dyn SceneObject>>,
) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        objects: Some(objects),
        running: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    chain: PostChain,
    scene: Rc<RefCell<Scene>>,
    camera: Rc<RefCell<Camera>>,
    registry: Rc<FrameRegistry>,
    controller: OrbitController,
    input: Input,
    frame_loop: FrameLoop,
    /// Held in attach order; drained in reverse at teardown.
    disposers: Vec<Disposer>,
    start_time: Instant,
    last_frame: Instant,
}

struct App {
    config: AppConfig,
    objects: Option<Vec<Box<dyn SceneObject>>>,
    running: Option<Running>,
    error: Option<RunError>,
}

impl App {
    fn mount(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, RunError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone())?;

        let scene = Rc::new(RefCell::new(Scene::new()));
        let camera = Rc::new(RefCell::new(Camera::new(75.0, gpu.aspect(), 0.1, 1000.0)));
        let registry = Rc::new(FrameRegistry::new());

        let scene_pass = ScenePass::new(&gpu);
        let camera_bind_group_layout = scene_pass.camera_bind_group_layout().clone();

        let mut chain = PostChain::new(&gpu);
        chain.push(Box::new(scene_pass));
        chain.push(Box::new(BloomPass::new(&gpu, BloomSettings::default())));

        // Objects only ever see this context; the surface and chain stay
        // private to the host.
        let ctx = RenderContext {
            scene: Rc::clone(&scene),
            camera: Rc::clone(&camera),
            registry: Rc::clone(&registry),
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            camera_bind_group_layout,
            color_format: gpu.config.format,
            depth_format: DEPTH_FORMAT,
        };

        let objects = self.objects.take().unwrap_or_default();
        let disposers: Vec<Disposer> = objects.iter().map(|object| object.attach(&ctx)).collect();
        log::info!("attached {} scene objects", disposers.len());

        let mut frame_loop = FrameLoop::new();
        frame_loop.start();
        window.request_redraw();

        Ok(Running {
            window,
            gpu,
            chain,
            scene,
            camera,
            registry,
            controller: OrbitController::new().distance(30.0),
            input: Input::new(),
            frame_loop,
            disposers,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.error.is_some() {
            return;
        }
        match self.mount(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(err) => {
                log::error!("mount failed: {err}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                running.frame_loop.stop();
                // Detach in reverse attach order before anything else drops.
                for mut disposer in running.disposers.drain(..).rev() {
                    disposer.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                // Surface, chain buffers, and camera aspect move together so
                // no tick sees a half-applied resize.
                running.gpu.resize(size.width, size.height);
                running
                    .chain
                    .resize(&running.gpu, running.gpu.width(), running.gpu.height());
                running.camera.borrow_mut().set_aspect(running.gpu.aspect());
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let time = running.start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(running.last_frame).as_secs_f32();
                running.last_frame = now;

                // Schedule the next tick before doing this one's work; a
                // stopped loop cancels it at the gate instead.
                if running.frame_loop.is_running() {
                    running.window.request_redraw();
                }

                let Running {
                    gpu,
                    chain,
                    scene,
                    camera,
                    registry,
                    controller,
                    input,
                    frame_loop,
                    ..
                } = running;

                frame_loop.tick(|| {
                    controller.update(input, dt);
                    controller.apply_to(&mut camera.borrow_mut());
                    registry.invoke_all();
                    chain.render(gpu, &scene.borrow(), &camera.borrow(), time);
                    input.begin_frame();
                });
            }
            _ => {}
        }
    }
}
