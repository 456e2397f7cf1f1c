//! GPU device and output surface management.
//!
//! [`GpuContext`] owns the wgpu surface, device, queue, and surface
//! configuration. It is created once when the host mounts and passed by
//! reference to the render passes; dropping it releases the surface and the
//! device. Scene objects never see this type — they receive cloned
//! device/queue handles through the render context instead.

use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

/// Exposure constant for the Reinhard tone mapping applied by the final
/// composite pass.
pub const TONEMAP_EXPOSURE: f32 = 1.5;

/// Failure to bring up the rendering surface at mount time.
///
/// Fatal: the host surfaces this to the caller and never exposes a partially
/// constructed render context to scene objects.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("failed to create a rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Core GPU context holding wgpu resources.
///
/// Fields are public for direct wgpu access in the render passes. The
/// surface is configured with Fifo present mode, so frame presentation is
/// synchronized to the display refresh rate.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// Performs all wgpu initialization: instance creation, surface
    /// creation, adapter selection, device/queue creation, and surface
    /// configuration with an sRGB format at the window's current inner size.
    /// The window's scale factor is already baked into that physical size,
    /// so the surface is allocated at native pixel density.
    pub fn new(window: Arc<Window>) -> Result<Self, MountError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            }))?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("Helioscope Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        log::info!(
            "mounted GPU context: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            size.width,
            size.height,
            surface_format,
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Reconfigures the existing surface in place. Zero-sized dimensions
    /// (window minimize) are ignored; rendering continues at the stale size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring zero-sized surface resize ({width}x{height})");
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}
