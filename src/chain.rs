//! The post-processing chain: an ordered sequence of render passes.
//!
//! The first pass renders the scene into an intermediate buffer; each later
//! pass reads the previous buffer and writes a transformed one; the final
//! pass writes to the visible surface. Intermediate results ping-pong
//! between two render targets:
//!
//! ```text
//! Pass 0: None → Target A
//! Pass 1: Target A → Target B
//! Pass 2: Target B → Screen
//! ```
//!
//! A single-pass chain renders directly to the screen with no intermediate
//! buffers. Resizing propagates to the ping-pong targets and to every pass
//! in one call, and the host only invokes it between ticks, so no frame is
//! rendered with mismatched buffer sizes.

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::scene::Scene;

/// An off-screen render target used for intermediate pass results.
pub struct RenderTarget {
    #[allow(dead_code)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates a render target usable both as a color attachment and as a
    /// sampled input for the next pass.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Execution context handed to each pass while the chain renders a frame.
pub struct PassContext<'a> {
    pub gpu: &'a GpuContext,
    /// Command encoder the pass appends its render passes to.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// The shared scene; only the base pass draws it.
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Elapsed time in seconds since mount.
    pub time: f32,
}

/// One stage of the post-processing chain.
///
/// `input` is the previous pass's output, or `None` for the base pass.
/// Effect passes panic on a missing input; a chain without a leading base
/// pass is a construction defect, not a runtime condition.
pub trait ChainPass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    );

    /// Resize any internal buffers to the new output dimensions.
    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32);
}

/// Ordered sequence of render passes ending at the visible surface.
pub struct PostChain {
    passes: Vec<Box<dyn ChainPass>>,
    target_a: RenderTarget,
    target_b: RenderTarget,
}

impl PostChain {
    /// Build an empty chain with ping-pong targets at the surface size.
    pub fn new(gpu: &GpuContext) -> Self {
        let (width, height) = (gpu.width(), gpu.height());
        Self {
            passes: Vec::new(),
            target_a: RenderTarget::new(
                &gpu.device,
                gpu.config.format,
                width,
                height,
                "Chain Target A",
            ),
            target_b: RenderTarget::new(
                &gpu.device,
                gpu.config.format,
                width,
                height,
                "Chain Target B",
            ),
        }
    }

    /// Append a pass. The first pass pushed must be the base scene pass.
    pub fn push(&mut self, pass: Box<dyn ChainPass>) {
        self.passes.push(pass);
    }

    /// Resize the ping-pong targets and every pass.
    ///
    /// Must only be called between ticks; the host pairs this with the
    /// camera aspect update inside a single resize event.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.target_a = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            width,
            height,
            "Chain Target A",
        );
        self.target_b = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            width,
            height,
            "Chain Target B",
        );
        for pass in &mut self.passes {
            pass.resize(gpu, width, height);
        }
    }

    /// Run every pass in order and present the result.
    ///
    /// Surface acquisition failures degrade to a skipped frame; the next
    /// tick is a fresh attempt.
    pub fn render(&mut self, gpu: &GpuContext, scene: &Scene, camera: &Camera, time: f32) {
        if self.passes.is_empty() {
            return;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated; reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(err) => {
                log::warn!("dropping frame: {err}");
                return;
            }
        };
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("PostChain Encoder"),
            });

        {
            let mut ctx = PassContext {
                gpu,
                encoder: &mut encoder,
                scene,
                camera,
                time,
            };

            let pass_count = self.passes.len();
            if pass_count == 1 {
                self.passes[0].execute(&mut ctx, &screen_view, None);
            } else {
                let mut current_input: Option<&wgpu::TextureView> = None;

                for (i, pass) in self.passes.iter_mut().enumerate() {
                    let is_last = i == pass_count - 1;

                    let target = if is_last {
                        &screen_view
                    } else if i % 2 == 0 {
                        &self.target_a.view
                    } else {
                        &self.target_b.view
                    };

                    pass.execute(&mut ctx, target, current_input);

                    if !is_last {
                        current_input = Some(if i % 2 == 0 {
                            &self.target_a.view
                        } else {
                            &self.target_b.view
                        });
                    }
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
