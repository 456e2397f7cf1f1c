//! Bloom effect pass with final tonemapped composite.
//!
//! Runs four internal stages off a single chain slot: bright-region
//! extraction into a half-resolution buffer, a separable two-axis gaussian
//! blur, and a composite that adds the blurred glow onto the scene color and
//! applies Reinhard tone mapping at the fixed exposure. Working at half
//! resolution keeps the blur wide and cheap.

use crate::chain::{ChainPass, PassContext, RenderTarget};
use crate::gpu::{GpuContext, TONEMAP_EXPOSURE};

/// Tunable bloom parameters, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct BloomSettings {
    /// How strongly the blurred glow is added back onto the scene.
    pub strength: f32,
    /// Kernel spread multiplier.
    pub radius: f32,
    /// Luminance below which pixels contribute no glow.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.2,
            radius: 0.4,
            threshold: 0.85,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomUniforms {
    texel: [f32; 2],
    direction: [f32; 2],
    threshold: f32,
    strength: f32,
    radius: f32,
    exposure: f32,
}

/// Glow pass reading the base scene color and writing the visible surface.
pub struct BloomPass {
    settings: BloomSettings,
    extract_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    stage_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    extract_buffer: wgpu::Buffer,
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    /// Half-resolution ping targets for extract/blur.
    bright: RenderTarget,
    blur: RenderTarget,
    size: (u32, u32),
}

impl BloomPass {
    pub fn new(gpu: &GpuContext, settings: BloomSettings) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bloom.wgsl").into()),
        });

        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        // Extract and blur sample one texture; composite samples the scene
        // color plus the blurred glow.
        let stage_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Stage Bind Group Layout"),
            entries: &[uniform_entry, texture_entry(1), sampler_entry],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Composite Bind Group Layout"),
            entries: &[uniform_entry, texture_entry(1), sampler_entry, texture_entry(3)],
        });

        let make_pipeline = |label: &str, layout: &wgpu::BindGroupLayout, entry: &str| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let extract_pipeline = make_pipeline("Bloom Extract Pipeline", &stage_layout, "fs_extract");
        let blur_pipeline = make_pipeline("Bloom Blur Pipeline", &stage_layout, "fs_blur");
        let composite_pipeline =
            make_pipeline("Bloom Composite Pipeline", &composite_layout, "fs_composite");

        let make_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BloomUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let (width, height) = (gpu.width(), gpu.height());
        let (half_w, half_h) = (width.div_ceil(2).max(1), height.div_ceil(2).max(1));
        let bright = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            half_w,
            half_h,
            "Bloom Bright Target",
        );
        let blur = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            half_w,
            half_h,
            "Bloom Blur Target",
        );

        Self {
            settings,
            extract_pipeline,
            blur_pipeline,
            composite_pipeline,
            stage_layout,
            composite_layout,
            extract_buffer: make_buffer("Bloom Extract Uniforms"),
            blur_h_buffer: make_buffer("Bloom Blur H Uniforms"),
            blur_v_buffer: make_buffer("Bloom Blur V Uniforms"),
            composite_buffer: make_buffer("Bloom Composite Uniforms"),
            sampler,
            bright,
            blur,
            size: (width, height),
        }
    }

    pub fn settings(&self) -> BloomSettings {
        self.settings
    }

    fn uniforms(&self, texel: [f32; 2], direction: [f32; 2]) -> BloomUniforms {
        BloomUniforms {
            texel,
            direction,
            threshold: self.settings.threshold,
            strength: self.settings.strength,
            radius: self.settings.radius,
            exposure: TONEMAP_EXPOSURE,
        }
    }

    fn stage_bind_group(
        &self,
        device: &wgpu::Device,
        buffer: &wgpu::Buffer,
        input: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Stage Bind Group"),
            layout: &self.stage_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn run_stage(
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl ChainPass for BloomPass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let input = input.expect("bloom pass requires a prior pass output");
        let device = &ctx.gpu.device;
        let queue = &ctx.gpu.queue;

        let (half_w, half_h) = self.bright.size();
        let half_texel = [1.0 / half_w as f32, 1.0 / half_h as f32];
        let full_texel = [1.0 / self.size.0 as f32, 1.0 / self.size.1 as f32];

        queue.write_buffer(
            &self.extract_buffer,
            0,
            bytemuck::cast_slice(&[self.uniforms(full_texel, [0.0, 0.0])]),
        );
        queue.write_buffer(
            &self.blur_h_buffer,
            0,
            bytemuck::cast_slice(&[self.uniforms(half_texel, [1.0, 0.0])]),
        );
        queue.write_buffer(
            &self.blur_v_buffer,
            0,
            bytemuck::cast_slice(&[self.uniforms(half_texel, [0.0, 1.0])]),
        );
        queue.write_buffer(
            &self.composite_buffer,
            0,
            bytemuck::cast_slice(&[self.uniforms(full_texel, [0.0, 0.0])]),
        );

        // Bright regions into the half-res buffer.
        let extract_bg = self.stage_bind_group(device, &self.extract_buffer, input);
        Self::run_stage(
            ctx.encoder,
            "Bloom Extract",
            &self.extract_pipeline,
            &extract_bg,
            &self.bright.view,
        );

        // Separable blur: bright → blur (horizontal), blur → bright (vertical).
        let blur_h_bg = self.stage_bind_group(device, &self.blur_h_buffer, &self.bright.view);
        Self::run_stage(
            ctx.encoder,
            "Bloom Blur H",
            &self.blur_pipeline,
            &blur_h_bg,
            &self.blur.view,
        );
        let blur_v_bg = self.stage_bind_group(device, &self.blur_v_buffer, &self.blur.view);
        Self::run_stage(
            ctx.encoder,
            "Bloom Blur V",
            &self.blur_pipeline,
            &blur_v_bg,
            &self.bright.view,
        );

        // Composite glow onto the scene color and tonemap to the target.
        let composite_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Composite Bind Group"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.composite_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&self.bright.view),
                },
            ],
        });
        Self::run_stage(
            ctx.encoder,
            "Bloom Composite",
            &self.composite_pipeline,
            &composite_bg,
            target,
        );
    }

    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        let (half_w, half_h) = (width.div_ceil(2).max(1), height.div_ceil(2).max(1));
        self.bright = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            half_w,
            half_h,
            "Bloom Bright Target",
        );
        self.blur = RenderTarget::new(
            &gpu.device,
            gpu.config.format,
            half_w,
            half_h,
            "Bloom Blur Target",
        );
        self.size = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_reference_look() {
        let settings = BloomSettings::default();
        assert_eq!(settings.strength, 1.2);
        assert_eq!(settings.radius, 0.4);
        assert_eq!(settings.threshold, 0.85);
    }
}
