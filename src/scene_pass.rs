//! Base render pass: draws the scene graph into the chain's first buffer.
//!
//! Owns the shared camera uniform buffer (bind group 0 for every scene node
//! pipeline) and the depth buffer. Scene objects build their pipelines
//! against [`camera_bind_group_layout`](ScenePass::camera_bind_group_layout)
//! and the formats exposed through the render context.

use crate::camera::Camera;
use crate::chain::{ChainPass, PassContext};
use crate::gpu::GpuContext;

/// Depth buffer format shared by every scene node pipeline.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera uniforms uploaded once per frame, visible to all scene nodes.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// View matrix; billboarded nodes extract camera right/up from it.
    pub view: [[f32; 4]; 4],
    /// Camera position in world space.
    pub camera_pos: [f32; 3],
    /// Elapsed time in seconds since mount.
    pub time: f32,
}

/// The chain's base pass: clears to black and draws every scene node in
/// insertion order, with depth testing.
pub struct ScenePass {
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    camera_bind_group_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl ScenePass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let depth_view = Self::create_depth_view(gpu, gpu.width(), gpu.height());

        Self {
            camera_buffer,
            camera_bind_group,
            camera_bind_group_layout,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    /// Layout scene node pipelines must use for bind group 0.
    pub fn camera_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.camera_bind_group_layout
    }

    fn create_depth_view(gpu: &GpuContext, width: u32, height: u32) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn write_camera(&self, ctx: &PassContext<'_>, camera: &Camera) {
        let uniforms = CameraUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            time: ctx.time,
        };
        ctx.gpu
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }
}

impl ChainPass for ScenePass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        _input: Option<&wgpu::TextureView>,
    ) {
        self.write_camera(ctx, ctx.camera);

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for node in ctx.scene.nodes() {
            node.draw(&ctx.gpu.queue, &mut pass);
        }
    }

    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.depth_size != (width, height) {
            self.depth_view = Self::create_depth_view(gpu, width, height);
            self.depth_size = (width, height);
        }
    }
}
