//! The sun: a tessellated sphere shaded by animated simplex-noise fbm.
//!
//! The surface churns by feeding object-space position and an accumulated
//! time value into a 4D noise field in the fragment shader. Time advances
//! through a per-frame callback rather than wall-clock time, so the churn
//! rate is tied to the tick rate exactly like the rest of the animation.

use std::cell::Cell;
use std::rc::Rc;

use wgpu::util::DeviceExt;

use crate::context::{Disposer, RenderContext, SceneObject};
use crate::scene::SceneNode;

/// Configuration for a [`Sun`].
#[derive(Clone, Copy, Debug)]
pub struct Sun {
    /// Sphere radius in world units.
    pub radius: f32,
    /// Tessellation steps around and along the sphere.
    pub segments: u32,
    /// Noise-time advance per tick.
    pub time_step: f32,
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            radius: 10.0,
            segments: 50,
            time_step: 0.01,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SunVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// UV-sphere geometry: `(segments + 1)²` vertices in a latitude/longitude
/// grid, indexed as quads split into triangles. Pole quads degenerate to
/// triangles, which is harmless.
fn sphere_geometry(radius: f32, segments: u32) -> (Vec<SunVertex>, Vec<u32>) {
    use std::f32::consts::PI;

    let rings = segments + 1;
    let mut vertices = Vec::with_capacity((rings * rings) as usize);
    for i in 0..rings {
        let phi = PI * i as f32 / segments as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for j in 0..rings {
            let theta = 2.0 * PI * j as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
            vertices.push(SunVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
            });
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for i in 0..segments {
        for j in 0..segments {
            let a = i * rings + j;
            let b = a + rings;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    (vertices, indices)
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SunUniforms {
    time: f32,
    _pad: [f32; 3],
}

struct SunNode {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Shared with the frame callback that advances it.
    time: Rc<Cell<f32>>,
}

impl SunNode {
    fn new(settings: &Sun, ctx: &RenderContext, time: Rc<Cell<f32>>) -> Self {
        let device = &ctx.device;

        let (vertices, indices) = sphere_geometry(settings.radius, settings.segments);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sun Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sun Indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sun Uniforms"),
            size: std::mem::size_of::<SunUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sun Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sun Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sun Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sun.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sun Pipeline Layout"),
            bind_group_layouts: &[&ctx.camera_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sun Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<SunVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            uniform_buffer,
            bind_group,
            time,
        }
    }
}

impl SceneNode for SunNode {
    fn draw(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) {
        let uniforms = SunUniforms {
            time: self.time.get(),
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

impl SceneObject for Sun {
    fn attach(&self, ctx: &RenderContext) -> Disposer {
        let time = Rc::new(Cell::new(0.0_f32));
        let node_id = ctx
            .scene
            .borrow_mut()
            .add(Box::new(SunNode::new(self, ctx, Rc::clone(&time))));

        let step = self.time_step;
        let ticker = Rc::clone(&time);
        let token = ctx.registry.register(move || {
            ticker.set(ticker.get() + step);
        });
        log::debug!("attached sun (radius {})", self.radius);

        let scene = Rc::clone(&ctx.scene);
        let registry = Rc::clone(&ctx.registry);
        Disposer::new(move || {
            registry.unregister(token);
            scene.borrow_mut().remove(node_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FrameRegistry;

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let (vertices, indices) = sphere_geometry(10.0, 50);
        assert_eq!(vertices.len(), 51 * 51);
        assert_eq!(indices.len(), (50 * 50 * 6) as usize);

        for v in &vertices {
            let [x, y, z] = v.position;
            let len = (x * x + y * y + z * z).sqrt();
            assert!((len - 10.0).abs() < 1e-3, "vertex off the sphere: {len}");
        }
    }

    #[test]
    fn sphere_indices_stay_in_bounds() {
        let (vertices, indices) = sphere_geometry(1.0, 8);
        let max = *indices.iter().max().unwrap();
        assert!((max as usize) < vertices.len());
    }

    #[test]
    fn time_advances_one_step_per_tick() {
        let registry = FrameRegistry::new();
        let time = Rc::new(Cell::new(0.0_f32));

        let step = Sun::default().time_step;
        let ticker = Rc::clone(&time);
        registry.register(move || ticker.set(ticker.get() + step));

        for _ in 0..100 {
            registry.invoke_all();
        }
        assert!((time.get() - 1.0).abs() < 1e-4);
    }
}
