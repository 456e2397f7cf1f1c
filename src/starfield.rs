//! A cube of billboarded star sprites surrounding the scene.
//!
//! Star positions and the sprite bitmap are generated procedurally at attach
//! time; no assets are loaded from disk. Each star is an instanced quad that
//! faces the camera, textured with a soft radial gradient and blended
//! additively so overlapping stars brighten rather than occlude.

use std::rc::Rc;

use wgpu::util::DeviceExt;

use crate::context::{Disposer, RenderContext, SceneObject};
use crate::scene::SceneNode;
use crate::texture::Texture;

/// Side length of the procedural star sprite in pixels.
const SPRITE_SIZE: u32 = 64;

/// Configuration for a [`Starfield`]. The defaults fill a 600-unit cube with
/// six thousand dim gray stars.
#[derive(Clone, Copy, Debug)]
pub struct Starfield {
    /// Number of stars.
    pub count: u32,
    /// Stars are scattered uniformly in `[-extent, extent]` on each axis.
    pub extent: f32,
    /// World-space quad size of one star.
    pub size: f32,
    /// Base tint applied to the sprite, linear RGB.
    pub color: [f32; 3],
    /// Seed for the position hash; same seed, same sky.
    pub seed: u32,
}

impl Default for Starfield {
    fn default() -> Self {
        Self {
            count: 6000,
            extent: 300.0,
            size: 0.7,
            color: [0.667, 0.667, 0.667],
            seed: 0,
        }
    }
}

/// 32-bit integer hash (xorshift-multiply), used to derive star positions
/// without pulling in an RNG.
fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Map a hash to `[-extent, extent]`.
fn hash_to_coord(h: u32, extent: f32) -> f32 {
    let unit = h as f32 / u32::MAX as f32;
    (unit * 2.0 - 1.0) * extent
}

/// Deterministic star positions, three hash lanes per star.
pub fn star_positions(count: u32, extent: f32, seed: u32) -> Vec<[f32; 3]> {
    (0..count)
        .map(|i| {
            let base = seed.wrapping_add(i.wrapping_mul(3));
            [
                hash_to_coord(hash_u32(base), extent),
                hash_to_coord(hash_u32(base.wrapping_add(1)), extent),
                hash_to_coord(hash_u32(base.wrapping_add(2)), extent),
            ]
        })
        .collect()
}

/// RGBA pixels for the star sprite: white, with alpha falling off radially
/// through the stops (0.0, 1.0), (0.2, 0.8), (0.4, 0.2), (1.0, 0.0).
pub fn sprite_pixels() -> Vec<u8> {
    const STOPS: [(f32, f32); 4] = [(0.0, 1.0), (0.2, 0.8), (0.4, 0.2), (1.0, 0.0)];

    let mut pixels = Vec::with_capacity((SPRITE_SIZE * SPRITE_SIZE * 4) as usize);
    let center = (SPRITE_SIZE as f32 - 1.0) / 2.0;
    for y in 0..SPRITE_SIZE {
        for x in 0..SPRITE_SIZE {
            let dx = (x as f32 - center) / center;
            let dy = (y as f32 - center) / center;
            let r = (dx * dx + dy * dy).sqrt().min(1.0);

            let mut alpha = STOPS[STOPS.len() - 1].1;
            for pair in STOPS.windows(2) {
                let (r0, a0) = pair[0];
                let (r1, a1) = pair[1];
                if r <= r1 {
                    let t = (r - r0) / (r1 - r0);
                    alpha = a0 + (a1 - a0) * t;
                    break;
                }
            }

            pixels.extend_from_slice(&[255, 255, 255, (alpha * 255.0).round() as u8]);
        }
    }
    pixels
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct StarParams {
    color: [f32; 3],
    size: f32,
}

struct StarfieldNode {
    pipeline: wgpu::RenderPipeline,
    corner_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    count: u32,
}

impl StarfieldNode {
    fn new(settings: &Starfield, ctx: &RenderContext) -> Self {
        let device = &ctx.device;

        let sprite = Texture::from_rgba(
            device,
            &ctx.queue,
            &sprite_pixels(),
            SPRITE_SIZE,
            SPRITE_SIZE,
            "Star Sprite",
        );

        // Quad corners, triangle strip.
        let corners: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [-0.5, 0.5], [0.5, 0.5]];
        let corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Corners"),
            contents: bytemuck::cast_slice(&corners),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let positions = star_positions(settings.count, settings.extent, settings.seed);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Instances"),
            contents: bytemuck::cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let params = StarParams {
            color: settings.color,
            size: settings.size,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Params"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Starfield Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Starfield Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&sprite.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sprite.sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Starfield Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/starfield.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Starfield Pipeline Layout"),
            bind_group_layouts: &[&ctx.camera_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });

        // Additive blending, depth test without depth writes: stars glow
        // through each other but never punch holes in the sun.
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Starfield Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 8,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![1 => Float32x3],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.color_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: false,
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
            corner_buffer,
            instance_buffer,
            bind_group,
            count: settings.count,
        }
    }
}

impl SceneNode for StarfieldNode {
    fn draw(&self, _queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.corner_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.draw(0..4, 0..self.count);
    }
}

impl SceneObject for Starfield {
    fn attach(&self, ctx: &RenderContext) -> Disposer {
        let node_id = ctx
            .scene
            .borrow_mut()
            .add(Box::new(StarfieldNode::new(self, ctx)));
        log::debug!("attached starfield with {} stars", self.count);

        let scene = Rc::clone(&ctx.scene);
        Disposer::new(move || {
            scene.borrow_mut().remove(node_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_deterministic_and_bounded() {
        let a = star_positions(100, 300.0, 7);
        let b = star_positions(100, 300.0, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
        for p in &a {
            for &c in p {
                assert!(c.abs() <= 300.0, "coordinate {c} outside the cube");
            }
        }
    }

    #[test]
    fn different_seeds_scatter_differently() {
        let a = star_positions(100, 300.0, 1);
        let b = star_positions(100, 300.0, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn sprite_fades_from_center_to_edge() {
        let pixels = sprite_pixels();
        assert_eq!(pixels.len(), (SPRITE_SIZE * SPRITE_SIZE * 4) as usize);

        let alpha_at = |x: u32, y: u32| pixels[((y * SPRITE_SIZE + x) * 4 + 3) as usize];
        let mid = SPRITE_SIZE / 2;
        assert!(alpha_at(mid, mid) > 240, "center should be nearly opaque");
        assert_eq!(alpha_at(0, 0), 0, "corner should be transparent");
        assert!(alpha_at(mid, mid) > alpha_at(mid, SPRITE_SIZE - 1));
    }
}
