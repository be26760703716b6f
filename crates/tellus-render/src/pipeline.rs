//! Terrain render pipeline and grid geometry.

use bytemuck::{Pod, Zeroable};
use std::num::NonZeroU64;

/// One vertex of the shared window grid: its integer post offset within
/// the window, normalized to [0, 1].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GridVertex {
    pub uv: [f32; 2],
}

impl GridVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GridVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

/// Build the shared `window`-post grid every ring draws with: one vertex
/// per post, two triangles per cell.
pub fn build_grid(window: u32) -> (Vec<GridVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity((window * window) as usize);
    let scale = 1.0 / (window - 1) as f32;
    for y in 0..window {
        for x in 0..window {
            vertices.push(GridVertex {
                uv: [x as f32 * scale, y as f32 * scale],
            });
        }
    }

    let cells = window - 1;
    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for y in 0..cells {
        for x in 0..cells {
            let sw = y * window + x;
            let se = sw + 1;
            let nw = sw + window;
            let ne = nw + 1;
            indices.extend_from_slice(&[sw, se, nw, nw, se, ne]);
        }
    }

    (vertices, indices)
}

/// Render pipeline for clipmap terrain rings.
pub struct TerrainPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_bind_group_layout: wgpu::BindGroupLayout,
    pub texture_bind_group_layout: wgpu::BindGroupLayout,
}

impl TerrainPipeline {
    /// Create the terrain pipeline.
    ///
    /// Group 0 binds the eye uniforms and the per-ring terrain uniforms;
    /// group 1 binds the ring's height texture, imagery texture, and
    /// sampler. `wireframe` requires a device created with
    /// `Features::POLYGON_MODE_LINE`.
    pub fn new(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        target_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        wireframe: bool,
    ) -> Self {
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("terrain-uniform-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: NonZeroU64::new(96), // EyeUniforms
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: NonZeroU64::new(64), // TerrainUniforms
                        },
                        count: None,
                    },
                ],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("terrain-texture-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain-pipeline-layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            immediate_size: 0,
        });

        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual, // reverse-Z
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("terrain-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[GridVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: if wireframe {
                    wgpu::PolygonMode::Line
                } else {
                    wgpu::PolygonMode::Fill
                },
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_bind_group_layout,
            texture_bind_group_layout,
        }
    }
}

/// The WGSL source for the terrain shader.
///
/// The vertex stage maps a grid vertex to its level-wide post, reads the
/// post's height through the toroidal texture addressing, places the
/// vertex on the globe in eye-relative space via the high/low split eye,
/// and carries the blend alpha toward the coarser ring.
pub const TERRAIN_SHADER_SOURCE: &str = r#"
struct EyeUniforms {
    mvp: mat4x4<f32>,
    eye_high: vec4<f32>,
    eye_low: vec4<f32>,
};

struct TerrainUniforms {
    extent: vec4<f32>,
    origin_and_delta: vec4<f32>,
    blend: vec4<f32>,
    flags: vec4<f32>,
};

@group(0) @binding(0) var<uniform> eye: EyeUniforms;
@group(0) @binding(1) var<uniform> ring: TerrainUniforms;
@group(1) @binding(0) var height_texture: texture_2d<f32>;
@group(1) @binding(1) var imagery_texture: texture_2d<f32>;
@group(1) @binding(2) var imagery_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) blend_alpha: f32,
    @location(2) height: f32,
};

const DEGREES_TO_RADIANS: f32 = 0.017453292519943295;

@vertex
fn vs_main(@location(0) uv: vec2<f32>) -> VertexOutput {
    let window = ring.extent.zw - ring.extent.xy;
    let post = ring.extent.xy + uv * window;

    // Toroidal lookup: the window's southwest corner sits at
    // origin_and_delta.xy inside the texture.
    let texels = vec2<f32>(textureDimensions(height_texture));
    let texel = (ring.origin_and_delta.xy + uv * window) % texels;
    let height = textureLoad(height_texture, vec2<u32>(texel), 0).r * ring.blend.z;

    // Post index to geodetic degrees to a sphere point; the ellipsoid's
    // flattening is folded into the vertical scale on the CPU side.
    let longitude = (-180.0 + post.x * ring.origin_and_delta.z) * DEGREES_TO_RADIANS;
    let latitude = (-90.0 + post.y * ring.origin_and_delta.w) * DEGREES_TO_RADIANS;
    let normal = vec3<f32>(
        cos(latitude) * cos(longitude),
        cos(latitude) * sin(longitude),
        sin(latitude),
    );

    let radius = 6378137.0 + height;
    let radius_high = f32(i32(radius));
    let position_high = normal * radius_high;
    let position_low = normal * (radius - radius_high);

    // Emulated double-precision subtraction: both differences are between
    // nearby values and stay exact in f32.
    let t = (position_high - eye.eye_high.xyz) + (position_low - eye.eye_low.xyz);

    let center = vec2<f32>(0.5, 0.5);
    let from_center = abs(uv - center) * window;
    let distance_posts = max(from_center.x, from_center.y);
    let alpha = clamp((distance_posts - ring.blend.x) * ring.blend.y, 0.0, 1.0);

    var out: VertexOutput;
    out.clip_position = eye.mvp * vec4<f32>(t, 1.0);
    out.uv = uv;
    out.blend_alpha = alpha;
    out.height = height;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var color = vec3<f32>(0.3, 0.4, 0.3);
    if ring.flags.w > 0.5 {
        color = textureSample(imagery_texture, imagery_sampler, in.uv).rgb;
    }
    if ring.flags.y > 0.5 {
        // Color-by-level debugging: tint by blend alpha.
        color = mix(vec3<f32>(0.1, 0.4, 0.9), vec3<f32>(0.9, 0.3, 0.1), in.blend_alpha);
    }
    return vec4<f32>(color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_vertex_layout() {
        let layout = GridVertex::layout();
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes.len(), 1);
    }

    #[test]
    fn test_grid_counts() {
        let (vertices, indices) = build_grid(5);
        assert_eq!(vertices.len(), 25);
        // 4x4 cells, two triangles each.
        assert_eq!(indices.len(), 4 * 4 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_grid_uv_spans_unit_square() {
        let (vertices, _) = build_grid(9);
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
        assert_eq!(vertices[8].uv, [1.0, 0.0]);
        assert_eq!(vertices.last().unwrap().uv, [1.0, 1.0]);
    }

    #[test]
    fn test_shader_source_declares_entry_points() {
        assert!(TERRAIN_SHADER_SOURCE.contains("fn vs_main"));
        assert!(TERRAIN_SHADER_SOURCE.contains("fn fs_main"));
        assert!(TERRAIN_SHADER_SOURCE.contains("eye_high"));
        assert!(TERRAIN_SHADER_SOURCE.contains("eye_low"));
    }
}
