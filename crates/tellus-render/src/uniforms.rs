//! Per-ring uniform block layout.

use bytemuck::{Pod, Zeroable};
use tellus_clipmap::LevelRenderState;

/// Uniforms for drawing one clipmap ring, laid out in vec4-sized groups
/// for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct TerrainUniforms {
    /// Window bounds in level post indices: west, south, east, north.
    pub extent: [f32; 4],
    /// xy: toroidal origin of the window's southwest corner in texels;
    /// zw: post spacing in degrees of longitude/latitude.
    pub origin_and_delta: [f32; 4],
    /// x: blend alpha offset in posts from the window center;
    /// y: one over the blend band width;
    /// z: height exaggeration; w: unused.
    pub blend: [f32; 4],
    /// Mode flags as 0/1 floats: x wireframe, y color-by-level, z lighting,
    /// w show-imagery.
    pub flags: [f32; 4],
}

impl TerrainUniforms {
    /// Pack one ring's render state.
    pub fn new(
        state: &LevelRenderState,
        height_exaggeration: f32,
        wireframe: bool,
        color_by_level: bool,
        lighting: bool,
        show_imagery: bool,
    ) -> Self {
        Self {
            extent: [
                state.extent.west as f32,
                state.extent.south as f32,
                state.extent.east as f32,
                state.extent.north as f32,
            ],
            origin_and_delta: [
                state.origin_in_texture.0 as f32,
                state.origin_in_texture.1 as f32,
                state.post_delta_degrees.0 as f32,
                state.post_delta_degrees.1 as f32,
            ],
            blend: [
                state.blend.alpha_offset,
                state.blend.one_over_alpha_extent,
                height_exaggeration,
                0.0,
            ],
            flags: [
                wireframe as u32 as f32,
                color_by_level as u32 as f32,
                lighting as u32 as f32,
                show_imagery as u32 as f32,
            ],
        }
    }
}
