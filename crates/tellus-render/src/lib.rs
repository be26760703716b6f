//! wgpu boundary for the clipmap terrain: headless device initialization,
//! per-level clipmap textures with toroidal sub-region uploads, terrain
//! uniforms, and per-frame draw-list assembly.
//!
//! Everything here runs on the render thread. Workers deliver CPU-side
//! payloads only; this crate performs the uploads.

mod clipmap_textures;
mod draw;
mod gpu;
mod pipeline;
mod uniforms;

pub use clipmap_textures::{
    ClipmapTextureSet, TextureError, ToroidalSlice, post_to_texel, toroidal_slices,
};
pub use draw::{RingDrawCall, assemble_draw_list, frame_eye_uniforms};
pub use gpu::{RenderContext, RenderContextError, init_render_context_blocking};
pub use pipeline::{GridVertex, TERRAIN_SHADER_SOURCE, TerrainPipeline, build_grid};
pub use uniforms::TerrainUniforms;
