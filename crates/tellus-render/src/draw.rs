//! Per-frame draw-list assembly.

use glam::{DMat4, DVec3};
use tellus_clipmap::{ClipmapFrame, TerrainOptions};
use tellus_eye::{EyeRelative, EyeUniforms};

use crate::uniforms::TerrainUniforms;

/// Build the frame's eye uniforms: the eye-relative model-view-projection
/// (computed in f64, downcast after the translation is removed) plus the
/// high/low split eye position.
pub fn frame_eye_uniforms(projection: DMat4, view: DMat4, eye: DVec3) -> EyeUniforms {
    let model_view = EyeRelative::new(eye).model_view(view);
    let mvp = projection.as_mat4() * model_view;
    EyeUniforms::new(mvp, eye)
}

/// One ring's draw call: its level (texture index) and packed uniforms.
///
/// Rings draw coarsest first; finer rings overwrite the coarser ones where
/// they overlap. A ring whose writes are still outstanding keeps drawing
/// with whatever its textures already hold (the previous window or the
/// coarser data), so a pending tile never blocks the frame.
#[derive(Clone, Copy, Debug)]
pub struct RingDrawCall {
    pub level: usize,
    pub uniforms: TerrainUniforms,
    /// False while the ring's window writes are outstanding.
    pub resident: bool,
}

/// Assemble the frame's ring draw calls from the LOD controller output,
/// coarsest first.
pub fn assemble_draw_list(frame: &ClipmapFrame, options: &TerrainOptions) -> Vec<RingDrawCall> {
    frame
        .levels
        .iter()
        .map(|state| RingDrawCall {
            level: state.level,
            uniforms: TerrainUniforms::new(
                state,
                options.height_exaggeration,
                options.wireframe,
                options.color_by_level,
                options.lighting,
                options.show_imagery,
            ),
            resident: state.resident,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_clipmap::{LevelRenderState, PostExtent, TerrainBlendParams};

    fn frame() -> ClipmapFrame {
        let state = |level: usize, resident: bool| LevelRenderState {
            level,
            extent: PostExtent::new(0, 0, 10, 10),
            resident,
            origin_in_texture: (0, 0),
            post_delta_degrees: (1.0, 1.0),
            blend: TerrainBlendParams {
                alpha_offset: 4.0,
                one_over_alpha_extent: 1.0,
            },
        };
        ClipmapFrame {
            height_updates: Vec::new(),
            imagery_updates: Vec::new(),
            levels: vec![state(0, true), state(1, true), state(2, false)],
            imagery_levels: Vec::new(),
        }
    }

    #[test]
    fn test_draw_list_orders_coarsest_first() {
        let calls = assemble_draw_list(&frame(), &TerrainOptions::default());
        let levels: Vec<_> = calls.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
    }

    /// Non-resident rings still get a draw call; their textures hold the
    /// previous (or coarser) data.
    #[test]
    fn test_pending_ring_still_draws() {
        let calls = assemble_draw_list(&frame(), &TerrainOptions::default());
        assert!(!calls[2].resident);
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn test_frame_eye_uniforms_center_on_eye() {
        let eye = glam::DVec3::new(6_378_137.0, 0.0, 0.0);
        let view = glam::DMat4::look_at_rh(eye, glam::DVec3::ZERO, glam::DVec3::Z);
        let uniforms = frame_eye_uniforms(glam::DMat4::IDENTITY, view, eye);

        // The split eye recombines to the original within millimeters.
        let recombined = uniforms.eye_high[0] as f64 + uniforms.eye_low[0] as f64;
        assert!((recombined - 6_378_137.0).abs() < 1e-3);
        // The MVP carries no translation: the eye is the origin.
        assert_eq!(uniforms.mvp[3][0], 0.0);
        assert_eq!(uniforms.mvp[3][1], 0.0);
    }

    #[test]
    fn test_options_flow_into_uniforms() {
        let mut options = TerrainOptions::default();
        options.wireframe = true;
        options.height_exaggeration = 3.0;
        let calls = assemble_draw_list(&frame(), &options);
        assert_eq!(calls[0].uniforms.flags[0], 1.0);
        assert_eq!(calls[0].uniforms.blend[2], 3.0);
    }
}
