//! Uniform block layout for precision-safe draws.

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Mat4};

use crate::highlow::HighLowSplit;

/// Per-frame uniforms for a precision-safe draw call, laid out for direct
/// upload: the eye-relative model-view-projection matrix plus the split eye
/// position for shaders using the high/low path.
///
/// Produced from the f64 camera state by exactly one strategy per draw
/// call; mixing strategies within a draw is invalid by construction.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct EyeUniforms {
    /// Model-view-projection with the eye at the origin.
    pub mvp: [[f32; 4]; 4],
    /// Coarse f32 part of the eye position, w unused.
    pub eye_high: [f32; 4],
    /// Residual f32 part of the eye position, w unused.
    pub eye_low: [f32; 4],
}

impl EyeUniforms {
    /// Build uniforms from the eye-relative MVP and the f64 eye position.
    pub fn new(mvp: Mat4, eye: DVec3) -> Self {
        let (high, low) = HighLowSplit::split_vec(eye);
        Self {
            mvp: mvp.to_cols_array_2d(),
            eye_high: [high.x, high.y, high.z, 0.0],
            eye_low: [low.x, low.y, low.z, 0.0],
        }
    }
}
