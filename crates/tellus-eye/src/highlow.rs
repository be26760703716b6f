//! GPU-emulated double precision via high/low f32 pairs.

use glam::{DVec3, Vec3};

/// Splits f64 coordinates into a coarse f32 "high" part and an f32 "low"
/// residual, uploaded as separate attributes or uniforms. The GPU computes
/// `(p_high - eye_high) + (p_low - eye_low)`: both subtractions are between
/// nearby values and stay exact, so the sum recovers an effectively
/// double-precision difference before projection.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighLowSplit;

impl HighLowSplit {
    /// Split one coordinate. The high part is the f32 rounding of the
    /// value; the low part is the residual the rounding discarded.
    pub fn split(value: f64) -> (f32, f32) {
        let high = value as f32;
        let low = (value - high as f64) as f32;
        (high, low)
    }

    /// Split a position into high and low vectors.
    pub fn split_vec(position: DVec3) -> (Vec3, Vec3) {
        let (hx, lx) = Self::split(position.x);
        let (hy, ly) = Self::split(position.y);
        let (hz, lz) = Self::split(position.z);
        (Vec3::new(hx, hy, hz), Vec3::new(lx, ly, lz))
    }

    /// Recombine a split pair in f64, for verification.
    pub fn reconstruct(high: Vec3, low: Vec3) -> DVec3 {
        high.as_dvec3() + low.as_dvec3()
    }

    /// The difference `position - eye` as the GPU computes it from split
    /// parts.
    pub fn gpu_difference(position: DVec3, eye: DVec3) -> Vec3 {
        let (p_high, p_low) = Self::split_vec(position);
        let (e_high, e_low) = Self::split_vec(eye);
        (p_high - e_high) + (p_low - e_low)
    }
}
