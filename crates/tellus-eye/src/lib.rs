//! Precision-safe rendering transforms for planet-scale coordinates.
//!
//! World positions on a globe have magnitudes around 6.4e6 meters, where
//! f32 spacing is half a meter: subtracting two such positions on the GPU
//! loses the sub-meter detail and vertices visibly "swim" as the camera
//! moves. Two interchangeable strategies avoid this, each keeping visible
//! jitter below a pixel from the surface up to low orbit:
//!
//! - [`EyeRelative`]: re-origin all positions at the eye in f64 on the CPU,
//!   downcasting to f32 only after the subtraction.
//! - [`HighLowSplit`]: split each f64 coordinate into a coarse f32 "high"
//!   part and a residual f32 "low" part; the GPU subtracts the parts
//!   separately and sums the small differences.
//!
//! A draw call uses exactly one strategy; its uniforms ([`EyeUniforms`])
//! come from whichever strategy produced them.

mod highlow;
mod relative;
mod uniforms;

pub use highlow::HighLowSplit;
pub use relative::EyeRelative;
pub use uniforms::EyeUniforms;
