//! CPU relative-to-eye recentering.

use glam::{DMat4, DVec3, Mat4, Vec3};

/// Recomputes rendered positions as `position - eye` in double precision,
/// downcasting to f32 immediately before upload. The eye itself becomes the
/// origin of the GPU-side transform pipeline, so the subtraction that would
/// cancel catastrophically in f32 happens in f64 on the host instead.
///
/// Recomputed every frame from the current eye; never persisted.
#[derive(Clone, Copy, Debug)]
pub struct EyeRelative {
    eye: DVec3,
}

impl EyeRelative {
    pub fn new(eye: DVec3) -> Self {
        Self { eye }
    }

    pub fn eye(&self) -> DVec3 {
        self.eye
    }

    /// A single position relative to the eye, in f32.
    pub fn relative(&self, position: DVec3) -> Vec3 {
        (position - self.eye).as_vec3()
    }

    /// Rewrite a batch of positions relative to the eye into `out`,
    /// clearing it first. Batches reuse the allocation across frames.
    pub fn relative_batch(&self, positions: &[DVec3], out: &mut Vec<Vec3>) {
        out.clear();
        out.reserve(positions.len());
        out.extend(positions.iter().map(|&p| self.relative(p)));
    }

    /// Re-anchor on the camera once it drifts more than `threshold` meters
    /// from the current anchor on any axis, so static geometry batches only
    /// need rewriting when the shift happens. Returns the applied shift
    /// (new anchor minus old), or `None` if no rebase was needed.
    pub fn rebase(&mut self, camera: DVec3, threshold: f64) -> Option<DVec3> {
        let drift = (camera - self.eye).abs();
        if drift.max_element() > threshold {
            let old = self.eye;
            self.eye = camera;
            Some(camera - old)
        } else {
            None
        }
    }

    /// The model-view matrix for eye-relative geometry: the view rotation
    /// with its translation removed, since eye-relative positions already
    /// have the eye at the origin.
    pub fn model_view(&self, view: DMat4) -> Mat4 {
        let mut eye_relative = view;
        eye_relative.w_axis.x = 0.0;
        eye_relative.w_axis.y = 0.0;
        eye_relative.w_axis.z = 0.0;
        eye_relative.as_mat4()
    }
}
