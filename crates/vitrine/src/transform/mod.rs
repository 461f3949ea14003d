//! Coordinate transforms mapping local data coordinates to normalized device
//! coordinates, both on the CPU and as generated WGSL on the GPU.

mod chain;
mod linear;
mod nonlinear;

pub use chain::ChainTransform;
pub use linear::{AffineTransform, NullTransform, STTransform};
pub use nonlinear::{LogTransform, PolarTransform};

use crate::shader::Snippet;
use glam::Vec3;

/// A composable coordinate mapping.
///
/// `map` and `imap` run on the CPU; `shader_map` emits the WGSL function the
/// GPU uses for the same mapping, with the transform's parameters embedded as
/// literals. Replacing a visual's transform therefore means regenerating its
/// shader program.
pub trait Transform {
    /// Forward mapping of one point. Homogeneous transforms divide by `w`
    /// when it is non-negligible.
    fn map(&self, p: Vec3) -> Vec3;

    /// Inverse mapping of one point.
    fn imap(&self, p: Vec3) -> Vec3;

    /// WGSL function `fn $name(pos: vec4<f32>) -> vec4<f32>` matching `map`,
    /// minus any divide by `w` (the hardware does that after the vertex
    /// stage).
    fn shader_map(&self) -> Snippet;
}

/// Formats an `f32` so WGSL parses it as a float: `Display` output gains a
/// trailing `.0` when it has no decimal point. Non-finite values pass
/// through unchanged and will not survive shader validation.
pub(crate) fn wgsl_f32(v: f32) -> String {
    let s = format!("{v}");
    if s.contains('.') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgsl_f32_always_reads_as_float() {
        assert_eq!(wgsl_f32(1.0), "1.0");
        assert_eq!(wgsl_f32(-2.0), "-2.0");
        assert_eq!(wgsl_f32(0.25), "0.25");
        assert_eq!(wgsl_f32(-0.5), "-0.5");
        assert_eq!(wgsl_f32(100.0), "100.0");
    }
}
