use super::{wgsl_f32, Transform};
use crate::shader::Snippet;
use glam::Vec3;

/// Per-axis logarithmic transform.
///
/// For axis `i`: a base above 1 maps `x` to `log_base(x)`; a base below -1
/// maps `x` to `(-base)^x`, the inverse of that logarithm; a base in
/// `[-1, 1]` leaves the axis untouched. `imap` is `map` with the bases
/// negated.
#[derive(Clone, Copy, Debug)]
pub struct LogTransform {
    pub base: Vec3,
}

impl LogTransform {
    pub fn new(base: Vec3) -> Self {
        Self { base }
    }

    fn map_with(base: Vec3, p: Vec3) -> Vec3 {
        let axis = |b: f32, x: f32| {
            if b > 1.0 {
                x.ln() / b.ln()
            } else if b < -1.0 {
                (-b).powf(x)
            } else {
                x
            }
        };
        Vec3::new(axis(base.x, p.x), axis(base.y, p.y), axis(base.z, p.z))
    }
}

impl Transform for LogTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        Self::map_with(self.base, p)
    }

    fn imap(&self, p: Vec3) -> Vec3 {
        Self::map_with(-self.base, p)
    }

    fn shader_map(&self) -> Snippet {
        // Scalar mirror of `map`, expanded per axis with the base folded in.
        let axis = |b: f32, x: &str| {
            if b > 1.0 {
                format!("log({x}) / log({})", wgsl_f32(b))
            } else if b < -1.0 {
                format!("pow({}, {x})", wgsl_f32(-b))
            } else {
                x.to_string()
            }
        };
        Snippet::new(format!(
            "fn $name(pos: vec4<f32>) -> vec4<f32> {{\n    \
                 return vec4<f32>({}, {}, {}, pos.w);\n\
             }}",
            axis(self.base.x, "pos.x"),
            axis(self.base.y, "pos.y"),
            axis(self.base.z, "pos.z"),
        ))
    }
}

/// Maps polar `(theta, r, z)` to Cartesian `(r cos theta, r sin theta, z)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolarTransform;

impl Transform for PolarTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        Vec3::new(p.y * p.x.cos(), p.y * p.x.sin(), p.z)
    }

    /// Returns `theta` in `(-pi, pi]` and a non-negative radius.
    fn imap(&self, p: Vec3) -> Vec3 {
        Vec3::new(p.y.atan2(p.x), p.truncate().length(), p.z)
    }

    fn shader_map(&self) -> Snippet {
        Snippet::new(
            "fn $name(pos: vec4<f32>) -> vec4<f32> {\n    \
                 return vec4<f32>(pos.y * cos(pos.x), pos.y * sin(pos.x), pos.z, pos.w);\n\
             }",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, SQRT_2};

    // Tolerance is generous: powf/ln round-trips lose a few ulps at
    // magnitudes in the hundreds.
    fn close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn log_base_ten_maps_powers_to_integers() {
        let t = LogTransform::new(Vec3::new(10.0, 0.0, 0.0));
        close(
            t.map(Vec3::new(1000.0, 5.0, -3.0)),
            Vec3::new(3.0, 5.0, -3.0),
        );
    }

    #[test]
    fn log_imap_inverts_map() {
        let t = LogTransform::new(Vec3::new(10.0, 2.0, 0.0));
        let p = Vec3::new(250.0, 8.0, 1.5);
        close(t.imap(t.map(p)), p);
    }

    #[test]
    fn negative_base_is_exponential() {
        let t = LogTransform::new(Vec3::new(-10.0, 0.0, 0.0));
        close(t.map(Vec3::new(2.0, 1.0, 1.0)), Vec3::new(100.0, 1.0, 1.0));
    }

    #[test]
    fn log_shader_touches_only_logarithmic_axes() {
        let src = LogTransform::new(Vec3::new(0.0, 10.0, 0.0))
            .shader_map()
            .source()
            .to_string();
        assert!(src.contains("pos.x,"));
        assert!(src.contains("log(pos.y) / log(10.0)"));
    }

    #[test]
    fn polar_maps_quarter_turn() {
        let t = PolarTransform;
        close(
            t.map(Vec3::new(FRAC_PI_2, 2.0, 0.5)),
            Vec3::new(0.0, 2.0, 0.5),
        );
        close(t.map(Vec3::new(PI, 1.0, 0.0)), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn polar_imap_recovers_angle_and_radius() {
        let t = PolarTransform;
        let p = Vec3::new(0.8, 1.75, -0.25);
        close(t.imap(t.map(p)), p);
    }

    #[test]
    fn polar_imap_picks_the_principal_angle() {
        let t = PolarTransform;
        // The negative x axis sits at the closed end of (-pi, pi].
        close(t.imap(Vec3::new(-2.0, 0.0, 5.0)), Vec3::new(PI, 2.0, 5.0));
        close(
            t.imap(Vec3::new(0.0, -3.0, 1.0)),
            Vec3::new(-FRAC_PI_2, 3.0, 1.0),
        );
        close(
            t.imap(Vec3::new(-1.0, -1.0, 0.0)),
            Vec3::new(-3.0 * FRAC_PI_4, SQRT_2, 0.0),
        );
    }
}
