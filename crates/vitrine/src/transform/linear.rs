use super::{wgsl_f32, Transform};
use crate::shader::Snippet;
use glam::{Mat4, Vec3, Vec4};

/// The identity transform.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTransform;

impl Transform for NullTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        p
    }

    fn imap(&self, p: Vec3) -> Vec3 {
        p
    }

    fn shader_map(&self) -> Snippet {
        Snippet::new("fn $name(pos: vec4<f32>) -> vec4<f32> { return pos; }")
    }
}

/// Per-axis scale followed by translation: `p * scale + translate`.
#[derive(Clone, Copy, Debug)]
pub struct STTransform {
    pub scale: Vec3,
    pub translate: Vec3,
}

impl STTransform {
    pub fn new(scale: Vec3, translate: Vec3) -> Self {
        Self { scale, translate }
    }
}

impl Default for STTransform {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            translate: Vec3::ZERO,
        }
    }
}

impl Transform for STTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.translate
    }

    /// Inverse mapping; a zero scale component yields non-finite output.
    fn imap(&self, p: Vec3) -> Vec3 {
        (p - self.translate) / self.scale
    }

    fn shader_map(&self) -> Snippet {
        let s = self.scale;
        let t = self.translate;
        Snippet::new(format!(
            "fn $name(pos: vec4<f32>) -> vec4<f32> {{\n    \
                 let scale = vec3<f32>({}, {}, {});\n    \
                 let translate = vec3<f32>({}, {}, {});\n    \
                 return vec4<f32>(pos.xyz * scale + translate * pos.w, pos.w);\n\
             }}",
            wgsl_f32(s.x),
            wgsl_f32(s.y),
            wgsl_f32(s.z),
            wgsl_f32(t.x),
            wgsl_f32(t.y),
            wgsl_f32(t.z),
        ))
    }
}

/// General homogeneous 4x4 transform.
#[derive(Clone, Copy, Debug)]
pub struct AffineTransform {
    pub matrix: Mat4,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }

    pub fn from_mat4(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// Maps the data box `[l, r] x [b, t] x [n, f]` onto the clip volume:
    /// x and y to `[-1, 1]`, z to `[0, 1]`. Degenerate extents yield
    /// non-finite coefficients, so pad them away before fitting.
    pub fn ortho(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Self {
        let matrix = Mat4::from_cols(
            Vec4::new(2.0 / (r - l), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / (t - b), 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0 / (f - n), 0.0),
            Vec4::new(
                -(r + l) / (r - l),
                -(t + b) / (t - b),
                -n / (f - n),
                1.0,
            ),
        );
        Self { matrix }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform for AffineTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        homogeneous(self.matrix * p.extend(1.0))
    }

    /// Inverse mapping; a singular matrix yields non-finite output.
    fn imap(&self, p: Vec3) -> Vec3 {
        homogeneous(self.matrix.inverse() * p.extend(1.0))
    }

    fn shader_map(&self) -> Snippet {
        let col = |c: Vec4| {
            format!(
                "vec4<f32>({}, {}, {}, {})",
                wgsl_f32(c.x),
                wgsl_f32(c.y),
                wgsl_f32(c.z),
                wgsl_f32(c.w)
            )
        };
        Snippet::new(format!(
            "fn $name(pos: vec4<f32>) -> vec4<f32> {{\n    \
                 let m = mat4x4<f32>(\n        {},\n        {},\n        {},\n        {});\n    \
                 return m * pos;\n\
             }}",
            col(self.matrix.col(0)),
            col(self.matrix.col(1)),
            col(self.matrix.col(2)),
            col(self.matrix.col(3)),
        ))
    }
}

#[inline]
fn homogeneous(h: Vec4) -> Vec3 {
    if h.w.abs() > f32::EPSILON {
        h.truncate() / h.w
    } else {
        h.truncate()
    }
}
