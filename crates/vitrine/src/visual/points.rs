//! Anti-aliased circular point sprites.

use anyhow::{Context as _, Result};
use wgpu::util::DeviceExt;

use super::{DrawPreset, Visual};
use crate::renderer::PaintContext;
use crate::shader::Composer;
use crate::transform::{AffineTransform, Transform};

/// Per-draw uniforms. Must match `PointUniforms` in the WGSL below.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PointUniforms {
    /// Viewport size in physical pixels.
    viewport_px: [f32; 2],
    /// Sprite diameter in pixels.
    point_size_px: f32,
    _pad0: f32,
    /// Straight-alpha RGBA.
    color: [f32; 4],
}

// Compile-time safety check: buffer size must match WGSL-reflected size.
const _: [(); 32] = [(); core::mem::size_of::<PointUniforms>()];

/// Shader program and fixed buffers, created on first paint.
struct ProgramState {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    quad_vb: wgpu::Buffer,
    format: wgpu::TextureFormat,
}

/// Instance buffer mirroring the current point set.
struct InstanceBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

/// Renders a point set as screen-aligned circular sprites with a radial
/// alpha falloff.
///
/// The visual is lazy: the program and buffers are created by the first
/// paint that has data to draw, then reused frame after frame. Painting with
/// no positions set, or with an empty set, touches nothing on the GPU.
/// Setters invalidate exactly the cached state they affect: new positions
/// drop the instance buffer, a new transform or preset drops the program
/// (the generated shader embeds the transform; the pipeline embeds the
/// blend state), while color and size are plain uniforms.
pub struct PointsVisual {
    positions: Option<Vec<[f32; 3]>>,
    transform: Box<dyn Transform>,
    preset: DrawPreset,
    color: [f32; 4],
    point_size_px: f32,

    program: Option<ProgramState>,
    vbo: Option<InstanceBuffer>,
}

impl PointsVisual {
    pub fn new() -> Self {
        Self {
            positions: None,
            transform: Box::new(AffineTransform::identity()),
            preset: DrawPreset::Additive,
            color: [1.0, 0.5, 0.0, 0.8],
            point_size_px: 10.0,
            program: None,
            vbo: None,
        }
    }

    /// Replaces the point set; the instance buffer is rebuilt on next paint.
    pub fn set_positions(&mut self, positions: Vec<[f32; 3]>) {
        self.positions = Some(positions);
        self.vbo = None;
    }

    /// Drops the point set; subsequent paints draw nothing.
    pub fn clear_positions(&mut self) {
        self.positions = None;
        self.vbo = None;
    }

    /// Replaces the local-to-NDC transform; the program is regenerated on
    /// next paint.
    pub fn set_transform(&mut self, transform: Box<dyn Transform>) {
        self.transform = transform;
        self.program = None;
    }

    /// Selects the blend preset; the pipeline is rebuilt on next paint.
    pub fn set_preset(&mut self, preset: DrawPreset) {
        if self.preset != preset {
            self.preset = preset;
            self.program = None;
        }
    }

    /// Sprite color (straight alpha). Effective on the next paint.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Sprite diameter in pixels. Effective on the next paint.
    pub fn set_point_size(&mut self, size_px: f32) {
        self.point_size_px = size_px.max(0.0);
    }

    pub fn positions(&self) -> Option<&[[f32; 3]]> {
        self.positions.as_deref()
    }

    pub fn transform(&self) -> &dyn Transform {
        self.transform.as_ref()
    }

    fn ensure_program(&mut self, ctx: &PaintContext<'_>) -> Result<()> {
        // A pipeline is only valid against the format it was created for.
        if self
            .program
            .as_ref()
            .is_some_and(|p| p.format != ctx.target_format)
        {
            self.program = None;
        }
        if self.program.is_some() {
            return Ok(());
        }

        let wgsl = Composer::new(POINTS_VERT_WGSL, POINTS_FRAG_WGSL)
            .hook("map_local_to_nd", self.transform.shader_map())
            .compose()
            .context("composing the point sprite shader")?;
        log::debug!("composed point sprite shader ({} bytes)", wgsl.len());

        let device = ctx.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Points WGSL"),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        // Uniform buffer
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Points Uniform Buffer"),
            size: std::mem::size_of::<PointUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Bind group layout
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Points BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Bind group
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Points Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // One quad (two triangles); the corners double as the sprite-local
        // coordinate frame the fragment stage clips against.
        let corners: [[f32; 2]; 6] = [
            [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0],
            [-1.0, -1.0], [1.0, 1.0],  [-1.0, 1.0],
        ];
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Points Quad VB"),
            contents: bytemuck::cast_slice(&corners),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Vertex buffer layouts: quad + per-instance position
        let vbuf_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 0,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x2,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 1,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            },
        ];

        // Pipeline layout
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Render pipeline
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Points Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.target_format,
                    blend: self.preset.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            // Sprites never touch depth; the pass has no depth attachment.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        self.program = Some(ProgramState {
            pipeline,
            bind_group,
            uniform_buffer,
            quad_vb,
            format: ctx.target_format,
        });
        Ok(())
    }

    fn ensure_vbo(&mut self, ctx: &PaintContext<'_>) {
        if self.vbo.is_some() {
            return;
        }
        let Some(positions) = self.positions.as_deref() else {
            return;
        };
        if positions.is_empty() {
            return;
        }
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Points Instance VB"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.vbo = Some(InstanceBuffer {
            buffer,
            count: positions.len() as u32,
        });
    }
}

impl Default for PointsVisual {
    fn default() -> Self {
        Self::new()
    }
}

impl Visual for PointsVisual {
    fn paint<'a>(
        &'a mut self,
        ctx: &PaintContext<'_>,
        rpass: &mut wgpu::RenderPass<'a>,
    ) -> Result<()> {
        // Nothing to draw: stay entirely off the GPU.
        if self.positions.as_deref().map_or(true, |p| p.is_empty()) {
            return Ok(());
        }

        self.ensure_program(ctx)?;
        self.ensure_vbo(ctx);

        let (Some(program), Some(vbo)) = (self.program.as_ref(), self.vbo.as_ref()) else {
            return Ok(());
        };

        let uniforms = PointUniforms {
            viewport_px: ctx.viewport_px,
            point_size_px: self.point_size_px,
            _pad0: 0.0,
            color: self.color,
        };
        ctx.queue
            .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // Issue one instanced draw: 6 quad vertices per point.
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(0, &program.bind_group, &[]);
        rpass.set_vertex_buffer(0, program.quad_vb.slice(..));
        rpass.set_vertex_buffer(1, vbo.buffer.slice(..));
        rpass.draw(0..6, 0..vbo.count);
        Ok(())
    }
}

const POINTS_VERT_WGSL: &str = r#"
struct PointUniforms {
    viewport_px: vec2<f32>,
    point_size_px: f32,
    _pad0: f32,
    color: vec4<f32>,
};
@group(0) @binding(0) var<uniform> U: PointUniforms;

struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) sprite_xy: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) corner: vec2<f32>, @location(1) position: vec3<f32>) -> VSOut {
    var out: VSOut;
    let center = $map_local_to_nd(vec4<f32>(position, 1.0));
    // Offset the quad corner in clip space, scaled by w so the perspective
    // divide leaves the sprite at its pixel size.
    let ofs = corner * U.point_size_px / U.viewport_px * center.w;
    out.clip = vec4<f32>(center.xy + ofs, center.zw);
    out.sprite_xy = corner;
    out.color = U.color;
    return out;
}
"#;

const POINTS_FRAG_WGSL: &str = r#"
@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    // Squared distance from the sprite center; 1.0 on the rim.
    let r2 = dot(in.sprite_xy, in.sprite_xy);
    if (r2 > 1.0) {
        discard;
    }
    return vec4<f32>(in.color.rgb, (1.0 - r2) * in.color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::placeholders;
    use crate::transform::{NullTransform, STTransform};
    use glam::Vec3;

    #[test]
    fn defaults_match_the_classic_orange_sprite() {
        let v = PointsVisual::new();
        assert_eq!(v.color, [1.0, 0.5, 0.0, 0.8]);
        assert_eq!(v.point_size_px, 10.0);
        assert_eq!(v.preset, DrawPreset::Additive);
        assert!(v.positions().is_none());
    }

    #[test]
    fn uniforms_are_one_sixteen_byte_block_pair() {
        assert_eq!(std::mem::size_of::<PointUniforms>(), 32);
    }

    #[test]
    fn templates_expose_exactly_the_transform_hook() {
        let mut hooks = placeholders(POINTS_VERT_WGSL);
        hooks.extend(placeholders(POINTS_FRAG_WGSL));
        assert_eq!(hooks, vec!["map_local_to_nd".to_string()]);
    }

    #[test]
    fn templates_compose_with_a_transform_snippet() {
        let wgsl = Composer::new(POINTS_VERT_WGSL, POINTS_FRAG_WGSL)
            .hook("map_local_to_nd", NullTransform.shader_map())
            .compose()
            .unwrap();
        assert!(wgsl.contains("fn map_local_to_nd(pos: vec4<f32>)"));
        assert!(wgsl.contains("map_local_to_nd(vec4<f32>(position, 1.0))"));
        assert!(!wgsl.contains('$'));
    }

    #[test]
    fn clearing_positions_empties_the_visual() {
        let mut v = PointsVisual::new();
        v.set_positions(vec![[0.0, 0.0, 0.0]]);
        assert_eq!(v.positions().map(|p| p.len()), Some(1));
        v.clear_positions();
        assert!(v.positions().is_none());
    }

    #[test]
    fn transform_setter_swaps_the_mapping() {
        let mut v = PointsVisual::new();
        v.set_transform(Box::new(STTransform::new(Vec3::splat(2.0), Vec3::ZERO)));
        assert_eq!(v.transform().map(Vec3::ONE), Vec3::splat(2.0));
    }

    #[test]
    fn point_size_never_goes_negative() {
        let mut v = PointsVisual::new();
        v.set_point_size(-4.0);
        assert_eq!(v.point_size_px, 0.0);
    }
}
