//! Renderable objects and their shared draw state.

pub mod points;

use crate::renderer::PaintContext;
use anyhow::Result;

/// A self-contained renderable.
///
/// Implementations own their GPU resources and create them lazily inside
/// `paint`. The renderer calls `paint` once per visual per frame, inside an
/// open render pass; resources the visual binds must live as long as the
/// pass, which is what the `'a` tie between receiver and pass expresses.
pub trait Visual {
    fn paint<'a>(
        &'a mut self,
        ctx: &PaintContext<'_>,
        rpass: &mut wgpu::RenderPass<'a>,
    ) -> Result<()>;
}

/// Named blend presets a visual selects at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawPreset {
    /// No blending; fragments overwrite the target.
    Opaque,
    /// Standard alpha blending.
    Translucent,
    /// Additive accumulation: overlapping sprites sum up.
    Additive,
}

impl DrawPreset {
    /// Blend state for pipeline creation. None of the presets writes or
    /// tests depth; passes here carry no depth attachment.
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            DrawPreset::Opaque => None,
            DrawPreset::Translucent => Some(wgpu::BlendState::ALPHA_BLENDING),
            DrawPreset::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_disables_blending() {
        assert!(DrawPreset::Opaque.blend_state().is_none());
    }

    #[test]
    fn additive_accumulates_color() {
        let blend = DrawPreset::Additive.blend_state().unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::One);
    }
}
