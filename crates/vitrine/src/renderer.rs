//! Frame orchestration and offscreen capture.

use anyhow::{Context as _, Result};

use crate::context::GpuContext;
use crate::target::RenderTarget;
use crate::visual::Visual;

/// Everything a visual may touch while recording a frame.
pub struct PaintContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Format of the color attachment the pass renders into.
    pub target_format: wgpu::TextureFormat,
    /// Attachment size in physical pixels.
    pub viewport_px: [f32; 2],
}

/// Owns the GPU context and records one render pass per frame.
pub struct Renderer {
    pub gfx: GpuContext,
    pub clear_color: wgpu::Color,
}

impl Renderer {
    pub async fn new() -> Result<Self> {
        let gfx = GpuContext::new().await?;
        Ok(Self {
            gfx,
            clear_color: wgpu::Color::BLACK,
        })
    }

    /// Clears the target and paints the visuals in order.
    ///
    /// Visuals that have nothing to show contribute no GPU work; the clear
    /// still runs, so the frame is always well defined.
    pub fn render(&self, target: &RenderTarget, visuals: &mut [&mut dyn Visual]) -> Result<()> {
        let mut encoder =
            self.gfx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let pctx = PaintContext {
                device: &self.gfx.device,
                queue: &self.gfx.queue,
                target_format: target.format,
                viewport_px: target.viewport_px(),
            };
            for visual in visuals.iter_mut() {
                visual.paint(&pctx, &mut pass)?;
            }
        }
        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Copies the target back to the CPU as tightly packed RGBA8 rows.
    ///
    /// Blocks until the GPU finishes. Rows are staged at the 256-byte
    /// alignment the copy requires, then repacked before returning.
    pub fn snapshot(&self, target: &RenderTarget) -> Result<Vec<u8>> {
        let unpadded_bpr = target.width * 4;
        let padded_bpr = unpadded_bpr.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snapshot Readback Buffer"),
            size: (padded_bpr * target.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.gfx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Snapshot Encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        self.gfx.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.gfx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("readback mapping was dropped without a result")?
            .context("failed to map the readback buffer")?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bpr * target.height) as usize);
        for row in data.chunks(padded_bpr as usize) {
            pixels.extend_from_slice(&row[..unpadded_bpr as usize]);
        }
        drop(data);
        readback.unmap();
        Ok(pixels)
    }
}
