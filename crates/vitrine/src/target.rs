//! Offscreen color targets for headless rendering.

/// An offscreen RGBA8 (sRGB) color target that render passes draw into and
/// [`Renderer::snapshot`](crate::Renderer::snapshot) copies out of.
pub struct RenderTarget {
    // Kept alive for the lifetime of the view.
    texture: wgpu::Texture,

    /// View used as the pass color attachment.
    pub view: wgpu::TextureView,
    /// Format required by pipeline creation.
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        // Ensure non-zero dimensions.
        let width = width.max(1);
        let height = height.max(1);
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Snapshot Color Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            texture,
            format,
            width,
            height,
        }
    }

    /// Recreates the target at a new size; keeps the old one when the size
    /// does not change.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width.max(1) != self.width || height.max(1) != self.height {
            *self = Self::new(device, width, height);
        }
    }

    /// Viewport size in physical pixels, the way shaders consume it.
    pub fn viewport_px(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    pub(crate) fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GpuContext;

    fn try_device() -> Option<wgpu::Device> {
        match pollster::block_on(GpuContext::new()) {
            Ok(gfx) => Some(gfx.device),
            Err(err) => {
                eprintln!("skipping GPU test: {err:#}");
                None
            }
        }
    }

    #[test]
    fn zero_dimensions_are_clamped_to_one_pixel() {
        let Some(device) = try_device() else { return };
        let target = RenderTarget::new(&device, 0, 0);
        assert_eq!((target.width, target.height), (1, 1));
        assert_eq!(target.viewport_px(), [1.0, 1.0]);
    }

    #[test]
    fn resize_tracks_the_requested_size() {
        let Some(device) = try_device() else { return };
        let mut target = RenderTarget::new(&device, 4, 4);
        target.resize(&device, 10, 6);
        assert_eq!((target.width, target.height), (10, 6));
        target.resize(&device, 10, 6);
        assert_eq!((target.width, target.height), (10, 6));
        assert_eq!(target.format, wgpu::TextureFormat::Rgba8UnormSrgb);
    }

    #[test]
    fn same_size_resize_keeps_the_underlying_texture() {
        let Some(device) = try_device() else { return };
        let mut target = RenderTarget::new(&device, 8, 8);
        let texture_id = target.texture().global_id();
        let view_id = target.view.global_id();

        target.resize(&device, 8, 8);
        assert_eq!(target.texture().global_id(), texture_id);
        assert_eq!(target.view.global_id(), view_id);

        target.resize(&device, 8, 9);
        assert_ne!(target.texture().global_id(), texture_id);
        assert_ne!(target.view.global_id(), view_id);
    }
}
