use anyhow::{anyhow, Result};

/// Holds the GPU resources shared by every target and visual.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquires a headless device: no window, so no surface to be
    /// compatible with.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        // Any high-performance adapter will do; fall back is left off so a
        // software rasterizer is only picked when the platform offers
        // nothing else on its own.
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("Failed to find a suitable GPU adapter."))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter \"{}\" ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // Request a device and its command queue.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    // Use default limits for broad compatibility.
                    required_limits: wgpu::Limits::default(),
                },
                None, // no trace
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Human-readable adapter name for logs and banners.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }
}
