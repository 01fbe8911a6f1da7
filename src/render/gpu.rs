use anyhow::{Context, Result};
use wgpu;

/// Headless wgpu device and queue for offscreen background rendering.
/// Prefers a hardware adapter and falls back to a software rasterizer when
/// none is available.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = match Self::request_adapter(&instance, false).await {
            Some(adapter) => adapter,
            None => {
                log::warn!("No hardware GPU adapter found, trying a software fallback");
                Self::request_adapter(&instance, true)
                    .await
                    .context("No GPU adapter available, hardware or software")?
            }
        };

        let info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", info.name, info.backend);
        if info.device_type == wgpu::DeviceType::Cpu {
            log::warn!("Rendering on a CPU adapter, expect slow frame times");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("viben_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        Ok(Self { device, queue })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        force_fallback: bool,
    ) -> Option<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: force_fallback,
            })
            .await
    }
}
