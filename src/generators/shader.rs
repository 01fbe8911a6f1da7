use anyhow::Result;
use wgpu::util::DeviceExt;

use super::{FrameContext, Generator};
use crate::anim::Continuity;
use crate::audio::FrequencyFrame;
use crate::render::{GpuContext, OffscreenTarget, ShaderPipeline, ShaderUniforms, TEXTURE_FORMAT};

const AURORA_WGSL: &str = include_str!("../../shaders/aurora.wgsl");
const DARK_VEIL_WGSL: &str = include_str!("../../shaders/dark_veil.wgsl");
const CIRCULAR_WGSL: &str = include_str!("../../shaders/circular.wgsl");

const CIRCULAR_DOTS: usize = 40;
const CIRCULAR_SOURCE_BINS: usize = 256;
const CIRCULAR_SMOOTHING: f32 = 0.35;
const CIRCULAR_EXPONENT: f32 = 0.85;

/// Per-dot temporal smoothing for the circular spectrum. Each dot reads one
/// bin of the full-resolution spectrum by nearest index, so a spike in a
/// single bin lands on a single dot instead of being averaged away. The
/// picked value is shaped with a sub-linear exponent so quiet passages stay
/// visible, then lerped toward the previous frame's value.
struct DotSmoother {
    bins: Vec<f32>,
}

impl DotSmoother {
    fn new(count: usize) -> Self {
        Self {
            bins: vec![0.0; count],
        }
    }

    fn smooth(&mut self, raw: &[f32]) -> &[f32] {
        if raw.is_empty() {
            return &self.bins;
        }
        let dots = self.bins.len();
        for (i, slot) in self.bins.iter_mut().enumerate() {
            let idx = (i * raw.len() / dots).min(raw.len() - 1);
            let shaped = raw[idx].clamp(0.0, 1.0).powf(CIRCULAR_EXPONENT);
            *slot += (shaped - *slot) * CIRCULAR_SMOOTHING;
        }
        &self.bins
    }

    fn reset(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);
    }
}

/// A GPU fullscreen-shader background. Uploads per-frame uniforms and the
/// spectrum, draws a single offscreen pass, reads the pixels back.
pub struct ShaderBackground {
    gpu: GpuContext,
    pipeline: ShaderPipeline,
    target: OffscreenTarget,
    uniform_buffer: wgpu::Buffer,
    spectrum_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    source_bins: usize,
    buffer_bins: usize,
    smoother: Option<DotSmoother>,
    continuity: Continuity,
    width: u32,
    height: u32,
}

impl ShaderBackground {
    pub fn aurora(width: u32, height: u32) -> Result<Self> {
        Self::new(AURORA_WGSL, width, height, 64, None)
    }

    pub fn dark_veil(width: u32, height: u32) -> Result<Self> {
        Self::new(DARK_VEIL_WGSL, width, height, 64, None)
    }

    pub fn circular(width: u32, height: u32) -> Result<Self> {
        Self::new(
            CIRCULAR_WGSL,
            width,
            height,
            CIRCULAR_SOURCE_BINS,
            Some(DotSmoother::new(CIRCULAR_DOTS)),
        )
    }

    fn new(
        shader_source: &str,
        width: u32,
        height: u32,
        source_bins: usize,
        smoother: Option<DotSmoother>,
    ) -> Result<Self> {
        // The smoothed-dot shaders upload one value per dot; the rest
        // upload the analyzer's bins directly.
        let buffer_bins = match &smoother {
            Some(s) => s.bins.len(),
            None => source_bins,
        };
        let gpu = GpuContext::new()?;
        let pipeline = ShaderPipeline::new(&gpu.device, shader_source, TEXTURE_FORMAT)?;
        let target = OffscreenTarget::new(&gpu, width, height);

        let uniform_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shader_uniforms"),
                contents: bytemuck::bytes_of(&ShaderUniforms::new(
                    width,
                    height,
                    0.0,
                    &FrequencyFrame::zeroed(source_bins),
                )),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let spectrum_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("spectrum_bins"),
                contents: bytemuck::cast_slice(&vec![0.0f32; buffer_bins]),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background_bind_group"),
            layout: &pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: spectrum_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            gpu,
            pipeline,
            target,
            uniform_buffer,
            spectrum_buffer,
            bind_group,
            source_bins,
            buffer_bins,
            smoother,
            continuity: Continuity::default(),
            width,
            height,
        })
    }
}

impl Generator for ShaderBackground {
    fn render(
        &mut self,
        ctx: &FrameContext,
        freq: &FrequencyFrame,
        out: &mut [u8],
    ) -> Result<()> {
        let reversed = self.continuity.observe(ctx.time());
        if reversed {
            if let Some(smoother) = self.smoother.as_mut() {
                smoother.reset();
            }
        }

        let uniforms = ShaderUniforms::new(self.width, self.height, ctx.time(), freq);
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        match self.smoother.as_mut() {
            Some(smoother) => {
                let smoothed = smoother.smooth(&freq.magnitudes);
                self.gpu
                    .queue
                    .write_buffer(&self.spectrum_buffer, 0, bytemuck::cast_slice(smoothed));
            }
            None => {
                self.gpu.queue.write_buffer(
                    &self.spectrum_buffer,
                    0,
                    bytemuck::cast_slice(
                        &freq.magnitudes[..freq.magnitudes.len().min(self.buffer_bins)],
                    ),
                );
            }
        }

        self.target
            .render_and_readback(&self.gpu, &self.pipeline.pipeline, &self.bind_group, out)
    }

    fn bin_count(&self) -> usize {
        self.source_bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoother_moves_toward_shaped_value() {
        let mut s = DotSmoother::new(2);
        let out = s.smooth(&[1.0, 0.0]);
        // First step covers SMOOTHING of the distance to the shaped target.
        assert!((out[0] - CIRCULAR_SMOOTHING).abs() < 1e-6);
        assert_eq!(out[1], 0.0);

        let out = s.smooth(&[1.0, 0.0]);
        assert!(out[0] > CIRCULAR_SMOOTHING);
        assert!(out[0] < 1.0);
    }

    #[test]
    fn smoother_reset_zeroes_state() {
        let mut s = DotSmoother::new(3);
        s.smooth(&[0.5, 0.8, 0.2]);
        s.reset();
        assert!(s.bins.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn dots_read_full_resolution_bins_by_nearest_index() {
        let mut s = DotSmoother::new(CIRCULAR_DOTS);
        let mut raw = vec![0.0f32; CIRCULAR_SOURCE_BINS];
        raw[0] = 1.0;

        // Dot 0 maps to bin 0 and sees the full spike; dot 1 maps to bin 6
        // and stays silent. Group-averaging would leak the spike across the
        // first dot's whole bin range instead.
        let out = s.smooth(&raw);
        assert!((out[0] - CIRCULAR_SMOOTHING).abs() < 1e-6);
        assert_eq!(out[1], 0.0);

        let mut s = DotSmoother::new(CIRCULAR_DOTS);
        let mut raw = vec![0.0f32; CIRCULAR_SOURCE_BINS];
        raw[CIRCULAR_SOURCE_BINS / CIRCULAR_DOTS] = 0.5;
        let out = s.smooth(&raw);
        assert_eq!(out[0], 0.0);
        assert!(out[1] > 0.0);
    }

    #[test]
    fn smoother_handles_empty_input() {
        let mut s = DotSmoother::new(4);
        let out = s.smooth(&[]);
        assert!(out.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn shaping_lifts_quiet_bins() {
        // pow(x, 0.85) > x for x in (0, 1).
        let mut s = DotSmoother::new(1);
        let linear = 0.2f32;
        let out = s.smooth(&[linear]);
        assert!(out[0] > linear * CIRCULAR_SMOOTHING);
    }
}
