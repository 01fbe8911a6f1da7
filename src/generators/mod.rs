pub mod atmosphere;
pub mod gradient_waves;
pub mod neon_pulse;
pub mod shader;
pub mod starfield;
pub mod visual_music;

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;

use crate::audio::FrequencyFrame;

/// Everything a generator needs to know about the frame being drawn.
/// Frame index is the sole time source, so re-rendering a frame is
/// reproducible.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub frame: u64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameContext {
    pub fn time(&self) -> f32 {
        self.frame as f32 / self.fps as f32
    }
}

/// A background visual. `render` fills `out` (RGBA8, row-major) for one
/// frame. Stateful generators may carry smoothing or particle state across
/// consecutive frames.
pub trait Generator {
    fn render(
        &mut self,
        ctx: &FrameContext,
        freq: &FrequencyFrame,
        out: &mut [u8],
    ) -> Result<()>;

    /// How many spectrum bins this generator wants per frame.
    fn bin_count(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundKind {
    /// Drifting radial glows with floating dust particles.
    Aurora,
    /// Expanding neon rings over a perspective grid.
    NeonPulse,
    /// Scrolling stars that brighten with the music.
    StarField,
    /// Slowly rotating blurred gradient blobs.
    GradientWaves,
    /// Warped dark noise with scanlines (GPU).
    DarkVeil,
    /// Noise-driven aurora ribbon (GPU).
    AuroraShader,
    /// Ring of rainbow spectrum dots (GPU).
    CircularAudio,
    /// Glowing particles that snap to the beat.
    VisualMusic,
}

pub fn create(kind: BackgroundKind, width: u32, height: u32) -> Result<Box<dyn Generator>> {
    Ok(match kind {
        BackgroundKind::Aurora => Box::new(atmosphere::Atmosphere::new()),
        BackgroundKind::NeonPulse => Box::new(neon_pulse::NeonPulse::new()),
        BackgroundKind::StarField => Box::new(starfield::StarField::new(width, height)),
        BackgroundKind::GradientWaves => Box::new(gradient_waves::GradientWaves::new()),
        BackgroundKind::DarkVeil => Box::new(shader::ShaderBackground::dark_veil(width, height)?),
        BackgroundKind::AuroraShader => Box::new(shader::ShaderBackground::aurora(width, height)?),
        BackgroundKind::CircularAudio => {
            Box::new(shader::ShaderBackground::circular(width, height)?)
        }
        BackgroundKind::VisualMusic => Box::new(visual_music::VisualMusic::new(width, height)),
    })
}
