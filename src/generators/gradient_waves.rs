use anyhow::Result;

use super::{FrameContext, Generator};
use crate::audio::FrequencyFrame;
use crate::render::{Rgb, Surface};

const BINS: usize = 16;

const INDIGO: Rgb = Rgb {
    r: 0.31,
    g: 0.275,
    b: 0.898,
};
const PINK: Rgb = Rgb {
    r: 0.925,
    g: 0.282,
    b: 0.6,
};

/// Three soft indigo-to-pink blobs slowly orbiting the lower half of the
/// frame. Lows grow the blobs slightly, highs lift their opacity.
pub struct GradientWaves {
    surface: Option<Surface>,
}

impl GradientWaves {
    pub fn new() -> Self {
        Self { surface: None }
    }
}

impl Generator for GradientWaves {
    fn render(
        &mut self,
        ctx: &FrameContext,
        freq: &FrequencyFrame,
        out: &mut [u8],
    ) -> Result<()> {
        let surface = self
            .surface
            .get_or_insert_with(|| Surface::new(ctx.width, ctx.height));

        let w = ctx.width as f32;
        let h = ctx.height as f32;
        let t = ctx.time();

        let low = freq.band(0..5);
        let high = freq.band(10..BINS);

        surface.fill(Rgb::new(0.059, 0.09, 0.165));

        for i in 0..3 {
            let scale = 1.0 + low * 0.15;
            let angle = (t * (4.0 + i as f32 * 2.0)).to_radians();
            let opacity = 0.2 + high * 0.1;

            let cx = w / 2.0 + (t * 0.5 + i as f32).sin() * 30.0;
            let cy = h / 2.0 + i as f32 * 100.0 + (t * 0.5 + i as f32).cos() * 30.0;
            let radius = w * 0.9 * scale;

            // Two offset glows along the rotated gradient axis stand in for
            // a linear indigo-to-pink sweep.
            let gradient_angle = (45.0 + i as f32 * 60.0_f32).to_radians() + angle;
            let offset = radius * 0.4;
            let dx = gradient_angle.cos() * offset;
            let dy = gradient_angle.sin() * offset;

            surface.draw_orb(cx - dx, cy - dy, radius, INDIGO, opacity);
            surface.draw_orb(cx + dx, cy + dy, radius, PINK, opacity);
        }

        surface.vignette(0.6);
        surface.copy_to(out);
        Ok(())
    }

    fn bin_count(&self) -> usize {
        BINS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highs_lift_brightness() {
        let ctx = FrameContext {
            frame: 20,
            fps: 30,
            width: 48,
            height: 48,
        };
        let quiet = FrequencyFrame::zeroed(16);
        let mut bright = FrequencyFrame::zeroed(16);
        for m in bright.magnitudes[10..].iter_mut() {
            *m = 1.0;
        }
        bright.treble_level = 1.0;

        let mut a = vec![0u8; 48 * 48 * 4];
        let mut b = vec![0u8; 48 * 48 * 4];
        GradientWaves::new().render(&ctx, &quiet, &mut a).unwrap();
        GradientWaves::new().render(&ctx, &bright, &mut b).unwrap();

        let sum = |px: &[u8]| px.iter().map(|&v| v as u64).sum::<u64>();
        assert!(sum(&b) > sum(&a));
    }
}
