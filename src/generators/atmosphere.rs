use anyhow::Result;

use super::{FrameContext, Generator};
use crate::anim::{interpolate, seeded};
use crate::audio::FrequencyFrame;
use crate::render::{hsl_to_rgb, Rgb, Surface};

const BINS: usize = 16;
const DUST_COUNT: usize = 20;

/// Two huge drifting color glows plus floating dust motes. Bass pumps the
/// first glow, the upper bands push the second and scatter the dust.
pub struct Atmosphere {
    surface: Option<Surface>,
}

impl Atmosphere {
    pub fn new() -> Self {
        Self { surface: None }
    }
}

impl Generator for Atmosphere {
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

        let bass = freq.band(0..BINS / 4);
        let mid_high = freq.band(BINS / 4..BINS);

        surface.fill(Rgb::new(0.02, 0.02, 0.02));

        let hue1 = (t * 10.0).rem_euclid(360.0);
        let hue2 = (t * 15.0 + 180.0).rem_euclid(360.0);

        let pulse = interpolate(bass, (0.0, 1.0), (1.0, 1.5));
        surface.draw_orb(
            w * 0.5 + (t * 0.5).sin() * 50.0,
            h * 0.35 + (t * 0.5).cos() * 50.0,
            w * 0.75 * pulse,
            hsl_to_rgb(hue1, 0.8, 0.5),
            0.16,
        );

        let swell = interpolate(mid_high, (0.0, 1.0), (1.0, 1.3));
        surface.draw_orb(
            w * 0.8 + (t * 0.3).cos() * 50.0,
            h * 0.8 + (t * 0.4).sin() * 50.0,
            w * 0.6 * swell,
            hsl_to_rgb(hue2, 0.7, 0.6),
            0.12,
        );

        for i in 0..DUST_COUNT {
            let seed = (i as f32 * 123.45) as u32;
            let x = seeded(seed) * w;
            let y = seeded(seed + 1) * h;
            let size = seeded(seed + 2) * 4.0 + 2.0;
            let speed = seeded(seed + 3) * 0.5 + 0.2;

            let y_pos = (y - t * 50.0 * speed - bass * 100.0).rem_euclid(h + 100.0) - 50.0;
            let x_pos = x + (t + i as f32).sin() * 20.0 * (mid_high + 0.5);

            let opacity = (seeded(seed + 4) * 0.5 + 0.2 + mid_high * 0.5).min(1.0);
            surface.draw_orb(x_pos, y_pos, size * 2.0, Rgb::WHITE, opacity);
        }

        surface.vignette(0.8);
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
    fn render_is_deterministic_per_frame() {
        let ctx = FrameContext {
            frame: 7,
            fps: 30,
            width: 48,
            height: 48,
        };
        let mut freq = FrequencyFrame::zeroed(16);
        freq.magnitudes[0] = 0.7;

        let mut a = vec![0u8; 48 * 48 * 4];
        let mut b = vec![0u8; 48 * 48 * 4];
        Atmosphere::new().render(&ctx, &freq, &mut a).unwrap();
        Atmosphere::new().render(&ctx, &freq, &mut b).unwrap();
        assert_eq!(a, b);
    }
}
