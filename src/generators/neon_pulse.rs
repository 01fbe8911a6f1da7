use anyhow::Result;

use super::{FrameContext, Generator};
use crate::anim::interpolate;
use crate::audio::FrequencyFrame;
use crate::render::{Rgb, Surface};

const BINS: usize = 32;
const RING_COUNT: usize = 5;
const RING_PERIOD: f32 = 4.0;
const RING_BASE_RADIUS: f32 = 150.0;

const MAGENTA: Rgb = Rgb {
    r: 1.0,
    g: 0.0,
    b: 1.0,
};
const CYAN: Rgb = Rgb {
    r: 0.0,
    g: 1.0,
    b: 1.0,
};

/// Synthwave rings expanding from the center over a receding grid. Bass
/// kicks the ring scale.
pub struct NeonPulse {
    surface: Option<Surface>,
}

impl NeonPulse {
    pub fn new() -> Self {
        Self { surface: None }
    }
}

impl Generator for NeonPulse {
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
        let bass = freq.band(0..4);

        surface.fill(Rgb::new(0.066, 0.0, 0.066));

        // Horizon grid, rows compressed toward the horizon line.
        let horizon = h * 0.55;
        let mut y = horizon;
        let mut spacing = 8.0;
        while y < h {
            surface.fill_rect(0, y as i32, ctx.width, 1, MAGENTA, 0.12);
            y += spacing;
            spacing *= 1.22;
        }
        let cols = 12;
        for c in 0..=cols {
            let frac = c as f32 / cols as f32;
            // Verticals fan out from the center of the horizon.
            let x_bottom = frac * w;
            for step in 0..((h - horizon) as i32) {
                let sy = horizon + step as f32;
                let depth = (sy - horizon) / (h - horizon);
                let x = w / 2.0 + (x_bottom - w / 2.0) * depth;
                surface.blend_pixel(x as i32, sy as i32, CYAN, 0.08);
            }
        }

        // Expanding rings.
        let cx = w / 2.0;
        let cy = h / 2.0;
        for i in 0..RING_COUNT {
            let delay = i as f32 * 0.5;
            let phase = (t + delay).rem_euclid(RING_PERIOD);
            let scale = interpolate(phase, (0.0, RING_PERIOD), (0.8, 2.5));
            let opacity = if phase < RING_PERIOD / 2.0 {
                interpolate(phase, (0.0, RING_PERIOD / 2.0), (0.6, 0.3))
            } else {
                interpolate(phase, (RING_PERIOD / 2.0, RING_PERIOD), (0.3, 0.0))
            };

            let radius = RING_BASE_RADIUS * scale * (1.0 + bass * 0.15);
            let color = if i % 2 == 1 { CYAN } else { MAGENTA };
            draw_ring(surface, cx, cy, radius, color, opacity);
        }

        surface.vignette(0.7);
        surface.copy_to(out);
        Ok(())
    }

    fn bin_count(&self) -> usize {
        BINS
    }
}

fn draw_ring(surface: &mut Surface, cx: f32, cy: f32, radius: f32, color: Rgb, opacity: f32) {
    if radius <= 0.0 || opacity <= 0.0 {
        return;
    }
    let steps = (radius * std::f32::consts::TAU).ceil() as usize;
    for s in 0..steps {
        let angle = s as f32 / steps as f32 * std::f32::consts::TAU;
        let x = cx + radius * angle.cos();
        let y = cy + radius * angle.sin();
        surface.screen_pixel(x as i32, y as i32, color, opacity);
        // Soft 1px halo.
        surface.screen_pixel(x as i32 + 1, y as i32, color, opacity * 0.4);
        surface.screen_pixel(x as i32, y as i32 + 1, color, opacity * 0.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_cycle_with_period() {
        let mut freq = FrequencyFrame::zeroed(32);
        freq.magnitudes.iter_mut().for_each(|m| *m = 0.3);

        let mut a = vec![0u8; 32 * 32 * 4];
        let mut b = vec![0u8; 32 * 32 * 4];
        let ctx_a = FrameContext {
            frame: 0,
            fps: 30,
            width: 32,
            height: 32,
        };
        // One full ring period later (4s at 30fps).
        let ctx_b = FrameContext {
            frame: 120,
            fps: 30,
            width: 32,
            height: 32,
        };
        NeonPulse::new().render(&ctx_a, &freq, &mut a).unwrap();
        NeonPulse::new().render(&ctx_b, &freq, &mut b).unwrap();
        // Ring phase repeats every 4s and the grid is static.
        assert_eq!(a, b);
    }

    #[test]
    fn output_has_opaque_alpha() {
        let freq = FrequencyFrame::zeroed(32);
        let ctx = FrameContext {
            frame: 5,
            fps: 30,
            width: 16,
            height: 16,
        };
        let mut out = vec![0u8; 16 * 16 * 4];
        NeonPulse::new().render(&ctx, &freq, &mut out).unwrap();
        assert!(out.chunks_exact(4).all(|px| px[3] == 255));
    }
}
