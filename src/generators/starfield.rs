use anyhow::Result;

use super::{FrameContext, Generator};
use crate::anim::{interpolate, seeded};
use crate::audio::FrequencyFrame;
use crate::render::{Rgb, Surface};

const STAR_COUNT: usize = 200;
const BINS: usize = 16;

struct Star {
    x: f32,
    y: f32,
    size: f32,
    speed: f32,
    base_opacity: f32,
    twinkle_speed: f32,
}

/// Scrolling starfield. Star positions drift with time only; the music
/// drives brightness and size, so quiet passages fade the field out.
pub struct StarField {
    stars: Vec<Star>,
    surface: Surface,
}

impl StarField {
    pub fn new(width: u32, height: u32) -> Self {
        let stars = (0..STAR_COUNT)
            .map(|i| {
                let seed = (i as f32 * 789.12) as u32;
                Star {
                    x: seeded(seed) * width as f32,
                    y: seeded(seed + 1) * height as f32,
                    size: seeded(seed + 2) * 2.0 + 1.0,
                    speed: seeded(seed + 3) * 0.5 + 0.2,
                    base_opacity: seeded(seed + 4) * 0.5 + 0.1,
                    twinkle_speed: seeded(seed + 5) * 0.1 + 0.05,
                }
            })
            .collect();
        Self {
            stars,
            surface: Surface::new(width, height),
        }
    }
}

impl Generator for StarField {
    fn render(
        &mut self,
        ctx: &FrameContext,
        freq: &FrequencyFrame,
        out: &mut [u8],
    ) -> Result<()> {
        let height = ctx.height as f32;
        let intensity = freq.average;

        self.surface.fill(Rgb::BLACK);

        for star in &self.stars {
            let y = (star.y + ctx.frame as f32 * star.speed).rem_euclid(height);

            let twinkle = (ctx.frame as f32 * star.twinkle_speed).sin() * 0.2;
            let audio_boost = interpolate(intensity, (0.0, 0.5), (0.0, 0.8));
            let opacity = (star.base_opacity + twinkle + audio_boost).clamp(0.0, 1.0);
            if opacity < 0.1 {
                continue;
            }

            let scale = 1.0 + intensity * 0.5;
            let radius = star.size * scale;
            self.surface
                .draw_orb(star.x, y, radius * 2.0, Rgb::WHITE, opacity);
        }

        // Faint blue wash rising from the bottom edge.
        let h = self.surface.height;
        let w = self.surface.width;
        let tint = Rgb::new(0.12, 0.16, 0.45);
        for row in 0..h / 3 {
            let y = h - 1 - row;
            let alpha = 0.1 * (1.0 - row as f32 / (h / 3) as f32);
            self.surface.fill_rect(0, y as i32, w, 1, tint, alpha);
        }

        self.surface.copy_to(out);
        Ok(())
    }

    fn bin_count(&self) -> usize {
        BINS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrequencyFrame;

    #[test]
    fn same_frame_renders_identical_pixels() {
        let ctx = FrameContext {
            frame: 42,
            fps: 30,
            width: 64,
            height: 64,
        };
        let freq = FrequencyFrame::zeroed(16);
        let mut out_a = vec![0u8; 64 * 64 * 4];
        let mut out_b = vec![0u8; 64 * 64 * 4];

        StarField::new(64, 64).render(&ctx, &freq, &mut out_a).unwrap();
        StarField::new(64, 64).render(&ctx, &freq, &mut out_b).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn loud_frames_are_brighter_than_silent_ones() {
        let ctx = FrameContext {
            frame: 10,
            fps: 30,
            width: 64,
            height: 64,
        };
        let quiet = FrequencyFrame::zeroed(16);
        let mut loud = FrequencyFrame::zeroed(16);
        loud.average = 1.0;

        let mut a = vec![0u8; 64 * 64 * 4];
        let mut b = vec![0u8; 64 * 64 * 4];
        StarField::new(64, 64).render(&ctx, &quiet, &mut a).unwrap();
        StarField::new(64, 64).render(&ctx, &loud, &mut b).unwrap();

        let sum = |px: &[u8]| px.iter().map(|&v| v as u64).sum::<u64>();
        assert!(sum(&b) > sum(&a));
    }
}
