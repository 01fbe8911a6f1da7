use anyhow::Result;

use super::{FrameContext, Generator};
use crate::anim::Continuity;
use crate::audio::FrequencyFrame;
use crate::render::{parse_hex_color, Rgb, Surface};

const BINS: usize = 256;
const PARTICLE_COUNT: usize = 40;
const INTENSITY: f32 = 1.5;
const TRAIL: f32 = 0.1;
const ORB_SIZE: f32 = 25.0;
const BLUR_STRENGTH: f32 = 15.0;
const REPULSION_STRENGTH: f32 = 0.05;
const DAMPING: f32 = 0.99;
const MAX_SPEED: f32 = 1.5;
const WRAP_MARGIN: f32 = 50.0;

const RNG_SEED: u64 = 0x5eed_0bee;

/// Neon palette tuned for a black background.
const PALETTE: [&str; 11] = [
    "#FF0055", "#00FFEA", "#FFD500", "#B8FF01", "#8B00FF", "#FF3800", "#0066FF", "#FF00CC",
    "#00FF00", "#00B3FF", "#FFFFFF",
];

struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    color: Rgb,
    size: f32,
    target_size: f32,
    opacity: f32,
}

/// Drifting glow orbs, one per slice of the spectrum. A loud bin snaps its
/// orb large instantly, then the orb decays slowly. Particles repel each
/// other and wrap around the screen edges.
///
/// All randomness comes from a fixed-seed generator that is reseeded
/// whenever playback time jumps backwards, so rendering the same frame
/// sequence twice produces identical pixels.
pub struct VisualMusic {
    surface: Surface,
    particles: Vec<Particle>,
    rng: fastrand::Rng,
    continuity: Continuity,
    initialized: bool,
}

impl VisualMusic {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Surface::new(width, height),
            particles: Vec::new(),
            rng: fastrand::Rng::with_seed(RNG_SEED),
            continuity: Continuity::default(),
            initialized: false,
        }
    }

    fn reset(&mut self) {
        self.rng = fastrand::Rng::with_seed(RNG_SEED);
        self.particles.clear();
        self.initialized = false;
        self.surface.fill(Rgb::BLACK);
    }

    fn init_particles(&mut self) {
        let w = self.surface.width as f32;
        let h = self.surface.height as f32;

        // Shuffled color pool so nearby particles rarely share a color.
        let mut indices: Vec<usize> = (0..PALETTE.len()).collect();
        self.rng.shuffle(&mut indices);

        self.particles = (0..PARTICLE_COUNT)
            .map(|i| {
                let hex = PALETTE[indices[i % indices.len()]];
                let color = parse_hex_color(hex).unwrap_or(Rgb::WHITE);
                Particle {
                    x: self.rng.f32() * w,
                    y: self.rng.f32() * h,
                    vx: (self.rng.f32() - 0.5) * 0.5,
                    vy: (self.rng.f32() - 0.5) * 0.5,
                    color,
                    size: 0.0,
                    target_size: 0.0,
                    opacity: self.rng.f32() * 0.5 + 0.1,
                }
            })
            .collect();
        self.initialized = true;
    }

    fn step(&mut self, freq: &FrequencyFrame) {
        let w = self.surface.width as f32;
        let h = self.surface.height as f32;
        let bin_step = freq.magnitudes.len() / self.particles.len().max(1);

        // Positions snapshot for the pairwise repulsion pass.
        let positions: Vec<(f32, f32)> = self.particles.iter().map(|p| (p.x, p.y)).collect();
        let repulsion_radius = ORB_SIZE.max(50.0) * 1.2;

        for (i, p) in self.particles.iter_mut().enumerate() {
            // Mean level of this particle's slice of the spectrum, scaled to
            // the 0..255 range the animation constants are tuned for.
            let mut sum = 0.0;
            for j in 0..bin_step {
                let raw = freq.magnitudes.get(i * bin_step + j).copied().unwrap_or(0.0);
                sum += (raw * 255.0 * INTENSITY).min(255.0);
            }
            let raw_v = if bin_step > 0 { sum / bin_step as f32 } else { 0.0 };
            let v = raw_v * 1.2;

            // Snap loud, decay slow.
            if p.target_size < v {
                p.target_size = v;
            } else {
                p.target_size -= 0.5;
            }
            p.size += (p.target_size - p.size) * 0.05;

            let target_opacity = (v / 255.0) * 0.8 + 0.2;
            p.opacity += (target_opacity - p.opacity) * 0.1;

            // Wander
            p.vx += (self.rng.f32() - 0.5) * 0.05;
            p.vy += (self.rng.f32() - 0.5) * 0.05;

            // Repulsion
            for (j, &(ox, oy)) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let dx = p.x - ox;
                let dy = p.y - oy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < repulsion_radius && dist > 0.0 {
                    let force = (repulsion_radius - dist) / repulsion_radius;
                    p.vx += (dx / dist) * force * REPULSION_STRENGTH;
                    p.vy += (dy / dist) * force * REPULSION_STRENGTH;
                }
            }

            p.vx *= DAMPING;
            p.vy *= DAMPING;
            let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
            if speed > MAX_SPEED {
                p.vx = p.vx / speed * MAX_SPEED;
                p.vy = p.vy / speed * MAX_SPEED;
            }

            p.x += p.vx;
            p.y += p.vy;

            // Toroidal wrap with a buffer so orbs fully leave before
            // reappearing.
            if p.x < -WRAP_MARGIN {
                p.x = w + WRAP_MARGIN;
            }
            if p.x > w + WRAP_MARGIN {
                p.x = -WRAP_MARGIN;
            }
            if p.y < -WRAP_MARGIN {
                p.y = h + WRAP_MARGIN;
            }
            if p.y > h + WRAP_MARGIN {
                p.y = -WRAP_MARGIN;
            }
        }
    }

    fn draw(&mut self) {
        for p in &self.particles {
            let alpha = p.opacity.clamp(0.0, 1.0);
            let base_radius = (ORB_SIZE + p.size).max(8.0);
            let outer_radius = base_radius + BLUR_STRENGTH;
            self.surface
                .draw_orb(p.x, p.y, outer_radius, p.color, alpha);
        }
    }

    #[cfg(test)]
    fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

impl Generator for VisualMusic {
    fn render(
        &mut self,
        ctx: &FrameContext,
        freq: &FrequencyFrame,
        out: &mut [u8],
    ) -> Result<()> {
        if self.continuity.observe(ctx.time()) {
            self.reset();
        }

        if !self.initialized {
            self.init_particles();
        }

        // Dim instead of clear: a fraction of the previous frame lingers as
        // a motion trail.
        self.surface.dim(TRAIL);

        self.step(freq);
        self.draw();
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

    fn ctx(frame: u64) -> FrameContext {
        FrameContext {
            frame,
            fps: 30,
            width: 64,
            height: 64,
        }
    }

    fn loud_frame() -> FrequencyFrame {
        let mut f = FrequencyFrame::zeroed(256);
        f.magnitudes.iter_mut().for_each(|m| *m = 0.9);
        f
    }

    #[test]
    fn sequence_replays_identically() {
        let freq = loud_frame();
        let mut out_a = vec![0u8; 64 * 64 * 4];
        let mut out_b = vec![0u8; 64 * 64 * 4];

        let mut gen_a = VisualMusic::new(64, 64);
        let mut gen_b = VisualMusic::new(64, 64);
        for f in 0..20 {
            gen_a.render(&ctx(f), &freq, &mut out_a).unwrap();
            gen_b.render(&ctx(f), &freq, &mut out_b).unwrap();
        }
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn time_reversal_resets_state() {
        let freq = loud_frame();
        let mut out = vec![0u8; 64 * 64 * 4];

        let mut replay = VisualMusic::new(64, 64);
        for f in 0..10 {
            replay.render(&ctx(f), &freq, &mut out).unwrap();
        }
        let pos_after_replay: Vec<(f32, f32)> =
            replay.particles().iter().map(|p| (p.x, p.y)).collect();

        // Jump backwards: frame 50, then frame 0 again.
        let mut looped = VisualMusic::new(64, 64);
        for f in 0..50 {
            looped.render(&ctx(f), &freq, &mut out).unwrap();
        }
        for f in 0..10 {
            looped.render(&ctx(f), &freq, &mut out).unwrap();
        }
        let pos_after_loop: Vec<(f32, f32)> =
            looped.particles().iter().map(|p| (p.x, p.y)).collect();

        assert_eq!(pos_after_replay, pos_after_loop);
    }

    #[test]
    fn loud_bins_snap_size_up_and_decay_slowly() {
        let mut gen = VisualMusic::new(64, 64);
        let mut out = vec![0u8; 64 * 64 * 4];

        gen.render(&ctx(0), &loud_frame(), &mut out).unwrap();
        let peak = gen.particles()[0].target_size;
        assert!(peak > 100.0);

        // Silence: target decays 0.5 per frame, not instantly.
        let silent = FrequencyFrame::zeroed(256);
        gen.render(&ctx(1), &silent, &mut out).unwrap();
        let after_one = gen.particles()[0].target_size;
        assert!((peak - after_one - 0.5).abs() < 1e-3);
    }

    #[test]
    fn speed_stays_bounded() {
        let mut gen = VisualMusic::new(64, 64);
        let mut out = vec![0u8; 64 * 64 * 4];
        let freq = loud_frame();
        for f in 0..120 {
            gen.render(&ctx(f), &freq, &mut out).unwrap();
        }
        for p in gen.particles() {
            let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
            assert!(speed <= MAX_SPEED + 1e-4);
        }
    }

    #[test]
    fn particles_stay_within_wrap_margin() {
        let mut gen = VisualMusic::new(64, 64);
        let mut out = vec![0u8; 64 * 64 * 4];
        let freq = loud_frame();
        for f in 0..240 {
            gen.render(&ctx(f), &freq, &mut out).unwrap();
        }
        for p in gen.particles() {
            assert!(p.x >= -WRAP_MARGIN - 1.0 && p.x <= 64.0 + WRAP_MARGIN + 1.0);
            assert!(p.y >= -WRAP_MARGIN - 1.0 && p.y <= 64.0 + WRAP_MARGIN + 1.0);
        }
    }
}
