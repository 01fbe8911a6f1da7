//! Deterministic animation primitives.
//!
//! Everything here is a pure function of frame-derived time, so rendering
//! frame N in isolation produces the same values as rendering frames 0..N
//! in sequence. That property is what makes seeking and looping safe.

/// Linear interpolation between `(x0, y0)` and `(x1, y1)`, clamped on both
/// ends: the result never leaves the `[y0, y1]` pair for any input.
pub fn interpolate(x: f32, input: (f32, f32), output: (f32, f32)) -> f32 {
    let (x0, x1) = input;
    let (y0, y1) = output;
    if x1 - x0 <= f32::EPSILON {
        return if x < x1 { y0 } else { y1 };
    }
    let t = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
    y0 + (y1 - y0) * t
}

#[derive(Clone, Copy, Debug)]
pub struct SpringConfig {
    pub damping: f32,
    pub stiffness: f32,
    pub mass: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            damping: 10.0,
            stiffness: 100.0,
            mass: 1.0,
        }
    }
}

/// Damped-spring 0 -> 1 progress curve. Underdamped configurations
/// overshoot past 1 before settling, which is what gives entrance
/// animations their pop.
///
/// The natural settle duration is measured once at construction so that
/// `value` can be time-scaled to an arbitrary `duration_in_frames`.
#[derive(Clone, Debug)]
pub struct Spring {
    config: SpringConfig,
    fps: u32,
    natural_frames: f32,
}

const SETTLE_THRESHOLD: f32 = 0.005;
const SUBSTEPS: u32 = 4;

impl Spring {
    pub fn new(config: SpringConfig, fps: u32) -> Self {
        let mut spring = Self {
            config,
            fps,
            natural_frames: 0.0,
        };
        spring.natural_frames = spring.measure_natural_frames();
        spring
    }

    /// Spring position after `local_frame` frames, starting from rest at 0.
    /// Negative frames (the element has not started animating yet) are 0.
    /// With `duration_in_frames` the curve is time-scaled so it settles at
    /// that frame count instead of its natural duration.
    pub fn value(&self, local_frame: f32, duration_in_frames: Option<f32>) -> f32 {
        if local_frame <= 0.0 {
            return 0.0;
        }
        let frame = match duration_in_frames {
            Some(d) if d > 0.0 => local_frame * self.natural_frames / d,
            _ => local_frame,
        };
        self.simulate(frame)
    }

    fn simulate(&self, frames: f32) -> f32 {
        let dt = 1.0 / (self.fps as f32 * SUBSTEPS as f32);
        let steps = (frames * SUBSTEPS as f32).ceil() as u32;
        let mut x = 0.0f32;
        let mut v = 0.0f32;
        for _ in 0..steps {
            let accel =
                (-self.config.stiffness * (x - 1.0) - self.config.damping * v) / self.config.mass;
            v += accel * dt;
            x += v * dt;
        }
        x
    }

    fn measure_natural_frames(&self) -> f32 {
        let dt = 1.0 / (self.fps as f32 * SUBSTEPS as f32);
        let cap = self.fps * 20 * SUBSTEPS;
        let mut x = 0.0f32;
        let mut v = 0.0f32;
        for step in 0..cap {
            let accel =
                (-self.config.stiffness * (x - 1.0) - self.config.damping * v) / self.config.mass;
            v += accel * dt;
            x += v * dt;
            if (x - 1.0).abs() < SETTLE_THRESHOLD && v.abs() < SETTLE_THRESHOLD {
                return (step + 1) as f32 / SUBSTEPS as f32;
            }
        }
        cap as f32 / SUBSTEPS as f32
    }
}

/// Watches the frame-derived timestamps a generator is asked to render and
/// flags time reversals (loop points, backward seeks). Stateful generators
/// reset their continuity state when `observe` returns true instead of
/// integrating across the discontinuity.
#[derive(Debug, Default)]
pub struct Continuity {
    last: Option<f32>,
}

impl Continuity {
    /// Record `time` and report whether it moved backwards.
    pub fn observe(&mut self, time: f32) -> bool {
        let reversed = self.last.is_some_and(|last| time < last);
        self.last = Some(time);
        reversed
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

/// Deterministic hash random in [0, 1). The same seed always yields the same
/// value, which is how procedural generators get stable per-element base
/// positions without storing them.
pub fn seeded(seed: u32) -> f32 {
    let mut z = seed.wrapping_add(0x9E37_79B9);
    z = (z ^ (z >> 16)).wrapping_mul(0x21F0_AAAD);
    z = (z ^ (z >> 15)).wrapping_mul(0x735A_2D97);
    z ^= z >> 15;
    (z >> 8) as f32 / (1u32 << 24) as f32
}
