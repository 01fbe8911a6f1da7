use crate::anim::{interpolate, seeded, Spring, SpringConfig};
use crate::captions::markup::{parse_caption_text, CaptionLine};
use crate::captions::CaptionIndex;
use crate::overlay::text::TextPainter;
use crate::render::{parse_hex_color, Rgb, Surface};

const ENTRANCE_FRAMES: f32 = 30.0;
const LINE_DELAY_FRAMES: u64 = 10;
const CHAR_DELAY_FRAMES: u64 = 3;
const EXIT_FADE_FRAMES: f32 = 10.0;
const FLOAT_RADIUS: f32 = 10.0;
const SHAKE_RADIUS: f32 = 8.0;

/// Draws the active caption as vertical text columns, one word per column,
/// columns flowing right to left. Characters enter with a springy pop,
/// float gently while on screen, and fade out as the cue ends.
pub struct CaptionRenderer {
    font_size: f32,
    spring: Spring,
    /// Parsed markup for the caption currently on screen.
    cache: Option<(usize, Vec<CaptionLine>)>,
}

impl CaptionRenderer {
    pub fn new(font_size: f32, fps: u32) -> Self {
        let spring = Spring::new(
            SpringConfig {
                damping: 12.0,
                stiffness: 200.0,
                mass: 1.0,
            },
            fps,
        );
        Self {
            font_size,
            spring,
            cache: None,
        }
    }

    pub fn draw(
        &mut self,
        surface: &mut Surface,
        painter: &TextPainter,
        index: &CaptionIndex,
        frame: u64,
        fps: u32,
    ) {
        let time_ms = frame * 1000 / fps as u64;
        let Some((caption_idx, caption)) = index.find_at(time_ms) else {
            return;
        };

        if self.cache.as_ref().map(|(i, _)| *i) != Some(caption_idx) {
            self.cache = Some((caption_idx, parse_caption_text(&caption.text)));
        }
        let lines = match self.cache.as_ref() {
            Some((_, lines)) => lines,
            None => return,
        };
        if lines.is_empty() {
            return;
        }

        let start_frame = caption.start_ms as f32 / 1000.0 * fps as f32;
        let end_frame = caption.end_ms as f32 / 1000.0 * fps as f32;
        let time_since_start = frame as f32 - start_frame;
        let exit = exit_opacity(frame as f32, end_frame);

        let cx = surface.width as f32 / 2.0;
        let cy = surface.height as f32 / 2.0;

        // Column layout: rightmost column is the first word.
        let column_spacing = self.font_size * 2.2;
        let total_width = column_spacing * lines.len() as f32;
        let char_step = self.font_size * 1.15;

        for (l, line) in lines.iter().enumerate() {
            let col_x = cx + total_width / 2.0 - column_spacing * (l as f32 + 0.5);

            let char_count: usize = line.segments.iter().map(|s| s.text.chars().count()).sum();
            let column_height = char_step * char_count as f32;
            let mut row = 0usize;

            for (s, segment) in line.segments.iter().enumerate() {
                let color = segment
                    .color()
                    .and_then(parse_hex_color)
                    .unwrap_or(Rgb::WHITE);
                let is_zoom = segment.is_zoom();
                let is_shake = segment.is_shake();

                for (i, ch) in segment.text.chars().enumerate() {
                    let base_y = cy - column_height / 2.0 + char_step * (row as f32 + 0.5);
                    row += 1;

                    let delay = char_delay(l, i);
                    let char_frame = time_since_start - delay as f32;
                    let spr = self.spring.value(char_frame, Some(ENTRANCE_FRAMES));

                    let seed = char_seed(caption_idx, l, s, i);
                    let float_x = (frame as f32 * 0.05 + seed as f32).sin() * FLOAT_RADIUS;
                    let float_y = (frame as f32 * 0.03 + seed as f32).cos() * FLOAT_RADIUS;

                    let opacity = interpolate(spr, (0.0, 1.0), (0.0, 1.0));
                    let base_scale = interpolate(spr, (0.0, 1.0), (2.0, 1.0));
                    let zoom_scale = if is_zoom {
                        interpolate(spr, (0.0, 1.0), (1.0, 1.5))
                    } else {
                        1.0
                    };
                    let scale = base_scale * zoom_scale;

                    // Entrance blur rendered as attenuation: a fully blurred
                    // glyph reads as a faint smudge, so dim instead.
                    let blur = interpolate(spr, (0.0, 1.0), (20.0, 0.0));
                    let blur_fade = 1.0 - (blur / 20.0) * 0.6;

                    let (shake_x, shake_y) = if is_shake {
                        (
                            shake_offset(frame, seed, 0) * spr,
                            shake_offset(frame, seed, 1) * spr,
                        )
                    } else {
                        (0.0, 0.0)
                    };

                    let alpha = (opacity * exit * blur_fade).clamp(0.0, 1.0);
                    if alpha <= 0.0 {
                        continue;
                    }

                    let x = col_x + float_x + shake_x;
                    let y = base_y + float_y + shake_y;

                    // Soft glow behind the glyph.
                    surface.draw_orb(x, y, self.font_size * 0.7, Rgb::WHITE, alpha * 0.12);
                    painter.draw_char_centered(
                        surface,
                        ch,
                        x,
                        y,
                        self.font_size * scale,
                        color,
                        alpha,
                    );
                }
            }
        }
    }
}

/// Stagger: each column starts 10 frames after the previous one, each
/// character 3 frames after its predecessor within the column.
fn char_delay(line_idx: usize, char_idx: usize) -> u64 {
    line_idx as u64 * LINE_DELAY_FRAMES + char_idx as u64 * CHAR_DELAY_FRAMES
}

/// Stable per-character seed so float phase differs between characters but
/// never between renders.
fn char_seed(caption_idx: usize, line: usize, segment: usize, ch: usize) -> u32 {
    (caption_idx * 1000 + line * 100 + segment * 10 + ch) as u32
}

fn exit_opacity(frame: f32, end_frame: f32) -> f32 {
    interpolate(frame, (end_frame - EXIT_FADE_FRAMES, end_frame), (1.0, 0.0))
}

fn shake_offset(frame: u64, seed: u32, axis: u32) -> f32 {
    let mix = (frame as u32)
        .wrapping_mul(2654435761)
        .wrapping_add(seed.wrapping_mul(40503))
        .wrapping_add(axis);
    (seeded(mix) - 0.5) * SHAKE_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{Caption, CaptionIndex};
    use crate::overlay::text::TextPainter;

    #[test]
    fn delays_stagger_by_line_then_char() {
        assert_eq!(char_delay(0, 0), 0);
        assert_eq!(char_delay(0, 2), 6);
        assert_eq!(char_delay(1, 0), 10);
        assert_eq!(char_delay(2, 3), 29);
    }

    #[test]
    fn seeds_are_unique_across_positions() {
        let a = char_seed(1, 2, 3, 4);
        let b = char_seed(1, 2, 3, 5);
        let c = char_seed(1, 2, 4, 4);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn exit_fade_covers_last_ten_frames() {
        assert_eq!(exit_opacity(0.0, 100.0), 1.0);
        assert_eq!(exit_opacity(89.0, 100.0), 1.0);
        assert!((exit_opacity(95.0, 100.0) - 0.5).abs() < 1e-5);
        assert_eq!(exit_opacity(100.0, 100.0), 0.0);
        assert_eq!(exit_opacity(200.0, 100.0), 0.0);
    }

    #[test]
    fn shake_is_deterministic_and_bounded() {
        let a = shake_offset(10, 1234, 0);
        let b = shake_offset(10, 1234, 0);
        assert_eq!(a, b);
        assert_ne!(shake_offset(10, 1234, 0), shake_offset(11, 1234, 0));
        for f in 0..100u64 {
            let v = shake_offset(f, 42, 1);
            assert!(v.abs() <= SHAKE_RADIUS / 2.0);
        }
    }

    #[test]
    fn no_caption_draws_nothing() {
        let Some(painter) = TextPainter::try_system() else {
            return;
        };
        let index = CaptionIndex::new(vec![Caption {
            start_ms: 5000,
            end_ms: 6000,
            text: "hey".into(),
        }]);
        let mut surface = Surface::new(64, 64);
        let mut renderer = CaptionRenderer::new(20.0, 30);
        renderer.draw(&mut surface, &painter, &index, 0, 30);
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn active_caption_draws_pixels() {
        let Some(painter) = TextPainter::try_system() else {
            return;
        };
        let index = CaptionIndex::new(vec![Caption {
            start_ms: 0,
            end_ms: 5000,
            text: "hey".into(),
        }]);
        let mut surface = Surface::new(256, 256);
        let mut renderer = CaptionRenderer::new(32.0, 30);
        // Deep into the cue so entrance springs have settled.
        renderer.draw(&mut surface, &painter, &index, 60, 30);
        assert!(surface.pixels().iter().any(|&b| b > 0));
    }
}
