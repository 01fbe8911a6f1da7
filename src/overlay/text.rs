use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;

use crate::render::{Rgb, Surface};

/// Common system font locations, tried in order when no font is given.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

pub struct TextPainter {
    font: Font,
}

impl TextPainter {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let data = match path {
            Some(p) => std::fs::read(p)
                .with_context(|| format!("Failed to read font file: {}", p.display()))?,
            None => {
                let found = FALLBACK_FONTS
                    .iter()
                    .find(|p| Path::new(p).exists())
                    .context("No usable font found; pass --font <path>")?;
                log::info!("Using system font: {found}");
                std::fs::read(found)?
            }
        };
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {e}"))?;
        Ok(Self { font })
    }

    #[cfg(test)]
    pub fn try_system() -> Option<Self> {
        Self::load(None).ok()
    }

    pub fn advance(&self, ch: char, size: f32) -> f32 {
        self.font.metrics(ch, size).advance_width
    }

    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, size)).sum()
    }

    pub fn line_height(&self, size: f32) -> f32 {
        self.font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2)
    }

    /// Draws one glyph centered on (cx, cy).
    pub fn draw_char_centered(
        &self,
        surface: &mut Surface,
        ch: char,
        cx: f32,
        cy: f32,
        size: f32,
        color: Rgb,
        alpha: f32,
    ) {
        if alpha <= 0.0 || size <= 1.0 {
            return;
        }
        let (metrics, bitmap) = self.font.rasterize(ch, size);
        let x0 = cx - metrics.width as f32 / 2.0;
        let y0 = cy - metrics.height as f32 / 2.0;

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                let a = coverage as f32 / 255.0 * alpha;
                surface.blend_pixel(
                    (x0 + gx as f32) as i32,
                    (y0 + gy as f32) as i32,
                    color,
                    a,
                );
            }
        }
    }

    /// Draws a run of text with its baseline at `y`, starting at `x`.
    pub fn draw_text(
        &self,
        surface: &mut Surface,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: Rgb,
        alpha: f32,
    ) {
        if alpha <= 0.0 {
            return;
        }
        let mut cursor = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let glyph_y = y - metrics.height as f32 - metrics.ymin as f32;
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let a = coverage as f32 / 255.0 * alpha;
                    surface.blend_pixel(
                        (cursor + metrics.xmin as f32 + gx as f32) as i32,
                        (glyph_y + gy as f32) as i32,
                        color,
                        a,
                    );
                }
            }
            cursor += metrics.advance_width;
        }
    }

    /// Draws text centered horizontally around `cx`.
    pub fn draw_text_centered(
        &self,
        surface: &mut Surface,
        text: &str,
        cx: f32,
        y: f32,
        size: f32,
        color: Rgb,
        alpha: f32,
    ) {
        let width = self.measure(text, size);
        self.draw_text(surface, text, cx - width / 2.0, y, size, color, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_accumulates_advances() {
        let Some(painter) = TextPainter::try_system() else {
            return;
        };
        let a = painter.measure("a", 32.0);
        let aa = painter.measure("aa", 32.0);
        assert!(a > 0.0);
        assert!((aa - a * 2.0).abs() < 0.01);
    }

    #[test]
    fn drawing_changes_pixels() {
        let Some(painter) = TextPainter::try_system() else {
            return;
        };
        let mut surface = Surface::new(64, 64);
        painter.draw_text(&mut surface, "X", 10.0, 48.0, 32.0, Rgb::WHITE, 1.0);
        assert!(surface.pixels().iter().any(|&b| b > 0));
    }

    #[test]
    fn zero_alpha_draws_nothing() {
        let Some(painter) = TextPainter::try_system() else {
            return;
        };
        let mut surface = Surface::new(32, 32);
        painter.draw_text(&mut surface, "X", 2.0, 28.0, 24.0, Rgb::WHITE, 0.0);
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }
}
