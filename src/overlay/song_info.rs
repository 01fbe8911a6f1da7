use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;
use std::path::Path;

use crate::anim::interpolate;
use crate::captions::CaptionIndex;
use crate::overlay::text::TextPainter;
use crate::render::{Rgb, Surface};

/// Center strength ramps from 0 to 1 as the nearest caption moves from
/// 300ms to 1200ms away.
const DIST_NEAR_MS: f32 = 300.0;
const DIST_FAR_MS: f32 = 1200.0;
/// The card only appears in caption gaps at least this long.
const MIN_GAP_MS: u64 = 2500;

const COVER_SIZE: u32 = 288;

/// Staggered reveal: each element maps its own slice of the center
/// strength to 0..1, so the container fades in first and the secondary
/// text last.
const CONTAINER_RANGE: (f32, f32) = (0.0, 0.4);
const COVER_RANGE: (f32, f32) = (0.2, 0.6);
const TITLE_RANGE: (f32, f32) = (0.4, 0.8);
const SECONDARY_RANGE: (f32, f32) = (0.6, 1.0);

#[derive(Clone, Debug, Default)]
pub struct SongMeta {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
}

impl SongMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.description.is_none()
    }
}

/// The song metadata card shown between captions: cover art, title, artist
/// and description stacked in the center of the frame. It fades in when no
/// caption is near and only inside gaps long enough to finish the reveal.
pub struct SongInfo {
    meta: SongMeta,
    cover: Option<RgbaImage>,
}

impl SongInfo {
    pub fn new(meta: SongMeta, cover_path: Option<&Path>) -> Result<Self> {
        let cover = match cover_path {
            Some(path) => {
                let img = image::open(path)
                    .with_context(|| format!("Failed to open cover image: {}", path.display()))?;
                Some(img.resize_to_fill(COVER_SIZE, COVER_SIZE, FilterType::Lanczos3).to_rgba8())
            }
            None => None,
        };
        Ok(Self { meta, cover })
    }

    pub fn has_content(&self) -> bool {
        !self.meta.is_empty() || self.cover.is_some()
    }

    pub fn draw(
        &self,
        surface: &mut Surface,
        painter: &TextPainter,
        index: &CaptionIndex,
        frame: u64,
        fps: u32,
    ) {
        if !self.has_content() {
            return;
        }

        let time_ms = frame * 1000 / fps as u64;
        let strength = visibility(index.distance_to_nearest(time_ms), index.gap_duration_at(time_ms));
        if strength <= 0.0 {
            return;
        }

        let container = element_opacity(strength, CONTAINER_RANGE);
        let cover_op = element_opacity(strength, COVER_RANGE);
        let title_op = element_opacity(strength, TITLE_RANGE);
        let secondary_op = element_opacity(strength, SECONDARY_RANGE);

        let scale = interpolate(strength, (0.0, 1.0), (0.95, 1.0));
        // Approach blur rendered as attenuation.
        let blur_fade = interpolate(strength, (0.0, 1.0), (0.4, 1.0));

        let cx = surface.width as f32 / 2.0;
        let cy = surface.height as f32 / 2.0;

        let cover_size = COVER_SIZE as f32 * scale;
        let title_size = 72.0 * scale;
        let artist_size = 34.0 * scale;
        let desc_size = 26.0 * scale;
        let gap = 40.0 * scale;

        // Stack height drives vertical centering.
        let mut stack = 0.0;
        if self.cover.is_some() {
            stack += cover_size + gap;
        }
        if self.meta.title.is_some() {
            stack += title_size + gap * 0.5;
        }
        if self.meta.artist.is_some() {
            stack += artist_size + gap * 0.5;
        }
        if self.meta.description.is_some() {
            stack += desc_size;
        }

        // Dark translucent card behind everything.
        let card_w = surface.width as f32 * 0.8 * scale;
        let card_h = stack + gap * 2.0;
        surface.fill_rect(
            (cx - card_w / 2.0) as i32,
            (cy - card_h / 2.0) as i32,
            card_w as u32,
            card_h as u32,
            Rgb::BLACK,
            0.4 * container * blur_fade,
        );

        let mut y = cy - stack / 2.0;

        if let Some(cover) = &self.cover {
            draw_cover(surface, cover, cx, y, cover_size, cover_op * blur_fade);
            y += cover_size + gap;
        }

        if let Some(title) = &self.meta.title {
            painter.draw_text_centered(
                surface,
                title,
                cx,
                y + title_size * 0.8,
                title_size,
                Rgb::WHITE,
                title_op * blur_fade,
            );
            y += title_size + gap * 0.5;
        }

        if let Some(artist) = &self.meta.artist {
            let spaced: String = artist
                .to_uppercase()
                .chars()
                .flat_map(|c| [c, ' '])
                .collect();
            painter.draw_text_centered(
                surface,
                spaced.trim_end(),
                cx,
                y + artist_size * 0.8,
                artist_size,
                Rgb::new(0.9, 0.9, 0.9),
                secondary_op * blur_fade,
            );
            y += artist_size + gap * 0.5;
        }

        if let Some(description) = &self.meta.description {
            painter.draw_text_centered(
                surface,
                description,
                cx,
                y + desc_size * 0.8,
                desc_size,
                Rgb::new(0.6, 0.6, 0.6),
                secondary_op * blur_fade,
            );
        }
    }
}

fn draw_cover(surface: &mut Surface, cover: &RgbaImage, cx: f32, top: f32, size: f32, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let x0 = cx - size / 2.0;
    let scale = cover.width() as f32 / size;
    for dy in 0..size as u32 {
        for dx in 0..size as u32 {
            let sx = ((dx as f32 * scale) as u32).min(cover.width() - 1);
            let sy = ((dy as f32 * scale) as u32).min(cover.height() - 1);
            let px = cover.get_pixel(sx, sy);
            let color = Rgb::new(
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            );
            let a = px[3] as f32 / 255.0 * alpha;
            surface.blend_pixel((x0 + dx as f32) as i32, (top + dy as f32) as i32, color, a);
        }
    }
}

/// Overall visibility in [0, 1]. Zero while a caption is close or the
/// surrounding gap is too short to be worth the reveal.
pub fn visibility(distance_ms: u64, gap_ms: u64) -> f32 {
    if gap_ms < MIN_GAP_MS {
        return 0.0;
    }
    let distance = distance_ms.min(u64::from(u32::MAX)) as f32;
    interpolate(distance, (DIST_NEAR_MS, DIST_FAR_MS), (0.0, 1.0))
}

/// Maps the shared strength onto one element's reveal window.
pub fn element_opacity(strength: f32, range: (f32, f32)) -> f32 {
    interpolate(strength, range, (0.0, 1.0))
}
