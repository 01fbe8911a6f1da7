//! CPU pixel compositing for the non-shader generators and text overlays.
//! Pixels are RGBA8, row-major, fully opaque alpha in the final output.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }
}

/// Parses `#rgb` or `#rrggbb`. Anything else is None.
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.strip_prefix('#')?;
    let (r, g, b) = match hex.len() {
        3 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            let r = (v >> 8) & 0xf;
            let g = (v >> 4) & 0xf;
            let b = v & 0xf;
            (r * 17, g * 17, b * 17)
        }
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            ((v >> 16) & 0xff, (v >> 8) & 0xff, v & 0xff)
        }
        _ => return None,
    };
    Some(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
}

/// HSL to RGB, hue in degrees, s/l in [0, 1].
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let h = h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb::new(r + m, g + m, b + m)
}

pub struct Surface {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn fill(&mut self, color: Rgb) {
        let [r, g, b] = to_bytes(color);
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = r;
            px[1] = g;
            px[2] = b;
            px[3] = 255;
        }
    }

    /// Alpha blend of `color` at `alpha` over the existing pixel.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let [r, g, b] = to_bytes(color);
        let px = &mut self.pixels[idx..idx + 4];
        px[0] = blend_channel(px[0], r, alpha);
        px[1] = blend_channel(px[1], g, alpha);
        px[2] = blend_channel(px[2], b, alpha);
        px[3] = 255;
    }

    /// Screen blend: `1 - (1-dst)(1-src*alpha)`. Brightens, never darkens.
    pub fn screen_pixel(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let src = [color.r * alpha, color.g * alpha, color.b * alpha];
        let px = &mut self.pixels[idx..idx + 4];
        for c in 0..3 {
            let dst = px[c] as f32 / 255.0;
            let out = 1.0 - (1.0 - dst) * (1.0 - src[c]);
            px[c] = (out.clamp(0.0, 1.0) * 255.0) as u8;
        }
        px[3] = 255;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb, alpha: f32) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                self.blend_pixel(x + dx, y + dy, color, alpha);
            }
        }
    }

    /// A soft radial orb, screened onto the surface. Opacity falls off from
    /// the center: 1.0 to radius 0.3, 0.95 to 0.6, 0.5 to the edge, then 0.
    pub fn draw_orb(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb, opacity: f32) {
        if radius <= 0.0 || opacity <= 0.0 {
            return;
        }
        let r_i = radius.ceil() as i32;
        let x0 = cx as i32 - r_i;
        let y0 = cy as i32 - r_i;
        for y in y0..=(y0 + 2 * r_i) {
            for x in x0..=(x0 + 2 * r_i) {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt() / radius;
                if d >= 1.0 {
                    continue;
                }
                let falloff = orb_falloff(d);
                self.screen_pixel(x, y, color, opacity * falloff);
            }
        }
    }

    /// Multiplies every channel by `keep`. Used for motion trails: the
    /// previous frame is dimmed instead of cleared.
    pub fn dim(&mut self, keep: f32) {
        let keep = keep.clamp(0.0, 1.0);
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = (px[0] as f32 * keep) as u8;
            px[1] = (px[1] as f32 * keep) as u8;
            px[2] = (px[2] as f32 * keep) as u8;
            px[3] = 255;
        }
    }

    /// Darkens toward the frame edges.
    pub fn vignette(&mut self, strength: f32) {
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let max_d = (cx * cx + cy * cy).sqrt();
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt() / max_d;
                let keep = 1.0 - strength * d * d;
                let idx = ((y * self.width + x) * 4) as usize;
                let px = &mut self.pixels[idx..idx + 4];
                px[0] = (px[0] as f32 * keep) as u8;
                px[1] = (px[1] as f32 * keep) as u8;
                px[2] = (px[2] as f32 * keep) as u8;
            }
        }
    }

    pub fn copy_to(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.pixels);
    }
}

fn orb_falloff(d: f32) -> f32 {
    // Gradient stops at 0.0/0.3/0.6/1.0 with alphas 1.0/0.95/0.5/0.0.
    if d < 0.3 {
        1.0 - (d / 0.3) * 0.05
    } else if d < 0.6 {
        0.95 - ((d - 0.3) / 0.3) * 0.45
    } else {
        0.5 - ((d - 0.6) / 0.4) * 0.5
    }
}

fn to_bytes(color: Rgb) -> [u8; 3] {
    [
        (color.r.clamp(0.0, 1.0) * 255.0) as u8,
        (color.g.clamp(0.0, 1.0) * 255.0) as u8,
        (color.b.clamp(0.0, 1.0) * 255.0) as u8,
    ]
}

fn blend_channel(dst: u8, src: u8, alpha: f32) -> u8 {
    (dst as f32 * (1.0 - alpha) + src as f32 * alpha) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(parse_hex_color("#fff"), Some(Rgb::WHITE));
        assert_eq!(parse_hex_color("#000"), Some(Rgb::BLACK));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzz"), None);
    }

    #[test]
    fn hsl_primaries() {
        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red.r - 1.0).abs() < 1e-5 && red.g.abs() < 1e-5);
        let green = hsl_to_rgb(120.0, 1.0, 0.5);
        assert!((green.g - 1.0).abs() < 1e-5);
        let gray = hsl_to_rgb(200.0, 0.0, 0.5);
        assert!((gray.r - gray.g).abs() < 1e-5 && (gray.g - gray.b).abs() < 1e-5);
    }

    #[test]
    fn blend_is_bounds_checked() {
        let mut s = Surface::new(4, 4);
        s.blend_pixel(-1, 0, Rgb::WHITE, 1.0);
        s.blend_pixel(0, 100, Rgb::WHITE, 1.0);
        assert!(s.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn full_alpha_blend_replaces_pixel() {
        let mut s = Surface::new(2, 2);
        s.blend_pixel(1, 1, Rgb::WHITE, 1.0);
        let idx = (1 * 2 + 1) * 4;
        assert_eq!(&s.pixels()[idx..idx + 4], &[255, 255, 255, 255]);
    }

    #[test]
    fn screen_never_darkens() {
        let mut s = Surface::new(1, 1);
        s.fill(Rgb::new(0.5, 0.5, 0.5));
        let before = s.pixels()[0];
        s.screen_pixel(0, 0, Rgb::new(0.2, 0.2, 0.2), 1.0);
        assert!(s.pixels()[0] >= before);
    }

    #[test]
    fn dim_scales_channels() {
        let mut s = Surface::new(1, 1);
        s.fill(Rgb::WHITE);
        s.dim(0.5);
        assert_eq!(s.pixels()[0], 127);
        assert_eq!(s.pixels()[3], 255);
    }

    #[test]
    fn orb_falloff_is_monotonic() {
        let mut prev = f32::INFINITY;
        for i in 0..=100 {
            let v = orb_falloff(i as f32 / 100.0);
            assert!(v <= prev + 1e-6);
            prev = v;
        }
        assert!((orb_falloff(0.0) - 1.0).abs() < 1e-6);
        assert!(orb_falloff(0.999) < 0.01);
    }
}
