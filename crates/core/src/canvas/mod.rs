//! Software immediate-mode drawing surface.
//!
//! A flat RGBA buffer with the handful of operations the effect renderers
//! need: rect/line/polygon/circle fills and strokes, gradient paints,
//! additive compositing, glow halos and a clipped circular image blit.
//! Degenerate geometry paints nothing rather than failing.

use crate::safety;

/// Straight-alpha color. Channels are stored as bytes, alpha as `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };
    pub const WHITE: Rgba = Rgba {
        r: 255,
        g: 255,
        b: 255,
        a: 1.0,
    };
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// HSL constructor with all inputs repaired: hue wraps, saturation and
    /// lightness clamp to `[0, 100]`, alpha clamps to `[0, 1]`.
    pub fn from_hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = safety::safe_hue(hue);
        let s = safety::safe_percent(saturation) / 100.0;
        let l = safety::safe_percent(lightness) / 100.0;
        let a = safety::safe_alpha(alpha);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        Self {
            r: safety::safe_channel((r1 + m) * 255.0),
            g: safety::safe_channel((g1 + m) * 255.0),
            b: safety::safe_channel((b1 + m) * 255.0),
            a,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: safety::safe_alpha(alpha),
            ..self
        }
    }

    fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            safety::safe_channel(a as f32 + (b as f32 - a as f32) * t)
        };
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// A color stop along a gradient axis. Offsets live in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Gradient paint evaluated per pixel. Construct through
/// [`crate::safety::linear_gradient`] / [`crate::safety::radial_gradient`]
/// so degenerate geometry is rejected up front.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    Linear {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        stops: Vec<GradientStop>,
    },
    Radial {
        cx: f32,
        cy: f32,
        r0: f32,
        r1: f32,
        stops: Vec<GradientStop>,
    },
}

impl Gradient {
    pub(crate) fn linear(x0: f32, y0: f32, x1: f32, y1: f32, stops: Vec<GradientStop>) -> Self {
        Self::Linear {
            x0,
            y0,
            x1,
            y1,
            stops,
        }
    }

    pub(crate) fn radial(cx: f32, cy: f32, r0: f32, r1: f32, stops: Vec<GradientStop>) -> Self {
        Self::Radial {
            cx,
            cy,
            r0,
            r1,
            stops,
        }
    }

    fn color_at(&self, x: f32, y: f32) -> Rgba {
        match self {
            Gradient::Linear {
                x0,
                y0,
                x1,
                y1,
                stops,
            } => {
                let dx = x1 - x0;
                let dy = y1 - y0;
                let len_sq = dx * dx + dy * dy;
                let t = if len_sq > 0.0 {
                    ((x - x0) * dx + (y - y0) * dy) / len_sq
                } else {
                    0.0
                };
                eval_stops(stops, t)
            }
            Gradient::Radial {
                cx,
                cy,
                r0,
                r1,
                stops,
            } => {
                let dist = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                let span = (r1 - r0).max(f32::EPSILON);
                eval_stops(stops, (dist - r0) / span)
            }
        }
    }
}

fn eval_stops(stops: &[GradientStop], t: f32) -> Rgba {
    let t = safety::safe_alpha(t);
    let first = match stops.first() {
        Some(stop) => stop,
        None => return Rgba::TRANSPARENT,
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = (b.offset - a.offset).max(f32::EPSILON);
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops[stops.len() - 1].color
}

/// Paint source for fill and stroke operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    Gradient(Gradient),
}

impl Paint {
    fn color_at(&self, x: f32, y: f32) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::Gradient(gradient) => gradient.color_at(x, y),
        }
    }
}

impl From<Rgba> for Paint {
    fn from(color: Rgba) -> Self {
        Paint::Solid(color)
    }
}

impl From<Gradient> for Paint {
    fn from(gradient: Gradient) -> Self {
        Paint::Gradient(gradient)
    }
}

/// Pixel composition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composite {
    /// Ordinary alpha blending.
    #[default]
    SourceOver,
    /// Additive blending, used for glows and light accumulation.
    Lighter,
}

/// The drawing surface. Pixels are straight-alpha `[f32; 4]` in `[0, 1]`
/// while compositing; [`Canvas::to_rgba8`] quantizes on the way out.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
    composite: Composite,
    global_alpha: f32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize],
            composite: Composite::SourceOver,
            global_alpha: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resizes the surface, discarding the previous contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize];
    }

    pub fn set_composite(&mut self, composite: Composite) {
        self.composite = composite;
    }

    pub fn composite(&self) -> Composite {
        self.composite
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.global_alpha = safety::safe_alpha(alpha);
    }

    pub fn clear(&mut self, color: Rgba) {
        let px = [
            color.r as f32 / 255.0,
            color.g as f32 / 255.0,
            color.b as f32 / 255.0,
            safety::safe_alpha(color.a),
        ];
        self.pixels.fill(px);
    }

    /// Returns the color currently stored at the pixel, for inspection.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let p = self.pixels[(y * self.width + x) as usize];
        Some(Rgba {
            r: safety::safe_channel(p[0] * 255.0),
            g: safety::safe_channel(p[1] * 255.0),
            b: safety::safe_channel(p[2] * 255.0),
            a: safety::safe_alpha(p[3]),
        })
    }

    /// Quantizes the surface to an RGBA8 byte buffer (row-major, top-down).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            out.push(safety::safe_channel(p[0] * 255.0));
            out.push(safety::safe_channel(p[1] * 255.0));
            out.push(safety::safe_channel(p[2] * 255.0));
            out.push(safety::safe_channel(p[3] * 255.0));
        }
        out
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let alpha = safety::safe_alpha(color.a) * self.global_alpha * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let sr = color.r as f32 / 255.0;
        let sg = color.g as f32 / 255.0;
        let sb = color.b as f32 / 255.0;
        let idx = (y as u32 * self.width + x as u32) as usize;
        let dst = &mut self.pixels[idx];
        match self.composite {
            Composite::SourceOver => {
                dst[0] = sr * alpha + dst[0] * (1.0 - alpha);
                dst[1] = sg * alpha + dst[1] * (1.0 - alpha);
                dst[2] = sb * alpha + dst[2] * (1.0 - alpha);
                dst[3] = (alpha + dst[3] * (1.0 - alpha)).min(1.0);
            }
            Composite::Lighter => {
                dst[0] = (dst[0] + sr * alpha).min(1.0);
                dst[1] = (dst[1] + sg * alpha).min(1.0);
                dst[2] = (dst[2] + sb * alpha).min(1.0);
                dst[3] = dst[3].max(alpha);
            }
        }
    }

    /// Fills an axis-aligned rectangle. Zero or negative extents paint
    /// nothing.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        let x = safety::safe_number(x, 0.0);
        let y = safety::safe_number(y, 0.0);
        let w = safety::safe_number(w, 0.0);
        let h = safety::safe_number(h, 0.0);
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let x0 = x.floor().max(0.0) as i64;
        let y0 = y.floor().max(0.0) as i64;
        let x1 = ((x + w).ceil() as i64).min(self.width as i64);
        let y1 = ((y + h).ceil() as i64).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                let color = paint.color_at(px as f32 + 0.5, py as f32 + 0.5);
                self.blend(px, py, color, 1.0);
            }
        }
    }

    /// Strokes a line segment with the given width.
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, paint: &Paint) {
        let x0 = safety::safe_number(x0, 0.0);
        let y0 = safety::safe_number(y0, 0.0);
        let x1 = safety::safe_number(x1, 0.0);
        let y1 = safety::safe_number(y1, 0.0);
        let half = (safety::safe_number(width, 1.0).max(0.1)) * 0.5;

        let min_x = (x0.min(x1) - half).floor().max(0.0) as i64;
        let max_x = ((x0.max(x1) + half).ceil() as i64).min(self.width as i64 - 1);
        let min_y = (y0.min(y1) - half).floor().max(0.0) as i64;
        let max_y = ((y0.max(y1) + half).ceil() as i64).min(self.height as i64 - 1);

        let dx = x1 - x0;
        let dy = y1 - y0;
        let len_sq = dx * dx + dy * dy;
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let cx = px as f32 + 0.5;
                let cy = py as f32 + 0.5;
                let t = if len_sq > 0.0 {
                    (((cx - x0) * dx + (cy - y0) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let nx = x0 + t * dx;
                let ny = y0 + t * dy;
                let dist = ((cx - nx).powi(2) + (cy - ny).powi(2)).sqrt();
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, paint.color_at(cx, cy), coverage);
                }
            }
        }
    }

    /// Strokes an open polyline segment by segment.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, paint: &Paint) {
        for pair in points.windows(2) {
            self.stroke_line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, width, paint);
        }
    }

    /// Strokes a closed polygon outline.
    pub fn stroke_polygon(&mut self, points: &[(f32, f32)], width: f32, paint: &Paint) {
        if points.len() < 2 {
            return;
        }
        self.stroke_polyline(points, width, paint);
        let first = points[0];
        let last = points[points.len() - 1];
        self.stroke_line(last.0, last.1, first.0, first.1, width, paint);
    }

    /// Fills a simple polygon with even-odd scanline coverage.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], paint: &Paint) {
        if points.len() < 3 {
            return;
        }
        if points.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
            return;
        }
        let min_y = points
            .iter()
            .map(|p| p.1)
            .fold(f32::INFINITY, f32::min)
            .floor()
            .max(0.0) as i64;
        let max_y = (points
            .iter()
            .map(|p| p.1)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil() as i64)
            .min(self.height as i64 - 1);

        let mut crossings: Vec<f32> = Vec::with_capacity(8);
        for py in min_y..=max_y {
            let scan = py as f32 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % points.len()];
                if (y0 <= scan && y1 > scan) || (y1 <= scan && y0 > scan) {
                    let t = (scan - y0) / (y1 - y0);
                    crossings.push(x0 + t * (x1 - x0));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].floor().max(0.0) as i64;
                let end = (pair[1].ceil() as i64).min(self.width as i64);
                for px in start..end {
                    let cx = px as f32 + 0.5;
                    if cx >= pair[0] && cx <= pair[1] {
                        self.blend(px, py, paint.color_at(cx, scan), 1.0);
                    }
                }
            }
        }
    }

    /// Fills a circle with a one-pixel feathered edge. Non-positive radii
    /// paint nothing.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        let cx = safety::safe_number(cx, 0.0);
        let cy = safety::safe_number(cy, 0.0);
        let radius = safety::safe_number(radius, 0.0);
        if radius <= 0.0 {
            return;
        }
        let min_x = (cx - radius - 1.0).floor().max(0.0) as i64;
        let max_x = ((cx + radius + 1.0).ceil() as i64).min(self.width as i64 - 1);
        let min_y = (cy - radius - 1.0).floor().max(0.0) as i64;
        let max_y = ((cy + radius + 1.0).ceil() as i64).min(self.height as i64 - 1);
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, paint.color_at(px as f32 + 0.5, py as f32 + 0.5), coverage);
                }
            }
        }
    }

    /// Strokes a circle outline.
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, width: f32, paint: &Paint) {
        let radius = safety::safe_number(radius, 0.0);
        if radius <= 0.0 {
            return;
        }
        let half = safety::safe_number(width, 1.0).max(0.1) * 0.5;
        let outer = radius + half;
        let min_x = (cx - outer - 1.0).floor().max(0.0) as i64;
        let max_x = ((cx + outer + 1.0).ceil() as i64).min(self.width as i64 - 1);
        let min_y = (cy - outer - 1.0).floor().max(0.0) as i64;
        let max_y = ((cy + outer + 1.0).ceil() as i64).min(self.height as i64 - 1);
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (half + 0.5 - (dist - radius).abs()).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, paint.color_at(px as f32 + 0.5, py as f32 + 0.5), coverage);
                }
            }
        }
    }

    /// Additive glow halo around a point, an approximation of canvas-style
    /// shadow blur. Larger `intensity` brightens the halo.
    pub fn glow_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba, intensity: f32) {
        let radius = safety::safe_number(radius, 0.0);
        if radius <= 0.0 {
            return;
        }
        let intensity = safety::safe_alpha(intensity);
        let previous = self.composite;
        self.composite = Composite::Lighter;
        for ring in 0..3u32 {
            let spread = 1.0 + ring as f32 * 0.5;
            let alpha = intensity * 0.35 / (1.0 + ring as f32);
            let paint = Paint::Solid(color.with_alpha(color.a * alpha));
            self.fill_circle(cx, cy, radius * spread, &paint);
        }
        self.composite = previous;
    }

    /// Blits an RGBA8 image clipped to a circle, scaled to cover the
    /// circle's bounding square. `rgba` must be `img_w * img_h * 4` bytes;
    /// anything malformed paints nothing.
    pub fn blit_circle_image(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        img_w: u32,
        img_h: u32,
        rgba: &[u8],
    ) {
        let radius = safety::safe_number(radius, 0.0);
        if radius <= 0.0 || img_w == 0 || img_h == 0 {
            return;
        }
        if rgba.len() < (img_w as usize * img_h as usize * 4) {
            return;
        }
        let side = radius * 2.0;
        let min_x = (cx - radius).floor().max(0.0) as i64;
        let max_x = ((cx + radius).ceil() as i64).min(self.width as i64 - 1);
        let min_y = (cy - radius).floor().max(0.0) as i64;
        let max_y = ((cy + radius).ceil() as i64).min(self.height as i64 - 1);
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let fx = px as f32 + 0.5;
                let fy = py as f32 + 0.5;
                let dist = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let u = ((fx - (cx - radius)) / side).clamp(0.0, 1.0);
                let v = ((fy - (cy - radius)) / side).clamp(0.0, 1.0);
                let sx = ((u * (img_w - 1) as f32).round() as u32).min(img_w - 1);
                let sy = ((v * (img_h - 1) as f32).round() as u32).min(img_h - 1);
                let idx = ((sy * img_w + sx) * 4) as usize;
                let color = Rgba {
                    r: rgba[idx],
                    g: rgba[idx + 1],
                    b: rgba[idx + 2],
                    a: rgba[idx + 3] as f32 / 255.0,
                };
                self.blend(px, py, color, coverage);
            }
        }
    }
}
