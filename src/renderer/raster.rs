use crate::font_store::FontStore;
use crate::glyph_key::GlyphKey;
use crate::renderer::glyph_cache::{GlyphCache, GlyphCacheItem};
use crate::text::layout::{
    Align, MeasureText, TextLayout, WritingMode, column_index, column_left, line_baseline_y,
    line_height, line_start_x, vertical_pad,
};
use crate::text::style::StyleState;

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`. Anything else degrades to
    /// opaque black rather than failing the draw.
    pub fn parse(s: &str) -> Self {
        fn hex(byte: &str) -> Option<u8> {
            u8::from_str_radix(byte, 16).ok()
        }
        fn nibble(c: &str) -> Option<u8> {
            hex(c).map(|v| v * 16 + v)
        }

        let Some(body) = s.trim().strip_prefix('#') else {
            return Self::BLACK;
        };

        let parsed = match body.len() {
            3 => (|| {
                Some(Self {
                    r: nibble(body.get(0..1)?)?,
                    g: nibble(body.get(1..2)?)?,
                    b: nibble(body.get(2..3)?)?,
                    a: 255,
                })
            })(),
            6 | 8 => (|| {
                Some(Self {
                    r: hex(body.get(0..2)?)?,
                    g: hex(body.get(2..4)?)?,
                    b: hex(body.get(4..6)?)?,
                    a: if body.len() == 8 {
                        hex(body.get(6..8)?)?
                    } else {
                        255
                    },
                })
            })(),
            _ => None,
        };

        parsed.unwrap_or(Self::BLACK)
    }
}

/// RGBA8 raster surface.
///
/// Pixels are arranged in row-major order with the origin at the top-left.
/// Channels are straight alpha; compositing is src-over.
pub struct Pixmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Pixmap {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width.saturating_mul(height).saturating_mul(4);
        Self {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        Some([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }

    /// Src-over blend of `color` at strength `alpha` (0..=1) into one pixel.
    fn blend(&mut self, x: usize, y: usize, color: Rgba, alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let a = (alpha * color.a as f32 / 255.0).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }

        let idx = (y * self.width + x) * 4;
        let inv = 1.0 - a;
        let src = [color.r as f32, color.g as f32, color.b as f32];
        for (c, s) in src.iter().enumerate() {
            let dst = self.pixels[idx + c] as f32;
            self.pixels[idx + c] = (s * a + dst * inv).round().min(255.0) as u8;
        }
        let dst_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = a + dst_a * inv;
        self.pixels[idx + 3] = (out_a * 255.0).round().min(255.0) as u8;
    }

    /// Hard binarization of the alpha channel for antialias-off rendering:
    /// alpha below `threshold` percent of full goes transparent, everything
    /// else snaps to fully opaque.
    pub fn threshold_alpha(&mut self, threshold: f32) {
        let cutoff = (threshold.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8;
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel[3] = if pixel[3] < cutoff { 0 } else { 255 };
        }
    }
}

/// One raster request. `layout` must come from the same defaults, mode and
/// line break width, since the painter replays the layout's positioning
/// helpers.
pub struct RasterParams<'a> {
    pub layout: &'a TextLayout,
    pub defaults: &'a StyleState,
    pub align: Align,
    pub mode: WritingMode,
    pub line_break_width: f32,
    pub antialias: bool,
    /// Alpha cutoff in percent when `antialias` is off.
    pub threshold: f32,
}

/// Per-fragment paint state derived once per fragment.
struct FragmentPaint {
    fill: Rgba,
    outline: Rgba,
    /// 0..=1 multiplier from the fragment's percent alpha.
    alpha: f32,
    /// Number of fill passes; 1 is a plain fill.
    thickness: i32,
    /// Outline disc radius in layout pixels (before device scaling).
    outline_radius: f32,
}

impl FragmentPaint {
    fn from_state(state: &StyleState) -> Self {
        let alpha = if state.alpha.is_finite() {
            (state.alpha / 100.0).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let thickness = if state.thickness.is_finite() {
            (state.thickness.floor() as i32).clamp(1, 8)
        } else {
            1
        };
        Self {
            fill: Rgba::parse(&state.color),
            outline: Rgba::parse(&state.outline_color),
            alpha,
            thickness,
            outline_radius: state.outline_width.max(0.0) / 2.0,
        }
    }
}

/// Rasterizes a layout at the given device scale. Glyph coverage comes from
/// the shared cache; characters whose family resolves to no loaded face are
/// skipped (layout already reserved their fallback advance).
pub fn render(
    params: &RasterParams<'_>,
    scale: f32,
    fonts: &mut FontStore,
    cache: &mut GlyphCache,
) -> Pixmap {
    let layout = params.layout;
    let width = (layout.size.width * scale).ceil().max(1.0) as usize;
    let height = (layout.size.height * scale).ceil().max(1.0) as usize;
    let mut pixmap = Pixmap::new(width, height);

    if params.mode.is_vertical() {
        render_vertical(params, scale, fonts, cache, &mut pixmap);
    } else {
        render_horizontal(params, scale, fonts, cache, &mut pixmap);
    }

    if !params.antialias {
        pixmap.threshold_alpha(params.threshold);
    }

    pixmap
}

fn render_horizontal(
    params: &RasterParams<'_>,
    scale: f32,
    fonts: &mut FontStore,
    cache: &mut GlyphCache,
    pixmap: &mut Pixmap,
) {
    let layout = params.layout;
    let font_size = params.defaults.font_size;
    let outline = params.defaults.outline_width.max(0.0);
    let lbw = if params.line_break_width.is_finite() {
        params.line_break_width
    } else {
        0.0
    };
    let mut buf = [0u8; 4];

    for (i, line) in layout.lines.iter().enumerate() {
        let mut pen = line_start_x(params.align, layout.size.width, line.width, outline);
        let baseline = line_baseline_y(i, font_size, lbw, outline);
        let mut char_index = 0usize;

        for fragment in &line.fragments {
            let paint = FragmentPaint::from_state(&fragment.state);
            for ch in fragment.text.chars() {
                let advance = fonts.measure(
                    &fragment.state.font_family,
                    fragment.state.font_size,
                    ch.encode_utf8(&mut buf),
                );
                draw_char(
                    pixmap,
                    fonts,
                    cache,
                    &fragment.state.font_family,
                    fragment.state.font_size,
                    ch,
                    pen * scale,
                    baseline * scale,
                    &paint,
                    scale,
                );
                pen += advance + line.char_spacings.get(char_index).copied().unwrap_or(0.0);
                char_index += 1;
            }
        }
    }
}

fn render_vertical(
    params: &RasterParams<'_>,
    scale: f32,
    fonts: &mut FontStore,
    cache: &mut GlyphCache,
    pixmap: &mut Pixmap,
) {
    let layout = params.layout;
    let font_size = params.defaults.font_size;
    let outline = params.defaults.outline_width.max(0.0);
    let lbw = if params.line_break_width.is_finite() {
        params.line_break_width
    } else {
        0.0
    };
    let columns = layout.lines.len();
    let column_width = font_size + 2.0 * outline;
    // Baseline of the topmost character of every column.
    let y_start = vertical_pad(font_size) + outline + font_size;
    let mut buf = [0u8; 4];

    for (i, line) in layout.lines.iter().enumerate() {
        let col = column_index(params.mode, i, columns);
        let col_left = column_left(
            params.align,
            col,
            columns,
            font_size,
            lbw,
            layout.size.width,
            outline,
        );
        let mut char_index = 0usize;

        for fragment in &line.fragments {
            let paint = FragmentPaint::from_state(&fragment.state);
            for ch in fragment.text.chars() {
                // Vertical text is set at the skin's global size with the
                // fragment's family, each glyph centered in its column.
                let w = fonts.measure(
                    &fragment.state.font_family,
                    font_size,
                    ch.encode_utf8(&mut buf),
                );
                let x = col_left + (column_width - w) / 2.0;
                let y = y_start + char_index as f32 * line_height(font_size);
                draw_char(
                    pixmap,
                    fonts,
                    cache,
                    &fragment.state.font_family,
                    font_size,
                    ch,
                    x * scale,
                    y * scale,
                    &paint,
                    scale,
                );
                char_index += 1;
            }
        }
    }
}

const THICKNESS_OFFSETS: [(f32, f32); 8] = [
    (-0.5, -0.5),
    (0.0, -0.5),
    (0.5, -0.5),
    (-0.5, 0.0),
    (0.5, 0.0),
    (-0.5, 0.5),
    (0.0, 0.5),
    (0.5, 0.5),
];

fn draw_char(
    pixmap: &mut Pixmap,
    fonts: &mut FontStore,
    cache: &mut GlyphCache,
    family: &str,
    size: f32,
    ch: char,
    x: f32,
    baseline: f32,
    paint: &FragmentPaint,
    scale: f32,
) {
    let px_size = size * scale;
    if !px_size.is_finite() || px_size <= 0.0 {
        return;
    }
    let Some((font_id, font)) = fonts.font_for_family(family) else {
        return;
    };

    let glyph_index = font.lookup_glyph_index(ch);
    let metrics = font.metrics_indexed(glyph_index, px_size);
    let key = GlyphKey::new(font_id, glyph_index, px_size);
    let Some(mask) = cache.get(&key, fonts) else {
        return;
    };
    if mask.width == 0 || mask.height == 0 {
        return;
    }

    let left = x + metrics.xmin as f32;
    let top = baseline - metrics.height as f32 - metrics.ymin as f32;

    // Stroke approximation: the coverage mask stamped across a disc.
    let radius = paint.outline_radius * scale;
    if radius > 0.0 && paint.outline.a > 0 {
        let r = radius.ceil() as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if (dx * dx + dy * dy) as f32 <= radius * radius {
                    stamp(pixmap, &mask, left + dx as f32, top + dy as f32, paint.outline, paint.alpha);
                }
            }
        }
    }

    // Faux bold: repeated half-pixel offset fills before the centered one.
    for _ in 1..paint.thickness {
        for (dx, dy) in THICKNESS_OFFSETS {
            stamp(pixmap, &mask, left + dx, top + dy, paint.fill, paint.alpha);
        }
    }
    stamp(pixmap, &mask, left, top, paint.fill, paint.alpha);
}

fn stamp(
    pixmap: &mut Pixmap,
    mask: &GlyphCacheItem<'_>,
    origin_x: f32,
    origin_y: f32,
    color: Rgba,
    alpha: f32,
) {
    for row in 0..mask.height {
        let y = origin_y + row as f32;
        if y < 0.0 {
            continue;
        }
        let iy = y.floor() as isize;
        if iy < 0 || iy as usize >= pixmap.height {
            continue;
        }

        for col in 0..mask.width {
            let coverage = mask.data[row * mask.width + col];
            if coverage == 0 {
                continue;
            }

            let x = origin_x + col as f32;
            if x < 0.0 {
                continue;
            }
            let ix = x.floor() as isize;
            if ix < 0 || ix as usize >= pixmap.width {
                continue;
            }

            pixmap.blend(
                ix as usize,
                iy as usize,
                color,
                alpha * coverage as f32 / 255.0,
            );
        }
    }
}
