use euclid::default::{Point2D, Size2D};

use crate::text::markup::Segment;
use crate::text::style::{StyleState, StyledChar, char_stream};
use crate::text::wrap::wrap_segments;

/// External measurement provider. The default implementation lives in
/// [`crate::font_store::FontStore`]; hosts with their own text metrics
/// (e.g. a canvas backend) plug in here.
pub trait MeasureText {
    /// Advance width in pixels of `text` set in `family` at `size`.
    fn measure(&mut self, family: &str, size: f32, text: &str) -> f32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
}

/// Writing direction. Vertical modes stack characters top-to-bottom in
/// columns; `VerticalLeft` fills columns right-to-left (first line is the
/// rightmost column), `VerticalRight` left-to-right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WritingMode {
    #[default]
    Horizontal,
    VerticalLeft,
    VerticalRight,
}

impl WritingMode {
    pub fn is_vertical(self) -> bool {
        !matches!(self, WritingMode::Horizontal)
    }

    /// Maps the host-facing string value of the vertical toggle. `"true"`
    /// is accepted as a legacy spelling of `"right"`.
    pub fn from_host_value(value: &str) -> Self {
        match value {
            "left" => WritingMode::VerticalLeft,
            "right" | "true" => WritingMode::VerticalRight,
            _ => WritingMode::Horizontal,
        }
    }
}

/// Maximal run of consecutive characters on one line sharing an identical
/// style snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub state: StyleState,
}

/// One laid-out line with the measurements the rasterizer replays.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub text: String,
    /// Measured pixel width including intra-fragment spacing.
    pub width: f32,
    /// Spacing stamped per character (zero after the last character of a
    /// fragment, so advances never leak across style boundaries).
    pub char_spacings: Vec<f32>,
    pub char_font_sizes: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<Line>,
    pub size: Size2D<f32>,
    pub rotation_center: Point2D<f32>,
}

// geometry helpers

pub fn line_height(font_size: f32) -> f32 {
    font_size * 8.0 / 7.0
}

pub fn vertical_pad(font_size: f32) -> f32 {
    font_size / 7.0
}

/// Horizontal start X of a line. Left and right anchor against the surface
/// centerline rather than the edges (the flag-pole layout the host UI is
/// built around); only center uses the full width.
pub fn line_start_x(align: Align, total_width: f32, line_width: f32, outline: f32) -> f32 {
    let c = total_width / 2.0;
    match align {
        Align::Left => c - line_width - outline,
        Align::Right => c + outline,
        Align::Center => (total_width - line_width) / 2.0,
    }
}

pub fn line_baseline_y(index: usize, font_size: f32, line_break_width: f32, outline: f32) -> f32 {
    vertical_pad(font_size) + index as f32 * (line_height(font_size) + line_break_width)
        + font_size
        + outline
}

/// Physical column a logical line lands in. `VerticalLeft` reverses the
/// order so the first line reads from the right.
pub fn column_index(mode: WritingMode, line_index: usize, columns: usize) -> usize {
    match mode {
        WritingMode::VerticalLeft => {
            (columns.saturating_sub(1)).saturating_sub(line_index.min(columns.saturating_sub(1)))
        }
        _ => line_index,
    }
}

/// Left edge of a physical column. Left counts columns outward from the
/// left edge, right counts them inward from the right edge (mapped column
/// 0 is the rightmost), center spreads the whole block.
pub fn column_left(
    align: Align,
    index: usize,
    columns: usize,
    font_size: f32,
    line_break_width: f32,
    total_width: f32,
    outline: f32,
) -> f32 {
    let column_width = font_size + 2.0 * outline;
    let offset = index as f32 * (column_width + line_break_width);
    match align {
        Align::Left => outline + offset,
        Align::Right => total_width - column_width - outline - offset,
        Align::Center => {
            let block = columns as f32 * column_width
                + columns.saturating_sub(1) as f32 * line_break_width;
            (total_width - block) / 2.0 + offset
        }
    }
}

// fragmentation

/// Re-consumes the styled character stream against the wrapped line texts,
/// coalescing adjacent identical snapshots into fragments. Consumption is
/// positional: the i-th character of the concatenated lines takes the i-th
/// stream entry, so wrapping never desynchronizes styles.
pub fn fragment_lines(
    wrapped: &[String],
    stream: &[StyledChar],
) -> Vec<(String, Vec<Fragment>)> {
    let mut out = Vec::with_capacity(wrapped.len());
    let mut cursor = stream.iter();

    for line in wrapped {
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut acc: Option<Fragment> = None;

        for ch in line.chars() {
            let Some(item) = cursor.next() else { break };
            acc = Some(match acc.take() {
                None => Fragment {
                    text: ch.to_string(),
                    state: item.state.clone(),
                },
                Some(prev) if prev.state == item.state => {
                    let mut prev = prev;
                    prev.text.push(ch);
                    prev
                }
                Some(prev) => {
                    fragments.push(prev);
                    Fragment {
                        text: ch.to_string(),
                        state: item.state.clone(),
                    }
                }
            });
        }

        if let Some(frag) = acc {
            fragments.push(frag);
        }
        out.push((line.clone(), fragments));
    }

    out
}

// layout

/// Lays out the applied segment stream into measured lines and the total
/// surface geometry. `defaults` supplies the skin-level font size that
/// drives vertical metrics even when fragments override their own.
pub fn layout(
    segments: &[Segment],
    defaults: &StyleState,
    mode: WritingMode,
    wrap_chars: usize,
    line_break_width: f32,
    measurer: &mut dyn MeasureText,
) -> TextLayout {
    let wrapped = wrap_segments(segments, wrap_chars);
    let stream = char_stream(segments, defaults);
    let fragmented = fragment_lines(&wrapped, &stream);

    let outline = defaults.outline_width.max(0.0);
    let font_size = defaults.font_size;
    let lbw = if line_break_width.is_finite() {
        line_break_width
    } else {
        0.0
    };
    let lh = line_height(font_size);
    let pad_v = vertical_pad(font_size);

    let mut lines = Vec::with_capacity(fragmented.len());
    for (text, fragments) in fragmented {
        let mut width = 0.0f32;
        let mut char_spacings = Vec::new();
        let mut char_font_sizes = Vec::new();
        let mut buf = [0u8; 4];

        for fragment in &fragments {
            let count = fragment.text.chars().count();
            for (ci, ch) in fragment.text.chars().enumerate() {
                let advance = measurer.measure(
                    &fragment.state.font_family,
                    fragment.state.font_size,
                    ch.encode_utf8(&mut buf),
                );
                // Spacing applies between characters of one fragment only.
                let spacing = if !mode.is_vertical() && ci + 1 < count {
                    fragment.state.spacing
                } else {
                    0.0
                };
                width += advance + spacing;
                char_spacings.push(spacing);
                char_font_sizes.push(fragment.state.font_size);
            }
        }

        if mode.is_vertical() {
            width = measurer
                .measure(&defaults.font_family, font_size, &text)
                .max(0.0)
                + 2.0 * outline;
        }

        lines.push(Line {
            fragments,
            text,
            width,
            char_spacings,
            char_font_sizes,
        });
    }

    let (total_width, total_height) = if mode.is_vertical() {
        let columns = lines.len();
        let column_width = font_size + 2.0 * outline;
        let width = columns as f32 * column_width
            + columns.saturating_sub(1) as f32 * lbw
            + 2.0 * outline;
        let height = lines
            .iter()
            .map(|line| {
                let chars = line.text.chars().count();
                if chars == 0 {
                    font_size
                } else {
                    (chars - 1) as f32 * lh + font_size + 2.0 * pad_v + 2.0 * outline
                }
            })
            .fold(font_size, f32::max);
        (width, height)
    } else {
        let max_line = lines.iter().map(|l| l.width).fold(1.0f32, f32::max);
        // Width is doubled so both flag-pole anchors fit on the surface.
        let width = (max_line + 2.0 * outline) * 2.0;
        let n = lines.len();
        let height = n as f32 * lh
            + n.saturating_sub(1) as f32 * lbw
            + 2.0 * pad_v
            + 2.0 * outline;
        (width, height)
    };

    let size = Size2D::new(finite_or_one(total_width), finite_or_one(total_height));
    let rotation_center = Point2D::new(size.width / 2.0, font_size * 0.9 + pad_v + outline);

    TextLayout {
        lines,
        size,
        rotation_center,
    }
}

/// Floors a dimension at one pixel; NaN and infinities degrade to the
/// floor instead of poisoning the surface allocation.
fn finite_or_one(v: f32) -> f32 {
    let v = v.max(1.0);
    if v.is_infinite() { 1.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::markup::parse;
    use crate::text::style::StyleChange;

    /// Fixed 10px advance per character, independent of font and size.
    struct FixedAdvance;
    impl MeasureText for FixedAdvance {
        fn measure(&mut self, _family: &str, _size: f32, text: &str) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn layout_default(text: &str, mode: WritingMode, lbw: f32) -> TextLayout {
        let defaults = StyleState::default();
        let segments = parse(text, &defaults, None);
        layout(&segments, &defaults, mode, 0, lbw, &mut FixedAdvance)
    }

    #[test]
    fn adjacent_identical_styles_coalesce() {
        let segments = vec![
            Segment::Text("ab".to_string()),
            Segment::Text("cd".to_string()),
        ];
        let out = layout(
            &segments,
            &StyleState::default(),
            WritingMode::Horizontal,
            0,
            0.0,
            &mut FixedAdvance,
        );
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].fragments.len(), 1);
        assert_eq!(out.lines[0].fragments[0].text, "abcd");
    }

    #[test]
    fn one_field_difference_splits_fragments() {
        let segments = vec![
            Segment::Text("ab".to_string()),
            Segment::State(StyleChange::Alpha(50.0)),
            Segment::Text("cd".to_string()),
        ];
        let out = layout(
            &segments,
            &StyleState::default(),
            WritingMode::Horizontal,
            0,
            0.0,
            &mut FixedAdvance,
        );
        assert_eq!(out.lines[0].fragments.len(), 2);
    }

    #[test]
    fn spacing_applies_within_fragment() {
        let segments = vec![
            Segment::State(StyleChange::Spacing(7.0)),
            Segment::Text("abc".to_string()),
        ];
        let out = layout(
            &segments,
            &StyleState::default(),
            WritingMode::Horizontal,
            0,
            0.0,
            &mut FixedAdvance,
        );
        // 3 chars * 10px + 2 gaps * 7px.
        assert!(close(out.lines[0].width, 44.0));
        assert_eq!(out.lines[0].char_spacings, vec![7.0, 7.0, 0.0]);
    }

    #[test]
    fn spacing_does_not_cross_fragment_boundary() {
        let segments = vec![
            Segment::State(StyleChange::Spacing(7.0)),
            Segment::Text("ab".to_string()),
            Segment::State(StyleChange::Spacing(5.0)),
            Segment::Text("c".to_string()),
        ];
        let out = layout(
            &segments,
            &StyleState::default(),
            WritingMode::Horizontal,
            0,
            0.0,
            &mut FixedAdvance,
        );
        // 30px of glyphs + one 7px gap inside "ab", nothing before "c".
        assert!(close(out.lines[0].width, 37.0));
    }

    #[test]
    fn horizontal_totals() {
        let out = layout_default("ab", WritingMode::Horizontal, 0.0);
        let fs = 24.0;
        // (20px line + 0 outline) doubled.
        assert!(close(out.size.width, 40.0));
        assert!(close(out.size.height, line_height(fs) + 2.0 * vertical_pad(fs)));
        assert!(close(out.rotation_center.x, out.size.width / 2.0));
        assert!(close(out.rotation_center.y, fs * 0.9 + vertical_pad(fs)));
    }

    #[test]
    fn baseline_step_includes_line_break_width() {
        let fs = 24.0;
        let y0 = line_baseline_y(0, fs, 5.0, 0.0);
        let y1 = line_baseline_y(1, fs, 5.0, 0.0);
        assert!(close(y1 - y0, line_height(fs) + 5.0));
        assert!(close(y0, vertical_pad(fs) + fs));
    }

    #[test]
    fn alignment_anchors() {
        assert!(close(line_start_x(Align::Left, 100.0, 30.0, 2.0), 18.0));
        assert!(close(line_start_x(Align::Right, 100.0, 30.0, 2.0), 52.0));
        assert!(close(line_start_x(Align::Center, 100.0, 30.0, 2.0), 35.0));
    }

    #[test]
    fn host_vertical_values_map_to_modes() {
        assert_eq!(WritingMode::from_host_value("left"), WritingMode::VerticalLeft);
        assert_eq!(WritingMode::from_host_value("right"), WritingMode::VerticalRight);
        assert_eq!(WritingMode::from_host_value("true"), WritingMode::VerticalRight);
        assert_eq!(WritingMode::from_host_value("off"), WritingMode::Horizontal);
        assert!(!WritingMode::Horizontal.is_vertical());
        assert!(WritingMode::VerticalLeft.is_vertical());
    }

    #[test]
    fn vertical_left_reverses_columns() {
        assert_eq!(column_index(WritingMode::VerticalLeft, 0, 3), 2);
        assert_eq!(column_index(WritingMode::VerticalLeft, 2, 3), 0);
        assert_eq!(column_index(WritingMode::VerticalRight, 0, 3), 0);
        assert_eq!(column_index(WritingMode::VerticalRight, 2, 3), 2);
    }

    #[test]
    fn vertical_column_left_edges_per_alignment() {
        // 2 columns, 24px font, no outline, no gap, 48px surface.
        assert!(close(column_left(Align::Left, 0, 2, 24.0, 0.0, 48.0, 0.0), 0.0));
        assert!(close(column_left(Align::Left, 1, 2, 24.0, 0.0, 48.0, 0.0), 24.0));
        // Right counts inward: mapped column 0 occupies the rightmost slot.
        assert!(close(column_left(Align::Right, 0, 2, 24.0, 0.0, 48.0, 0.0), 24.0));
        assert!(close(column_left(Align::Right, 1, 2, 24.0, 0.0, 48.0, 0.0), 0.0));
        // Center spreads the block: 2*24 + 2 = 50 inside 100.
        assert!(close(column_left(Align::Center, 0, 2, 24.0, 2.0, 100.0, 0.0), 25.0));
        assert!(close(column_left(Align::Center, 1, 2, 24.0, 2.0, 100.0, 0.0), 51.0));
        // Outline pads each edge: column width 26, offset step 28.
        assert!(close(column_left(Align::Right, 1, 2, 24.0, 2.0, 60.0, 1.0), 5.0));
    }

    #[test]
    fn vertical_totals() {
        let out = layout_default("ab</n>c", WritingMode::VerticalRight, 5.0);
        let fs = 24.0;
        // Two columns of width fs, one 5px gap, plus the outer outline pad.
        assert!(close(out.size.width, 2.0 * fs + 5.0));
        // Tallest column has 2 chars.
        assert!(close(
            out.size.height,
            line_height(fs) + fs + 2.0 * vertical_pad(fs)
        ));
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let out = layout_default("", WritingMode::Horizontal, 0.0);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].text, "");
        assert!(out.size.width >= 1.0 && out.size.height >= 1.0);
    }

    #[test]
    fn end_to_end_markup_layout() {
        // A line break is a layout marker only: color set before it keeps
        // applying until an explicit reset.
        let out = layout_default("<color=\"#00ff00\">Hi</n>Bye", WritingMode::Horizontal, 0.0);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0].fragments[0].state.color, "#00ff00");
        assert_eq!(out.lines[1].fragments[0].state.color, "#00ff00");
        assert_eq!(out.lines[1].text, "Bye");

        let out = layout_default(
            "<color=\"#00ff00\">Hi</n></color>Bye",
            WritingMode::Horizontal,
            0.0,
        );
        assert_eq!(out.lines[1].fragments[0].state.color, "#000000");
    }

    #[test]
    fn nan_spacing_fragments_per_character() {
        let segments = vec![
            Segment::State(StyleChange::Spacing(f32::NAN)),
            Segment::Text("ab".to_string()),
        ];
        let out = layout(
            &segments,
            &StyleState::default(),
            WritingMode::Horizontal,
            0,
            0.0,
            &mut FixedAdvance,
        );
        // NaN never equals NaN, so every character is its own fragment and
        // the intra-fragment spacing never applies.
        assert_eq!(out.lines[0].fragments.len(), 2);
        assert!(close(out.lines[0].width, 20.0));
        assert_eq!(out.lines[0].char_spacings, vec![0.0, 0.0]);
        assert!(out.size.width.is_finite() && out.size.width >= 1.0);
    }
}
