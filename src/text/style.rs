use crate::text::markup::Segment;

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_FONT: &str = "Sans Serif";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
pub const DEFAULT_OUTLINE_WIDTH: f32 = 0.0;
pub const DEFAULT_ALPHA: f32 = 100.0;
pub const DEFAULT_SPACING: f32 = 0.0;
pub const DEFAULT_THICKNESS: f32 = 1.0;

/// Full per-character style record.
///
/// A skin keeps one of these as its default set; the replay pass keeps a
/// mutable accumulator and stamps every emitted character with a snapshot.
/// Fragment coalescing compares whole records, so every field here takes
/// part in the "identical style" decision.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleState {
    /// Fill color, as written in the markup (`#rrggbb` and friends).
    pub color: String,
    /// Opacity in percent, `0.0..=100.0`.
    pub alpha: f32,
    pub font_family: String,
    pub font_size: f32,
    /// Extra advance inserted between consecutive characters, in px.
    pub spacing: f32,
    /// Faux-bold strength. `1.0` is a plain fill.
    pub thickness: f32,
    pub outline_color: String,
    pub outline_width: f32,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            alpha: DEFAULT_ALPHA,
            font_family: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            spacing: DEFAULT_SPACING,
            thickness: DEFAULT_THICKNESS,
            outline_color: DEFAULT_OUTLINE_COLOR.to_string(),
            outline_width: DEFAULT_OUTLINE_WIDTH,
        }
    }
}

/// Single absolute style mutation produced by the markup parser.
///
/// Reset tags are already resolved into plain changes carrying the default
/// value that was current at parse time.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleChange {
    Color(String),
    Alpha(f32),
    FontFamily(String),
    FontSize(f32),
    Spacing(f32),
    Thickness(f32),
    OutlineColor(String),
    OutlineWidth(f32),
}

impl StyleState {
    /// Applies one mutation to the accumulator. Never retroactive: characters
    /// stamped before the change keep their snapshots.
    pub fn apply(&mut self, change: &StyleChange) {
        match change {
            StyleChange::Color(v) => self.color = v.clone(),
            StyleChange::Alpha(v) => self.alpha = *v,
            StyleChange::FontFamily(v) => self.font_family = v.clone(),
            StyleChange::FontSize(v) => self.font_size = *v,
            StyleChange::Spacing(v) => self.spacing = *v,
            StyleChange::Thickness(v) => self.thickness = *v,
            StyleChange::OutlineColor(v) => self.outline_color = v.clone(),
            StyleChange::OutlineWidth(v) => self.outline_width = *v,
        }
    }
}

/// One visible character together with its style snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct StyledChar {
    pub ch: char,
    pub state: StyleState,
}

/// Replays the applied segment stream into the ordered character stream.
///
/// Line breaks are layout markers and consume no character here; wrapping
/// re-synchronizes against this stream by character count.
pub fn char_stream(segments: &[Segment], defaults: &StyleState) -> Vec<StyledChar> {
    let mut out = Vec::new();
    let mut current = defaults.clone();

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                for ch in text.chars() {
                    out.push(StyledChar {
                        ch,
                        state: current.clone(),
                    });
                }
            }
            Segment::State(change) => current.apply(change),
            Segment::LineBreak => {}
        }
    }

    out
}

/// Numeric coercion with the permissive semantics of a live-editing host:
/// blank input means zero, garbage becomes NaN and stays visible downstream
/// instead of failing the call.
pub fn coerce_number(value: &str) -> f32 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f32>().unwrap_or(f32::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_stamps_snapshot_at_emission() {
        let segments = vec![
            Segment::Text("a".to_string()),
            Segment::State(StyleChange::Color("#ff0000".to_string())),
            Segment::Text("b".to_string()),
        ];
        let stream = char_stream(&segments, &StyleState::default());

        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].ch, 'a');
        assert_eq!(stream[0].state.color, DEFAULT_COLOR);
        assert_eq!(stream[1].ch, 'b');
        assert_eq!(stream[1].state.color, "#ff0000");
    }

    #[test]
    fn state_change_is_not_retroactive() {
        let segments = vec![
            Segment::Text("xy".to_string()),
            Segment::State(StyleChange::Thickness(3.0)),
        ];
        let stream = char_stream(&segments, &StyleState::default());
        assert!(stream.iter().all(|c| c.state.thickness == 1.0));
    }

    #[test]
    fn line_break_consumes_no_character() {
        let segments = vec![
            Segment::Text("a".to_string()),
            Segment::LineBreak,
            Segment::Text("b".to_string()),
        ];
        assert_eq!(char_stream(&segments, &StyleState::default()).len(), 2);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_number("12.5"), 12.5);
        assert_eq!(coerce_number("  7 "), 7.0);
        assert_eq!(coerce_number(""), 0.0);
        assert!(coerce_number("abc").is_nan());
    }
}
