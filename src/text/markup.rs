use crate::text::style::{StyleChange, StyleState, coerce_number};

/// Built-in font display names recognized before the external registry is
/// consulted. Matching is case-insensitive; the canonical spelling is kept.
pub const BUILTIN_FONTS: [&str; 7] = [
    "Sans Serif",
    "Serif",
    "Handwriting",
    "Marker",
    "Curly",
    "Pixel",
    "Scratch",
];

/// One entry of the host's font registry.
#[derive(Clone, Debug, PartialEq)]
pub struct FontEntry {
    /// Display name shown to users.
    pub name: String,
    /// Family string the rendering backend understands.
    pub family: String,
}

/// External font registry collaborator. Absence is a valid state; resolution
/// then falls back to literal pass-through.
pub trait FontRegistry {
    fn fonts(&self) -> Vec<FontEntry>;
}

/// Applied segment stream produced by [`parse`].
///
/// Reset tags are already replayed against the defaults that were current at
/// parse time, so consumers only ever see absolute state changes.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Text(String),
    State(StyleChange),
    LineBreak,
}

/// Tokenizer output, before defaults are baked in.
#[derive(Clone, Debug, PartialEq)]
enum RawSegment {
    Text(String),
    Set(AttrKey, String),
    Reset(ResetKey),
    LineBreak,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AttrKey {
    Color,
    Font,
    FontSize,
    Spacing,
    Alpha,
    Thickness,
    OutlineColor,
    OutlineWidth,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ResetKey {
    Color,
    Font,
    FontSize,
    Spacing,
    Alpha,
    Thickness,
    /// Clears both outline color and outline width.
    Edge,
    OutlineColor,
    OutlineWidth,
}

/// Resolves a user-facing font name to a renderable family string.
///
/// Quotes are stripped first, then the built-in list is matched
/// case-insensitively, then the registry by display name or family. Unknown
/// names pass through unchanged so hosts can register fonts later without a
/// grammar change.
pub fn resolve_font_name(name: &str, registry: Option<&dyn FontRegistry>) -> String {
    let stripped = strip_quotes(name).trim().to_string();
    if stripped.is_empty() {
        return crate::text::style::DEFAULT_FONT.to_string();
    }

    for builtin in BUILTIN_FONTS {
        if builtin.eq_ignore_ascii_case(&stripped) {
            return builtin.to_string();
        }
    }

    if let Some(registry) = registry {
        for entry in registry.fonts() {
            if entry.name.eq_ignore_ascii_case(&stripped)
                || entry.family.eq_ignore_ascii_case(&stripped)
            {
                return entry.family;
            }
        }
    }

    stripped
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}

/// Parses inline markup into the applied segment stream.
///
/// `defaults` is the skin's current default style: reset tags bake these
/// values in, which is why callers re-parse on every reflow instead of only
/// when the raw text changes.
pub fn parse(
    text: &str,
    defaults: &StyleState,
    registry: Option<&dyn FontRegistry>,
) -> Vec<Segment> {
    let raw = tokenize(text);
    let mut out = Vec::with_capacity(raw.len());

    for segment in raw {
        match segment {
            RawSegment::Text(t) => out.push(Segment::Text(t)),
            RawSegment::LineBreak => out.push(Segment::LineBreak),
            RawSegment::Set(key, value) => out.push(Segment::State(match key {
                AttrKey::Color => StyleChange::Color(value),
                AttrKey::Font => StyleChange::FontFamily(resolve_font_name(&value, registry)),
                AttrKey::FontSize => StyleChange::FontSize(coerce_number(&value)),
                AttrKey::Spacing => StyleChange::Spacing(coerce_number(&value)),
                AttrKey::Alpha => StyleChange::Alpha(coerce_number(&value)),
                AttrKey::Thickness => StyleChange::Thickness(coerce_number(&value)),
                AttrKey::OutlineColor => StyleChange::OutlineColor(value),
                AttrKey::OutlineWidth => StyleChange::OutlineWidth(coerce_number(&value)),
            })),
            RawSegment::Reset(key) => match key {
                ResetKey::Color => {
                    out.push(Segment::State(StyleChange::Color(defaults.color.clone())));
                }
                ResetKey::Font => {
                    out.push(Segment::State(StyleChange::FontFamily(
                        defaults.font_family.clone(),
                    )));
                }
                ResetKey::FontSize => {
                    out.push(Segment::State(StyleChange::FontSize(defaults.font_size)));
                }
                ResetKey::Spacing => {
                    out.push(Segment::State(StyleChange::Spacing(defaults.spacing)));
                }
                ResetKey::Alpha => {
                    out.push(Segment::State(StyleChange::Alpha(defaults.alpha)));
                }
                ResetKey::Thickness => {
                    out.push(Segment::State(StyleChange::Thickness(defaults.thickness)));
                }
                ResetKey::Edge => {
                    out.push(Segment::State(StyleChange::OutlineColor(
                        defaults.outline_color.clone(),
                    )));
                    out.push(Segment::State(StyleChange::OutlineWidth(
                        defaults.outline_width,
                    )));
                }
                ResetKey::OutlineColor => {
                    out.push(Segment::State(StyleChange::OutlineColor(
                        defaults.outline_color.clone(),
                    )));
                }
                ResetKey::OutlineWidth => {
                    out.push(Segment::State(StyleChange::OutlineWidth(
                        defaults.outline_width,
                    )));
                }
            },
        }
    }

    out
}

fn reset_key_for_tag(tag: &str) -> Option<ResetKey> {
    match tag {
        "color" => Some(ResetKey::Color),
        "font" => Some(ResetKey::Font),
        "f_size" | "fsize" => Some(ResetKey::FontSize),
        "space" => Some(ResetKey::Spacing),
        "alpha" => Some(ResetKey::Alpha),
        "thickness" => Some(ResetKey::Thickness),
        "edge" => Some(ResetKey::Edge),
        _ => None,
    }
}

fn tokenize(text: &str) -> Vec<RawSegment> {
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after_lt) = rest.strip_prefix('<') {
            let Some(close) = after_lt.find('>') else {
                // Unterminated tag: everything from here on is literal.
                out.push(RawSegment::Text(rest.to_string()));
                break;
            };
            let body = &after_lt[..close];
            let consumed = &rest[..close + 2];

            let raw = body.trim();
            let raw_lower = raw.to_ascii_lowercase();
            rest = &after_lt[close + 1..];

            if raw_lower == "/n" {
                out.push(RawSegment::LineBreak);
                continue;
            }

            // `</tag>` or a bare `<tag>` with no attributes resets a property.
            let reset_name = if let Some(tag) = raw_lower.strip_prefix('/') {
                Some(tag)
            } else if !raw_lower.contains('=') {
                Some(raw_lower.as_str())
            } else {
                None
            };
            if let Some(key) = reset_name.and_then(reset_key_for_tag) {
                out.push(RawSegment::Reset(key));
                continue;
            }

            let mut recognized_any = false;
            for (key, value) in scan_attributes(raw) {
                let attr = match key.as_str() {
                    "color" => AttrKey::Color,
                    "font" => AttrKey::Font,
                    "f_size" | "fsize" => AttrKey::FontSize,
                    "space" => AttrKey::Spacing,
                    "alpha" => AttrKey::Alpha,
                    "thickness" => AttrKey::Thickness,
                    "c" => AttrKey::OutlineColor,
                    "t" => AttrKey::OutlineWidth,
                    // Unknown keys are dropped without complaint.
                    _ => continue,
                };
                recognized_any = true;
                if value.eq_ignore_ascii_case("default") {
                    out.push(RawSegment::Reset(match attr {
                        AttrKey::Color => ResetKey::Color,
                        AttrKey::Font => ResetKey::Font,
                        AttrKey::FontSize => ResetKey::FontSize,
                        AttrKey::Spacing => ResetKey::Spacing,
                        AttrKey::Alpha => ResetKey::Alpha,
                        AttrKey::Thickness => ResetKey::Thickness,
                        AttrKey::OutlineColor => ResetKey::OutlineColor,
                        AttrKey::OutlineWidth => ResetKey::OutlineWidth,
                    }));
                } else {
                    out.push(RawSegment::Set(attr, value));
                }
            }

            if !recognized_any {
                // Not a tag we understand: keep it visible, brackets included.
                out.push(RawSegment::Text(consumed.to_string()));
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            out.push(RawSegment::Text(rest[..end].to_string()));
            rest = &rest[end..];
        }
    }

    out
}

/// Extracts `key="value"` pairs from a tag body.
///
/// Keys are `[a-zA-Z_][a-zA-Z0-9_]*` and lowercased; values may be double
/// quoted, single quoted, or a bare run up to whitespace. Anything that does
/// not fit the shape is skipped over; the grammar never rejects input.
fn scan_attributes(raw: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
            i += 1;
            continue;
        }

        let key_start = i;
        let mut j = i + 1;
        while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
            j += 1;
        }
        let key: String = chars[key_start..j].iter().collect();

        let mut k = j;
        while k < chars.len() && chars[k].is_whitespace() {
            k += 1;
        }
        if k >= chars.len() || chars[k] != '=' {
            // No `=` after the identifier; resume scanning past its head.
            i = key_start + 1;
            continue;
        }
        k += 1;
        while k < chars.len() && chars[k].is_whitespace() {
            k += 1;
        }
        if k >= chars.len() {
            break;
        }

        let value: String;
        if chars[k] == '"' || chars[k] == '\'' {
            let quote = chars[k];
            if let Some(end) = chars[k + 1..].iter().position(|&c| c == quote) {
                value = chars[k + 1..k + 1 + end].iter().collect();
                i = k + end + 2;
            } else {
                // Unterminated quote falls back to the bare-token rule.
                let mut e = k;
                while e < chars.len() && !chars[e].is_whitespace() {
                    e += 1;
                }
                value = chars[k..e].iter().collect();
                i = e;
            }
        } else {
            let mut e = k;
            while e < chars.len() && !chars[e].is_whitespace() {
                e += 1;
            }
            value = chars[k..e].iter().collect();
            i = e;
        }

        out.push((key.to_ascii_lowercase(), value));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::style::{DEFAULT_COLOR, DEFAULT_FONT_SIZE};

    fn parse_default(text: &str) -> Vec<Segment> {
        parse(text, &StyleState::default(), None)
    }

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(
            parse_default("hello"),
            vec![Segment::Text("hello".to_string())]
        );
    }

    #[test]
    fn color_tag_and_line_break() {
        let segments = parse_default("<color=\"#ff0000\">X</n>Y");
        assert_eq!(
            segments,
            vec![
                Segment::State(StyleChange::Color("#ff0000".to_string())),
                Segment::Text("X".to_string()),
                Segment::LineBreak,
                Segment::Text("Y".to_string()),
            ]
        );
    }

    #[test]
    fn closing_tag_resets_to_parse_time_default() {
        let segments = parse_default("</color>");
        assert_eq!(
            segments,
            vec![Segment::State(StyleChange::Color(DEFAULT_COLOR.to_string()))]
        );
    }

    #[test]
    fn default_value_equals_closing_tag() {
        assert_eq!(
            parse_default("<color=\"default\">"),
            parse_default("</color>")
        );
    }

    #[test]
    fn bare_tag_resets_too() {
        let segments = parse_default("<thickness>");
        assert_eq!(segments, vec![Segment::State(StyleChange::Thickness(1.0))]);
    }

    #[test]
    fn edge_reset_clears_color_and_width() {
        let segments = parse_default("</edge>");
        assert_eq!(segments.len(), 2);
        assert!(matches!(
            segments[0],
            Segment::State(StyleChange::OutlineColor(_))
        ));
        assert!(
            matches!(segments[1], Segment::State(StyleChange::OutlineWidth(w)) if w == 0.0)
        );
    }

    #[test]
    fn multi_attribute_tag_emits_in_order() {
        let segments = parse_default("<c=\"#ffffff\" t=\"2\">");
        assert_eq!(
            segments,
            vec![
                Segment::State(StyleChange::OutlineColor("#ffffff".to_string())),
                Segment::State(StyleChange::OutlineWidth(2.0)),
            ]
        );
    }

    #[test]
    fn quote_styles_and_bare_values() {
        assert_eq!(
            parse_default("<alpha='50'>"),
            vec![Segment::State(StyleChange::Alpha(50.0))]
        );
        assert_eq!(
            parse_default("<alpha=50>"),
            vec![Segment::State(StyleChange::Alpha(50.0))]
        );
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(
            parse_default("<COLOR=\"#123456\">"),
            vec![Segment::State(StyleChange::Color("#123456".to_string()))]
        );
    }

    #[test]
    fn fsize_aliases() {
        assert_eq!(
            parse_default("<f_size=\"30\">"),
            parse_default("<fsize=\"30\">")
        );
        assert_eq!(
            parse_default("</fsize>"),
            vec![Segment::State(StyleChange::FontSize(DEFAULT_FONT_SIZE))]
        );
    }

    #[test]
    fn unterminated_tag_is_literal() {
        assert_eq!(
            parse_default("a<color"),
            vec![
                Segment::Text("a".to_string()),
                Segment::Text("<color".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_tag_is_literal() {
        assert_eq!(
            parse_default("<blink>"),
            vec![Segment::Text("<blink>".to_string())]
        );
        assert_eq!(
            parse_default("<foo=\"1\">"),
            vec![Segment::Text("<foo=\"1\">".to_string())]
        );
    }

    #[test]
    fn unknown_key_is_ignored_next_to_recognized_one() {
        let segments = parse_default("<foo=\"1\" alpha=\"25\">");
        assert_eq!(segments, vec![Segment::State(StyleChange::Alpha(25.0))]);
    }

    #[test]
    fn bad_number_becomes_nan() {
        let segments = parse_default("<alpha=\"oops\">");
        assert!(matches!(segments[0], Segment::State(StyleChange::Alpha(a)) if a.is_nan()));
    }

    #[test]
    fn builtin_font_name_is_canonicalized() {
        assert_eq!(resolve_font_name("serif", None), "Serif");
        assert_eq!(resolve_font_name("\"sans serif\"", None), "Sans Serif");
    }

    #[test]
    fn registry_resolves_display_name_to_family() {
        struct OneFont;
        impl FontRegistry for OneFont {
            fn fonts(&self) -> Vec<FontEntry> {
                vec![FontEntry {
                    name: "My Font".to_string(),
                    family: "MyFont-Regular".to_string(),
                }]
            }
        }

        assert_eq!(
            resolve_font_name("my font", Some(&OneFont)),
            "MyFont-Regular"
        );
        assert_eq!(
            resolve_font_name("myfont-regular", Some(&OneFont)),
            "MyFont-Regular"
        );
        // Unknown names pass through for forward compatibility.
        assert_eq!(resolve_font_name("Nope", Some(&OneFont)), "Nope");
    }

    #[test]
    fn font_attribute_resolves_at_parse_time() {
        let segments = parse_default("<font=\"pixel\">");
        assert_eq!(
            segments,
            vec![Segment::State(StyleChange::FontFamily("Pixel".to_string()))]
        );
    }
}
