use crate::text::markup::Segment;

/// Assembles the raw line texts from the applied segment stream.
///
/// Text runs are concatenated in order and explicit line breaks start a new
/// entry. The result always contains at least one line (possibly empty).
pub fn split_lines(segments: &[Segment]) -> Vec<String> {
    let mut lines = vec![String::new()];

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                // `lines` is never empty, so last_mut always succeeds.
                if let Some(last) = lines.last_mut() {
                    last.push_str(text);
                }
            }
            Segment::LineBreak => lines.push(String::new()),
            Segment::State(_) => {}
        }
    }

    lines
}

/// Splits `text` on literal newlines, then chunks each resulting line into
/// runs of `max_chars` characters. `max_chars == 0` disables length-based
/// wrapping. Empty lines survive as `""` so vertical spacing stays stable.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();

    for line in text.split('\n') {
        if max_chars == 0 || line.is_empty() {
            out.push(line.to_string());
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(max_chars) {
            out.push(chunk.iter().collect());
        }
    }

    out
}

/// Full wrapping pass: explicit breaks first, then fixed-count chunking.
pub fn wrap_segments(segments: &[Segment], max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in split_lines(segments) {
        out.extend(wrap(&line, max_chars));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_count_chunking() {
        assert_eq!(wrap("abcdef", 2), vec!["ab", "cd", "ef"]);
        assert_eq!(wrap("abcde", 2), vec!["ab", "cd", "e"]);
    }

    #[test]
    fn empty_input_keeps_one_empty_line() {
        assert_eq!(wrap("", 2), vec![""]);
    }

    #[test]
    fn zero_disables_length_wrapping() {
        assert_eq!(wrap("abcdef", 0), vec!["abcdef"]);
        assert_eq!(wrap("ab\ncd", 0), vec!["ab", "cd"]);
    }

    #[test]
    fn empty_lines_are_preserved() {
        assert_eq!(wrap("a\n\nb", 3), vec!["a", "", "b"]);
    }

    #[test]
    fn untagged_text_without_wrap_is_single_line() {
        let segments = vec![Segment::Text("hello world".to_string())];
        assert_eq!(wrap_segments(&segments, 0), vec!["hello world"]);
    }

    #[test]
    fn explicit_breaks_and_chunking_compose() {
        let segments = vec![
            Segment::Text("abcd".to_string()),
            Segment::LineBreak,
            Segment::Text("ef".to_string()),
        ];
        assert_eq!(wrap_segments(&segments, 3), vec!["abc", "d", "ef"]);
    }

    #[test]
    fn multibyte_characters_count_as_one() {
        assert_eq!(wrap("あいうえお", 2), vec!["あい", "うえ", "お"]);
    }
}
