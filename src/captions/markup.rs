//! Inline caption markup.
//!
//! Captions may carry style regions like `[zoom]hey[/zoom]`,
//! `[shake]wow[/shake]` and `[color=#ff0000]red[/color]`. Tags nest, and a
//! nested region carries the union of every enclosing tag. This is a
//! best-effort format, not XML: only well-formed balanced pairs are
//! recognized, everything else stays literal text. The caption is split on
//! whitespace first, one line per word, for vertical typesetting.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Zoom,
    Shake,
    /// Color spec as written, e.g. `#ff0000`. Empty or unparseable values
    /// fall back to the default glyph color at render time.
    Color(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionSegment {
    pub text: String,
    pub tags: Vec<Tag>,
}

impl CaptionSegment {
    pub fn is_zoom(&self) -> bool {
        self.tags.iter().any(|t| matches!(t, Tag::Zoom))
    }

    pub fn is_shake(&self) -> bool {
        self.tags.iter().any(|t| matches!(t, Tag::Shake))
    }

    pub fn color(&self) -> Option<&str> {
        self.tags.iter().find_map(|t| match t {
            Tag::Color(value) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        })
    }
}

/// One line of vertical text: a single word, split into styled segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionLine {
    pub segments: Vec<CaptionSegment>,
}

pub fn parse_caption_text(text: &str) -> Vec<CaptionLine> {
    text.split_whitespace()
        .map(|word| {
            let mut segments = Vec::new();
            parse_region(word, &[], &mut segments);
            CaptionLine { segments }
        })
        .filter(|line| !line.segments.is_empty())
        .collect()
}

/// A well-formed `[tag]...[/tag]` pair found inside a word.
struct TagMatch {
    open_start: usize,
    content_start: usize,
    content_end: usize,
    close_end: usize,
    tag: Tag,
}

fn parse_region(input: &str, active: &[Tag], segments: &mut Vec<CaptionSegment>) {
    let mut cursor = 0;
    let mut last_end = 0;
    let mut found_any = false;

    while let Some(m) = next_tag_match(input, cursor) {
        found_any = true;
        if m.open_start > last_end {
            segments.push(CaptionSegment {
                text: input[last_end..m.open_start].to_string(),
                tags: active.to_vec(),
            });
        }

        let mut nested = active.to_vec();
        nested.push(m.tag);
        parse_region(&input[m.content_start..m.content_end], &nested, segments);

        cursor = m.close_end;
        last_end = m.close_end;
    }

    if !found_any {
        if !input.is_empty() {
            segments.push(CaptionSegment {
                text: input.to_string(),
                tags: active.to_vec(),
            });
        }
    } else if last_end < input.len() {
        segments.push(CaptionSegment {
            text: input[last_end..].to_string(),
            tags: active.to_vec(),
        });
    }
}

/// Scans from `from` for the next balanced pair. An opening tag with no
/// matching close is skipped over and stays literal text.
fn next_tag_match(input: &str, mut from: usize) -> Option<TagMatch> {
    let bytes = input.as_bytes();
    while from < bytes.len() {
        let open_start = find_byte(bytes, b'[', from)?;
        if let Some((tag, name, content_start)) = parse_open_tag(input, open_start) {
            let close = format!("[/{name}]");
            if let Some(rel) = input[content_start..].find(&close) {
                let content_end = content_start + rel;
                return Some(TagMatch {
                    open_start,
                    content_start,
                    content_end,
                    close_end: content_end + close.len(),
                    tag,
                });
            }
        }
        from = open_start + 1;
    }
    None
}

/// Parses `[name]` or `[name=value]` at `open_start`, returning the tag, its
/// name, and the offset just past the `]`. Values cannot contain `]`.
fn parse_open_tag(input: &str, open_start: usize) -> Option<(Tag, &'static str, usize)> {
    let rest = &input[open_start + 1..];
    let close = rest.find(']')?;
    let inner = &rest[..close];
    if inner.starts_with('/') {
        return None;
    }
    let (name, value) = match inner.split_once('=') {
        Some((name, value)) => (name, value),
        None => (inner, ""),
    };
    let (tag, name) = match name {
        "zoom" => (Tag::Zoom, "zoom"),
        "shake" => (Tag::Shake, "shake"),
        "color" => (Tag::Color(value.to_string()), "color"),
        _ => return None,
    };
    Some((tag, name, open_start + 1 + close + 1))
}

fn find_byte(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, tags: Vec<Tag>) -> CaptionSegment {
        CaptionSegment {
            text: text.to_string(),
            tags,
        }
    }

    #[test]
    fn plain_words_become_untagged_lines() {
        let lines = parse_caption_text("hello there");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].segments, vec![segment("hello", vec![])]);
        assert_eq!(lines[1].segments, vec![segment("there", vec![])]);
    }

    #[test]
    fn color_tag_with_value() {
        let lines = parse_caption_text("[color=#ff0000]hi[/color] there");
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].segments,
            vec![segment("hi", vec![Tag::Color("#ff0000".into())])]
        );
        assert_eq!(lines[1].segments, vec![segment("there", vec![])]);
    }

    #[test]
    fn zoom_tag() {
        let lines = parse_caption_text("[zoom]a[/zoom]");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].segments, vec![segment("a", vec![Tag::Zoom])]);
    }

    #[test]
    fn unterminated_tag_stays_literal() {
        let lines = parse_caption_text("[zoom]a");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].segments, vec![segment("[zoom]a", vec![])]);
    }

    #[test]
    fn unknown_tag_stays_literal() {
        let lines = parse_caption_text("[blink]a[/blink]");
        assert_eq!(lines[0].segments, vec![segment("[blink]a[/blink]", vec![])]);
    }

    #[test]
    fn nested_tags_accumulate() {
        let lines = parse_caption_text("[zoom][shake]ab[/shake][/zoom]");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].segments,
            vec![segment("ab", vec![Tag::Zoom, Tag::Shake])]
        );
    }

    #[test]
    fn mixed_tagged_and_plain_within_a_word() {
        let lines = parse_caption_text("ab[zoom]cd[/zoom]ef");
        assert_eq!(
            lines[0].segments,
            vec![
                segment("ab", vec![]),
                segment("cd", vec![Tag::Zoom]),
                segment("ef", vec![]),
            ]
        );
    }

    #[test]
    fn sibling_tags_within_a_word() {
        let lines = parse_caption_text("[zoom]a[/zoom][shake]b[/shake]");
        assert_eq!(
            lines[0].segments,
            vec![segment("a", vec![Tag::Zoom]), segment("b", vec![Tag::Shake])]
        );
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(parse_caption_text("").is_empty());
        assert!(parse_caption_text("   \t  ").is_empty());
    }

    #[test]
    fn valueless_color_has_no_effective_color() {
        let lines = parse_caption_text("[color]x[/color]");
        let seg = &lines[0].segments[0];
        assert_eq!(seg.tags, vec![Tag::Color(String::new())]);
        assert_eq!(seg.color(), None);
    }

    #[test]
    fn multibyte_text_inside_tags() {
        let lines = parse_caption_text("[zoom]你好[/zoom]");
        assert_eq!(lines[0].segments, vec![segment("你好", vec![Tag::Zoom])]);
    }
}
