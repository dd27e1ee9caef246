//! Keyword extraction, color assignment and highlighted-text rendering.
//!
//! Everything here is pure: it runs on every keystroke and must not touch the
//! network or any shared state.

use crate::models::ColorToken;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Cleaned tokens must be longer than this to count as keywords.
pub const MIN_KEYWORD_LEN: usize = 3;

// ============================================================================
// Extraction
// ============================================================================

/// Matches the `\w` class of the editor: ASCII letters, digits, underscore.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extract candidate keywords from raw text.
///
/// Words are split on whitespace, stripped of non-word characters and
/// lowercased. Tokens of length 3 or less are dropped, duplicates keep their
/// first appearance.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        let clean: String = word.chars().filter(|&c| is_word_char(c)).collect();
        if clean.len() <= MIN_KEYWORD_LEN {
            continue;
        }
        let clean = clean.to_lowercase();
        if !keywords.contains(&clean) {
            keywords.push(clean);
        }
    }

    keywords
}

/// The most recently typed keyword, i.e. the last one in extraction order.
pub fn current_keyword(keywords: &[String]) -> Option<&str> {
    keywords.last().map(String::as_str)
}

// ============================================================================
// Colors
// ============================================================================

/// Deterministic two-color hash: sum of UTF-16 code units plus the UTF-16
/// length, even maps to mint and odd to sky. Empty keywords get the default.
pub fn keyword_color(keyword: &str) -> ColorToken {
    if keyword.is_empty() {
        return ColorToken::DEFAULT;
    }

    let (sum, len) = keyword
        .encode_utf16()
        .fold((0u64, 0u64), |(sum, len), unit| (sum + unit as u64, len + 1));

    if (sum + len) % 2 == 0 {
        ColorToken::Mint
    } else {
        ColorToken::Sky
    }
}

pub fn keyword_color_map(keywords: &[String]) -> BTreeMap<String, ColorToken> {
    keywords
        .iter()
        .map(|k| (k.clone(), keyword_color(k)))
        .collect()
}

// ============================================================================
// Highlighting
// ============================================================================

/// A run of editor text, either plain or a highlighted keyword occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TextSpan {
    Text {
        content: String,
    },
    Keyword {
        content: String,
        keyword: String,
        color: ColorToken,
    },
}

impl TextSpan {
    pub fn content(&self) -> &str {
        match self {
            TextSpan::Text { content } | TextSpan::Keyword { content, .. } => content,
        }
    }

    fn char_len(&self) -> usize {
        self.content().chars().count()
    }
}

/// One case-insensitive alternation over every known keyword, longest first.
///
/// Boundaries are ASCII-only so they agree with [`extract_keywords`]: in
/// "éocean" the `é` is not a word character and "ocean" still matches.
fn keyword_pattern(colors: &BTreeMap<String, ColorToken>) -> Option<Regex> {
    let mut keywords: Vec<&str> = colors
        .keys()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return None;
    }
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let alternation: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    let pattern = format!(r"(?i)(?-u:\b)(?:{})(?-u:\b)", alternation.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("keyword pattern rejected: {}", e);
            None
        }
    }
}

/// Split `text` into plain and highlighted spans.
///
/// Every whole-word, case-insensitive occurrence of a known keyword becomes a
/// keyword span. Concatenating the span contents always yields `text` again.
pub fn highlight_spans(text: &str, colors: &BTreeMap<String, ColorToken>) -> Vec<TextSpan> {
    if text.is_empty() {
        return Vec::new();
    }
    let Some(re) = keyword_pattern(colors) else {
        return vec![TextSpan::Text {
            content: text.to_string(),
        }];
    };

    let mut spans = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        let keyword = m.as_str().to_lowercase();
        let Some(color) = colors.get(&keyword) else {
            continue;
        };
        if m.start() > last {
            spans.push(TextSpan::Text {
                content: text[last..m.start()].to_string(),
            });
        }
        spans.push(TextSpan::Keyword {
            content: m.as_str().to_string(),
            keyword,
            color: *color,
        });
        last = m.end();
    }
    if last < text.len() {
        spans.push(TextSpan::Text {
            content: text[last..].to_string(),
        });
    }

    spans
}

/// Caret location inside a rendered span list, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaretPosition {
    pub span: usize,
    pub offset: usize,
}

/// Map a caret character offset in the plain text onto the span list produced
/// by [`highlight_spans`], so the editor can restore the caret after
/// re-rendering. Offsets past the end clamp to the end of the last span.
pub fn locate_caret(spans: &[TextSpan], caret: usize) -> CaretPosition {
    let mut consumed = 0;
    for (i, span) in spans.iter().enumerate() {
        let len = span.char_len();
        if caret <= consumed + len {
            return CaretPosition {
                span: i,
                offset: caret - consumed,
            };
        }
        consumed += len;
    }

    match spans.last() {
        Some(last) => CaretPosition {
            span: spans.len() - 1,
            offset: last.char_len(),
        },
        None => CaretPosition { span: 0, offset: 0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_extract_drops_short_words() {
        assert_eq!(
            extract_keywords("the quiet ocean at dawn"),
            strings(&["quiet", "ocean", "dawn"])
        );
    }

    #[test]
    fn test_extract_empty_and_whitespace() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("   \n\t  ").is_empty());
    }

    #[test]
    fn test_extract_strips_punctuation_and_case() {
        let keywords = extract_keywords("Write, write! WRITE... (writing) can't");
        assert_eq!(keywords, strings(&["write", "writing", "cant"]));
        for k in &keywords {
            assert!(k.chars().all(is_word_char));
            assert!(k.len() > MIN_KEYWORD_LEN);
        }
    }

    #[test]
    fn test_extract_length_after_cleaning() {
        // "a.b.c" cleans to "abc", which is too short
        assert!(extract_keywords("a.b.c ...!").is_empty());
        assert_eq!(extract_keywords("snake_case"), strings(&["snake_case"]));
    }

    #[test]
    fn test_extract_non_ascii_is_stripped() {
        // Non-ASCII letters are not word characters
        assert_eq!(extract_keywords("café naïveté"), strings(&["navet"]));
    }

    #[test]
    fn test_current_keyword_is_last() {
        let keywords = strings(&["quiet", "ocean", "dawn"]);
        assert_eq!(current_keyword(&keywords), Some("dawn"));
        assert_eq!(current_keyword(&[]), None);
    }

    #[test]
    fn test_keyword_color_hash() {
        // "dawn": 100 + 97 + 119 + 110 = 426, + 4 = 430 -> even
        assert_eq!(keyword_color("dawn"), ColorToken::Mint);
        // "ocean": 111 + 99 + 101 + 97 + 110 = 518, + 5 = 523 -> odd
        assert_eq!(keyword_color("ocean"), ColorToken::Sky);
    }

    #[test]
    fn test_keyword_color_stable_and_default() {
        for _ in 0..3 {
            assert_eq!(keyword_color(""), ColorToken::DEFAULT);
            assert_eq!(keyword_color("quiet"), keyword_color("quiet"));
        }
    }

    #[test]
    fn test_highlight_spans_round_trip_text() {
        let text = "The Ocean at dawn, ocean again.";
        let colors = keyword_color_map(&strings(&["ocean", "dawn"]));
        let spans = highlight_spans(text, &colors);

        let joined: String = spans.iter().map(TextSpan::content).collect();
        assert_eq!(joined, text);

        let keywords: Vec<&str> = spans
            .iter()
            .filter_map(|s| match s {
                TextSpan::Keyword { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(keywords, vec!["Ocean", "dawn", "ocean"]);
    }

    #[test]
    fn test_highlight_spans_whole_words_only() {
        let colors = keyword_color_map(&strings(&["ocean"]));
        let spans = highlight_spans("oceanic", &colors);
        assert_eq!(
            spans,
            vec![TextSpan::Text {
                content: "oceanic".to_string()
            }]
        );
    }

    #[test]
    fn test_highlight_agrees_with_extraction_next_to_non_ascii() {
        let keywords = extract_keywords("éocean naïve");
        assert_eq!(keywords, strings(&["ocean"]));

        let spans = highlight_spans("éocean naïve", &keyword_color_map(&keywords));
        assert_eq!(
            spans,
            vec![
                TextSpan::Text {
                    content: "é".to_string()
                },
                TextSpan::Keyword {
                    content: "ocean".to_string(),
                    keyword: "ocean".to_string(),
                    color: keyword_color("ocean"),
                },
                TextSpan::Text {
                    content: " naïve".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_highlight_prefers_whole_keyword_over_prefix() {
        let colors = keyword_color_map(&strings(&["snake", "snake_case", "case"]));
        let spans = highlight_spans("Snake_Case snake", &colors);
        let keywords: Vec<&str> = spans
            .iter()
            .filter_map(|s| match s {
                TextSpan::Keyword { keyword, .. } => Some(keyword.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(keywords, vec!["snake_case", "snake"]);
    }

    #[test]
    fn test_highlight_without_colors_is_plain() {
        let spans = highlight_spans("an ocean", &BTreeMap::new());
        assert_eq!(
            spans,
            vec![TextSpan::Text {
                content: "an ocean".to_string()
            }]
        );
    }

    #[test]
    fn test_highlight_spans_empty_text() {
        let colors = keyword_color_map(&strings(&["ocean"]));
        assert!(highlight_spans("", &colors).is_empty());
    }

    #[test]
    fn test_locate_caret() {
        let colors = keyword_color_map(&strings(&["ocean"]));
        let spans = highlight_spans("an ocean view", &colors);
        assert_eq!(spans.len(), 3);

        assert_eq!(locate_caret(&spans, 0), CaretPosition { span: 0, offset: 0 });
        assert_eq!(locate_caret(&spans, 3), CaretPosition { span: 0, offset: 3 });
        assert_eq!(locate_caret(&spans, 5), CaretPosition { span: 1, offset: 2 });
        assert_eq!(locate_caret(&spans, 13), CaretPosition { span: 2, offset: 5 });
        assert_eq!(locate_caret(&spans, 99), CaretPosition { span: 2, offset: 5 });
        assert_eq!(locate_caret(&[], 4), CaretPosition { span: 0, offset: 0 });
    }
}
