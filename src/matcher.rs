//! Character class segmentation.
//!
//! The word matcher owns a 128 entry dispatch table mapping each ASCII byte to the
//! matcher function that consumes a word starting with that byte. The table is computed
//! once per process by probing every candidate matcher against a `\0 c \0` test string
//! and selecting the first candidate that consumes exactly the probed byte; ASCII
//! punctuation bytes left unclaimed fall to the single byte punctuation matcher. Bytes
//! above 0x7F always dispatch to the alpha-numeric matcher, which swallows UTF-8
//! continuation bytes.

use crate::WordCategory;
use once_cell::sync::Lazy;

/// Result of applying one matcher at a byte offset of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMatch {
    pub category: WordCategory,
    /// Byte offset one past the matched word.
    pub end: usize,
    /// Logical characters consumed; for end of line words the number of `\n` bytes.
    pub characters: u32,
}

pub type MatcherFn = fn(&str, usize) -> WordMatch;

pub struct WordMatcher {
    table: [MatcherFn; 128],
}

static ASCII_MATCHER: Lazy<WordMatcher> = Lazy::new(WordMatcher::initialize);

/// The process wide matcher instance.
pub fn word_matcher() -> &'static WordMatcher {
    &ASCII_MATCHER
}

impl WordMatcher {
    pub fn dispatch(&self, byte: u8) -> MatcherFn {
        if byte & 0x80 != 0 {
            match_alphanum
        } else {
            self.table[byte as usize]
        }
    }

    fn initialize() -> Self {
        const CANDIDATES: [MatcherFn; 4] =
            [match_endofline, match_alphanum, match_whitespace, match_unknown];

        let mut table: [MatcherFn; 128] = [match_unknown; 128];

        let mut probe = [0u8; 3];
        for byte in 0u8..128 {
            probe[1] = byte;
            // Every ASCII byte between two NUL bytes is valid UTF-8.
            let text = match std::str::from_utf8(&probe) {
                Ok(text) => text,
                Err(_) => continue,
            };

            for candidate in CANDIDATES {
                let matched = candidate(text, 0);
                if matched.category == WordCategory::Unknown {
                    table[byte as usize] = if byte.is_ascii_punctuation() {
                        match_punctuation
                    } else {
                        candidate
                    };
                    break;
                } else if matched.end == 2 {
                    // The probed byte continued the word started by the leading NUL, so
                    // this candidate owns the byte.
                    table[byte as usize] = candidate;
                    break;
                }
            }
        }

        Self { table }
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_ascii() || c.is_ascii_alphanumeric() || c == '_'
}

/// Consumes one or more code points that are either non ASCII or `[A-Za-z0-9_]`. The
/// first code point is taken unconditionally; dispatch guarantees it belongs here.
pub fn match_alphanum(source: &str, start: usize) -> WordMatch {
    let mut characters = 0u32;
    let mut end = start;

    let mut chars = source[start..].chars();
    if let Some(first) = chars.next() {
        end += first.len_utf8();
        characters += 1;
    }

    for c in chars {
        if !is_word_char(c) {
            break;
        }
        end += c.len_utf8();
        characters += 1;
    }

    WordMatch {
        category: WordCategory::AlphaNum,
        end,
        characters,
    }
}

/// Consumes exactly one ASCII punctuation byte.
pub fn match_punctuation(_source: &str, start: usize) -> WordMatch {
    WordMatch {
        category: WordCategory::Punctuation,
        end: start + 1,
        characters: 1,
    }
}

/// Consumes one or more ASCII whitespace bytes, newlines and carriage returns excluded.
pub fn match_whitespace(source: &str, start: usize) -> WordMatch {
    let bytes = source.as_bytes();
    let mut end = start + 1;

    while end < bytes.len() {
        let b = bytes[end];
        if !b.is_ascii_whitespace() || b == b'\n' || b == b'\r' {
            break;
        }
        end += 1;
    }

    WordMatch {
        category: WordCategory::Whitespace,
        end,
        characters: (end - start) as u32,
    }
}

/// Consumes one or more `\n` / `\r` bytes and reports the number of `\n` bytes, which is
/// the line advance of the word.
pub fn match_endofline(source: &str, start: usize) -> WordMatch {
    let bytes = source.as_bytes();
    let mut end = start + 1;
    let mut lines = u32::from(bytes[start] == b'\n');

    while end < bytes.len() && (bytes[end] == b'\n' || bytes[end] == b'\r') {
        lines += u32::from(bytes[end] == b'\n');
        end += 1;
    }

    WordMatch {
        category: WordCategory::EndOfLine,
        end,
        characters: lines,
    }
}

/// Consumes nothing and reports a classification failure. Only ever selected for bytes
/// no other matcher claims.
pub fn match_unknown(_source: &str, start: usize) -> WordMatch {
    WordMatch {
        category: WordCategory::Unknown,
        end: start,
        characters: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_of(byte: u8) -> WordCategory {
        let matcher = word_matcher().dispatch(byte);
        let probe = [byte, 0];
        let text = std::str::from_utf8(&probe).unwrap();
        matcher(text, 0).category
    }

    #[test]
    fn table_classifies_ascii() {
        assert_eq!(category_of(b'a'), WordCategory::AlphaNum);
        assert_eq!(category_of(b'Z'), WordCategory::AlphaNum);
        assert_eq!(category_of(b'0'), WordCategory::AlphaNum);
        assert_eq!(category_of(b'_'), WordCategory::AlphaNum);
        assert_eq!(category_of(b'('), WordCategory::Punctuation);
        assert_eq!(category_of(b'#'), WordCategory::Punctuation);
        assert_eq!(category_of(b' '), WordCategory::Whitespace);
        assert_eq!(category_of(b'\t'), WordCategory::Whitespace);
        assert_eq!(category_of(b'\n'), WordCategory::EndOfLine);
        assert_eq!(category_of(b'\r'), WordCategory::EndOfLine);
        assert_eq!(category_of(0), WordCategory::Unknown);
    }

    #[test]
    fn non_ascii_dispatches_to_alphanum() {
        let matcher = word_matcher().dispatch(0xC3);
        let matched = matcher("łódź ", 0);
        assert_eq!(matched.category, WordCategory::AlphaNum);
        assert_eq!(matched.characters, 4);
        assert_eq!(&"łódź "[..matched.end], "łódź");
    }

    #[test]
    fn alphanum_counts_characters_not_bytes() {
        let matched = match_alphanum("zażółć(", 0);
        assert_eq!(matched.characters, 6);
        assert_eq!(&"zażółć("[..matched.end], "zażółć");
    }

    #[test]
    fn endofline_counts_line_advances() {
        assert_eq!(match_endofline("\na", 0).characters, 1);
        assert_eq!(match_endofline("\r\na", 0).characters, 1);
        let matched = match_endofline("\n\r\n\nx", 0);
        assert_eq!(matched.characters, 3);
        assert_eq!(matched.end, 4);
    }

    #[test]
    fn whitespace_stops_at_newline() {
        let matched = match_whitespace("  \t\nx", 0);
        assert_eq!(matched.end, 3);
        assert_eq!(matched.category, WordCategory::Whitespace);
    }
}
