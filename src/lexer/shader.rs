//! The shader tokenizer rule set.

use crate::words::WordStream;
use crate::{Location, Token, TokenType, Word, WordCategory};
use once_cell::sync::Lazy;
use regex::Regex;

static BIN_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0b[01']+$").unwrap());
static HEX_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F']+$").unwrap());
static OCT_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[0-7']*$").unwrap());
static DEC_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9']+$").unwrap());
static FLOAT_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9']+(\.[0-9']*)?$").unwrap());

/// One token per call. The returned word, when present, is the first word the tokenizer
/// pulled but did not consume; the lexer feeds it back on the next call.
pub(super) fn tokenize<'src>(
    word: Word<'src>,
    words: &mut WordStream<'src>,
    location: Location,
) -> (Token<'src>, Option<Word<'src>>) {
    match word.category {
        WordCategory::AlphaNum => {
            if let Some(kind) = keyword(word.text) {
                return (Token::new(word.text, kind, location), None);
            }
            user_value(word, words, location)
        }
        WordCategory::Punctuation => {
            if let Some(kind) = punctuation(word.text.as_bytes()[0]) {
                return (Token::new(word.text, kind, location), None);
            }
            user_value(word, words, location)
        }
        WordCategory::EndOfLine => (Token::new(word.text, TokenType::EndOfLine, location), None),
        _ => user_value(word, words, location),
    }
}

fn keyword(text: &str) -> Option<TokenType> {
    let kind = match text {
        "fn" => TokenType::KwFn,
        "ctx" => TokenType::KwCtx,
        "def" => TokenType::KwDef,
        "let" => TokenType::KwLet,
        "mut" => TokenType::KwMut,
        "true" => TokenType::KwTrue,
        "alias" => TokenType::KwAlias,
        "const" => TokenType::KwConst,
        "false" => TokenType::KwFalse,
        "struct" => TokenType::KwStruct,
        "typeof" => TokenType::KwTypeOf,
        "context" => TokenType::KwContext,
        _ => return None,
    };
    Some(kind)
}

fn punctuation(byte: u8) -> Option<TokenType> {
    let kind = match byte {
        b'+' => TokenType::OpPlus,
        b'-' => TokenType::OpMinus,
        b'*' => TokenType::OpMul,
        b'/' => TokenType::OpDiv,
        b'=' => TokenType::OpAssign,
        b'[' => TokenType::SquareBracketOpen,
        b']' => TokenType::SquareBracketClose,
        b'(' => TokenType::ParenOpen,
        b')' => TokenType::ParenClose,
        b'{' => TokenType::BracketOpen,
        b'}' => TokenType::BracketClose,
        b':' => TokenType::Colon,
        b',' => TokenType::Comma,
        b'.' => TokenType::Dot,
        b'#' => TokenType::Hash,
        // Quotes start literals and are handled by the user value routine.
        _ => return None,
    };
    Some(kind)
}

/// Quoted literals, numbers and plain symbols.
pub(super) fn user_value<'src>(
    word: Word<'src>,
    words: &mut WordStream<'src>,
    location: Location,
) -> (Token<'src>, Option<Word<'src>>) {
    let first = word.text.bytes().next().unwrap_or(0);

    if first == b'\'' || first == b'"' {
        scan_quoted(word, words, location, first)
    } else if first.is_ascii_digit() {
        scan_number(word, words, location)
    } else {
        (Token::new(word.text, TokenType::Symbol, location), None)
    }
}

/// Consumes words until the matching closing quote. A single `\` word escapes the next
/// word unconditionally. Reaching the end of the file first is fatal and fuses the token
/// stream.
fn scan_quoted<'src>(
    word: Word<'src>,
    words: &mut WordStream<'src>,
    location: Location,
    quote: u8,
) -> (Token<'src>, Option<Word<'src>>) {
    let start = words.offset_of(word.text);
    let mut escaped = false;

    loop {
        let current = match words.next() {
            Some(w) => w,
            None => break,
        };
        if current.category == WordCategory::EndOfFile {
            break;
        }

        if escaped {
            escaped = false;
            continue;
        }

        match current.text.bytes().next() {
            Some(b'\\') => escaped = true,
            Some(byte) if byte == quote => {
                let end = words.offset_of(current.text) + current.text.len();
                let kind = if quote == b'\'' {
                    TokenType::Literal
                } else {
                    TokenType::String
                };
                let text = &words.source()[start..end];
                return (Token::new(text, kind, location), None);
            }
            _ => {}
        }
    }

    (
        Token::new(&words.source()[start..], TokenType::EndOfFile, location),
        None,
    )
}

/// Assembles a number literal out of consecutive words, honoring `'` digit separators and
/// an embedded `.`, then classifies the character set for the detected base. A literal
/// with an invalid character set keeps the [TokenType::Invalid] type.
fn scan_number<'src>(
    word: Word<'src>,
    words: &mut WordStream<'src>,
    location: Location,
) -> (Token<'src>, Option<Word<'src>>) {
    let source = words.source();
    let start = words.offset_of(word.text);
    let first_bytes = word.text.as_bytes();

    let has_prefix = first_bytes[0] == b'0' && first_bytes.len() > 1;
    let is_hex = has_prefix && first_bytes[1] == b'x';
    let is_binary = has_prefix && first_bytes[1] == b'b';
    let is_oct = has_prefix && first_bytes[1] != b'x' && first_bytes[1] != b'b';

    let mut is_number = true;
    let mut is_quote_separator = false;
    let mut is_floating_point = false;
    let mut is_next_word = false;

    let lookahead;
    loop {
        let current = match words.next() {
            Some(w) => w,
            None => {
                lookahead = None;
                break;
            }
        };
        if current.category == WordCategory::EndOfFile {
            lookahead = Some(current);
            break;
        }

        let mut done = false;
        match current.text.bytes().next() {
            Some(b'\'') => {
                is_number = !is_quote_separator;
                is_quote_separator = true;
            }
            Some(b'.') => {
                is_number = !is_floating_point;
                is_next_word = true;
                is_floating_point = true;
            }
            _ => {
                done = !is_quote_separator && !is_next_word;
                is_next_word = false;
                is_quote_separator = false;
            }
        }

        if done || !is_number {
            lookahead = Some(current);
            break;
        }
    }

    let end = match &lookahead {
        Some(w) if w.category != WordCategory::EndOfFile => words.offset_of(w.text),
        _ => source.len(),
    };

    let mut text = &source[start..end];
    let last = text.as_bytes().last().copied().unwrap_or(0);
    let is_float_suffix = last == b'f';
    let is_unsigned_suffix = last == b'u';
    if is_float_suffix || is_unsigned_suffix {
        text = &text[..text.len() - 1];
    }

    let mut kind = TokenType::Invalid;
    if is_number {
        if is_binary {
            if BIN_DIGITS.is_match(text) {
                kind = TokenType::NumberBin;
            }
        } else if is_hex {
            if HEX_DIGITS.is_match(text) {
                kind = TokenType::NumberHex;
            }
        } else if is_oct {
            if OCT_DIGITS.is_match(text) {
                kind = TokenType::NumberOct;
            }
        } else if is_floating_point || is_float_suffix {
            if FLOAT_DIGITS.is_match(text) {
                kind = TokenType::NumberFloat;
            }
        } else if DEC_DIGITS.is_match(text) {
            kind = TokenType::Number;
        }
    }

    (Token::new(text, kind, location), lookahead)
}
