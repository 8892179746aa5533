//! The script tokenizer rule set.
//!
//! Scripts share the shader tokenization; on top of it the words `and` and `or` classify
//! as operator tokens instead of plain symbols.

use super::shader;
use crate::words::WordStream;
use crate::{Location, Token, TokenType, Word, WordCategory};

pub(super) fn tokenize<'src>(
    word: Word<'src>,
    words: &mut WordStream<'src>,
    location: Location,
) -> (Token<'src>, Option<Word<'src>>) {
    if word.category == WordCategory::AlphaNum {
        match word.text {
            "and" => return (Token::new(word.text, TokenType::OpAnd, location), None),
            "or" => return (Token::new(word.text, TokenType::OpOr, location), None),
            _ => {}
        }
    }

    shader::tokenize(word, words, location)
}
