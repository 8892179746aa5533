//! Token production on top of the word stream.
//!
//! The lexer owns the [WordStream] and drives one of the tokenizer rule sets over it.
//! When constructed with [LexerRules::Provided] it first drains words until it finds the
//! `context <Name>` declaration and selects the rule set from the context name; any other
//! name is a hard failure.

mod script;
mod shader;

#[cfg(test)]
mod __tests__;

use crate::words::WordStream;
use crate::{LexError, LexerOptions, LexerRules, Location, Log, Token, TokenType, Word, WordCategory};
use once_cell::unsync::OnceCell;

type TokenizerFn<'src> = fn(
    Word<'src>,
    &mut WordStream<'src>,
    Location,
) -> (Token<'src>, Option<Word<'src>>);

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            rules: LexerRules::Provided,
            tab_size: 4,
        }
    }
}

/// A lazy, non restartable token stream.
///
/// Column tracking expands tabs: while whitespace words are skipped the lexer accumulates
/// a column offset (`tab_size` per tab, one per other byte, minus the raw byte count) so
/// that the next token's column reflects the expanded position. The offset resets after
/// every end of line token.
pub struct Lexer<'src> {
    words: WordStream<'src>,
    tokenizer: TokenizerFn<'src>,
    tab_size: u32,
    column_offset: u32,
    pending: Option<Word<'src>>,
    finished: bool,
    log: OnceCell<Log<&'static str>>,
}

impl<'src> Lexer<'src> {
    pub fn new(words: WordStream<'src>) -> Result<Self, LexError> {
        Self::with_options(words, LexerOptions::default())
    }

    pub fn with_options(
        mut words: WordStream<'src>,
        options: LexerOptions,
    ) -> Result<Self, LexError> {
        let rules = match options.rules {
            LexerRules::Provided => Self::scan_context(&mut words)?,
            rules => rules,
        };

        let tokenizer = match rules {
            LexerRules::Script => script::tokenize as TokenizerFn<'src>,
            LexerRules::Shader => shader::tokenize as TokenizerFn<'src>,
            LexerRules::Provided => unreachable!("scan_context always resolves the rules"),
        };

        Ok(Self {
            words,
            tokenizer,
            tab_size: options.tab_size,
            column_offset: 0,
            pending: None,
            finished: false,
            log: OnceCell::new(),
        })
    }

    /// Set a log label to debug the produced tokens based on the level of [Log].
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    pub fn source(&self) -> &'src str {
        self.words.source()
    }

    /// Reads the `context <Name>` prologue and resolves the rule set from it.
    fn scan_context(words: &mut WordStream<'src>) -> Result<LexerRules, LexError> {
        let mut word = words.next();
        while let Some(w) = word {
            if w.category == WordCategory::AlphaNum {
                break;
            }
            if w.category == WordCategory::EndOfFile {
                return Err(LexError::new(
                    w.location,
                    "expected a 'context' declaration before the end of the file".into(),
                ));
            }
            word = words.next();
        }

        let keyword = word.ok_or_else(|| {
            LexError::new(Location::default(), "empty word stream".into())
        })?;
        if keyword.text != "context" {
            return Err(LexError::new(
                keyword.location,
                format!("expected 'context', found '{}'", keyword.text),
            ));
        }

        let separator = words.next();
        if !matches!(
            separator.map(|w| w.category),
            Some(WordCategory::Whitespace)
        ) {
            return Err(LexError::new(
                keyword.location,
                "expected whitespace after 'context'".into(),
            ));
        }

        let name = words.next().ok_or_else(|| {
            LexError::new(keyword.location, "missing context name".into())
        })?;
        match name.text {
            "Script" => Ok(LexerRules::Script),
            "Shader" => Ok(LexerRules::Shader),
            other => Err(LexError::new(
                name.location,
                format!("unknown context '{}'", other),
            )),
        }
    }

    fn next_word(&mut self) -> Option<Word<'src>> {
        self.pending.take().or_else(|| self.words.next())
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if self.finished {
            return None;
        }

        loop {
            let word = self.next_word()?;

            match word.category {
                WordCategory::EndOfFile => {
                    self.finished = true;
                    let token = Token::new(
                        word.text,
                        TokenType::EndOfFile,
                        Location::new(word.location.line() + 1, 0),
                    );
                    if let Some(log) = self.log.get() {
                        log.log_token(&token);
                    }
                    return Some(token);
                }
                WordCategory::Whitespace => {
                    for byte in word.text.bytes() {
                        self.column_offset += if byte == b'\t' { self.tab_size } else { 1 };
                    }
                    self.column_offset -= word.text.len() as u32;
                }
                _ => {
                    let location = Location::new(
                        word.location.line() + 1,
                        1 + word.location.column() + self.column_offset,
                    );

                    let (token, pending) = (self.tokenizer)(word, &mut self.words, location);
                    self.pending = pending;

                    if token.kind == TokenType::EndOfLine {
                        self.column_offset = 0;
                    }
                    if token.kind == TokenType::EndOfFile {
                        // A tokenizer only produces the end of file token for fatal
                        // conditions such as an unterminated string.
                        self.finished = true;
                    }

                    if let Some(log) = self.log.get() {
                        log.log_token(&token);
                    }
                    return Some(token);
                }
            }
        }
    }
}
