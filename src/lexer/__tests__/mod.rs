use crate::lexer::Lexer;
use crate::words::WordStream;
use crate::{LexerOptions, LexerRules, TokenType};

fn shader_tokens(source: &str) -> Vec<crate::Token> {
    let lexer = Lexer::new(WordStream::new(source)).unwrap();
    lexer.collect()
}

fn tokens_without_context(source: &str) -> Vec<crate::Token> {
    let options = LexerOptions {
        rules: LexerRules::Shader,
        ..LexerOptions::default()
    };
    Lexer::with_options(WordStream::new(source), options)
        .unwrap()
        .collect()
}

#[test]
fn context_declaration_selects_rules() {
    let lexer = Lexer::new(WordStream::new("context Shader\nlet x: i32\n")).unwrap();
    lexer.set_log(crate::Log::Default("shader")).unwrap();
    let tokens: Vec<crate::Token> = lexer.collect();
    assert_eq!(tokens[0].kind, TokenType::EndOfLine);
    assert_eq!(tokens[1].kind, TokenType::KwLet);
    assert_eq!(tokens[1].text, "let");
}

#[test]
fn unknown_context_is_fatal() {
    let result = Lexer::new(WordStream::new("context Compute\n"));
    assert!(result.is_err());

    let result = Lexer::new(WordStream::new("ctx Shader\n"));
    assert!(result.is_err());
}

#[test]
fn classifies_keywords_operators_and_punctuation() {
    let tokens = tokens_without_context("fn f(a: i32): void\n{\n    let y: i32 = a + 1\n}\n");
    let kinds: Vec<TokenType> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenType::KwFn,
            TokenType::Symbol,
            TokenType::ParenOpen,
            TokenType::Symbol,
            TokenType::Colon,
            TokenType::Symbol,
            TokenType::ParenClose,
            TokenType::Colon,
            TokenType::Symbol,
            TokenType::EndOfLine,
            TokenType::BracketOpen,
            TokenType::EndOfLine,
            TokenType::KwLet,
            TokenType::Symbol,
            TokenType::Colon,
            TokenType::Symbol,
            TokenType::OpAssign,
            TokenType::Symbol,
            TokenType::OpPlus,
            TokenType::Number,
            TokenType::EndOfLine,
            TokenType::BracketClose,
            TokenType::EndOfLine,
            TokenType::EndOfFile,
        ]
    );
}

#[test]
fn token_texts_cover_the_source_in_order() {
    let source = "context Shader\nfn main(): void\n{\n}\n";
    let tokens = shader_tokens(source);

    // Concatenated token texts equal the source minus whitespace and minus the skipped
    // context prologue.
    let concatenated: String = tokens.iter().map(|t| t.text).collect();
    let expected: String = "\nfn main(): void\n{\n}\n"
        .chars()
        .filter(|c| *c != ' ')
        .collect();
    assert_eq!(concatenated, expected);
}

#[test]
fn columns_are_non_decreasing_within_a_line() {
    let tokens = tokens_without_context("let abc: i32 = 1 + 2\nlet d: i32 = 3\n");
    let mut line = 0;
    let mut column = 0;
    for token in &tokens {
        if token.location.line() != line {
            line = token.location.line();
            column = 0;
        }
        assert!(token.location.column() >= column, "token {:?}", token);
        column = token.location.column();
    }
}

#[test]
fn tab_expansion_shifts_columns() {
    // Two tabs and one space of leading whitespace: the first token of the line sits at
    // column 1 + 2 * tab_size + 1.
    let tokens = tokens_without_context("x\n\t\t let\n");
    let let_token = tokens.iter().find(|t| t.kind == TokenType::KwLet).unwrap();
    assert_eq!(let_token.location.column(), 1 + 2 * 4 + 1);

    let options = LexerOptions {
        rules: LexerRules::Shader,
        tab_size: 8,
    };
    let tokens: Vec<crate::Token> =
        Lexer::with_options(WordStream::new("x\n\t\t let\n"), options)
            .unwrap()
            .collect();
    let let_token = tokens.iter().find(|t| t.kind == TokenType::KwLet).unwrap();
    assert_eq!(let_token.location.column(), 1 + 2 * 8 + 1);
}

#[test]
fn column_offset_resets_after_end_of_line() {
    let tokens = tokens_without_context("\tx\ny\n");
    let y = tokens.iter().find(|t| t.text == "y").unwrap();
    assert_eq!(y.location.column(), 1);
    assert_eq!(y.location.line(), 2);
}

#[test]
fn string_with_escaped_quote() {
    let tokens = tokens_without_context(r#"let s: utf8 = "abc\"def""#);
    let string = tokens.iter().find(|t| t.kind == TokenType::String).unwrap();
    assert_eq!(string.text, r#""abc\"def""#);
}

#[test]
fn char_literal_uses_single_quotes() {
    let tokens = tokens_without_context("let c: utf8 = 'x'\n");
    let literal = tokens.iter().find(|t| t.kind == TokenType::Literal).unwrap();
    assert_eq!(literal.text, "'x'");
}

#[test]
fn unterminated_string_fuses_the_stream() {
    let tokens = tokens_without_context("let s: utf8 = \"abc\n");
    assert_eq!(tokens.last().unwrap().kind, TokenType::EndOfFile);
    // Everything after the opening quote is swallowed by the failed literal.
    assert!(!tokens.iter().any(|t| t.kind == TokenType::String));
}

#[test]
fn number_classification() {
    let source = "a 10 0x1F 010 0b101 3.14 2f 10u 1'000'000 0b10'01\n";
    let tokens = tokens_without_context(source);
    let numbers: Vec<(TokenType, &str)> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenType::Symbol | TokenType::EndOfLine | TokenType::EndOfFile))
        .map(|t| (t.kind, t.text))
        .collect();
    assert_eq!(
        numbers,
        vec![
            (TokenType::Number, "10"),
            (TokenType::NumberHex, "0x1F"),
            (TokenType::NumberOct, "010"),
            (TokenType::NumberBin, "0b101"),
            (TokenType::NumberFloat, "3.14"),
            (TokenType::NumberFloat, "2"),
            (TokenType::Number, "10"),
            (TokenType::Number, "1'000'000"),
            (TokenType::NumberBin, "0b10'01"),
        ]
    );
}

#[test]
fn invalid_number_keeps_invalid_type() {
    let tokens = tokens_without_context("08 0b102 1..2\n");
    let invalid: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind == TokenType::Invalid)
        .map(|t| t.text)
        .collect();
    assert!(invalid.contains(&"08"));
    assert!(invalid.contains(&"0b102"));
}

#[test]
fn script_rules_classify_word_operators() {
    let options = LexerOptions {
        rules: LexerRules::Script,
        ..LexerOptions::default()
    };
    let tokens: Vec<crate::Token> =
        Lexer::with_options(WordStream::new("a and b or c\n"), options)
            .unwrap()
            .collect();
    let kinds: Vec<TokenType> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenType::Symbol,
            TokenType::OpAnd,
            TokenType::Symbol,
            TokenType::OpOr,
            TokenType::Symbol,
            TokenType::EndOfLine,
            TokenType::EndOfFile,
        ]
    );

    // The shader rules keep the same words as plain symbols.
    let tokens = tokens_without_context("a and b or c\n");
    assert!(tokens.iter().all(|t| !t.kind.is_operator()));
}
