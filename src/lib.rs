//! Arctic language toolchain (arctic_lang) is a library implementing the front-end and
//! runtime for the Arctic domain specific language: a small statically typed dialect that
//! serves both as a general purpose scripting language and as a shader language.
//!
//! # Overview
//!
//! A source buffer moves through a fixed pipeline. The [WordStream](words::WordStream)
//! segments the raw bytes into words using a precomputed character class table. The
//! [Lexer](lexer::Lexer) classifies those words into [Token]s, selecting the tokenizer
//! rule set from the leading `context Script` or `context Shader` declaration. The
//! [DefaultParser](parser::DefaultParser) consumes the token stream through a set of
//! declarative [TokenRule](parser::TokenRule)s and hand written expression routines,
//! building a sibling linked syntax tree inside a
//! [node allocator](syntax::SyntaxNodeAllocator). Registered
//! [visitors](syntax::SyntaxVisitor) are notified as each top level definition completes;
//! the [BytecodeGenerator](codegen::BytecodeGenerator) visitor lowers function
//! definitions into a linked [ScriptImage](bytecode::ScriptImage) which the
//! [VirtualMachine](vm::VirtualMachine) executes one function frame at a time.
//!
//! # Design
//!
//! The parser is not generated from a grammar description. Regular productions such as
//! function headers, struct members and annotations are written as `const` tables of
//! composable token rules (sequence, alternative, child node and sibling node groups with
//! optional/repeat modifiers and per rule failure states), while expressions and block
//! structures are parsed by hand because precedence resolution and call argument handling
//! do not fit the table form. Operator precedence is deliberately *not* encoded in the
//! tree shape; the flat operand/operator sibling runs are re-ordered during bytecode
//! lowering with a dual register and stack spill strategy.
//!
//! # Example
//!
//! ```
//! use arctic_lang::examples::shader::compile;
//! use arctic_lang::vm::{ExecutionState, VirtualMachine};
//!
//! let source = "context Shader
//! fn main(): void
//! {
//!     let x: i32 = 2 + 3 * 4
//! }
//! ";
//!
//! let image = compile(source).unwrap();
//!
//! let vm = VirtualMachine::new();
//! let mut state = ExecutionState::new(256);
//! let entry = image.find_symbol("main").unwrap();
//! vm.execute(&image, entry, &mut state).unwrap();
//!
//! // The first local variable lives at data offset 4; offset 0 is reserved.
//! assert_eq!(state.memory_u32(4), Some(14));
//! ```

pub mod bytecode;
pub mod codegen;
mod error;
pub mod examples;
pub mod lexer;
mod logger;
pub mod matcher;
pub mod parser;
mod position;
pub mod script;
pub mod syntax;
mod token;
pub mod vm;
pub mod words;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// The packed line and column information of a word or token.
///
/// Lines use 20 bits and columns 12 bits, so locations stay register sized even though
/// every token carries one.
pub struct Location(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Category assigned to a word by the character class segmenter.
pub enum WordCategory {
    Unknown,
    /// A run of identifier characters. Any non ASCII byte continues an alpha-numeric word.
    AlphaNum,
    /// A single ASCII punctuation byte.
    Punctuation,
    /// A run of ASCII whitespace, newlines excluded.
    Whitespace,
    /// A run of `\n` / `\r` bytes.
    EndOfLine,
    /// Synthetic final word of every stream.
    EndOfFile,
}

#[derive(Debug, Clone, Copy)]
/// A segmented slice of the source buffer produced by the [WordStream](words::WordStream).
pub struct Word<'src> {
    pub text: &'src str,
    pub category: WordCategory,
    pub location: Location,
}

/// Token classification produced by the lexer rule sets.
///
/// The numeric encoding groups token families: bit 16 marks keywords, bit 17 operators,
/// bit 18 native types and the high bit the special stream tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TokenType {
    Invalid = 0,

    AlphaNum = 0x0000_0001,
    Symbol = 0x0000_0002,
    Literal = 0x0000_0003,
    String = 0x0000_0004,

    Number = 0x0000_0008,
    NumberHex = 0x0000_0009,
    NumberOct = 0x0000_000A,
    NumberBin = 0x0000_000B,
    NumberFloat = 0x0000_000F,

    Colon = 0x0000_0010,
    Dot = 0x0000_0011,
    Comma = 0x0000_0012,
    ParenOpen = 0x0000_0013,
    ParenClose = 0x0000_0014,
    BracketOpen = 0x0000_0015,
    BracketClose = 0x0000_0016,
    SquareBracketOpen = 0x0000_0017,
    SquareBracketClose = 0x0000_0018,
    Quote = 0x0000_0019,
    DoubleQuote = 0x0000_0020,
    Hash = 0x0000_0021,

    KwLet = token::FAMILY_KEYWORD | 0x0001,
    KwFn = token::FAMILY_KEYWORD | 0x0002,
    KwContext = token::FAMILY_KEYWORD | 0x0003,
    KwConst = token::FAMILY_KEYWORD | 0x0004,
    KwCtx = token::FAMILY_KEYWORD | 0x0005,
    KwMut = token::FAMILY_KEYWORD | 0x0006,
    KwDef = token::FAMILY_KEYWORD | 0x0007,
    KwTypeOf = token::FAMILY_KEYWORD | 0x0100,
    KwStruct = token::FAMILY_KEYWORD | 0x0101,
    KwAlias = token::FAMILY_KEYWORD | 0x0102,
    KwFalse = token::FAMILY_KEYWORD | 0x1000,
    KwTrue = token::FAMILY_KEYWORD | 0x1001,

    OpAssign = token::FAMILY_OPERATOR | 0x0001,
    OpPlus = token::FAMILY_OPERATOR | 0x0002,
    OpMinus = token::FAMILY_OPERATOR | 0x0003,
    OpMul = token::FAMILY_OPERATOR | 0x0004,
    OpDiv = token::FAMILY_OPERATOR | 0x0005,
    OpAnd = token::FAMILY_OPERATOR | 0x0006,
    OpOr = token::FAMILY_OPERATOR | 0x0007,

    NtVoid = token::FAMILY_NATIVE_TYPE,
    NtBool = token::FAMILY_NATIVE_TYPE | 0x0001,
    NtUtf8 = token::FAMILY_NATIVE_TYPE | 0x0002,
    NtF32 = token::FAMILY_NATIVE_FLOAT | 0x0001,
    NtF64 = token::FAMILY_NATIVE_FLOAT | 0x0002,
    NtI8 = token::FAMILY_NATIVE_SIGNED | 0x0001,
    NtI16 = token::FAMILY_NATIVE_SIGNED | 0x0002,
    NtI32 = token::FAMILY_NATIVE_SIGNED | 0x0003,
    NtI64 = token::FAMILY_NATIVE_SIGNED | 0x0004,
    NtU8 = token::FAMILY_NATIVE_UNSIGNED | 0x0005,
    NtU16 = token::FAMILY_NATIVE_UNSIGNED | 0x0006,
    NtU32 = token::FAMILY_NATIVE_UNSIGNED | 0x0007,
    NtU64 = token::FAMILY_NATIVE_UNSIGNED | 0x0008,

    Any = 0x7000_0000,
    Whitespace = 0x8000_0000,
    EndOfLine = 0x8000_0001,
    EndOfFile = 0x8000_0002,
}

#[derive(Debug, Clone, Copy)]
/// A classified lexical element. The text borrows from the source buffer for the whole
/// lifetime of the lexer and every tree built from it.
pub struct Token<'src> {
    pub text: &'src str,
    pub kind: TokenType,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Tokenizer rule set selection for the [Lexer](lexer::Lexer).
pub enum LexerRules {
    /// Read the rule set from the leading `context <Name>` declaration of the source.
    Provided,
    Script,
    Shader,
}

#[derive(Debug, Clone, Copy)]
/// Options accepted by the [Lexer](lexer::Lexer).
pub struct LexerOptions {
    pub rules: LexerRules,
    /// Width of a tab character when calculating token columns, so error messages carry
    /// the column a reader actually sees.
    pub tab_size: u32,
}

/// Outcome states shared by every parse routine and token rule.
///
/// Every [TokenRule](parser::TokenRule) carries one of these as its failure state so the
/// rule engine can surface a specific diagnostic instead of the generic
/// [ParseState::Error].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ParseState {
    Success = 0x0000_0000,
    Warning = 0x4000_0000,
    Error = 0x8000_0000,

    UnexpectedToken = 0x8000_0001,

    UnknownDefinition = 0x8000_0101,
    MissingAssignmentOperator = 0x8000_0102,

    MissingTypeName = 0x8000_0110,
    MissingBracketOpen = 0x8000_0111,
    MissingBracketClose = 0x8000_0112,
}

#[derive(Debug, Clone, Copy)]
/// A diagnostic reported by the parser, carrying the location of the offending token.
pub struct ParseError {
    pub state: ParseState,
    pub location: Location,
}

#[derive(Debug, Clone)]
/// An error raised while constructing a [Lexer](lexer::Lexer), before any token is
/// produced. Lexer failures are fatal; there is no recovery inside the token stream.
pub struct LexError {
    pub location: Location,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A enum structure to assign multiple level debugging to the lexer, the parser rule
/// engine and the virtual machine.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
