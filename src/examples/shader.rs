//! Compile and run helpers for shader dialect sources.

use crate::bytecode::ScriptImage;
use crate::codegen::BytecodeGenerator;
use crate::lexer::Lexer;
use crate::parser::DefaultParser;
use crate::syntax::{HostArena, SyntaxVisitor, TrackingArena};
use crate::vm::{ExecutionState, VirtualMachine, VmError, VmErrorKind};
use crate::words::WordStream;
use crate::{LexError, ParseError};
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex(err) => write!(f, "{}", err),
            CompileError::Parse(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}

/// Compile a complete source (including its `context` declaration) into a linked image.
/// The first parse diagnostic, if any, fails the compilation.
pub fn compile(source: &str) -> Result<ScriptImage, CompileError> {
    let lexer = Lexer::new(WordStream::new(source))?;

    let mut arena = TrackingArena::new(HostArena::new());
    let parser = DefaultParser::new();
    let mut generator = BytecodeGenerator::new();

    let outcome = {
        let mut visitors: [&mut dyn SyntaxVisitor; 1] = [&mut generator];
        parser.parse(lexer, &mut arena, &mut visitors)
    };

    if let Some(error) = outcome.errors.first() {
        return Err(CompileError::Parse(*error));
    }

    Ok(generator.finalize())
}

/// Execute one function of a compiled image on a fresh 256 byte stack and return the
/// final state for inspection.
pub fn run_function(image: &ScriptImage, name: &str) -> Result<ExecutionState, VmError> {
    let offset = image.find_symbol(name).ok_or(VmError {
        kind: VmErrorKind::UnknownSymbol,
        instruction: 0,
        counter: 0,
    })?;

    let vm = VirtualMachine::new();
    let mut state = ExecutionState::new(256);
    vm.execute(image, offset, &mut state)?;
    Ok(state)
}
