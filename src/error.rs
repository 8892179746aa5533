use crate::{LexError, Location, ParseError, ParseState};
use std::fmt::{Display, Formatter};

impl ParseState {
    pub fn has_error(&self) -> bool {
        (*self as u32) & (ParseState::Error as u32) != 0
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParseState::Success => "Success",
            ParseState::Warning => "Warning",
            ParseState::Error => "Error",
            ParseState::UnexpectedToken => "UnexpectedToken",
            ParseState::UnknownDefinition => "UnknownDefinition",
            ParseState::MissingAssignmentOperator => "MissingAssignmentOperator",
            ParseState::MissingTypeName => "MissingTypeName",
            ParseState::MissingBracketOpen => "MissingBracketOpen",
            ParseState::MissingBracketClose => "MissingBracketClose",
        }
    }
}

impl Display for ParseState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ParseError {
    pub fn new(state: ParseState, location: Location) -> Self {
        Self { state, location }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {} at {}", self.state, self.location)
    }
}

impl LexError {
    pub fn new(location: Location, message: String) -> Self {
        Self { location, message }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LexError: {} at {}", self.message, self.location)
    }
}

impl std::error::Error for ParseError {}
impl std::error::Error for LexError {}
