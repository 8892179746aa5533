use crate::{Location, Token, TokenType};

pub(crate) const FAMILY_KEYWORD: u32 = 0x0001_0000;
pub(crate) const FAMILY_OPERATOR: u32 = 0x0002_0000;
pub(crate) const FAMILY_NATIVE_TYPE: u32 = 0x0004_0000;
pub(crate) const FAMILY_NATIVE_SIGNED: u32 = FAMILY_NATIVE_TYPE | 0x0100;
pub(crate) const FAMILY_NATIVE_UNSIGNED: u32 = FAMILY_NATIVE_TYPE | 0x0200;
pub(crate) const FAMILY_NATIVE_FLOAT: u32 = FAMILY_NATIVE_TYPE | 0x0400;

const FAMILY_SPECIAL: u32 = 0x8000_0000;

impl TokenType {
    pub fn is_keyword(&self) -> bool {
        (*self as u32) & FAMILY_KEYWORD != 0
    }

    pub fn is_operator(&self) -> bool {
        (*self as u32) & FAMILY_OPERATOR != 0
    }

    pub fn is_native_type(&self) -> bool {
        (*self as u32) & FAMILY_NATIVE_TYPE != 0
    }

    pub fn is_special(&self) -> bool {
        (*self as u32) & FAMILY_SPECIAL != 0
    }

    /// Whether the token can appear as a value leaf inside an expression.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            TokenType::Symbol
                | TokenType::Literal
                | TokenType::String
                | TokenType::Number
                | TokenType::NumberHex
                | TokenType::NumberOct
                | TokenType::NumberBin
                | TokenType::NumberFloat
                | TokenType::KwTrue
                | TokenType::KwFalse
        )
    }
}

impl<'src> Token<'src> {
    pub fn new(text: &'src str, kind: TokenType, location: Location) -> Self {
        Self {
            text,
            kind,
            location,
        }
    }
}

impl Default for Token<'_> {
    fn default() -> Self {
        Self {
            text: "",
            kind: TokenType::Invalid,
            location: Location::default(),
        }
    }
}
