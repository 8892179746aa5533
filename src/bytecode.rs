//! The 32-bit word bytecode representation.
//!
//! Every instruction is one [ByteCode] word, optionally followed by immediate value
//! words. A word is either an operation (`op` in the low 16 bits, extension in bits
//! 16–23, register in bits 24–31), a 28-bit address with 4 extension bits, or a raw
//! value. A complete [ScriptImage] starts with a symbol table header terminated by a
//! `META/MetaEnd` word, followed by one frame per function.

use num_enum::TryFromPrimitive;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u16)]
pub enum OpCode {
    Noop = 0,
    Meta,
    Exec,
    Movr,
    Mova,
    Movs,
    Add32,
    Sub32,
    Mul32,
    Div32,
    Add64,
    Sub64,
    Mul64,
    Div64,
    Call0Void,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum OpExt {
    None = 0,
    Reg,
    Stack,
    Addr,
    Value,
    ValueSp,
    Func,
    MetaSymbol,
    MetaEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum OpReg {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    /// Memory address register for MOV to and from the data region.
    Ptr,
    /// Target pointer for calls.
    Tp,
    /// Stack offset register.
    Sp,
    /// Write sink.
    Void,
}

pub const REGISTER_COUNT: usize = OpReg::Void as usize + 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteCode(pub u32);

impl ByteCode {
    pub fn op(operation: OpCode, extension: OpExt, register: OpReg) -> Self {
        Self::op_raw(operation, extension as u8, register)
    }

    /// An operation word with a raw extension byte; META words store their payload
    /// (version, stack size) directly in the extension field.
    pub fn op_raw(operation: OpCode, extension: u8, register: OpReg) -> Self {
        Self((operation as u32) | ((extension as u32) << 16) | ((register as u32) << 24))
    }

    pub fn value(value: u32) -> Self {
        Self(value)
    }

    /// A 28-bit location with zeroed extension bits.
    pub fn addr(loc: u32) -> Self {
        Self(loc & 0x0FFF_FFFF)
    }

    pub fn opcode(self) -> Result<OpCode, u16> {
        let raw = (self.0 & 0xFFFF) as u16;
        OpCode::try_from(raw).map_err(|_| raw)
    }

    pub fn ext(self) -> Result<OpExt, u8> {
        let raw = self.ext_raw();
        OpExt::try_from(raw).map_err(|_| raw)
    }

    /// The raw extension byte, which is a payload byte for META words.
    pub fn ext_raw(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn register(self) -> Result<OpReg, u8> {
        let raw = self.register_raw();
        OpReg::try_from(raw).map_err(|_| raw)
    }

    /// The raw register byte; ALU words with the ValueSp extension use it as a literal.
    pub fn register_raw(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Number of words this instruction occupies, immediates included.
    pub fn width(self) -> usize {
        match (self.opcode(), self.ext()) {
            (Ok(OpCode::Movr), Ok(OpExt::Value | OpExt::Func | OpExt::Reg)) => 2,
            (Ok(OpCode::Mova), Ok(OpExt::Value)) => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Debug for ByteCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Ok(op) => write!(
                f,
                "ByteCode({:?}, {:#04x}, {:#04x})",
                op,
                self.ext_raw(),
                self.register_raw()
            ),
            Err(_) => write!(f, "ByteCode({:#010x})", self.0),
        }
    }
}

/// A function name packed for the image header: UTF-8 bytes, four per word, most
/// significant byte first within each word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    words: Vec<ByteCode>,
    byte_len: u32,
}

impl Symbol {
    pub fn pack(name: &str) -> Self {
        let mut words = Vec::with_capacity((name.len() + 3) / 4);
        let mut word = 0u32;
        let mut bytes_in_word = 0u32;

        for byte in name.bytes() {
            word = (word << 8) | u32::from(byte);
            bytes_in_word += 1;
            if bytes_in_word == 4 {
                words.push(ByteCode::value(word));
                word = 0;
                bytes_in_word = 0;
            }
        }
        if bytes_in_word != 0 {
            words.push(ByteCode::value(word));
        }

        Self {
            words,
            byte_len: name.len() as u32,
        }
    }

    pub fn words(&self) -> &[ByteCode] {
        &self.words
    }

    pub fn byte_len(&self) -> u32 {
        self.byte_len
    }

    pub fn word_count(&self) -> u32 {
        self.words.len() as u32
    }
}

/// The complete, linked bytecode artifact.
///
/// Header layout, repeated per function: `Op{Meta, MetaSymbol, Void}`, one value word
/// with the function frame offset (in words from the image start), one value word with
/// the symbol byte length, then the packed name words. The header terminates with
/// `Op{Meta, MetaEnd, Void}`. Every function frame is
/// `Meta(version) Meta(stack_size) Exec(version) … End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptImage {
    words: Vec<ByteCode>,
}

impl ScriptImage {
    pub fn new(words: Vec<ByteCode>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[ByteCode] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Walk the symbol table header and return the frame offset of the named function.
    pub fn find_symbol(&self, name: &str) -> Option<u32> {
        let target = Symbol::pack(name);

        let mut index = 0usize;
        while index < self.words.len() {
            let word = self.words[index];
            if word.opcode() != Ok(OpCode::Meta) {
                return None;
            }
            match word.ext() {
                Ok(OpExt::MetaEnd) => return None,
                Ok(OpExt::MetaSymbol) => {
                    let offset = self.words.get(index + 1)?.0;
                    let byte_len = self.words.get(index + 2)?.0;
                    let word_count = ((byte_len + 3) / 4) as usize;
                    let name_words = self.words.get(index + 3..index + 3 + word_count)?;

                    if byte_len == target.byte_len() && name_words == target.words() {
                        return Some(offset);
                    }
                    index += 3 + word_count;
                }
                _ => return None,
            }
        }
        None
    }

    /// Function names listed in the header, in image order.
    pub fn symbols(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut index = 0usize;
        while index < self.words.len() {
            let word = self.words[index];
            if word.opcode() != Ok(OpCode::Meta) || word.ext() != Ok(OpExt::MetaSymbol) {
                break;
            }
            let byte_len = match self.words.get(index + 2) {
                Some(w) => w.0 as usize,
                None => break,
            };
            let word_count = (byte_len + 3) / 4;
            let mut bytes = Vec::with_capacity(byte_len);
            for (i, w) in self
                .words
                .iter()
                .skip(index + 3)
                .take(word_count)
                .enumerate()
            {
                let be = w.0.to_be_bytes();
                // A partial trailing word keeps its bytes at the low end.
                if i + 1 == word_count && byte_len % 4 != 0 {
                    bytes.extend_from_slice(&be[4 - byte_len % 4..]);
                } else {
                    bytes.extend_from_slice(&be);
                }
            }
            if let Ok(name) = String::from_utf8(bytes) {
                result.push(name);
            }
            index += 3 + word_count;
        }
        result
    }

    /// Serialize as the wire format: consecutive little-endian 32-bit words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            bytes.extend_from_slice(&word.0.to_le_bytes());
        }
        bytes
    }
}

impl Display for ScriptImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ScriptImage[{} words]", self.words.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_word_packing() {
        let word = ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::Ptr);
        assert_eq!(word.opcode(), Ok(OpCode::Movr));
        assert_eq!(word.ext(), Ok(OpExt::Value));
        assert_eq!(word.register(), Ok(OpReg::Ptr));
        assert_eq!(word.0 & 0xFFFF, OpCode::Movr as u32);
        assert_eq!((word.0 >> 16) & 0xFF, OpExt::Value as u32);
        assert_eq!(word.0 >> 24, OpReg::Ptr as u32);
    }

    #[test]
    fn meta_words_carry_payload_in_the_extension() {
        let word = ByteCode::op_raw(OpCode::Meta, 32, OpReg::Void);
        assert_eq!(word.opcode(), Ok(OpCode::Meta));
        assert_eq!(word.ext_raw(), 32);
    }

    #[test]
    fn instruction_width_accounts_for_immediates() {
        assert_eq!(ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0).width(), 2);
        assert_eq!(ByteCode::op(OpCode::Movr, OpExt::Func, OpReg::Tp).width(), 2);
        assert_eq!(ByteCode::op(OpCode::Movr, OpExt::Reg, OpReg::R1).width(), 2);
        assert_eq!(ByteCode::op(OpCode::Mova, OpExt::Value, OpReg::Void).width(), 2);
        assert_eq!(ByteCode::op(OpCode::Mova, OpExt::Reg, OpReg::R0).width(), 1);
        assert_eq!(ByteCode::op(OpCode::Add32, OpExt::Reg, OpReg::R1).width(), 1);
        assert_eq!(ByteCode::op(OpCode::End, OpExt::None, OpReg::Void).width(), 1);
    }

    #[test]
    fn symbol_packing_is_big_endian_within_words() {
        let symbol = Symbol::pack("main");
        assert_eq!(symbol.byte_len(), 4);
        assert_eq!(symbol.words(), &[ByteCode::value(0x6D61_696E)]);

        let symbol = Symbol::pack("sum");
        assert_eq!(symbol.byte_len(), 3);
        assert_eq!(symbol.words(), &[ByteCode::value(0x0073_756D)]);

        let symbol = Symbol::pack("entry");
        assert_eq!(symbol.byte_len(), 5);
        assert_eq!(symbol.word_count(), 2);
        assert_eq!(
            symbol.words(),
            &[ByteCode::value(0x656E_7472), ByteCode::value(0x0000_0079)]
        );
    }

    #[test]
    fn image_bytes_are_little_endian() {
        let image = ScriptImage::new(vec![ByteCode::value(0x0102_0304)]);
        assert_eq!(image.to_bytes(), vec![0x04, 0x03, 0x02, 0x01]);
    }
}
