//! The stack machine interpreter.
//!
//! A frame executes from its two META words (version and data region size) through the
//! EXEC word until END. Registers are zeroed for every frame; after a nested call the
//! caller's registers are restored except R0, which carries the callee result. The data
//! region and the spill stack are shared between nested frames.

use crate::bytecode::{ByteCode, OpCode, OpExt, OpReg, ScriptImage, REGISTER_COUNT};
use crate::Log;
use once_cell::unsync::OnceCell;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmErrorKind {
    /// Unknown opcode or an opcode/extension pairing the machine does not support.
    InvalidInstruction,
    /// The frame ran past the end of the image without hitting END.
    TruncatedImage,
    /// The requested entry symbol is not present in the image header.
    UnknownSymbol,
    /// A data region or stack access fell outside the allocated bytes.
    MemoryFault,
    DivideByZero,
}

#[derive(Debug, Clone, Copy)]
/// A fatal execution fault, carrying the raw instruction word and the program counter.
pub struct VmError {
    pub kind: VmErrorKind,
    pub instruction: u32,
    pub counter: usize,
}

impl VmError {
    fn at(kind: VmErrorKind, instruction: ByteCode, counter: usize) -> Self {
        Self {
            kind,
            instruction: instruction.0,
            counter,
        }
    }
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VmError: {:?} (opcode {:#010x}) at word {}",
            self.kind, self.instruction, self.counter
        )
    }
}

impl std::error::Error for VmError {}

/// Register file, spill stack and data region of one invocation. The state is owned by
/// exactly one call at a time; the data region stays readable afterwards so callers can
/// inspect variable slots.
pub struct ExecutionState {
    pub registers: [u32; REGISTER_COUNT],
    stack: Vec<u8>,
    memory: Vec<u8>,
}

impl ExecutionState {
    /// `stack_size` bytes of spill stack. The data region is sized per frame from the
    /// frame's stack size META word.
    pub fn new(stack_size: usize) -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            stack: vec![0; stack_size],
            memory: Vec::new(),
        }
    }

    pub fn register(&self, register: OpReg) -> u32 {
        self.registers[register as usize]
    }

    /// Read a little-endian u32 from the data region.
    pub fn memory_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.memory.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn write_memory(&mut self, offset: usize, value: u32) -> Option<()> {
        let bytes = self.memory.get_mut(offset..offset + 4)?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    fn read_memory(&self, offset: usize) -> Option<u32> {
        self.memory_u32(offset)
    }

    fn write_stack(&mut self, offset: usize, value: u32) -> Option<()> {
        let bytes = self.stack.get_mut(offset..offset + 4)?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    fn read_stack(&self, offset: usize) -> Option<u32> {
        let bytes = self.stack.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

pub struct VirtualMachine {
    log: OnceCell<Log<&'static str>>,
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self {
            log: OnceCell::new(),
        }
    }

    /// Set a log label to trace executed instructions based on the level of [Log].
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    /// Execute the function frame starting at `offset` (its first META word). The data
    /// region is zeroed before the outermost frame runs and left intact afterwards.
    pub fn execute(
        &self,
        image: &ScriptImage,
        offset: u32,
        state: &mut ExecutionState,
    ) -> Result<(), VmError> {
        for byte in state.memory.iter_mut() {
            *byte = 0;
        }
        self.execute_frame(image.words(), offset as usize, state, 0)
    }

    fn execute_frame(
        &self,
        words: &[ByteCode],
        offset: usize,
        state: &mut ExecutionState,
        depth: usize,
    ) -> Result<(), VmError> {
        let fetch = |index: usize| -> Result<ByteCode, VmError> {
            words.get(index).copied().ok_or(VmError {
                kind: VmErrorKind::TruncatedImage,
                instruction: 0,
                counter: index,
            })
        };

        let mut pc = offset;

        // META(version), META(stack_size), EXEC(version).
        let meta = fetch(pc)?;
        if meta.opcode() != Ok(OpCode::Meta) {
            return Err(VmError::at(VmErrorKind::InvalidInstruction, meta, pc));
        }
        pc += 1;

        let meta = fetch(pc)?;
        if meta.opcode() != Ok(OpCode::Meta) {
            return Err(VmError::at(VmErrorKind::InvalidInstruction, meta, pc));
        }
        let data_size = meta.ext_raw() as usize + 32;
        if state.memory.len() < data_size {
            state.memory.resize(data_size, 0);
        }
        pc += 1;

        let exec = fetch(pc)?;
        if exec.opcode() != Ok(OpCode::Exec) {
            return Err(VmError::at(VmErrorKind::InvalidInstruction, exec, pc));
        }
        pc += 1;

        state.registers = [0; REGISTER_COUNT];

        loop {
            let word = fetch(pc)?;
            let opcode = word
                .opcode()
                .map_err(|_| VmError::at(VmErrorKind::InvalidInstruction, word, pc))?;

            if let Some(log) = self.log.get() {
                log.log_trace(
                    "Exec",
                    format_args!(
                        "{:>4}: {:?} R0={} R1={}",
                        pc,
                        word,
                        state.registers[0],
                        state.registers[1]
                    ),
                );
            }

            match opcode {
                OpCode::End => return Ok(()),
                OpCode::Noop => pc += 1,
                OpCode::Movr => {
                    let ext = word
                        .ext()
                        .map_err(|_| VmError::at(VmErrorKind::InvalidInstruction, word, pc))?;
                    let register = word.register_raw() as usize;
                    match ext {
                        OpExt::Value | OpExt::Func => {
                            let value = fetch(pc + 1)?.0;
                            state.registers[register % REGISTER_COUNT] = value;
                            pc += 2;
                        }
                        OpExt::Reg => {
                            let source = fetch(pc + 1)?.0 as usize;
                            state.registers[register % REGISTER_COUNT] =
                                state.registers[source % REGISTER_COUNT];
                            pc += 2;
                        }
                        OpExt::Addr => {
                            let address = state.register(OpReg::Ptr) as usize;
                            let value = state.read_memory(address).ok_or_else(|| {
                                VmError::at(VmErrorKind::MemoryFault, word, pc)
                            })?;
                            state.registers[register % REGISTER_COUNT] = value;
                            pc += 1;
                        }
                        OpExt::Stack => {
                            let address = state.register(OpReg::Sp) as usize;
                            let value = state.read_stack(address).ok_or_else(|| {
                                VmError::at(VmErrorKind::MemoryFault, word, pc)
                            })?;
                            state.registers[register % REGISTER_COUNT] = value;
                            pc += 1;
                        }
                        _ => return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc)),
                    }
                }
                OpCode::Mova => {
                    let ext = word
                        .ext()
                        .map_err(|_| VmError::at(VmErrorKind::InvalidInstruction, word, pc))?;
                    let address = state.register(OpReg::Ptr) as usize;
                    match ext {
                        OpExt::Value => {
                            let value = fetch(pc + 1)?.0;
                            state.write_memory(address, value).ok_or_else(|| {
                                VmError::at(VmErrorKind::MemoryFault, word, pc)
                            })?;
                            pc += 2;
                        }
                        OpExt::Reg => {
                            let value = state.registers[word.register_raw() as usize % REGISTER_COUNT];
                            state.write_memory(address, value).ok_or_else(|| {
                                VmError::at(VmErrorKind::MemoryFault, word, pc)
                            })?;
                            pc += 1;
                        }
                        _ => return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc)),
                    }
                }
                OpCode::Movs => {
                    let ext = word
                        .ext()
                        .map_err(|_| VmError::at(VmErrorKind::InvalidInstruction, word, pc))?;
                    if ext != OpExt::Reg {
                        return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc));
                    }
                    let address = state.register(OpReg::Sp) as usize;
                    let value = state.registers[word.register_raw() as usize % REGISTER_COUNT];
                    state
                        .write_stack(address, value)
                        .ok_or_else(|| VmError::at(VmErrorKind::MemoryFault, word, pc))?;
                    pc += 1;
                }
                OpCode::Add32 | OpCode::Sub32 | OpCode::Mul32 | OpCode::Div32 => {
                    let ext = word
                        .ext()
                        .map_err(|_| VmError::at(VmErrorKind::InvalidInstruction, word, pc))?;
                    match ext {
                        OpExt::ValueSp => {
                            // The register field is a literal operand for stack pointer
                            // adjustment.
                            let operand = word.register_raw() as u32;
                            let sp = state.register(OpReg::Sp);
                            state.registers[OpReg::Sp as usize] =
                                alu(opcode, sp, operand, word, pc)?;
                            pc += 1;
                        }
                        OpExt::Reg => {
                            let source =
                                state.registers[word.register_raw() as usize % REGISTER_COUNT];
                            let r0 = state.registers[OpReg::R0 as usize];
                            state.registers[OpReg::R0 as usize] =
                                alu(opcode, r0, source, word, pc)?;
                            pc += 1;
                        }
                        _ => return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc)),
                    }
                }
                OpCode::Call0Void => {
                    let target = state.register(OpReg::Tp) as usize;
                    let saved = state.registers;
                    self.execute_frame(words, target, state, depth + 1)?;
                    let result = state.registers[OpReg::R0 as usize];
                    state.registers = saved;
                    state.registers[OpReg::R0 as usize] = result;
                    pc += 1;
                }
                OpCode::Meta | OpCode::Exec => {
                    return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc))
                }
                OpCode::Add64 | OpCode::Sub64 | OpCode::Mul64 | OpCode::Div64 => {
                    return Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc))
                }
            }
        }
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn alu(opcode: OpCode, left: u32, right: u32, word: ByteCode, pc: usize) -> Result<u32, VmError> {
    match opcode {
        OpCode::Add32 => Ok(left.wrapping_add(right)),
        OpCode::Sub32 => Ok(left.wrapping_sub(right)),
        OpCode::Mul32 => Ok(left.wrapping_mul(right)),
        OpCode::Div32 => {
            if right == 0 {
                Err(VmError::at(VmErrorKind::DivideByZero, word, pc))
            } else {
                Ok((left as i32).wrapping_div(right as i32) as u32)
            }
        }
        _ => Err(VmError::at(VmErrorKind::InvalidInstruction, word, pc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ByteCode, OpCode, OpExt, OpReg, ScriptImage};

    fn frame(body: Vec<ByteCode>) -> ScriptImage {
        let mut words = vec![ByteCode::op(OpCode::Meta, OpExt::MetaEnd, OpReg::Void)];
        words.push(ByteCode::op_raw(OpCode::Meta, 1, OpReg::Void));
        words.push(ByteCode::op_raw(OpCode::Meta, 32, OpReg::Void));
        words.push(ByteCode::op_raw(OpCode::Exec, 1, OpReg::Void));
        words.extend(body);
        words.push(ByteCode::op(OpCode::End, OpExt::None, OpReg::Void));
        ScriptImage::new(words)
    }

    fn run(body: Vec<ByteCode>) -> ExecutionState {
        let image = frame(body);
        let vm = VirtualMachine::new();
        let mut state = ExecutionState::new(64);
        vm.execute(&image, 1, &mut state).unwrap();
        state
    }

    #[test]
    fn movr_value_and_alu() {
        let state = run(vec![
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(6),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R1),
            ByteCode::value(7),
            ByteCode::op(OpCode::Mul32, OpExt::Reg, OpReg::R1),
        ]);
        assert_eq!(state.register(OpReg::R0), 42);
    }

    #[test]
    fn mova_writes_through_ptr() {
        let state = run(vec![
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(14),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::Ptr),
            ByteCode::value(4),
            ByteCode::op(OpCode::Mova, OpExt::Reg, OpReg::R0),
        ]);
        assert_eq!(state.memory_u32(4), Some(14));
        // Offset 0 is never written by the store.
        assert_eq!(state.memory_u32(0), Some(0));
    }

    #[test]
    fn stack_spill_round_trip() {
        let state = run(vec![
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(11),
            ByteCode::op(OpCode::Movs, OpExt::Reg, OpReg::R0),
            ByteCode::op(OpCode::Add32, OpExt::ValueSp, OpReg::R4),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(99),
            ByteCode::op(OpCode::Sub32, OpExt::ValueSp, OpReg::R4),
            ByteCode::op(OpCode::Movr, OpExt::Stack, OpReg::R1),
        ]);
        assert_eq!(state.register(OpReg::R1), 11);
        assert_eq!(state.register(OpReg::Sp), 0);
    }

    #[test]
    fn subtraction_wraps_to_twos_complement() {
        let state = run(vec![
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(0),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R1),
            ByteCode::value(10),
            ByteCode::op(OpCode::Sub32, OpExt::Reg, OpReg::R1),
        ]);
        assert_eq!(state.register(OpReg::R0), (-10i32) as u32);
    }

    #[test]
    fn divide_by_zero_is_a_fault() {
        let image = frame(vec![
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(1),
            ByteCode::op(OpCode::Div32, OpExt::Reg, OpReg::R1),
        ]);
        let vm = VirtualMachine::new();
        let mut state = ExecutionState::new(64);
        let error = vm.execute(&image, 1, &mut state).unwrap_err();
        assert_eq!(error.kind, VmErrorKind::DivideByZero);
    }

    #[test]
    fn meta_inside_a_body_is_a_fault() {
        let image = frame(vec![ByteCode::op_raw(OpCode::Meta, 1, OpReg::Void)]);
        let vm = VirtualMachine::new();
        let mut state = ExecutionState::new(64);
        let error = vm.execute(&image, 1, &mut state).unwrap_err();
        assert_eq!(error.kind, VmErrorKind::InvalidInstruction);
    }

    #[test]
    fn truncated_frame_is_a_fault() {
        let words = vec![
            ByteCode::op_raw(OpCode::Meta, 1, OpReg::Void),
            ByteCode::op_raw(OpCode::Meta, 32, OpReg::Void),
            ByteCode::op_raw(OpCode::Exec, 1, OpReg::Void),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
        ];
        let image = ScriptImage::new(words);
        let vm = VirtualMachine::new();
        let mut state = ExecutionState::new(64);
        let error = vm.execute(&image, 0, &mut state).unwrap_err();
        assert_eq!(error.kind, VmErrorKind::TruncatedImage);
    }
}
