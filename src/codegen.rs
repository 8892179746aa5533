//! Lowering from the syntax tree to bytecode.
//!
//! The generator visits completed function definitions, assigns each local variable a
//! data region offset (4 bytes apiece, starting at 4; offset 0 stays reserved) and
//! lowers statement expressions with a precedence climbing walk over the flat
//! operand/operator sibling runs the parser produces.
//!
//! Expression evaluation uses R0 as the accumulator and R1 for the right hand operand.
//! When a higher precedence run interrupts an accumulated left side, R0 is spilled to
//! the stack (`MOVS REG,R0; ADD32 VALUE_SP,R4`), the sub-run is evaluated, its result is
//! moved into R1 and the left side is popped back (`SUB32 VALUE_SP,R4; MOVR STACK,R0`)
//! before the pending operator is applied.

use crate::bytecode::{ByteCode, OpCode, OpExt, OpReg, ScriptImage, Symbol};
use crate::syntax::{NodeId, SyntaxEntity, SyntaxNodeAllocator, SyntaxNodeData, SyntaxVisitor};
use crate::{Token, TokenType};
use std::collections::HashMap;

/// Precedence level of a binary operator token; unary minus binds tighter than any
/// binary operator.
fn operation_level(operation: TokenType) -> u32 {
    match operation {
        TokenType::OpAssign => 0,
        TokenType::OpPlus | TokenType::OpMinus => 1,
        TokenType::OpMul | TokenType::OpDiv => 2,
        _ => 0,
    }
}

/// Numeric value of a literal token, interpreted per its base. Floats lower to their
/// IEEE-754 bit pattern.
fn literal_value(token: &Token) -> u32 {
    let text: String = token.text.chars().filter(|c| *c != '\'').collect();
    match token.kind {
        TokenType::Number => text.parse::<i32>().map(|v| v as u32).unwrap_or(0),
        TokenType::NumberHex => u32::from_str_radix(&text[2..], 16).unwrap_or(0),
        TokenType::NumberBin => u32::from_str_radix(&text[2..], 2).unwrap_or(0),
        TokenType::NumberOct => {
            let digits = &text[1..];
            if digits.is_empty() {
                0
            } else {
                u32::from_str_radix(digits, 8).unwrap_or(0)
            }
        }
        TokenType::NumberFloat => text.parse::<f32>().map(f32::to_bits).unwrap_or(0),
        TokenType::KwTrue => 1,
        TokenType::KwFalse => 0,
        // Char literals lower to their first code point; strings have no blob memory
        // and lower to zero.
        TokenType::Literal => text
            .trim_matches('\'')
            .chars()
            .next()
            .map(|c| c as u32)
            .unwrap_or(0),
        _ => 0,
    }
}

/// A visitor that lowers every function definition it sees and links the final image.
pub struct BytecodeGenerator<'src> {
    functions: Vec<(Symbol, Vec<ByteCode>)>,
    function_indices: HashMap<&'src str, u32>,
    variables: HashMap<&'src str, u32>,
}

impl<'src> BytecodeGenerator<'src> {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            function_indices: HashMap::new(),
            variables: HashMap::new(),
        }
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Lay out the image: the symbol header in definition order, then every function
    /// frame, with call placeholders rewritten to resolved frame offsets.
    pub fn finalize(self) -> ScriptImage {
        let mut header_len = 1u32; // the MetaEnd terminator
        for (symbol, _) in &self.functions {
            header_len += 3 + symbol.word_count();
        }

        let mut offsets = Vec::with_capacity(self.functions.len());
        let mut offset = header_len;
        for (_, codes) in &self.functions {
            offsets.push(offset);
            offset += codes.len() as u32;
        }

        let mut words = Vec::with_capacity(offset as usize);
        for (index, (symbol, _)) in self.functions.iter().enumerate() {
            words.push(ByteCode::op(OpCode::Meta, OpExt::MetaSymbol, OpReg::Void));
            words.push(ByteCode::value(offsets[index]));
            words.push(ByteCode::value(symbol.byte_len()));
            words.extend_from_slice(symbol.words());
        }
        words.push(ByteCode::op(OpCode::Meta, OpExt::MetaEnd, OpReg::Void));

        for (_, codes) in &self.functions {
            let mut index = 0usize;
            while index < codes.len() {
                let word = codes[index];
                let width = word.width();
                if word.opcode() == Ok(OpCode::Movr) && word.ext() == Ok(OpExt::Func) {
                    let placeholder = codes[index + 1].0 as usize;
                    words.push(word);
                    words.push(ByteCode::value(offsets[placeholder]));
                    index += 2;
                    continue;
                }
                words.extend_from_slice(&codes[index..index + width]);
                index += width;
            }
        }

        ScriptImage::new(words)
    }

    fn lower_function(&mut self, nodes: &dyn SyntaxNodeAllocator<'src>, function: NodeId) {
        let name = match &nodes.node(function).data {
            SyntaxNodeData::Function { name, .. } => name.text,
            _ => return,
        };

        let body = match nodes.node(function).sibling {
            Some(body) if nodes.node(body).entity() == SyntaxEntity::DefFunctionBody => body,
            _ => return,
        };

        self.variables.clear();

        let locals = crate::syntax::children(nodes, body)
            .filter(|id| nodes.node(*id).entity() == SyntaxEntity::DefVariable)
            .count() as u32;
        let stack_size = (4 + locals * 4).max(32).min(255) as u8;

        let mut codes = Vec::new();
        codes.push(ByteCode::op_raw(OpCode::Meta, 1, OpReg::Void));
        codes.push(ByteCode::op_raw(OpCode::Meta, stack_size, OpReg::Void));
        codes.push(ByteCode::op_raw(OpCode::Exec, 1, OpReg::Void));

        let mut var_addr = 4u32;
        for statement in crate::syntax::children(nodes, body) {
            match nodes.node(statement).entity() {
                SyntaxEntity::DefVariable => {
                    if let SyntaxNodeData::Variable { name, .. } = &nodes.node(statement).data {
                        self.variables.insert(name.text, var_addr);
                    }
                    if let Some(initializer) = nodes.node(statement).child {
                        if nodes.node(initializer).entity() == SyntaxEntity::ExpExpression {
                            self.lower_expression(nodes, initializer, &mut codes, var_addr);
                        }
                    }
                    var_addr += 4;
                }
                SyntaxEntity::ExpExpression => {
                    self.lower_expression(nodes, statement, &mut codes, 0);
                }
                _ => {}
            }
        }

        codes.push(ByteCode::op(OpCode::End, OpExt::None, OpReg::Void));

        let index = self.functions.len() as u32;
        self.functions.push((Symbol::pack(name), codes));
        self.function_indices.insert(name, index);
    }

    /// Lower one statement expression. When the run starts with an assignment (either a
    /// bare `= …` initializer chain or `symbol = …`), the right hand side is evaluated
    /// into R0 and stored through PTR; otherwise the value is computed and dropped.
    fn lower_expression(
        &mut self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        expression: NodeId,
        codes: &mut Vec<ByteCode>,
        address: u32,
    ) {
        let first = match nodes.node(expression).child {
            Some(first) => first,
            None => return,
        };

        enum Destination<'a> {
            DataOffset(u32),
            Variable(&'a str),
        }

        let mut assignment = None;
        let first_node = nodes.node(first);
        match &first_node.data {
            SyntaxNodeData::BinaryOperation { operation }
                if operation.kind == TokenType::OpAssign =>
            {
                assignment = Some((Destination::DataOffset(address), first_node.sibling));
            }
            SyntaxNodeData::Value { value } => {
                if let Some(second) = first_node.sibling {
                    if let SyntaxNodeData::BinaryOperation { operation } =
                        &nodes.node(second).data
                    {
                        if operation.kind == TokenType::OpAssign {
                            assignment = Some((
                                Destination::Variable(value.text),
                                nodes.node(second).sibling,
                            ));
                        }
                    }
                }
            }
            _ => {}
        }

        match assignment {
            Some((destination, rhs)) => {
                self.traverse(nodes, rhs, codes, 1);

                let target = match destination {
                    Destination::DataOffset(offset) => {
                        debug_assert_ne!(offset, 0, "assignment into the reserved offset");
                        Some(offset)
                    }
                    Destination::Variable(name) => self.variables.get(name).copied(),
                };
                // Stores to unknown symbols drop their value.
                if let Some(offset) = target {
                    codes.push(ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::Ptr));
                    codes.push(ByteCode::value(offset));
                    codes.push(ByteCode::op(OpCode::Mova, OpExt::Reg, OpReg::R0));
                }
            }
            None => {
                self.traverse(nodes, Some(first), codes, 1);
            }
        }
    }

    /// Precedence climbing over a flat sibling run. Returns the node where the walk
    /// stopped (the first operator below `level`, or the run's end).
    fn traverse(
        &mut self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        head: Option<NodeId>,
        codes: &mut Vec<ByteCode>,
        level: u32,
    ) -> Option<NodeId> {
        let mut first = head;
        let mut node = head;

        while let Some(current) = node {
            let mut next = nodes.node(current).sibling;
            let mut descend = false;
            let mut next_level = 0u32;

            if let Some(op_node) = next {
                if let SyntaxNodeData::BinaryOperation { operation } = &nodes.node(op_node).data {
                    next_level = operation_level(operation.kind);

                    if next_level < level {
                        // The run continues at a looser level; finish what belongs to
                        // this invocation and hand the rest back to the caller.
                        node = next;
                        break;
                    }
                    descend = next_level > level;
                }
            }

            if descend {
                if node != first {
                    // Finish the still pending same-level prefix, then park the
                    // accumulator on the stack while the tighter run evaluates.
                    let mut before = first.expect("non-empty run");
                    while before != current && nodes.node(before).sibling != Some(current) {
                        before = nodes.node(before).sibling.expect("linked run");
                    }
                    if first != Some(before) {
                        self.lower_span(nodes, first, Some(before), codes);
                        first = Some(before);
                    }
                    if self.is_binary_operation(nodes, first) {
                        push_spill(codes);
                    }
                }

                next = self.traverse(nodes, Some(current), codes, next_level);

                if node != first {
                    if self.is_binary_operation(nodes, first) {
                        // The sub-run result becomes the right operand; the parked left
                        // side returns to the accumulator.
                        codes.push(ByteCode::op(OpCode::Movr, OpExt::Reg, OpReg::R1));
                        codes.push(ByteCode::value(OpReg::R0 as u32));
                        pop_spill(codes);
                    }
                    self.lower_span(nodes, first, node, codes);
                }
                first = next;
            }

            node = next;
        }

        if first.is_some() && first != node {
            self.lower_span(nodes, first, node, codes);
        }
        node
    }

    fn is_binary_operation(
        &self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        id: Option<NodeId>,
    ) -> bool {
        matches!(
            id.map(|id| nodes.node(id).entity()),
            Some(SyntaxEntity::ExpBinaryOperation)
        )
    }

    /// Emit one same-level span `leaf (op leaf)*` between `from` (inclusive) and `to`
    /// (exclusive). A span starting with an operator continues an accumulator computed
    /// by the caller.
    fn lower_span(
        &mut self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        from: Option<NodeId>,
        to: Option<NodeId>,
        codes: &mut Vec<ByteCode>,
    ) {
        let mut from = from;

        if let Some(head) = from {
            if !self.is_binary_operation(nodes, Some(head)) {
                self.lower_operand(nodes, head, OpReg::R0, codes);
                from = nodes.node(head).sibling;
            }
        }

        while from != to {
            let current = match from {
                Some(current) => current,
                None => break,
            };

            if let SyntaxNodeData::BinaryOperation { operation } = &nodes.node(current).data {
                let operand = nodes.node(current).sibling;
                if operand != to {
                    if let Some(operand) = operand {
                        self.lower_operand(nodes, operand, OpReg::R1, codes);
                    }
                }
                self.lower_native_operation(operation.kind, codes);
                if operand != to {
                    from = operand;
                }
            }

            from = from.and_then(|id| nodes.node(id).sibling);
        }
    }

    /// Evaluate one operand leaf into the requested register. Compound operands (calls,
    /// parenthesised scopes, unary operations) naturally produce into R0; targeting R1
    /// parks the live accumulator on the stack around the evaluation.
    fn lower_operand(
        &mut self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        operand: NodeId,
        register: OpReg,
        codes: &mut Vec<ByteCode>,
    ) {
        match &nodes.node(operand).data {
            SyntaxNodeData::Value { value } => match value.kind {
                TokenType::Symbol => {
                    if let Some(offset) = self.variables.get(value.text) {
                        codes.push(ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::Ptr));
                        codes.push(ByteCode::value(*offset));
                        codes.push(ByteCode::op(OpCode::Movr, OpExt::Addr, register));
                    }
                }
                kind if kind.is_value() => {
                    codes.push(ByteCode::op(OpCode::Movr, OpExt::Value, register));
                    codes.push(ByteCode::value(literal_value(value)));
                }
                _ => {}
            },
            SyntaxNodeData::Call { .. }
            | SyntaxNodeData::ExpressionScope
            | SyntaxNodeData::UnaryOperation { .. } => {
                if register == OpReg::R1 {
                    push_spill(codes);
                    self.lower_compound(nodes, operand, codes);
                    codes.push(ByteCode::op(OpCode::Movr, OpExt::Reg, OpReg::R1));
                    codes.push(ByteCode::value(OpReg::R0 as u32));
                    pop_spill(codes);
                } else {
                    self.lower_compound(nodes, operand, codes);
                }
            }
            _ => {}
        }
    }

    /// Calls, scopes and unary operations always deliver their result in R0.
    fn lower_compound(
        &mut self,
        nodes: &dyn SyntaxNodeAllocator<'src>,
        operand: NodeId,
        codes: &mut Vec<ByteCode>,
    ) {
        match &nodes.node(operand).data {
            SyntaxNodeData::Call { function } => {
                // Arguments are parsed but the call convention carries none yet.
                if let Some(index) = self.function_indices.get(function.text) {
                    codes.push(ByteCode::op(OpCode::Movr, OpExt::Func, OpReg::Tp));
                    codes.push(ByteCode::value(*index));
                    codes.push(ByteCode::op(OpCode::Call0Void, OpExt::None, OpReg::Void));
                }
            }
            SyntaxNodeData::ExpressionScope => {
                self.traverse(nodes, nodes.node(operand).child, codes, 1);
            }
            SyntaxNodeData::UnaryOperation { .. } => {
                if let Some(inner) = nodes.node(operand).child {
                    self.lower_operand(nodes, inner, OpReg::R1, codes);
                    codes.push(ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0));
                    codes.push(ByteCode::value(0));
                    codes.push(ByteCode::op(OpCode::Sub32, OpExt::Reg, OpReg::R1));
                }
            }
            _ => {}
        }
    }

    fn lower_native_operation(&self, operation: TokenType, codes: &mut Vec<ByteCode>) {
        let opcode = match operation {
            TokenType::OpPlus => OpCode::Add32,
            TokenType::OpMinus => OpCode::Sub32,
            TokenType::OpMul => OpCode::Mul32,
            TokenType::OpDiv => OpCode::Div32,
            // `and` / `or` are reserved; no boolean ALU exists yet.
            _ => return,
        };
        codes.push(ByteCode::op(opcode, OpExt::Reg, OpReg::R1));
    }
}

impl<'src> Default for BytecodeGenerator<'src> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> SyntaxVisitor<'src> for BytecodeGenerator<'src> {
    fn visit_function(&mut self, nodes: &dyn SyntaxNodeAllocator<'src>, node: NodeId) {
        self.lower_function(nodes, node);
    }
}

fn push_spill(codes: &mut Vec<ByteCode>) {
    codes.push(ByteCode::op(OpCode::Movs, OpExt::Reg, OpReg::R0));
    codes.push(ByteCode::op(OpCode::Add32, OpExt::ValueSp, OpReg::R4));
}

fn pop_spill(codes: &mut Vec<ByteCode>) {
    codes.push(ByteCode::op(OpCode::Sub32, OpExt::ValueSp, OpReg::R4));
    codes.push(ByteCode::op(OpCode::Movr, OpExt::Stack, OpReg::R0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::DefaultParser;
    use crate::syntax::{HostArena, TrackingArena};
    use crate::words::WordStream;
    use crate::{LexerOptions, LexerRules};

    fn generate(source: &str) -> ScriptImage {
        let options = LexerOptions {
            rules: LexerRules::Shader,
            ..LexerOptions::default()
        };
        let lexer = Lexer::with_options(WordStream::new(source), options).unwrap();
        let mut arena = TrackingArena::new(HostArena::new());
        let parser = DefaultParser::new();
        let mut generator = BytecodeGenerator::new();
        {
            let mut visitors: [&mut dyn SyntaxVisitor; 1] = [&mut generator];
            let outcome = parser.parse(lexer, &mut arena, &mut visitors);
            assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        }
        generator.finalize()
    }

    fn frame_words(image: &ScriptImage, name: &str) -> Vec<ByteCode> {
        let offset = image.find_symbol(name).unwrap() as usize;
        let mut end = offset;
        while image.words()[end].opcode() != Ok(OpCode::End) {
            end += image.words()[end].width();
        }
        image.words()[offset..=end].to_vec()
    }

    #[test]
    fn image_header_lists_functions_in_definition_order() {
        let image = generate("fn beta(): void\n{\n}\nfn alpha(): void\n{\n}\n");
        assert_eq!(image.symbols(), vec!["beta", "alpha"]);

        let beta = image.find_symbol("beta").unwrap();
        let alpha = image.find_symbol("alpha").unwrap();
        assert!(beta < alpha);
        assert!(image.find_symbol("gamma").is_none());

        // Frames start with the two META words and the EXEC word.
        let frame = frame_words(&image, "beta");
        assert_eq!(frame[0].opcode(), Ok(OpCode::Meta));
        assert_eq!(frame[0].ext_raw(), 1);
        assert_eq!(frame[1].opcode(), Ok(OpCode::Meta));
        assert_eq!(frame[1].ext_raw(), 32);
        assert_eq!(frame[2].opcode(), Ok(OpCode::Exec));
        assert_eq!(frame.last().unwrap().opcode(), Ok(OpCode::End));
    }

    #[test]
    fn precedence_spills_the_left_side_around_tighter_runs() {
        let image = generate("fn f(): void\n{\n    let x: i32 = 2 + 3 * 4\n}\n");
        let frame = frame_words(&image, "f");

        let expected = vec![
            ByteCode::op_raw(OpCode::Meta, 1, OpReg::Void),
            ByteCode::op_raw(OpCode::Meta, 32, OpReg::Void),
            ByteCode::op_raw(OpCode::Exec, 1, OpReg::Void),
            // 2 -> R0
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(2),
            // spill the accumulator
            ByteCode::op(OpCode::Movs, OpExt::Reg, OpReg::R0),
            ByteCode::op(OpCode::Add32, OpExt::ValueSp, OpReg::R4),
            // 3 * 4 in R0
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R0),
            ByteCode::value(3),
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::R1),
            ByteCode::value(4),
            ByteCode::op(OpCode::Mul32, OpExt::Reg, OpReg::R1),
            // move product to R1, pop the left side
            ByteCode::op(OpCode::Movr, OpExt::Reg, OpReg::R1),
            ByteCode::value(OpReg::R0 as u32),
            ByteCode::op(OpCode::Sub32, OpExt::ValueSp, OpReg::R4),
            ByteCode::op(OpCode::Movr, OpExt::Stack, OpReg::R0),
            ByteCode::op(OpCode::Add32, OpExt::Reg, OpReg::R1),
            // store into x
            ByteCode::op(OpCode::Movr, OpExt::Value, OpReg::Ptr),
            ByteCode::value(4),
            ByteCode::op(OpCode::Mova, OpExt::Reg, OpReg::R0),
            ByteCode::op(OpCode::End, OpExt::None, OpReg::Void),
        ];
        assert_eq!(frame, expected);
    }

    #[test]
    fn lowering_is_deterministic() {
        let source = "fn f(): i32\n{\n    let a: i32 = 1 + 2\n    let b: i32 = a * 3\n}\n";
        let first = generate(source);
        let second = generate(source);
        assert_eq!(first, second);
    }

    #[test]
    fn call_placeholders_resolve_to_frame_offsets() {
        let image = generate("fn one(): i32 { 1 }\nfn two(): i32 { one() + one() }\n");
        let one_offset = image.find_symbol("one").unwrap();
        let two = frame_words(&image, "two");

        let mut call_targets = Vec::new();
        let mut index = 0usize;
        while index < two.len() {
            let word = two[index];
            if word.opcode() == Ok(OpCode::Movr) && word.ext() == Ok(OpExt::Func) {
                call_targets.push(two[index + 1].0);
            }
            index += word.width();
        }
        assert_eq!(call_targets, vec![one_offset, one_offset]);
    }

    #[test]
    fn stack_size_grows_with_locals() {
        let mut body = String::from("fn f(): void\n{\n");
        for i in 0..9 {
            body.push_str(&format!("    let v{}: i32 = {}\n", i, i));
        }
        body.push_str("}\n");
        let image = generate(&body);
        let frame = frame_words(&image, "f");
        assert_eq!(frame[1].ext_raw(), 40);
    }
}
