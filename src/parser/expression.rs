//! Hand written expression parsing.
//!
//! Expressions are kept deliberately flat: operands and binary operators become one
//! sibling run in source order (`value op value op value …`) and operator precedence is
//! reconstructed later by the bytecode lowerer. Each call of the recursive subexpression
//! matcher appends one or more siblings to the parent's child list and leaves the cursor
//! on the first unconsumed token.

use super::rules::{apply, apply_all, TokenCursor, TokenRule};
use crate::syntax::{
    append_child, destroy_chain, destroy_subtree, NodeId, SyntaxEntity, SyntaxNodeAllocator,
    SyntaxNodeData, TokenSlot,
};
use crate::{ParseState, TokenType};

const RULES_EXP_VALUES: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Number).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::NumberBin).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::NumberFloat).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::NumberHex).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::NumberOct).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::Literal).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::String).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::KwTrue).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::KwFalse).store(TokenSlot::Value),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Value),
];

const RULES_EXP_VALUE: &[TokenRule] = &[TokenRule::first(RULES_EXP_VALUES)];

const RULES_EXP_BINARY_OPS: &[TokenRule] = &[
    TokenRule::match_type(TokenType::OpAssign).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpPlus).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpMinus).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpMul).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpDiv).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpAnd).store(TokenSlot::Operation),
    TokenRule::match_type(TokenType::OpOr).store(TokenSlot::Operation),
];

const RULES_EXP_BINARY_OP: &[TokenRule] = &[TokenRule::first(RULES_EXP_BINARY_OPS)];

/// `value (op value)*` runs attached to a scratch node's sibling chain.
const RULES_EXP_LEFT_AND_OP: &[TokenRule] = &[
    TokenRule::sibling(SyntaxEntity::ExpValue, RULES_EXP_VALUE),
    TokenRule::sibling(SyntaxEntity::ExpBinaryOperation, RULES_EXP_BINARY_OP).optional(),
];

const RULES_EXP_BINARY: &[TokenRule] = &[TokenRule::all(RULES_EXP_LEFT_AND_OP).repeat()];

/// Optional trailing binary operator, appended to the sibling chain of the node it
/// continues.
const RULE_POST_BINARY: TokenRule =
    TokenRule::sibling(SyntaxEntity::ExpBinaryOperation, RULES_EXP_BINARY_OP).optional();

/// Parse one expression: subexpressions are matched repeatedly until one fails without
/// consuming anything, which ends the expression (usually at an end of line or a closing
/// delimiter).
pub(super) fn parse_expression<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    parent: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let mut matched = false;
    loop {
        let start = cursor.mark();
        match match_subexpression(nodes, parent, cursor) {
            Ok(()) => matched = true,
            Err(state) => {
                if matched && cursor.mark() == start {
                    return Ok(());
                }
                return Err(state);
            }
        }
    }
}

fn match_subexpression<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    match cursor.current().kind {
        TokenType::EndOfLine | TokenType::EndOfFile => Err(ParseState::Error),
        TokenType::ParenOpen => match_scope(nodes, node, cursor),
        TokenType::Symbol => match_symbol(nodes, node, cursor),
        TokenType::OpMinus => match_unary(nodes, node, cursor),
        _ => match_value_run(nodes, node, cursor),
    }
}

/// `( … )` becomes an explicit scope node whose children are the sub-expression; a
/// binary operator directly after the closing parenthesis continues the outer run.
fn match_scope<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let scope = nodes.create(SyntaxNodeData::ExpressionScope);
    cursor.advance();

    while cursor.current().kind != TokenType::ParenClose {
        if cursor.current().kind == TokenType::EndOfFile {
            destroy_subtree(nodes, scope);
            return Err(ParseState::MissingBracketClose);
        }
        if let Err(state) = match_subexpression(nodes, scope, cursor) {
            destroy_subtree(nodes, scope);
            return Err(state);
        }
    }
    cursor.advance();

    append_child(nodes, node, scope);
    if cursor.current().kind.is_operator() {
        apply(&RULE_POST_BINARY, nodes, scope, cursor)?;
    }
    Ok(())
}

fn match_symbol<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let symbol = cursor.current();
    cursor.advance();

    match cursor.current().kind {
        TokenType::ParenOpen => {
            let call = nodes.create(SyntaxNodeData::Call { function: symbol });
            cursor.advance();

            while cursor.current().kind != TokenType::ParenClose {
                let arg = nodes.create(SyntaxNodeData::CallArg);

                while !matches!(
                    cursor.current().kind,
                    TokenType::Comma | TokenType::ParenClose
                ) {
                    // Call arguments may span lines.
                    if cursor.current().kind == TokenType::EndOfLine {
                        cursor.advance();
                        continue;
                    }
                    if cursor.current().kind == TokenType::EndOfFile {
                        destroy_subtree(nodes, arg);
                        destroy_subtree(nodes, call);
                        return Err(ParseState::MissingBracketClose);
                    }
                    if let Err(state) = match_subexpression(nodes, arg, cursor) {
                        destroy_subtree(nodes, arg);
                        destroy_subtree(nodes, call);
                        return Err(state);
                    }
                }

                append_child(nodes, call, arg);
                if cursor.current().kind == TokenType::Comma {
                    cursor.advance();
                }
            }
            cursor.advance();

            append_child(nodes, node, call);
            if cursor.current().kind.is_operator() {
                apply(&RULE_POST_BINARY, nodes, call, cursor)?;
            }
            Ok(())
        }
        TokenType::Dot => {
            let value = nodes.create(SyntaxNodeData::Value { value: symbol });

            while cursor.current().kind == TokenType::Dot {
                cursor.advance();
                let member = nodes.create(SyntaxNodeData::GetMember {
                    member: cursor.current(),
                });
                append_child(nodes, value, member);
                cursor.advance();
            }

            append_child(nodes, node, value);
            if cursor.current().kind.is_operator() {
                apply(&RULE_POST_BINARY, nodes, value, cursor)?;
            }
            Ok(())
        }
        _ => {
            let value = nodes.create(SyntaxNodeData::Value { value: symbol });
            append_child(nodes, node, value);

            if !matches!(
                cursor.current().kind,
                TokenType::ParenClose
                    | TokenType::Comma
                    | TokenType::BracketClose
                    | TokenType::EndOfLine
                    | TokenType::EndOfFile
            ) {
                apply(&RULE_POST_BINARY, nodes, value, cursor)?;
            }
            Ok(())
        }
    }
}

/// Unary minus: the operand subexpression is parsed into a scratch node, the operand
/// chain head becomes the unary's child and any trailing binary continuation is spliced
/// out to follow the unary node itself.
fn match_unary<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let operation = cursor.current();
    cursor.advance();

    let scratch = nodes.create(SyntaxNodeData::Root);
    if let Err(state) = match_subexpression(nodes, scratch, cursor) {
        destroy_subtree(nodes, scratch);
        return Err(state);
    }

    let operand = nodes.node(scratch).child;
    nodes.node_mut(scratch).child = None;
    nodes.destroy(scratch);

    let operand = match operand {
        Some(operand) => operand,
        None => return Err(ParseState::Error),
    };

    let unary = nodes.create(SyntaxNodeData::UnaryOperation { operation });
    let continuation = nodes.node(operand).sibling;
    nodes.node_mut(operand).sibling = None;
    nodes.node_mut(unary).child = Some(operand);
    nodes.node_mut(unary).sibling = continuation;

    append_child(nodes, node, unary);
    Ok(())
}

/// Literal heads: a `value (op value)*` run matched by the table rules against a scratch
/// node and spliced into the parent's child list.
fn match_value_run<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let scratch = nodes.create(SyntaxNodeData::Root);

    let result = apply_all(RULES_EXP_BINARY, nodes, scratch, cursor);
    let chain = nodes.node(scratch).sibling;
    nodes.node_mut(scratch).sibling = None;

    match result {
        Ok(()) => {
            nodes.destroy(scratch);
            let head = match chain {
                Some(head) => head,
                None => return Err(ParseState::Error),
            };
            match nodes.node(node).child {
                None => nodes.node_mut(node).child = Some(head),
                Some(first) => {
                    let last = crate::syntax::last_sibling(nodes, first);
                    nodes.node_mut(last).sibling = Some(head);
                }
            }
            Ok(())
        }
        Err(state) => {
            if let Some(head) = chain {
                destroy_chain(nodes, head);
            }
            nodes.destroy(scratch);
            Err(state)
        }
    }
}
