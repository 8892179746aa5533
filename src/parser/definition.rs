//! Definition grammars: functions, type definitions, structs, variables, annotations and
//! expression blocks.

use super::expression::parse_expression;
use super::rules::{apply_all, TokenCursor, TokenRule};
use crate::syntax::{
    append_child, destroy_subtree, FlagSlot, NodeId, SyntaxEntity, SyntaxNodeAllocator,
    SyntaxNodeData, TokenSlot,
};
use crate::{ParseState, TokenType};

const RULES_STRUCT_MEMBER: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::match_type(TokenType::Colon),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Type),
    TokenRule::match_type(TokenType::EndOfLine),
];

const RULES_STRUCT: &[TokenRule] = &[
    TokenRule::match_type(TokenType::KwStruct),
    TokenRule::match_type(TokenType::SquareBracketOpen)
        .fail_with(ParseState::MissingBracketOpen),
    TokenRule::match_type(TokenType::EndOfLine),
    TokenRule::child(SyntaxEntity::DefStructMember, RULES_STRUCT_MEMBER)
        .optional()
        .repeat(),
    TokenRule::match_type(TokenType::SquareBracketClose)
        .fail_with(ParseState::MissingBracketClose),
];

const RULES_TYPEDEF_KIND: &[TokenRule] = &[
    TokenRule::match_type(TokenType::KwAlias).set_flag(FlagSlot::IsAlias, true),
    TokenRule::match_type(TokenType::KwTypeOf).set_flag(FlagSlot::IsAlias, false),
];

const RULES_TYPEDEF_BASE: &[TokenRule] = &[
    TokenRule::match_type(TokenType::SquareBracketOpen)
        .fail_with(ParseState::MissingBracketOpen),
    TokenRule::match_type(TokenType::Symbol)
        .store(TokenSlot::BaseType)
        .fail_with(ParseState::MissingTypeName),
    TokenRule::match_type(TokenType::SquareBracketClose)
        .fail_with(ParseState::MissingBracketClose),
];

const RULES_TYPEDEF: &[TokenRule] = &[
    TokenRule::first(RULES_TYPEDEF_KIND),
    TokenRule::all(RULES_TYPEDEF_BASE),
];

const RULES_FUNCTION_ARG: &[TokenRule] = &[
    TokenRule::match_type(TokenType::EndOfLine).optional(),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::match_type(TokenType::Colon),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Type),
    TokenRule::match_type(TokenType::EndOfLine).optional(),
    TokenRule::match_type(TokenType::Comma).optional(),
];

// The end of line after the result type is optional so single line function bodies
// remain valid.
const RULES_FUNCTION: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::match_type(TokenType::ParenOpen).fail_with(ParseState::UnexpectedToken),
    TokenRule::child(SyntaxEntity::DefFunctionArgument, RULES_FUNCTION_ARG)
        .optional()
        .repeat(),
    TokenRule::match_type(TokenType::ParenClose).fail_with(ParseState::UnexpectedToken),
    TokenRule::match_type(TokenType::Colon),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::ResultType),
    TokenRule::match_type(TokenType::EndOfLine).optional(),
];

const RULES_ATTRIBUTE_VALUE: &[TokenRule] = &[
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

// Attribute names may be colon joined (`shader:stage`); the tail merges into the stored
// name token.
const RULES_ATTRIBUTE_NAME_TAIL: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Colon).merge(TokenSlot::Name),
    TokenRule::match_type(TokenType::Symbol).merge(TokenSlot::Name),
];

const RULES_ATTRIBUTE_ASSIGN: &[TokenRule] = &[
    TokenRule::match_type(TokenType::OpAssign),
    TokenRule::first(RULES_ATTRIBUTE_VALUE),
];

const RULES_ATTRIBUTE_FIRST: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::all(RULES_ATTRIBUTE_NAME_TAIL).optional().repeat(),
    TokenRule::all(RULES_ATTRIBUTE_ASSIGN).optional(),
];

const RULES_ATTRIBUTE_NEXT: &[TokenRule] = &[
    TokenRule::match_type(TokenType::Comma),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::all(RULES_ATTRIBUTE_NAME_TAIL).optional().repeat(),
    TokenRule::all(RULES_ATTRIBUTE_ASSIGN).optional(),
];

const RULES_ATTRIBUTES: &[TokenRule] = &[
    TokenRule::child(SyntaxEntity::DefAnnotationAttribute, RULES_ATTRIBUTE_FIRST),
    TokenRule::child(SyntaxEntity::DefAnnotationAttribute, RULES_ATTRIBUTE_NEXT)
        .optional()
        .repeat(),
];

const RULES_ANNOTATION: &[TokenRule] = &[
    TokenRule::match_type(TokenType::SquareBracketOpen),
    TokenRule::all(RULES_ATTRIBUTES),
    TokenRule::match_type(TokenType::SquareBracketClose)
        .fail_with(ParseState::MissingBracketClose),
];

const RULES_VARIABLE: &[TokenRule] = &[
    TokenRule::match_type(TokenType::KwLet),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Name),
    TokenRule::match_type(TokenType::Colon),
    TokenRule::match_type(TokenType::Symbol).store(TokenSlot::Type),
];

/// `fn name(args…): result` followed by a `{ … }` body. The body node becomes the
/// *sibling* of the returned function node.
pub(super) fn parse_node_function<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    cursor: &mut TokenCursor<'src>,
) -> Result<NodeId, ParseState> {
    debug_assert_eq!(cursor.current().kind, TokenType::KwFn);
    cursor.advance();

    let function = nodes.create(SyntaxNodeData::empty(SyntaxEntity::DefFunction));
    if let Err(state) = apply_all(RULES_FUNCTION, nodes, function, cursor) {
        destroy_subtree(nodes, function);
        return Err(state);
    }

    if cursor.current().kind != TokenType::BracketOpen {
        destroy_subtree(nodes, function);
        return Err(ParseState::UnexpectedToken);
    }

    let body = nodes.create(SyntaxNodeData::FunctionBody);
    if let Err(state) = parse_expression_block(nodes, body, cursor) {
        destroy_subtree(nodes, body);
        destroy_subtree(nodes, function);
        return Err(state);
    }

    nodes.node_mut(function).sibling = Some(body);
    Ok(function)
}

/// `def Name = struct [...]`, `def Name = typeof[...]` or `def Name = alias[...]`.
pub(super) fn parse_node_definition<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    cursor: &mut TokenCursor<'src>,
) -> Result<NodeId, ParseState> {
    debug_assert_eq!(cursor.current().kind, TokenType::KwDef);
    cursor.advance();

    if cursor.current().kind != TokenType::Symbol {
        return Err(ParseState::UnknownDefinition);
    }
    let name = cursor.current();
    cursor.advance();

    if cursor.current().kind != TokenType::OpAssign {
        return Err(ParseState::MissingAssignmentOperator);
    }
    cursor.advance();

    match cursor.current().kind {
        TokenType::KwStruct => {
            let node = nodes.create(SyntaxNodeData::Struct { name });
            if let Err(state) = apply_all(RULES_STRUCT, nodes, node, cursor) {
                destroy_subtree(nodes, node);
                return Err(state);
            }
            Ok(node)
        }
        TokenType::KwTypeOf | TokenType::KwAlias => {
            let node = nodes.create(SyntaxNodeData::TypeDef {
                name,
                base_type: crate::Token::default(),
                is_alias: false,
            });
            if let Err(state) = apply_all(RULES_TYPEDEF, nodes, node, cursor) {
                destroy_subtree(nodes, node);
                return Err(state);
            }
            Ok(node)
        }
        _ => Err(ParseState::UnknownDefinition),
    }
}

/// `[name (= value)? (, name (= value)?)*]`.
pub(super) fn parse_node_annotation<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    cursor: &mut TokenCursor<'src>,
) -> Result<NodeId, ParseState> {
    let node = nodes.create(SyntaxNodeData::Annotation);
    if let Err(state) = apply_all(RULES_ANNOTATION, nodes, node, cursor) {
        destroy_subtree(nodes, node);
        return Err(state);
    }
    Ok(node)
}

/// `let name: type` with an optional `= expression` initializer.
///
/// The initializer is stored as a DEF expression child: the variable's child is an
/// expression node whose first child is the `=` binary operation, followed by the
/// initializer's flat operand run as its siblings.
pub(super) fn parse_variable_definition<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    cursor: &mut TokenCursor<'src>,
    entity: SyntaxEntity,
) -> Result<NodeId, ParseState> {
    debug_assert!(matches!(
        entity,
        SyntaxEntity::DefVariable | SyntaxEntity::DefContextVariable
    ));

    let node = nodes.create(SyntaxNodeData::empty(entity));
    if let Err(state) = apply_all(RULES_VARIABLE, nodes, node, cursor) {
        destroy_subtree(nodes, node);
        return Err(state);
    }

    if cursor.current().kind == TokenType::OpAssign {
        let assign = cursor.current();
        cursor.advance();

        let scratch = nodes.create(SyntaxNodeData::Root);
        if let Err(state) = parse_expression(nodes, scratch, cursor) {
            destroy_subtree(nodes, scratch);
            destroy_subtree(nodes, node);
            return Err(state);
        }

        let initializer = nodes.node(scratch).child;
        nodes.node_mut(scratch).child = None;
        nodes.destroy(scratch);

        let operation = nodes.create(SyntaxNodeData::BinaryOperation { operation: assign });
        nodes.node_mut(operation).sibling = initializer;

        let expression = nodes.create(SyntaxNodeData::Expression);
        nodes.node_mut(expression).child = Some(operation);

        append_child(nodes, node, expression);
    }

    Ok(node)
}

/// A `{ … }` statement block. Statements are separated by end of line tokens; nested
/// blocks become explicit scope nodes.
pub(super) fn parse_expression_block<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    parent: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    debug_assert_eq!(cursor.current().kind, TokenType::BracketOpen);
    cursor.advance();

    loop {
        let kind = cursor.current().kind;
        match kind {
            TokenType::KwLet => {
                let variable =
                    parse_variable_definition(nodes, cursor, SyntaxEntity::DefVariable)?;
                append_child(nodes, parent, variable);
            }
            TokenType::BracketOpen => {
                let scope = nodes.create(SyntaxNodeData::ExplicitScope);
                if let Err(state) = parse_expression_block(nodes, scope, cursor) {
                    destroy_subtree(nodes, scope);
                    return Err(state);
                }
                append_child(nodes, parent, scope);
            }
            TokenType::BracketClose => {
                cursor.advance();
                return Ok(());
            }
            TokenType::EndOfLine => cursor.advance(),
            TokenType::EndOfFile => return Err(ParseState::Error),
            _ if kind == TokenType::Symbol
                || kind == TokenType::OpMinus
                || kind == TokenType::ParenOpen
                || kind.is_value() =>
            {
                let scratch = nodes.create(SyntaxNodeData::Root);
                if let Err(state) = parse_expression(nodes, scratch, cursor) {
                    destroy_subtree(nodes, scratch);
                    return Err(state);
                }

                let statements = nodes.node(scratch).child;
                nodes.node_mut(scratch).child = None;
                nodes.destroy(scratch);

                let expression = nodes.create(SyntaxNodeData::Expression);
                nodes.node_mut(expression).child = statements;
                append_child(nodes, parent, expression);
            }
            _ => return Err(ParseState::UnexpectedToken),
        }
    }
}
