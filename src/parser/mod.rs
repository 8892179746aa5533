//! The top down parse driver.

mod definition;
mod expression;
mod rules;

#[cfg(test)]
mod __tests__;

pub use rules::{apply, apply_all, RuleAction, TokenCursor, TokenRule, TokenRuleKind};

use crate::lexer::Lexer;
use crate::syntax::{
    append_child, append_sibling_or_assign, destroy_chain, NodeId, SyntaxEntity,
    SyntaxNodeAllocator, SyntaxNodeData, SyntaxVisitor,
};
use crate::{Log, ParseError, ParseState, TokenType};
use once_cell::unsync::OnceCell;

/// Parse result: the root node plus every diagnostic collected while recovering.
pub struct ParseOutcome {
    pub root: NodeId,
    pub errors: Vec<ParseError>,
}

/// The default top down parser.
///
/// Reads top level definitions (`fn`, `def`, `let`), context blocks (`ctx Name { … }`)
/// and annotations. Visitors are notified with each top level node the moment it is
/// complete; on an error the partially built definition is destroyed, one diagnostic is
/// recorded and parsing resumes at the next end of line.
pub struct DefaultParser {
    log: OnceCell<Log<&'static str>>,
}

impl DefaultParser {
    pub fn new() -> Self {
        Self {
            log: OnceCell::new(),
        }
    }

    /// Set a log label to debug parsed productions based on the level of [Log].
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    pub fn parse<'src>(
        &self,
        lexer: Lexer<'src>,
        nodes: &mut dyn SyntaxNodeAllocator<'src>,
        visitors: &mut [&mut dyn SyntaxVisitor<'src>],
    ) -> ParseOutcome {
        let mut cursor = TokenCursor::new(lexer);
        let mut errors = Vec::new();

        let root = nodes.create(SyntaxNodeData::Root);
        for visitor in visitors.iter_mut() {
            visitor.visit(nodes, root);
        }

        let mut annotation: Option<NodeId> = None;

        loop {
            let token = cursor.current();
            let result = match token.kind {
                TokenType::EndOfFile => break,
                TokenType::EndOfLine => {
                    cursor.advance();
                    continue;
                }
                TokenType::KwFn => definition::parse_node_function(nodes, &mut cursor),
                TokenType::KwDef => definition::parse_node_definition(nodes, &mut cursor),
                TokenType::KwLet => definition::parse_variable_definition(
                    nodes,
                    &mut cursor,
                    SyntaxEntity::DefVariable,
                ),
                TokenType::KwCtx => {
                    match self.parse_context_block(nodes, &mut cursor, root, visitors) {
                        Ok(()) => {
                            continue;
                        }
                        Err(state) => Err(state),
                    }
                }
                TokenType::SquareBracketOpen => {
                    definition::parse_node_annotation(nodes, &mut cursor)
                }
                _ => Err(ParseState::UnexpectedToken),
            };

            match result {
                Ok(node) => {
                    if let Some(log) = self.log.get() {
                        log.log_trace(
                            "Parsed",
                            format_args!("{:?}", nodes.node(node).entity()),
                        );
                    }

                    if nodes.node(node).entity() == SyntaxEntity::DefAnnotation {
                        append_sibling_or_assign(nodes, &mut annotation, node);
                    } else {
                        nodes.node_mut(node).annotation = annotation.take();
                        append_child(nodes, root, node);
                    }

                    for visitor in visitors.iter_mut() {
                        visitor.visit(nodes, node);
                    }
                }
                Err(state) => {
                    errors.push(ParseError::new(state, token.location));
                    skip_to_end_of_line(&mut cursor);
                }
            }
        }

        // An annotation chain without a following definition has no owner; release it.
        if let Some(dangling) = annotation {
            destroy_chain(nodes, dangling);
        }

        ParseOutcome { root, errors }
    }

    /// `ctx Name { … }`: the block name is read and dropped, the contents are limited to
    /// functions, context variables and annotations.
    fn parse_context_block<'src>(
        &self,
        nodes: &mut dyn SyntaxNodeAllocator<'src>,
        cursor: &mut TokenCursor<'src>,
        root: NodeId,
        visitors: &mut [&mut dyn SyntaxVisitor<'src>],
    ) -> Result<(), ParseState> {
        cursor.advance();

        if cursor.current().kind != TokenType::Symbol {
            return Err(ParseState::UnexpectedToken);
        }
        cursor.advance();

        if cursor.current().kind != TokenType::BracketOpen {
            return Err(ParseState::MissingBracketOpen);
        }
        cursor.advance();

        let mut annotation: Option<NodeId> = None;

        loop {
            let result = match cursor.current().kind {
                TokenType::BracketClose => {
                    cursor.advance();
                    break;
                }
                TokenType::EndOfLine => {
                    cursor.advance();
                    continue;
                }
                TokenType::EndOfFile => Err(ParseState::Error),
                TokenType::KwFn => definition::parse_node_function(nodes, cursor),
                TokenType::KwLet => definition::parse_variable_definition(
                    nodes,
                    cursor,
                    SyntaxEntity::DefContextVariable,
                ),
                TokenType::SquareBracketOpen => definition::parse_node_annotation(nodes, cursor),
                _ => Err(ParseState::UnknownDefinition),
            };

            let node = match result {
                Ok(node) => node,
                Err(state) => {
                    if let Some(dangling) = annotation {
                        destroy_chain(nodes, dangling);
                    }
                    return Err(state);
                }
            };

            if nodes.node(node).entity() == SyntaxEntity::DefAnnotation {
                append_sibling_or_assign(nodes, &mut annotation, node);
            } else {
                nodes.node_mut(node).annotation = annotation.take();
                append_child(nodes, root, node);
            }

            for visitor in visitors.iter_mut() {
                visitor.visit(nodes, node);
            }
        }

        if let Some(dangling) = annotation {
            destroy_chain(nodes, dangling);
        }
        Ok(())
    }
}

impl Default for DefaultParser {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_to_end_of_line(cursor: &mut TokenCursor) {
    while !matches!(
        cursor.current().kind,
        TokenType::EndOfLine | TokenType::EndOfFile
    ) {
        cursor.advance();
    }
}
