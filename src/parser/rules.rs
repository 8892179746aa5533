//! The declarative token rule engine.
//!
//! A [TokenRule] is plain data: a match kind plus optional/repeat modifiers and a failure
//! state. Rules compose into sequences ([all](TokenRule::all)), ordered alternatives
//! ([first](TokenRule::first)) and node producing groups ([child](TokenRule::child) /
//! [sibling](TokenRule::sibling)) which allocate a fresh node, run their sub-rules
//! against it and attach it on success or destroy it on failure. Because every rule only
//! consumes the current token after its check succeeds, a failed rule that did not
//! advance leaves the token stream untouched.
//!
//! Rule tables are `const` items, so entire grammars live in static data and the
//! engine is a single interpreting function.

use crate::lexer::Lexer;
use crate::syntax::{
    append_child, append_sibling, destroy_subtree, FlagSlot, NodeId, SyntaxEntity,
    SyntaxNodeAllocator, SyntaxNodeData, TokenSlot,
};
use crate::{ParseState, Token, TokenType};

/// Cursor over the token stream with a consumption counter. The counter lets groups
/// detect whether a failed rule advanced, which decides between "skip the optional rule"
/// and "propagate the failure".
pub struct TokenCursor<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    consumed: usize,
}

impl<'src> TokenCursor<'src> {
    pub fn new(mut lexer: Lexer<'src>) -> Self {
        let current = lexer.next().unwrap_or_else(|| Token {
            text: "",
            kind: TokenType::EndOfFile,
            location: crate::Location::default(),
        });
        Self {
            lexer,
            current,
            consumed: 0,
        }
    }

    pub fn current(&self) -> Token<'src> {
        self.current
    }

    pub fn advance(&mut self) {
        if self.current.kind == TokenType::EndOfFile {
            return;
        }
        self.consumed += 1;
        self.current = self.lexer.next().unwrap_or(Token {
            text: "",
            kind: TokenType::EndOfFile,
            location: self.current.location,
        });
    }

    /// Number of tokens consumed so far; used as a position mark.
    pub fn mark(&self) -> usize {
        self.consumed
    }

    pub fn source(&self) -> &'src str {
        self.lexer.source()
    }

    /// The contiguous source slice spanning from the start of `earlier` to the end of
    /// `later`. Both slices must borrow from this cursor's source buffer.
    pub fn merge(&self, earlier: &'src str, later: &'src str) -> &'src str {
        let source = self.lexer.source();
        let base = source.as_ptr() as usize;
        let start = earlier.as_ptr() as usize - base;
        let end = later.as_ptr() as usize - base + later.len();
        &source[start..end]
    }
}

#[derive(Debug, Clone, Copy)]
/// Success action of a matching rule.
pub enum RuleAction {
    Skip,
    /// Store the matched token into the given field of the current node.
    StoreToken(TokenSlot),
    /// Extend the stored token's text to span up to the end of the matched token. Used
    /// for colon joined attribute names.
    MergeToken(TokenSlot),
    StoreBool(FlagSlot, bool),
}

#[derive(Debug, Clone, Copy)]
pub enum TokenRuleKind {
    /// Match one token of the given type and apply the success action.
    Match {
        token: TokenType,
        action: RuleAction,
    },
    /// Sequential group; a non optional failure propagates.
    All { rules: &'static [TokenRule] },
    /// Ordered alternatives; the first success wins, alternatives stop once any rule
    /// advanced the cursor.
    First { rules: &'static [TokenRule] },
    /// Run the rules against a freshly allocated node and append it as the last child of
    /// the current node.
    Child {
        entity: SyntaxEntity,
        rules: &'static [TokenRule],
    },
    /// Like [TokenRuleKind::Child] but appended to the current node's sibling chain.
    Sibling {
        entity: SyntaxEntity,
        rules: &'static [TokenRule],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TokenRule {
    pub optional: bool,
    pub repeat: bool,
    /// State reported when this rule fails. The generic [ParseState::Error] defers to
    /// the more specific state of the failing sub-rule.
    pub fail_state: ParseState,
    pub kind: TokenRuleKind,
}

impl TokenRule {
    pub const fn match_type(token: TokenType) -> Self {
        Self {
            optional: false,
            repeat: false,
            fail_state: ParseState::Error,
            kind: TokenRuleKind::Match {
                token,
                action: RuleAction::Skip,
            },
        }
    }

    pub const fn all(rules: &'static [TokenRule]) -> Self {
        Self {
            optional: false,
            repeat: false,
            fail_state: ParseState::Error,
            kind: TokenRuleKind::All { rules },
        }
    }

    pub const fn first(rules: &'static [TokenRule]) -> Self {
        Self {
            optional: false,
            repeat: false,
            fail_state: ParseState::Error,
            kind: TokenRuleKind::First { rules },
        }
    }

    pub const fn child(entity: SyntaxEntity, rules: &'static [TokenRule]) -> Self {
        Self {
            optional: false,
            repeat: false,
            fail_state: ParseState::Error,
            kind: TokenRuleKind::Child { entity, rules },
        }
    }

    pub const fn sibling(entity: SyntaxEntity, rules: &'static [TokenRule]) -> Self {
        Self {
            optional: false,
            repeat: false,
            fail_state: ParseState::Error,
            kind: TokenRuleKind::Sibling { entity, rules },
        }
    }

    pub const fn store(self, slot: TokenSlot) -> Self {
        self.with_action(RuleAction::StoreToken(slot))
    }

    pub const fn merge(self, slot: TokenSlot) -> Self {
        self.with_action(RuleAction::MergeToken(slot))
    }

    pub const fn set_flag(self, slot: FlagSlot, value: bool) -> Self {
        self.with_action(RuleAction::StoreBool(slot, value))
    }

    const fn with_action(self, action: RuleAction) -> Self {
        match self.kind {
            TokenRuleKind::Match { token, .. } => Self {
                kind: TokenRuleKind::Match { token, action },
                ..self
            },
            _ => self,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    pub const fn repeat(self) -> Self {
        Self {
            repeat: true,
            ..self
        }
    }

    pub const fn fail_with(self, state: ParseState) -> Self {
        Self {
            fail_state: state,
            ..self
        }
    }
}

/// Apply one rule against the current node and token.
pub fn apply<'src>(
    rule: &TokenRule,
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    match rule.kind {
        TokenRuleKind::Match { token, action } => {
            if cursor.current().kind == token {
                perform(action, nodes, node, cursor);
                cursor.advance();
                Ok(())
            } else {
                Err(rule.fail_state)
            }
        }
        TokenRuleKind::All { rules } => {
            override_failure(rule, apply_all(rules, nodes, node, cursor))
        }
        TokenRuleKind::First { rules } => {
            override_failure(rule, apply_first(rules, nodes, node, cursor))
        }
        TokenRuleKind::Child { entity, rules } => {
            override_failure(rule, apply_group(entity, rules, nodes, node, cursor, true))
        }
        TokenRuleKind::Sibling { entity, rules } => {
            override_failure(rule, apply_group(entity, rules, nodes, node, cursor, false))
        }
    }
}

fn override_failure(rule: &TokenRule, result: Result<(), ParseState>) -> Result<(), ParseState> {
    result.map_err(|state| {
        if rule.fail_state == ParseState::Error {
            state
        } else {
            rule.fail_state
        }
    })
}

fn perform<'src>(
    action: RuleAction,
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) {
    let token = cursor.current();
    match action {
        RuleAction::Skip => {}
        RuleAction::StoreToken(slot) => nodes.node_mut(node).store_token(slot, token),
        RuleAction::MergeToken(slot) => {
            let stored = nodes.node(node).token(slot);
            if stored.kind == TokenType::Invalid && stored.text.is_empty() {
                nodes.node_mut(node).store_token(slot, token);
            } else {
                let text = cursor.merge(stored.text, token.text);
                let merged = Token {
                    text,
                    kind: stored.kind,
                    location: stored.location,
                };
                nodes.node_mut(node).store_token(slot, merged);
            }
        }
        RuleAction::StoreBool(slot, value) => nodes.node_mut(node).set_flag(slot, value),
    }
}

/// Sequential application. A rule marked `repeat` is applied until it stops advancing; a
/// failure is forgiven when the rule is optional (or already matched once) and the
/// failing attempt consumed nothing.
pub fn apply_all<'src>(
    rules: &[TokenRule],
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    for rule in rules {
        let mut matched_once = false;
        let mut attempt_start = cursor.mark();
        let mut result = apply(rule, nodes, node, cursor);

        while result.is_ok() && rule.repeat {
            matched_once = true;
            attempt_start = cursor.mark();
            result = apply(rule, nodes, node, cursor);
        }

        if let Err(state) = result {
            let advanced = cursor.mark() != attempt_start;
            if advanced || !(rule.optional || matched_once) {
                return Err(state);
            }
        }
    }
    Ok(())
}

fn apply_first<'src>(
    rules: &[TokenRule],
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
) -> Result<(), ParseState> {
    let start = cursor.mark();
    let mut last = Err(ParseState::Error);

    for rule in rules {
        if cursor.mark() != start {
            break;
        }
        last = apply(rule, nodes, node, cursor);
        if last.is_ok() {
            if rule.repeat {
                while apply(rule, nodes, node, cursor).is_ok() {}
            }
            return Ok(());
        }
    }
    last
}

fn apply_group<'src>(
    entity: SyntaxEntity,
    rules: &'static [TokenRule],
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    cursor: &mut TokenCursor<'src>,
    as_child: bool,
) -> Result<(), ParseState> {
    let sub = nodes.create(SyntaxNodeData::empty(entity));

    match apply_all(rules, nodes, sub, cursor) {
        Ok(()) => {
            if as_child {
                append_child(nodes, node, sub);
            } else {
                append_sibling(nodes, node, sub);
            }
            Ok(())
        }
        Err(state) => {
            destroy_subtree(nodes, sub);
            Err(state)
        }
    }
}
