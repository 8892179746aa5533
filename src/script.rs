//! The loaded script container.
//!
//! A [Script] owns the syntax tree of one source: it parses through a tracking arena so
//! every node the parser produced is released together with the container, and it keeps
//! a registry of the function definitions encountered during the parse.

use crate::lexer::Lexer;
use crate::parser::DefaultParser;
use crate::syntax::{
    HostArena, NodeId, SyntaxNodeAllocator, SyntaxVisitor, TokenSlot, TrackingArena,
};
use crate::ParseError;

struct FunctionTracker {
    functions: Vec<NodeId>,
}

impl<'src> SyntaxVisitor<'src> for FunctionTracker {
    fn visit_function(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, node: NodeId) {
        self.functions.push(node);
    }
}

pub struct Script<'src> {
    arena: TrackingArena<'src, HostArena<'src>>,
    root: NodeId,
    functions: Vec<NodeId>,
    errors: Vec<ParseError>,
}

/// Parse the lexer's token stream into an owned script.
pub fn load_script(lexer: Lexer) -> Script {
    let mut arena = TrackingArena::new(HostArena::new());
    let mut tracker = FunctionTracker {
        functions: Vec::new(),
    };

    let parser = DefaultParser::new();
    let outcome = {
        let mut visitors: [&mut dyn SyntaxVisitor; 1] = [&mut tracker];
        parser.parse(lexer, &mut arena, &mut visitors)
    };

    Script {
        arena,
        root: outcome.root,
        functions: tracker.functions,
        errors: outcome.errors,
    }
}

impl<'src> Script<'src> {
    pub fn count_functions(&self) -> u32 {
        self.functions.len() as u32
    }

    pub fn functions(&self) -> &[NodeId] {
        &self.functions
    }

    /// Name of a tracked function node.
    pub fn function_name(&self, function: NodeId) -> &'src str {
        self.arena.node(function).token(TokenSlot::Name).text
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &dyn SyntaxNodeAllocator<'src> {
        &self.arena
    }

    /// Diagnostics collected while parsing; an empty list means a clean parse.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::WordStream;
    use crate::{LexerOptions, LexerRules};

    fn load(source: &str) -> Script {
        let options = LexerOptions {
            rules: LexerRules::Shader,
            ..LexerOptions::default()
        };
        let lexer = Lexer::with_options(WordStream::new(source), options).unwrap();
        load_script(lexer)
    }

    #[test]
    fn counts_and_names_functions() {
        let script = load("fn main(): void\n{\n}\nfn helper(): i32\n{\n}\n");
        assert!(script.errors().is_empty());
        assert_eq!(script.count_functions(), 2);

        let names: Vec<&str> = script
            .functions()
            .iter()
            .map(|f| script.function_name(*f))
            .collect();
        assert_eq!(names, vec!["main", "helper"]);
    }

    #[test]
    fn keeps_diagnostics_of_a_dirty_parse() {
        let script = load("fn broken(: void\nfn ok(): void\n{\n}\n");
        assert_eq!(script.errors().len(), 1);
        assert_eq!(script.count_functions(), 1);
    }

    #[test]
    fn context_functions_are_tracked_too() {
        let script = load("ctx Pixel {\nfn shade(): vec4\n{\n}\n}\n");
        assert!(script.errors().is_empty());
        assert_eq!(script.count_functions(), 1);
        assert_eq!(script.function_name(script.functions()[0]), "shade");
    }
}
