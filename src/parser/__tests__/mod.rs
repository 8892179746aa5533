use crate::lexer::Lexer;
use crate::parser::DefaultParser;
use crate::syntax::{
    children, destroy_subtree, HostArena, NodeId, SyntaxEntity, SyntaxNodeAllocator,
    SyntaxNodeData, TokenSlot, TrackingArena, TreeDisplay,
};
use crate::words::WordStream;
use crate::{LexerOptions, LexerRules, ParseState};

type Arena<'src> = TrackingArena<'src, HostArena<'src>>;

fn parse<'src>(source: &'src str) -> (Arena<'src>, crate::parser::ParseOutcome) {
    let options = LexerOptions {
        rules: LexerRules::Shader,
        ..LexerOptions::default()
    };
    let lexer = Lexer::with_options(WordStream::new(source), options).unwrap();
    let mut arena = TrackingArena::new(HostArena::new());
    let parser = DefaultParser::new();
    let outcome = parser.parse(lexer, &mut arena, &mut []);
    (arena, outcome)
}

fn top_level<'a>(arena: &'a Arena, root: NodeId) -> Vec<NodeId> {
    children(arena, root).collect()
}

fn entity(arena: &Arena, id: NodeId) -> SyntaxEntity {
    arena.node(id).entity()
}

#[test]
fn function_body_is_a_sibling_not_a_child() {
    let (arena, outcome) = parse("fn main(): void\n{\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    assert_eq!(entity(&arena, nodes[0]), SyntaxEntity::DefFunction);
    assert_eq!(entity(&arena, nodes[1]), SyntaxEntity::DefFunctionBody);
    assert_eq!(arena.node(nodes[0]).sibling, Some(nodes[1]));
    // The function's children are its arguments, never the body.
    assert!(children(&arena, nodes[0])
        .all(|c| entity(&arena, c) == SyntaxEntity::DefFunctionArgument));
}

#[test]
fn function_arguments_are_children_in_order() {
    let (arena, outcome) = parse("fn blend(a: f32, b: f32, t: f32): f32\n{\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    let function = nodes[0];
    let names: Vec<&str> = children(&arena, function)
        .map(|arg| arena.node(arg).token(TokenSlot::Name).text)
        .collect();
    assert_eq!(names, vec!["a", "b", "t"]);

    let node = arena.node(function);
    assert_eq!(node.token(TokenSlot::Name).text, "blend");
    assert_eq!(node.token(TokenSlot::ResultType).text, "f32");
}

#[test]
fn single_line_function_body_parses() {
    let (arena, outcome) = parse("fn one(): i32 { 1 }\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    let body = nodes[1];
    assert_eq!(entity(&arena, body), SyntaxEntity::DefFunctionBody);
    let statements = top_level(&arena, body);
    assert_eq!(statements.len(), 1);
    assert_eq!(entity(&arena, statements[0]), SyntaxEntity::ExpExpression);
}

#[test]
fn variable_initializer_keeps_flat_operand_run() {
    let (arena, outcome) = parse("fn f(): void\n{\n    let x: i32 = 2 + 3 * 4\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let body = top_level(&arena, outcome.root)[1];
    let variable = top_level(&arena, body)[0];
    assert_eq!(entity(&arena, variable), SyntaxEntity::DefVariable);
    assert_eq!(arena.node(variable).token(TokenSlot::Name).text, "x");

    let expression = children(&arena, variable).next().unwrap();
    assert_eq!(entity(&arena, expression), SyntaxEntity::ExpExpression);

    // The initializer chain starts with the `=` operation followed by the flat
    // `2 + 3 * 4` run; precedence is not encoded in the tree shape.
    let chain: Vec<SyntaxEntity> = crate::syntax::siblings(&arena, arena.node(expression).child)
        .map(|id| entity(&arena, id))
        .collect();
    assert_eq!(
        chain,
        vec![
            SyntaxEntity::ExpBinaryOperation,
            SyntaxEntity::ExpValue,
            SyntaxEntity::ExpBinaryOperation,
            SyntaxEntity::ExpValue,
            SyntaxEntity::ExpBinaryOperation,
            SyntaxEntity::ExpValue,
        ]
    );

    let texts: Vec<&str> = crate::syntax::siblings(&arena, arena.node(expression).child)
        .skip(1)
        .map(|id| {
            let node = arena.node(id);
            match node.entity() {
                SyntaxEntity::ExpValue => node.token(TokenSlot::Value).text,
                _ => node.token(TokenSlot::Operation).text,
            }
        })
        .collect();
    assert_eq!(texts, vec!["2", "+", "3", "*", "4"]);
}

#[test]
fn call_arguments_become_call_arg_children() {
    let (arena, outcome) = parse("fn f(): void\n{\n    mix(a, b,\n        t)\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let body = top_level(&arena, outcome.root)[1];
    let statement = top_level(&arena, body)[0];
    let call = children(&arena, statement).next().unwrap();
    assert_eq!(entity(&arena, call), SyntaxEntity::ExpCall);
    assert_eq!(arena.node(call).token(TokenSlot::Function).text, "mix");

    let args: Vec<SyntaxEntity> = children(&arena, call).map(|id| entity(&arena, id)).collect();
    assert_eq!(
        args,
        vec![
            SyntaxEntity::ExpCallArg,
            SyntaxEntity::ExpCallArg,
            SyntaxEntity::ExpCallArg,
        ]
    );
}

#[test]
fn member_access_builds_get_member_chain() {
    let (arena, outcome) = parse("fn f(): void\n{\n    let y: f32 = input.color.r\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let body = top_level(&arena, outcome.root)[1];
    let variable = top_level(&arena, body)[0];
    let expression = children(&arena, variable).next().unwrap();
    let value = crate::syntax::siblings(&arena, arena.node(expression).child)
        .nth(1)
        .unwrap();
    assert_eq!(entity(&arena, value), SyntaxEntity::ExpValue);
    assert_eq!(arena.node(value).token(TokenSlot::Value).text, "input");

    let members: Vec<&str> = children(&arena, value)
        .map(|id| arena.node(id).token(TokenSlot::Member).text)
        .collect();
    assert_eq!(members, vec!["color", "r"]);
}

#[test]
fn struct_definition_collects_members() {
    let (arena, outcome) = parse("def Vertex = struct [\nposition: vec3\ncolor: vec4\n]\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    let strukt = nodes[0];
    assert_eq!(entity(&arena, strukt), SyntaxEntity::DefStruct);
    assert_eq!(arena.node(strukt).token(TokenSlot::Name).text, "Vertex");

    let members: Vec<(&str, &str)> = children(&arena, strukt)
        .map(|id| {
            let node = arena.node(id);
            (
                node.token(TokenSlot::Name).text,
                node.token(TokenSlot::Type).text,
            )
        })
        .collect();
    assert_eq!(members, vec![("position", "vec3"), ("color", "vec4")]);
}

#[test]
fn alias_and_typeof_definitions() {
    let (arena, outcome) = parse("def Meters = alias[f32]\ndef Raw = typeof[u32]\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    match &arena.node(nodes[0]).data {
        SyntaxNodeData::TypeDef {
            name,
            base_type,
            is_alias,
        } => {
            assert_eq!(name.text, "Meters");
            assert_eq!(base_type.text, "f32");
            assert!(is_alias);
        }
        other => panic!("expected a type definition, got {:?}", other),
    }
    match &arena.node(nodes[1]).data {
        SyntaxNodeData::TypeDef { is_alias, .. } => assert!(!is_alias),
        other => panic!("expected a type definition, got {:?}", other),
    }
}

#[test]
fn annotations_attach_to_the_next_definition() {
    let (arena, outcome) = parse(
        "[uniform, set = 0]\n[binding = 1]\nlet color: vec4\nlet plain: f32\n",
    );
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    let color = nodes[0];
    assert_eq!(entity(&arena, color), SyntaxEntity::DefVariable);

    // Both annotations chain onto the first definition; the second has none.
    let annotations: Vec<NodeId> =
        crate::syntax::siblings(&arena, arena.node(color).annotation).collect();
    assert_eq!(annotations.len(), 2);
    assert!(annotations
        .iter()
        .all(|id| entity(&arena, *id) == SyntaxEntity::DefAnnotation));
    assert!(arena.node(nodes[1]).annotation.is_none());

    let attributes: Vec<(&str, &str)> = children(&arena, annotations[0])
        .map(|id| {
            let node = arena.node(id);
            (
                node.token(TokenSlot::Name).text,
                node.token(TokenSlot::Value).text,
            )
        })
        .collect();
    assert_eq!(attributes, vec![("uniform", ""), ("set", "0")]);
}

#[test]
fn colon_joined_attribute_names_merge() {
    let (arena, outcome) = parse("[shader:stage = vertex]\nfn main(): void\n{\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let function = top_level(&arena, outcome.root)[0];
    let annotation = arena.node(function).annotation.unwrap();
    let attribute = children(&arena, annotation).next().unwrap();
    assert_eq!(arena.node(attribute).token(TokenSlot::Name).text, "shader:stage");
    assert_eq!(arena.node(attribute).token(TokenSlot::Value).text, "vertex");
}

#[test]
fn missing_annotation_bracket_reports_specific_state() {
    let (arena, outcome) = parse("[uniform, set = 0\nlet color: vec4\n");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].state, ParseState::MissingBracketClose);

    // No annotation chain survives for the following definition.
    let nodes = top_level(&arena, outcome.root);
    assert_eq!(entity(&arena, nodes[0]), SyntaxEntity::DefVariable);
    assert!(arena.node(nodes[0]).annotation.is_none());
}

#[test]
fn context_blocks_produce_context_variables() {
    let (arena, outcome) = parse("ctx VertexShader {\nlet offset: vec3\nfn shade(): vec4\n{\n}\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let nodes = top_level(&arena, outcome.root);
    assert_eq!(entity(&arena, nodes[0]), SyntaxEntity::DefContextVariable);
    assert_eq!(entity(&arena, nodes[1]), SyntaxEntity::DefFunction);
    assert_eq!(entity(&arena, nodes[2]), SyntaxEntity::DefFunctionBody);
}

#[test]
fn unexpected_top_level_token_recovers_at_next_line() {
    let (arena, outcome) = parse("+ garbage tokens\nlet ok: i32\n");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].state, ParseState::UnexpectedToken);

    let nodes = top_level(&arena, outcome.root);
    assert_eq!(entity(&arena, nodes[0]), SyntaxEntity::DefVariable);
    assert_eq!(arena.node(nodes[0]).token(TokenSlot::Name).text, "ok");
}

#[test]
fn parse_error_reports_token_location() {
    let (_arena, outcome) = parse("fn broken(: void\n");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].location.line(), 1);
}

#[test]
fn failed_definitions_leave_no_leaked_nodes() {
    let source = "fn broken(: void\nlet ok: i32\n";
    let options = LexerOptions {
        rules: LexerRules::Shader,
        ..LexerOptions::default()
    };
    let lexer = Lexer::with_options(WordStream::new(source), options).unwrap();
    let mut arena = HostArena::new();
    let parser = DefaultParser::new();
    let outcome = parser.parse(lexer, &mut arena, &mut []);
    assert_eq!(outcome.errors.len(), 1);

    // Destroying the surviving tree accounts for every allocation.
    destroy_subtree(&mut arena, outcome.root);
    assert_eq!(arena.live_count(), 0);
}

#[test]
fn tree_printing_renders_every_child() {
    let (arena, outcome) = parse("fn main(): void\n{\n    let x: i32 = 1 + 2\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    TreeDisplay::new(&arena, outcome.root).print().unwrap();
}

#[test]
fn nested_blocks_become_explicit_scopes() {
    let (arena, outcome) = parse("fn f(): void\n{\n    {\n        let x: i32 = 1\n    }\n}\n");
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    let body = top_level(&arena, outcome.root)[1];
    let scope = top_level(&arena, body)[0];
    assert_eq!(entity(&arena, scope), SyntaxEntity::DefExplicitScope);
    let inner = top_level(&arena, scope)[0];
    assert_eq!(entity(&arena, inner), SyntaxEntity::DefVariable);
}
