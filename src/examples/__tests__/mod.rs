use crate::examples::shader::{compile, run_function, CompileError};
use crate::ParseState;

#[test]
fn arithmetic_with_precedence() {
    let image = compile("context Shader\nfn main(): void\n{\n    let x: i32 = 2 + 3 * 4\n}\n")
        .unwrap();
    let state = run_function(&image, "main").unwrap();
    assert_eq!(state.memory_u32(4), Some(14));
}

#[test]
fn chained_variable_reads() {
    let source = "context Shader\nfn sum(): i32\n{\n    let a: i32 = 1 + 2\n    let b: i32 = a + 4\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "sum").unwrap();
    assert_eq!(state.memory_u32(4), Some(3));
    assert_eq!(state.memory_u32(8), Some(7));
}

#[test]
fn parenthesised_subexpressions() {
    let source = "context Shader\nfn f(): i32\n{\n    let x: i32 = (1 + 2) * (3 - 1)\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "f").unwrap();
    assert_eq!(state.memory_u32(4), Some(6));
}

#[test]
fn unary_minus_on_a_variable() {
    let source = "context Shader\nfn g(): i32\n{\n    let x: i32 = 10\n    let y: i32 = -x + 3\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "g").unwrap();
    assert_eq!(state.memory_u32(4), Some(10));
    assert_eq!(state.memory_u32(8), Some((-7i32) as u32));
}

#[test]
fn cross_function_calls() {
    let source = "context Shader\nfn one(): i32 { 1 }\nfn two(): i32 { one() + one() }\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "two").unwrap();
    assert_eq!(state.register(crate::bytecode::OpReg::R0), 2);
}

#[test]
fn mixed_base_literals() {
    let source = "context Shader\nfn u(): i32\n{\n    let x: i32 = 0b101 + 0x0F + 010\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "u").unwrap();
    assert_eq!(state.memory_u32(4), Some(5 + 15 + 8));
}

#[test]
fn assignment_statements_store_into_declared_slots() {
    let source = "context Shader\nfn f(): void\n{\n    let x: i32 = 1\n    x = x + 41\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "f").unwrap();
    assert_eq!(state.memory_u32(4), Some(42));
}

#[test]
fn pure_expressions_leave_memory_untouched() {
    let source = "context Shader\nfn f(): i32\n{\n    1 + 2 * 3\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "f").unwrap();
    assert_eq!(state.register(crate::bytecode::OpReg::R0), 7);
    assert!(state.memory().iter().all(|byte| *byte == 0));
}

#[test]
fn script_context_compiles_too() {
    let source = "context Script\nfn main(): void\n{\n    let x: i32 = 6 * 7\n}\n";
    let image = compile(source).unwrap();
    let state = run_function(&image, "main").unwrap();
    assert_eq!(state.memory_u32(4), Some(42));
}

#[test]
fn missing_annotation_bracket_fails_compilation() {
    let source = "context Shader\n[uniform, set = 0\nfn main(): void\n{\n}\n";
    match compile(source) {
        Err(CompileError::Parse(error)) => {
            assert_eq!(error.state, ParseState::MissingBracketClose)
        }
        other => panic!("expected a parse failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_context_fails_lexing() {
    assert!(matches!(
        compile("context Compute\nfn main(): void\n{\n}\n"),
        Err(CompileError::Lex(_))
    ));
}

#[test]
fn unknown_entry_symbol_is_reported() {
    let image = compile("context Shader\nfn main(): void\n{\n}\n").unwrap();
    assert!(run_function(&image, "absent").is_err());
}
