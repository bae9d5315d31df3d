//! End-to-end pipeline tests: source text in, tokens/diagnostics/dictionary out.

use stack_forgec::{compile, BuiltinConfig, Ast, DiagnosticKind, Lexer, TokenKind};

#[test]
fn numeric_literals_tokenize_and_parse_cleanly() {
    let tokens = Lexer::new("42 3.14 -17").tokenize().unwrap();
    let number_count = tokens.iter().filter(|t| t.kind == TokenKind::Number).count();
    assert_eq!(number_count, 3);

    let unit = compile("42 3.14 -17", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    let literals: Vec<_> = unit
        .program
        .statements
        .iter()
        .filter(|s| matches!(s, Ast::NumberLiteral { .. }))
        .collect();
    assert_eq!(literals.len(), 3);
}

#[test]
fn square_reports_known_balanced_effect() {
    let unit = compile(": SQUARE DUP * ;", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert_eq!(
        unit.dictionary.effect_of("SQUARE").unwrap(),
        stack_forgec::StackEffect::new(1, 1, true)
    );
}

#[test]
fn quadruple_converges_through_a_nested_definition() {
    let unit = compile(
        ": DOUBLE DUP + ;   : QUADRUPLE DOUBLE DOUBLE ;",
        BuiltinConfig::Standard,
    )
    .unwrap();
    assert!(!unit.has_errors());
    assert_eq!(
        unit.dictionary.effect_of("QUADRUPLE").unwrap(),
        stack_forgec::StackEffect::new(1, 1, true)
    );
}

#[test]
fn if_else_with_both_branches_known_nets_one_item() {
    let unit = compile("5 0 > IF 42 ELSE 24 THEN", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert!(unit
        .program
        .statements
        .iter()
        .any(|s| matches!(s, Ast::IfStatement { else_branch: Some(_), .. })));
}

#[test]
fn bare_math_op_at_top_level_underflows() {
    let unit = compile("+", BuiltinConfig::Standard).unwrap();
    let underflow_errors: Vec<_> = unit
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::StackUnderflow)
        .collect();
    assert_eq!(underflow_errors.len(), 1);
}

#[test]
fn unbal_loop_warns_without_being_an_error() {
    let unit = compile(": UNBAL BEGIN 1 UNTIL ;", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert!(unit
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnbalancedLoopBody));
}

#[test]
fn self_recursive_factorial_converges_to_a_known_effect() {
    let unit = compile(
        ": FACT DUP 1 <= IF DROP 1 ELSE DUP 1- FACT * THEN ;",
        BuiltinConfig::Standard,
    )
    .unwrap();
    assert!(!unit.has_errors());
    assert_eq!(
        unit.dictionary.effect_of("FACT").unwrap(),
        stack_forgec::StackEffect::new(1, 1, true)
    );
}

#[test]
fn line_and_block_comments_are_skipped_by_the_lexer() {
    let tokens = Lexer::new("\\ comment\n42 ( comment ) 17").tokenize().unwrap();
    let numbers: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Number)
        .map(|t| t.lexeme.as_str())
        .collect();
    assert_eq!(numbers, vec!["42", "17"]);
}

#[test]
fn empty_definition_body_has_the_identity_effect() {
    let unit = compile(": NOOP ;", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert_eq!(
        unit.dictionary.effect_of("NOOP").unwrap(),
        stack_forgec::StackEffect::identity()
    );
}

#[test]
fn missing_else_behaves_as_an_empty_else() {
    let unit = compile(": maybe-clear dup 0 = IF drop THEN ;", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
}

#[test]
fn a_zero_length_print_string_is_valid() {
    let unit = compile(r#": greet ." " ;"#, BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
}

#[test]
fn name_normalization_is_case_insensitive_end_to_end() {
    let unit = compile(": Foo 1 ; foo FOO fOo", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert!(unit.dictionary.lookup("foo").is_some());
    assert!(unit.dictionary.lookup("FOO").is_some());
}

#[test]
fn undefined_word_call_is_reported_once() {
    let unit = compile(": bad undeclared-thing ;", BuiltinConfig::Standard).unwrap();
    let undefined: Vec<_> = unit
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UndefinedWord)
        .collect();
    assert_eq!(undefined.len(), 1);
}

#[test]
fn variable_and_constant_declarations_round_trip() {
    let unit = compile("VARIABLE COUNTER 10 CONSTANT LIMIT", BuiltinConfig::Standard).unwrap();
    assert!(!unit.has_errors());
    assert!(unit.dictionary.lookup("COUNTER").unwrap().body.is_none());
    assert_eq!(unit.program.statements.len(), 3);
}

#[test]
fn a_large_program_compiles_without_pathological_slowdown() {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(": func{i} {i} + ;\n"));
    }
    let start = std::time::Instant::now();
    let unit = compile(&source, BuiltinConfig::Standard).unwrap();
    let elapsed = start.elapsed();
    assert!(!unit.has_errors());
    assert_eq!(unit.program.definitions().count(), 200);
    assert!(elapsed.as_millis() < 500, "compiling took too long: {elapsed:?}");
}
