use num_bigint::BigInt;

use ash_lang::interpreter::{stdlib, EvaluateResult, Interpreter, Primitive, RuntimeValue};
use ash_lang::lexer::Lexer;
use ash_lang::parser::Parser;

fn run(input: &str) -> EvaluateResult<RuntimeValue> {
    let tokens = Lexer::new(input).lex().expect("lexing failed");
    let source = Parser::parse(tokens).expect("parsing failed");
    Interpreter::evaluate(&source, stdlib::runtime_scope())
}

fn integer(value: i64) -> RuntimeValue {
    RuntimeValue::Primitive(Primitive::Integer(BigInt::from(value)))
}

#[test]
fn sum_over_half_open_range() {
    assert_eq!(
        run("LET r = 0; FOR i IN range(1, 4) DO r = r + i; END r;"),
        Ok(integer(6))
    );
}

#[test]
fn loop_over_empty_range_runs_zero_times() {
    assert_eq!(
        run("LET r = 0; FOR i IN range(4, 4) DO r = r + 1; END r;"),
        Ok(integer(0))
    );
}

#[test]
fn loop_result_is_nil() {
    assert_eq!(
        run("FOR i IN range(0, 3) DO i; END"),
        Ok(RuntimeValue::nil())
    );
}

#[test]
fn loop_variable_is_scoped_to_the_body() {
    assert!(run("FOR i IN range(0, 3) DO END i;").is_err());
}

#[test]
fn loop_variable_shadows_outer_binding() {
    assert_eq!(
        run("LET i = 99; FOR i IN range(0, 3) DO i; END i;"),
        Ok(integer(99))
    );
}

#[test]
fn nested_loops() {
    assert_eq!(
        run(
            "LET total = 0; \
             FOR i IN range(0, 3) DO \
                FOR j IN range(0, 3) DO \
                    total = total + i * 3 + j; \
                END \
             END \
             total;"
        ),
        Ok(integer(36))
    );
}

#[test]
fn loop_over_list_builtin() {
    assert_eq!(
        run("LET r = 0; FOR x IN list(5, 10, 20) DO r = r + x; END r;"),
        Ok(integer(35))
    );
}

#[test]
fn size_of_ranges_and_lists() {
    assert_eq!(run("size(range(2, 9));"), Ok(integer(7)));
    assert_eq!(run("size(list());"), Ok(integer(0)));
}

#[test]
fn iterating_a_non_list_fails() {
    assert!(run("FOR i IN 5 DO END").is_err());
    assert!(run(r#"FOR i IN "abc" DO END"#).is_err());
}
