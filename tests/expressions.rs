use std::str::FromStr;

use bigdecimal::BigDecimal;
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
fn evaluate_precedence() {
    assert_eq!(run("LET x = 1 + 2 * 3; x;"), Ok(integer(7)));
    assert_eq!(run("(1 + 2) * 3;"), Ok(integer(9)));
    assert_eq!(run("10 - 2 - 3;"), Ok(integer(5)));
}

#[test]
fn evaluate_unbounded_integers() {
    let expected = num_traits::pow(BigInt::from(10), 30);
    assert_eq!(
        run("LET big = 1e15; big * big;"),
        Ok(RuntimeValue::Primitive(Primitive::Integer(expected)))
    );
}

#[test]
fn evaluate_decimal_arithmetic() {
    assert_eq!(
        run("1.5 + 2.25;"),
        Ok(RuntimeValue::Primitive(Primitive::Decimal(
            BigDecimal::from_str("3.75").unwrap()
        )))
    );
    assert_eq!(
        run("1.00 / 3.00;"),
        Ok(RuntimeValue::Primitive(Primitive::Decimal(
            BigDecimal::from_str("0.33").unwrap()
        )))
    );
}

#[test]
fn evaluate_string_concatenation() {
    assert_eq!(
        run(r#"LET s = "hi "; s + 1;"#),
        Ok(RuntimeValue::Primitive(Primitive::String("hi 1".into())))
    );
    assert_eq!(
        run(r#""value: " + NIL;"#),
        Ok(RuntimeValue::Primitive(Primitive::String("value: NIL".into())))
    );
}

#[test]
fn evaluate_short_circuit_or() {
    // the right operand must not be evaluated
    assert_eq!(run("TRUE OR (1 / 0);"), Ok(RuntimeValue::boolean(true)));
}

#[test]
fn evaluate_short_circuit_and() {
    assert_eq!(run("FALSE AND (1 / 0);"), Ok(RuntimeValue::boolean(false)));
}

#[test]
fn evaluate_comparisons() {
    assert_eq!(run("1 < 2;"), Ok(RuntimeValue::boolean(true)));
    assert_eq!(run("2.5 >= 2.5;"), Ok(RuntimeValue::boolean(true)));
    assert_eq!(run(r#""abc" < "abd";"#), Ok(RuntimeValue::boolean(true)));
}

#[test]
fn evaluate_equality() {
    assert_eq!(run("1 == 1;"), Ok(RuntimeValue::boolean(true)));
    assert_eq!(run("1 != 2;"), Ok(RuntimeValue::boolean(true)));
    assert_eq!(run("NIL == NIL;"), Ok(RuntimeValue::boolean(true)));
    assert_eq!(run(r#""a" == "a";"#), Ok(RuntimeValue::boolean(true)));
}

#[test]
fn division_by_zero_fails() {
    assert!(run("1 / 0;").is_err());
    assert!(run("1.0 / 0.0;").is_err());
}

#[test]
fn division_of_integers_is_a_quotient() {
    assert_eq!(run("7 / 2;"), Ok(integer(3)));
    assert_eq!(run("6 / 2;"), Ok(integer(3)));
}
