//! Tree-walking evaluation for Ash.
//!
//! The interpreter walks the untyped syntax tree directly; it does not
//! depend on a prior analyzer pass. `RETURN` is modelled as a distinguished
//! success variant ([`Flow::Return`]) that call sites collapse, never as an
//! error, so `?` keeps propagating real failures while control transfer
//! stays explicit. The current scope is swapped out on block entry and
//! restored on every exit path, including returns and errors.

pub mod stdlib;
mod value;

pub use value::*;

use std::{collections::HashSet, error::Error, fmt::Display, rc::Rc};

use bigdecimal::RoundingMode;
use num_traits::Zero;

use crate::parser::ast::{self, BinaryOperator};
use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluateError(pub String);

pub type EvaluateResult<T> = Result<T, EvaluateError>;

impl Display for EvaluateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for EvaluateError {}

/// Result of running a statement: either an ordinary value or a `RETURN`
/// unwinding towards the enclosing call site.
enum Flow {
    Normal(RuntimeValue),
    Return(RuntimeValue),
}

pub struct Interpreter {
    scope: Scope<RuntimeValue>,
}

impl Interpreter {
    /// Evaluate a whole program against an initial scope of builtins. The
    /// result is the value of the last top-level statement (NIL for an
    /// empty program).
    pub fn evaluate(
        source: &ast::Source,
        initial: Scope<RuntimeValue>,
    ) -> EvaluateResult<RuntimeValue> {
        log::debug!("evaluating {} top-level statement(s)", source.statements.len());

        let mut interpreter = Interpreter { scope: initial };

        let mut result = RuntimeValue::nil();
        for statement in &source.statements {
            match interpreter.run_statement(statement)? {
                Flow::Normal(value) => result = value,
                Flow::Return(_) => {
                    return Err(EvaluateError("Return outside of a function".into()));
                }
            }
        }

        Ok(result)
    }

    fn in_child_scope<R>(
        &mut self,
        f: impl FnOnce(&mut Interpreter) -> EvaluateResult<R>,
    ) -> EvaluateResult<R> {
        let saved = self.scope.clone();
        self.scope = saved.child();
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Run statements in the current scope, short-circuiting on `RETURN`.
    /// Yields the value of the last statement run.
    fn run_statements(&mut self, statements: &[ast::Statement]) -> EvaluateResult<Flow> {
        let mut last = RuntimeValue::nil();
        for statement in statements {
            match self.run_statement(statement)? {
                Flow::Normal(value) => last = value,
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn run_block(&mut self, statements: &[ast::Statement]) -> EvaluateResult<Flow> {
        self.in_child_scope(|this| this.run_statements(statements))
    }

    fn run_statement(&mut self, statement: &ast::Statement) -> EvaluateResult<Flow> {
        match statement {
            ast::Statement::Let(s) => self.run_let(s),
            ast::Statement::Def(s) => self.run_def(s),
            ast::Statement::If(s) => self.run_if(s),
            ast::Statement::For(s) => self.run_for(s),
            ast::Statement::Return(s) => {
                let value = match &s.value {
                    Some(expression) => self.evaluate_expression(expression)?,
                    None => RuntimeValue::nil(),
                };
                Ok(Flow::Return(value))
            }
            ast::Statement::Expression(expression) => {
                Ok(Flow::Normal(self.evaluate_expression(expression)?))
            }
            ast::Statement::Assignment(s) => self.run_assignment(s),
        }
    }

    fn run_let(&mut self, statement: &ast::LetStatement) -> EvaluateResult<Flow> {
        if self.scope.get(&statement.name, true).is_some() {
            return Err(EvaluateError(format!(
                "'{}' is already defined in this scope",
                statement.name
            )));
        }

        let value = match &statement.value {
            Some(expression) => self.evaluate_expression(expression)?,
            None => RuntimeValue::nil(),
        };
        self.scope.define(statement.name.clone(), value);

        Ok(Flow::Normal(RuntimeValue::nil()))
    }

    fn run_def(&mut self, statement: &ast::DefStatement) -> EvaluateResult<Flow> {
        if self.scope.get(&statement.name, true).is_some() {
            return Err(EvaluateError(format!(
                "'{}' is already defined in this scope",
                statement.name
            )));
        }
        check_distinct_parameters(&statement.parameters)?;

        let parameters = statement
            .parameters
            .iter()
            .map(|p| p.name.clone())
            .collect();

        // the function captures the scope it was defined in
        let function = FunctionValue {
            name: statement.name.clone(),
            callable: Callable::Defined(Rc::new(DefinedFunction {
                parameters,
                body: statement.body.clone(),
                closure: self.scope.clone(),
            })),
        };
        self.scope
            .define(statement.name.clone(), RuntimeValue::Function(function));

        Ok(Flow::Normal(RuntimeValue::nil()))
    }

    fn run_if(&mut self, statement: &ast::IfStatement) -> EvaluateResult<Flow> {
        let condition = match self.evaluate_expression(&statement.condition)? {
            RuntimeValue::Primitive(Primitive::Boolean(value)) => value,
            other => {
                return Err(EvaluateError(format!(
                    "If condition must be a Boolean, got {}",
                    other.kind()
                )));
            }
        };

        if condition {
            self.run_block(&statement.then_branch)
        } else {
            self.run_block(&statement.else_branch)
        }
    }

    fn run_for(&mut self, statement: &ast::ForStatement) -> EvaluateResult<Flow> {
        let elements = match self.evaluate_expression(&statement.iterable)? {
            RuntimeValue::Primitive(Primitive::List(elements)) => elements,
            other => {
                return Err(EvaluateError(format!(
                    "For iterable must be a List, got {}",
                    other.kind()
                )));
            }
        };

        for element in elements {
            let flow = self.in_child_scope(|this| {
                this.scope.define(statement.variable.clone(), element);
                this.run_statements(&statement.body)
            })?;

            if let Flow::Return(value) = flow {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal(RuntimeValue::nil()))
    }

    fn run_assignment(&mut self, statement: &ast::AssignmentStatement) -> EvaluateResult<Flow> {
        match &statement.target {
            ast::Expression::Variable(variable) => {
                let value = self.evaluate_expression(&statement.value)?;
                if !self.scope.set(&variable.name, value) {
                    return Err(EvaluateError(format!(
                        "Tried to assign to undefined variable '{}'",
                        variable.name
                    )));
                }
            }
            ast::Expression::Property(property) => {
                let object = match self.evaluate_expression(&property.receiver)? {
                    RuntimeValue::Object(object) => object,
                    other => {
                        return Err(EvaluateError(format!(
                            "Expected an object but got {}",
                            other.kind()
                        )));
                    }
                };

                let value = self.evaluate_expression(&statement.value)?;
                if !object.scope.set(&property.name, value) {
                    return Err(EvaluateError(format!(
                        "Object has no member named '{}'",
                        property.name
                    )));
                }
            }
            _ => {
                return Err(EvaluateError(
                    "Only variables and properties can be assigned to".into(),
                ));
            }
        }

        Ok(Flow::Normal(RuntimeValue::nil()))
    }

    fn evaluate_expression(&mut self, expression: &ast::Expression) -> EvaluateResult<RuntimeValue> {
        match expression {
            ast::Expression::Literal(literal) => Ok(RuntimeValue::Primitive(literal_value(literal))),
            ast::Expression::Group(inner) => self.evaluate_expression(inner),
            ast::Expression::Binary(binary) => self.evaluate_binary(binary),
            ast::Expression::Variable(variable) => {
                self.scope.get(&variable.name, false).ok_or_else(|| {
                    EvaluateError(format!(
                        "Tried to access undefined variable '{}'",
                        variable.name
                    ))
                })
            }
            ast::Expression::Property(property) => {
                let object = match self.evaluate_expression(&property.receiver)? {
                    RuntimeValue::Object(object) => object,
                    other => {
                        return Err(EvaluateError(format!(
                            "Expected an object but got {}",
                            other.kind()
                        )));
                    }
                };

                object.scope.get(&property.name, false).ok_or_else(|| {
                    EvaluateError(format!("Object has no member named '{}'", property.name))
                })
            }
            ast::Expression::Call(call) => self.evaluate_call(call),
            ast::Expression::MethodCall(method) => self.evaluate_method_call(method),
            ast::Expression::Object(object) => self.evaluate_object(object),
        }
    }

    fn evaluate_binary(&mut self, binary: &ast::BinaryExpression) -> EvaluateResult<RuntimeValue> {
        if matches!(binary.operator, BinaryOperator::And | BinaryOperator::Or) {
            return self.evaluate_logical(binary);
        }

        // left before right, unconditionally
        let left = self.evaluate_expression(&binary.left)?;
        let right = self.evaluate_expression(&binary.right)?;

        match binary.operator {
            BinaryOperator::Add => add_values(left, right),
            BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Divide => {
                numeric_binary(binary.operator, left, right)
            }
            BinaryOperator::Equal => Ok(RuntimeValue::boolean(values_equal(&left, &right)?)),
            BinaryOperator::NotEqual => Ok(RuntimeValue::boolean(!values_equal(&left, &right)?)),
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => compare_values(binary.operator, &left, &right),
            BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
        }
    }

    /// `AND`/`OR` short-circuit: the right operand is only evaluated when
    /// the left one does not decide the result.
    fn evaluate_logical(&mut self, binary: &ast::BinaryExpression) -> EvaluateResult<RuntimeValue> {
        let left = self.evaluate_boolean_operand(binary.operator, &binary.left)?;

        match binary.operator {
            BinaryOperator::And if !left => return Ok(RuntimeValue::boolean(false)),
            BinaryOperator::Or if left => return Ok(RuntimeValue::boolean(true)),
            _ => {}
        }

        let right = self.evaluate_boolean_operand(binary.operator, &binary.right)?;
        Ok(RuntimeValue::boolean(right))
    }

    fn evaluate_boolean_operand(
        &mut self,
        operator: BinaryOperator,
        expression: &ast::Expression,
    ) -> EvaluateResult<bool> {
        match self.evaluate_expression(expression)? {
            RuntimeValue::Primitive(Primitive::Boolean(value)) => Ok(value),
            other => Err(EvaluateError(format!(
                "Operator '{}' expects Boolean operands, got {}",
                operator.literal(),
                other.kind()
            ))),
        }
    }

    fn evaluate_call(&mut self, call: &ast::FunctionCall) -> EvaluateResult<RuntimeValue> {
        let Some(value) = self.scope.get(&call.name, false) else {
            return Err(EvaluateError(format!(
                "Tried to call undefined function '{}'",
                call.name
            )));
        };
        let RuntimeValue::Function(function) = value else {
            return Err(EvaluateError(format!("'{}' is not a function", call.name)));
        };

        let mut arguments = vec![];
        for argument in &call.arguments {
            arguments.push(self.evaluate_expression(argument)?);
        }

        self.call_function(&function, arguments)
    }

    /// The receiver is evaluated once and passed as the implicit first
    /// argument, conventionally bound to `this`.
    fn evaluate_method_call(&mut self, method: &ast::MethodCall) -> EvaluateResult<RuntimeValue> {
        let receiver = self.evaluate_expression(&method.receiver)?;
        let RuntimeValue::Object(object) = receiver.clone() else {
            return Err(EvaluateError(format!(
                "Expected an object but got {}",
                receiver.kind()
            )));
        };

        let Some(member) = object.scope.get(&method.name, false) else {
            return Err(EvaluateError(format!(
                "Object has no member named '{}'",
                method.name
            )));
        };
        let RuntimeValue::Function(function) = member else {
            return Err(EvaluateError(format!("'{}' is not a function", method.name)));
        };

        let mut arguments = vec![receiver];
        for argument in &method.arguments {
            arguments.push(self.evaluate_expression(argument)?);
        }

        self.call_function(&function, arguments)
    }

    fn evaluate_object(&mut self, object: &ast::ObjectExpression) -> EvaluateResult<RuntimeValue> {
        // members live in a dedicated scope with no parent
        let object_scope = Scope::new();

        for field in &object.fields {
            if object_scope.get(&field.name, true).is_some() {
                return Err(EvaluateError(format!(
                    "'{}' is already defined in this object",
                    field.name
                )));
            }

            // field initializers run in the enclosing scope
            let value = match &field.value {
                Some(expression) => self.evaluate_expression(expression)?,
                None => RuntimeValue::nil(),
            };
            object_scope.define(field.name.clone(), value);
        }

        for method in &object.methods {
            if object_scope.get(&method.name, true).is_some() {
                return Err(EvaluateError(format!(
                    "'{}' is already defined in this object",
                    method.name
                )));
            }
            check_distinct_parameters(&method.parameters)?;

            let mut parameters = vec!["this".to_string()];
            parameters.extend(method.parameters.iter().map(|p| p.name.clone()));

            let function = FunctionValue {
                name: method.name.clone(),
                callable: Callable::Defined(Rc::new(DefinedFunction {
                    parameters,
                    body: method.body.clone(),
                    closure: object_scope.clone(),
                })),
            };
            object_scope.define(method.name.clone(), RuntimeValue::Function(function));
        }

        Ok(RuntimeValue::Object(ObjectValue {
            name: object.name.clone(),
            scope: object_scope,
        }))
    }

    /// Invoke a function value. For user-defined functions the current
    /// scope is swapped for a child of the captured one and restored before
    /// control leaves, whether the body returned, fell through, or failed.
    fn call_function(
        &mut self,
        function: &FunctionValue,
        arguments: Vec<RuntimeValue>,
    ) -> EvaluateResult<RuntimeValue> {
        match &function.callable {
            Callable::Builtin { arity, function: builtin } => {
                if let Some(arity) = arity {
                    if arguments.len() != *arity {
                        return Err(EvaluateError(format!(
                            "'{}' expects {arity} argument(s) but got {}",
                            function.name,
                            arguments.len()
                        )));
                    }
                }
                builtin(arguments)
            }
            Callable::Defined(definition) => {
                if arguments.len() != definition.parameters.len() {
                    return Err(EvaluateError(format!(
                        "'{}' expects {} argument(s) but got {}",
                        function.name,
                        definition.parameters.len(),
                        arguments.len()
                    )));
                }

                let saved = std::mem::replace(&mut self.scope, definition.closure.child());
                for (parameter, argument) in definition.parameters.iter().zip(arguments) {
                    self.scope.define(parameter.clone(), argument);
                }
                let result = self.run_statements(&definition.body);
                self.scope = saved;

                match result? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal(_) => Ok(RuntimeValue::nil()),
                }
            }
        }
    }
}

fn literal_value(literal: &ast::Literal) -> Primitive {
    match literal {
        ast::Literal::Nil => Primitive::Nil,
        ast::Literal::Boolean(value) => Primitive::Boolean(*value),
        ast::Literal::Integer(value) => Primitive::Integer(value.clone()),
        ast::Literal::Decimal(value) => Primitive::Decimal(value.clone()),
        ast::Literal::Character(value) => Primitive::Character(*value),
        ast::Literal::String(value) => Primitive::String(value.clone()),
    }
}

fn check_distinct_parameters(parameters: &[ast::Parameter]) -> EvaluateResult<()> {
    let mut seen = HashSet::new();
    for parameter in parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(EvaluateError(format!(
                "Parameter '{}' is declared twice",
                parameter.name
            )));
        }
    }
    Ok(())
}

/// `+` concatenates as soon as either side is a string; NIL renders as
/// `NIL`, objects use their print form.
fn add_values(left: RuntimeValue, right: RuntimeValue) -> EvaluateResult<RuntimeValue> {
    let is_string =
        |value: &RuntimeValue| matches!(value, RuntimeValue::Primitive(Primitive::String(_)));

    if is_string(&left) || is_string(&right) {
        return Ok(RuntimeValue::Primitive(Primitive::String(format!(
            "{left}{right}"
        ))));
    }

    numeric_binary(BinaryOperator::Add, left, right)
}

fn numeric_binary(
    operator: BinaryOperator,
    left: RuntimeValue,
    right: RuntimeValue,
) -> EvaluateResult<RuntimeValue> {
    match (left, right) {
        (
            RuntimeValue::Primitive(Primitive::Integer(left)),
            RuntimeValue::Primitive(Primitive::Integer(right)),
        ) => {
            let value = match operator {
                BinaryOperator::Add => left + right,
                BinaryOperator::Subtract => left - right,
                BinaryOperator::Multiply => left * right,
                BinaryOperator::Divide => {
                    if right.is_zero() {
                        return Err(EvaluateError("Division by zero".into()));
                    }
                    // big-integer quotient
                    left / right
                }
                _ => unreachable!("'{}' is not arithmetic", operator.literal()),
            };
            Ok(RuntimeValue::Primitive(Primitive::Integer(value)))
        }
        (
            RuntimeValue::Primitive(Primitive::Decimal(left)),
            RuntimeValue::Primitive(Primitive::Decimal(right)),
        ) => {
            let value = match operator {
                BinaryOperator::Add => &left + &right,
                BinaryOperator::Subtract => &left - &right,
                BinaryOperator::Multiply => &left * &right,
                BinaryOperator::Divide => {
                    if right.is_zero() {
                        return Err(EvaluateError("Division by zero".into()));
                    }
                    let scale = left
                        .fractional_digit_count()
                        .max(right.fractional_digit_count());
                    (&left / &right).with_scale_round(scale, RoundingMode::HalfEven)
                }
                _ => unreachable!("'{}' is not arithmetic", operator.literal()),
            };
            Ok(RuntimeValue::Primitive(Primitive::Decimal(value)))
        }
        (left, right) => Err(EvaluateError(format!(
            "Operator '{}' expects two Integers or two Decimals, got {} and {}",
            operator.literal(),
            left.kind(),
            right.kind()
        ))),
    }
}

/// Objects compare by scope identity; an object never equals a non-object;
/// primitives compare structurally. Functions cannot be compared.
fn values_equal(left: &RuntimeValue, right: &RuntimeValue) -> EvaluateResult<bool> {
    match (left, right) {
        (RuntimeValue::Object(a), RuntimeValue::Object(b)) => Ok(a == b),
        (RuntimeValue::Object(_), _) | (_, RuntimeValue::Object(_)) => Ok(false),
        (RuntimeValue::Primitive(a), RuntimeValue::Primitive(b)) => Ok(a == b),
        (left, right) => Err(EvaluateError(format!(
            "Invalid operands to '==': {} and {}",
            left.kind(),
            right.kind()
        ))),
    }
}

fn compare_values(
    operator: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> EvaluateResult<RuntimeValue> {
    use RuntimeValue::Primitive as P;

    let ordering = match (left, right) {
        (P(Primitive::Boolean(l)), P(Primitive::Boolean(r))) => l.cmp(r),
        (P(Primitive::Integer(l)), P(Primitive::Integer(r))) => l.cmp(r),
        (P(Primitive::Decimal(l)), P(Primitive::Decimal(r))) => l.cmp(r),
        (P(Primitive::Character(l)), P(Primitive::Character(r))) => l.cmp(r),
        (P(Primitive::String(l)), P(Primitive::String(r))) => l.cmp(r),
        _ => {
            return Err(EvaluateError(format!(
                "Operator '{}' expects two comparable values of the same type, got {} and {}",
                operator.literal(),
                left.kind(),
                right.kind()
            )));
        }
    };

    let result = match operator {
        BinaryOperator::Less => ordering.is_lt(),
        BinaryOperator::LessEqual => ordering.is_le(),
        BinaryOperator::Greater => ordering.is_gt(),
        BinaryOperator::GreaterEqual => ordering.is_ge(),
        _ => unreachable!("'{}' is not a comparison", operator.literal()),
    };

    Ok(RuntimeValue::boolean(result))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;

    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn evaluate(input: &str) -> EvaluateResult<RuntimeValue> {
        let tokens = Lexer::new(input).lex().expect("lexing failed");
        let source = Parser::parse(tokens).expect("parsing failed");
        Interpreter::evaluate(&source, stdlib::runtime_scope())
    }

    fn integer(value: i64) -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::Integer(BigInt::from(value)))
    }

    fn decimal(value: &str) -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::Decimal(BigDecimal::from_str(value).unwrap()))
    }

    fn string(value: &str) -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::String(value.into()))
    }

    #[test]
    fn test_empty_program_is_nil() {
        assert_eq!(evaluate(""), Ok(RuntimeValue::nil()));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(evaluate("1 + 2 * 3;"), Ok(integer(7)));
        assert_eq!(evaluate("(1 + 2) * 3;"), Ok(integer(9)));
        assert_eq!(evaluate("7 / 2;"), Ok(integer(3)));
        assert_eq!(evaluate("-7 / 2;"), Ok(integer(-3)));
    }

    #[test]
    fn test_decimal_division_scale_and_rounding() {
        // scale = max of the operand scales, rounded half-even
        assert_eq!(evaluate("1.0 / 3.0;"), Ok(decimal("0.3")));
        assert_eq!(evaluate("1.00 / 3.00;"), Ok(decimal("0.33")));
        assert_eq!(evaluate("1.0 / 8.00;"), Ok(decimal("0.12")));
        assert_eq!(evaluate("3.0 / 8.00;"), Ok(decimal("0.38")));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0;"), Err(EvaluateError("Division by zero".into())));
        assert!(evaluate("1.0 / 0.0;").is_err());
    }

    #[test]
    fn test_mixed_numeric_kinds_rejected() {
        assert!(evaluate("1 + 1.5;").is_err());
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(evaluate(r#""hi " + 1;"#), Ok(string("hi 1")));
        assert_eq!(evaluate(r#"1 + " there";"#), Ok(string("1 there")));
        assert_eq!(evaluate(r#""x = " + NIL;"#), Ok(string("x = NIL")));
        assert_eq!(evaluate(r#""b: " + TRUE;"#), Ok(string("b: TRUE")));
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(evaluate("TRUE OR (1 / 0);"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate("FALSE AND (1 / 0);"), Ok(RuntimeValue::boolean(false)));
        assert!(evaluate("TRUE AND (1 / 0);").is_err());
    }

    #[test]
    fn test_logical_operands_must_be_boolean() {
        assert!(evaluate("1 AND TRUE;").is_err());
        assert!(evaluate("TRUE AND 1;").is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(evaluate("1 < 2;"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate("2 <= 2;"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate(r#""a" < "b";"#), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate("FALSE < TRUE;"), Ok(RuntimeValue::boolean(true)));
        assert!(evaluate("1 < 1.5;").is_err());
    }

    #[test]
    fn test_equality() {
        assert_eq!(evaluate("1 == 1;"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate("NIL == NIL;"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate("1 != 2;"), Ok(RuntimeValue::boolean(true)));
        assert_eq!(evaluate(r#"'a' == 'a';"#), Ok(RuntimeValue::boolean(true)));
    }

    #[test]
    fn test_let_and_lookup() {
        assert_eq!(evaluate("LET x = 1; x;"), Ok(integer(1)));
        assert_eq!(evaluate("LET x; x;"), Ok(RuntimeValue::nil()));
        assert!(evaluate("x;").is_err());
        assert!(evaluate("LET x = 1; LET x = 2;").is_err());
    }

    #[test]
    fn test_assignment() {
        assert_eq!(evaluate("LET x = 1; x = 2; x;"), Ok(integer(2)));
        assert!(evaluate("x = 1;").is_err());
    }

    #[test]
    fn test_if_yields_last_statement_value() {
        assert_eq!(evaluate("IF TRUE DO 1; 2; END"), Ok(integer(2)));
        assert_eq!(evaluate("IF FALSE DO 1; ELSE 3; END"), Ok(integer(3)));
        assert_eq!(evaluate("IF FALSE DO 1; END"), Ok(RuntimeValue::nil()));
        assert!(evaluate("IF 1 DO END").is_err());
    }

    #[test]
    fn test_if_scope_is_dropped() {
        assert!(evaluate("IF TRUE DO LET x = 1; END x;").is_err());
    }

    #[test]
    fn test_assignment_escapes_block_scope() {
        assert_eq!(
            evaluate("LET x = 1; IF TRUE DO x = 5; END x;"),
            Ok(integer(5))
        );
    }

    #[test]
    fn test_function_definition_and_call() {
        assert_eq!(
            evaluate("DEF double(n) DO RETURN n * 2; END double(21);"),
            Ok(integer(42))
        );
        // falling off the end returns NIL
        assert_eq!(
            evaluate("DEF noop() DO 1; END noop();"),
            Ok(RuntimeValue::nil())
        );
    }

    #[test]
    fn test_call_arity_checked() {
        assert!(evaluate("DEF f(a) DO END f();").is_err());
        assert!(evaluate("DEF f(a) DO END f(1, 2);").is_err());
    }

    #[test]
    fn test_functions_capture_their_scope() {
        assert_eq!(
            evaluate("LET x = 10; DEF get() DO RETURN x; END IF TRUE DO LET x = 99; get(); END"),
            Ok(integer(10))
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(
            evaluate("RETURN 1;"),
            Err(EvaluateError("Return outside of a function".into()))
        );
    }

    #[test]
    fn test_return_unwinds_nested_blocks() {
        assert_eq!(
            evaluate(
                "DEF f() DO \
                    FOR i IN range(0, 10) DO \
                        IF i == 3 DO RETURN i; END \
                    END \
                    RETURN -1; \
                 END \
                 f();"
            ),
            Ok(integer(3))
        );
    }

    #[test]
    fn test_error_inside_call_propagates() {
        assert_eq!(
            evaluate("DEF f() DO 1 / 0; END f();"),
            Err(EvaluateError("Division by zero".into()))
        );
    }

    #[test]
    fn test_for_result_is_nil() {
        assert_eq!(
            evaluate("FOR i IN range(0, 3) DO i; END"),
            Ok(RuntimeValue::nil())
        );
        assert!(evaluate("FOR i IN 1 DO END").is_err());
    }

    #[test]
    fn test_argument_evaluation_order() {
        assert_eq!(
            evaluate(
                "LET trace = \"\"; \
                 DEF note(v) DO trace = trace + v; RETURN v; END \
                 DEF add(a, b) DO RETURN a + b; END \
                 add(note(1), note(2)); \
                 trace;"
            ),
            Ok(string("12"))
        );
    }

    #[test]
    fn test_object_fields_and_methods() {
        assert_eq!(
            evaluate(
                "LET o = OBJECT DO LET x = 10; END; \
                 o.x;"
            ),
            Ok(integer(10))
        );
        assert_eq!(
            evaluate(
                "LET o = OBJECT DO \
                    LET x = 10; \
                    DEF bump() DO this.x = this.x + 1; RETURN this.x; END \
                 END; \
                 o.bump(); \
                 o.bump();"
            ),
            Ok(integer(12))
        );
    }

    #[test]
    fn test_object_equality() {
        assert_eq!(
            evaluate("LET a = OBJECT DO END; LET b = a; a == b;"),
            Ok(RuntimeValue::boolean(true))
        );
        assert_eq!(
            evaluate("LET a = OBJECT DO END; LET b = OBJECT DO END; a == b;"),
            Ok(RuntimeValue::boolean(false))
        );
        assert_eq!(
            evaluate("LET a = OBJECT DO END; a == 1;"),
            Ok(RuntimeValue::boolean(false))
        );
    }

    #[test]
    fn test_functions_cannot_be_compared() {
        assert!(evaluate("DEF f() DO END DEF g() DO END f == g;").is_err());
    }

    #[test]
    fn test_property_assignment_requires_existing_field() {
        assert!(evaluate("LET o = OBJECT DO END; o.x = 1;").is_err());
    }

    #[test]
    fn test_field_initializers_use_enclosing_scope() {
        assert_eq!(
            evaluate("LET seed = 5; LET o = OBJECT DO LET x = seed * 2; END; o.x;"),
            Ok(integer(10))
        );
    }
}
