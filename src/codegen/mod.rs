//! Host source emission.
//!
//! A total walk over the typed IR producing Java source text against a
//! small runtime support package (`Runtime` for value operations, `Env` for
//! the scope chain). Every IR node has exactly one emission rule; the
//! output is deterministic and the generator performs no I/O. The emitted
//! text mirrors the evaluator's semantics: functions are first-class
//! runtime values closed over their defining environment, and `AND`/`OR`
//! defer the right operand behind a supplier to keep short-circuiting.

use crate::analyzer::typed_ast::{Expression, Source, Statement};
use crate::parser::ast::{BinaryOperator, Literal};

const INDENT: &str = "    ";

pub fn generate(source: &Source) -> String {
    let mut generator = CodeGenerator::new(0);

    generator.line("public final class Program {");
    generator.indent += 1;
    generator.line("public static Object run(Env env) {");
    generator.indent += 1;

    let last_is_expression = matches!(source.statements.last(), Some(Statement::Expression(_)));
    for (index, statement) in source.statements.iter().enumerate() {
        if index + 1 == source.statements.len() {
            if let Statement::Expression(expression) = statement {
                let rendered = generator.expression(expression, "env");
                generator.line(format!("return {rendered};"));
                break;
            }
        }
        generator.statement(statement, "env");
    }
    if !last_is_expression {
        generator.line("return Runtime.NIL;");
    }

    generator.indent -= 1;
    generator.line("}");
    generator.indent -= 1;
    generator.line("}");

    generator.output
}

struct CodeGenerator {
    output: String,
    indent: usize,
    next_env: usize,
    next_item: usize,
}

impl CodeGenerator {
    fn new(indent: usize) -> CodeGenerator {
        CodeGenerator {
            output: String::new(),
            indent,
            next_env: 0,
            next_item: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.output.push_str(&INDENT.repeat(self.indent));
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    fn fresh_env(&mut self) -> String {
        self.next_env += 1;
        format!("env{}", self.next_env)
    }

    fn statement(&mut self, statement: &Statement, env: &str) {
        match statement {
            Statement::Let(s) => {
                let value = match &s.value {
                    Some(expression) => self.expression(expression, env),
                    None => "Runtime.NIL".to_string(),
                };
                self.line(format!("{env}.define(\"{}\", {value});", s.name));
            }
            Statement::Def(s) => {
                let parameters: Vec<&str> = s.parameters.iter().map(|(name, _)| name.as_str()).collect();
                let function = self.function_literal(&s.name, &parameters, &s.body, env);
                self.line(format!("{env}.define(\"{}\", {function});", s.name));
            }
            Statement::If(s) => {
                let condition = self.expression(&s.condition, env);
                self.line(format!("if (Runtime.truth({condition})) {{"));
                self.block(&s.then_branch, env);
                if s.else_branch.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.block(&s.else_branch, env);
                    self.line("}");
                }
            }
            Statement::For(s) => {
                let iterable = self.expression(&s.iterable, env);
                self.next_item += 1;
                let item = format!("item{}", self.next_item);

                self.line(format!("for (Object {item} : Runtime.elements({iterable})) {{"));
                self.indent += 1;
                let child = self.fresh_env();
                self.line(format!("final Env {child} = {env}.child();"));
                self.line(format!("{child}.define(\"{}\", {item});", s.variable));
                for statement in &s.body {
                    self.statement(statement, &child);
                }
                self.indent -= 1;
                self.line("}");
            }
            Statement::Return(s) => {
                let value = match &s.value {
                    Some(expression) => self.expression(expression, env),
                    None => "Runtime.NIL".to_string(),
                };
                self.line(format!("return {value};"));
            }
            Statement::Expression(expression) => {
                let rendered = self.expression(expression, env);
                self.line(format!("Runtime.touch({rendered});"));
            }
            Statement::VariableAssignment(s) => {
                let value = self.expression(&s.value, env);
                self.line(format!("{env}.assign(\"{}\", {value});", s.target.name));
            }
            Statement::PropertyAssignment(s) => {
                let receiver = self.expression(&s.target.receiver, env);
                let value = self.expression(&s.value, env);
                self.line(format!(
                    "Runtime.setProperty({receiver}, \"{}\", {value});",
                    s.target.name
                ));
            }
        }
    }

    /// A `{ ... }` body in a fresh child environment.
    fn block(&mut self, statements: &[Statement], env: &str) {
        self.indent += 1;
        let child = self.fresh_env();
        self.line(format!("final Env {child} = {env}.child();"));
        for statement in statements {
            self.statement(statement, &child);
        }
        self.indent -= 1;
    }

    /// `Runtime.function(env, "name", List.of(...), envN -> { ... })`,
    /// rendered with the body indented one level below the current one.
    fn function_literal(
        &mut self,
        name: &str,
        parameters: &[&str],
        body: &[Statement],
        env: &str,
    ) -> String {
        let body_env = self.fresh_env();

        let mut inner = CodeGenerator::new(self.indent + 1);
        inner.next_env = self.next_env;
        inner.next_item = self.next_item;
        for statement in body {
            inner.statement(statement, &body_env);
        }
        if !completes_abruptly(body) {
            inner.line("return Runtime.NIL;");
        }
        self.next_env = inner.next_env;
        self.next_item = inner.next_item;

        let rendered_parameters = parameters
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let pad = INDENT.repeat(self.indent);

        format!(
            "Runtime.function({env}, \"{name}\", java.util.List.of({rendered_parameters}), {body_env} -> {{\n{body}{pad}}})",
            body = inner.output
        )
    }

    fn expression(&mut self, expression: &Expression, env: &str) -> String {
        match expression {
            Expression::Literal(literal) => render_literal(&literal.value),
            Expression::Group(group) => {
                format!("({})", self.expression(&group.inner, env))
            }
            Expression::Binary(binary) => {
                let left = self.expression(&binary.left, env);
                let right = self.expression(&binary.right, env);
                match binary.operator {
                    // the supplier keeps the right operand unevaluated
                    BinaryOperator::And => format!("Runtime.and({left}, () -> {right})"),
                    BinaryOperator::Or => format!("Runtime.or({left}, () -> {right})"),
                    operator => format!("Runtime.{}({left}, {right})", operator_method(operator)),
                }
            }
            Expression::Variable(variable) => format!("{env}.get(\"{}\")", variable.name),
            Expression::Property(property) => {
                let receiver = self.expression(&property.receiver, env);
                format!("Runtime.property({receiver}, \"{}\")", property.name)
            }
            Expression::Call(call) => {
                let arguments = self.arguments(&call.arguments, env);
                format!(
                    "Runtime.call({env}.get(\"{}\"), java.util.List.of({arguments}))",
                    call.name
                )
            }
            Expression::MethodCall(method) => {
                let receiver = self.expression(&method.receiver, env);
                let arguments = self.arguments(&method.arguments, env);
                format!(
                    "Runtime.invoke({receiver}, \"{}\", java.util.List.of({arguments}))",
                    method.name
                )
            }
            Expression::Object(object) => {
                let name = match &object.name {
                    Some(name) => format!("\"{name}\""),
                    None => "null".to_string(),
                };
                let mut rendered = format!("Runtime.object({name})");

                for field in &object.fields {
                    let value = match &field.value {
                        Some(expression) => self.expression(expression, env),
                        None => "Runtime.NIL".to_string(),
                    };
                    rendered.push_str(&format!(".field(\"{}\", {value})", field.name));
                }

                for method in &object.methods {
                    let mut parameters = vec!["this"];
                    parameters.extend(method.parameters.iter().map(|(name, _)| name.as_str()));
                    // methods close over the object scope, which the
                    // runtime passes as the receiver environment
                    let function =
                        self.function_literal(&method.name, &parameters, &method.body, "self");
                    rendered.push_str(&format!(".method(\"{}\", {function})", method.name));
                }

                rendered
            }
        }
    }

    fn arguments(&mut self, arguments: &[Expression], env: &str) -> String {
        arguments
            .iter()
            .map(|argument| self.expression(argument, env))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Whether every path through the statements ends in a `return`, so the
/// default `return Runtime.NIL;` would be unreachable.
fn completes_abruptly(statements: &[Statement]) -> bool {
    match statements.last() {
        Some(Statement::Return(_)) => true,
        Some(Statement::If(s)) => {
            completes_abruptly(&s.then_branch) && completes_abruptly(&s.else_branch)
        }
        _ => false,
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Nil => "Runtime.NIL".to_string(),
        Literal::Boolean(value) => format!("Runtime.bool({value})"),
        Literal::Integer(value) => format!("Runtime.integer(\"{value}\")"),
        Literal::Decimal(value) => format!("Runtime.decimal(\"{value}\")"),
        Literal::Character(value) => format!("Runtime.character('{}')", escape_character(*value)),
        Literal::String(value) => format!("Runtime.string(\"{}\")", escape_string(value)),
    }
}

fn operator_method(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "add",
        BinaryOperator::Subtract => "subtract",
        BinaryOperator::Multiply => "multiply",
        BinaryOperator::Divide => "divide",
        BinaryOperator::Less => "lessThan",
        BinaryOperator::LessEqual => "lessOrEqual",
        BinaryOperator::Greater => "greaterThan",
        BinaryOperator::GreaterEqual => "greaterOrEqual",
        BinaryOperator::Equal => "equalTo",
        BinaryOperator::NotEqual => "notEqualTo",
        BinaryOperator::And | BinaryOperator::Or => unreachable!("short-circuit operators"),
    }
}

fn escape_string(value: &str) -> String {
    value.chars().map(escape_into_java).collect()
}

fn escape_character(value: char) -> String {
    if value == '\'' {
        return "\\'".to_string();
    }
    escape_into_java(value)
}

fn escape_into_java(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '"' => "\\\"".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\u{0008}' => "\\b".to_string(),
        '\u{000c}' => "\\f".to_string(),
        other => other.to_string(),
    }
}
