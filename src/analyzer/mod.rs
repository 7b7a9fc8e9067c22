//! Semantic analysis for Ash.
//!
//! Consumes the untyped syntax tree and produces the typed IR: every
//! expression gets a resolved type, declarations are validated against the
//! subtype lattice, and assignments are split into their variable and
//! property forms. The analyzer never executes anything; it is a peer of
//! the interpreter, not a prerequisite.

mod error;
pub mod typed_ast;
mod types;

pub use error::{AnalyzeError, AnalyzeResult};
pub use types::{Type, TYPES};

use std::collections::HashSet;

use crate::parser::ast::{self, BinaryOperator, Literal};
use crate::scope::Scope;

/// Sentinel binding carrying the declared return type through a function
/// body. Not a legal identifier, so user code can never shadow it.
pub const RETURNS_KEY: &str = "$RETURNS";

pub struct Analyzer {
    scope: Scope<Type>,
}

impl Analyzer {
    /// Analyze a whole program against an initial scope of builtin types.
    pub fn analyze(source: &ast::Source, initial: Scope<Type>) -> AnalyzeResult<typed_ast::Source> {
        log::debug!("analyzing {} top-level statement(s)", source.statements.len());

        let mut analyzer = Analyzer { scope: initial };

        let mut statements = vec![];
        for statement in &source.statements {
            statements.push(analyzer.check_statement(statement)?);
        }

        Ok(typed_ast::Source { statements })
    }

    /// Run `f` under the given scope and restore the previous one
    /// afterwards, on the error path as well as the normal one.
    fn with_scope<R>(
        &mut self,
        scope: Scope<Type>,
        f: impl FnOnce(&mut Analyzer) -> AnalyzeResult<R>,
    ) -> AnalyzeResult<R> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    fn in_child_scope<R>(
        &mut self,
        f: impl FnOnce(&mut Analyzer) -> AnalyzeResult<R>,
    ) -> AnalyzeResult<R> {
        let child = self.scope.child();
        self.with_scope(child, f)
    }

    /// Combine an optional annotation with an optional inferred type: the
    /// annotation wins when present (and the inferred type must fit it),
    /// the inferred type is used otherwise, and ANY is the fallback.
    fn resolve_type(
        &self,
        type_name: Option<&str>,
        inferred: Option<&Type>,
    ) -> AnalyzeResult<Type> {
        match (type_name, inferred) {
            (Some(name), inferred) => {
                let Some(declared) = TYPES.get(name) else {
                    return Err(AnalyzeError::UndefinedType {
                        name: name.to_string(),
                    });
                };
                if let Some(inferred) = inferred {
                    expect_subtype(inferred, declared)?;
                }
                Ok(declared.clone())
            }
            (None, Some(inferred)) => Ok(inferred.clone()),
            (None, None) => Ok(Type::Any),
        }
    }

    fn check_statement(&mut self, statement: &ast::Statement) -> AnalyzeResult<typed_ast::Statement> {
        match statement {
            ast::Statement::Let(s) => Ok(typed_ast::Statement::Let(self.check_let(s)?)),
            ast::Statement::Def(s) => Ok(typed_ast::Statement::Def(self.check_def(s)?)),
            ast::Statement::If(s) => self.check_if(s),
            ast::Statement::For(s) => self.check_for(s),
            ast::Statement::Return(s) => self.check_return(s),
            ast::Statement::Expression(e) => {
                Ok(typed_ast::Statement::Expression(self.check_expression(e)?))
            }
            ast::Statement::Assignment(s) => self.check_assignment(s),
        }
    }

    fn check_let(&mut self, statement: &ast::LetStatement) -> AnalyzeResult<typed_ast::LetStatement> {
        if self.scope.get(&statement.name, true).is_some() {
            return Err(AnalyzeError::Redefinition {
                name: statement.name.clone(),
            });
        }

        let value = statement
            .value
            .as_ref()
            .map(|e| self.check_expression(e))
            .transpose()?;

        let type_id = self.resolve_type(
            statement.type_name.as_deref(),
            value.as_ref().map(|v| v.type_id()),
        )?;

        self.scope.define(statement.name.clone(), type_id.clone());

        Ok(typed_ast::LetStatement {
            name: statement.name.clone(),
            type_id,
            value,
        })
    }

    fn check_def(&mut self, statement: &ast::DefStatement) -> AnalyzeResult<typed_ast::DefStatement> {
        if self.scope.get(&statement.name, true).is_some() {
            return Err(AnalyzeError::Redefinition {
                name: statement.name.clone(),
            });
        }

        let (parameters, returns) = self.resolve_signature(statement)?;
        let function_type = Type::Function {
            params: parameters.iter().map(|(_, t)| t.clone()).collect(),
            returns: Box::new(returns.clone()),
        };

        // defined before the body is analyzed so recursive calls resolve
        self.scope.define(statement.name.clone(), function_type);

        let body = self.in_child_scope(|this| {
            this.check_function_body(&parameters, &returns, &statement.body)
        })?;

        Ok(typed_ast::DefStatement {
            name: statement.name.clone(),
            parameters,
            returns,
            body,
        })
    }

    fn resolve_signature(
        &self,
        statement: &ast::DefStatement,
    ) -> AnalyzeResult<(Vec<(String, Type)>, Type)> {
        let mut seen = HashSet::new();
        let mut parameters = vec![];
        for parameter in &statement.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(AnalyzeError::DuplicateParameter {
                    name: parameter.name.clone(),
                });
            }
            let type_id = self.resolve_type(parameter.type_name.as_deref(), None)?;
            parameters.push((parameter.name.clone(), type_id));
        }

        let returns = self.resolve_type(statement.return_type.as_deref(), None)?;

        Ok((parameters, returns))
    }

    /// The caller has already pushed the body scope.
    fn check_function_body(
        &mut self,
        parameters: &[(String, Type)],
        returns: &Type,
        body: &[ast::Statement],
    ) -> AnalyzeResult<Vec<typed_ast::Statement>> {
        for (name, type_id) in parameters {
            self.scope.define(name.clone(), type_id.clone());
        }
        self.scope.define(RETURNS_KEY, returns.clone());

        body.iter().map(|s| self.check_statement(s)).collect()
    }

    fn check_if(&mut self, statement: &ast::IfStatement) -> AnalyzeResult<typed_ast::Statement> {
        let condition = self.check_expression(&statement.condition)?;
        expect_subtype(condition.type_id(), &Type::Boolean)?;

        let then_branch = self.in_child_scope(|this| {
            statement
                .then_branch
                .iter()
                .map(|s| this.check_statement(s))
                .collect()
        })?;
        let else_branch = self.in_child_scope(|this| {
            statement
                .else_branch
                .iter()
                .map(|s| this.check_statement(s))
                .collect()
        })?;

        Ok(typed_ast::Statement::If(typed_ast::IfStatement {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn check_for(&mut self, statement: &ast::ForStatement) -> AnalyzeResult<typed_ast::Statement> {
        let iterable = self.check_expression(&statement.iterable)?;
        expect_subtype(iterable.type_id(), &Type::Iterable)?;

        let body = self.in_child_scope(|this| {
            // the iterable protocol yields integers at this stage
            this.scope.define(statement.variable.clone(), Type::Integer);
            statement
                .body
                .iter()
                .map(|s| this.check_statement(s))
                .collect()
        })?;

        Ok(typed_ast::Statement::For(typed_ast::ForStatement {
            variable: statement.variable.clone(),
            iterable,
            body,
        }))
    }

    fn check_return(&mut self, statement: &ast::ReturnStatement) -> AnalyzeResult<typed_ast::Statement> {
        let Some(returns) = self.scope.get(RETURNS_KEY, false) else {
            return Err(AnalyzeError::ReturnOutsideFunction);
        };

        let value = statement
            .value
            .as_ref()
            .map(|e| self.check_expression(e))
            .transpose()?;

        let actual = value
            .as_ref()
            .map(|v| v.type_id().clone())
            .unwrap_or(Type::Nil);
        expect_subtype(&actual, &returns)?;

        Ok(typed_ast::Statement::Return(typed_ast::ReturnStatement {
            value,
        }))
    }

    fn check_assignment(
        &mut self,
        statement: &ast::AssignmentStatement,
    ) -> AnalyzeResult<typed_ast::Statement> {
        match &statement.target {
            ast::Expression::Variable(variable) => {
                let Some(target_type) = self.scope.get(&variable.name, false) else {
                    return Err(AnalyzeError::UndefinedVariable {
                        name: variable.name.clone(),
                    });
                };

                let value = self.check_expression(&statement.value)?;
                expect_subtype(value.type_id(), &target_type)?;

                Ok(typed_ast::Statement::VariableAssignment(
                    typed_ast::VariableAssignment {
                        target: typed_ast::Variable {
                            name: variable.name.clone(),
                            type_id: target_type,
                        },
                        value,
                    },
                ))
            }
            ast::Expression::Property(property) => {
                let receiver = self.check_expression(&property.receiver)?;
                let member = {
                    let Type::Object { scope, .. } = receiver.type_id() else {
                        return Err(AnalyzeError::NotAnObject {
                            actual: receiver.type_id().clone(),
                        });
                    };
                    scope
                        .get(&property.name, false)
                        .ok_or(AnalyzeError::UndefinedMember {
                            name: property.name.clone(),
                        })?
                };

                let value = self.check_expression(&statement.value)?;
                expect_subtype(value.type_id(), &member)?;

                Ok(typed_ast::Statement::PropertyAssignment(
                    typed_ast::PropertyAssignment {
                        target: typed_ast::Property {
                            receiver: Box::new(receiver),
                            name: property.name.clone(),
                            type_id: member,
                        },
                        value,
                    },
                ))
            }
            _ => Err(AnalyzeError::InvalidAssignmentTarget),
        }
    }

    fn check_expression(&mut self, expression: &ast::Expression) -> AnalyzeResult<typed_ast::Expression> {
        match expression {
            ast::Expression::Literal(literal) => Ok(check_literal(literal)),
            ast::Expression::Group(inner) => {
                let inner = self.check_expression(inner)?;
                Ok(typed_ast::Expression::Group(typed_ast::Group {
                    type_id: inner.type_id().clone(),
                    inner: Box::new(inner),
                }))
            }
            ast::Expression::Binary(binary) => self.check_binary(binary),
            ast::Expression::Variable(variable) => self.check_variable(variable),
            ast::Expression::Property(property) => self.check_property(property),
            ast::Expression::Call(call) => self.check_call(call),
            ast::Expression::MethodCall(method) => self.check_method_call(method),
            ast::Expression::Object(object) => self.check_object(object),
        }
    }

    fn check_binary(&mut self, binary: &ast::BinaryExpression) -> AnalyzeResult<typed_ast::Expression> {
        let left = self.check_expression(&binary.left)?;
        let right = self.check_expression(&binary.right)?;
        let left_type = left.type_id().clone();
        let right_type = right.type_id().clone();

        let type_id = match binary.operator {
            BinaryOperator::Add => {
                // string concatenation stringifies the other side at runtime
                if left_type == Type::String || right_type == Type::String {
                    Type::String
                } else {
                    numeric_operands(binary.operator, &left_type, &right_type)?
                }
            }
            BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Divide => {
                numeric_operands(binary.operator, &left_type, &right_type)?
            }
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                expect_subtype(&left_type, &Type::Comparable)?;
                if left_type != right_type {
                    return Err(AnalyzeError::TypeMismatch {
                        expected: left_type,
                        actual: right_type,
                    });
                }
                Type::Boolean
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                expect_subtype(&left_type, &Type::Equatable)?;
                expect_subtype(&right_type, &Type::Equatable)?;
                Type::Boolean
            }
            BinaryOperator::And | BinaryOperator::Or => {
                expect_subtype(&left_type, &Type::Boolean)?;
                expect_subtype(&right_type, &Type::Boolean)?;
                Type::Boolean
            }
        };

        Ok(typed_ast::Expression::Binary(typed_ast::Binary {
            operator: binary.operator,
            left: Box::new(left),
            right: Box::new(right),
            type_id,
        }))
    }

    /// Bare references to members of the enclosing object are rejected in
    /// favour of `this.name`, unless a local of the same name shadows them.
    fn check_variable(&mut self, variable: &ast::Variable) -> AnalyzeResult<typed_ast::Expression> {
        if let Some(Type::Object {
            scope: object_scope,
            ..
        }) = self.scope.get("this", false)
        {
            if object_scope.get(&variable.name, false).is_some()
                && self.scope.get(&variable.name, true).is_none()
            {
                return Err(AnalyzeError::ShadowedMember {
                    name: variable.name.clone(),
                });
            }
        }

        let Some(type_id) = self.scope.get(&variable.name, false) else {
            return Err(AnalyzeError::UndefinedVariable {
                name: variable.name.clone(),
            });
        };

        Ok(typed_ast::Expression::Variable(typed_ast::Variable {
            name: variable.name.clone(),
            type_id,
        }))
    }

    fn check_property(&mut self, property: &ast::PropertyAccess) -> AnalyzeResult<typed_ast::Expression> {
        let receiver = self.check_expression(&property.receiver)?;
        let member = {
            let Type::Object { scope, .. } = receiver.type_id() else {
                return Err(AnalyzeError::NotAnObject {
                    actual: receiver.type_id().clone(),
                });
            };
            scope
                .get(&property.name, false)
                .ok_or(AnalyzeError::UndefinedMember {
                    name: property.name.clone(),
                })?
        };

        Ok(typed_ast::Expression::Property(typed_ast::Property {
            receiver: Box::new(receiver),
            name: property.name.clone(),
            type_id: member,
        }))
    }

    fn check_call(&mut self, call: &ast::FunctionCall) -> AnalyzeResult<typed_ast::Expression> {
        let Some(callee) = self.scope.get(&call.name, false) else {
            return Err(AnalyzeError::UndefinedVariable {
                name: call.name.clone(),
            });
        };
        let Type::Function { params, returns } = callee else {
            return Err(AnalyzeError::NotAFunction {
                name: call.name.clone(),
            });
        };

        let arguments = self.check_arguments(&call.name, &call.arguments, &params)?;

        Ok(typed_ast::Expression::Call(typed_ast::Call {
            name: call.name.clone(),
            arguments,
            type_id: *returns,
        }))
    }

    /// The receiver is passed implicitly and does not count towards the
    /// user-visible arity.
    fn check_method_call(&mut self, method: &ast::MethodCall) -> AnalyzeResult<typed_ast::Expression> {
        let receiver = self.check_expression(&method.receiver)?;
        let member = {
            let Type::Object { scope, .. } = receiver.type_id() else {
                return Err(AnalyzeError::NotAnObject {
                    actual: receiver.type_id().clone(),
                });
            };
            scope
                .get(&method.name, false)
                .ok_or(AnalyzeError::UndefinedMember {
                    name: method.name.clone(),
                })?
        };
        let Type::Function { params, returns } = member else {
            return Err(AnalyzeError::NotAFunction {
                name: method.name.clone(),
            });
        };

        let arguments = self.check_arguments(&method.name, &method.arguments, &params)?;

        Ok(typed_ast::Expression::MethodCall(typed_ast::MethodCall {
            receiver: Box::new(receiver),
            name: method.name.clone(),
            arguments,
            type_id: *returns,
        }))
    }

    fn check_arguments(
        &mut self,
        name: &str,
        arguments: &[ast::Expression],
        params: &[Type],
    ) -> AnalyzeResult<Vec<typed_ast::Expression>> {
        if arguments.len() != params.len() {
            return Err(AnalyzeError::ArityMismatch {
                name: name.to_string(),
                expected: params.len(),
                actual: arguments.len(),
            });
        }

        let mut checked = vec![];
        for (argument, param) in arguments.iter().zip(params) {
            let argument = self.check_expression(argument)?;
            expect_subtype(argument.type_id(), param)?;
            checked.push(argument);
        }

        Ok(checked)
    }

    fn check_object(&mut self, object: &ast::ObjectExpression) -> AnalyzeResult<typed_ast::Expression> {
        if let Some(name) = &object.name {
            if TYPES.contains_key(name.as_str()) {
                return Err(AnalyzeError::ReservedTypeName { name: name.clone() });
            }
        }

        // members live in a dedicated scope with no parent; they are only
        // reachable through a receiver
        let object_scope = Scope::new();

        let fields = self.with_scope(object_scope.clone(), |this| {
            object
                .fields
                .iter()
                .map(|field| this.check_let(field))
                .collect::<AnalyzeResult<Vec<_>>>()
        })?;

        // first pass over methods: signatures only, so methods may call
        // each other regardless of order
        let mut signatures = vec![];
        for method in &object.methods {
            if object_scope.get(&method.name, true).is_some() {
                return Err(AnalyzeError::Redefinition {
                    name: method.name.clone(),
                });
            }

            let (parameters, returns) = self.resolve_signature(method)?;
            let function_type = Type::Function {
                params: parameters.iter().map(|(_, t)| t.clone()).collect(),
                returns: Box::new(returns.clone()),
            };
            object_scope.define(method.name.clone(), function_type);
            signatures.push((parameters, returns));
        }

        let object_type = Type::Object {
            name: object.name.clone(),
            scope: object_scope.clone(),
        };

        // second pass: bodies, in a scope extending the object scope with
        // `this` bound to the constructed type
        let mut methods = vec![];
        for (method, (parameters, returns)) in object.methods.iter().zip(signatures) {
            let body = self.with_scope(object_scope.child(), |this| {
                this.scope.define("this", object_type.clone());
                this.check_function_body(&parameters, &returns, &method.body)
            })?;

            methods.push(typed_ast::DefStatement {
                name: method.name.clone(),
                parameters,
                returns,
                body,
            });
        }

        Ok(typed_ast::Expression::Object(typed_ast::Object {
            name: object.name.clone(),
            fields,
            methods,
            type_id: object_type,
        }))
    }
}

fn check_literal(literal: &Literal) -> typed_ast::Expression {
    let type_id = match literal {
        Literal::Nil => Type::Nil,
        Literal::Boolean(_) => Type::Boolean,
        Literal::Integer(_) => Type::Integer,
        Literal::Decimal(_) => Type::Decimal,
        Literal::String(_) => Type::String,
        // characters have no dedicated place in the lattice
        Literal::Character(_) => Type::Any,
    };

    typed_ast::Expression::Literal(typed_ast::Literal {
        value: literal.clone(),
        type_id,
    })
}

fn expect_subtype(actual: &Type, expected: &Type) -> AnalyzeResult<()> {
    if actual.is_subtype_of(expected) {
        return Ok(());
    }

    Err(AnalyzeError::TypeMismatch {
        expected: expected.clone(),
        actual: actual.clone(),
    })
}

fn numeric_operands(
    operator: BinaryOperator,
    left: &Type,
    right: &Type,
) -> AnalyzeResult<Type> {
    if left.is_numeric() && left == right {
        return Ok(left.clone());
    }

    Err(AnalyzeError::UnsupportedOperands {
        operator: operator.literal().to_string(),
        left: left.clone(),
        right: right.clone(),
    })
}
