//! Syntactic analysis for Ash.
//!
//! A hand-written recursive descent over the token stream, with operator
//! precedence encoded in the descent order (logical → comparison →
//! additive → multiplicative → secondary → primary). Keywords are
//! identifier tokens matched by literal text. A grammar violation aborts
//! the whole parse; there is no resynchronization.

pub mod ast;
mod tokens;

use std::{error::Error, fmt::Display, str::FromStr};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::lexer::{Token, TokenKind};

use self::ast::{
    AssignmentStatement, BinaryExpression, BinaryOperator, DefStatement, Expression, ForStatement,
    FunctionCall, IfStatement, LetStatement, Literal, MethodCall, ObjectExpression, Parameter,
    PropertyAccess, ReturnStatement, Source, Statement, Variable,
};
use self::tokens::TokenStream;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn eof(item: &str) -> ParseError {
        ParseError {
            message: format!("hit EOF while parsing {item}"),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    stream: TokenStream,
}

impl Parser {
    /// Parse a whole program. The entire token stream must be consumed; an
    /// empty stream is a valid (empty) program.
    pub fn parse(tokens: Vec<Token>) -> ParseResult<Source> {
        let mut parser = Parser {
            stream: TokenStream::new(tokens),
        };

        let mut statements = vec![];
        while parser.stream.has() {
            statements.push(parser.parse_statement()?);
        }

        Ok(Source { statements })
    }

    /// Parse a single expression, e.g. for tooling and tests.
    pub fn parse_expression(tokens: Vec<Token>) -> ParseResult<Expression> {
        let mut parser = Parser {
            stream: TokenStream::new(tokens),
        };

        parser.expression()
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        if self.stream.peek(&["LET".into()]) {
            Ok(Statement::Let(self.parse_let()?))
        } else if self.stream.peek(&["DEF".into()]) {
            Ok(Statement::Def(self.parse_def()?))
        } else if self.stream.peek(&["IF".into()]) {
            Ok(Statement::If(self.parse_if()?))
        } else if self.stream.peek(&["FOR".into()]) {
            Ok(Statement::For(self.parse_for()?))
        } else if self.stream.peek(&["RETURN".into()]) {
            Ok(Statement::Return(self.parse_return()?))
        } else {
            self.parse_expression_or_assignment()
        }
    }

    fn parse_let(&mut self) -> ParseResult<LetStatement> {
        self.stream.expect("LET".into(), "let statement")?;
        let name = self
            .stream
            .expect(TokenKind::Identifier.into(), "let statement")?
            .literal;

        let type_name = if self.stream.take(&[":".into()]) {
            Some(
                self.stream
                    .expect(TokenKind::Identifier.into(), "let type annotation")?
                    .literal,
            )
        } else {
            None
        };

        let value = if self.stream.take(&["=".into()]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.stream.expect(";".into(), "let statement")?;

        Ok(LetStatement {
            name,
            type_name,
            value,
        })
    }

    fn parse_def(&mut self) -> ParseResult<DefStatement> {
        self.stream.expect("DEF".into(), "def statement")?;
        let name = self
            .stream
            .expect(TokenKind::Identifier.into(), "def statement")?
            .literal;

        self.stream.expect("(".into(), "def parameter list")?;
        let mut parameters = vec![];
        if !self.stream.peek(&[")".into()]) {
            loop {
                let name = self
                    .stream
                    .expect(TokenKind::Identifier.into(), "def parameter")?
                    .literal;

                let type_name = if self.stream.take(&[":".into()]) {
                    Some(
                        self.stream
                            .expect(TokenKind::Identifier.into(), "parameter type annotation")?
                            .literal,
                    )
                } else {
                    None
                };

                parameters.push(Parameter { name, type_name });

                if !self.stream.take(&[",".into()]) {
                    break;
                }
            }
        }
        self.stream.expect(")".into(), "def parameter list")?;

        let return_type = if self.stream.take(&[":".into()]) {
            Some(
                self.stream
                    .expect(TokenKind::Identifier.into(), "def return type")?
                    .literal,
            )
        } else {
            None
        };

        self.stream.expect("DO".into(), "def statement")?;
        let body = self.parse_block_until(&["END"])?;
        self.stream.expect("END".into(), "def statement")?;

        Ok(DefStatement {
            name,
            parameters,
            return_type,
            body,
        })
    }

    fn parse_if(&mut self) -> ParseResult<IfStatement> {
        self.stream.expect("IF".into(), "if statement")?;
        let condition = self.expression()?;
        self.stream.expect("DO".into(), "if statement")?;

        let then_branch = self.parse_block_until(&["ELSE", "END"])?;
        let else_branch = if self.stream.take(&["ELSE".into()]) {
            self.parse_block_until(&["END"])?
        } else {
            vec![]
        };
        self.stream.expect("END".into(), "if statement")?;

        Ok(IfStatement {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_for(&mut self) -> ParseResult<ForStatement> {
        self.stream.expect("FOR".into(), "for statement")?;
        let variable = self
            .stream
            .expect(TokenKind::Identifier.into(), "for statement")?
            .literal;
        self.stream.expect("IN".into(), "for statement")?;
        let iterable = self.expression()?;
        self.stream.expect("DO".into(), "for statement")?;

        let body = self.parse_block_until(&["END"])?;
        self.stream.expect("END".into(), "for statement")?;

        Ok(ForStatement {
            variable,
            iterable,
            body,
        })
    }

    fn parse_return(&mut self) -> ParseResult<ReturnStatement> {
        self.stream.expect("RETURN".into(), "return statement")?;

        let value = if self.stream.peek(&[";".into()]) {
            None
        } else {
            Some(self.expression()?)
        };

        self.stream.expect(";".into(), "return statement")?;

        Ok(ReturnStatement { value })
    }

    fn parse_expression_or_assignment(&mut self) -> ParseResult<Statement> {
        let expression = self.expression()?;

        let statement = if self.stream.take(&["=".into()]) {
            let value = self.expression()?;
            Statement::Assignment(AssignmentStatement {
                target: expression,
                value,
            })
        } else {
            Statement::Expression(expression)
        };

        self.stream.expect(";".into(), "expression statement")?;

        Ok(statement)
    }

    /// Statements up to (but not including) one of the terminator
    /// keywords. Running off the end of the input is a parse error.
    fn parse_block_until(&mut self, terminators: &[&str]) -> ParseResult<Vec<Statement>> {
        let mut statements = vec![];
        loop {
            if !self.stream.has() {
                return Err(ParseError::eof("block"));
            }
            if terminators
                .iter()
                .any(|terminator| self.stream.peek(&[(*terminator).into()]))
            {
                return Ok(statements);
            }

            statements.push(self.parse_statement()?);
        }
    }

    fn take_operator(&mut self, operators: &[&str]) -> Option<BinaryOperator> {
        for operator in operators {
            if self.stream.take(&[(*operator).into()]) {
                return BinaryOperator::from_literal(operator);
            }
        }
        None
    }

    fn expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.comparison()?;
        while let Some(operator) = self.take_operator(&["AND", "OR"]) {
            let right = self.comparison()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn comparison(&mut self) -> ParseResult<Expression> {
        // two-character operators probed before their one-character prefixes
        let mut left = self.additive()?;
        while let Some(operator) = self.take_operator(&["<=", ">=", "==", "!=", "<", ">"]) {
            let right = self.additive()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.multiplicative()?;
        while let Some(operator) = self.take_operator(&["+", "-"]) {
            let right = self.multiplicative()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.secondary()?;
        while let Some(operator) = self.take_operator(&["*", "/"]) {
            let right = self.secondary()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// Chained property accesses and method calls on a primary receiver.
    fn secondary(&mut self) -> ParseResult<Expression> {
        let mut expression = self.primary()?;

        while self.stream.take(&[".".into()]) {
            let name = self
                .stream
                .expect(TokenKind::Identifier.into(), "property access")?
                .literal;

            if self.stream.take(&["(".into()]) {
                let arguments = self.parse_arguments()?;
                expression = Expression::MethodCall(MethodCall {
                    receiver: Box::new(expression),
                    name,
                    arguments,
                });
            } else {
                expression = Expression::Property(PropertyAccess {
                    receiver: Box::new(expression),
                    name,
                });
            }
        }

        Ok(expression)
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        if self.stream.take(&["NIL".into()]) {
            return Ok(Expression::Literal(Literal::Nil));
        }
        if self.stream.take(&["TRUE".into()]) {
            return Ok(Expression::Literal(Literal::Boolean(true)));
        }
        if self.stream.take(&["FALSE".into()]) {
            return Ok(Expression::Literal(Literal::Boolean(false)));
        }

        if self.stream.take(&["(".into()]) {
            let inner = self.expression()?;
            self.stream.expect(")".into(), "grouped expression")?;
            return Ok(Expression::Group(Box::new(inner)));
        }

        if self.stream.peek(&["OBJECT".into()]) {
            return Ok(Expression::Object(self.parse_object()?));
        }

        let token = self.stream.next("expression")?;
        match token.kind {
            TokenKind::Integer => decode_integer(&token),
            TokenKind::Decimal => decode_decimal(&token),
            TokenKind::Character => decode_character(&token),
            TokenKind::String => Ok(Expression::Literal(Literal::String(unescape(strip_quotes(
                &token.literal,
            ))))),
            TokenKind::Identifier => {
                if self.stream.take(&["(".into()]) {
                    let arguments = self.parse_arguments()?;
                    Ok(Expression::Call(FunctionCall {
                        name: token.literal,
                        arguments,
                    }))
                } else {
                    Ok(Expression::Variable(Variable {
                        name: token.literal,
                    }))
                }
            }
            TokenKind::Operator => Err(ParseError {
                message: format!("expected expression, found '{token}'"),
            }),
        }
    }

    fn parse_object(&mut self) -> ParseResult<ObjectExpression> {
        self.stream.expect("OBJECT".into(), "object expression")?;

        let name = if self.stream.peek(&[TokenKind::Identifier.into()])
            && !self.stream.peek(&["DO".into()])
        {
            Some(self.stream.next("object expression")?.literal)
        } else {
            None
        };

        self.stream.expect("DO".into(), "object expression")?;

        let mut fields = vec![];
        while self.stream.peek(&["LET".into()]) {
            fields.push(self.parse_let()?);
        }

        let mut methods = vec![];
        while self.stream.peek(&["DEF".into()]) {
            methods.push(self.parse_def()?);
        }

        self.stream.expect("END".into(), "object expression")?;

        Ok(ObjectExpression {
            name,
            fields,
            methods,
        })
    }

    /// Called with the opening parenthesis already consumed; consumes the
    /// closing one.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = vec![];

        if !self.stream.peek(&[")".into()]) {
            loop {
                arguments.push(self.expression()?);
                if !self.stream.take(&[",".into()]) {
                    break;
                }
            }
        }

        self.stream.expect(")".into(), "argument list")?;

        Ok(arguments)
    }
}

fn strip_quotes(literal: &str) -> &str {
    &literal[1..literal.len() - 1]
}

/// Resolve the supported escapes; any unknown `\x` passes through as `x`.
fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000c}'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// INTEGER tokens may carry an exponent. Those are decoded through the
/// decimal representation and collapsed back to a big integer when the
/// value is exactly integral.
fn decode_integer(token: &Token) -> ParseResult<Expression> {
    if token.literal.contains('e') {
        let decimal = BigDecimal::from_str(&token.literal).map_err(|_| ParseError {
            message: format!("failed to decode number literal '{token}'"),
        })?;

        let literal = if decimal.is_integer() {
            let (value, _) = decimal.with_scale(0).into_bigint_and_exponent();
            Literal::Integer(value)
        } else {
            Literal::Decimal(decimal)
        };
        return Ok(Expression::Literal(literal));
    }

    let value = BigInt::from_str(&token.literal).map_err(|_| ParseError {
        message: format!("failed to decode number literal '{token}'"),
    })?;

    Ok(Expression::Literal(Literal::Integer(value)))
}

fn decode_decimal(token: &Token) -> ParseResult<Expression> {
    let value = BigDecimal::from_str(&token.literal).map_err(|_| ParseError {
        message: format!("failed to decode number literal '{token}'"),
    })?;

    Ok(Expression::Literal(Literal::Decimal(value)))
}

fn decode_character(token: &Token) -> ParseResult<Expression> {
    let decoded = unescape(strip_quotes(&token.literal));
    let mut chars = decoded.chars();

    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(ParseError {
            message: format!("invalid character literal '{token}'"),
        });
    };

    Ok(Expression::Literal(Literal::Character(c)))
}
