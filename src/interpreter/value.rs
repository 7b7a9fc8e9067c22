//! Runtime value representation.
//!
//! Values are cheap to clone: primitives clone their payload, functions and
//! objects clone reference-counted handles. Object identity therefore lives
//! in the shared scope, which is exactly what the equality rules require.

use std::{fmt::Display, rc::Rc};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::parser::ast;
use crate::scope::Scope;

use super::EvaluateResult;

#[derive(Clone)]
pub enum RuntimeValue {
    Primitive(Primitive),
    Function(FunctionValue),
    Object(ObjectValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    List(Vec<RuntimeValue>),
}

#[derive(Clone)]
pub struct FunctionValue {
    pub name: String,
    pub callable: Callable,
}

pub type BuiltinFn = dyn Fn(Vec<RuntimeValue>) -> EvaluateResult<RuntimeValue>;

#[derive(Clone)]
pub enum Callable {
    /// Host-provided function. `arity: None` accepts any argument count.
    Builtin {
        arity: Option<usize>,
        function: Rc<BuiltinFn>,
    },
    /// User-defined function carrying its body and captured scope. Method
    /// callables list `this` as their first parameter.
    Defined(Rc<DefinedFunction>),
}

#[derive(Debug)]
pub struct DefinedFunction {
    pub parameters: Vec<String>,
    pub body: Vec<ast::Statement>,
    pub closure: Scope<RuntimeValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub name: Option<String>,
    pub scope: Scope<RuntimeValue>,
}

impl RuntimeValue {
    pub fn nil() -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::Nil)
    }

    pub fn boolean(value: bool) -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::Boolean(value))
    }

    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeValue::Primitive(Primitive::Nil) => "Nil",
            RuntimeValue::Primitive(Primitive::Boolean(_)) => "Boolean",
            RuntimeValue::Primitive(Primitive::Integer(_)) => "Integer",
            RuntimeValue::Primitive(Primitive::Decimal(_)) => "Decimal",
            RuntimeValue::Primitive(Primitive::Character(_)) => "Character",
            RuntimeValue::Primitive(Primitive::String(_)) => "String",
            RuntimeValue::Primitive(Primitive::List(_)) => "List",
            RuntimeValue::Function(_) => "Function",
            RuntimeValue::Object(_) => "Object",
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Primitive(a), RuntimeValue::Primitive(b)) => a == b,
            (RuntimeValue::Function(a), RuntimeValue::Function(b)) => a == b,
            (RuntimeValue::Object(a), RuntimeValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Functions compare by identity of their callable.
impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && match (&self.callable, &other.callable) {
                (
                    Callable::Builtin { function: a, .. },
                    Callable::Builtin { function: b, .. },
                ) => Rc::ptr_eq(a, b),
                (Callable::Defined(a), Callable::Defined(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl std::fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::Primitive(primitive) => {
                f.debug_tuple("Primitive").field(primitive).finish()
            }
            RuntimeValue::Function(function) => f
                .debug_struct("Function")
                .field("name", &function.name)
                .finish(),
            RuntimeValue::Object(object) => {
                f.debug_struct("Object").field("name", &object.name).finish()
            }
        }
    }
}

/// The print form, also used by string concatenation.
impl Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::Primitive(primitive) => primitive.fmt(f),
            RuntimeValue::Function(function) => write!(f, "DEF {}", function.name),
            RuntimeValue::Object(object) => match &object.name {
                Some(name) => write!(f, "Object {name}"),
                None => write!(f, "Object"),
            },
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Nil => write!(f, "NIL"),
            Primitive::Boolean(true) => write!(f, "TRUE"),
            Primitive::Boolean(false) => write!(f, "FALSE"),
            Primitive::Integer(value) => value.fmt(f),
            Primitive::Decimal(value) => value.fmt(f),
            Primitive::Character(value) => value.fmt(f),
            Primitive::String(value) => value.fmt(f),
            Primitive::List(elements) => {
                let rendered = elements
                    .iter()
                    .map(|e| format!("{e}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{rendered}]")
            }
        }
    }
}
