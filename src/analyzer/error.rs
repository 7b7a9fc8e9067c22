use std::{error::Error, fmt::Display};

use super::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    TypeMismatch { expected: Type, actual: Type },
    UnsupportedOperands { operator: String, left: Type, right: Type },
    UndefinedVariable { name: String },
    UndefinedType { name: String },
    UndefinedMember { name: String },
    Redefinition { name: String },
    DuplicateParameter { name: String },
    ArityMismatch { name: String, expected: usize, actual: usize },
    NotAFunction { name: String },
    NotAnObject { actual: Type },
    ShadowedMember { name: String },
    ReturnOutsideFunction,
    InvalidAssignmentTarget,
    ReservedTypeName { name: String },
}

impl Display for AnalyzeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzeError::TypeMismatch { expected, actual } => {
                write!(f, "Expected type '{expected}' but got '{actual}'")
            }
            AnalyzeError::UnsupportedOperands { operator, left, right } => write!(
                f,
                "Operator '{operator}' is not supported for '{left}' and '{right}'"
            ),
            AnalyzeError::UndefinedVariable { name } => {
                write!(f, "Tried to access undefined variable '{name}'")
            }
            AnalyzeError::UndefinedType { name } => write!(f, "Undefined type '{name}'"),
            AnalyzeError::UndefinedMember { name } => {
                write!(f, "Object has no member named '{name}'")
            }
            AnalyzeError::Redefinition { name } => {
                write!(f, "'{name}' is already defined in this scope")
            }
            AnalyzeError::DuplicateParameter { name } => {
                write!(f, "Parameter '{name}' is declared twice")
            }
            AnalyzeError::ArityMismatch { name, expected, actual } => write!(
                f,
                "'{name}' expects {expected} argument(s) but got {actual}"
            ),
            AnalyzeError::NotAFunction { name } => write!(f, "'{name}' is not a function"),
            AnalyzeError::NotAnObject { actual } => {
                write!(f, "Expected an object but got '{actual}'")
            }
            AnalyzeError::ShadowedMember { name } => {
                write!(f, "'{name}' is a member of the enclosing object; use 'this.{name}'")
            }
            AnalyzeError::ReturnOutsideFunction => write!(f, "Return outside of a function"),
            AnalyzeError::InvalidAssignmentTarget => {
                write!(f, "Only variables and properties can be assigned to")
            }
            AnalyzeError::ReservedTypeName { name } => {
                write!(f, "'{name}' collides with a built-in type")
            }
        }
    }
}

impl Error for AnalyzeError {}

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;
