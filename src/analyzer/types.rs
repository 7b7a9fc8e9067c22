//! Semantic type representation and the subtype lattice.
//!
//! The lattice is deliberately flat: ANY on top, the two abstract types
//! EQUATABLE and COMPARABLE in the middle, everything else related only by
//! identity. It is encoded as a predicate rather than inheritance so the
//! compiler checks exhaustiveness of every dispatch.

use std::{collections::HashMap, fmt::Display};

use once_cell::sync::Lazy;

use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Nil,
    Boolean,
    Integer,
    Decimal,
    String,
    /// Top of the lattice; every type is assignable to it.
    Any,
    /// Abstract: everything `==`/`!=` accepts.
    Equatable,
    /// Abstract: everything the ordering operators accept.
    Comparable,
    /// Lists and everything `FOR` accepts.
    Iterable,
    Function {
        params: Vec<Type>,
        returns: Box<Type>,
    },
    /// Object types own their member scope; two object types are equal
    /// exactly when they share that scope.
    Object {
        name: Option<String>,
        #[serde(skip)]
        scope: Scope<Type>,
    },
}

/// Wrapper asserting thread-safety for `TYPES`: every entry is one of the
/// primitive variants (never `Object`), so the `Rc<RefCell<_>>` reachable
/// through the `Type` enum's `Object` variant is never actually present.
pub(crate) struct TypesRegistry(HashMap<&'static str, Type>);

unsafe impl Sync for TypesRegistry {}
unsafe impl Send for TypesRegistry {}

impl std::ops::Deref for TypesRegistry {
    type Target = HashMap<&'static str, Type>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Process-wide registry resolving type annotations. Contains exactly the
/// declarable built-in types; object type names must not collide with it.
pub static TYPES: Lazy<TypesRegistry> = Lazy::new(|| {
    TypesRegistry(HashMap::from([
        ("Nil", Type::Nil),
        ("Boolean", Type::Boolean),
        ("Integer", Type::Integer),
        ("Decimal", Type::Decimal),
        ("String", Type::String),
        ("Any", Type::Any),
        ("Equatable", Type::Equatable),
        ("Comparable", Type::Comparable),
        ("Iterable", Type::Iterable),
    ]))
});

impl Type {
    /// The subtype relation `self ≤ other`.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        match other {
            Type::Any => true,
            Type::Equatable => {
                matches!(self, Type::Nil | Type::Iterable | Type::Equatable)
                    || self.is_subtype_of(&Type::Comparable)
            }
            Type::Comparable => matches!(
                self,
                Type::Boolean | Type::Integer | Type::Decimal | Type::String | Type::Comparable
            ),
            _ => self == other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Decimal)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Nil => write!(f, "Nil"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Integer => write!(f, "Integer"),
            Type::Decimal => write!(f, "Decimal"),
            Type::String => write!(f, "String"),
            Type::Any => write!(f, "Any"),
            Type::Equatable => write!(f, "Equatable"),
            Type::Comparable => write!(f, "Comparable"),
            Type::Iterable => write!(f, "Iterable"),
            Type::Function { params, returns } => write!(
                f,
                "({}) -> {returns}",
                params
                    .iter()
                    .map(|p| format!("{p}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Type::Object { name: Some(name), .. } => write!(f, "Object {name}"),
            Type::Object { name: None, .. } => write!(f, "Object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMITIVES: [Type; 9] = [
        Type::Nil,
        Type::Boolean,
        Type::Integer,
        Type::Decimal,
        Type::String,
        Type::Any,
        Type::Equatable,
        Type::Comparable,
        Type::Iterable,
    ];

    #[test]
    fn test_reflexivity() {
        for t in &PRIMITIVES {
            assert!(t.is_subtype_of(t), "{t} ≤ {t}");
        }
    }

    #[test]
    fn test_any_is_top() {
        for t in &PRIMITIVES {
            assert!(t.is_subtype_of(&Type::Any), "{t} ≤ Any");
        }
        assert!(!Type::Any.is_subtype_of(&Type::Integer));
    }

    #[test]
    fn test_comparable_members() {
        for t in [Type::Boolean, Type::Integer, Type::Decimal, Type::String] {
            assert!(t.is_subtype_of(&Type::Comparable), "{t} ≤ Comparable");
        }
        assert!(!Type::Nil.is_subtype_of(&Type::Comparable));
        assert!(!Type::Iterable.is_subtype_of(&Type::Comparable));
    }

    #[test]
    fn test_equatable_members() {
        for t in [
            Type::Nil,
            Type::Iterable,
            Type::Boolean,
            Type::Integer,
            Type::Decimal,
            Type::String,
            Type::Comparable,
        ] {
            assert!(t.is_subtype_of(&Type::Equatable), "{t} ≤ Equatable");
        }
        assert!(!Type::Any.is_subtype_of(&Type::Equatable));
    }

    #[test]
    fn test_transitivity_through_comparable() {
        // Integer ≤ Comparable ≤ Equatable
        assert!(Type::Integer.is_subtype_of(&Type::Comparable));
        assert!(Type::Comparable.is_subtype_of(&Type::Equatable));
        assert!(Type::Integer.is_subtype_of(&Type::Equatable));
    }

    #[test]
    fn test_function_types_compare_structurally() {
        let f = Type::Function {
            params: vec![Type::Integer],
            returns: Box::new(Type::Integer),
        };
        let g = Type::Function {
            params: vec![Type::Integer],
            returns: Box::new(Type::Integer),
        };
        let h = Type::Function {
            params: vec![Type::Decimal],
            returns: Box::new(Type::Integer),
        };

        assert!(f.is_subtype_of(&g));
        assert!(!f.is_subtype_of(&h));
    }

    #[test]
    fn test_object_types_compare_by_scope_identity() {
        let scope = Scope::new();
        let a = Type::Object {
            name: None,
            scope: scope.clone(),
        };
        let b = Type::Object {
            name: None,
            scope,
        };
        let c = Type::Object {
            name: None,
            scope: Scope::new(),
        };

        assert!(a.is_subtype_of(&b));
        assert!(!a.is_subtype_of(&c));
    }

    #[test]
    fn test_types_registry() {
        assert_eq!(TYPES.get("Integer"), Some(&Type::Integer));
        assert_eq!(TYPES.get("Any"), Some(&Type::Any));
        assert_eq!(TYPES.get("Point"), None);
        assert_eq!(TYPES.len(), 9);
    }
}
