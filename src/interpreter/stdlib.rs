//! Standard library bindings.
//!
//! Populates the initial scopes the pipeline entry points expect: runtime
//! values for the interpreter, matching function types for the analyzer.
//! `list` is variadic at runtime; the analyzer sees it as unary because
//! function types carry a fixed arity.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::analyzer::Type;
use crate::scope::Scope;

use super::value::{Callable, FunctionValue, Primitive, RuntimeValue};
use super::{EvaluateError, EvaluateResult};

/// A fresh runtime scope holding all builtin functions.
pub fn runtime_scope() -> Scope<RuntimeValue> {
    let scope = Scope::new();
    install(&scope);
    scope
}

/// A fresh analyzer scope holding the builtin function types.
pub fn type_scope() -> Scope<Type> {
    let scope = Scope::new();

    define_type(&scope, "print", vec![Type::Any], Type::Nil);
    define_type(&scope, "log", vec![Type::Any], Type::Any);
    define_type(&scope, "list", vec![Type::Any], Type::Iterable);
    define_type(&scope, "range", vec![Type::Integer, Type::Integer], Type::Iterable);
    define_type(&scope, "size", vec![Type::Iterable], Type::Integer);

    scope
}

pub fn install(scope: &Scope<RuntimeValue>) {
    define_builtin(scope, "print", Some(1), |mut arguments| {
        let value = arguments.remove(0);
        println!("{value}");
        Ok(RuntimeValue::nil())
    });

    define_builtin(scope, "log", Some(1), |mut arguments| {
        let value = arguments.remove(0);
        log::info!("{value}");
        Ok(value)
    });

    define_builtin(scope, "list", None, |arguments| {
        Ok(RuntimeValue::Primitive(Primitive::List(arguments)))
    });

    define_builtin(scope, "range", Some(2), |mut arguments| {
        let from = arguments.remove(0);
        let to = arguments.remove(0);
        let (
            RuntimeValue::Primitive(Primitive::Integer(from)),
            RuntimeValue::Primitive(Primitive::Integer(to)),
        ) = (from, to)
        else {
            return Err(EvaluateError("range expects two Integers".into()));
        };

        let mut elements = vec![];
        let mut current = from;
        // half-open: the upper bound is excluded
        while current < to {
            elements.push(RuntimeValue::Primitive(Primitive::Integer(current.clone())));
            current += 1u32;
        }

        Ok(RuntimeValue::Primitive(Primitive::List(elements)))
    });

    define_builtin(scope, "size", Some(1), |mut arguments| {
        let RuntimeValue::Primitive(Primitive::List(elements)) = arguments.remove(0) else {
            return Err(EvaluateError("size expects a list".into()));
        };

        Ok(RuntimeValue::Primitive(Primitive::Integer(BigInt::from(
            elements.len(),
        ))))
    });
}

fn define_builtin(
    scope: &Scope<RuntimeValue>,
    name: &str,
    arity: Option<usize>,
    function: impl Fn(Vec<RuntimeValue>) -> EvaluateResult<RuntimeValue> + 'static,
) {
    scope.define(
        name,
        RuntimeValue::Function(FunctionValue {
            name: name.to_string(),
            callable: Callable::Builtin {
                arity,
                function: Rc::new(function),
            },
        }),
    );
}

fn define_type(scope: &Scope<Type>, name: &str, params: Vec<Type>, returns: Type) {
    scope.define(
        name,
        Type::Function {
            params,
            returns: Box::new(returns),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(scope: &Scope<RuntimeValue>, name: &str, arguments: Vec<RuntimeValue>) -> EvaluateResult<RuntimeValue> {
        let Some(RuntimeValue::Function(FunctionValue {
            callable: Callable::Builtin { function, .. },
            ..
        })) = scope.get(name, false)
        else {
            panic!("builtin '{name}' missing");
        };
        function(arguments)
    }

    fn integer(value: i64) -> RuntimeValue {
        RuntimeValue::Primitive(Primitive::Integer(BigInt::from(value)))
    }

    #[test]
    fn test_range_is_half_open() {
        let scope = runtime_scope();
        let result = call(&scope, "range", vec![integer(1), integer(4)]).unwrap();

        assert_eq!(
            result,
            RuntimeValue::Primitive(Primitive::List(vec![
                integer(1),
                integer(2),
                integer(3),
            ]))
        );
    }

    #[test]
    fn test_empty_range() {
        let scope = runtime_scope();
        let result = call(&scope, "range", vec![integer(4), integer(1)]).unwrap();

        assert_eq!(result, RuntimeValue::Primitive(Primitive::List(vec![])));
    }

    #[test]
    fn test_list_is_variadic() {
        let scope = runtime_scope();
        let result = call(&scope, "list", vec![integer(1), RuntimeValue::nil()]).unwrap();

        assert_eq!(
            result,
            RuntimeValue::Primitive(Primitive::List(vec![integer(1), RuntimeValue::nil()]))
        );
    }

    #[test]
    fn test_size() {
        let scope = runtime_scope();
        let list = call(&scope, "range", vec![integer(0), integer(3)]).unwrap();
        let result = call(&scope, "size", vec![list]).unwrap();

        assert_eq!(result, integer(3));
        assert!(call(&scope, "size", vec![integer(1)]).is_err());
    }

    #[test]
    fn test_log_returns_its_argument() {
        let scope = runtime_scope();
        let result = call(&scope, "log", vec![integer(7)]).unwrap();

        assert_eq!(result, integer(7));
    }

    #[test]
    fn test_type_scope_entries() {
        let scope = type_scope();

        assert_eq!(
            scope.get("range", false),
            Some(Type::Function {
                params: vec![Type::Integer, Type::Integer],
                returns: Box::new(Type::Iterable),
            })
        );
        assert!(scope.get("print", false).is_some());
        assert!(scope.get("missing", false).is_none());
    }
}
