//! Lexically nested name tables.
//!
//! Both the analyzer and the interpreter thread a [`Scope`] through their
//! walks: the analyzer binds names to types, the interpreter binds names to
//! runtime values. Scopes form a parent chain (children point outward);
//! handles are reference counted so function values and object values can
//! own the scope they captured.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

#[derive(Debug, Default)]
struct Bindings<T> {
    values: HashMap<String, T>,
    parent: Option<Scope<T>>,
}

/// A single lexical region. Cloning a `Scope` clones the handle, not the
/// bindings; two clones observe each other's mutations.
#[derive(Debug)]
pub struct Scope<T> {
    inner: Rc<RefCell<Bindings<T>>>,
}

impl<T> Clone for Scope<T> {
    fn clone(&self) -> Self {
        Scope {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Scopes compare by identity. Object types and object values rely on this:
/// two objects are the same object exactly when they share a scope.
impl<T> PartialEq for Scope<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Scope::new()
    }
}

impl<T> Scope<T> {
    /// Create a root scope with no parent.
    pub fn new() -> Scope<T> {
        Scope {
            inner: Rc::new(RefCell::new(Bindings {
                values: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// Create a scope whose lookups fall back to `self`.
    pub fn child(&self) -> Scope<T> {
        Scope {
            inner: Rc::new(RefCell::new(Bindings {
                values: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }
}

impl<T> Scope<T>
where
    T: Clone,
{
    /// Add a binding to this scope, shadowing any parent binding of the
    /// same name.
    pub fn define(&self, name: impl Into<String>, value: T) {
        self.inner.borrow_mut().values.insert(name.into(), value);
    }

    /// Resolve a name. With `current_only` the parent chain is not
    /// consulted, which is how redeclarations are detected.
    pub fn get(&self, name: &str, current_only: bool) -> Option<T> {
        let bindings = self.inner.borrow();
        if let Some(value) = bindings.values.get(name) {
            return Some(value.clone());
        }
        if current_only {
            return None;
        }
        bindings.parent.as_ref().and_then(|p| p.get(name, false))
    }

    /// Rebind the nearest existing binding. Returns `false` when the name
    /// is bound nowhere in the chain; defining is the caller's decision.
    pub fn set(&self, name: &str, value: T) -> bool {
        let mut bindings = self.inner.borrow_mut();
        if bindings.values.contains_key(name) {
            bindings.values.insert(name.to_string(), value);
            return true;
        }

        let Some(parent) = bindings.parent.clone() else {
            return false;
        };

        // release the borrow before walking outward
        drop(bindings);
        parent.set(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;

    #[test]
    fn test_define_and_get() {
        let scope = Scope::new();
        scope.define("foo", 42);

        assert_eq!(scope.get("foo", false), Some(42));
        assert_eq!(scope.get("foo", true), Some(42));
        assert_eq!(scope.get("bar", false), None);
    }

    #[test]
    fn test_inherited_lookup() {
        let parent = Scope::new();
        parent.define("foo", 1);

        let child = parent.child();
        assert_eq!(child.get("foo", false), Some(1));
        assert_eq!(child.get("foo", true), None);
    }

    #[test]
    fn test_shadowing() {
        let parent = Scope::new();
        parent.define("foo", 1);

        let child = parent.child();
        child.define("foo", 2);

        assert_eq!(child.get("foo", false), Some(2));
        assert_eq!(parent.get("foo", false), Some(1));
    }

    #[test]
    fn test_set_rebinds_nearest() {
        let parent = Scope::new();
        parent.define("foo", 1);

        let child = parent.child();
        assert!(child.set("foo", 2));

        assert_eq!(parent.get("foo", false), Some(2));
    }

    #[test]
    fn test_set_prefers_the_innermost_binding() {
        let parent = Scope::new();
        parent.define("foo", 1);

        let child = parent.child();
        child.define("foo", 2);
        assert!(child.set("foo", 3));

        assert_eq!(child.get("foo", false), Some(3));
        assert_eq!(parent.get("foo", false), Some(1));
    }

    #[test]
    fn test_set_fails_without_binding() {
        let scope: Scope<i32> = Scope::new();
        assert!(!scope.set("foo", 1));
    }

    #[test]
    fn test_identity_comparison() {
        let a: Scope<i32> = Scope::new();
        let b = a.clone();
        let c: Scope<i32> = Scope::new();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clones_share_bindings() {
        let a: Scope<i32> = Scope::new();
        let b = a.clone();

        a.define("foo", 1);
        assert_eq!(b.get("foo", false), Some(1));
    }
}
