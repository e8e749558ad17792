use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{Class, Instance};
use crate::function::Function;

/// Host behaviour behind a native function.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A runtime value.  Cloning is cheap: heap objects are shared by `Rc`.
#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: NativeFn,
    },
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl Value {
    /// `nil` and `false` are falsey, everything else (including `0` and `""`)
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    /// Value equality for primitives, identity for heap objects.  Values of
    /// different types are never equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { .. } => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name()),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class_name()),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn no_cross_type_equality() {
        assert_ne!(Value::Bool(true), Value::Number(1.0));
        assert_ne!(Value::String("1".into()), Value::Number(1.0));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
    }
}
