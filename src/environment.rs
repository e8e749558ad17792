use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{FoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to an environment.  A closure and any number of active call
/// frames may hold the same one; it lives as long as the longest holder.
pub type Env = Rc<RefCell<Environment>>;

/// One frame of name → value bindings, linked to its enclosing frame.
/// Links only ever point outward, so the chain is acyclic.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    /// A root environment (globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: a fresh shared child of `enclosing`.
    pub fn child_of(enclosing: &Env) -> Env {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Insert or overwrite in this frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup, innermost frame outward.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(FoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Dynamic assignment; the name must already exist somewhere on the chain.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(FoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Walk exactly `distance` links outward from `env`.
    ///
    /// # Panics
    /// If the chain is shorter than `distance`: the resolver and interpreter
    /// disagree about scope layout, which is a bug in this crate.
    pub fn ancestor(env: &Env, distance: usize) -> Env {
        let mut current: Env = Rc::clone(env);

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .clone()
                .expect("resolver distance exceeds environment depth");
            current = next;
        }

        current
    }

    /// Read `name` exactly `distance` frames out.
    ///
    /// # Panics
    /// If the binding is missing at that depth (see [`Environment::ancestor`]).
    pub fn get_at(env: &Env, distance: usize, name: &str) -> Value {
        debug!("get_at(distance={}, name={})", distance, name);

        let frame: Env = Self::ancestor(env, distance);
        let value = frame.borrow().values.get(name).cloned();

        value.unwrap_or_else(|| panic!("resolved binding '{}' missing at depth {}", name, distance))
    }

    /// Overwrite `name` exactly `distance` frames out.
    pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) {
        debug!("assign_at(distance={}, name={})", distance, name);

        Self::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
}

impl fmt::Debug for Environment {
    // Values may close over this very frame; print names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn get_walks_outward_and_define_shadows() {
        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&globals);
        assert!(matches!(inner.borrow().get(&ident("a")), Ok(Value::Number(n)) if n == 1.0));

        inner.borrow_mut().define("a", Value::Number(2.0));
        assert!(matches!(inner.borrow().get(&ident("a")), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(globals.borrow().get(&ident("a")), Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn assign_updates_declaring_frame() {
        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Nil);

        let inner = Environment::child_of(&globals);
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Bool(true))
            .unwrap();

        assert!(matches!(globals.borrow().get(&ident("a")), Ok(Value::Bool(true))));
    }

    #[test]
    fn undefined_names_are_runtime_errors() {
        let env = Environment::new();

        let err = env.get(&ident("missing")).unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'missing'.");

        let mut env = env;
        assert!(env.assign(&ident("missing"), Value::Nil).is_err());
    }

    #[test]
    fn get_at_and_assign_at_jump_directly() {
        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        let middle = Environment::child_of(&globals);
        middle.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::child_of(&middle);
        inner.borrow_mut().define("x", Value::Number(99.0));

        assert!(matches!(Environment::get_at(&inner, 1, "x"), Value::Number(n) if n == 1.0));

        Environment::assign_at(&inner, 1, "x", Value::Number(5.0));
        assert!(matches!(Environment::get_at(&inner, 1, "x"), Value::Number(n) if n == 5.0));
        assert!(matches!(Environment::get_at(&inner, 0, "x"), Value::Number(n) if n == 99.0));
    }
}
