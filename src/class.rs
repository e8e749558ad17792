//! Classes and their instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{FoxError, Result};
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Name of the constructor method.
pub const INITIALIZER: &str = "init";

#[derive(Debug)]
pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    /// Unbound methods; `this` is attached per lookup by [`Function::bind`].
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Arity of `init` (inherited or own), zero without one.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Calling a class: make an empty instance and run the bound `init`
    /// on it, if any.  The result is always the new instance.
    pub fn instantiate(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method(INITIALIZER) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An object: its class plus its own fields, created on first assignment.
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Property read: a field shadows a method of the same name; methods come
    /// back freshly bound to `instance`.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(&name.lexeme) {
            let bound = method.bind(Rc::clone(instance));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(FoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Field write; creates the field if needed.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for Instance {
    // Fields may refer back to the instance; list their names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();

        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
