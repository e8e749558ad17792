//! User-defined functions and the native built-ins.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use log::{debug, info};

use crate::class::Instance;
use crate::environment::{Env, Environment};
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A function value: its declaration plus the environment that was active
/// where it was declared (the closure).
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Env,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure has one more frame binding `this`
    /// to `instance`.  Called on every property lookup, never ahead of time.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Function {
        debug!("Binding method '{}' to instance", self.name());

        let env: Env = Environment::child_of(&self.closure);
        env.borrow_mut().define("this", Value::Instance(instance));

        Function::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }

    /// Run the body in a fresh frame under the closure.  The caller has
    /// already checked the arity.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let env: Env = Environment::child_of(&self.closure);

        {
            let mut frame = env.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                frame.define(&param.lexeme, argument);
            }
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            // `init` always yields the instance, whatever the body did.
            return Ok(Environment::get_at(&self.closure, 0, "this"));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native functions
// ─────────────────────────────────────────────────────────────────────────────

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Pin the reference point for `clock`.  Called when an interpreter is built.
pub fn start_clock() {
    EPOCH.get_or_init(Instant::now);
}

/// `clock()`: monotonic seconds elapsed since the first interpreter started.
fn clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let elapsed: f64 = EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64();

    debug!("Native function 'clock' returned: {}", elapsed);

    Ok(Value::Number(elapsed))
}

/// Every native installed in the global environment.
pub fn natives() -> Vec<Value> {
    info!("Registering native functions");

    vec![Value::NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}
