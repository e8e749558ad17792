//! Tree‑walking evaluator.
//!
//! Statements return [`Flow`]: `return` is ordinary data travelling up to
//! the nearest call boundary, while runtime errors travel as `Err(FoxError)`
//! up to [`Interpreter::interpret`].  Every environment switch is undone on
//! both paths.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::class::{Class, Instance, INITIALIZER};
use crate::environment::{Env, Environment};
use crate::error::{FoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::function::{self, Function};
use crate::resolver::Locals;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding to the enclosing call.
    Return(Value),
}

pub struct Interpreter {
    globals: Env,
    environment: Env,
    locals: Locals,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the natives defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::new`] but `print` writes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        function::start_clock();

        let globals: Env = Rc::new(RefCell::new(Environment::new()));

        for native in function::natives() {
            if let Value::NativeFunction { name, .. } = native {
                debug!("Defining native function '{}'", name);
                globals.borrow_mut().define(name, native);
            }
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Merge a resolver side table.  Ids from different programs never
    /// collide, so entries just accumulate.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Registering {} resolved local(s)", locals.len());

        self.locals.extend(locals);
    }

    /// Drop side-table entries for nodes that will never run again.
    pub fn forget(&mut self, ids: &[ExprId]) {
        for id in ids {
            self.locals.remove(id);
        }

        debug!("Forgot {} resolved local(s), {} left", ids.len(), self.locals.len());
    }

    /// Number of entries in the side table.
    pub fn resolved_len(&self) -> usize {
        self.locals.len()
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error aborts the run.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());

                let env = Environment::child_of(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let superclass: Option<Rc<Class>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            let token = match expr {
                                Expr::Variable {
                                    name: super_name, ..
                                } => super_name,
                                _ => name,
                            };

                            return Err(FoxError::runtime(token, "Superclass must be a class."));
                        }
                    },
                    None => None,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let enclosing: Env = Rc::clone(&self.environment);

                if let Some(superclass) = &superclass {
                    // Methods close over a frame holding `super`.
                    let env = Environment::child_of(&enclosing);
                    env.borrow_mut()
                        .define("super", Value::Class(Rc::clone(superclass)));
                    self.environment = env;
                }

                let mut table: HashMap<String, Rc<Function>> = HashMap::new();

                for method in methods {
                    let function = Function::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        method.name.lexeme == INITIALIZER,
                    );

                    table.insert(method.name.lexeme.clone(), Rc::new(function));
                }

                self.environment = enclosing;

                let class = Class::new(name.lexeme.clone(), superclass, table);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;

                info!("Class '{}' defined", name.lexeme);

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the environment active right here.
                let function =
                    Function::new(Rc::clone(declaration), Rc::clone(&self.environment), false);

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );

                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                debug!("Printed value: {}", value);

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Variable '{}' defined with value: {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `env`, then switch back to the previous
    /// environment whether they finished, returned or failed.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Result<Flow> {
        let previous: Env = std::mem::replace(&mut self.environment, env);

        let result = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, &name.lexeme, value.clone())
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(FoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(FoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::Super { keyword, method, id } => self.evaluate_super(keyword, method, *id),

            Expr::This { keyword, id } => self.lookup_variable(keyword, *id),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Yields an operand, not a coerced boolean.
                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(FoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(FoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Variable { name, id } => self.lookup_variable(name, *id),
        }
    }

    /// Resolved locals jump straight to their frame; everything else is a
    /// global.
    fn lookup_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the superclass comes from the frame recorded for the
    /// defining class, `this` from the frame just inside it.
    fn evaluate_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> Result<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(FoxError::runtime(keyword, "Can't use 'super' outside of a class."));
        };

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, "super")
        else {
            return Err(FoxError::runtime(keyword, "Superclass must be a class."));
        };

        let Value::Instance(instance) =
            Environment::get_at(&self.environment, distance - 1, "this")
        else {
            return Err(FoxError::runtime(keyword, "Can't use 'super' outside of a method."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(FoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn call_value(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        let arity: usize = match &callee {
            Value::NativeFunction { arity, .. } => *arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(FoxError::runtime(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        if arguments.len() != arity {
            return Err(FoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {} in call to {}.",
                    arity,
                    arguments.len(),
                    callee
                ),
            ));
        }

        debug!("Calling {} with {} argument(s)", callee, arguments.len());

        match callee {
            Value::NativeFunction { func, .. } => {
                func(&arguments).map_err(|message| FoxError::runtime(paren, message))
            }
            Value::Function(function) => function.call(self, arguments),
            Value::Class(class) => Class::instantiate(&class, self, arguments),
            _ => Err(FoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (left @ Value::String(_), right @ Value::Number(_))
            | (left @ Value::Number(_), right @ Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            (Value::Number(_) | Value::String(_), _) => Err(FoxError::runtime(
                operator,
                "Right operand must be a number or a string.",
            )),
            _ => Err(FoxError::runtime(
                operator,
                "Left operand must be a number or a string.",
            )),
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a - b))
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a * b))
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a > b))
        }

        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a >= b))
        }

        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a < b))
        }

        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a <= b))
        }

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(FoxError::runtime(operator, "Invalid binary operator.")),
    }
}

/// Both operands as numbers, or an error naming the side that is not.
fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (Value::Number(_), _) => Err(FoxError::runtime(
            operator,
            "Right operand must be a number.",
        )),
        _ => Err(FoxError::runtime(operator, "Left operand must be a number.")),
    }
}
