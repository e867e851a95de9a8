use std::cmp::Ordering;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::ast::{BinaryOp, Expr, ExprId, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::callable::{Callable, LoxClass, LoxFunction, LoxInstance};
use crate::config::InterpreterConfig;
use crate::environment::{self, EnvRef, Environment};
use crate::error::RuntimeError;
use crate::native;
use crate::resolver::Locals;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished. `Break` and `Return` unwind to the nearest loop
/// or call respectively; they are not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    output: Box<dyn Write>,
    config: InterpreterConfig,
    call_depth: usize,
    started: Instant,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout, with the native functions defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        native::define_globals(&mut globals);
        let globals = globals.into_ref();

        Self {
            environment: globals.clone(),
            globals,
            locals: Locals::default(),
            output,
            config: InterpreterConfig::default(),
            call_depth: 0,
            started: Instant::now(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Time since this interpreter was created.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Run a resolved program. `locals` is the resolver's table for exactly
    /// these statements; tables from earlier programs are kept.
    ///
    /// The first runtime error stops the program. The interpreter is left
    /// ready for the next call, with everything defined so far still in
    /// place.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals.extend(locals);

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error: {}", e);

                self.environment = self.globals.clone();
                self.call_depth = 0;
                // Keep whatever was printed before the failure.
                let _ = self.output.flush();
                return Err(e);
            }
        }

        self.output.flush()?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = self.evaluate(initializer)?;
                debug!("Defining variable '{}' = {}", name.name, value);
                self.environment.borrow_mut().define(&name.name, value);
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(self.environment.clone()).into_ref();
                return self.execute_block(statements, frame);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }

            Stmt::Break { .. } => return Ok(Flow::Break),

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.name);

                let function = LoxFunction::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.name, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.name);

                self.environment.borrow_mut().define(&name.name, Value::Nil);

                let methods = methods
                    .iter()
                    .map(|method| {
                        let is_initializer = method.name.name == "init";
                        let function =
                            LoxFunction::new(method.clone(), self.environment.clone(), is_initializer);
                        (method.name.name.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.name.clone(), methods);
                self.environment.borrow_mut().assign(
                    &name.name,
                    Value::Class(Rc::new(class)),
                    name.line,
                )?;
            }
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` with `frame` as the current environment. The previous
    /// environment is restored however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], frame: EnvRef) -> IResult<Flow> {
        let previous = mem::replace(&mut self.environment, frame);
        let result = self.execute_sequence(statements);
        self.environment = previous;
        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.look_up(*id, &name.name, name.line),

            Expr::This { id, line } => self.look_up(*id, "this", *line),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(*id) {
                    Some(distance) => {
                        environment::assign_at(&self.environment, distance, &name.name, value.clone())?
                    }
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.name, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Unary {
                operator,
                line,
                right,
            } => {
                let right = self.evaluate(right)?;

                match operator {
                    UnaryOp::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::OperandMustBeNumber { line: *line }),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                line,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                evaluate_binary(*operator, &left, &right, *line)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(callee, values, *paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::NotAnInstance { line: name.line }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::NotAnInstance { line: name.line });
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
        }
    }

    /// Resolved references read from their frame; the rest are globals.
    fn look_up(&self, id: ExprId, name: &str, line: usize) -> IResult<Value> {
        match self.locals.get(id) {
            Some(distance) => environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name, line),
        }
    }

    /// Invoke `callee` after checking that it is callable, the argument count
    /// matches, and the call depth limit has room.
    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, line: usize) -> IResult<Value> {
        let callable = callee
            .as_callable()
            .ok_or(RuntimeError::NotCallable { line })?;

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arguments.len(),
                line,
            });
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow { line });
        }

        debug!("Calling {} with {} argument(s)", callable, arguments.len());

        self.call_depth += 1;
        let result = ensure_sufficient_stack(|| callable.call(self, arguments));
        self.call_depth -= 1;

        result
    }
}

fn evaluate_binary(operator: BinaryOp, left: &Value, right: &Value, line: usize) -> IResult<Value> {
    let value = match operator {
        BinaryOp::Equal => Value::Bool(left == right),
        BinaryOp::NotEqual => Value::Bool(left != right),

        BinaryOp::Less => Value::Bool(ordering(left, right, line)? == Some(Ordering::Less)),
        BinaryOp::LessEqual => Value::Bool(matches!(
            ordering(left, right, line)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Greater => Value::Bool(ordering(left, right, line)? == Some(Ordering::Greater)),
        BinaryOp::GreaterEqual => Value::Bool(matches!(
            ordering(left, right, line)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),

        // `+` is numeric only; strings are not concatenated.
        BinaryOp::Add => {
            let (a, b) = numbers(left, right, line)?;
            Value::Number(a + b)
        }
        BinaryOp::Subtract => {
            let (a, b) = numbers(left, right, line)?;
            Value::Number(a - b)
        }
        BinaryOp::Multiply => {
            let (a, b) = numbers(left, right, line)?;
            Value::Number(a * b)
        }
        BinaryOp::Divide => {
            let (a, b) = numbers(left, right, line)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            Value::Number(a / b)
        }
    };

    Ok(value)
}

fn numbers(left: &Value, right: &Value, line: usize) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::OperandsMustBeNumbers { line }),
    }
}

/// `None` means unordered (a NaN operand), which makes every comparison false.
fn ordering(left: &Value, right: &Value, line: usize) -> IResult<Option<Ordering>> {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            Ok(left.partial_cmp_with(right))
        }
        _ => Err(RuntimeError::OperandsMustBeComparable { line }),
    }
}
