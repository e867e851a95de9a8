use std::rc::Rc;

use log::debug;

use crate::callable::NativeFunction;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Functions every program starts with in its global scope.
pub fn define_globals(globals: &mut Environment) {
    for native in [NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }] {
        debug!("Defining native function '{}'", native.name);
        globals.define(native.name, Value::Native(Rc::new(native)));
    }
}

/// Seconds since the interpreter was created, from a monotonic clock.
fn clock(interpreter: &Interpreter, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(interpreter.uptime().as_secs_f64()))
}
