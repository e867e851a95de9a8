use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame. Closures and active calls hold these; a
/// frame lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shareable frame.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }

    /// Bind `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Lookup through the whole chain; used for unresolved (global) names.
    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }
}

/// The frame exactly `distance` parent links above `env`.
pub fn ancestor(env: &EnvRef, distance: usize) -> Result<EnvRef, RuntimeError> {
    let mut frame = Rc::clone(env);

    for hop in 0..distance {
        let parent = frame.borrow().enclosing.clone();
        frame = parent.ok_or_else(|| RuntimeError::Unresolved {
            name: format!("<frame {}>", hop + 1),
            distance,
        })?;
    }

    Ok(frame)
}

/// Read `name` from the frame at `distance`; the resolver guarantees it is
/// there, so absence is an internal error.
pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Result<Value, RuntimeError> {
    ancestor(env, distance)?
        .borrow()
        .values
        .get(name)
        .cloned()
        .ok_or_else(|| RuntimeError::Unresolved {
            name: name.to_string(),
            distance,
        })
}

pub fn assign_at(
    env: &EnvRef,
    distance: usize,
    name: &str,
    value: Value,
) -> Result<(), RuntimeError> {
    let frame = ancestor(env, distance)?;
    let mut frame = frame.borrow_mut();

    match frame.values.get_mut(name) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RuntimeError::Unresolved {
            name: name.to_string(),
            distance,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            other => panic!("expected number, got {}", other),
        }
    }

    #[test]
    fn get_walks_outward_and_reports_missing_names() {
        let globals = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(globals.clone()).into_ref();

        assert_eq!(number(&inner.borrow().get("a", 1).unwrap()), 1.0);

        let err = inner.borrow().get("missing", 7).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UndefinedVariable { ref name, line: 7 } if name == "missing"
        ));
    }

    #[test]
    fn assign_updates_the_defining_frame() {
        let globals = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(globals.clone()).into_ref();

        inner.borrow_mut().assign("a", Value::Number(2.0), 1).unwrap();

        assert_eq!(number(&globals.borrow().get("a", 1).unwrap()), 2.0);
        assert!(inner.borrow_mut().assign("b", Value::Nil, 1).is_err());
    }

    #[test]
    fn distance_access_skips_shadowing_frames() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(outer.clone()).into_ref();
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(number(&get_at(&inner, 0, "x").unwrap()), 2.0);
        assert_eq!(number(&get_at(&inner, 1, "x").unwrap()), 1.0);

        assign_at(&inner, 1, "x", Value::Number(3.0)).unwrap();
        assert_eq!(number(&outer.borrow().get("x", 1).unwrap()), 3.0);
        assert_eq!(number(&get_at(&inner, 0, "x").unwrap()), 2.0);
    }

    #[test]
    fn distance_access_does_not_fall_back_to_other_frames() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(outer).into_ref();

        let err = get_at(&inner, 0, "x").unwrap_err();
        assert!(matches!(err, RuntimeError::Unresolved { distance: 0, .. }));

        let err = get_at(&inner, 5, "x").unwrap_err();
        assert!(matches!(err, RuntimeError::Unresolved { distance: 5, .. }));
    }
}
