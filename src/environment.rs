use crate::error::{QuillError, Span};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A lexical frame: name → value bindings, the subset of names declared
/// constant, and the enclosing frame. Frames are reference-counted so a
/// function value can keep its declaration environment alive across calls.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    constants: HashSet<String>,
    parent: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            constants: HashSet::new(),
            parent: Some(parent),
        }
    }

    /// Infallible insert used to seed the global frame with built-ins.
    pub fn define(&mut self, name: &str, value: Value, constant: bool) {
        if constant {
            self.constants.insert(name.to_string());
        }
        self.values.insert(name.to_string(), value);
    }

    pub fn declare(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
        span: Span,
    ) -> Result<(), QuillError> {
        if self.constants.contains(name) {
            return Err(QuillError::name_error(
                span,
                format!("Cannot shadow constant variable '{}'.", name),
            ));
        }
        if constant {
            self.constants.insert(name.to_string());
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn assign(&mut self, name: &str, value: Value, span: Span) -> Result<(), QuillError> {
        if self.values.contains_key(name) {
            if self.constants.contains(name) {
                return Err(QuillError::name_error(
                    span,
                    format!("Cannot assign to constant '{}'.", name),
                ));
            }
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value, span)
        } else {
            Err(QuillError::name_error(
                span,
                format!("Variable '{}' does not exist in the given scope.", name),
            ))
        }
    }

    pub fn delete(&mut self, name: &str, span: Span) -> Result<(), QuillError> {
        if self.values.contains_key(name) {
            if self.constants.contains(name) {
                return Err(QuillError::name_error(
                    span,
                    format!("Cannot delete constant '{}'.", name),
                ));
            }
            self.values.remove(name);
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().delete(name, span)
        } else {
            Err(QuillError::name_error(
                span,
                format!(
                    "Cannot delete variable '{}' as it does not exist in the given scope.",
                    name
                ),
            ))
        }
    }

    /// Reads return a deep copy: values are value-typed in the language.
    pub fn get(&self, name: &str, span: Span) -> Result<Value, QuillError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name, span)
        } else {
            Err(QuillError::name_error(
                span,
                format!("Variable '{}' does not exist in the given scope.", name),
            ))
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        if self.values.contains_key(name) {
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow().exists(name)
        } else {
            false
        }
    }
}
