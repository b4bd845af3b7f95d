use crate::ast::Stmt;
use crate::environment::Environment;
use crate::error::{QuillError, Span};
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

pub type NativeHandler =
    fn(Vec<Value>, &Rc<RefCell<Environment>>, Span) -> Result<Value, QuillError>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Char(u8),
    Str(String),
    NativeFn {
        name: &'static str,
        handler: NativeHandler,
    },
    Function(Rc<Function>),
}

/// A user-defined function. The body and the captured environment are
/// shared, not owned: the environment a function closes over must outlive
/// every call, and calls observe mutations made to it after declaration.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Evaluated defaults for the trailing parameters.
    pub param_defaults: Vec<Value>,
    pub return_name: Option<String>,
    pub return_default: Value,
    pub env: Rc<RefCell<Environment>>,
    pub body: Rc<Stmt>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::Char(_) => "Character",
            Value::Str(_) => "String",
            Value::NativeFn { .. } => "NativeFunction",
            Value::Function(_) => "Function",
        }
    }

    pub fn same_variant(&self, other: &Value) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    pub fn as_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(value) => (if *value { "true" } else { "false" }).to_string(),
            Value::Number(value) => format_number(*value),
            Value::Char(value) => (*value as char).to_string(),
            Value::Str(value) => value.clone(),
            Value::NativeFn { name, .. } => name.to_string(),
            Value::Function(function) => function.name.clone(),
        }
    }

    pub fn as_number(&self, span: Span) -> Result<f64, QuillError> {
        match self {
            Value::Null => Ok(0.0),
            Value::Bool(value) => Ok(if *value { 1.0 } else { 0.0 }),
            Value::Number(value) => Ok(*value),
            Value::Char(value) => Ok(*value as f64),
            Value::Str(value) => match value.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(number),
                _ => Err(QuillError::math_error(
                    span,
                    format!(
                        "Could not convert string '{}' to a number. \
                         Number might be too large, too small, or invalid.",
                        value
                    ),
                )),
            },
            _ => Err(QuillError::type_error(
                span,
                format!("Cannot convert '{}' to 'Number'.", self.type_name()),
            )),
        }
    }

    pub fn as_char(&self, span: Span) -> Result<u8, QuillError> {
        match self {
            Value::Null => Ok(0),
            Value::Bool(value) => Ok(*value as u8),
            Value::Number(value) => Ok(*value as u8),
            Value::Char(value) => Ok(*value),
            Value::Str(value) => {
                if value.len() > 1 {
                    return Err(QuillError::type_error(
                        span,
                        format!(
                            "Could not convert string '{}' to a character as it has too many characters.",
                            value
                        ),
                    ));
                }
                Ok(value.bytes().next().unwrap_or(0))
            }
            _ => Err(QuillError::type_error(
                span,
                format!("Cannot convert '{}' to 'Character'.", self.type_name()),
            )),
        }
    }

    pub fn as_bool(&self, span: Span) -> Result<bool, QuillError> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(value) => Ok(*value),
            Value::Number(value) => Ok(*value != 0.0),
            Value::Char(value) => Ok(*value != 0),
            Value::Str(value) => Ok(!value.is_empty()),
            _ => Err(QuillError::type_error(
                span,
                format!("Cannot convert '{}' to 'Boolean'.", self.type_name()),
            )),
        }
    }

    pub fn negate(&self, span: Span) -> Result<Value, QuillError> {
        match self {
            Value::Number(value) => Ok(Value::Number(-value)),
            Value::Char(value) => Ok(Value::Char(value.wrapping_neg())),
            Value::Null => Ok(Value::Null),
            _ => Err(QuillError::type_error(
                span,
                format!("Invalid unary operation: - '{}'.", self.type_name()),
            )),
        }
    }

    pub fn increment(&self, span: Span) -> Result<Value, QuillError> {
        match self {
            Value::Number(value) => Ok(Value::Number(value + 1.0)),
            Value::Char(value) => Ok(Value::Char(value.wrapping_add(1))),
            Value::Null => Ok(Value::Null),
            _ => Err(QuillError::type_error(
                span,
                format!("Invalid unary operation: '{}' ++.", self.type_name()),
            )),
        }
    }

    pub fn decrement(&self, span: Span) -> Result<Value, QuillError> {
        match self {
            Value::Number(value) => Ok(Value::Number(value - 1.0)),
            Value::Char(value) => Ok(Value::Char(value.wrapping_sub(1))),
            Value::Null => Ok(Value::Null),
            _ => Err(QuillError::type_error(
                span,
                format!("Invalid unary operation: '{}' --.", self.type_name()),
            )),
        }
    }

    pub fn add(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if self.is_string() || other.is_string() {
            return Ok(Value::Str(self.as_string() + &other.as_string()));
        }
        let result = self.as_number(span)? + other.as_number(span)?;
        Ok(self.with_numeric(result))
    }

    pub fn subtract(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if self.is_string() || other.is_string() {
            return Err(self.binary_error(other, "-", span));
        }
        let result = self.as_number(span)? - other.as_number(span)?;
        Ok(self.with_numeric(result))
    }

    pub fn multiply(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        // A string times a scalar repeats the string.
        match (self, other) {
            (Value::Str(text), Value::Number(_) | Value::Char(_) | Value::Bool(_)) => {
                let count = other.as_number(span)?.abs() as usize;
                return Ok(Value::Str(text.repeat(count)));
            }
            (Value::Number(_) | Value::Char(_) | Value::Bool(_), Value::Str(text)) => {
                let count = self.as_number(span)?.abs() as usize;
                return Ok(Value::Str(text.repeat(count)));
            }
            _ => {}
        }
        if self.is_string() || other.is_string() {
            return Err(self.binary_error(other, "*", span));
        }
        let result = self.as_number(span)? * other.as_number(span)?;
        Ok(self.with_numeric(result))
    }

    pub fn divide(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if self.is_string() || other.is_string() {
            return Err(self.binary_error(other, "/", span));
        }
        let divisor = other.as_number(span)?;
        if divisor == 0.0 {
            return Err(QuillError::math_error(
                span,
                format!("Division by zero error: {} / 0.", self.as_string()),
            ));
        }
        let result = self.as_number(span)? / divisor;
        Ok(self.with_numeric(result))
    }

    pub fn remainder(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if self.is_string() || other.is_string() {
            return Err(self.binary_error(other, "%", span));
        }
        let divisor = other.as_number(span)?;
        if divisor == 0.0 {
            return Err(QuillError::math_error(
                span,
                format!("Division by zero error: {} % 0.", self.as_string()),
            ));
        }
        let result = ieee_remainder(self.as_number(span)?, divisor);
        Ok(self.with_numeric(result))
    }

    pub fn exponentiate(&self, other: &Value, span: Span) -> Result<Value, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if self.is_string() || other.is_string() {
            return Err(self.binary_error(other, "**", span));
        }
        let result = self.as_number(span)?.powf(other.as_number(span)?);
        Ok(self.with_numeric(result))
    }

    pub fn equal(&self, other: &Value, span: Span) -> Result<bool, QuillError> {
        if self.is_null() || other.is_null() {
            return Ok(self.is_null() && other.is_null());
        }
        if matches!(self, Value::Bool(_)) || matches!(other, Value::Bool(_)) {
            return Ok(self.as_bool(span)? == other.as_bool(span)?);
        }
        if self.is_string() || other.is_string() {
            return Ok(self.as_string() == other.as_string());
        }
        Ok(self.as_number(span)? == other.as_number(span)?)
    }

    pub fn greater(&self, other: &Value, op: &str, span: Span) -> Result<bool, QuillError> {
        if self.is_null() || other.is_null() {
            return Err(self.binary_error(other, op, span));
        }
        if self.is_string() || other.is_string() {
            // Case-insensitive comparison over the common prefix; a tie
            // resolves as not-greater.
            let left = self.as_string();
            let right = other.as_string();
            for (l, r) in left.bytes().zip(right.bytes()) {
                let (l, r) = (l.to_ascii_lowercase(), r.to_ascii_lowercase());
                if l != r {
                    return Ok(l > r);
                }
            }
            return Ok(false);
        }
        Ok(self.as_number(span)? > other.as_number(span)?)
    }

    fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Arithmetic keeps the variant of the left operand.
    fn with_numeric(&self, result: f64) -> Value {
        match self {
            Value::Char(_) => Value::Char(result as u8),
            Value::Bool(_) => Value::Bool(result != 0.0),
            _ => Value::Number(result),
        }
    }

    fn binary_error(&self, other: &Value, op: &str, span: Span) -> QuillError {
        QuillError::type_error(
            span,
            format!(
                "Invalid binary operation: '{}' {} '{}'.",
                self.type_name(),
                op,
                other.type_name()
            ),
        )
    }
}

/// IEEE 754 remainder: the quotient rounds to the nearest integer, ties to
/// even, unlike the truncating `%`.
fn ieee_remainder(a: f64, b: f64) -> f64 {
    let mut r = a % b;
    let tie = 2.0 * r.abs() == b.abs();
    if 2.0 * r.abs() > b.abs() || (tie && ((a / b).trunc() as i64) % 2 != 0) {
        r -= b.abs().copysign(r);
    }
    r
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(value) => write!(f, "Bool({})", value),
            Value::Number(value) => write!(f, "Number({})", value),
            Value::Char(value) => write!(f, "Char({:?})", *value as char),
            Value::Str(value) => write!(f, "Str({:?})", value),
            Value::NativeFn { name, .. } => write!(f, "NativeFn({})", name),
            Value::Function(function) => write!(f, "Function({})", function.name),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for scalars; functions compare by identity.
    /// Language-level equality (with coercions) lives in [`Value::equal`].
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Char(l), Value::Char(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::NativeFn { name: l, .. }, Value::NativeFn { name: r, .. }) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}
