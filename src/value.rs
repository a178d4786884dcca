//! Runtime values.

use chrono::NaiveDateTime;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value owned by the host (an entity, a player, a block, ...).
///
/// The core never looks inside host objects. It only needs the name of the
/// semantic type the object belongs to (so placeholders and coercions can
/// check it) and a display form for text conversion.
pub trait HostObject: fmt::Debug + Send + Sync + 'static {
    /// Singular name of the registered semantic type, e.g. `"player"`.
    fn type_name(&self) -> &str;

    fn display(&self) -> String;

    fn as_any(&self) -> &dyn Any;

    /// Host-defined identity. Defaults to pointer identity in [`Value`]'s `PartialEq`.
    fn same_as(&self, _other: &dyn HostObject) -> bool {
        false
    }
}

/// A single runtime value. Cloning is cheap.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Text(Arc<str>),
    Boolean(bool),
    Date(NaiveDateTime),
    Object(Arc<dyn HostObject>),
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(s.as_ref()))
    }

    pub fn object(obj: impl HostObject) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Singular name of the semantic type this value belongs to.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Object(obj) => obj.type_name(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Downcast a host object to its concrete type.
    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a - b).abs() < f64::EPSILON || a == b,
            (Value::Text(a), Value::Text(b)) => a.eq_ignore_ascii_case(b),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a.same_as(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // whole numbers print without a decimal point
                if n.fract() == 0.0 && n.abs() < 1e15 { write!(f, "{}", *n as i64) } else { write!(f, "{}", n) }
            }
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Object(obj) => f.write_str(&obj.display()),
        }
    }
}
