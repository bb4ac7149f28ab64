//! Values crossing the proxy boundary.

use std::fmt;
use std::sync::Arc;

use crate::foreign::ForeignObject;

/// Shared handle to a foreign object.
///
/// The foreign runtime owns the object; dropping the handle only releases
/// this side's reference.
pub type ForeignRef = Arc<dyn ForeignObject>;

/// A value read from or passed to the foreign runtime.
#[derive(Clone, Default)]
pub enum ForeignValue {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// Sequence.
    List(Vec<ForeignValue>),
    /// Reference to another foreign object.
    Object(ForeignRef),
}

impl ForeignValue {
    /// Short name of the value's kind, for signature errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// The integer, if this is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The object reference, if this is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&ForeignRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Whether this is [`ForeignValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Object(o) => write!(f, "Object({})", o.type_name()),
        }
    }
}

/// Objects compare by identity.
impl PartialEq for ForeignValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for ForeignValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ForeignValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ForeignValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ForeignValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ForeignValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<ForeignRef> for ForeignValue {
    fn from(v: ForeignRef) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<ForeignValue>> From<Vec<T>> for ForeignValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}
