//! The SQF [`Value`] tree.
//!
//! [`Value`] is a closed sum type: every coercion below is an exhaustive
//! match, and the only failure mode is an explicit [`CoercionError`].

use core::fmt;

use crate::error::CoercionError;

/// One SQF value.
///
/// Equality is structural. Doubles compare with `==`, so `NaN` is never
/// equal to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal that fits in 32 bits.
    Int32(i32),
    /// Integer literal that needs 64 bits (deployable unique ids).
    Int64(i64),
    /// Literal with a decimal point or exponent.
    Double(f64),
    /// Quoted string.
    String(String),
    /// Bracketed, comma-separated list of values.
    Array(Vec<Value>),
}

/// The variant of a [`Value`], used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int32`].
    Int32,
    /// [`Value::Int64`].
    Int64,
    /// [`Value::Double`].
    Double,
    /// [`Value::String`].
    String,
    /// [`Value::Array`].
    Array,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

impl Value {
    /// An empty array, the default for most array-typed columns.
    pub const fn empty_array() -> Self {
        Self::Array(Vec::new())
    }

    /// Build a string value.
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// The variant of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// Read any numeric variant as a double.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Result<f64, CoercionError> {
        match self {
            Self::Int32(n) => Ok(f64::from(*n)),
            Self::Int64(n) => Ok(*n as f64),
            Self::Double(d) => Ok(*d),
            Self::Bool(_) | Self::String(_) | Self::Array(_) => Err(CoercionError::Unsupported {
                expected: "number",
                found: self.kind(),
            }),
        }
    }

    /// Read a boolean.
    pub fn as_bool(&self) -> Result<bool, CoercionError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::String(_) | Self::Array(_) => {
                Err(CoercionError::Unsupported {
                    expected: "bool",
                    found: self.kind(),
                })
            }
        }
    }

    /// Borrow the contents of a string value.
    pub fn as_str(&self) -> Result<&str, CoercionError> {
        match self {
            Self::String(s) => Ok(s),
            Self::Bool(_) | Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::Array(_) => {
                Err(CoercionError::Unsupported {
                    expected: "string",
                    found: self.kind(),
                })
            }
        }
    }

    /// Borrow the elements of an array value.
    pub fn as_array(&self) -> Result<&[Self], CoercionError> {
        match self {
            Self::Array(items) => Ok(items),
            Self::Bool(_) | Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::String(_) => {
                Err(CoercionError::Unsupported {
                    expected: "array",
                    found: self.kind(),
                })
            }
        }
    }

    /// Mutably borrow the elements of an array value.
    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Self>, CoercionError> {
        let found = self.kind();
        match self {
            Self::Array(items) => Ok(items),
            Self::Bool(_) | Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::String(_) => {
                Err(CoercionError::Unsupported {
                    expected: "array",
                    found,
                })
            }
        }
    }

    /// Render any value as display text.
    ///
    /// Strings come out without quotes; everything else uses its SQF
    /// literal form. Used when a value has to become plain query text.
    pub fn as_coerced_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(_) | Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::Array(_) => {
                self.to_string()
            }
        }
    }

    /// Read a value as an integer for parameter binding.
    ///
    /// Integers pass through and strings are accepted when their whole
    /// text is an integer. Doubles are rejected even when integral, so
    /// `5.0` binds as text.
    pub fn as_bind_integer(&self) -> Result<i64, CoercionError> {
        match self {
            Self::Int32(n) => Ok(i64::from(*n)),
            Self::Int64(n) => Ok(*n),
            Self::String(s) => s.trim().parse::<i64>().ok().ok_or_else(|| {
                CoercionError::OutOfRange {
                    expected: "integer",
                    value: s.clone(),
                }
            }),
            Self::Bool(_) | Self::Double(_) | Self::Array(_) => Err(CoercionError::Unsupported {
                expected: "integer",
                found: self.kind(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Array(items)
    }
}

/// Stringify a value back to SQF text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int32(n) => write!(f, "{n}"),
            Self::Int64(n) => write!(f, "{n}"),
            // Debug keeps a `.` or exponent on every finite double, so the
            // text parses back as a double rather than an integer.
            Self::Double(d) if d.is_finite() => write!(f, "{d:?}"),
            Self::Double(_) => f.write_str("0.0"),
            Self::String(s) => {
                f.write_str("\"")?;
                for part in s.split_inclusive('"') {
                    f.write_str(part)?;
                    if part.ends_with('"') {
                        f.write_str("\"")?;
                    }
                }
                f.write_str("\"")
            }
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
