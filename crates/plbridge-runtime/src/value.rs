//! Host-side values crossing the FFI boundary

use std::ffi::c_void;
use std::fmt;

/// A value passed to, or returned from, a foreign symbol
///
/// Without a declared type each variant has a default C representation:
/// `Int` → `int`, `UInt` → pointer-sized unsigned, `Float` → `double`,
/// `Str`/`Bytes` → `char*`, `WStr` → `wchar_t*`, `Ptr`/`Null` → `void*`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Unsigned integer (engine handles travel as this)
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Text passed or returned as a NUL-terminated narrow string
    Str(String),
    /// Raw bytes passed as `char*`; may contain interior NULs
    Bytes(Vec<u8>),
    /// Text passed or returned as a NUL-terminated wide string
    WStr(String),
    /// Raw pointer
    Ptr(*mut c_void),
    /// Null pointer / no value
    Null,
}

impl Value {
    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::WStr(_) => "wstr",
            Value::Ptr(_) => "pointer",
            Value::Null => "null",
        }
    }

    /// Integer view of the value, if it has one
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i as i128),
            Value::UInt(u) => Some(*u as i128),
            _ => None,
        }
    }

    /// Interpret the value as a C truth value
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            Value::Ptr(p) => !p.is_null(),
            Value::Null => false,
            Value::Str(s) | Value::WStr(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
        }
    }

    /// Engine handle view (`term_t`, `atom_t`, ...)
    pub fn as_word(&self) -> Option<usize> {
        match self {
            Value::UInt(u) => usize::try_from(*u).ok(),
            Value::Int(i) => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Text view of `Str`, `WStr` and UTF-8 `Bytes`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::WStr(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) | Value::WStr(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::Ptr(p) => write!(f, "{:p}", p),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T> From<*mut T> for Value {
    fn from(p: *mut T) -> Self {
        Value::Ptr(p.cast())
    }
}
