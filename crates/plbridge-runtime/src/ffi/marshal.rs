//! Type marshaling - host `Value` ↔ C representation
//!
//! Provides bidirectional marshaling between host values and C values:
//! - `MarshalContext::to_c()`: convert a value to a declared descriptor
//! - `MarshalContext::to_c_default()`: convert using the value's default convention
//! - `MarshalContext::from_c()`: convert a C return value back
//!
//! # Memory Safety
//!
//! - Every C string and buffer handed to foreign code is owned by the
//!   `MarshalContext` and freed when it drops, after the call returns
//! - Null pointer checks for returned C strings
//! - Range validation for integer conversions

use crate::ffi::types::{ScalarKind, TypeDescriptor, WChar};
use crate::value::Value;
use libffi::middle::{arg, Arg};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use thiserror::Error;

/// Marshal error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    /// Value kind cannot be converted to the target descriptor
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    /// String contains a NUL byte where a C string is required
    #[error("Invalid string: {0}")]
    InvalidString(String),
    /// Integer out of range for the target C type
    #[error("Number {value} out of range for {target}")]
    NumberOutOfRange { value: i128, target: String },
}

/// C value representation for the FFI boundary
///
/// Runtime representation of C values during a call. Pointer variants point
/// into buffers owned by the `MarshalContext` that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CType {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Ptr(*mut c_void),
}

impl CType {
    /// libffi argument referencing this value
    pub fn as_arg(&self) -> Arg {
        match self {
            CType::I8(v) => arg(v),
            CType::U8(v) => arg(v),
            CType::I16(v) => arg(v),
            CType::U16(v) => arg(v),
            CType::I32(v) => arg(v),
            CType::U32(v) => arg(v),
            CType::I64(v) => arg(v),
            CType::U64(v) => arg(v),
            CType::F32(v) => arg(v),
            CType::F64(v) => arg(v),
            CType::Ptr(v) => arg(v),
        }
    }
}

/// Encode text as a NUL-terminated platform wide string
pub fn encode_wide(text: &str) -> Vec<WChar> {
    #[cfg(windows)]
    let mut buf: Vec<WChar> = text.encode_utf16().collect();
    #[cfg(not(windows))]
    let mut buf: Vec<WChar> = text.chars().map(|c| c as WChar).collect();
    buf.push(0);
    buf
}

/// Decode a NUL-terminated platform wide string
///
/// # Safety
///
/// `ptr` must be non-null and point to a NUL-terminated `wchar_t` sequence.
unsafe fn decode_wide(ptr: *const WChar) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);

    #[cfg(windows)]
    {
        String::from_utf16_lossy(units)
    }
    #[cfg(not(windows))]
    {
        units
            .iter()
            .map(|&u| char::from_u32(u as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// Marshal context for one foreign call
///
/// Tracks allocated C strings and buffers for proper cleanup.
///
/// # Example
///
/// ```
/// # use plbridge_runtime::ffi::{MarshalContext, TypeDescriptor, ScalarKind, CType};
/// # use plbridge_runtime::Value;
/// let mut ctx = MarshalContext::new();
///
/// let c_value = ctx
///     .to_c(&Value::Int(42), &TypeDescriptor::Scalar(ScalarKind::I32))
///     .unwrap();
/// assert_eq!(c_value, CType::I32(42));
///
/// let back = ctx
///     .from_c(&c_value, &TypeDescriptor::Scalar(ScalarKind::I32))
///     .unwrap();
/// assert_eq!(back, Value::Int(42));
/// ```
pub struct MarshalContext {
    allocated_strings: Vec<CString>,
    byte_buffers: Vec<Vec<u8>>,
    wide_buffers: Vec<Vec<WChar>>,
}

impl MarshalContext {
    /// Create a new marshal context
    pub fn new() -> Self {
        Self {
            allocated_strings: Vec::new(),
            byte_buffers: Vec::new(),
            wide_buffers: Vec::new(),
        }
    }

    /// Descriptor used for a value when no argument types are declared
    pub fn default_descriptor(value: &Value) -> TypeDescriptor {
        match value {
            Value::Int(_) => TypeDescriptor::Scalar(ScalarKind::I32),
            Value::UInt(_) => TypeDescriptor::word(),
            Value::Float(_) => TypeDescriptor::Scalar(ScalarKind::F64),
            Value::Str(_) | Value::Bytes(_) => TypeDescriptor::CharPtr,
            Value::WStr(_) => TypeDescriptor::WideCharPtr,
            Value::Ptr(_) | Value::Null => TypeDescriptor::Pointer,
        }
    }

    /// Marshal a value using its default convention
    pub fn to_c_default(&mut self, value: &Value) -> Result<(TypeDescriptor, CType), MarshalError> {
        let desc = Self::default_descriptor(value);
        let c_value = self.to_c(value, &desc)?;
        Ok((desc, c_value))
    }

    /// Marshal a value to the declared descriptor
    pub fn to_c(&mut self, value: &Value, target: &TypeDescriptor) -> Result<CType, MarshalError> {
        match target {
            TypeDescriptor::Scalar(kind) => self.scalar_to_c(value, *kind, target),
            TypeDescriptor::Pointer => match value {
                Value::Ptr(p) => Ok(CType::Ptr(*p)),
                Value::Null => Ok(CType::Ptr(std::ptr::null_mut())),
                Value::Int(_) | Value::UInt(_) => {
                    let n = value.as_i128().unwrap_or_default();
                    let addr = usize::try_from(n).map_err(|_| MarshalError::NumberOutOfRange {
                        value: n,
                        target: target.to_string(),
                    })?;
                    Ok(CType::Ptr(addr as *mut c_void))
                }
                Value::Str(_) | Value::Bytes(_) => self.to_c(value, &TypeDescriptor::CharPtr),
                _ => Err(mismatch(target, value)),
            },
            TypeDescriptor::CharPtr => match value {
                Value::Str(s) => {
                    let c_string = CString::new(s.as_str()).map_err(|e| {
                        MarshalError::InvalidString(format!("String contains null byte: {}", e))
                    })?;
                    let ptr = c_string.as_ptr() as *mut c_void;
                    self.allocated_strings.push(c_string);
                    Ok(CType::Ptr(ptr))
                }
                Value::Bytes(bytes) => {
                    // length-delimited data: interior NULs are fine, the
                    // trailing one only guards readers that stop at NUL
                    let mut buf = Vec::with_capacity(bytes.len() + 1);
                    buf.extend_from_slice(bytes);
                    buf.push(0);
                    let ptr = buf.as_mut_ptr() as *mut c_void;
                    self.byte_buffers.push(buf);
                    Ok(CType::Ptr(ptr))
                }
                Value::Ptr(p) => Ok(CType::Ptr(*p)),
                Value::Null => Ok(CType::Ptr(std::ptr::null_mut())),
                _ => Err(mismatch(target, value)),
            },
            TypeDescriptor::WideCharPtr => match value {
                Value::WStr(s) | Value::Str(s) => {
                    let mut buf = encode_wide(s);
                    let ptr = buf.as_mut_ptr() as *mut c_void;
                    self.wide_buffers.push(buf);
                    Ok(CType::Ptr(ptr))
                }
                Value::Ptr(p) => Ok(CType::Ptr(*p)),
                Value::Null => Ok(CType::Ptr(std::ptr::null_mut())),
                _ => Err(mismatch(target, value)),
            },
            TypeDescriptor::PointerTo(_) => match value {
                Value::Ptr(p) => Ok(CType::Ptr(*p)),
                Value::Null => Ok(CType::Ptr(std::ptr::null_mut())),
                _ => Err(mismatch(target, value)),
            },
        }
    }

    fn scalar_to_c(
        &mut self,
        value: &Value,
        kind: ScalarKind,
        target: &TypeDescriptor,
    ) -> Result<CType, MarshalError> {
        if let Value::Float(f) = value {
            return match kind {
                ScalarKind::F32 => Ok(CType::F32(*f as f32)),
                ScalarKind::F64 => Ok(CType::F64(*f)),
                _ => Err(mismatch(target, value)),
            };
        }

        let n = value.as_i128().ok_or_else(|| mismatch(target, value))?;
        let (lo, hi) = kind.int_range();
        if n < lo || n > hi {
            return Err(MarshalError::NumberOutOfRange {
                value: n,
                target: target.to_string(),
            });
        }

        Ok(match kind {
            ScalarKind::I8 => CType::I8(n as i8),
            ScalarKind::U8 => CType::U8(n as u8),
            ScalarKind::I16 => CType::I16(n as i16),
            ScalarKind::U16 => CType::U16(n as u16),
            ScalarKind::I32 => CType::I32(n as i32),
            ScalarKind::U32 => CType::U32(n as u32),
            ScalarKind::I64 => CType::I64(n as i64),
            ScalarKind::U64 => CType::U64(n as u64),
            ScalarKind::F32 => CType::F32(n as f32),
            ScalarKind::F64 => CType::F64(n as f64),
        })
    }

    /// Marshal a C return value back to a host value
    ///
    /// # Safety
    ///
    /// For `CharPtr` and `WideCharPtr` descriptors a non-null pointer must
    /// reference a NUL-terminated string that stays valid during this call.
    pub fn from_c(&self, c_value: &CType, target: &TypeDescriptor) -> Result<Value, MarshalError> {
        match (c_value, target) {
            (CType::Ptr(p), TypeDescriptor::CharPtr) => {
                if p.is_null() {
                    return Ok(Value::Null);
                }
                let bytes = unsafe { CStr::from_ptr(*p as *const c_char) }.to_bytes();
                Ok(match std::str::from_utf8(bytes) {
                    Ok(s) => Value::Str(s.to_string()),
                    Err(_) => Value::Bytes(bytes.to_vec()),
                })
            }
            (CType::Ptr(p), TypeDescriptor::WideCharPtr) => {
                if p.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::WStr(unsafe { decode_wide(*p as *const WChar) }))
            }
            (CType::Ptr(p), TypeDescriptor::Pointer | TypeDescriptor::PointerTo(_)) => {
                if p.is_null() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Ptr(*p))
                }
            }
            (CType::I8(v), _) => Ok(Value::Int(*v as i64)),
            (CType::I16(v), _) => Ok(Value::Int(*v as i64)),
            (CType::I32(v), _) => Ok(Value::Int(*v as i64)),
            (CType::I64(v), _) => Ok(Value::Int(*v)),
            (CType::U8(v), _) => Ok(Value::UInt(*v as u64)),
            (CType::U16(v), _) => Ok(Value::UInt(*v as u64)),
            (CType::U32(v), _) => Ok(Value::UInt(*v as u64)),
            (CType::U64(v), _) => Ok(Value::UInt(*v)),
            (CType::F32(v), _) => Ok(Value::Float(*v as f64)),
            (CType::F64(v), _) => Ok(Value::Float(*v)),
            (CType::Ptr(p), TypeDescriptor::Scalar(_)) => Ok(Value::UInt(*p as usize as u64)),
        }
    }

    /// Number of buffers currently kept alive
    pub fn allocations(&self) -> usize {
        self.allocated_strings.len() + self.byte_buffers.len() + self.wide_buffers.len()
    }
}

fn mismatch(target: &TypeDescriptor, value: &Value) -> MarshalError {
    MarshalError::TypeMismatch {
        expected: target.to_string(),
        got: value.type_name().to_string(),
    }
}

impl Default for MarshalContext {
    fn default() -> Self {
        Self::new()
    }
}
