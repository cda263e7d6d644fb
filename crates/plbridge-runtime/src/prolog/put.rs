//! Values accepted by [`Term::put`](crate::prolog::Term::put)

use crate::error::PlError;
use crate::ffi::ScalarKind;
use crate::prolog::atom::Atom;
use crate::prolog::functor::Functor;
use crate::value::Value;
use std::borrow::Cow;

/// Everything a term can be set to in one call
///
/// | variant       | runtime call           |
/// |---------------|------------------------|
/// | `Atom`        | `PL_put_atom`          |
/// | `Text`        | `PL_put_string_chars`  |
/// | `Buffer`      | `PL_put_string_nchars` |
/// | `Integer`     | `PL_put_integer`       |
/// | `WideInteger` | `PL_put_int64`         |
/// | `Float`       | `PL_put_float`         |
/// | `Functor`     | `PL_put_functor`       |
/// | `Chars`       | `PL_put_list_chars` of the concatenation |
/// | `Nil`         | `PL_put_nil`           |
/// | `List`        | `PL_put_list`          |
/// | `Variable`    | `PL_put_variable`      |
#[derive(Debug, Clone)]
pub enum PutValue<'a> {
    Atom(Atom<'a>),
    Text(Cow<'a, str>),
    Buffer(Cow<'a, [u8]>),
    /// Fits a C `long`
    Integer(i64),
    WideInteger(i64),
    Float(f64),
    Functor(Functor<'a>),
    Chars(Vec<String>),
    Nil,
    List,
    Variable,
}

impl PutValue<'_> {
    /// Integer variant for `value`: `Integer` when it fits a C `long`
    pub fn integer(value: i64) -> Self {
        let (min, max) = ScalarKind::c_long().int_range();
        if (min..=max).contains(&(value as i128)) {
            PutValue::Integer(value)
        } else {
            PutValue::WideInteger(value)
        }
    }

    /// Sequence of text pieces; empty sequences are `Nil`
    pub fn chars<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pieces: Vec<String> = pieces.into_iter().map(Into::into).collect();
        if pieces.is_empty() {
            PutValue::Nil
        } else {
            PutValue::Chars(pieces)
        }
    }
}

impl<'a> From<Atom<'a>> for PutValue<'a> {
    fn from(atom: Atom<'a>) -> Self {
        PutValue::Atom(atom)
    }
}

impl<'a> From<&Functor<'a>> for PutValue<'a> {
    fn from(functor: &Functor<'a>) -> Self {
        PutValue::Functor(functor.clone())
    }
}

impl<'a> From<&'a str> for PutValue<'a> {
    fn from(text: &'a str) -> Self {
        PutValue::Text(Cow::Borrowed(text))
    }
}

impl From<String> for PutValue<'_> {
    fn from(text: String) -> Self {
        PutValue::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a [u8]> for PutValue<'a> {
    fn from(buffer: &'a [u8]) -> Self {
        PutValue::Buffer(Cow::Borrowed(buffer))
    }
}

impl From<i32> for PutValue<'_> {
    fn from(value: i32) -> Self {
        PutValue::Integer(value as i64)
    }
}

impl From<i64> for PutValue<'_> {
    fn from(value: i64) -> Self {
        PutValue::integer(value)
    }
}

impl From<f64> for PutValue<'_> {
    fn from(value: f64) -> Self {
        PutValue::Float(value)
    }
}

impl From<&[&str]> for PutValue<'_> {
    fn from(pieces: &[&str]) -> Self {
        PutValue::chars(pieces.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for PutValue<'_> {
    fn from(pieces: [&str; N]) -> Self {
        PutValue::chars(pieces)
    }
}

impl From<Vec<String>> for PutValue<'_> {
    fn from(pieces: Vec<String>) -> Self {
        PutValue::chars(pieces)
    }
}

impl<'a, T: Into<PutValue<'a>>> From<Option<T>> for PutValue<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(PutValue::Variable, Into::into)
    }
}

impl TryFrom<Value> for PutValue<'_> {
    type Error = PlError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) => Ok(PutValue::integer(i)),
            Value::UInt(u) => i64::try_from(u).map(PutValue::integer).map_err(|_| {
                PlError::ValueError(format!("{} does not fit a 64-bit signed integer", u))
            }),
            Value::Float(f) => Ok(PutValue::Float(f)),
            Value::Str(s) | Value::WStr(s) => Ok(PutValue::Text(Cow::Owned(s))),
            Value::Bytes(b) => Ok(PutValue::Buffer(Cow::Owned(b))),
            Value::Null => Ok(PutValue::Variable),
            Value::Ptr(_) => Err(PlError::TypeError(
                "a raw pointer has no term representation".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_width_selection() {
        assert!(matches!(PutValue::from(7i64), PutValue::Integer(7)));
        if ScalarKind::c_long() == ScalarKind::I32 {
            assert!(matches!(
                PutValue::from(1i64 << 40),
                PutValue::WideInteger(_)
            ));
        }
    }

    #[test]
    fn test_empty_sequence_is_nil() {
        let empty: [&str; 0] = [];
        assert!(matches!(PutValue::from(empty), PutValue::Nil));
        assert!(matches!(PutValue::from(Vec::<String>::new()), PutValue::Nil));
        assert!(matches!(PutValue::from(["a", "bc"]), PutValue::Chars(ref p) if p.len() == 2));
    }

    #[test]
    fn test_none_is_variable() {
        assert!(matches!(PutValue::from(None::<i64>), PutValue::Variable));
        assert!(matches!(PutValue::from(Some(1.5)), PutValue::Float(_)));
    }

    #[test]
    fn test_from_value() {
        assert!(matches!(
            PutValue::try_from(Value::Str("x".into())),
            Ok(PutValue::Text(_))
        ));
        assert!(matches!(
            PutValue::try_from(Value::Ptr(std::ptr::null_mut())),
            Err(PlError::TypeError(_))
        ));
        assert!(matches!(
            PutValue::try_from(Value::UInt(u64::MAX)),
            Err(PlError::ValueError(_))
        ));
    }
}
