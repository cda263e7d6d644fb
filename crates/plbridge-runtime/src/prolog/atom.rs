//! Interned atoms

use crate::error::{PlError, PlResult};
use crate::ffi::encode_wide;
use crate::prolog::api::{word, PlApi};
use crate::value::Value;
use std::ffi::c_void;
use std::fmt;

/// Handle to an interned runtime atom
///
/// Atoms are owned by the runtime; the handle only borrows the API it was
/// created through.
#[derive(Clone, Copy)]
pub struct Atom<'e> {
    api: &'e PlApi,
    handle: usize,
}

impl<'e> Atom<'e> {
    /// Intern `text`
    ///
    /// ASCII text goes through `PL_new_atom_nchars`, anything else through
    /// `PL_new_atom_wchars`.
    pub fn new(api: &'e PlApi, text: &str) -> PlResult<Self> {
        if text.is_ascii() {
            Self::from_bytes(api, text.as_bytes())
        } else {
            Self::from_wide(api, text)
        }
    }

    /// Intern a narrow byte string; may contain NUL bytes
    pub fn from_bytes(api: &'e PlApi, bytes: &[u8]) -> PlResult<Self> {
        let handle = api.handle(
            "PL_new_atom_nchars",
            &[Value::from(bytes.len()), Value::Bytes(bytes.to_vec())],
        )?;
        Ok(Self { api, handle })
    }

    /// Intern `text` as a wide string
    pub fn from_wide(api: &'e PlApi, text: &str) -> PlResult<Self> {
        // length in wchar_t units, without the terminator
        let units = encode_wide(text).len() - 1;
        let handle = api.handle(
            "PL_new_atom_wchars",
            &[Value::from(units), Value::WStr(text.to_string())],
        )?;
        Ok(Self { api, handle })
    }

    /// Wrap an existing `atom_t`
    pub fn from_ref(api: &'e PlApi, handle: usize) -> Self {
        Self { api, handle }
    }

    /// Raw `atom_t`
    pub fn handle(&self) -> usize {
        self.handle
    }

    /// Text of the atom
    ///
    /// Reads `PL_atom_chars`; atoms the runtime only holds in wide form are
    /// read back through `PL_atom_wchars`.
    pub fn text(&self) -> PlResult<String> {
        match self
            .api
            .call("PL_atom_chars:atom_t->char_p", &[word(self.handle)])?
        {
            Value::Str(text) => Ok(text),
            Value::Bytes(bytes) => Ok(bytes.iter().map(|&b| b as char).collect()),
            _ => self.wide_text(),
        }
    }

    fn wide_text(&self) -> PlResult<String> {
        let mut len: usize = 0;
        let len_ptr = &mut len as *mut usize as *mut c_void;
        match self
            .api
            .call("PL_atom_wchars", &[word(self.handle), Value::Ptr(len_ptr)])?
        {
            Value::WStr(text) => Ok(text),
            other => Err(PlError::TypeError(format!(
                "atom {} has no text ({})",
                self.handle,
                other.type_name()
            ))),
        }
    }
}

impl PartialEq for Atom<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Atom<'_> {}

impl fmt::Debug for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Atom").field(&self.handle).finish()
    }
}

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Ok(text) => write!(f, "{}", text),
            Err(_) => write!(f, "<atom {}>", self.handle),
        }
    }
}
