//! Functors: name/arity pairs

use crate::error::PlResult;
use crate::prolog::api::{word, PlApi};
use crate::prolog::atom::Atom;
use crate::value::Value;
use std::fmt;

/// Name of a functor, either an existing atom or text to intern
#[derive(Debug, Clone)]
pub enum FunctorName<'e> {
    Atom(Atom<'e>),
    Text(String),
}

impl<'e> From<Atom<'e>> for FunctorName<'e> {
    fn from(atom: Atom<'e>) -> Self {
        FunctorName::Atom(atom)
    }
}

impl From<&str> for FunctorName<'_> {
    fn from(text: &str) -> Self {
        FunctorName::Text(text.to_string())
    }
}

impl From<String> for FunctorName<'_> {
    fn from(text: String) -> Self {
        FunctorName::Text(text)
    }
}

/// Handle to a runtime functor together with its name atom and arity
#[derive(Clone)]
pub struct Functor<'e> {
    api: &'e PlApi,
    name: Atom<'e>,
    arity: usize,
    handle: usize,
}

impl<'e> Functor<'e> {
    pub fn new(api: &'e PlApi, name: impl Into<FunctorName<'e>>, arity: usize) -> PlResult<Self> {
        let name = match name.into() {
            FunctorName::Atom(atom) => atom,
            FunctorName::Text(text) => Atom::new(api, &text)?,
        };
        let handle = api.handle(
            "PL_new_functor",
            &[word(name.handle()), Value::from(arity)],
        )?;
        Ok(Self {
            api,
            name,
            arity,
            handle,
        })
    }

    /// Raw `functor_t`
    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn name(&self) -> &Atom<'e> {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Name atom as reported by the runtime
    pub fn foreign_name(&self) -> PlResult<Atom<'e>> {
        let handle = self.api.handle("PL_functor_name", &[word(self.handle)])?;
        Ok(Atom::from_ref(self.api, handle))
    }

    /// Arity as reported by the runtime
    pub fn foreign_arity(&self) -> PlResult<usize> {
        self.api.handle("PL_functor_arity", &[word(self.handle)])
    }
}

impl fmt::Debug for Functor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Functor")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for Functor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}
