//! Prototype strings and the prototype registry
//!
//! A prototype describes a foreign symbol's marshalling:
//!
//! ```text
//! int,char_p->double    two arguments, double return
//! ->term_t              no declared arguments, term_t return
//! term_t,atom_t         two arguments, no declared return
//! ```
//!
//! Whitespace is not allowed and at most one `->` may appear. Names are only
//! resolved against a [`TypeRegistry`] at call time.

use crate::ffi::types::{TypeDescriptor, TypeRegistry};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const ARROW: &str = "->";

/// Malformed prototype string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid prototype '{prototype}': {reason}")]
pub struct PrototypeError {
    pub prototype: String,
    pub reason: String,
}

/// Parsed prototype: argument type names plus an optional return type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    args: Vec<String>,
    ret: Option<String>,
}

/// A prototype after name resolution
///
/// `args` is all-or-nothing: `None` when the argument clause was empty or any
/// name failed to resolve. `ret` resolves independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrototype {
    pub args: Option<Vec<TypeDescriptor>>,
    pub ret: Option<TypeDescriptor>,
    /// Names that failed to resolve, in order of appearance
    pub unresolved: Vec<String>,
}

impl Prototype {
    /// Parse `arg(,arg)*(->ret)?`
    ///
    /// # Examples
    ///
    /// ```
    /// # use plbridge_runtime::ffi::Prototype;
    /// let proto = Prototype::parse("int,int->int").unwrap();
    /// assert_eq!(proto.args(), &["int".to_string(), "int".to_string()]);
    /// assert_eq!(proto.ret(), Some("int"));
    ///
    /// assert!(Prototype::parse("int->int->int").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, PrototypeError> {
        if text.chars().any(char::is_whitespace) {
            return Err(PrototypeError {
                prototype: text.to_string(),
                reason: "whitespace is not allowed".to_string(),
            });
        }

        let mut parts = text.split(ARROW);
        let arg_clause = parts.next().unwrap_or_default();
        let ret_clause = parts.next();
        if parts.next().is_some() {
            return Err(PrototypeError {
                prototype: text.to_string(),
                reason: format!("more than one '{}'", ARROW),
            });
        }

        let args = if arg_clause.is_empty() {
            Vec::new()
        } else {
            arg_clause.split(',').map(str::to_string).collect()
        };
        let ret = ret_clause
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(Self { args, ret })
    }

    /// Declared argument type names
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Declared return type name
    pub fn ret(&self) -> Option<&str> {
        self.ret.as_deref()
    }

    /// Resolve names against `types`
    pub fn resolve(&self, types: &TypeRegistry) -> ResolvedPrototype {
        let mut unresolved = Vec::new();

        let ret = self.ret.as_deref().and_then(|name| {
            let desc = types.resolve(name);
            if desc.is_none() {
                unresolved.push(name.to_string());
            }
            desc
        });

        let args = if self.args.is_empty() {
            None
        } else {
            let mut resolved = Vec::with_capacity(self.args.len());
            for name in &self.args {
                match types.resolve(name) {
                    Some(desc) => resolved.push(desc),
                    None => unresolved.push(name.clone()),
                }
            }
            (resolved.len() == self.args.len()).then_some(resolved)
        };

        ResolvedPrototype {
            args,
            ret,
            unresolved,
        }
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(","))?;
        if let Some(ret) = &self.ret {
            write!(f, "{}{}", ARROW, ret)?;
        }
        Ok(())
    }
}

/// Split `name` or `name:prototype` on the first colon
pub fn split_symbol_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once(':') {
        Some((name, proto)) => (name, Some(proto)),
        None => (spec, None),
    }
}

/// Symbol name → prototype string table
///
/// Pure mapping: nothing is validated at registration.
#[derive(Debug, Clone, Default)]
pub struct PrototypeRegistry {
    table: HashMap<String, String>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: impl Into<String>, prototype: impl Into<String>) {
        self.table.insert(symbol.into(), prototype.into());
    }

    pub fn lookup(&self, symbol: &str) -> Option<&str> {
        self.table.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<S: Into<String>, P: Into<String>> FromIterator<(S, P)> for PrototypeRegistry {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (symbol, prototype) in iter {
            registry.register(symbol, prototype);
        }
        registry
    }
}
