//! SWI-Prolog binding
//!
//! Handles over the runtime's term references, atoms and functors. Every
//! operation goes through [`PlApi`], a [`Dispatcher`](crate::ffi::Dispatcher)
//! pre-loaded with the engine's handle types and prototypes.

pub mod api;
pub mod atom;
pub mod functor;
pub mod put;
pub mod term;

pub use api::PlApi;
pub use atom::Atom;
pub use functor::{Functor, FunctorName};
pub use put::PutValue;
pub use term::{FunctorSpec, Term};

use std::fmt;

// Query flags
pub const PL_Q_NORMAL: i32 = 0x02;
pub const PL_Q_NODEBUG: i32 = 0x04;
pub const PL_Q_CATCH_EXCEPTION: i32 = 0x08;
pub const PL_Q_PASS_EXCEPTION: i32 = 0x10;

// Term type codes
pub const PL_VARIABLE: i32 = 1;
pub const PL_ATOM: i32 = 2;
pub const PL_INTEGER: i32 = 3;
pub const PL_FLOAT: i32 = 4;
pub const PL_STRING: i32 = 5;
pub const PL_TERM: i32 = 6;
pub const PL_FUNCTOR: i32 = 10;
pub const PL_LIST: i32 = 11;
pub const PL_CHARS: i32 = 12;
pub const PL_POINTER: i32 = 13;
pub const PL_CODE_LIST: i32 = 14;
pub const PL_CHAR_LIST: i32 = 15;
pub const PL_BOOL: i32 = 16;
pub const PL_FUNCTOR_CHARS: i32 = 17;
pub const PL_PREDICATE_INDICATOR: i32 = 18;
pub const PL_SHORT: i32 = 19;
pub const PL_INT: i32 = 20;
pub const PL_LONG: i32 = 21;
pub const PL_DOUBLE: i32 = 22;
pub const PL_NCHARS: i32 = 23;
pub const PL_UTF8_CHARS: i32 = 24;
pub const PL_UTF8_STRING: i32 = 25;
pub const PL_INT64: i32 = 26;
pub const PL_NUTF8_CHARS: i32 = 27;
pub const PL_NUTF8_CODES: i32 = 29;
pub const PL_NUTF8_STRING: i32 = 30;
pub const PL_NWCHARS: i32 = 31;
pub const PL_NWCODES: i32 = 32;
pub const PL_NWSTRING: i32 = 33;
pub const PL_MBCHARS: i32 = 34;
pub const PL_MBCODES: i32 = 35;
pub const PL_MBSTRING: i32 = 36;
pub const PL_INTPTR: i32 = 37;

/// Default query flags
pub const DEFAULT_QUERY_FLAGS: i32 = PL_Q_CATCH_EXCEPTION;

/// Decoded result of `PL_term_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    Variable,
    Atom,
    Integer,
    Float,
    String,
    Compound,
    /// Any code this binding does not name
    Other(i32),
}

impl TermType {
    pub fn from_code(code: i32) -> Self {
        match code {
            PL_VARIABLE => TermType::Variable,
            PL_ATOM => TermType::Atom,
            PL_INTEGER => TermType::Integer,
            PL_FLOAT => TermType::Float,
            PL_STRING => TermType::String,
            PL_TERM => TermType::Compound,
            other => TermType::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            TermType::Variable => PL_VARIABLE,
            TermType::Atom => PL_ATOM,
            TermType::Integer => PL_INTEGER,
            TermType::Float => PL_FLOAT,
            TermType::String => PL_STRING,
            TermType::Compound => PL_TERM,
            TermType::Other(code) => *code,
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermType::Variable => write!(f, "variable"),
            TermType::Atom => write!(f, "atom"),
            TermType::Integer => write!(f, "integer"),
            TermType::Float => write!(f, "float"),
            TermType::String => write!(f, "string"),
            TermType::Compound => write!(f, "compound"),
            TermType::Other(code) => write!(f, "type#{}", code),
        }
    }
}

/// `module:name` split of a goal or predicate reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleScope<'a> {
    pub module: &'a str,
    pub name: &'a str,
}

impl<'a> ModuleScope<'a> {
    /// Module used for unqualified names
    pub const DEFAULT_MODULE: &'static str = "user";

    /// Split on the first colon; unqualified names live in `user`
    pub fn parse(text: &'a str) -> Self {
        match text.split_once(':') {
            Some((module, name)) => Self { module, name },
            None => Self {
                module: Self::DEFAULT_MODULE,
                name: text,
            },
        }
    }

    pub fn is_default_module(&self) -> bool {
        self.module == Self::DEFAULT_MODULE
    }
}

impl fmt::Display for ModuleScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_type_codes() {
        assert_eq!(TermType::from_code(1), TermType::Variable);
        assert_eq!(TermType::from_code(6), TermType::Compound);
        assert_eq!(TermType::from_code(PL_INTPTR), TermType::Other(37));
        for code in 1..=6 {
            assert_eq!(TermType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_module_scope() {
        let scope = ModuleScope::parse("lists:append");
        assert_eq!(scope.module, "lists");
        assert_eq!(scope.name, "append");
        assert!(!scope.is_default_module());

        let scope = ModuleScope::parse("member");
        assert_eq!(scope.module, "user");
        assert_eq!(scope.to_string(), "user:member");
    }

    #[test]
    fn test_query_flags_are_distinct_bits() {
        let flags = [
            PL_Q_NORMAL,
            PL_Q_NODEBUG,
            PL_Q_CATCH_EXCEPTION,
            PL_Q_PASS_EXCEPTION,
        ];
        let combined = flags.iter().fold(0, |acc, f| acc | f);
        assert_eq!(combined.count_ones(), 4);
        assert_eq!(DEFAULT_QUERY_FLAGS, 0x08);
    }
}
