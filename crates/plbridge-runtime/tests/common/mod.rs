//! Shared test utilities
//!
//! An in-process stand-in for the Prolog runtime: `extern "C"` functions
//! with the runtime's signatures over thread-local state, exposed through a
//! `SymbolTable`. Each test thread gets its own runtime.
#![allow(dead_code)]

use plbridge_config::EngineConfig;
use plbridge_runtime::ffi::{SymbolTable, WChar};
use plbridge_runtime::Engine;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_long};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// A term as the mock runtime stores it
#[derive(Debug, Clone, PartialEq)]
pub enum MockTerm {
    Variable,
    Atom(usize),
    String(Vec<u8>),
    Integer(i64),
    Float(f64),
    Compound { functor: usize, args: Vec<MockTerm> },
    Nil,
    Cons(Box<MockTerm>, Box<MockTerm>),
}

struct MockAtom {
    text: String,
    chars: Option<CString>,
    wide: Vec<WChar>,
}

#[derive(Default)]
pub struct MockRuntime {
    terms: Vec<MockTerm>,
    atoms: Vec<MockAtom>,
    functors: Vec<(usize, usize)>,
    pub init_args: Option<Vec<String>>,
    pub init_result: c_int,
    pub halts: usize,
    pub calls: Vec<&'static str>,
}

impl MockRuntime {
    fn new() -> Self {
        Self {
            // handle 0 is never issued
            terms: vec![MockTerm::Variable],
            init_result: 1,
            ..Self::default()
        }
    }

    fn intern(&mut self, text: String) -> usize {
        if let Some(index) = self.atoms.iter().position(|a| a.text == text) {
            return index + 1;
        }
        // like the runtime, text outside Latin-1 has no narrow form
        let chars = if text.chars().all(|c| (c as u32) < 0x80) {
            CString::new(text.as_bytes()).ok()
        } else {
            None
        };
        let wide = plbridge_runtime::ffi::encode_wide(&text);
        self.atoms.push(MockAtom { text, chars, wide });
        self.atoms.len()
    }

    fn atom(&self, handle: usize) -> &MockAtom {
        &self.atoms[handle - 1]
    }

    fn new_functor(&mut self, atom: usize, arity: usize) -> usize {
        if let Some(index) = self.functors.iter().position(|f| *f == (atom, arity)) {
            return index + 1;
        }
        self.functors.push((atom, arity));
        self.functors.len()
    }

    fn functor(&self, handle: usize) -> (usize, usize) {
        self.functors[handle - 1]
    }

    fn set(&mut self, term: usize, value: MockTerm) -> c_int {
        self.terms[term] = value;
        1
    }

    fn describe(&self, term: &MockTerm) -> String {
        match term {
            MockTerm::Variable => "_".to_string(),
            MockTerm::Atom(a) => self.atom(*a).text.clone(),
            MockTerm::String(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
            MockTerm::Integer(i) => i.to_string(),
            MockTerm::Float(f) => format!("{:?}", f),
            MockTerm::Compound { functor, args } => {
                let (name, _) = self.functor(*functor);
                let args: Vec<String> = args.iter().map(|a| self.describe(a)).collect();
                format!("{}({})", self.atom(name).text, args.join(","))
            }
            MockTerm::Nil => "[]".to_string(),
            MockTerm::Cons(_, _) => {
                let mut items = Vec::new();
                let mut rest = term;
                while let MockTerm::Cons(head, tail) = rest {
                    items.push(self.describe(head));
                    rest = tail;
                }
                match rest {
                    MockTerm::Nil => format!("[{}]", items.join(",")),
                    other => format!("[{}|{}]", items.join(","), self.describe(other)),
                }
            }
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<MockRuntime> = RefCell::new(MockRuntime::new());
}

fn with<R>(f: impl FnOnce(&mut MockRuntime) -> R) -> R {
    RUNTIME.with(|rt| f(&mut rt.borrow_mut()))
}

/// Fresh runtime state for the current thread
pub fn reset() {
    with(|rt| *rt = MockRuntime::new());
}

/// Make the next `PL_initialise` fail
pub fn fail_init() {
    with(|rt| rt.init_result = 0);
}

/// Render the term behind `handle`
pub fn describe(handle: usize) -> String {
    with(|rt| {
        let term = rt.terms[handle].clone();
        rt.describe(&term)
    })
}

pub fn term_at(handle: usize) -> MockTerm {
    with(|rt| rt.terms[handle].clone())
}

pub fn halts() -> usize {
    with(|rt| rt.halts)
}

pub fn init_args() -> Option<Vec<String>> {
    with(|rt| rt.init_args.clone())
}

/// Runtime functions called so far, in order
pub fn calls() -> Vec<&'static str> {
    with(|rt| rt.calls.clone())
}

fn record(rt: &mut MockRuntime, name: &'static str) {
    rt.calls.push(name);
}

unsafe fn narrow(s: *const c_char) -> Vec<u8> {
    CStr::from_ptr(s).to_bytes().to_vec()
}

unsafe fn narrow_n(s: *const c_char, len: usize) -> Vec<u8> {
    std::slice::from_raw_parts(s as *const u8, len).to_vec()
}

unsafe fn wide_n(s: *const WChar, len: usize) -> String {
    let units = std::slice::from_raw_parts(s, len);
    #[cfg(windows)]
    {
        String::from_utf16_lossy(units)
    }
    #[cfg(not(windows))]
    {
        units
            .iter()
            .filter_map(|&u| char::from_u32(u as u32))
            .collect()
    }
}

// ===== runtime functions =====

extern "C" fn pl_initialise(argc: c_int, argv: *mut *mut c_char) -> c_int {
    let args: Vec<String> = (0..argc as usize)
        .map(|i| unsafe { CStr::from_ptr(*argv.add(i)) }.to_string_lossy().into_owned())
        .collect();
    let terminated = unsafe { (*argv.add(argc as usize)).is_null() };
    with(|rt| {
        record(rt, "PL_initialise");
        assert!(terminated, "argv is not NULL terminated");
        rt.init_args = Some(args);
        rt.init_result
    })
}

extern "C" fn pl_halt(_status: c_int) -> c_int {
    with(|rt| {
        record(rt, "PL_halt");
        rt.halts += 1;
        1
    })
}

extern "C" fn pl_new_term_ref() -> usize {
    with(|rt| {
        rt.terms.push(MockTerm::Variable);
        rt.terms.len() - 1
    })
}

extern "C" fn pl_new_term_refs(n: usize) -> usize {
    with(|rt| {
        let base = rt.terms.len();
        rt.terms.extend(std::iter::repeat(MockTerm::Variable).take(n));
        base
    })
}

extern "C" fn pl_copy_term_ref(t: usize) -> usize {
    with(|rt| {
        let copy = rt.terms[t].clone();
        rt.terms.push(copy);
        rt.terms.len() - 1
    })
}

extern "C" fn pl_new_atom_nchars(len: usize, s: *const c_char) -> usize {
    let bytes = unsafe { narrow_n(s, len) };
    with(|rt| {
        record(rt, "PL_new_atom_nchars");
        rt.intern(String::from_utf8_lossy(&bytes).into_owned())
    })
}

extern "C" fn pl_new_atom_wchars(len: usize, s: *const WChar) -> usize {
    let text = unsafe { wide_n(s, len) };
    with(|rt| {
        record(rt, "PL_new_atom_wchars");
        rt.intern(text)
    })
}

extern "C" fn pl_atom_chars(a: usize) -> *const c_char {
    with(|rt| {
        rt.atom(a)
            .chars
            .as_ref()
            .map_or(std::ptr::null(), |c| c.as_ptr())
    })
}

extern "C" fn pl_atom_wchars(a: usize, len: *mut usize) -> *const WChar {
    with(|rt| {
        let wide = &rt.atom(a).wide;
        if !len.is_null() {
            unsafe { *len = wide.len() - 1 };
        }
        wide.as_ptr()
    })
}

extern "C" fn pl_new_functor(a: usize, arity: usize) -> usize {
    with(|rt| rt.new_functor(a, arity))
}

extern "C" fn pl_functor_name(f: usize) -> usize {
    with(|rt| rt.functor(f).0)
}

extern "C" fn pl_functor_arity(f: usize) -> usize {
    with(|rt| rt.functor(f).1)
}

extern "C" fn pl_put_variable(t: usize) -> c_int {
    with(|rt| rt.set(t, MockTerm::Variable))
}

extern "C" fn pl_put_atom(t: usize, a: usize) -> c_int {
    with(|rt| rt.set(t, MockTerm::Atom(a)))
}

extern "C" fn pl_put_atom_chars(t: usize, s: *const c_char) -> c_int {
    let bytes = unsafe { narrow(s) };
    with(|rt| {
        let atom = rt.intern(String::from_utf8_lossy(&bytes).into_owned());
        rt.set(t, MockTerm::Atom(atom))
    })
}

extern "C" fn pl_put_string_chars(t: usize, s: *const c_char) -> c_int {
    let bytes = unsafe { narrow(s) };
    with(|rt| rt.set(t, MockTerm::String(bytes)))
}

extern "C" fn pl_put_string_nchars(t: usize, len: usize, s: *const c_char) -> c_int {
    let bytes = unsafe { narrow_n(s, len) };
    with(|rt| rt.set(t, MockTerm::String(bytes)))
}

extern "C" fn pl_put_list_chars(t: usize, s: *const c_char) -> c_int {
    let text = String::from_utf8_lossy(&unsafe { narrow(s) }).into_owned();
    with(|rt| {
        let mut list = MockTerm::Nil;
        for c in text.chars().rev() {
            let atom = rt.intern(c.to_string());
            list = MockTerm::Cons(Box::new(MockTerm::Atom(atom)), Box::new(list));
        }
        rt.set(t, list)
    })
}

extern "C" fn pl_put_integer(t: usize, i: c_long) -> c_int {
    with(|rt| {
        record(rt, "PL_put_integer");
        rt.set(t, MockTerm::Integer(i as i64))
    })
}

extern "C" fn pl_put_int64(t: usize, i: i64) -> c_int {
    with(|rt| {
        record(rt, "PL_put_int64");
        rt.set(t, MockTerm::Integer(i))
    })
}

extern "C" fn pl_put_float(t: usize, f: c_double) -> c_int {
    with(|rt| rt.set(t, MockTerm::Float(f)))
}

extern "C" fn pl_put_functor(t: usize, f: usize) -> c_int {
    with(|rt| {
        let (_, arity) = rt.functor(f);
        let args = vec![MockTerm::Variable; arity];
        rt.set(t, MockTerm::Compound { functor: f, args })
    })
}

extern "C" fn pl_put_list(t: usize) -> c_int {
    with(|rt| {
        let cell = MockTerm::Cons(Box::new(MockTerm::Variable), Box::new(MockTerm::Variable));
        rt.set(t, cell)
    })
}

extern "C" fn pl_put_nil(t: usize) -> c_int {
    with(|rt| rt.set(t, MockTerm::Nil))
}

extern "C" fn pl_put_term(t: usize, other: usize) -> c_int {
    with(|rt| {
        let value = rt.terms[other].clone();
        rt.set(t, value)
    })
}

// Stands in for the variadic `PL_cons_functor`; only `arity` arguments are read.
extern "C" fn pl_cons_functor(h: usize, f: usize, a0: usize, a1: usize, a2: usize) -> c_int {
    with(|rt| {
        record(rt, "PL_cons_functor");
        let (_, arity) = rt.functor(f);
        // only three argument slots are modelled
        if arity > 3 {
            return 0;
        }
        let args = [a0, a1, a2][..arity]
            .iter()
            .map(|&a| rt.terms[a].clone())
            .collect();
        rt.set(h, MockTerm::Compound { functor: f, args })
    })
}

extern "C" fn pl_cons_functor_v(h: usize, f: usize, a0: usize) -> c_int {
    with(|rt| {
        let (_, arity) = rt.functor(f);
        let args = rt.terms[a0..a0 + arity].to_vec();
        rt.set(h, MockTerm::Compound { functor: f, args })
    })
}

extern "C" fn pl_cons_list(l: usize, h: usize, t: usize) -> c_int {
    with(|rt| {
        let cell = MockTerm::Cons(
            Box::new(rt.terms[h].clone()),
            Box::new(rt.terms[t].clone()),
        );
        rt.set(l, cell)
    })
}

extern "C" fn pl_term_type(t: usize) -> c_int {
    with(|rt| match &rt.terms[t] {
        MockTerm::Variable => 1,
        MockTerm::Atom(_) | MockTerm::Nil => 2,
        MockTerm::Integer(_) => 3,
        MockTerm::Float(_) => 4,
        MockTerm::String(_) => 5,
        MockTerm::Compound { .. } | MockTerm::Cons(_, _) => 6,
    })
}

extern "C" fn pl_get_atom(t: usize, out: *mut usize) -> c_int {
    with(|rt| match rt.terms[t] {
        MockTerm::Atom(a) => {
            unsafe { *out = a };
            1
        }
        _ => 0,
    })
}

fn check(t: usize, test: impl FnOnce(&MockTerm) -> bool) -> c_int {
    with(|rt| test(&rt.terms[t]) as c_int)
}

fn ground(term: &MockTerm) -> bool {
    match term {
        MockTerm::Variable => false,
        MockTerm::Compound { args, .. } => args.iter().all(ground),
        MockTerm::Cons(h, t) => ground(h) && ground(t),
        _ => true,
    }
}

extern "C" fn pl_is_variable(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::Variable))
}

extern "C" fn pl_is_ground(t: usize) -> c_int {
    check(t, ground)
}

extern "C" fn pl_is_atom(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::Atom(_) | MockTerm::Nil))
}

extern "C" fn pl_is_string(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::String(_)))
}

extern "C" fn pl_is_integer(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::Integer(_)))
}

extern "C" fn pl_is_float(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::Float(_)))
}

extern "C" fn pl_is_compound(t: usize) -> c_int {
    check(t, |term| {
        matches!(term, MockTerm::Compound { .. } | MockTerm::Cons(_, _))
    })
}

extern "C" fn pl_is_callable(t: usize) -> c_int {
    check(t, |term| {
        matches!(
            term,
            MockTerm::Atom(_) | MockTerm::Compound { .. } | MockTerm::Cons(_, _)
        )
    })
}

extern "C" fn pl_is_list(t: usize) -> c_int {
    check(t, |term| matches!(term, MockTerm::Nil | MockTerm::Cons(_, _)))
}

extern "C" fn pl_is_atomic(t: usize) -> c_int {
    check(t, |term| {
        !matches!(
            term,
            MockTerm::Variable | MockTerm::Compound { .. } | MockTerm::Cons(_, _)
        )
    })
}

extern "C" fn pl_is_number(t: usize) -> c_int {
    check(t, |term| {
        matches!(term, MockTerm::Integer(_) | MockTerm::Float(_))
    })
}

extern "C" fn pl_is_functor(t: usize, f: usize) -> c_int {
    check(t, |term| {
        matches!(term, MockTerm::Compound { functor, .. } if *functor == f)
    })
}

/// Symbol table over the mock runtime
pub fn mock_symbols() -> SymbolTable {
    SymbolTable::new("mock-swipl")
        .with("PL_initialise", pl_initialise as *const ())
        .with("PL_halt", pl_halt as *const ())
        .with("PL_new_term_ref", pl_new_term_ref as *const ())
        .with("PL_new_term_refs", pl_new_term_refs as *const ())
        .with("PL_copy_term_ref", pl_copy_term_ref as *const ())
        .with("PL_new_atom_nchars", pl_new_atom_nchars as *const ())
        .with("PL_new_atom_wchars", pl_new_atom_wchars as *const ())
        .with("PL_atom_chars", pl_atom_chars as *const ())
        .with("PL_atom_wchars", pl_atom_wchars as *const ())
        .with("PL_new_functor", pl_new_functor as *const ())
        .with("PL_functor_name", pl_functor_name as *const ())
        .with("PL_functor_arity", pl_functor_arity as *const ())
        .with("PL_put_variable", pl_put_variable as *const ())
        .with("PL_put_atom", pl_put_atom as *const ())
        .with("PL_put_atom_chars", pl_put_atom_chars as *const ())
        .with("PL_put_string_chars", pl_put_string_chars as *const ())
        .with("PL_put_string_nchars", pl_put_string_nchars as *const ())
        .with("PL_put_list_chars", pl_put_list_chars as *const ())
        .with("PL_put_integer", pl_put_integer as *const ())
        .with("PL_put_int64", pl_put_int64 as *const ())
        .with("PL_put_float", pl_put_float as *const ())
        .with("PL_put_functor", pl_put_functor as *const ())
        .with("PL_put_list", pl_put_list as *const ())
        .with("PL_put_nil", pl_put_nil as *const ())
        .with("PL_put_term", pl_put_term as *const ())
        .with("PL_cons_functor", pl_cons_functor as *const ())
        .with("PL_cons_functor_v", pl_cons_functor_v as *const ())
        .with("PL_cons_list", pl_cons_list as *const ())
        .with("PL_term_type", pl_term_type as *const ())
        .with("PL_get_atom", pl_get_atom as *const ())
        .with("PL_is_variable", pl_is_variable as *const ())
        .with("PL_is_ground", pl_is_ground as *const ())
        .with("PL_is_atom", pl_is_atom as *const ())
        .with("PL_is_string", pl_is_string as *const ())
        .with("PL_is_integer", pl_is_integer as *const ())
        .with("PL_is_float", pl_is_float as *const ())
        .with("PL_is_compound", pl_is_compound as *const ())
        .with("PL_is_callable", pl_is_callable as *const ())
        .with("PL_is_list", pl_is_list as *const ())
        .with("PL_is_atomic", pl_is_atomic as *const ())
        .with("PL_is_number", pl_is_number as *const ())
        .with("PL_is_functor", pl_is_functor as *const ())
}

/// Ready engine over a fresh mock runtime
pub fn mock_engine() -> Engine {
    mock_engine_with(&EngineConfig::default(), &[])
}

pub fn mock_engine_with(config: &EngineConfig, args: &[&str]) -> Engine {
    reset();
    Engine::with_symbols(Box::new(mock_symbols()), config, args).expect("mock engine boots")
}
