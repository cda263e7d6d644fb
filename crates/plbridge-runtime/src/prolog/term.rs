//! Term references and term vectors

use crate::error::{PlError, PlResult};
use crate::prolog::api::{word, PlApi};
use crate::prolog::atom::Atom;
use crate::prolog::functor::{Functor, FunctorName};
use crate::prolog::put::PutValue;
use crate::prolog::TermType;
use crate::value::Value;
use std::ffi::c_void;
use std::fmt;

/// Handle to one term reference or a vector of contiguous references
///
/// A term created with a count of zero is uninitialized: every operation is
/// rejected with [`PlError::Uninitialized`] until [`Term::bind`] attaches it
/// to an existing reference. Indexing a vector yields a non-owning term for
/// `base + index`.
#[derive(Clone)]
pub struct Term<'e> {
    api: &'e PlApi,
    handle: usize,
    len: usize,
}

impl<'e> Term<'e> {
    /// Fresh single term reference
    pub fn new(api: &'e PlApi) -> PlResult<Self> {
        Self::with_count(api, 1)
    }

    /// `num` contiguous term references
    ///
    /// Zero yields an uninitialized term; negative counts are rejected.
    pub fn with_count(api: &'e PlApi, num: i64) -> PlResult<Self> {
        let len = usize::try_from(num)
            .map_err(|_| PlError::ValueError(format!("term count can not be negative: {}", num)))?;

        let handle = match len {
            0 => 0,
            1 => api.handle("PL_new_term_ref", &[])?,
            n => api.handle("PL_new_term_refs", &[Value::from(n)])?,
        };
        Ok(Self { api, handle, len })
    }

    /// Uninitialized term, to be bound later
    pub fn uninit(api: &'e PlApi) -> Self {
        Self {
            api,
            handle: 0,
            len: 0,
        }
    }

    /// Wrap an existing `term_t`
    pub fn from_ref(api: &'e PlApi, handle: usize) -> Self {
        Self {
            api,
            handle,
            len: 1,
        }
    }

    /// Attach this term to an existing `term_t`
    pub fn bind(&mut self, handle: usize) {
        self.handle = handle;
        self.len = 1;
    }

    /// Number of references; zero when uninitialized
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for an uninitialized term
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_vector(&self) -> bool {
        self.len > 1
    }

    /// Raw `term_t` (the base reference of a vector)
    pub fn handle(&self) -> PlResult<usize> {
        self.require("handle")
    }

    /// The `index`-th reference of the vector
    pub fn get(&self, index: usize) -> PlResult<Term<'e>> {
        let base = self.require("get")?;
        if index >= self.len {
            return Err(PlError::IndexError {
                index,
                len: self.len,
            });
        }
        Ok(Term::from_ref(self.api, base + index))
    }

    /// Iterate over the references of the vector
    pub fn iter(&self) -> impl Iterator<Item = Term<'e>> + '_ {
        (0..self.len).map(move |index| Term::from_ref(self.api, self.handle + index))
    }

    /// New reference to the same term (`PL_copy_term_ref`)
    pub fn copy(&self) -> PlResult<Term<'e>> {
        let handle = self.api.handle("PL_copy_term_ref", &[self.term("copy")?])?;
        Ok(Term::from_ref(self.api, handle))
    }

    fn require(&self, operation: &'static str) -> PlResult<usize> {
        if self.len == 0 {
            Err(PlError::Uninitialized { operation })
        } else {
            Ok(self.handle)
        }
    }

    fn term(&self, operation: &'static str) -> PlResult<Value> {
        self.require(operation).map(word)
    }

    fn put_with(&self, function: &'static str, extra: &[Value]) -> PlResult<()> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(self.term(function)?);
        args.extend_from_slice(extra);
        self.api.ensure(function, &args)
    }

    fn test_with(&self, function: &'static str, extra: &[Value]) -> PlResult<bool> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(self.term(function)?);
        args.extend_from_slice(extra);
        self.api.test(function, &args)
    }

    // put family

    /// Fresh variable
    pub fn put_variable(&self) -> PlResult<()> {
        self.put_with("PL_put_variable", &[])
    }

    pub fn put_atom(&self, atom: &Atom<'_>) -> PlResult<()> {
        self.put_with("PL_put_atom", &[word(atom.handle())])
    }

    /// Atom from NUL-terminated text
    pub fn put_atom_chars(&self, chars: &str) -> PlResult<()> {
        self.put_with("PL_put_atom_chars", &[Value::from(chars)])
    }

    /// String object from NUL-terminated text
    pub fn put_string_chars(&self, chars: &str) -> PlResult<()> {
        self.put_with("PL_put_string_chars", &[Value::from(chars)])
    }

    /// String object from a buffer; may contain NUL bytes
    pub fn put_string_nchars(&self, buffer: &[u8]) -> PlResult<()> {
        self.put_with(
            "PL_put_string_nchars",
            &[Value::from(buffer.len()), Value::from(buffer)],
        )
    }

    /// List of character codes
    pub fn put_list_chars(&self, chars: &str) -> PlResult<()> {
        self.put_with("PL_put_list_chars", &[Value::from(chars)])
    }

    /// Integer that fits a C `long`
    pub fn put_integer(&self, value: i64) -> PlResult<()> {
        self.put_with("PL_put_integer", &[Value::Int(value)])
    }

    pub fn put_int64(&self, value: i64) -> PlResult<()> {
        self.put_with("PL_put_int64", &[Value::Int(value)])
    }

    pub fn put_float(&self, value: f64) -> PlResult<()> {
        self.put_with("PL_put_float", &[Value::Float(value)])
    }

    /// Compound term with fresh variables as arguments
    pub fn put_functor(&self, functor: &Functor<'_>) -> PlResult<()> {
        self.put_with("PL_put_functor", &[word(functor.handle())])
    }

    /// List cell with fresh head and tail
    pub fn put_list(&self) -> PlResult<()> {
        self.put_with("PL_put_list", &[])
    }

    /// Empty list
    pub fn put_nil(&self) -> PlResult<()> {
        self.put_with("PL_put_nil", &[])
    }

    /// Make this reference point at the same term as `other`
    pub fn put_term(&self, other: &Term<'_>) -> PlResult<()> {
        let other = other.term("put_term")?;
        self.put_with("PL_put_term", &[other])
    }

    /// Dispatch on the value's variant, see [`PutValue`]
    pub fn put<'v>(&self, value: impl Into<PutValue<'v>>) -> PlResult<()> {
        match value.into() {
            PutValue::Atom(atom) => self.put_atom(&atom),
            PutValue::Text(text) => self.put_string_chars(&text),
            PutValue::Buffer(buffer) => self.put_string_nchars(&buffer),
            PutValue::Integer(i) => self.put_integer(i),
            PutValue::WideInteger(i) => self.put_int64(i),
            PutValue::Float(f) => self.put_float(f),
            PutValue::Functor(functor) => self.put_functor(&functor),
            PutValue::Chars(pieces) => self.put_list_chars(&pieces.concat()),
            PutValue::Nil => self.put_nil(),
            PutValue::List => self.put_list(),
            PutValue::Variable => self.put_variable(),
        }
    }

    /// Put a boundary value; pointers have no term representation
    pub fn put_value(&self, value: Value) -> PlResult<()> {
        self.put(PutValue::try_from(value)?)
    }

    // construction

    /// Compound term `functor(args...)`
    ///
    /// Text names are interned with the arity taken from `args`; a functor
    /// whose arity differs from `args.len()` is rejected.
    pub fn cons_functor<'n>(
        &self,
        functor: impl Into<FunctorSpec<'n, 'e>>,
        args: &[&Term<'_>],
    ) -> PlResult<()>
    where
        'e: 'n,
    {
        let functor = functor.into().resolve(self.api, args.len())?;

        let mut values = Vec::with_capacity(args.len() + 2);
        values.push(self.term("cons_functor")?);
        values.push(word(functor.handle()));
        for arg in args {
            values.push(arg.term("cons_functor")?);
        }

        // term_t and functor_t are named, one variadic term_t per argument
        let mut spec = String::from("PL_cons_functor:term_t,functor_t");
        for _ in args {
            spec.push_str(",term_t");
        }
        spec.push_str("->int");

        self.api.ensure_variadic(&spec, 2, &values)
    }

    /// Compound term whose arguments are the references of vector `args`
    pub fn cons_functor_v<'n>(
        &self,
        functor: impl Into<FunctorSpec<'n, 'e>>,
        args: &Term<'_>,
    ) -> PlResult<()>
    where
        'e: 'n,
    {
        let base = args.term("cons_functor_v")?;
        let functor = functor.into().resolve(self.api, args.len())?;
        self.put_with("PL_cons_functor_v", &[word(functor.handle()), base])
    }

    /// Prepend `head`, `tail` and `more` to the list in this term
    ///
    /// The result is `[head, tail, more..., | Self]`.
    pub fn cons_list(&self, head: &Term<'_>, tail: &Term<'_>, more: &[&Term<'_>]) -> PlResult<()> {
        let this = self.term("cons_list")?;
        let cells = std::iter::once(head)
            .chain(std::iter::once(tail))
            .chain(more.iter().copied());

        let mut cells: Vec<Value> = cells
            .map(|t| t.term("cons_list"))
            .collect::<PlResult<_>>()?;
        cells.reverse();

        for cell in cells {
            self.api
                .ensure("PL_cons_list", &[this.clone(), cell, this.clone()])?;
        }
        Ok(())
    }

    // inspection

    pub fn term_type(&self) -> PlResult<TermType> {
        match self.api.call("PL_term_type", &[self.term("term_type")?])? {
            Value::Int(code) => Ok(TermType::from_code(code as i32)),
            other => Err(PlError::TypeError(format!(
                "PL_term_type returned {}",
                other.type_name()
            ))),
        }
    }

    /// Atom held by this term
    pub fn get_atom(&self) -> PlResult<Atom<'e>> {
        let mut handle: usize = 0;
        let out = &mut handle as *mut usize as *mut c_void;
        if self.test_with("PL_get_atom", &[Value::Ptr(out)])? {
            Ok(Atom::from_ref(self.api, handle))
        } else {
            Err(PlError::TypeError("term is not an atom".to_string()))
        }
    }

    pub fn is_variable(&self) -> PlResult<bool> {
        self.test_with("PL_is_variable", &[])
    }

    pub fn is_ground(&self) -> PlResult<bool> {
        self.test_with("PL_is_ground", &[])
    }

    pub fn is_atom(&self) -> PlResult<bool> {
        self.test_with("PL_is_atom", &[])
    }

    pub fn is_string(&self) -> PlResult<bool> {
        self.test_with("PL_is_string", &[])
    }

    pub fn is_integer(&self) -> PlResult<bool> {
        self.test_with("PL_is_integer", &[])
    }

    pub fn is_float(&self) -> PlResult<bool> {
        self.test_with("PL_is_float", &[])
    }

    pub fn is_rational(&self) -> PlResult<bool> {
        self.test_with("PL_is_rational", &[])
    }

    pub fn is_compound(&self) -> PlResult<bool> {
        self.test_with("PL_is_compound", &[])
    }

    pub fn is_callable(&self) -> PlResult<bool> {
        self.test_with("PL_is_callable", &[])
    }

    /// List cell or `[]`
    pub fn is_list(&self) -> PlResult<bool> {
        self.test_with("PL_is_list", &[])
    }

    /// Neither variable nor compound
    pub fn is_atomic(&self) -> PlResult<bool> {
        self.test_with("PL_is_atomic", &[])
    }

    pub fn is_number(&self) -> PlResult<bool> {
        self.test_with("PL_is_number", &[])
    }

    /// Compound term whose functor is `functor`
    pub fn is_functor(&self, functor: &Functor<'_>) -> PlResult<bool> {
        self.test_with("PL_is_functor", &[word(functor.handle())])
    }
}

impl fmt::Debug for Term<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len == 0 {
            return write!(f, "Term(<uninit>)");
        }
        f.debug_struct("Term")
            .field("handle", &self.handle)
            .field("len", &self.len)
            .finish()
    }
}

/// Functor argument of the `cons_functor` family
pub enum FunctorSpec<'n, 'e> {
    Functor(&'n Functor<'e>),
    Name(FunctorName<'e>),
}

impl<'n, 'e> FunctorSpec<'n, 'e> {
    fn resolve(self, api: &'e PlApi, arity: usize) -> PlResult<Functor<'e>> {
        match self {
            FunctorSpec::Functor(functor) if functor.arity() != arity => {
                Err(PlError::ValueError(format!(
                    "functor {} used with {} arguments",
                    functor, arity
                )))
            }
            FunctorSpec::Functor(functor) => Ok(functor.clone()),
            FunctorSpec::Name(name) => Functor::new(api, name, arity),
        }
    }
}

impl<'n, 'e> From<&'n Functor<'e>> for FunctorSpec<'n, 'e> {
    fn from(functor: &'n Functor<'e>) -> Self {
        FunctorSpec::Functor(functor)
    }
}

impl<'e> From<Atom<'e>> for FunctorSpec<'_, 'e> {
    fn from(atom: Atom<'e>) -> Self {
        FunctorSpec::Name(FunctorName::Atom(atom))
    }
}

impl From<&str> for FunctorSpec<'_, '_> {
    fn from(name: &str) -> Self {
        FunctorSpec::Name(FunctorName::from(name))
    }
}

impl From<String> for FunctorSpec<'_, '_> {
    fn from(name: String) -> Self {
        FunctorSpec::Name(FunctorName::from(name))
    }
}
