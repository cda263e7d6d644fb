//! Generic symbol caller
//!
//! The dispatcher resolves symbols by name at call time and builds a libffi
//! call interface from whatever marshalling is known for the symbol:
//!
//! 1. an inline prototype (`"add:int,int->int"`),
//! 2. else the prototype registered for the bare name,
//! 3. else the decisions cached from earlier calls, falling back to each
//!    value's default convention and an `int` return.
//!
//! Decisions are cached per symbol. A resolvable return type is always
//! applied; the argument list is applied only when every name resolves.

use crate::ffi::marshal::{CType, MarshalContext, MarshalError};
use crate::ffi::prototype::{split_symbol_spec, Prototype, PrototypeError, PrototypeRegistry};
use crate::ffi::types::{ScalarKind, TypeDescriptor, TypeRegistry};
use crate::ffi::SymbolSource;
use crate::value::Value;
use libffi::middle::{Arg, Cif, CodePtr};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use thiserror::Error;
use tracing::{debug, warn};

/// FFI call errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    /// The library does not export the symbol
    #[error("Symbol '{symbol}' not found in '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    /// Malformed prototype string
    #[error("Bad prototype for '{symbol}': {source}")]
    PrototypeSyntax {
        symbol: String,
        source: PrototypeError,
    },

    /// Fewer arguments than the declared argument list
    #[error("'{symbol}' expects at least {expected} arguments, got {got}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        got: usize,
    },

    /// An argument could not be converted to its C type
    #[error("Argument {index} of '{symbol}': {source}")]
    Marshal {
        symbol: String,
        index: usize,
        source: MarshalError,
    },

    /// The return value could not be converted back
    #[error("Return value of '{symbol}': {source}")]
    Return {
        symbol: String,
        source: MarshalError,
    },
}

/// Marshalling decisions currently attached to a symbol
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    /// Declared argument types; `None` means per-value defaults
    pub args: Option<Vec<TypeDescriptor>>,
    /// Declared return type; `None` means C `int`
    pub ret: Option<TypeDescriptor>,
}

impl Signature {
    /// Return type used when none is declared
    pub const DEFAULT_RETURN: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::I32);

    pub fn effective_return(&self) -> TypeDescriptor {
        self.ret.unwrap_or(Self::DEFAULT_RETURN)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    code: *const c_void,
    signature: Signature,
}

/// Dynamic caller over one symbol source
///
/// Single-threaded: decisions are cached behind a `RefCell`, so the
/// dispatcher is neither `Send` nor `Sync`.
pub struct Dispatcher {
    source: Box<dyn SymbolSource>,
    types: TypeRegistry,
    prototypes: PrototypeRegistry,
    verbose: bool,
    bindings: RefCell<HashMap<String, Binding>>,
}

impl Dispatcher {
    /// Create a dispatcher
    ///
    /// With `verbose` set, calls and lookups of symbols without any prototype
    /// emit a `tracing` warning.
    pub fn new(
        source: Box<dyn SymbolSource>,
        types: TypeRegistry,
        prototypes: PrototypeRegistry,
        verbose: bool,
    ) -> Self {
        Self {
            source,
            types,
            prototypes,
            verbose,
            bindings: RefCell::new(HashMap::new()),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn prototypes(&self) -> &PrototypeRegistry {
        &self.prototypes
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Name of the underlying symbol source
    pub fn library_name(&self) -> &str {
        self.source.name()
    }

    /// Call `name` or `name:prototype` with `args`
    ///
    /// # Examples
    ///
    /// ```
    /// # use plbridge_runtime::ffi::{Dispatcher, PrototypeRegistry, SymbolTable, TypeRegistry};
    /// # use plbridge_runtime::Value;
    /// extern "C" fn add(a: i32, b: i32) -> i32 {
    ///     a + b
    /// }
    ///
    /// let table = SymbolTable::new("host").with("add", add as *const ());
    /// let dispatcher = Dispatcher::new(
    ///     Box::new(table),
    ///     TypeRegistry::new(),
    ///     PrototypeRegistry::new(),
    ///     false,
    /// );
    ///
    /// let sum = dispatcher.call("add:int,int->int", &[Value::Int(2), Value::Int(3)]).unwrap();
    /// assert_eq!(sum, Value::Int(5));
    /// ```
    pub fn call(&self, spec: &str, args: &[Value]) -> Result<Value, CallError> {
        let (name, inline) = split_symbol_spec(spec);
        let prototype = inline.or_else(|| self.prototypes.lookup(name));
        self.dispatch(name, prototype, args, true, None)
    }

    /// Call a variadic C function
    ///
    /// The first `fixed_args` arguments are the named parameters; the rest
    /// are passed through the variadic calling convention. Trailing values
    /// must already have their promoted C types (`int`, `double`, words).
    pub fn call_variadic(
        &self,
        spec: &str,
        fixed_args: usize,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let (name, inline) = split_symbol_spec(spec);
        let prototype = inline.or_else(|| self.prototypes.lookup(name));
        self.dispatch(name, prototype, args, true, Some(fixed_args))
    }

    /// Look a symbol up without calling it
    ///
    /// Consults the prototype registry like [`Dispatcher::call`]; in verbose
    /// mode a symbol without a registered prototype is reported.
    pub fn symbol(&self, name: &str) -> Result<BoundSymbol<'_>, CallError> {
        let address = self.resolve(name)?;
        let prototype = self.prototypes.lookup(name).map(str::to_string);

        if prototype.is_none() {
            self.report_unprototyped(name);
        }

        Ok(BoundSymbol {
            dispatcher: self,
            name: name.to_string(),
            prototype,
            address,
        })
    }

    /// Marshalling currently cached for a symbol, if it was ever resolved
    pub fn signature(&self, name: &str) -> Option<Signature> {
        self.bindings
            .borrow()
            .get(name)
            .map(|binding| binding.signature.clone())
    }

    fn dispatch(
        &self,
        name: &str,
        prototype: Option<&str>,
        args: &[Value],
        report_missing: bool,
        fixed_args: Option<usize>,
    ) -> Result<Value, CallError> {
        self.resolve(name)?;

        match prototype {
            Some(text) => self.apply_prototype(name, text)?,
            None if report_missing => self.report_unprototyped(name),
            None => {}
        }

        let binding = self
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name))?;

        self.invoke(name, &binding, args, fixed_args)
    }

    /// Resolve and cache the symbol's address
    fn resolve(&self, name: &str) -> Result<*const c_void, CallError> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return Ok(binding.code);
        }

        let code = self
            .source
            .lookup(name)
            .filter(|code| !code.is_null())
            .ok_or_else(|| self.not_found(name))?;
        debug!(symbol = name, library = self.source.name(), "resolved symbol");

        self.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                code,
                signature: Signature::default(),
            },
        );
        Ok(code)
    }

    fn apply_prototype(&self, name: &str, text: &str) -> Result<(), CallError> {
        let prototype = Prototype::parse(text).map_err(|source| CallError::PrototypeSyntax {
            symbol: name.to_string(),
            source,
        })?;
        let resolved = prototype.resolve(&self.types);

        if !resolved.unresolved.is_empty() {
            debug!(
                symbol = name,
                prototype = text,
                unresolved = ?resolved.unresolved,
                "prototype names not registered; keeping previous marshalling for them"
            );
        }

        let mut bindings = self.bindings.borrow_mut();
        if let Some(binding) = bindings.get_mut(name) {
            if let Some(ret) = resolved.ret {
                binding.signature.ret = Some(ret);
            }
            if let Some(args) = resolved.args {
                binding.signature.args = Some(args);
            }
        }
        Ok(())
    }

    fn report_unprototyped(&self, name: &str) {
        if self.verbose {
            warn!(symbol = name, "call of '{}' without prototype", name);
        }
    }

    fn not_found(&self, name: &str) -> CallError {
        CallError::SymbolNotFound {
            library: self.source.name().to_string(),
            symbol: name.to_string(),
        }
    }

    fn invoke(
        &self,
        name: &str,
        binding: &Binding,
        args: &[Value],
        fixed_args: Option<usize>,
    ) -> Result<Value, CallError> {
        if let Some(fixed) = fixed_args {
            if args.len() < fixed {
                return Err(CallError::ArityMismatch {
                    symbol: name.to_string(),
                    expected: fixed,
                    got: args.len(),
                });
            }
        }

        let declared = binding.signature.args.as_deref();
        if let Some(declared) = declared {
            if args.len() < declared.len() {
                return Err(CallError::ArityMismatch {
                    symbol: name.to_string(),
                    expected: declared.len(),
                    got: args.len(),
                });
            }
        }

        let mut ctx = MarshalContext::new();
        let mut arg_types = Vec::with_capacity(args.len());
        let mut c_args = Vec::with_capacity(args.len());

        for (index, value) in args.iter().enumerate() {
            // arguments past the declared list take the default convention
            let desc = match declared.and_then(|d| d.get(index)) {
                Some(desc) => *desc,
                None => MarshalContext::default_descriptor(value),
            };
            let c_value = ctx
                .to_c(value, &desc)
                .map_err(|source| CallError::Marshal {
                    symbol: name.to_string(),
                    index,
                    source,
                })?;
            arg_types.push(desc);
            c_args.push(c_value);
        }

        let ret = binding.signature.effective_return();
        let ffi_types = arg_types.iter().map(TypeDescriptor::ffi_type);
        let cif = match fixed_args {
            Some(fixed) => Cif::new_variadic(ffi_types, fixed, ret.ffi_type()),
            None => Cif::new(ffi_types, ret.ffi_type()),
        };
        let ffi_args: Vec<Arg> = c_args.iter().map(CType::as_arg).collect();
        let code = CodePtr::from_ptr(binding.code);

        let raw = unsafe { call_raw(&cif, code, &ffi_args, &ret) };

        ctx.from_c(&raw, &ret).map_err(|source| CallError::Return {
            symbol: name.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("library", &self.source.name())
            .field("verbose", &self.verbose)
            .field("bound", &self.bindings.borrow().len())
            .finish()
    }
}

/// Invoke `code` and read the return slot as `ret`
///
/// # Safety
///
/// `code` must be a function whose C signature matches `cif`.
unsafe fn call_raw(cif: &Cif, code: CodePtr, args: &[Arg], ret: &TypeDescriptor) -> CType {
    match ret {
        TypeDescriptor::Scalar(ScalarKind::F32) => CType::F32(cif.call::<f32>(code, args)),
        TypeDescriptor::Scalar(ScalarKind::F64) => CType::F64(cif.call::<f64>(code, args)),
        // libffi widens integral returns to a full register-sized slot
        TypeDescriptor::Scalar(kind) => narrow(cif.call::<u64>(code, args), *kind),
        _ => CType::Ptr(cif.call::<*mut c_void>(code, args)),
    }
}

fn narrow(raw: u64, kind: ScalarKind) -> CType {
    match kind {
        ScalarKind::I8 => CType::I8(raw as i8),
        ScalarKind::U8 => CType::U8(raw as u8),
        ScalarKind::I16 => CType::I16(raw as i16),
        ScalarKind::U16 => CType::U16(raw as u16),
        ScalarKind::I32 => CType::I32(raw as i32),
        ScalarKind::U32 => CType::U32(raw as u32),
        ScalarKind::I64 => CType::I64(raw as i64),
        ScalarKind::U64 => CType::U64(raw),
        ScalarKind::F32 => CType::F32(f32::from_bits(raw as u32)),
        ScalarKind::F64 => CType::F64(f64::from_bits(raw)),
    }
}

/// A resolved symbol together with its registered prototype
///
/// Produced by [`Dispatcher::symbol`]; calls go through the same dispatch
/// path as [`Dispatcher::call`].
#[derive(Debug)]
pub struct BoundSymbol<'d> {
    dispatcher: &'d Dispatcher,
    name: String,
    prototype: Option<String>,
    address: *const c_void,
}

impl BoundSymbol<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered prototype, if any
    pub fn prototype(&self) -> Option<&str> {
        self.prototype.as_deref()
    }

    /// Raw symbol address
    pub fn address(&self) -> *const c_void {
        self.address
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        self.dispatcher
            .dispatch(&self.name, self.prototype.as_deref(), args, false, None)
    }
}
