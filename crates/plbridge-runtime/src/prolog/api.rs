//! Dispatcher pre-loaded with the SWI-Prolog foreign interface

use crate::error::{PlError, PlResult};
use crate::ffi::{
    CallError, Dispatcher, PrototypeRegistry, ScalarKind, SymbolSource, TypeDescriptor,
    TypeRegistry,
};
use crate::value::Value;
use plbridge_config::EngineConfig;

/// Engine handle types
///
/// `term_t`, `atom_t`, `functor_t` and `qid_t` are pointer-sized integers;
/// the remaining handles are opaque pointers.
const SWI_TYPES: &[(&str, TypeDescriptor)] = &[
    ("term_t", TypeDescriptor::Scalar(WORD)),
    ("atom_t", TypeDescriptor::Scalar(WORD)),
    ("functor_t", TypeDescriptor::Scalar(WORD)),
    ("qid_t", TypeDescriptor::Scalar(WORD)),
    ("module_t", TypeDescriptor::Pointer),
    ("predicate_t", TypeDescriptor::Pointer),
    ("record_t", TypeDescriptor::Pointer),
    ("control_t", TypeDescriptor::Pointer),
    ("atom_p", TypeDescriptor::PointerTo(WORD)),
    ("size_t_p", TypeDescriptor::PointerTo(WORD)),
];

#[cfg(target_pointer_width = "64")]
const WORD: ScalarKind = ScalarKind::U64;
#[cfg(not(target_pointer_width = "64"))]
const WORD: ScalarKind = ScalarKind::U32;

/// Prototypes of the runtime functions the handle model calls
///
/// `PL_cons_functor` is variadic and gets an inline prototype per call.
const SWI_PROTOTYPES: &[(&str, &str)] = &[
    ("PL_initialise", "int,void_p->int"),
    ("PL_halt", "int->int"),
    // term references
    ("PL_new_term_refs", "size_t->term_t"),
    ("PL_new_term_ref", "->term_t"),
    ("PL_copy_term_ref", "term_t->term_t"),
    ("PL_reset_term_refs", "term_t"),
    // atoms and functors
    ("PL_new_atom", "char_p->atom_t"),
    ("PL_new_atom_nchars", "size_t,char_p->atom_t"),
    ("PL_new_atom_wchars", "size_t,wchar_p->atom_t"),
    ("PL_atom_chars", "atom_t->char_p"),
    ("PL_atom_nchars", "atom_t,size_t_p->char_p"),
    ("PL_atom_wchars", "atom_t,size_t_p->wchar_p"),
    ("PL_new_functor", "atom_t,size_t->functor_t"),
    ("PL_functor_name", "functor_t->atom_t"),
    ("PL_functor_arity", "functor_t->size_t"),
    // put
    ("PL_put_variable", "term_t->int"),
    ("PL_put_atom", "term_t,atom_t->int"),
    ("PL_put_atom_chars", "term_t,char_p->int"),
    ("PL_put_string_chars", "term_t,char_p->int"),
    ("PL_put_list_chars", "term_t,char_p->int"),
    ("PL_put_list_codes", "term_t,char_p->int"),
    ("PL_put_atom_nchars", "term_t,size_t,char_p->int"),
    ("PL_put_string_nchars", "term_t,size_t,char_p->int"),
    ("PL_put_list_nchars", "term_t,size_t,char_p->int"),
    ("PL_put_list_ncodes", "term_t,size_t,char_p->int"),
    ("PL_put_integer", "term_t,long->int"),
    ("PL_put_int64", "term_t,int64->int"),
    ("PL_put_pointer", "term_t,void_p->int"),
    ("PL_put_float", "term_t,double->int"),
    ("PL_put_functor", "term_t,functor_t->int"),
    ("PL_put_list", "term_t->int"),
    ("PL_put_nil", "term_t->int"),
    ("PL_put_term", "term_t,term_t->int"),
    // construction
    ("PL_cons_functor_v", "term_t,functor_t,term_t->int"),
    ("PL_cons_list", "term_t,term_t,term_t->int"),
    // inspection
    ("PL_term_type", "term_t->int"),
    ("PL_get_atom", "term_t,atom_p->int"),
    ("PL_is_variable", "term_t->int"),
    ("PL_is_ground", "term_t->int"),
    ("PL_is_atom", "term_t->int"),
    ("PL_is_integer", "term_t->int"),
    ("PL_is_string", "term_t->int"),
    ("PL_is_float", "term_t->int"),
    ("PL_is_rational", "term_t->int"),
    ("PL_is_compound", "term_t->int"),
    ("PL_is_callable", "term_t->int"),
    ("PL_is_functor", "term_t,functor_t->int"),
    ("PL_is_list", "term_t->int"),
    ("PL_is_atomic", "term_t->int"),
    ("PL_is_number", "term_t->int"),
];

/// The runtime's foreign interface
///
/// Wraps a [`Dispatcher`] whose type table knows the engine handle types and
/// whose prototype table covers every function the handle model calls.
/// Configured aliases and prototypes are merged on top.
#[derive(Debug)]
pub struct PlApi {
    dispatcher: Dispatcher,
}

impl PlApi {
    /// Bind to `source` with the built-in tables only
    pub fn new(source: Box<dyn SymbolSource>, verbose: bool) -> Self {
        Self {
            dispatcher: Dispatcher::new(source, Self::swi_types(), Self::swi_prototypes(), verbose),
        }
    }

    /// Bind to `source` with the configured aliases, prototypes and verbosity
    pub fn with_config(source: Box<dyn SymbolSource>, config: &EngineConfig) -> PlResult<Self> {
        let mut types = Self::swi_types();
        for (alias, target) in &config.types {
            let desc = types
                .resolve(target)
                .ok_or_else(|| PlError::UnknownTypeAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                })?;
            types.register(alias.clone(), desc);
        }

        let mut prototypes = Self::swi_prototypes();
        for (symbol, prototype) in &config.prototypes {
            prototypes.register(symbol.clone(), prototype.clone());
        }

        Ok(Self {
            dispatcher: Dispatcher::new(source, types, prototypes, config.verbose()),
        })
    }

    /// Built-in type names plus the engine handle types
    pub fn swi_types() -> TypeRegistry {
        TypeRegistry::with_extra(SWI_TYPES.iter().copied())
    }

    pub fn swi_prototypes() -> PrototypeRegistry {
        SWI_PROTOTYPES.iter().copied().collect()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Call any runtime function, see [`Dispatcher::call`]
    pub fn call(&self, spec: &str, args: &[Value]) -> PlResult<Value> {
        Ok(self.dispatcher.call(spec, args)?)
    }

    /// Call a function returning an engine handle
    pub(crate) fn handle(&self, spec: &str, args: &[Value]) -> PlResult<usize> {
        let value = self.call(spec, args)?;
        value.as_word().ok_or_else(|| {
            PlError::TypeError(format!(
                "{} returned {} where a handle was expected",
                function_name(spec),
                value.type_name()
            ))
        })
    }

    /// Call a function returning a C truth value
    pub(crate) fn test(&self, spec: &str, args: &[Value]) -> PlResult<bool> {
        Ok(self.call(spec, args)?.is_truthy())
    }

    /// Call a function whose false result is a failure
    pub(crate) fn ensure(&self, spec: &str, args: &[Value]) -> PlResult<()> {
        let ok = self.test(spec, args)?;
        succeeded(spec, ok)
    }

    /// [`PlApi::ensure`] for variadic functions with `fixed_args` named parameters
    pub(crate) fn ensure_variadic(
        &self,
        spec: &str,
        fixed_args: usize,
        args: &[Value],
    ) -> PlResult<()> {
        let ok = self
            .dispatcher
            .call_variadic(spec, fixed_args, args)?
            .is_truthy();
        succeeded(spec, ok)
    }

    /// Check that a symbol is exported without calling it
    pub fn has_symbol(&self, name: &str) -> bool {
        !matches!(
            self.dispatcher.symbol(name),
            Err(CallError::SymbolNotFound { .. })
        )
    }
}

fn succeeded(spec: &str, ok: bool) -> PlResult<()> {
    if ok {
        Ok(())
    } else {
        Err(PlError::CallFailed {
            function: function_name(spec).to_string(),
        })
    }
}

fn function_name(spec: &str) -> &str {
    crate::ffi::split_symbol_spec(spec).0
}

/// Handle value as passed to the runtime
pub(crate) fn word(handle: usize) -> Value {
    Value::UInt(handle as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{Prototype, SymbolTable};
    use std::collections::BTreeMap;

    #[test]
    fn test_every_prototype_resolves() {
        let types = PlApi::swi_types();
        for (symbol, text) in SWI_PROTOTYPES {
            let proto = Prototype::parse(text).unwrap();
            let resolved = proto.resolve(&types);
            assert!(
                resolved.unresolved.is_empty(),
                "{} has unresolved names {:?}",
                symbol,
                resolved.unresolved
            );
        }
    }

    #[test]
    fn test_handle_types_are_words() {
        let types = PlApi::swi_types();
        assert_eq!(types.resolve("term_t"), Some(TypeDescriptor::word()));
        assert_eq!(types.resolve("module_t"), Some(TypeDescriptor::Pointer));
        assert!(types.contains("double"));
    }

    #[test]
    fn test_config_alias_and_prototype() {
        let mut config = EngineConfig::default();
        config.types.insert("my_handle".to_string(), "term_t".to_string());
        config
            .prototypes
            .insert("PL_unify".to_string(), "term_t,term_t->int".to_string());

        let api = PlApi::with_config(Box::new(SymbolTable::new("none")), &config).unwrap();
        assert_eq!(
            api.dispatcher().types().resolve("my_handle"),
            Some(TypeDescriptor::word())
        );
        assert_eq!(
            api.dispatcher().prototypes().lookup("PL_unify"),
            Some("term_t,term_t->int")
        );
    }

    #[test]
    fn test_config_alias_to_unknown_type() {
        let config = EngineConfig {
            types: BTreeMap::from([("h".to_string(), "nope_t".to_string())]),
            ..EngineConfig::default()
        };
        let err = PlApi::with_config(Box::new(SymbolTable::new("none")), &config).unwrap_err();
        assert!(matches!(err, PlError::UnknownTypeAlias { .. }));
    }

    #[test]
    fn test_missing_symbol() {
        let api = PlApi::new(Box::new(SymbolTable::new("empty")), false);
        assert!(!api.has_symbol("PL_new_term_ref"));
        let err = api.call("PL_new_term_ref", &[]).unwrap_err();
        assert!(err.is_unavailable());
    }
}
