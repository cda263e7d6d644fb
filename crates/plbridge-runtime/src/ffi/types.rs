//! FFI type system - marshalling descriptors and the type registry
//!
//! Defines:
//! - `ScalarKind`: fixed-width integer and floating point kinds
//! - `TypeDescriptor`: one marshalling strategy for an argument or return value
//! - `TypeRegistry`: symbolic type names (`"int"`, `"char_p"`, `"term_t"`, ...)
//!   mapped to descriptors
//!
//! Built-in names:
//! - `char byte int8` → i8, `ubyte uint8` → u8
//! - `short int16` → i16, `ushort uint16` → u16
//! - `int int32` → i32, `uint uint32` → u32
//! - `long` / `ulong` → the platform C `long` width
//! - `longlong int64` → i64, `ulonglong uint64` → u64
//! - `size_t` → pointer-sized unsigned
//! - `float` → f32, `double` → f64
//! - `void_p`, `char_p`, `wchar_p`, `int_p`, `uint_p`

use libffi::middle::Type;
use std::collections::HashMap;
use std::fmt;
use std::os::raw::c_long;

/// Platform `wchar_t`
#[cfg(windows)]
pub type WChar = u16;
/// Platform `wchar_t`
#[cfg(not(windows))]
pub type WChar = i32;

/// Fixed-width scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    /// Signed kind matching the platform C `long`
    pub fn c_long() -> Self {
        if std::mem::size_of::<c_long>() == 8 {
            ScalarKind::I64
        } else {
            ScalarKind::I32
        }
    }

    /// Unsigned kind matching the platform C `unsigned long`
    pub fn c_ulong() -> Self {
        if std::mem::size_of::<c_long>() == 8 {
            ScalarKind::U64
        } else {
            ScalarKind::U32
        }
    }

    /// Unsigned kind as wide as a pointer (`size_t`, `uintptr_t`)
    pub fn word() -> Self {
        if std::mem::size_of::<usize>() == 8 {
            ScalarKind::U64
        } else {
            ScalarKind::U32
        }
    }

    /// Kind matching the platform `wchar_t`
    pub fn wchar() -> Self {
        if cfg!(windows) {
            ScalarKind::U16
        } else {
            ScalarKind::I32
        }
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64
        )
    }

    /// Inclusive integer range representable by this kind
    ///
    /// Floating point kinds report the full `i128` range.
    pub fn int_range(&self) -> (i128, i128) {
        match self {
            ScalarKind::I8 => (i8::MIN as i128, i8::MAX as i128),
            ScalarKind::U8 => (0, u8::MAX as i128),
            ScalarKind::I16 => (i16::MIN as i128, i16::MAX as i128),
            ScalarKind::U16 => (0, u16::MAX as i128),
            ScalarKind::I32 => (i32::MIN as i128, i32::MAX as i128),
            ScalarKind::U32 => (0, u32::MAX as i128),
            ScalarKind::I64 => (i64::MIN as i128, i64::MAX as i128),
            ScalarKind::U64 => (0, u64::MAX as i128),
            ScalarKind::F32 | ScalarKind::F64 => (i128::MIN, i128::MAX),
        }
    }

    /// libffi type for this kind
    pub fn ffi_type(&self) -> Type {
        match self {
            ScalarKind::I8 => Type::i8(),
            ScalarKind::U8 => Type::u8(),
            ScalarKind::I16 => Type::i16(),
            ScalarKind::U16 => Type::u16(),
            ScalarKind::I32 => Type::i32(),
            ScalarKind::U32 => Type::u32(),
            ScalarKind::I64 => Type::i64(),
            ScalarKind::U64 => Type::u64(),
            ScalarKind::F32 => Type::f32(),
            ScalarKind::F64 => Type::f64(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::U8 => "u8",
            ScalarKind::I16 => "i16",
            ScalarKind::U16 => "u16",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }
}

/// Marshalling strategy for one argument or return value
///
/// Descriptors are immutable; the registry hands out copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// Fixed-size integer or float passed by value
    Scalar(ScalarKind),
    /// Opaque `void*`
    Pointer,
    /// NUL-terminated narrow string (`char*`)
    CharPtr,
    /// NUL-terminated wide string (`wchar_t*`)
    WideCharPtr,
    /// Pointer to a scalar (`int*`, out-parameters)
    PointerTo(ScalarKind),
}

impl TypeDescriptor {
    /// libffi type used to build call interfaces
    pub fn ffi_type(&self) -> Type {
        match self {
            TypeDescriptor::Scalar(kind) => kind.ffi_type(),
            TypeDescriptor::Pointer
            | TypeDescriptor::CharPtr
            | TypeDescriptor::WideCharPtr
            | TypeDescriptor::PointerTo(_) => Type::pointer(),
        }
    }

    /// Pointer-sized unsigned scalar, the representation of engine handles
    pub fn word() -> Self {
        TypeDescriptor::Scalar(ScalarKind::word())
    }

    pub fn is_pointer(&self) -> bool {
        !matches!(self, TypeDescriptor::Scalar(_))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => write!(f, "{}", kind.display_name()),
            TypeDescriptor::Pointer => write!(f, "void*"),
            TypeDescriptor::CharPtr => write!(f, "char*"),
            TypeDescriptor::WideCharPtr => write!(f, "wchar_t*"),
            TypeDescriptor::PointerTo(kind) => write!(f, "{}*", kind.display_name()),
        }
    }
}

/// Symbolic type name → descriptor table
///
/// Read-mostly: extended at construction, consulted on every call.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Registry with the built-in names
    pub fn new() -> Self {
        use ScalarKind::*;
        use TypeDescriptor::*;

        let builtins = [
            ("char", Scalar(I8)),
            ("byte", Scalar(I8)),
            ("int8", Scalar(I8)),
            ("ubyte", Scalar(U8)),
            ("uint8", Scalar(U8)),
            ("short", Scalar(I16)),
            ("int16", Scalar(I16)),
            ("ushort", Scalar(U16)),
            ("uint16", Scalar(U16)),
            ("int", Scalar(I32)),
            ("int32", Scalar(I32)),
            ("uint", Scalar(U32)),
            ("uint32", Scalar(U32)),
            ("long", Scalar(ScalarKind::c_long())),
            ("ulong", Scalar(ScalarKind::c_ulong())),
            ("longlong", Scalar(I64)),
            ("int64", Scalar(I64)),
            ("ulonglong", Scalar(U64)),
            ("uint64", Scalar(U64)),
            ("size_t", Scalar(ScalarKind::word())),
            ("float", Scalar(F32)),
            ("double", Scalar(F64)),
            ("void_p", Pointer),
            ("char_p", CharPtr),
            ("wchar_p", WideCharPtr),
            ("int_p", PointerTo(I32)),
            ("uint_p", PointerTo(U32)),
        ];

        Self {
            types: builtins
                .into_iter()
                .map(|(name, desc)| (name.to_string(), desc))
                .collect(),
        }
    }

    /// Built-ins plus a caller-supplied set; the extra set wins on conflicts
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (name, desc) in extra {
            registry.register(name, desc);
        }
        registry
    }

    /// Add or override a mapping
    pub fn register(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        self.types.insert(name.into(), descriptor);
    }

    /// Descriptor for `name`; unknown names yield `None`, never a default
    pub fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_resolve() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.resolve("int"),
            Some(TypeDescriptor::Scalar(ScalarKind::I32))
        );
        assert_eq!(
            registry.resolve("double"),
            Some(TypeDescriptor::Scalar(ScalarKind::F64))
        );
        assert_eq!(registry.resolve("char_p"), Some(TypeDescriptor::CharPtr));
        assert_eq!(registry.resolve("void_p"), Some(TypeDescriptor::Pointer));
        assert_eq!(
            registry.resolve("uint_p"),
            Some(TypeDescriptor::PointerTo(ScalarKind::U32))
        );
    }

    #[test]
    fn test_unknown_name_is_absent() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.resolve("bogus"), None);
        assert_eq!(registry.resolve(""), None);
        assert_eq!(registry.resolve("c_int"), None);
    }

    #[test]
    fn test_long_matches_platform() {
        let registry = TypeRegistry::new();
        let expected = ScalarKind::c_long();
        assert_eq!(registry.resolve("long"), Some(TypeDescriptor::Scalar(expected)));
        assert_eq!(expected.size(), std::mem::size_of::<c_long>());
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = TypeRegistry::new();
        registry.register("int", TypeDescriptor::Scalar(ScalarKind::I64));
        assert_eq!(
            registry.resolve("int"),
            Some(TypeDescriptor::Scalar(ScalarKind::I64))
        );
    }

    #[test]
    fn test_with_extra_merges() {
        let registry = TypeRegistry::with_extra([("term_t", TypeDescriptor::word())]);
        assert_eq!(registry.resolve("term_t"), Some(TypeDescriptor::word()));
        assert!(registry.contains("int"));
        assert_eq!(registry.len(), TypeRegistry::new().len() + 1);
    }

    #[test]
    fn test_word_matches_pointer_width() {
        assert_eq!(ScalarKind::word().size(), std::mem::size_of::<usize>());
        assert_eq!(ScalarKind::wchar().size(), std::mem::size_of::<WChar>());
    }

    #[test]
    fn test_int_ranges() {
        assert_eq!(ScalarKind::U8.int_range(), (0, 255));
        assert_eq!(ScalarKind::I16.int_range(), (-32768, 32767));
        assert!(ScalarKind::I32.is_signed());
        assert!(!ScalarKind::U64.is_signed());
        assert!(ScalarKind::F32.is_float());
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(TypeDescriptor::Scalar(ScalarKind::I32).to_string(), "i32");
        assert_eq!(TypeDescriptor::CharPtr.to_string(), "char*");
        assert_eq!(TypeDescriptor::PointerTo(ScalarKind::U32).to_string(), "u32*");
    }

    #[test]
    fn test_names_sorted() {
        let registry = TypeRegistry::new();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"wchar_p"));
    }
}
