use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use super::decl::{DeclKey, TypeDecl};
use crate::frontend::struct_tag::StructTag;

/// Structured model of a type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Named(NamedType),
    Struct(StructType),
    Map(MapType),
    List(ListType),
    Pointer(Box<Type>),
    /// Present-or-absent wrapper, distinct from a pointer.
    Option(Box<Type>),
    Builtin(BuiltinKind),
    Func(FuncSig),
    Interface(InterfaceType),
    TypeParam(TypeParamRef),
}

/// Reference to a declared type, with its generic arguments. The
/// declaration itself is owned by the analysis' declaration cache.
#[derive(Clone)]
pub struct NamedType {
    pub key: DeclKey,
    pub decl: Weak<TypeDecl>,
    pub args: Vec<Type>,
}

impl NamedType {
    #[must_use]
    pub fn new(decl: &Arc<TypeDecl>, args: Vec<Type>) -> Self {
        Self {
            key: decl.key.clone(),
            decl: Arc::downgrade(decl),
            args,
        }
    }

    /// The referenced declaration, while the analysis that produced it is
    /// alive.
    #[must_use]
    pub fn decl(&self) -> Option<Arc<TypeDecl>> {
        self.decl.upgrade()
    }
}

// Declarations may refer to themselves; compare and print by key.
impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.args == other.args
    }
}

impl fmt::Debug for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedType")
            .field("key", &self.key)
            .field("args", &self.args)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<StructField>,
}

impl StructType {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    /// Declared name; for embedded fields, the embedded type's name.
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
    /// Raw tag text without the surrounding quotes.
    pub raw_tag: Option<String>,
    pub tag: StructTag,
    pub doc: Option<String>,
}

impl StructField {
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    pub key: Box<Type>,
    pub value: Box<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLen {
    /// A slice.
    Unbounded,
    Fixed(u64),
    /// Array whose length is not an integer literal.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListType {
    pub elem: Box<Type>,
    pub len: ListLen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Time,
    Uuid,
    Json,
    UserId,
    Error,
    /// Parses, but is rejected wherever the type is used.
    Unsupported(&'static str),
}

impl BuiltinKind {
    /// Predeclared identifier spelling, if `name` is one.
    #[must_use]
    pub fn from_predeclared(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" | "rune" => Self::Int32,
            "int64" => Self::Int64,
            "uint" => Self::Uint,
            "uint8" | "byte" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "string" => Self::String,
            "error" => Self::Error,
            "uintptr" => Self::Unsupported("uintptr"),
            "complex64" => Self::Unsupported("complex64"),
            "complex128" => Self::Unsupported("complex128"),
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "[]byte",
            Self::Time => "time.Time",
            Self::Uuid => "uuid.UUID",
            Self::Json => "json.RawMessage",
            Self::UserId => "auth.UID",
            Self::Error => "error",
            Self::Unsupported(spelling) => spelling,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter is `...T`; its type is recorded as `[]T`.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethod {
    pub name: String,
    pub sig: FuncSig,
    pub doc: Option<String>,
}

/// Interfaces are modeled loosely: embedded interfaces, methods, and the
/// union terms of constraint interfaces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceType {
    pub embeds: Vec<Type>,
    pub methods: Vec<InterfaceMethod>,
    pub terms: Vec<Type>,
}

impl InterfaceType {
    /// `interface{}` / `any`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeds.is_empty() && self.methods.is_empty() && self.terms.is_empty()
    }
}

/// Position of a type parameter in the owning declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamRef {
    pub index: usize,
    pub name: String,
}

impl Type {
    #[must_use]
    pub fn any() -> Self {
        Type::Interface(InterfaceType::default())
    }

    #[must_use]
    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    #[must_use]
    pub fn slice(elem: Type) -> Self {
        Type::List(ListType {
            elem: Box::new(elem),
            len: ListLen::Unbounded,
        })
    }

    #[must_use]
    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(st) => Some(st),
            _ => None,
        }
    }

    /// Spelling of the first unsupported builtin reachable from this type,
    /// following named declarations once each.
    #[must_use]
    pub fn find_unsupported(&self) -> Option<&'static str> {
        let mut seen = HashSet::new();
        self.find_unsupported_in(&mut seen)
    }

    fn find_unsupported_in(&self, seen: &mut HashSet<DeclKey>) -> Option<&'static str> {
        match self {
            Type::Builtin(BuiltinKind::Unsupported(spelling)) => Some(spelling),
            Type::Builtin(_) | Type::TypeParam(_) => None,
            Type::Named(named) => {
                if let Some(found) = named.args.iter().find_map(|arg| arg.find_unsupported_in(seen)) {
                    return Some(found);
                }
                if !seen.insert(named.key.clone()) {
                    return None;
                }
                named.decl()?.underlying()?.find_unsupported_in(seen)
            }
            Type::Struct(st) => st.fields.iter().find_map(|field| field.ty.find_unsupported_in(seen)),
            Type::Map(map) => map
                .key
                .find_unsupported_in(seen)
                .or_else(|| map.value.find_unsupported_in(seen)),
            Type::List(list) => list.elem.find_unsupported_in(seen),
            Type::Pointer(elem) | Type::Option(elem) => elem.find_unsupported_in(seen),
            Type::Func(sig) => sig.find_unsupported_in(seen),
            Type::Interface(iface) => iface
                .embeds
                .iter()
                .chain(&iface.terms)
                .find_map(|ty| ty.find_unsupported_in(seen))
                .or_else(|| {
                    iface
                        .methods
                        .iter()
                        .find_map(|method| method.sig.find_unsupported_in(seen))
                }),
        }
    }
}

impl FuncSig {
    fn find_unsupported_in(&self, seen: &mut HashSet<DeclKey>) -> Option<&'static str> {
        self.params
            .iter()
            .chain(&self.results)
            .find_map(|param| param.ty.find_unsupported_in(seen))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(named) => {
                write!(f, "{}.{}", named.key.package.last_segment(), named.key.name)?;
                write_list(f, "[", &named.args, "]")
            }
            Type::Struct(st) => {
                f.write_str("struct{")?;
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if let Some(tag) = &field.raw_tag {
                        write!(f, " {tag:?}")?;
                    }
                }
                f.write_str("}")
            }
            Type::Map(map) => write!(f, "map[{}]{}", map.key, map.value),
            Type::List(list) => match list.len {
                ListLen::Unbounded => write!(f, "[]{}", list.elem),
                ListLen::Fixed(len) => write!(f, "[{len}]{}", list.elem),
                ListLen::Unknown => write!(f, "[?]{}", list.elem),
            },
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Option(elem) => write!(f, "option[{elem}]"),
            Type::Builtin(kind) => f.write_str(kind.as_str()),
            Type::Func(sig) => write!(f, "func{sig}"),
            Type::Interface(iface) if iface.is_empty() => f.write_str("any"),
            Type::Interface(iface) => {
                f.write_str("interface{")?;
                let mut first = true;
                let mut sep = |f: &mut fmt::Formatter<'_>| {
                    if std::mem::take(&mut first) {
                        Ok(())
                    } else {
                        f.write_str("; ")
                    }
                };
                for embed in &iface.embeds {
                    sep(f)?;
                    write!(f, "{embed}")?;
                }
                for method in &iface.methods {
                    sep(f)?;
                    write!(f, "{}{}", method.name, method.sig)?;
                }
                if !iface.terms.is_empty() {
                    sep(f)?;
                    for (i, term) in iface.terms.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" | ")?;
                        }
                        write!(f, "{term}")?;
                    }
                }
                f.write_str("}")
            }
            Type::TypeParam(param) => f.write_str(&param.name),
        }
    }
}

impl fmt::Display for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = &param.name {
                write!(f, "{name} ")?;
            }
            match &param.ty {
                Type::List(list) if self.variadic && i == last => write!(f, "...{}", list.elem)?,
                ty => write!(f, "{ty}")?,
            }
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [Param { name: None, ty }] => write!(f, " {ty}"),
            results => {
                f.write_str(" (")?;
                for (i, result) in results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(name) = &result.name {
                        write!(f, "{name} ")?;
                    }
                    write!(f, "{}", result.ty)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, open: &str, items: &[Type], close: &str) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_aliases_share_kinds() {
        assert_eq!(BuiltinKind::from_predeclared("byte"), Some(BuiltinKind::Uint8));
        assert_eq!(BuiltinKind::from_predeclared("rune"), Some(BuiltinKind::Int32));
        assert_eq!(
            BuiltinKind::from_predeclared("uintptr"),
            Some(BuiltinKind::Unsupported("uintptr"))
        );
        assert_eq!(BuiltinKind::from_predeclared("Foo"), None);
    }

    #[test]
    fn unsupported_builtins_are_found_inside_containers() {
        let ty = Type::Map(MapType {
            key: Box::new(Type::Builtin(BuiltinKind::String)),
            value: Box::new(Type::slice(Type::Builtin(BuiltinKind::Unsupported("complex128")))),
        });
        assert_eq!(ty.find_unsupported(), Some("complex128"));
        assert_eq!(Type::pointer(Type::Builtin(BuiltinKind::Int)).find_unsupported(), None);
    }

    #[test]
    fn displays_go_like_syntax() {
        let sig = FuncSig {
            params: vec![
                Param {
                    name: Some("format".into()),
                    ty: Type::Builtin(BuiltinKind::String),
                },
                Param {
                    name: Some("args".into()),
                    ty: Type::slice(Type::any()),
                },
            ],
            results: vec![Param {
                name: None,
                ty: Type::Builtin(BuiltinKind::Error),
            }],
            variadic: true,
        };
        assert_eq!(Type::Func(sig).to_string(), "func(format string, args ...any) error");
        let array = Type::List(ListType {
            elem: Box::new(Type::Builtin(BuiltinKind::Bytes)),
            len: ListLen::Fixed(4),
        });
        assert_eq!(array.to_string(), "[4][]byte");
    }
}
