//! Go type model and resolution.
//!
//! Declared entities live in one object arena ([`TypeStore::objects`]) and
//! every reference resolves to an index into it. Rewriting a function's
//! signature is therefore a single in-place patch that every later lookup
//! observes.

pub mod check;
pub mod format;
pub mod infer;
pub mod methods;
pub mod stdlib;
mod universe;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::syntax::ast::{ChanDir, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
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
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_numeric(self) -> bool {
        !self.is_boolean() && !self.is_string() && !matches!(self, BasicKind::UnsafePointer | BasicKind::UntypedNil)
    }

    /// Type an untyped constant takes when nothing else decides it.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn unnamed(ty: Type) -> Self {
        Self {
            name: String::new(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub type_params: Vec<ObjId>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub variadic: bool,
}

impl Signature {
    pub fn result_types(&self) -> Vec<Type> {
        self.results.iter().map(|r| r.ty.clone()).collect()
    }

    /// Type of a call to this signature: nothing, the single result, or a
    /// tuple.
    pub fn call_type(&self) -> Type {
        match self.results.len() {
            1 => self.results[0].ty.clone(),
            _ => Type::Tuple(self.result_types()),
        }
    }

    pub fn results_named(&self) -> bool {
        self.results.iter().any(|r| !r.name.is_empty() && r.name != "_")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceType {
    /// Method objects declared directly in this interface.
    pub methods: Vec<ObjId>,
    pub embeds: Vec<Type>,
    /// Type-set terms (`~int | string`) make this a constraint.
    pub has_terms: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Invalid,
    Basic(BasicKind),
    Named(NamedId, Vec<Type>),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array(Option<u64>, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(ChanDir, Box<Type>),
    Func(Box<Signature>),
    Struct(Vec<StructField>),
    Interface(InterfaceType),
    Tuple(Vec<Type>),
    TypeParam(ObjId),
}

impl Type {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn empty_interface() -> Type {
        Type::Interface(InterfaceType::default())
    }

    pub fn tuple_len(&self) -> usize {
        match self {
            Type::Tuple(items) => items.len(),
            _ => 1,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Var,
    Const,
    TypeName,
    Func,
    PkgName(PkgId),
    Builtin(Builtin),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Universe,
    Package,
    Local,
}

/// Receiver of a method object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receiver {
    /// Named type the method belongs to; `None` for methods of unnamed
    /// interface literals.
    pub named: Option<NamedId>,
    pub pointer: bool,
    pub interface: bool,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjKind,
    pub ty: Type,
    pub pkg: Option<PkgId>,
    pub level: Level,
    /// Declaring node: the `Decl` for functions and methods, the name
    /// identifier for everything else.
    pub decl: Option<NodeId>,
    pub recv: Option<Receiver>,
}

impl Object {
    pub fn is_func(&self) -> bool {
        self.kind == ObjKind::Func
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.ty.as_signature()
    }
}

#[derive(Debug, Clone)]
pub struct NamedType {
    pub obj: ObjId,
    pub underlying: Type,
    pub methods: Vec<ObjId>,
    pub type_params: Vec<ObjId>,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub members: IndexMap<String, ObjId>,
    pub imports: Vec<PkgId>,
    /// Imported but unknown: members never resolve.
    pub opaque: bool,
    pub stub: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Field,
    Method,
    MethodExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Method object; `None` for fields.
    pub obj: Option<ObjId>,
    /// Type of the operand left of the dot.
    pub recv: Type,
    pub ty: Type,
}

/// Per-node results of type checking, shared by every unit of a program.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub types: HashMap<NodeId, Type>,
    pub defs: HashMap<NodeId, ObjId>,
    pub uses: HashMap<NodeId, ObjId>,
    pub selections: HashMap<NodeId, Selection>,
}

impl TypeInfo {
    pub fn object_of(&self, ident: NodeId) -> Option<ObjId> {
        self.defs.get(&ident).or_else(|| self.uses.get(&ident)).copied()
    }

    pub fn type_of(&self, expr: NodeId) -> Option<&Type> {
        self.types.get(&expr)
    }

    /// Identifier nodes referring to `obj`.
    pub fn uses_of(&self, obj: ObjId) -> Vec<NodeId> {
        let mut uses: Vec<NodeId> = self
            .uses
            .iter()
            .filter(|(_, used)| **used == obj)
            .map(|(node, _)| *node)
            .collect();
        uses.sort();
        uses
    }
}

#[derive(Debug, Clone)]
pub struct TypeStore {
    pub objects: Vec<Object>,
    pub named: Vec<NamedType>,
    pub packages: Vec<Package>,
    pub universe: IndexMap<String, ObjId>,
    pub constraints: HashMap<ObjId, Type>,
    error_named: NamedId,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    pub fn new() -> Self {
        let mut store = TypeStore {
            objects: Vec::new(),
            named: Vec::new(),
            packages: Vec::new(),
            universe: IndexMap::new(),
            constraints: HashMap::new(),
            error_named: NamedId(0),
        };
        universe::populate(&mut store);
        store
    }

    pub fn obj(&self, id: ObjId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn obj_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objects[id.0 as usize]
    }

    pub fn new_obj(&mut self, obj: Object) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(obj);
        id
    }

    pub fn named(&self, id: NamedId) -> &NamedType {
        &self.named[id.0 as usize]
    }

    pub fn named_mut(&mut self, id: NamedId) -> &mut NamedType {
        &mut self.named[id.0 as usize]
    }

    pub fn new_named(&mut self, obj: ObjId) -> NamedId {
        let id = NamedId(self.named.len() as u32);
        self.named.push(NamedType {
            obj,
            underlying: Type::Invalid,
            methods: Vec::new(),
            type_params: Vec::new(),
        });
        id
    }

    pub fn package(&self, id: PkgId) -> &Package {
        &self.packages[id.0 as usize]
    }

    pub fn package_mut(&mut self, id: PkgId) -> &mut Package {
        &mut self.packages[id.0 as usize]
    }

    pub fn new_package(&mut self, path: &str, name: &str) -> PkgId {
        let id = PkgId(self.packages.len() as u32);
        self.packages.push(Package {
            path: path.to_string(),
            name: name.to_string(),
            members: IndexMap::new(),
            imports: Vec::new(),
            opaque: false,
            stub: false,
        });
        id
    }

    pub fn package_by_path(&self, path: &str) -> Option<PkgId> {
        self.packages
            .iter()
            .position(|p| p.path == path)
            .map(|i| PkgId(i as u32))
    }

    pub fn error_type(&self) -> Type {
        Type::Named(self.error_named, Vec::new())
    }

    pub fn is_error(&self, ty: &Type) -> bool {
        matches!(ty, Type::Named(id, _) if *id == self.error_named)
    }

    /// Whether a call to `sig` hands back an `error` in its last slot.
    pub fn ends_in_error(&self, sig: &Signature) -> bool {
        sig.results.last().is_some_and(|r| self.is_error(&r.ty))
    }

    pub fn universe_lookup(&self, name: &str) -> Option<ObjId> {
        self.universe.get(name).copied()
    }

    /// Underlying type with the named type's parameters substituted.
    pub fn underlying(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..16 {
            match current {
                Type::Named(id, args) => {
                    let named = self.named(id);
                    let under = named.underlying.clone();
                    current = if args.is_empty() || named.type_params.is_empty() {
                        under
                    } else {
                        infer::substitute(&under, &infer::bindings(&named.type_params, &args))
                    };
                }
                Type::TypeParam(obj) => {
                    return self
                        .constraints
                        .get(&obj)
                        .cloned()
                        .unwrap_or_else(Type::empty_interface);
                }
                other => return other,
            }
        }
        Type::Invalid
    }

    /// Pointer base when `ty` is a pointer, `ty` itself otherwise.
    pub fn deref(&self, ty: &Type) -> (Type, bool) {
        match ty {
            Type::Pointer(base) => ((**base).clone(), true),
            _ => (ty.clone(), false),
        }
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        matches!(self.underlying(ty), Type::Interface(_))
    }

    /// Signature of a function or method object, as currently recorded.
    pub fn signature(&self, obj: ObjId) -> Option<&Signature> {
        self.obj(obj).signature()
    }

    pub fn signature_mut(&mut self, obj: ObjId) -> Option<&mut Signature> {
        match &mut self.obj_mut(obj).ty {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Default type for untyped constants; everything else unchanged.
    pub fn default_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Basic(BasicKind::UntypedNil) => Type::Invalid,
            Type::Basic(kind) => Type::Basic(kind.default_kind()),
            other => other.clone(),
        }
    }
}
