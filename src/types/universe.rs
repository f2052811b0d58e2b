use super::*;

const BASICS: &[(&str, BasicKind)] = &[
    ("bool", BasicKind::Bool),
    ("int", BasicKind::Int),
    ("int8", BasicKind::Int8),
    ("int16", BasicKind::Int16),
    ("int32", BasicKind::Int32),
    ("int64", BasicKind::Int64),
    ("uint", BasicKind::Uint),
    ("uint8", BasicKind::Uint8),
    ("uint16", BasicKind::Uint16),
    ("uint32", BasicKind::Uint32),
    ("uint64", BasicKind::Uint64),
    ("uintptr", BasicKind::Uintptr),
    ("float32", BasicKind::Float32),
    ("float64", BasicKind::Float64),
    ("complex64", BasicKind::Complex64),
    ("complex128", BasicKind::Complex128),
    ("string", BasicKind::String),
    ("byte", BasicKind::Uint8),
    ("rune", BasicKind::Int32),
];

const BUILTINS: &[(&str, Builtin)] = &[
    ("append", Builtin::Append),
    ("cap", Builtin::Cap),
    ("clear", Builtin::Clear),
    ("close", Builtin::Close),
    ("complex", Builtin::Complex),
    ("copy", Builtin::Copy),
    ("delete", Builtin::Delete),
    ("imag", Builtin::Imag),
    ("len", Builtin::Len),
    ("make", Builtin::Make),
    ("max", Builtin::Max),
    ("min", Builtin::Min),
    ("new", Builtin::New),
    ("panic", Builtin::Panic),
    ("print", Builtin::Print),
    ("println", Builtin::Println),
    ("real", Builtin::Real),
    ("recover", Builtin::Recover),
];

fn universe_obj(name: &str, kind: ObjKind, ty: Type) -> Object {
    Object {
        name: name.to_string(),
        kind,
        ty,
        pkg: None,
        level: Level::Universe,
        decl: None,
        recv: None,
    }
}

fn insert(store: &mut TypeStore, obj: Object) -> ObjId {
    let name = obj.name.clone();
    let id = store.new_obj(obj);
    store.universe.insert(name, id);
    id
}

pub(super) fn populate(store: &mut TypeStore) {

    for (name, kind) in BASICS {
        insert(store, universe_obj(name, ObjKind::TypeName, Type::Basic(*kind)));
    }
    insert(store, universe_obj("any", ObjKind::TypeName, Type::empty_interface()));

    let error_obj = insert(store, universe_obj("error", ObjKind::TypeName, Type::Invalid));
    let error_named = store.new_named(error_obj);
    store.obj_mut(error_obj).ty = Type::Named(error_named, Vec::new());
    let method = store.new_obj(Object {
        recv: Some(Receiver {
            named: Some(error_named),
            pointer: false,
            interface: true,
        }),
        ..universe_obj(
            "Error",
            ObjKind::Func,
            Type::Func(Box::new(Signature {
                results: vec![Param::unnamed(Type::Basic(BasicKind::String))],
                ..Signature::default()
            })),
        )
    });
    store.named_mut(error_named).underlying = Type::Interface(InterfaceType {
        methods: vec![method],
        ..InterfaceType::default()
    });
    store.error_named = error_named;

    let comparable = insert(store, universe_obj("comparable", ObjKind::TypeName, Type::Invalid));
    let comparable_named = store.new_named(comparable);
    store.obj_mut(comparable).ty = Type::Named(comparable_named, Vec::new());
    store.named_mut(comparable_named).underlying = Type::Interface(InterfaceType {
        has_terms: true,
        ..InterfaceType::default()
    });

    for name in ["true", "false"] {
        insert(store, universe_obj(name, ObjKind::Const, Type::Basic(BasicKind::UntypedBool)));
    }
    insert(store, universe_obj("iota", ObjKind::Const, Type::Basic(BasicKind::UntypedInt)));
    insert(store, universe_obj("nil", ObjKind::Nil, Type::Basic(BasicKind::UntypedNil)));
    for (name, builtin) in BUILTINS {
        insert(store, universe_obj(name, ObjKind::Builtin(*builtin), Type::Invalid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_an_interface_with_one_method() {
        let store = TypeStore::new();
        let error = store.obj(store.universe_lookup("error").expect("error")).ty.clone();
        assert!(store.is_error(&error));
        match store.underlying(&error) {
            Type::Interface(iface) => {
                assert_eq!(iface.methods.len(), 1);
                assert_eq!(store.obj(iface.methods[0]).name, "Error");
            }
            other => panic!("unexpected underlying {other:?}"),
        }
    }
}
