//! Field and method lookup, method sets and structural interface
//! satisfaction.

use std::collections::HashSet;

use super::infer::{bindings, substitute_signature, Bindings};
use super::{NamedId, ObjId, Signature, Type, TypeStore};

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Field { ty: Type, indirect: bool },
    Method { obj: ObjId, sig: Signature, indirect: bool },
}

#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub name: String,
    pub obj: ObjId,
    pub sig: Signature,
}

const MAX_EMBED_DEPTH: usize = 8;

fn named_bindings(store: &TypeStore, ty: &Type) -> Bindings {
    match ty {
        Type::Named(id, args) if !args.is_empty() => bindings(&store.named(*id).type_params, args),
        _ => Bindings::new(),
    }
}

fn method_sig(store: &TypeStore, obj: ObjId, map: &Bindings) -> Signature {
    store
        .signature(obj)
        .map(|sig| substitute_signature(sig, map))
        .unwrap_or_default()
}

/// Resolves `name` on a value of type `ty`, searching promoted fields and
/// methods breadth first through embedded fields.
pub fn lookup(store: &TypeStore, ty: &Type, name: &str) -> Option<Lookup> {
    let (base, pointer) = store.deref(ty);
    let mut level = vec![(base, pointer)];
    let mut seen: HashSet<NamedId> = HashSet::new();
    for _ in 0..MAX_EMBED_DEPTH {
        let mut next = Vec::new();
        for (current, indirect) in &level {
            if let Type::Named(id, _) = current {
                if !seen.insert(*id) {
                    continue;
                }
                let map = named_bindings(store, current);
                if let Some(&obj) = store.named(*id).methods.iter().find(|m| store.obj(**m).name == name) {
                    return Some(Lookup::Method {
                        obj,
                        sig: method_sig(store, obj, &map),
                        indirect: *indirect,
                    });
                }
            }
            match store.underlying(current) {
                Type::Struct(fields) => {
                    if let Some(field) = fields.iter().find(|f| f.name == name) {
                        return Some(Lookup::Field {
                            ty: field.ty.clone(),
                            indirect: *indirect,
                        });
                    }
                    for field in fields.iter().filter(|f| f.embedded) {
                        let (embedded, through_pointer) = store.deref(&field.ty);
                        next.push((embedded, *indirect || through_pointer));
                    }
                }
                Type::Interface(_) => {
                    if let Some(entry) = interface_methods(store, current).into_iter().find(|m| m.name == name) {
                        return Some(Lookup::Method {
                            obj: entry.obj,
                            sig: entry.sig,
                            indirect: *indirect,
                        });
                    }
                }
                _ => {}
            }
        }
        if next.is_empty() {
            return None;
        }
        level = next;
    }
    None
}

/// Flattened method list of an interface type, embedded interfaces included.
pub fn interface_methods(store: &TypeStore, ty: &Type) -> Vec<MethodEntry> {
    let mut out: Vec<MethodEntry> = Vec::new();
    collect_interface_methods(store, ty, &mut out, 0);
    out
}

fn collect_interface_methods(store: &TypeStore, ty: &Type, out: &mut Vec<MethodEntry>, depth: usize) {
    if depth > MAX_EMBED_DEPTH {
        return;
    }
    let map = named_bindings(store, ty);
    let Type::Interface(iface) = store.underlying(ty) else {
        return;
    };
    for &obj in &iface.methods {
        let name = &store.obj(obj).name;
        if out.iter().all(|m| &m.name != name) {
            out.push(MethodEntry {
                name: name.clone(),
                obj,
                sig: method_sig(store, obj, &map),
            });
        }
    }
    for embed in &iface.embeds {
        collect_interface_methods(store, embed, out, depth + 1);
    }
}

/// Methods callable on `ty`. Pointer-receiver methods count when `ty` is a
/// pointer or `pointer_ok` is set.
pub fn method_set(store: &TypeStore, ty: &Type, pointer_ok: bool) -> Vec<MethodEntry> {
    if store.is_interface(ty) {
        return interface_methods(store, ty);
    }
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    collect_method_set(store, ty, pointer_ok, &mut out, &mut seen, 0);
    out
}

fn collect_method_set(
    store: &TypeStore,
    ty: &Type,
    pointer_ok: bool,
    out: &mut Vec<MethodEntry>,
    seen: &mut HashSet<NamedId>,
    depth: usize,
) {
    if depth > MAX_EMBED_DEPTH {
        return;
    }
    let (base, pointer) = store.deref(ty);
    let pointer_ok = pointer_ok || pointer;
    if let Type::Named(id, _) = &base {
        if !seen.insert(*id) {
            return;
        }
        let map = named_bindings(store, &base);
        for &obj in &store.named(*id).methods {
            let method = store.obj(obj);
            let by_pointer = method.recv.is_some_and(|r| r.pointer);
            if (!by_pointer || pointer_ok) && out.iter().all(|m: &MethodEntry| m.name != method.name) {
                out.push(MethodEntry {
                    name: method.name.clone(),
                    obj,
                    sig: method_sig(store, obj, &map),
                });
            }
        }
    }
    match store.underlying(&base) {
        Type::Struct(fields) => {
            for field in fields.iter().filter(|f| f.embedded) {
                if store.is_interface(&field.ty) {
                    for entry in interface_methods(store, &field.ty) {
                        if out.iter().all(|m| m.name != entry.name) {
                            out.push(entry);
                        }
                    }
                } else {
                    collect_method_set(store, &field.ty, pointer_ok, out, seen, depth + 1);
                }
            }
        }
        Type::Interface(_) => {
            for entry in interface_methods(store, &base) {
                if out.iter().all(|m| m.name != entry.name) {
                    out.push(entry);
                }
            }
        }
        _ => {}
    }
}

/// Structural satisfaction: every method of `iface` is present on `ty`
/// with an identical signature.
pub fn implements(store: &TypeStore, ty: &Type, iface: &Type, pointer_ok: bool) -> bool {
    match store.underlying(iface) {
        Type::Interface(def) if !def.has_terms => {}
        _ => return false,
    }
    let wanted = interface_methods(store, iface);
    let have = method_set(store, ty, pointer_ok);
    wanted.iter().all(|want| {
        have.iter()
            .any(|m| m.name == want.name && signatures_identical(store, &m.sig, &want.sig))
    })
}

pub fn signatures_identical(store: &TypeStore, a: &Signature, b: &Signature) -> bool {
    a.variadic == b.variadic
        && a.params.len() == b.params.len()
        && a.results.len() == b.results.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| identical(store, &x.ty, &y.ty))
        && a.results.iter().zip(&b.results).all(|(x, y)| identical(store, &x.ty, &y.ty))
}

pub fn identical(store: &TypeStore, a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Basic(x), Type::Basic(y)) => x == y,
        (Type::Named(x, xa), Type::Named(y, ya)) => {
            x == y && xa.len() == ya.len() && xa.iter().zip(ya).all(|(p, q)| identical(store, p, q))
        }
        (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => identical(store, x, y),
        (Type::Array(xl, x), Type::Array(yl, y)) => xl == yl && identical(store, x, y),
        (Type::Map(xk, xv), Type::Map(yk, yv)) => identical(store, xk, yk) && identical(store, xv, yv),
        (Type::Chan(xd, x), Type::Chan(yd, y)) => xd == yd && identical(store, x, y),
        (Type::Func(x), Type::Func(y)) => signatures_identical(store, x, y),
        (Type::Struct(xf), Type::Struct(yf)) => {
            xf.len() == yf.len()
                && xf.iter().zip(yf).all(|(p, q)| {
                    p.name == q.name && p.embedded == q.embedded && identical(store, &p.ty, &q.ty)
                })
        }
        (Type::Interface(_), Type::Interface(_)) => {
            let xm = interface_methods(store, a);
            let ym = interface_methods(store, b);
            xm.len() == ym.len()
                && xm.iter().all(|m| {
                    ym.iter()
                        .any(|n| n.name == m.name && signatures_identical(store, &m.sig, &n.sig))
                })
        }
        (Type::Tuple(x), Type::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| identical(store, p, q))
        }
        (Type::TypeParam(x), Type::TypeParam(y)) => x == y,
        _ => false,
    }
}
