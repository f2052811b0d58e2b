//! Type-parameter substitution and argument-driven inference.

use std::collections::HashMap;

use super::{InterfaceType, ObjId, Param, Signature, StructField, Type};

pub type Bindings = HashMap<ObjId, Type>;

pub fn bindings(params: &[ObjId], args: &[Type]) -> Bindings {
    params.iter().copied().zip(args.iter().cloned()).collect()
}

pub fn substitute(ty: &Type, map: &Bindings) -> Type {
    if map.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeParam(obj) => map.get(obj).cloned().unwrap_or_else(|| ty.clone()),
        Type::Named(id, args) => Type::Named(*id, args.iter().map(|a| substitute(a, map)).collect()),
        Type::Pointer(base) => Type::Pointer(Box::new(substitute(base, map))),
        Type::Slice(elem) => Type::Slice(Box::new(substitute(elem, map))),
        Type::Array(len, elem) => Type::Array(*len, Box::new(substitute(elem, map))),
        Type::Map(key, value) => Type::Map(
            Box::new(substitute(key, map)),
            Box::new(substitute(value, map)),
        ),
        Type::Chan(dir, elem) => Type::Chan(*dir, Box::new(substitute(elem, map))),
        Type::Func(sig) => Type::Func(Box::new(substitute_signature(sig, map))),
        Type::Struct(fields) => Type::Struct(
            fields
                .iter()
                .map(|f| StructField {
                    name: f.name.clone(),
                    ty: substitute(&f.ty, map),
                    embedded: f.embedded,
                })
                .collect(),
        ),
        Type::Interface(iface) => Type::Interface(InterfaceType {
            methods: iface.methods.clone(),
            embeds: iface.embeds.iter().map(|e| substitute(e, map)).collect(),
            has_terms: iface.has_terms,
        }),
        Type::Tuple(items) => Type::Tuple(items.iter().map(|t| substitute(t, map)).collect()),
        Type::Invalid | Type::Basic(_) => ty.clone(),
    }
}

pub fn substitute_signature(sig: &Signature, map: &Bindings) -> Signature {
    let params = |list: &[Param]| {
        list.iter()
            .map(|p| Param {
                name: p.name.clone(),
                ty: substitute(&p.ty, map),
            })
            .collect()
    };
    Signature {
        type_params: sig
            .type_params
            .iter()
            .copied()
            .filter(|p| !map.contains_key(p))
            .collect(),
        params: params(&sig.params),
        results: params(&sig.results),
        variadic: sig.variadic,
    }
}

/// Binds type parameters in `param` so that it matches `arg`. Mismatches
/// are ignored; the first binding for each parameter wins.
pub fn unify(param: &Type, arg: &Type, targets: &[ObjId], out: &mut Bindings) {
    match (param, arg) {
        (Type::TypeParam(obj), _) if targets.contains(obj) => {
            if !arg.is_invalid() {
                out.entry(*obj).or_insert_with(|| arg.clone());
            }
        }
        (Type::Pointer(p), Type::Pointer(a))
        | (Type::Slice(p), Type::Slice(a))
        | (Type::Array(_, p), Type::Array(_, a))
        | (Type::Chan(_, p), Type::Chan(_, a)) => unify(p, a, targets, out),
        (Type::Map(pk, pv), Type::Map(ak, av)) => {
            unify(pk, ak, targets, out);
            unify(pv, av, targets, out);
        }
        (Type::Named(pid, pargs), Type::Named(aid, aargs)) if pid == aid => {
            for (p, a) in pargs.iter().zip(aargs) {
                unify(p, a, targets, out);
            }
        }
        (Type::Func(p), Type::Func(a)) => {
            for (pp, ap) in p.params.iter().zip(&a.params) {
                unify(&pp.ty, &ap.ty, targets, out);
            }
            for (pr, ar) in p.results.iter().zip(&a.results) {
                unify(&pr.ty, &ar.ty, targets, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasicKind;

    #[test]
    fn unify_binds_through_slices_and_maps() {
        let t = ObjId(900);
        let k = ObjId(901);
        let param = Type::Map(Box::new(Type::TypeParam(k)), Box::new(Type::Slice(Box::new(Type::TypeParam(t)))));
        let arg = Type::Map(
            Box::new(Type::Basic(BasicKind::String)),
            Box::new(Type::Slice(Box::new(Type::Basic(BasicKind::Int)))),
        );
        let mut out = Bindings::new();
        unify(&param, &arg, &[t, k], &mut out);
        assert_eq!(out.get(&t), Some(&Type::Basic(BasicKind::Int)));
        assert_eq!(out.get(&k), Some(&Type::Basic(BasicKind::String)));
        assert_eq!(
            substitute(&Type::Pointer(Box::new(Type::TypeParam(t))), &out),
            Type::Pointer(Box::new(Type::Basic(BasicKind::Int)))
        );
    }
}
