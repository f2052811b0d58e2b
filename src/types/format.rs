//! Canonical type text.

use super::{PkgId, Signature, Type, TypeStore};
use crate::syntax::ast::ChanDir;

/// Maps a package to the prefix used for its names: `Some("")` for the
/// package being written, `Some(name)` for an import, `None` when the
/// package is not reachable from the target file.
pub trait Qualifier {
    fn qualify(&self, pkg: PkgId) -> Option<String>;
}

impl<F> Qualifier for F
where
    F: Fn(PkgId) -> Option<String>,
{
    fn qualify(&self, pkg: PkgId) -> Option<String> {
        self(pkg)
    }
}

/// Qualifies every name with its full import path.
pub struct PathQualifier<'a>(pub &'a TypeStore);

impl Qualifier for PathQualifier<'_> {
    fn qualify(&self, pkg: PkgId) -> Option<String> {
        Some(self.0.package(pkg).path.clone())
    }
}

/// Human-readable text with path-qualified names, for diagnostics.
pub fn describe(store: &TypeStore, ty: &Type) -> String {
    type_string(store, ty, &PathQualifier(store)).unwrap_or_else(|| "invalid type".to_string())
}

/// Go source text for `ty`, or `None` when a name cannot be written from
/// the qualifier's point of view.
pub fn type_string(store: &TypeStore, ty: &Type, qual: &dyn Qualifier) -> Option<String> {
    let text = match ty {
        Type::Invalid => return None,
        Type::Basic(kind) => {
            if kind.is_untyped() {
                kind.default_kind().name().to_string()
            } else {
                kind.name().to_string()
            }
        }
        Type::Named(id, args) => {
            let obj = store.obj(store.named(*id).obj);
            let mut text = match obj.pkg {
                Some(pkg) => {
                    let prefix = qual.qualify(pkg)?;
                    if prefix.is_empty() {
                        obj.name.clone()
                    } else {
                        format!("{prefix}.{}", obj.name)
                    }
                }
                None => obj.name.clone(),
            };
            if !args.is_empty() {
                text.push('[');
                text.push_str(&list(store, args, qual)?);
                text.push(']');
            }
            text
        }
        Type::Pointer(base) => format!("*{}", type_string(store, base, qual)?),
        Type::Slice(elem) => format!("[]{}", type_string(store, elem, qual)?),
        Type::Array(len, elem) => format!("[{}]{}", len.unwrap_or(0), type_string(store, elem, qual)?),
        Type::Map(key, value) => format!(
            "map[{}]{}",
            type_string(store, key, qual)?,
            type_string(store, value, qual)?
        ),
        Type::Chan(dir, elem) => {
            let prefix = match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            };
            format!("{prefix}{}", type_string(store, elem, qual)?)
        }
        Type::Func(sig) => format!("func{}", signature_string(store, sig, qual)?),
        Type::Struct(fields) => {
            if fields.is_empty() {
                "struct{}".to_string()
            } else {
                let parts = fields
                    .iter()
                    .map(|f| {
                        let ty = type_string(store, &f.ty, qual)?;
                        Some(if f.embedded { ty } else { format!("{} {ty}", f.name) })
                    })
                    .collect::<Option<Vec<_>>>()?;
                format!("struct{{ {} }}", parts.join("; "))
            }
        }
        Type::Interface(iface) => {
            if iface.methods.is_empty() && iface.embeds.is_empty() {
                "interface{}".to_string()
            } else {
                let mut parts = Vec::new();
                for embed in &iface.embeds {
                    parts.push(type_string(store, embed, qual)?);
                }
                for &method in &iface.methods {
                    let obj = store.obj(method);
                    let sig = obj.signature()?;
                    parts.push(format!("{}{}", obj.name, signature_string(store, sig, qual)?));
                }
                format!("interface{{ {} }}", parts.join("; "))
            }
        }
        Type::Tuple(items) => format!("({})", list(store, items, qual)?),
        Type::TypeParam(obj) => store.obj(*obj).name.clone(),
    };
    Some(text)
}

fn list(store: &TypeStore, items: &[Type], qual: &dyn Qualifier) -> Option<String> {
    let parts = items
        .iter()
        .map(|t| type_string(store, t, qual))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(", "))
}

pub fn signature_string(store: &TypeStore, sig: &Signature, qual: &dyn Qualifier) -> Option<String> {
    let mut params = Vec::new();
    for (i, param) in sig.params.iter().enumerate() {
        let ty = if sig.variadic && i + 1 == sig.params.len() {
            match &param.ty {
                Type::Slice(elem) => format!("...{}", type_string(store, elem, qual)?),
                other => type_string(store, other, qual)?,
            }
        } else {
            type_string(store, &param.ty, qual)?
        };
        params.push(ty);
    }
    let mut text = format!("({})", params.join(", "));
    match sig.results.len() {
        0 => {}
        1 if sig.results[0].name.is_empty() => {
            text.push(' ');
            text.push_str(&type_string(store, &sig.results[0].ty, qual)?);
        }
        _ => {
            let results = sig.result_types();
            text.push_str(&format!(" ({})", list(store, &results, qual)?));
        }
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasicKind;

    #[test]
    fn composite_types_render_like_go() {
        let store = TypeStore::new();
        let error = store.error_type();
        let ty = Type::Map(
            Box::new(Type::Basic(BasicKind::String)),
            Box::new(Type::Slice(Box::new(Type::Pointer(Box::new(error))))),
        );
        assert_eq!(describe(&store, &ty), "map[string][]*error");
        let untyped = Type::Basic(BasicKind::UntypedFloat);
        assert_eq!(describe(&store, &untyped), "float64");
    }
}
