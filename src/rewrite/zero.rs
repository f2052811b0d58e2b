//! Zero values for the results preceding the error on a failure path.

use std::collections::HashMap;

use super::snippet;
use crate::core::errors::{Error, Result};
use crate::loader::{FileRef, Program};
use crate::syntax::ast::IdGen;
use crate::types::format::{describe, type_string, Qualifier};
use crate::types::{BasicKind, PkgId, Type, TypeStore};

/// Names packages the way one file refers to them.
pub struct FileQualifier {
    own: PkgId,
    imports: HashMap<PkgId, String>,
}

impl FileQualifier {
    pub fn new(program: &Program, file: FileRef) -> Self {
        let store = &program.store;
        let own = program.units[file.unit].pkg;
        let mut imports = HashMap::new();
        for import in program.file(file).ast.imports() {
            let Some(pkg) = store.package_by_path(import.unquoted_path()) else {
                continue;
            };
            let name = match &import.name {
                Some(alias) if alias.name == "_" => continue,
                Some(alias) if alias.name == "." => String::new(),
                Some(alias) => alias.name.clone(),
                None => store.package(pkg).name.clone(),
            };
            imports.insert(pkg, name);
        }
        Self { own, imports }
    }
}

impl Qualifier for FileQualifier {
    fn qualify(&self, pkg: PkgId) -> Option<String> {
        if pkg == self.own {
            return Some(String::new());
        }
        self.imports.get(&pkg).cloned()
    }
}

/// Go text for the zero value of `ty`, as written from `qual`'s file.
pub fn zero_value(store: &TypeStore, ty: &Type, qual: &dyn Qualifier) -> Result<String> {
    if let Type::TypeParam(obj) = ty {
        return Ok(format!("*new({})", store.obj(*obj).name));
    }
    let text = match store.underlying(ty) {
        Type::Basic(kind) if kind.is_boolean() => "false".to_string(),
        Type::Basic(kind) if kind.is_string() => "\"\"".to_string(),
        Type::Basic(BasicKind::UnsafePointer | BasicKind::UntypedNil) => "nil".to_string(),
        Type::Basic(_) => "0".to_string(),
        Type::Pointer(_) | Type::Slice(_) | Type::Map(..) | Type::Chan(..) | Type::Func(_) | Type::Interface(_) => {
            "nil".to_string()
        }
        Type::Struct(_) | Type::Array(..) => {
            let name = type_string(store, ty, qual).ok_or_else(|| {
                Error::Generation(format!("{} cannot be named from this file", describe(store, ty)))
            })?;
            let literal = format!("{name}{{}}");
            snippet::expression(&literal, &mut IdGen::default())?;
            literal
        }
        Type::Invalid | Type::Tuple(_) | Type::Named(..) | Type::TypeParam(_) => {
            return Err(Error::Generation(format!(
                "no zero value for {}",
                describe(store, ty)
            )))
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::load_single;
    use crate::types::format::PathQualifier;
    use indoc::indoc;

    fn member(program: &Program, name: &str) -> Type {
        let store = &program.store;
        let pkg = program.units[0].pkg;
        store.obj(store.package(pkg).members[name]).ty.clone()
    }

    #[test]
    fn primitives_and_nilable_kinds() {
        let store = TypeStore::new();
        let qual = PathQualifier(&store);
        let cases = [
            (Type::Basic(BasicKind::Int64), "0"),
            (Type::Basic(BasicKind::Float32), "0"),
            (Type::Basic(BasicKind::String), "\"\""),
            (Type::Basic(BasicKind::Bool), "false"),
            (Type::Slice(Box::new(Type::Basic(BasicKind::Uint8))), "nil"),
            (Type::Pointer(Box::new(Type::Basic(BasicKind::Int))), "nil"),
            (store.error_type(), "nil"),
        ];
        for (ty, expected) in cases {
            assert_eq!(zero_value(&store, &ty, &qual).unwrap(), expected);
        }
    }

    #[test]
    fn structs_are_named_from_the_file() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            import "time"

            type point struct{ x, y int }

            type celsius float64

            var origin point
            var temp celsius
            var stamp time.Time
            var grid [2]int
        "#});
        let qual = FileQualifier::new(&program, FileRef { unit: 0, file: 0 });
        let store = &program.store;
        assert_eq!(zero_value(store, &member(&program, "origin"), &qual).unwrap(), "point{}");
        assert_eq!(zero_value(store, &member(&program, "temp"), &qual).unwrap(), "0");
        assert_eq!(zero_value(store, &member(&program, "stamp"), &qual).unwrap(), "time.Time{}");
        assert_eq!(zero_value(store, &member(&program, "grid"), &qual).unwrap(), "[2]int{}");
    }

    #[test]
    fn type_parameters_and_tuples() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func first[T any](items []T) T { return items[0] }
        "#});
        let store = &program.store;
        let sig = store
            .signature(store.package(program.units[0].pkg).members["first"])
            .unwrap()
            .clone();
        let qual = FileQualifier::new(&program, FileRef { unit: 0, file: 0 });
        assert_eq!(zero_value(store, &sig.results[0].ty, &qual).unwrap(), "*new(T)");
        assert!(zero_value(store, &Type::Tuple(vec![]), &qual).is_err());
    }
}
