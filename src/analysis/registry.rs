//! Named interfaces a method signature change could break.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::loader::Program;
use crate::types::methods::{implements, interface_methods};
use crate::types::{ObjId, ObjKind, PkgId, Type, TypeStore};

/// An interface the receiver type satisfies today and whose method of the
/// same name would stop matching after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub interface: String,
    pub method: String,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    interfaces: IndexSet<ObjId>,
}

impl InterfaceRegistry {
    /// Visits every unit and, transitively, every package it imports.
    pub fn build(program: &Program) -> Self {
        let store = &program.store;
        let mut interfaces = IndexSet::new();
        for &obj in store.universe.values() {
            if is_named_interface(store, obj) {
                interfaces.insert(obj);
            }
        }
        let mut visited: HashSet<PkgId> = HashSet::new();
        let mut pending: Vec<PkgId> = program.units.iter().map(|u| u.pkg).collect();
        while let Some(pkg) = pending.pop() {
            if !visited.insert(pkg) {
                continue;
            }
            let package = store.package(pkg);
            for &obj in package.members.values() {
                if is_named_interface(store, obj) {
                    interfaces.insert(obj);
                }
            }
            pending.extend(package.imports.iter().copied());
        }
        Self { interfaces }
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Interfaces whose satisfaction depends on `method` keeping its
    /// signature. Plain functions and interface methods never conflict.
    pub fn check_compliance(&self, store: &TypeStore, method: ObjId) -> Vec<Conflict> {
        let object = store.obj(method);
        let Some(recv) = object.recv else {
            return Vec::new();
        };
        let Some(named) = recv.named.filter(|_| !recv.interface) else {
            return Vec::new();
        };
        let type_params = store.named(named).type_params.clone();
        let recv_ty = Type::Named(named, type_params.into_iter().map(Type::TypeParam).collect());
        let mut conflicts = Vec::new();
        for &iface in &self.interfaces {
            let iface_ty = store.obj(iface).ty.clone();
            let declares = interface_methods(store, &iface_ty)
                .iter()
                .any(|m| m.name == object.name);
            if declares
                && (implements(store, &recv_ty, &iface_ty, false) || implements(store, &recv_ty, &iface_ty, true))
            {
                let pkg = store.obj(iface).pkg.map(|p| store.package(p).path.clone());
                let name = &store.obj(iface).name;
                conflicts.push(Conflict {
                    interface: match pkg {
                        Some(path) => format!("{path}.{name}"),
                        None => name.clone(),
                    },
                    method: object.name.clone(),
                });
            }
        }
        conflicts
    }
}

fn is_named_interface(store: &TypeStore, obj: ObjId) -> bool {
    let object = store.obj(obj);
    object.kind == ObjKind::TypeName && matches!(object.ty, Type::Named(..)) && store.is_interface(&object.ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::load_single;
    use indoc::indoc;

    fn method(program: &Program, type_name: &str, name: &str) -> ObjId {
        let store = &program.store;
        let pkg = program.units[0].pkg;
        let Type::Named(named, _) = store.obj(store.package(pkg).members[type_name]).ty else {
            panic!("{type_name} is not named");
        };
        *store
            .named(named)
            .methods
            .iter()
            .find(|&&m| store.obj(m).name == name)
            .expect("method exists")
    }

    #[test]
    fn methods_satisfying_imported_interfaces_conflict() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            import "io"

            type sink struct{}

            func (s *sink) Write(p []byte) (int, error) { return len(p), nil }
            func (s *sink) Close() {}
            func (s *sink) Flush() {}

            var _ io.Writer = (*sink)(nil)
        "#});
        let registry = InterfaceRegistry::build(&program);
        assert!(!registry.is_empty());

        let conflicts = registry.check_compliance(&program.store, method(&program, "sink", "Write"));
        assert!(conflicts.iter().any(|c| c.interface == "io.Writer" && c.method == "Write"));

        // Close() without a result does not satisfy io.Closer, so changing it
        // cannot break that interface.
        assert!(registry
            .check_compliance(&program.store, method(&program, "sink", "Close"))
            .is_empty());
        assert!(registry
            .check_compliance(&program.store, method(&program, "sink", "Flush"))
            .is_empty());
    }

    #[test]
    fn local_interfaces_are_registered() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            type Runner interface{ Run() }

            type job struct{}

            func (j job) Run() {}
        "#});
        let registry = InterfaceRegistry::build(&program);
        let conflicts = registry.check_compliance(&program.store, method(&program, "job", "Run"));
        assert_eq!(
            conflicts,
            vec![Conflict {
                interface: "example.com/app.Runner".to_string(),
                method: "Run".to_string(),
            }]
        );
    }
}
