//! Lenient type checker.
//!
//! The checker records what it can and keeps going: code that no longer
//! compiles halfway through a rewrite still gets types for every
//! expression whose operands resolve. Package-level declarations are
//! resolved on first reference, so declaration order never matters.

mod expr;
mod stmt;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::{
    Level, ObjId, ObjKind, Object, Param, PkgId, Receiver, Signature, Type, TypeInfo, TypeStore,
};
use crate::syntax::ast::*;

#[derive(Debug, Clone, Copy)]
enum Pending {
    Type { file: usize, decl: usize, spec: usize },
    Value { file: usize, decl: usize, spec: usize },
    Func { file: usize, decl: usize },
}

impl Pending {
    fn file(self) -> usize {
        match self {
            Pending::Type { file, .. } | Pending::Value { file, .. } | Pending::Func { file, .. } => file,
        }
    }
}

type Scope = HashMap<String, ObjId>;

pub(crate) struct Checker<'a> {
    store: &'a mut TypeStore,
    info: &'a mut TypeInfo,
    pkg: PkgId,
    files: &'a [&'a File],
    file_scopes: Vec<Scope>,
    file: usize,
    scopes: Vec<Scope>,
    pending: IndexMap<ObjId, Pending>,
    in_progress: HashSet<ObjId>,
    results: Vec<Vec<Type>>,
    diagnostics: Vec<String>,
}

/// Type-checks one package. `resolve_import` maps an import path to an
/// already-checked (or opaque) package.
pub fn check_package(
    store: &mut TypeStore,
    info: &mut TypeInfo,
    pkg: PkgId,
    files: &[&File],
    resolve_import: &dyn Fn(&str) -> Option<PkgId>,
) -> Vec<String> {
    let mut checker = Checker {
        store,
        info,
        pkg,
        files,
        file_scopes: vec![Scope::new(); files.len()],
        file: 0,
        scopes: Vec::new(),
        pending: IndexMap::new(),
        in_progress: HashSet::new(),
        results: Vec::new(),
        diagnostics: Vec::new(),
    };
    checker.collect_imports(resolve_import);
    let methods = checker.collect_decls();
    checker.attach_methods(methods);
    checker.resolve_all();
    checker.check_bodies();
    checker.diagnostics
}

/// Name under which an embedded field or method receiver refers to its
/// base type.
fn base_type_name(expr: &Expr) -> Option<(&Ident, bool, &[Expr])> {
    match &expr.kind {
        ExprKind::Ident(ident) => Some((ident, false, &[])),
        ExprKind::Star(inner) => base_type_name(inner).map(|(name, _, args)| (name, true, args)),
        ExprKind::Paren(inner) => base_type_name(inner),
        ExprKind::Selector { sel, .. } => Some((sel, false, &[])),
        ExprKind::Index { x, indices } => base_type_name(x).map(|(name, ptr, _)| (name, ptr, indices.as_slice())),
        _ => None,
    }
}

impl<'a> Checker<'a> {
    fn new_obj(&mut self, name: &str, kind: ObjKind, ty: Type, level: Level, decl: Option<NodeId>) -> ObjId {
        self.store.new_obj(Object {
            name: name.to_string(),
            kind,
            ty,
            pkg: Some(self.pkg),
            level,
            decl,
            recv: None,
        })
    }

    fn warn(&mut self, message: String) {
        self.diagnostics.push(message);
    }

    fn collect_imports(&mut self, resolve_import: &dyn Fn(&str) -> Option<PkgId>) {
        let files = self.files;
        for (index, file) in files.iter().enumerate() {
            for decl in &file.decls {
                let DeclKind::Gen(gen) = &decl.kind else {
                    continue;
                };
                for spec in &gen.specs {
                    let SpecKind::Import(import) = &spec.kind else {
                        continue;
                    };
                    let path = import.unquoted_path();
                    let Some(pkg) = resolve_import(path) else {
                        self.warn(format!("could not import {path}"));
                        continue;
                    };
                    if !self.store.package(self.pkg).imports.contains(&pkg) {
                        self.store.package_mut(self.pkg).imports.push(pkg);
                    }
                    let local = match &import.name {
                        Some(name) if name.name == "_" => continue,
                        Some(name) if name.name == "." => {
                            let members = self.store.package(pkg).members.clone();
                            self.file_scopes[index].extend(members);
                            continue;
                        }
                        Some(name) => name.name.clone(),
                        None => self.store.package(pkg).name.clone(),
                    };
                    let decl_id = import.name.as_ref().map(|n| n.id).unwrap_or(spec.id);
                    let obj = self.new_obj(&local, ObjKind::PkgName(pkg), Type::Invalid, Level::Package, Some(decl_id));
                    if let Some(name) = &import.name {
                        self.info.defs.insert(name.id, obj);
                    }
                    self.file_scopes[index].insert(local, obj);
                }
            }
        }
    }

    fn add_member(&mut self, name: &Ident, obj: ObjId) {
        self.info.defs.insert(name.id, obj);
        if !name.is_blank() {
            self.store
                .package_mut(self.pkg)
                .members
                .insert(name.name.clone(), obj);
        }
    }

    /// Creates objects for every package-level name. Returns the methods
    /// together with their receiver base type name.
    fn collect_decls(&mut self) -> Vec<(ObjId, String, bool)> {
        let mut methods = Vec::new();
        let files = self.files;
        for (file_index, file) in files.iter().enumerate() {
            for (decl_index, decl) in file.decls.iter().enumerate() {
                match &decl.kind {
                    DeclKind::Func(func) => {
                        let obj = self.new_obj(&func.name.name, ObjKind::Func, Type::Invalid, Level::Package, Some(decl.id));
                        self.info.defs.insert(func.name.id, obj);
                        match &func.recv {
                            Some(recv) => {
                                if let Some((base, pointer, _)) = recv.fields.first().and_then(|f| base_type_name(&f.ty)) {
                                    methods.push((obj, base.name.clone(), pointer));
                                }
                            }
                            None if func.name.name != "init" => self.add_member(&func.name, obj),
                            None => {}
                        }
                        self.pending.insert(obj, Pending::Func { file: file_index, decl: decl_index });
                    }
                    DeclKind::Gen(gen) => {
                        for (spec_index, spec) in gen.specs.iter().enumerate() {
                            match &spec.kind {
                                SpecKind::Import(_) => {}
                                SpecKind::Type(ty) => {
                                    let obj = self.new_obj(&ty.name.name, ObjKind::TypeName, Type::Invalid, Level::Package, Some(ty.name.id));
                                    if !ty.alias {
                                        let named = self.store.new_named(obj);
                                        self.store.obj_mut(obj).ty = Type::Named(named, Vec::new());
                                    }
                                    self.add_member(&ty.name, obj);
                                    self.pending.insert(obj, Pending::Type { file: file_index, decl: decl_index, spec: spec_index });
                                }
                                SpecKind::Value(value) => {
                                    let kind = if gen.tok == GenTok::Const { ObjKind::Const } else { ObjKind::Var };
                                    for name in &value.names {
                                        let obj = self.new_obj(&name.name, kind, Type::Invalid, Level::Package, Some(name.id));
                                        self.add_member(name, obj);
                                        self.pending.insert(obj, Pending::Value { file: file_index, decl: decl_index, spec: spec_index });
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        methods
    }

    fn attach_methods(&mut self, methods: Vec<(ObjId, String, bool)>) {
        for (obj, base, pointer) in methods {
            let Some(&type_obj) = self.store.package(self.pkg).members.get(&base) else {
                continue;
            };
            let Type::Named(named, _) = self.store.obj(type_obj).ty.clone() else {
                continue;
            };
            self.store.named_mut(named).methods.push(obj);
            self.store.obj_mut(obj).recv = Some(Receiver {
                named: Some(named),
                pointer,
                interface: false,
            });
        }
    }

    fn resolve_all(&mut self) {
        let objects: Vec<ObjId> = self.pending.keys().copied().collect();
        for obj in objects {
            self.resolve(obj);
        }
    }

    /// Resolves a package-level object in its own file's context.
    fn resolve(&mut self, obj: ObjId) {
        let Some(pending) = self.pending.get(&obj).copied() else {
            return;
        };
        if !self.in_progress.insert(obj) {
            return;
        }
        let saved_scopes = std::mem::take(&mut self.scopes);
        let saved_results = std::mem::take(&mut self.results);
        let saved_file = self.file;
        self.file = pending.file();

        let files = self.files;
        match pending {
            Pending::Type { file, decl, spec } => {
                if let DeclKind::Gen(gen) = &files[file].decls[decl].kind {
                    if let SpecKind::Type(ty) = &gen.specs[spec].kind {
                        self.resolve_type_spec(obj, ty);
                    }
                }
            }
            Pending::Value { file, decl, spec } => {
                if let DeclKind::Gen(gen) = &files[file].decls[decl].kind {
                    self.resolve_value_spec(gen, spec, Level::Package);
                }
            }
            Pending::Func { file, decl } => {
                if let DeclKind::Func(func) = &files[file].decls[decl].kind {
                    self.scopes.push(Scope::new());
                    self.declare_receiver_type_params(func);
                    let sig = self.signature(&func.ty);
                    self.scopes.pop();
                    self.store.obj_mut(obj).ty = Type::Func(Box::new(sig));
                }
            }
        }

        self.pending.shift_remove(&obj);
        self.in_progress.remove(&obj);
        self.file = saved_file;
        self.results = saved_results;
        self.scopes = saved_scopes;
    }

    fn resolve_type_spec(&mut self, obj: ObjId, spec: &TypeSpec) {
        if spec.alias {
            let ty = self.type_expr(&spec.ty);
            self.store.obj_mut(obj).ty = ty;
            return;
        }
        let Type::Named(named, _) = self.store.obj(obj).ty.clone() else {
            return;
        };
        self.scopes.push(Scope::new());
        if let Some(params) = &spec.type_params {
            let ids = self.declare_type_params(params);
            self.store.named_mut(named).type_params = ids;
        }
        let ty = self.type_expr(&spec.ty);
        self.scopes.pop();
        let underlying = match &ty {
            Type::Named(..) => self.store.underlying(&ty),
            _ => ty,
        };
        if let Type::Interface(iface) = &underlying {
            for &method in &iface.methods {
                if let Some(recv) = &mut self.store.obj_mut(method).recv {
                    if recv.named.is_none() {
                        recv.named = Some(named);
                    }
                }
            }
        }
        self.store.named_mut(named).underlying = underlying;
    }

    /// Resolves every name of one `var`/`const` spec. Constant specs
    /// without values repeat the previous spec's type and expressions.
    fn resolve_value_spec(&mut self, gen: &GenDecl, index: usize, level: Level) -> Vec<ObjId> {
        let SpecKind::Value(spec) = &gen.specs[index].kind else {
            return Vec::new();
        };
        let is_const = gen.tok == GenTok::Const;
        let (ty_expr, values) = if is_const && spec.values.is_empty() && spec.ty.is_none() {
            gen.specs[..index]
                .iter()
                .rev()
                .find_map(|s| match &s.kind {
                    SpecKind::Value(v) if !v.values.is_empty() => Some((v.ty.as_ref(), v.values.as_slice())),
                    _ => None,
                })
                .unwrap_or((None, &[]))
        } else {
            (spec.ty.as_ref(), spec.values.as_slice())
        };
        let declared = ty_expr.map(|t| self.type_expr(t));
        let value_types = self.value_types(values, spec.names.len(), declared.as_ref());
        let mut objects = Vec::new();
        for (i, name) in spec.names.iter().enumerate() {
            let inferred = value_types.get(i).cloned().unwrap_or(Type::Invalid);
            let ty = match &declared {
                Some(ty) => ty.clone(),
                None if is_const => inferred,
                None => self.store.default_type(&inferred),
            };
            let obj = match (level, self.info.defs.get(&name.id).copied()) {
                (Level::Package, Some(obj)) => obj,
                _ => {
                    let kind = if is_const { ObjKind::Const } else { ObjKind::Var };
                    self.new_obj(&name.name, kind, Type::Invalid, level, Some(name.id))
                }
            };
            self.store.obj_mut(obj).ty = ty;
            self.pending.shift_remove(&obj);
            objects.push(obj);
        }
        objects
    }

    fn declare_type_params(&mut self, params: &FieldList) -> Vec<ObjId> {
        let mut ids = Vec::new();
        for field in &params.fields {
            for name in &field.names {
                let obj = self.new_obj(&name.name, ObjKind::TypeName, Type::Invalid, Level::Local, Some(name.id));
                self.store.obj_mut(obj).ty = Type::TypeParam(obj);
                self.declare(name, obj);
                ids.push(obj);
            }
        }
        for field in &params.fields {
            let constraint = self.type_expr(&field.ty);
            for name in &field.names {
                if let Some(&obj) = self.info.defs.get(&name.id) {
                    self.store.constraints.insert(obj, self.store.underlying(&constraint));
                }
            }
        }
        ids
    }

    /// Generic receivers (`func (l *List[T]) ...`) name the type's own
    /// parameters.
    fn declare_receiver_type_params(&mut self, func: &FuncDecl) {
        let Some(recv) = &func.recv else {
            return;
        };
        let Some((base, _, args)) = recv.fields.first().and_then(|f| base_type_name(&f.ty)) else {
            return;
        };
        if args.is_empty() {
            return;
        }
        let Some(&type_obj) = self.store.package(self.pkg).members.get(&base.name) else {
            return;
        };
        self.resolve(type_obj);
        let Type::Named(named, _) = self.store.obj(type_obj).ty.clone() else {
            return;
        };
        let params = self.store.named(named).type_params.clone();
        for (arg, param) in args.iter().zip(params) {
            if let ExprKind::Ident(ident) = &arg.kind {
                self.info.defs.insert(ident.id, param);
                if !ident.is_blank() {
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(ident.name.clone(), param);
                    }
                }
            }
        }
    }

    /// Signature of a function type. Type parameters are declared into the
    /// current scope.
    pub(crate) fn signature(&mut self, ty: &FuncType) -> Signature {
        let type_params = match &ty.type_params {
            Some(params) => self.declare_type_params(params),
            None => Vec::new(),
        };
        let (params, variadic) = self.param_list(&ty.params);
        let results = match &ty.results {
            Some(results) => self.param_list(results).0,
            None => Vec::new(),
        };
        Signature {
            type_params,
            params,
            results,
            variadic,
        }
    }

    fn param_list(&mut self, list: &FieldList) -> (Vec<Param>, bool) {
        let mut params = Vec::new();
        let mut variadic = false;
        for field in &list.fields {
            let ty = match &field.ty.kind {
                ExprKind::Ellipsis(Some(elem)) => {
                    variadic = true;
                    Type::Slice(Box::new(self.type_expr(elem)))
                }
                _ => self.type_expr(&field.ty),
            };
            if field.names.is_empty() {
                params.push(Param::unnamed(ty));
            } else {
                for name in &field.names {
                    params.push(Param {
                        name: name.name.clone(),
                        ty: ty.clone(),
                    });
                }
            }
        }
        (params, variadic)
    }

    /// Declares parameter and result names of `ty` as local variables
    /// typed from `sig`.
    fn declare_params(&mut self, ty: &FuncType, sig: &Signature) {
        let mut params = sig.params.iter();
        for field in &ty.params.fields {
            for name in &field.names {
                let param_ty = params.next().map(|p| p.ty.clone()).unwrap_or(Type::Invalid);
                self.declare_var(name, param_ty);
            }
            if field.names.is_empty() {
                params.next();
            }
        }
        if let Some(results) = &ty.results {
            let mut result_types = sig.results.iter();
            for field in &results.fields {
                for name in &field.names {
                    let ty = result_types.next().map(|p| p.ty.clone()).unwrap_or(Type::Invalid);
                    self.declare_var(name, ty);
                }
                if field.names.is_empty() {
                    result_types.next();
                }
            }
        }
    }

    fn declare_var(&mut self, name: &Ident, ty: Type) -> ObjId {
        let obj = self.new_obj(&name.name, ObjKind::Var, ty, Level::Local, Some(name.id));
        self.declare(name, obj);
        obj
    }

    fn declare(&mut self, name: &Ident, obj: ObjId) {
        self.info.defs.insert(name.id, obj);
        if name.is_blank() {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.clone(), obj);
        }
    }

    fn declared_in_current_scope(&self, name: &str) -> Option<ObjId> {
        self.scopes.last().and_then(|scope| scope.get(name).copied())
    }

    fn lookup(&mut self, name: &str) -> Option<ObjId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&obj) = scope.get(name) {
                return Some(obj);
            }
        }
        if let Some(&obj) = self.file_scopes.get(self.file).and_then(|s| s.get(name)) {
            return Some(obj);
        }
        if let Some(&obj) = self.store.package(self.pkg).members.get(name) {
            self.resolve(obj);
            return Some(obj);
        }
        self.store.universe_lookup(name)
    }

    fn check_bodies(&mut self) {
        let files = self.files;
        for (file_index, file) in files.iter().enumerate() {
            self.file = file_index;
            for decl in &file.decls {
                let DeclKind::Func(func) = &decl.kind else {
                    continue;
                };
                let Some(body) = &func.body else {
                    continue;
                };
                let Some(&obj) = self.info.defs.get(&func.name.id) else {
                    continue;
                };
                let sig = self.store.signature(obj).cloned().unwrap_or_default();
                self.scopes.push(Scope::new());
                self.declare_receiver_type_params(func);
                for &param in &sig.type_params {
                    let name = self.store.obj(param).name.clone();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(name, param);
                    }
                }
                if let Some(recv) = &func.recv {
                    if let Some(field) = recv.fields.first() {
                        let recv_ty = self.type_expr(&field.ty);
                        for name in &field.names {
                            self.declare_var(name, recv_ty.clone());
                        }
                    }
                }
                self.declare_params(&func.ty, &sig);
                self.results.push(sig.result_types());
                self.scopes.push(Scope::new());
                self.stmts(&body.stmts);
                self.scopes.pop();
                self.results.pop();
                self.scopes.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_file;
    use crate::types::format::describe;
    use crate::types::methods::implements;
    use indoc::indoc;

    fn check(source: &str) -> (TypeStore, TypeInfo, File, PkgId) {
        let mut ids = IdGen::default();
        let file = parse_file(source, &mut ids).expect("parses");
        let mut store = TypeStore::new();
        let mut info = TypeInfo::default();
        let pkg = store.new_package("example.com/p", "p");
        let diagnostics = check_package(&mut store, &mut info, pkg, &[&file], &|_| None);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        (store, info, file, pkg)
    }

    fn member_type(store: &TypeStore, pkg: PkgId, name: &str) -> String {
        let obj = store.package(pkg).members[name];
        describe(store, &store.obj(obj).ty)
    }

    #[test]
    fn resolves_functions_declared_after_use() {
        let (store, _, _, pkg) = check(indoc! {r#"
            package p

            var total, failure = count()

            func count() (int, error) { return 0, nil }
        "#});
        let sig = store.signature(store.package(pkg).members["count"]).expect("func");
        assert!(store.ends_in_error(sig));
        assert_eq!(member_type(&store, pkg, "total"), "int");
        assert_eq!(member_type(&store, pkg, "failure"), "error");
    }

    #[test]
    fn local_definitions_take_call_result_types() {
        let (store, info, file, _) = check(indoc! {r#"
            package p

            type T struct{ n int }

            func (t *T) Get() (int, error) { return t.n, nil }

            func use(t *T) {
                v, err := t.Get()
                _ = v
                _ = err
            }
        "#});
        let DeclKind::Func(func) = &file.decls[2].kind else {
            panic!("expected func");
        };
        let StmtKind::Assign { lhs, .. } = &func.body.as_ref().expect("body").stmts[0].kind else {
            panic!("expected assignment");
        };
        let names: Vec<String> = lhs
            .iter()
            .map(|e| {
                let ident = e.as_ident().expect("ident");
                let obj = info.defs[&ident.id];
                describe(&store, &store.obj(obj).ty)
            })
            .collect();
        assert_eq!(names, vec!["int", "error"]);
    }

    #[test]
    fn pointer_receivers_satisfy_interfaces_through_pointers() {
        let (store, _, _, pkg) = check(indoc! {r#"
            package p

            type Closer interface{ Close() error }

            type F struct{}

            func (f *F) Close() error { return nil }
        "#});
        let closer = store.obj(store.package(pkg).members["Closer"]).ty.clone();
        let f = store.obj(store.package(pkg).members["F"]).ty.clone();
        assert!(!implements(&store, &f, &closer, false));
        assert!(implements(&store, &f, &closer, true));
    }

    #[test]
    fn generic_calls_infer_their_results() {
        let (store, info, file, _) = check(indoc! {r#"
            package p

            func First[T any](xs []T) (T, error) {
                var zero T
                return zero, nil
            }

            func use() {
                s, err := First([]string{"a"})
                _, _ = s, err
            }
        "#});
        let DeclKind::Func(func) = &file.decls[1].kind else {
            panic!("expected func");
        };
        let StmtKind::Assign { lhs, .. } = &func.body.as_ref().expect("body").stmts[0].kind else {
            panic!("expected assignment");
        };
        let ident = lhs[0].as_ident().expect("ident");
        let obj = info.defs[&ident.id];
        assert_eq!(describe(&store, &store.obj(obj).ty), "string");
    }
}
