use super::{Checker, Scope};
use crate::syntax::ast::*;
use crate::types::{BasicKind, Level, ObjKind, Type};

impl Checker<'_> {
    pub(crate) fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn scoped_block(&mut self, block: &Block) {
        self.scopes.push(Scope::new());
        self.stmts(&block.stmts);
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(gen) => self.local_decl(gen),
            StmtKind::Empty | StmtKind::Branch { .. } => {}
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt),
            StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => {
                self.expr(expr, None);
            }
            StmtKind::Send { chan, value } => {
                let chan_ty = self.value_type(chan, None);
                let elem = match self.store.underlying(&chan_ty) {
                    Type::Chan(_, elem) => Some(*elem),
                    _ => None,
                };
                self.expr(value, elem.as_ref());
            }
            StmtKind::IncDec { x, .. } => {
                self.expr(x, None);
            }
            StmtKind::Assign { lhs, op, rhs } => self.assign(lhs, *op, rhs),
            StmtKind::Return(results) => {
                let expected = self.results.last().cloned().unwrap_or_default();
                if results.len() == expected.len() {
                    for (value, ty) in results.iter().zip(&expected) {
                        self.expr(value, Some(ty));
                    }
                } else {
                    for value in results {
                        self.expr(value, None);
                    }
                }
            }
            StmtKind::Block(block) => self.scoped_block(block),
            StmtKind::If(stmt) => self.if_stmt(stmt),
            StmtKind::Case(clause) => {
                for expr in &clause.list {
                    self.expr(expr, None);
                }
                self.scopes.push(Scope::new());
                self.stmts(&clause.body);
                self.scopes.pop();
            }
            StmtKind::Switch(switch) => {
                self.scopes.push(Scope::new());
                if let Some(init) = &switch.init {
                    self.stmt(init);
                }
                let tag = switch.tag.as_ref().map(|t| self.value_type(t, None));
                for clause in &switch.body.stmts {
                    let StmtKind::Case(case) = &clause.kind else {
                        self.stmt(clause);
                        continue;
                    };
                    for expr in &case.list {
                        self.expr(expr, tag.as_ref());
                    }
                    self.scopes.push(Scope::new());
                    self.stmts(&case.body);
                    self.scopes.pop();
                }
                self.scopes.pop();
            }
            StmtKind::TypeSwitch(switch) => self.type_switch(switch),
            StmtKind::Comm(clause) => self.comm_clause(clause),
            StmtKind::Select(body) => {
                for clause in &body.stmts {
                    self.stmt(clause);
                }
            }
            StmtKind::For(stmt) => {
                self.scopes.push(Scope::new());
                if let Some(init) = &stmt.init {
                    self.stmt(init);
                }
                if let Some(cond) = &stmt.cond {
                    self.expr(cond, None);
                }
                if let Some(post) = &stmt.post {
                    self.stmt(post);
                }
                self.scoped_block(&stmt.body);
                self.scopes.pop();
            }
            StmtKind::Range(stmt) => self.range(stmt),
        }
    }

    fn if_stmt(&mut self, stmt: &IfStmt) {
        self.scopes.push(Scope::new());
        if let Some(init) = &stmt.init {
            self.stmt(init);
        }
        self.expr(&stmt.cond, None);
        self.scoped_block(&stmt.body);
        if let Some(els) = &stmt.els {
            self.stmt(els);
        }
        self.scopes.pop();
    }

    fn assign(&mut self, lhs: &[Expr], op: AssignOp, rhs: &[Expr]) {
        match op {
            AssignOp::Define => {
                let types = self.value_types(rhs, lhs.len(), None);
                for (i, target) in lhs.iter().enumerate() {
                    let Some(ident) = target.as_ident() else {
                        continue;
                    };
                    let ty = types.get(i).cloned().unwrap_or(Type::Invalid);
                    match self.declared_in_current_scope(&ident.name) {
                        Some(existing) if !ident.is_blank() => {
                            self.info.uses.insert(ident.id, existing);
                            self.info.types.insert(target.id, self.store.obj(existing).ty.clone());
                        }
                        _ => {
                            let ty = self.store.default_type(&ty);
                            self.info.types.insert(target.id, ty.clone());
                            self.declare_var(ident, ty);
                        }
                    }
                }
            }
            AssignOp::Assign => {
                let targets: Vec<Option<Type>> = lhs
                    .iter()
                    .map(|target| {
                        if target.is_blank() {
                            None
                        } else {
                            Some(self.value_type(target, None))
                        }
                    })
                    .collect();
                if rhs.len() == lhs.len() {
                    for (value, target) in rhs.iter().zip(&targets) {
                        self.expr(value, target.as_ref());
                    }
                } else {
                    self.value_types(rhs, lhs.len(), None);
                }
            }
            AssignOp::Op(_) => {
                for target in lhs {
                    self.expr(target, None);
                }
                for value in rhs {
                    self.expr(value, None);
                }
            }
        }
    }

    /// Local declarations are resolved in place, in statement order.
    fn local_decl(&mut self, gen: &GenDecl) {
        for (index, spec) in gen.specs.iter().enumerate() {
            match &spec.kind {
                SpecKind::Value(value) => {
                    let objects = self.resolve_value_spec(gen, index, Level::Local);
                    for (name, obj) in value.names.iter().zip(objects) {
                        self.declare(name, obj);
                    }
                }
                SpecKind::Type(ty) => {
                    let obj = self.new_obj(&ty.name.name, ObjKind::TypeName, Type::Invalid, Level::Local, Some(ty.name.id));
                    if !ty.alias {
                        let named = self.store.new_named(obj);
                        self.store.obj_mut(obj).ty = Type::Named(named, Vec::new());
                    }
                    self.declare(&ty.name, obj);
                    self.resolve_type_spec(obj, ty);
                }
                SpecKind::Import(_) => {}
            }
        }
    }

    fn range(&mut self, stmt: &RangeStmt) {
        let x = self.value_type(&stmt.x, None);
        let (key, value) = match self.store.underlying(&x) {
            Type::Basic(kind) if kind.is_string() => (basic(BasicKind::Int), basic(BasicKind::Int32)),
            Type::Basic(kind) if kind.is_numeric() => (self.store.default_type(&x), Type::Invalid),
            Type::Slice(elem) | Type::Array(_, elem) => (basic(BasicKind::Int), *elem),
            Type::Pointer(base) => match self.store.underlying(&base) {
                Type::Array(_, elem) => (basic(BasicKind::Int), *elem),
                _ => (Type::Invalid, Type::Invalid),
            },
            Type::Map(key, value) => (*key, *value),
            Type::Chan(_, elem) => (*elem, Type::Invalid),
            Type::Func(sig) => {
                let yielded = sig
                    .params
                    .first()
                    .and_then(|p| match &p.ty {
                        Type::Func(inner) => Some(inner.params.iter().map(|q| q.ty.clone()).collect::<Vec<_>>()),
                        _ => None,
                    })
                    .unwrap_or_default();
                let mut yielded = yielded.into_iter();
                (
                    yielded.next().unwrap_or(Type::Invalid),
                    yielded.next().unwrap_or(Type::Invalid),
                )
            }
            _ => (Type::Invalid, Type::Invalid),
        };
        self.scopes.push(Scope::new());
        for (target, ty) in [(&stmt.key, key), (&stmt.value, value)] {
            let Some(target) = target else {
                continue;
            };
            if stmt.define {
                if let Some(ident) = target.as_ident() {
                    self.info.types.insert(target.id, ty.clone());
                    self.declare_var(ident, ty);
                }
            } else {
                self.expr(target, None);
            }
        }
        self.scoped_block(&stmt.body);
        self.scopes.pop();
    }

    /// Each clause of `switch v := x.(type)` gets its own `v`, typed by the
    /// clause's single type or by `x` otherwise.
    fn type_switch(&mut self, switch: &TypeSwitchStmt) {
        self.scopes.push(Scope::new());
        if let Some(init) = &switch.init {
            self.stmt(init);
        }
        let (binding, subject) = match &switch.assign.kind {
            StmtKind::Assign { lhs, rhs, .. } => (lhs.first().and_then(Expr::as_ident), rhs.first()),
            StmtKind::Expr(expr) => (None, Some(expr)),
            _ => (None, None),
        };
        let subject_ty = subject.map(|s| self.value_type(s, None)).unwrap_or(Type::Invalid);
        for clause in &switch.body.stmts {
            let StmtKind::Case(case) = &clause.kind else {
                continue;
            };
            let types: Vec<Type> = case.list.iter().map(|e| self.type_or_nil(e)).collect();
            self.scopes.push(Scope::new());
            if let Some(name) = binding {
                let ty = match types.as_slice() {
                    [single] if !single.is_invalid() => single.clone(),
                    _ => subject_ty.clone(),
                };
                let obj = self.new_obj(&name.name, ObjKind::Var, ty, Level::Local, Some(name.id));
                if !name.is_blank() {
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(name.name.clone(), obj);
                    }
                }
                self.info.defs.entry(name.id).or_insert(obj);
            }
            self.stmts(&case.body);
            self.scopes.pop();
        }
        self.scopes.pop();
    }

    fn type_or_nil(&mut self, expr: &Expr) -> Type {
        if expr.as_ident().is_some_and(|i| i.name == "nil") {
            self.expr(expr, None);
            return Type::Invalid;
        }
        self.type_expr(expr)
    }

    fn comm_clause(&mut self, clause: &CommClause) {
        self.scopes.push(Scope::new());
        if let Some(comm) = &clause.comm {
            self.stmt(comm);
        }
        self.stmts(&clause.body);
        self.scopes.pop();
    }
}

fn basic(kind: BasicKind) -> Type {
    Type::Basic(kind)
}
