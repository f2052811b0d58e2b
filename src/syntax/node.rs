//! Uniform view over the syntax tree.
//!
//! [`NodeRef::children`] lists every child of a node together with the
//! [`Edge`] (field name plus optional sequence index) that holds it, and
//! [`NodeMut::into_child`] follows an edge mutably. Walkers, the
//! enclosing-function search and the tree mapper are all written against
//! this one schema instead of matching every node kind by hand.

use std::fmt;

use super::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub field: &'static str,
    pub index: Option<usize>,
}

impl Edge {
    pub const fn field(field: &'static str) -> Self {
        Self { field, index: None }
    }

    pub const fn at(field: &'static str, index: usize) -> Self {
        Self {
            field,
            index: Some(index),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.field, index),
            None => write!(f, "{}", self.field),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    File(&'a File),
    Decl(&'a Decl),
    Spec(&'a Spec),
    FieldList(&'a FieldList),
    Field(&'a Field),
    FuncType(&'a FuncType),
    Ident(&'a Ident),
    Expr(&'a Expr),
    Stmt(&'a Stmt),
    Block(&'a Block),
}

pub enum NodeMut<'a> {
    File(&'a mut File),
    Decl(&'a mut Decl),
    Spec(&'a mut Spec),
    FieldList(&'a mut FieldList),
    Field(&'a mut Field),
    FuncType(&'a mut FuncType),
    Ident(&'a mut Ident),
    Expr(&'a mut Expr),
    Stmt(&'a mut Stmt),
    Block(&'a mut Block),
}

type Children<'a> = Vec<(Edge, NodeRef<'a>)>;

fn push_opt<'a>(out: &mut Children<'a>, field: &'static str, node: Option<NodeRef<'a>>) {
    if let Some(node) = node {
        out.push((Edge::field(field), node));
    }
}

fn push_exprs<'a>(out: &mut Children<'a>, field: &'static str, exprs: &'a [Expr]) {
    out.extend(
        exprs
            .iter()
            .enumerate()
            .map(|(i, e)| (Edge::at(field, i), NodeRef::Expr(e))),
    );
}

fn push_idents<'a>(out: &mut Children<'a>, field: &'static str, idents: &'a [Ident]) {
    out.extend(
        idents
            .iter()
            .enumerate()
            .map(|(i, e)| (Edge::at(field, i), NodeRef::Ident(e))),
    );
}

fn push_stmts<'a>(out: &mut Children<'a>, field: &'static str, stmts: &'a [Stmt]) {
    out.extend(
        stmts
            .iter()
            .enumerate()
            .map(|(i, s)| (Edge::at(field, i), NodeRef::Stmt(s))),
    );
}

fn boxed_expr(expr: &Option<Box<Expr>>) -> Option<NodeRef<'_>> {
    expr.as_deref().map(NodeRef::Expr)
}

fn boxed_stmt(stmt: &Option<Box<Stmt>>) -> Option<NodeRef<'_>> {
    stmt.as_deref().map(NodeRef::Stmt)
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::File(n) => n.id,
            NodeRef::Decl(n) => n.id,
            NodeRef::Spec(n) => n.id,
            NodeRef::FieldList(n) => n.id,
            NodeRef::Field(n) => n.id,
            NodeRef::FuncType(n) => n.id,
            NodeRef::Ident(n) => n.id,
            NodeRef::Expr(n) => n.id,
            NodeRef::Stmt(n) => n.id,
            NodeRef::Block(n) => n.id,
        }
    }

    /// Go-style node kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::File(_) => "File",
            NodeRef::Decl(decl) => match decl.kind {
                DeclKind::Func(_) => "FuncDecl",
                DeclKind::Gen(_) => "GenDecl",
            },
            NodeRef::Spec(spec) => match spec.kind {
                SpecKind::Import(_) => "ImportSpec",
                SpecKind::Value(_) => "ValueSpec",
                SpecKind::Type(_) => "TypeSpec",
            },
            NodeRef::FieldList(_) => "FieldList",
            NodeRef::Field(_) => "Field",
            NodeRef::FuncType(_) => "FuncType",
            NodeRef::Ident(_) => "Ident",
            NodeRef::Block(_) => "BlockStmt",
            NodeRef::Expr(expr) => expr_kind_name(&expr.kind),
            NodeRef::Stmt(stmt) => stmt_kind_name(&stmt.kind),
        }
    }

    pub fn children(&self) -> Children<'a> {
        let mut out = Vec::new();
        match *self {
            NodeRef::File(file) => {
                out.push((Edge::field("name"), NodeRef::Ident(&file.package)));
                out.extend(
                    file.decls
                        .iter()
                        .enumerate()
                        .map(|(i, d)| (Edge::at("decls", i), NodeRef::Decl(d))),
                );
            }
            NodeRef::Decl(decl) => match &decl.kind {
                DeclKind::Func(func) => {
                    push_opt(&mut out, "recv", func.recv.as_ref().map(NodeRef::FieldList));
                    out.push((Edge::field("name"), NodeRef::Ident(&func.name)));
                    out.push((Edge::field("type"), NodeRef::FuncType(&func.ty)));
                    push_opt(&mut out, "body", func.body.as_ref().map(NodeRef::Block));
                }
                DeclKind::Gen(gen) => gen_children(&mut out, gen),
            },
            NodeRef::Spec(spec) => match &spec.kind {
                SpecKind::Import(import) => {
                    push_opt(&mut out, "name", import.name.as_ref().map(NodeRef::Ident));
                }
                SpecKind::Value(value) => {
                    push_idents(&mut out, "names", &value.names);
                    push_opt(&mut out, "type", value.ty.as_ref().map(NodeRef::Expr));
                    push_exprs(&mut out, "values", &value.values);
                }
                SpecKind::Type(ty) => {
                    out.push((Edge::field("name"), NodeRef::Ident(&ty.name)));
                    push_opt(
                        &mut out,
                        "type_params",
                        ty.type_params.as_ref().map(NodeRef::FieldList),
                    );
                    out.push((Edge::field("type"), NodeRef::Expr(&ty.ty)));
                }
            },
            NodeRef::FieldList(list) => {
                out.extend(
                    list.fields
                        .iter()
                        .enumerate()
                        .map(|(i, f)| (Edge::at("list", i), NodeRef::Field(f))),
                );
            }
            NodeRef::Field(field) => {
                push_idents(&mut out, "names", &field.names);
                out.push((Edge::field("type"), NodeRef::Expr(&field.ty)));
            }
            NodeRef::FuncType(ty) => {
                push_opt(
                    &mut out,
                    "type_params",
                    ty.type_params.as_ref().map(NodeRef::FieldList),
                );
                out.push((Edge::field("params"), NodeRef::FieldList(&ty.params)));
                push_opt(&mut out, "results", ty.results.as_ref().map(NodeRef::FieldList));
            }
            NodeRef::Ident(_) => {}
            NodeRef::Block(block) => push_stmts(&mut out, "list", &block.stmts),
            NodeRef::Expr(expr) => expr_children(&mut out, expr),
            NodeRef::Stmt(stmt) => stmt_children(&mut out, stmt),
        }
        out
    }
}

fn gen_children<'a>(out: &mut Children<'a>, gen: &'a GenDecl) {
    out.extend(
        gen.specs
            .iter()
            .enumerate()
            .map(|(i, s)| (Edge::at("specs", i), NodeRef::Spec(s))),
    );
}

fn expr_children<'a>(out: &mut Children<'a>, expr: &'a Expr) {
    match &expr.kind {
        ExprKind::Ident(ident) => out.push((Edge::field("ident"), NodeRef::Ident(ident))),
        ExprKind::BasicLit { .. } => {}
        ExprKind::CompositeLit { ty, elts, .. } => {
            push_opt(out, "type", boxed_expr(ty));
            push_exprs(out, "elts", elts);
        }
        ExprKind::KeyValue { key, value } => {
            out.push((Edge::field("key"), NodeRef::Expr(key)));
            out.push((Edge::field("value"), NodeRef::Expr(value)));
        }
        ExprKind::FuncLit(lit) => {
            out.push((Edge::field("type"), NodeRef::FuncType(&lit.ty)));
            out.push((Edge::field("body"), NodeRef::Block(&lit.body)));
        }
        ExprKind::Paren(x) | ExprKind::Star(x) | ExprKind::Unary { x, .. } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
        }
        ExprKind::Selector { x, sel } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
            out.push((Edge::field("sel"), NodeRef::Ident(sel)));
        }
        ExprKind::Index { x, indices } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
            push_exprs(out, "indices", indices);
        }
        ExprKind::Slice {
            x, low, high, max, ..
        } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
            push_opt(out, "low", boxed_expr(low));
            push_opt(out, "high", boxed_expr(high));
            push_opt(out, "max", boxed_expr(max));
        }
        ExprKind::TypeAssert { x, ty } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
            push_opt(out, "type", boxed_expr(ty));
        }
        ExprKind::Call { fun, args, .. } => {
            out.push((Edge::field("fun"), NodeRef::Expr(fun)));
            push_exprs(out, "args", args);
        }
        ExprKind::Binary { x, y, .. } => {
            out.push((Edge::field("x"), NodeRef::Expr(x)));
            out.push((Edge::field("y"), NodeRef::Expr(y)));
        }
        ExprKind::Ellipsis(elt) => push_opt(out, "elt", boxed_expr(elt)),
        ExprKind::ArrayType { len, elem } => {
            push_opt(out, "len", boxed_expr(len));
            out.push((Edge::field("elt"), NodeRef::Expr(elem)));
        }
        ExprKind::StructType(fields) => {
            out.push((Edge::field("fields"), NodeRef::FieldList(fields)));
        }
        ExprKind::InterfaceType(methods) => {
            out.push((Edge::field("methods"), NodeRef::FieldList(methods)));
        }
        ExprKind::FuncType(ty) => out.push((Edge::field("func"), NodeRef::FuncType(ty))),
        ExprKind::MapType { key, value } => {
            out.push((Edge::field("key"), NodeRef::Expr(key)));
            out.push((Edge::field("value"), NodeRef::Expr(value)));
        }
        ExprKind::ChanType { value, .. } => {
            out.push((Edge::field("value"), NodeRef::Expr(value)));
        }
    }
}

fn stmt_children<'a>(out: &mut Children<'a>, stmt: &'a Stmt) {
    match &stmt.kind {
        StmtKind::Decl(gen) => gen_children(out, gen),
        StmtKind::Empty => {}
        StmtKind::Labeled { label, stmt } => {
            out.push((Edge::field("label"), NodeRef::Ident(label)));
            out.push((Edge::field("stmt"), NodeRef::Stmt(stmt)));
        }
        StmtKind::Expr(x) => out.push((Edge::field("x"), NodeRef::Expr(x))),
        StmtKind::Send { chan, value } => {
            out.push((Edge::field("chan"), NodeRef::Expr(chan)));
            out.push((Edge::field("value"), NodeRef::Expr(value)));
        }
        StmtKind::IncDec { x, .. } => out.push((Edge::field("x"), NodeRef::Expr(x))),
        StmtKind::Assign { lhs, rhs, .. } => {
            push_exprs(out, "lhs", lhs);
            push_exprs(out, "rhs", rhs);
        }
        StmtKind::Go(call) | StmtKind::Defer(call) => {
            out.push((Edge::field("call"), NodeRef::Expr(call)));
        }
        StmtKind::Return(results) => push_exprs(out, "results", results),
        StmtKind::Branch { label, .. } => {
            push_opt(out, "label", label.as_ref().map(NodeRef::Ident));
        }
        StmtKind::Block(block) => out.push((Edge::field("block"), NodeRef::Block(block))),
        StmtKind::If(s) => {
            push_opt(out, "init", boxed_stmt(&s.init));
            out.push((Edge::field("cond"), NodeRef::Expr(&s.cond)));
            out.push((Edge::field("body"), NodeRef::Block(&s.body)));
            push_opt(out, "else", boxed_stmt(&s.els));
        }
        StmtKind::Case(clause) => {
            push_exprs(out, "list", &clause.list);
            push_stmts(out, "body", &clause.body);
        }
        StmtKind::Switch(s) => {
            push_opt(out, "init", boxed_stmt(&s.init));
            push_opt(out, "tag", s.tag.as_ref().map(NodeRef::Expr));
            out.push((Edge::field("body"), NodeRef::Block(&s.body)));
        }
        StmtKind::TypeSwitch(s) => {
            push_opt(out, "init", boxed_stmt(&s.init));
            out.push((Edge::field("assign"), NodeRef::Stmt(&s.assign)));
            out.push((Edge::field("body"), NodeRef::Block(&s.body)));
        }
        StmtKind::Comm(clause) => {
            push_opt(out, "comm", boxed_stmt(&clause.comm));
            push_stmts(out, "body", &clause.body);
        }
        StmtKind::Select(body) => out.push((Edge::field("body"), NodeRef::Block(body))),
        StmtKind::For(s) => {
            push_opt(out, "init", boxed_stmt(&s.init));
            push_opt(out, "cond", s.cond.as_ref().map(NodeRef::Expr));
            push_opt(out, "post", boxed_stmt(&s.post));
            out.push((Edge::field("body"), NodeRef::Block(&s.body)));
        }
        StmtKind::Range(s) => {
            push_opt(out, "key", s.key.as_ref().map(NodeRef::Expr));
            push_opt(out, "value", s.value.as_ref().map(NodeRef::Expr));
            out.push((Edge::field("x"), NodeRef::Expr(&s.x)));
            out.push((Edge::field("body"), NodeRef::Block(&s.body)));
        }
    }
}

pub fn expr_kind_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Ident(_) => "Ident",
        ExprKind::BasicLit { .. } => "BasicLit",
        ExprKind::CompositeLit { .. } => "CompositeLit",
        ExprKind::KeyValue { .. } => "KeyValueExpr",
        ExprKind::FuncLit(_) => "FuncLit",
        ExprKind::Paren(_) => "ParenExpr",
        ExprKind::Selector { .. } => "SelectorExpr",
        ExprKind::Index { .. } => "IndexExpr",
        ExprKind::Slice { .. } => "SliceExpr",
        ExprKind::TypeAssert { .. } => "TypeAssertExpr",
        ExprKind::Call { .. } => "CallExpr",
        ExprKind::Star(_) => "StarExpr",
        ExprKind::Unary { .. } => "UnaryExpr",
        ExprKind::Binary { .. } => "BinaryExpr",
        ExprKind::Ellipsis(_) => "Ellipsis",
        ExprKind::ArrayType { .. } => "ArrayType",
        ExprKind::StructType(_) => "StructType",
        ExprKind::FuncType(_) => "FuncType",
        ExprKind::InterfaceType(_) => "InterfaceType",
        ExprKind::MapType { .. } => "MapType",
        ExprKind::ChanType { .. } => "ChanType",
    }
}

pub fn stmt_kind_name(kind: &StmtKind) -> &'static str {
    match kind {
        StmtKind::Decl(_) => "DeclStmt",
        StmtKind::Empty => "EmptyStmt",
        StmtKind::Labeled { .. } => "LabeledStmt",
        StmtKind::Expr(_) => "ExprStmt",
        StmtKind::Send { .. } => "SendStmt",
        StmtKind::IncDec { .. } => "IncDecStmt",
        StmtKind::Assign { .. } => "AssignStmt",
        StmtKind::Go(_) => "GoStmt",
        StmtKind::Defer(_) => "DeferStmt",
        StmtKind::Return(_) => "ReturnStmt",
        StmtKind::Branch { .. } => "BranchStmt",
        StmtKind::Block(_) => "BlockStmt",
        StmtKind::If(_) => "IfStmt",
        StmtKind::Case(_) => "CaseClause",
        StmtKind::Switch(_) => "SwitchStmt",
        StmtKind::TypeSwitch(_) => "TypeSwitchStmt",
        StmtKind::Comm(_) => "CommClause",
        StmtKind::Select(_) => "SelectStmt",
        StmtKind::For(_) => "ForStmt",
        StmtKind::Range(_) => "RangeStmt",
    }
}

fn opt_expr<'a>(expr: &'a mut Option<Box<Expr>>) -> Option<NodeMut<'a>> {
    expr.as_deref_mut().map(NodeMut::Expr)
}

fn opt_stmt<'a>(stmt: &'a mut Option<Box<Stmt>>) -> Option<NodeMut<'a>> {
    stmt.as_deref_mut().map(NodeMut::Stmt)
}

fn nth_expr(exprs: &mut [Expr], index: Option<usize>) -> Option<NodeMut<'_>> {
    exprs.get_mut(index?).map(NodeMut::Expr)
}

fn nth_stmt(stmts: &mut [Stmt], index: Option<usize>) -> Option<NodeMut<'_>> {
    stmts.get_mut(index?).map(NodeMut::Stmt)
}

fn nth_ident(idents: &mut [Ident], index: Option<usize>) -> Option<NodeMut<'_>> {
    idents.get_mut(index?).map(NodeMut::Ident)
}

impl<'a> NodeMut<'a> {
    pub fn as_ref(&self) -> NodeRef<'_> {
        match self {
            NodeMut::File(n) => NodeRef::File(n),
            NodeMut::Decl(n) => NodeRef::Decl(n),
            NodeMut::Spec(n) => NodeRef::Spec(n),
            NodeMut::FieldList(n) => NodeRef::FieldList(n),
            NodeMut::Field(n) => NodeRef::Field(n),
            NodeMut::FuncType(n) => NodeRef::FuncType(n),
            NodeMut::Ident(n) => NodeRef::Ident(n),
            NodeMut::Expr(n) => NodeRef::Expr(n),
            NodeMut::Stmt(n) => NodeRef::Stmt(n),
            NodeMut::Block(n) => NodeRef::Block(n),
        }
    }

    /// Follows one edge. Mirrors [`NodeRef::children`] field for field.
    pub fn into_child(self, edge: &Edge) -> Option<NodeMut<'a>> {
        let index = edge.index;
        match self {
            NodeMut::File(file) => match edge.field {
                "name" => Some(NodeMut::Ident(&mut file.package)),
                "decls" => file.decls.get_mut(index?).map(NodeMut::Decl),
                _ => None,
            },
            NodeMut::Decl(decl) => match &mut decl.kind {
                DeclKind::Func(func) => match edge.field {
                    "recv" => func.recv.as_mut().map(NodeMut::FieldList),
                    "name" => Some(NodeMut::Ident(&mut func.name)),
                    "type" => Some(NodeMut::FuncType(&mut func.ty)),
                    "body" => func.body.as_mut().map(NodeMut::Block),
                    _ => None,
                },
                DeclKind::Gen(gen) => match edge.field {
                    "specs" => gen.specs.get_mut(index?).map(NodeMut::Spec),
                    _ => None,
                },
            },
            NodeMut::Spec(spec) => match (&mut spec.kind, edge.field) {
                (SpecKind::Import(import), "name") => import.name.as_mut().map(NodeMut::Ident),
                (SpecKind::Value(value), "names") => nth_ident(&mut value.names, index),
                (SpecKind::Value(value), "type") => value.ty.as_mut().map(NodeMut::Expr),
                (SpecKind::Value(value), "values") => nth_expr(&mut value.values, index),
                (SpecKind::Type(ty), "name") => Some(NodeMut::Ident(&mut ty.name)),
                (SpecKind::Type(ty), "type_params") => {
                    ty.type_params.as_mut().map(NodeMut::FieldList)
                }
                (SpecKind::Type(ty), "type") => Some(NodeMut::Expr(&mut ty.ty)),
                _ => None,
            },
            NodeMut::FieldList(list) => match edge.field {
                "list" => list.fields.get_mut(index?).map(NodeMut::Field),
                _ => None,
            },
            NodeMut::Field(field) => match edge.field {
                "names" => nth_ident(&mut field.names, index),
                "type" => Some(NodeMut::Expr(&mut field.ty)),
                _ => None,
            },
            NodeMut::FuncType(ty) => match edge.field {
                "type_params" => ty.type_params.as_mut().map(NodeMut::FieldList),
                "params" => Some(NodeMut::FieldList(&mut ty.params)),
                "results" => ty.results.as_mut().map(NodeMut::FieldList),
                _ => None,
            },
            NodeMut::Ident(_) => None,
            NodeMut::Block(block) => match edge.field {
                "list" => nth_stmt(&mut block.stmts, index),
                _ => None,
            },
            NodeMut::Expr(expr) => expr_child_mut(expr, edge),
            NodeMut::Stmt(stmt) => stmt_child_mut(stmt, edge),
        }
    }
}

fn expr_child_mut<'a>(expr: &'a mut Expr, edge: &Edge) -> Option<NodeMut<'a>> {
    let index = edge.index;
    match (&mut expr.kind, edge.field) {
        (ExprKind::Ident(ident), "ident") => Some(NodeMut::Ident(ident)),
        (ExprKind::CompositeLit { ty, .. }, "type") => opt_expr(ty),
        (ExprKind::CompositeLit { elts, .. }, "elts") => nth_expr(elts, index),
        (ExprKind::KeyValue { key, .. }, "key") => Some(NodeMut::Expr(key)),
        (ExprKind::KeyValue { value, .. }, "value") => Some(NodeMut::Expr(value)),
        (ExprKind::FuncLit(lit), "type") => Some(NodeMut::FuncType(&mut lit.ty)),
        (ExprKind::FuncLit(lit), "body") => Some(NodeMut::Block(&mut lit.body)),
        (ExprKind::Paren(x), "x")
        | (ExprKind::Star(x), "x")
        | (ExprKind::Unary { x, .. }, "x")
        | (ExprKind::Selector { x, .. }, "x")
        | (ExprKind::Index { x, .. }, "x")
        | (ExprKind::Slice { x, .. }, "x")
        | (ExprKind::TypeAssert { x, .. }, "x")
        | (ExprKind::Binary { x, .. }, "x") => Some(NodeMut::Expr(x)),
        (ExprKind::Selector { sel, .. }, "sel") => Some(NodeMut::Ident(sel)),
        (ExprKind::Index { indices, .. }, "indices") => nth_expr(indices, index),
        (ExprKind::Slice { low, .. }, "low") => opt_expr(low),
        (ExprKind::Slice { high, .. }, "high") => opt_expr(high),
        (ExprKind::Slice { max, .. }, "max") => opt_expr(max),
        (ExprKind::TypeAssert { ty, .. }, "type") => opt_expr(ty),
        (ExprKind::Call { fun, .. }, "fun") => Some(NodeMut::Expr(fun)),
        (ExprKind::Call { args, .. }, "args") => nth_expr(args, index),
        (ExprKind::Binary { y, .. }, "y") => Some(NodeMut::Expr(y)),
        (ExprKind::Ellipsis(elt), "elt") => opt_expr(elt),
        (ExprKind::ArrayType { len, .. }, "len") => opt_expr(len),
        (ExprKind::ArrayType { elem, .. }, "elt") => Some(NodeMut::Expr(elem)),
        (ExprKind::StructType(fields), "fields") => Some(NodeMut::FieldList(fields)),
        (ExprKind::InterfaceType(methods), "methods") => Some(NodeMut::FieldList(methods)),
        (ExprKind::FuncType(ty), "func") => Some(NodeMut::FuncType(ty)),
        (ExprKind::MapType { key, .. }, "key") => Some(NodeMut::Expr(key)),
        (ExprKind::MapType { value, .. }, "value") => Some(NodeMut::Expr(value)),
        (ExprKind::ChanType { value, .. }, "value") => Some(NodeMut::Expr(value)),
        _ => None,
    }
}

fn stmt_child_mut<'a>(stmt: &'a mut Stmt, edge: &Edge) -> Option<NodeMut<'a>> {
    let index = edge.index;
    match (&mut stmt.kind, edge.field) {
        (StmtKind::Decl(gen), "specs") => gen.specs.get_mut(index?).map(NodeMut::Spec),
        (StmtKind::Labeled { label, .. }, "label") => Some(NodeMut::Ident(label)),
        (StmtKind::Labeled { stmt, .. }, "stmt") => Some(NodeMut::Stmt(stmt)),
        (StmtKind::Expr(x), "x") | (StmtKind::IncDec { x, .. }, "x") => Some(NodeMut::Expr(x)),
        (StmtKind::Send { chan, .. }, "chan") => Some(NodeMut::Expr(chan)),
        (StmtKind::Send { value, .. }, "value") => Some(NodeMut::Expr(value)),
        (StmtKind::Assign { lhs, .. }, "lhs") => nth_expr(lhs, index),
        (StmtKind::Assign { rhs, .. }, "rhs") => nth_expr(rhs, index),
        (StmtKind::Go(call), "call") | (StmtKind::Defer(call), "call") => {
            Some(NodeMut::Expr(call))
        }
        (StmtKind::Return(results), "results") => nth_expr(results, index),
        (StmtKind::Branch { label, .. }, "label") => label.as_mut().map(NodeMut::Ident),
        (StmtKind::Block(block), "block") => Some(NodeMut::Block(block)),
        (StmtKind::If(s), "init") => opt_stmt(&mut s.init),
        (StmtKind::If(s), "cond") => Some(NodeMut::Expr(&mut s.cond)),
        (StmtKind::If(s), "body") => Some(NodeMut::Block(&mut s.body)),
        (StmtKind::If(s), "else") => opt_stmt(&mut s.els),
        (StmtKind::Case(clause), "list") => nth_expr(&mut clause.list, index),
        (StmtKind::Case(clause), "body") => nth_stmt(&mut clause.body, index),
        (StmtKind::Switch(s), "init") => opt_stmt(&mut s.init),
        (StmtKind::Switch(s), "tag") => s.tag.as_mut().map(NodeMut::Expr),
        (StmtKind::Switch(s), "body") => Some(NodeMut::Block(&mut s.body)),
        (StmtKind::TypeSwitch(s), "init") => opt_stmt(&mut s.init),
        (StmtKind::TypeSwitch(s), "assign") => Some(NodeMut::Stmt(&mut s.assign)),
        (StmtKind::TypeSwitch(s), "body") => Some(NodeMut::Block(&mut s.body)),
        (StmtKind::Comm(clause), "comm") => opt_stmt(&mut clause.comm),
        (StmtKind::Comm(clause), "body") => nth_stmt(&mut clause.body, index),
        (StmtKind::Select(body), "body") => Some(NodeMut::Block(body)),
        (StmtKind::For(s), "init") => opt_stmt(&mut s.init),
        (StmtKind::For(s), "cond") => s.cond.as_mut().map(NodeMut::Expr),
        (StmtKind::For(s), "post") => opt_stmt(&mut s.post),
        (StmtKind::For(s), "body") => Some(NodeMut::Block(&mut s.body)),
        (StmtKind::Range(s), "key") => s.key.as_mut().map(NodeMut::Expr),
        (StmtKind::Range(s), "value") => s.value.as_mut().map(NodeMut::Expr),
        (StmtKind::Range(s), "x") => Some(NodeMut::Expr(&mut s.x)),
        (StmtKind::Range(s), "body") => Some(NodeMut::Block(&mut s.body)),
        _ => None,
    }
}

/// Pre-order walk. The callback receives the node and its ancestors
/// (outermost first) and returns `false` to skip the node's children.
pub fn walk<'a, F>(root: NodeRef<'a>, visit: &mut F)
where
    F: FnMut(NodeRef<'a>, &[NodeRef<'a>]) -> bool,
{
    let mut ancestors = Vec::new();
    walk_inner(root, &mut ancestors, visit);
}

fn walk_inner<'a, F>(node: NodeRef<'a>, ancestors: &mut Vec<NodeRef<'a>>, visit: &mut F)
where
    F: FnMut(NodeRef<'a>, &[NodeRef<'a>]) -> bool,
{
    if !visit(node, ancestors) {
        return;
    }
    ancestors.push(node);
    for (_, child) in node.children() {
        walk_inner(child, ancestors, visit);
    }
    ancestors.pop();
}

/// Pre-order walk that hands the callback the whole root-to-node path, in
/// the shape [`path_to`] returns. Returning `false` skips the children.
pub fn walk_paths<'a, F>(root: NodeRef<'a>, visit: &mut F)
where
    F: FnMut(&[(Option<Edge>, NodeRef<'a>)]) -> bool,
{
    let mut path = vec![(None, root)];
    walk_paths_inner(&mut path, visit);
}

fn walk_paths_inner<'a, F>(path: &mut Vec<(Option<Edge>, NodeRef<'a>)>, visit: &mut F)
where
    F: FnMut(&[(Option<Edge>, NodeRef<'a>)]) -> bool,
{
    if !visit(path) {
        return;
    }
    let Some(&(_, node)) = path.last() else {
        return;
    };
    for (edge, child) in node.children() {
        path.push((Some(edge), child));
        walk_paths_inner(path, visit);
        path.pop();
    }
}

/// Root-to-target chain of `(edge, node)` steps, found by node identity.
/// The first element is the root with no incoming edge.
pub fn path_to<'a>(root: NodeRef<'a>, target: NodeId) -> Option<Vec<(Option<Edge>, NodeRef<'a>)>> {
    let mut path = vec![(None, root)];
    if find_path(root, target, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn find_path<'a>(
    node: NodeRef<'a>,
    target: NodeId,
    path: &mut Vec<(Option<Edge>, NodeRef<'a>)>,
) -> bool {
    if node.id() == target {
        return true;
    }
    for (edge, child) in node.children() {
        path.push((Some(edge), child));
        if find_path(child, target, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Edges leading from `root` down to `target`.
pub fn edges_to(root: NodeRef<'_>, target: NodeId) -> Option<Vec<Edge>> {
    Some(path_to(root, target)?.into_iter().filter_map(|(edge, _)| edge).collect())
}

/// Mutable access to the node `target` below `root`.
pub fn find_mut<'a>(root: NodeMut<'a>, target: NodeId) -> Option<NodeMut<'a>> {
    let edges = edges_to(root.as_ref(), target)?;
    follow_mut(root, &edges)
}

/// Follows `edges` from `root`, returning `None` when an edge does not exist.
pub fn follow_mut<'a>(root: NodeMut<'a>, edges: &[Edge]) -> Option<NodeMut<'a>> {
    let mut node = root;
    for edge in edges {
        node = node.into_child(edge)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_file;

    #[test]
    fn path_to_finds_call_inside_function_body() {
        let mut ids = IdGen::default();
        let file = parse_file("package p\n\nfunc f() {\n\tg()\n}\n", &mut ids).expect("parses");
        let mut call_id = None;
        walk(NodeRef::File(&file), &mut |node, _| {
            if node.kind_name() == "CallExpr" {
                call_id = Some(node.id());
            }
            true
        });
        let path = path_to(NodeRef::File(&file), call_id.expect("call")).expect("path");
        let edges: Vec<String> = path
            .iter()
            .filter_map(|(edge, _)| edge.map(|e| e.to_string()))
            .collect();
        assert_eq!(edges, vec!["decls[0]", "body", "list[0]", "x"]);
        assert_eq!(path.last().map(|(_, n)| n.kind_name()), Some("CallExpr"));
    }

    #[test]
    fn follow_mut_mirrors_children() {
        let mut ids = IdGen::default();
        let mut file =
            parse_file("package p\n\nfunc f() {\n\tx := g(1, 2)\n}\n", &mut ids).expect("parses");
        let edges = [
            Edge::at("decls", 0),
            Edge::field("body"),
            Edge::at("list", 0),
            Edge::at("rhs", 0),
            Edge::at("args", 1),
        ];
        let node = follow_mut(NodeMut::File(&mut file), &edges).expect("edge chain resolves");
        assert_eq!(node.as_ref().kind_name(), "BasicLit");
    }
}
