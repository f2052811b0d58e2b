use super::Checker;
use crate::syntax::ast::*;
use crate::types::infer::{substitute_signature, unify, Bindings};
use crate::types::methods::{lookup, Lookup};
use crate::types::{
    BasicKind, Builtin, InterfaceType, Level, ObjId, ObjKind, Object, Param, PkgId, Receiver,
    Selection, SelectionKind, Signature, StructField, Type,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mode {
    Invalid,
    NoValue,
    Value,
    Type,
    Builtin(Builtin),
    Package(PkgId),
}

#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub mode: Mode,
    pub ty: Type,
    /// Map index, type assertion or receive: may yield a second `bool`.
    pub comma_ok: bool,
}

impl Operand {
    fn invalid() -> Self {
        Self {
            mode: Mode::Invalid,
            ty: Type::Invalid,
            comma_ok: false,
        }
    }

    fn value(ty: Type) -> Self {
        Self {
            mode: Mode::Value,
            ty,
            comma_ok: false,
        }
    }

    fn ty(ty: Type) -> Self {
        Self {
            mode: Mode::Type,
            ty,
            comma_ok: false,
        }
    }

    fn comma_ok(ty: Type) -> Self {
        Self {
            mode: Mode::Value,
            ty,
            comma_ok: true,
        }
    }
}

fn basic(kind: BasicKind) -> Type {
    Type::Basic(kind)
}

fn const_len(expr: &Expr) -> Option<u64> {
    match &expr.kind {
        ExprKind::BasicLit {
            kind: LitKind::Int,
            value,
        } => value.replace('_', "").parse().ok(),
        _ => None,
    }
}

fn param_type(sig: &Signature, index: usize, spread: bool) -> Option<Type> {
    let last = sig.params.len().checked_sub(1)?;
    if sig.variadic && index >= last {
        let slice = sig.params[last].ty.clone();
        if spread {
            return Some(slice);
        }
        return match slice {
            Type::Slice(elem) => Some(*elem),
            other => Some(other),
        };
    }
    sig.params.get(index).map(|p| p.ty.clone())
}

impl Checker<'_> {
    pub(crate) fn expr(&mut self, expr: &Expr, hint: Option<&Type>) -> Operand {
        let operand = self.expr_inner(expr, hint);
        match operand.mode {
            Mode::Value | Mode::Type => {
                self.info.types.insert(expr.id, operand.ty.clone());
            }
            Mode::NoValue => {
                self.info.types.insert(expr.id, Type::Tuple(Vec::new()));
            }
            _ => {}
        }
        operand
    }

    pub(crate) fn value_type(&mut self, expr: &Expr, hint: Option<&Type>) -> Type {
        let operand = self.expr(expr, hint);
        match operand.mode {
            Mode::Value => operand.ty,
            _ => Type::Invalid,
        }
    }

    pub(crate) fn type_expr(&mut self, expr: &Expr) -> Type {
        let operand = self.expr(expr, None);
        match operand.mode {
            Mode::Type => operand.ty,
            _ => Type::Invalid,
        }
    }

    /// Types bound to `count` names by `values`, spreading a single
    /// multi-valued expression.
    pub(crate) fn value_types(&mut self, values: &[Expr], count: usize, hint: Option<&Type>) -> Vec<Type> {
        if values.len() == 1 && count > 1 {
            let operand = self.expr(&values[0], hint);
            return match operand.ty {
                Type::Tuple(items) => items,
                ty if operand.comma_ok => vec![ty, basic(BasicKind::Bool)],
                ty => vec![ty],
            };
        }
        values.iter().map(|v| self.value_type(v, hint)).collect()
    }

    fn expr_inner(&mut self, expr: &Expr, hint: Option<&Type>) -> Operand {
        match &expr.kind {
            ExprKind::Ident(ident) => self.ident(ident),
            ExprKind::BasicLit { kind, .. } => Operand::value(basic(match kind {
                LitKind::Int => BasicKind::UntypedInt,
                LitKind::Float => BasicKind::UntypedFloat,
                LitKind::Imag => BasicKind::Complex128,
                LitKind::Char => BasicKind::UntypedRune,
                LitKind::String => BasicKind::UntypedString,
            })),
            ExprKind::CompositeLit { ty, elts, .. } => self.composite(ty.as_deref(), elts, hint),
            ExprKind::KeyValue { key, value } => {
                self.expr(key, None);
                self.expr(value, None);
                Operand::invalid()
            }
            ExprKind::FuncLit(lit) => {
                self.scopes.push(Default::default());
                let sig = self.signature(&lit.ty);
                self.declare_params(&lit.ty, &sig);
                self.results.push(sig.result_types());
                self.scopes.push(Default::default());
                self.stmts(&lit.body.stmts);
                self.scopes.pop();
                self.results.pop();
                self.scopes.pop();
                Operand::value(Type::Func(Box::new(sig)))
            }
            ExprKind::Paren(inner) => self.expr(inner, hint),
            ExprKind::Selector { x, sel } => self.selector(expr, x, sel),
            ExprKind::Index { x, indices } => self.index(x, indices),
            ExprKind::Slice { x, low, high, max, .. } => {
                let ty = self.value_type(x, None);
                for index in [low, high, max].into_iter().flatten() {
                    self.expr(index, None);
                }
                let result = match self.store.underlying(&ty) {
                    Type::Basic(kind) if kind.is_string() => basic(BasicKind::String),
                    Type::Slice(_) => ty,
                    Type::Array(_, elem) => Type::Slice(elem),
                    Type::Pointer(base) => match self.store.underlying(&base) {
                        Type::Array(_, elem) => Type::Slice(elem),
                        _ => Type::Invalid,
                    },
                    _ => Type::Invalid,
                };
                Operand::value(result)
            }
            ExprKind::TypeAssert { x, ty } => {
                let x_ty = self.value_type(x, None);
                match ty {
                    Some(ty) => Operand::comma_ok(self.type_expr(ty)),
                    None => Operand::value(x_ty),
                }
            }
            ExprKind::Call { fun, args, ellipsis, .. } => self.call(fun, args, *ellipsis, hint),
            ExprKind::Star(inner) => {
                let operand = self.expr(inner, None);
                match operand.mode {
                    Mode::Type => Operand::ty(Type::Pointer(Box::new(operand.ty))),
                    Mode::Value => match self.store.underlying(&operand.ty) {
                        Type::Pointer(base) => Operand::value(*base),
                        _ => Operand::invalid(),
                    },
                    _ => Operand::invalid(),
                }
            }
            ExprKind::Unary { op, x } => self.unary(*op, x, hint),
            ExprKind::Binary { op, x, y } => self.binary(*op, x, y, hint),
            ExprKind::Ellipsis(elem) => {
                let elem = elem.as_ref().map(|e| self.type_expr(e)).unwrap_or(Type::Invalid);
                Operand::ty(Type::Slice(Box::new(elem)))
            }
            ExprKind::ArrayType { len, elem } => {
                let elem = self.type_expr(elem);
                match len {
                    None => Operand::ty(Type::Slice(Box::new(elem))),
                    Some(len) => {
                        let n = const_len(len);
                        if n.is_none() && !matches!(len.kind, ExprKind::Ellipsis(None)) {
                            self.expr(len, None);
                        }
                        Operand::ty(Type::Array(n, Box::new(elem)))
                    }
                }
            }
            ExprKind::StructType(list) => {
                let mut fields = Vec::new();
                for field in &list.fields {
                    let ty = self.type_expr(&field.ty);
                    if field.names.is_empty() {
                        let name = super::base_type_name(&field.ty)
                            .map(|(ident, _, _)| ident.name.clone())
                            .unwrap_or_default();
                        fields.push(StructField { name, ty, embedded: true });
                    } else {
                        for name in &field.names {
                            fields.push(StructField {
                                name: name.name.clone(),
                                ty: ty.clone(),
                                embedded: false,
                            });
                        }
                    }
                }
                Operand::ty(Type::Struct(fields))
            }
            ExprKind::FuncType(ty) => {
                self.scopes.push(Default::default());
                let sig = self.signature(ty);
                self.scopes.pop();
                Operand::ty(Type::Func(Box::new(sig)))
            }
            ExprKind::InterfaceType(list) => self.interface(list),
            ExprKind::MapType { key, value } => {
                let key = self.type_expr(key);
                let value = self.type_expr(value);
                Operand::ty(Type::Map(Box::new(key), Box::new(value)))
            }
            ExprKind::ChanType { dir, value } => {
                let value = self.type_expr(value);
                Operand::ty(Type::Chan(*dir, Box::new(value)))
            }
        }
    }

    fn ident(&mut self, ident: &Ident) -> Operand {
        if ident.is_blank() {
            return Operand::invalid();
        }
        let Some(obj) = self.lookup(&ident.name) else {
            self.warn(format!("undefined: {}", ident.name));
            return Operand::invalid();
        };
        self.info.uses.insert(ident.id, obj);
        self.operand_for(obj)
    }

    fn operand_for(&mut self, obj: ObjId) -> Operand {
        let object = self.store.obj(obj);
        match object.kind {
            ObjKind::Var | ObjKind::Const | ObjKind::Func | ObjKind::Nil => Operand::value(object.ty.clone()),
            ObjKind::TypeName => Operand::ty(object.ty.clone()),
            ObjKind::PkgName(pkg) => Operand {
                mode: Mode::Package(pkg),
                ty: Type::Invalid,
                comma_ok: false,
            },
            ObjKind::Builtin(builtin) => Operand {
                mode: Mode::Builtin(builtin),
                ty: Type::Invalid,
                comma_ok: false,
            },
        }
    }

    fn composite(&mut self, ty: Option<&Expr>, elts: &[Expr], hint: Option<&Type>) -> Operand {
        let (lit_ty, result) = match ty {
            Some(ty) => {
                let t = self.type_expr(ty);
                (t.clone(), t)
            }
            None => match hint {
                Some(Type::Pointer(base)) => ((**base).clone(), Type::Pointer(base.clone())),
                Some(hint) => (hint.clone(), hint.clone()),
                None => (Type::Invalid, Type::Invalid),
            },
        };
        match self.store.underlying(&lit_ty) {
            Type::Struct(fields) => {
                for (i, elt) in elts.iter().enumerate() {
                    match &elt.kind {
                        ExprKind::KeyValue { key, value } => {
                            let field_ty = key
                                .as_ident()
                                .and_then(|k| fields.iter().find(|f| f.name == k.name))
                                .map(|f| f.ty.clone());
                            self.expr(value, field_ty.as_ref());
                        }
                        _ => {
                            let field_ty = fields.get(i).map(|f| f.ty.clone());
                            self.expr(elt, field_ty.as_ref());
                        }
                    }
                }
            }
            Type::Slice(elem) | Type::Array(_, elem) => {
                for elt in elts {
                    match &elt.kind {
                        ExprKind::KeyValue { key, value } => {
                            self.expr(key, None);
                            self.expr(value, Some(&*elem));
                        }
                        _ => {
                            self.expr(elt, Some(&*elem));
                        }
                    }
                }
                if let Type::Array(None, elem) = &lit_ty {
                    return Operand::value(Type::Array(Some(elts.len() as u64), elem.clone()));
                }
            }
            Type::Map(key_ty, value_ty) => {
                for elt in elts {
                    if let ExprKind::KeyValue { key, value } = &elt.kind {
                        self.expr(key, Some(&*key_ty));
                        self.expr(value, Some(&*value_ty));
                    } else {
                        self.expr(elt, None);
                    }
                }
            }
            _ => {
                for elt in elts {
                    if let ExprKind::KeyValue { value, .. } = &elt.kind {
                        self.expr(value, None);
                    } else {
                        self.expr(elt, None);
                    }
                }
            }
        }
        Operand::value(result)
    }

    fn selector(&mut self, expr: &Expr, x: &Expr, sel: &Ident) -> Operand {
        if let ExprKind::Ident(base) = &x.kind {
            if let Some(obj) = self.lookup(&base.name) {
                if let ObjKind::PkgName(pkg) = self.store.obj(obj).kind {
                    self.info.uses.insert(base.id, obj);
                    let member = self.store.package(pkg).members.get(&sel.name).copied();
                    let Some(member) = member else {
                        if !self.store.package(pkg).opaque {
                            self.warn(format!("undefined: {}.{}", base.name, sel.name));
                        }
                        return Operand::invalid();
                    };
                    self.info.uses.insert(sel.id, member);
                    return self.operand_for(member);
                }
            }
        }
        let operand = self.expr(x, None);
        match operand.mode {
            Mode::Type => {
                let Some(Lookup::Method { obj, sig, .. }) = lookup(self.store, &operand.ty, &sel.name) else {
                    return Operand::invalid();
                };
                self.info.uses.insert(sel.id, obj);
                let mut params = vec![Param::unnamed(operand.ty.clone())];
                params.extend(sig.params.iter().cloned());
                let ty = Type::Func(Box::new(Signature { params, ..sig }));
                self.info.selections.insert(
                    expr.id,
                    Selection {
                        kind: SelectionKind::MethodExpr,
                        obj: Some(obj),
                        recv: operand.ty,
                        ty: ty.clone(),
                    },
                );
                Operand::value(ty)
            }
            Mode::Value => match lookup(self.store, &operand.ty, &sel.name) {
                Some(Lookup::Field { ty, .. }) => {
                    self.info.selections.insert(
                        expr.id,
                        Selection {
                            kind: SelectionKind::Field,
                            obj: None,
                            recv: operand.ty,
                            ty: ty.clone(),
                        },
                    );
                    Operand::value(ty)
                }
                Some(Lookup::Method { obj, sig, .. }) => {
                    self.info.uses.insert(sel.id, obj);
                    let ty = Type::Func(Box::new(sig));
                    self.info.selections.insert(
                        expr.id,
                        Selection {
                            kind: SelectionKind::Method,
                            obj: Some(obj),
                            recv: operand.ty,
                            ty: ty.clone(),
                        },
                    );
                    Operand::value(ty)
                }
                None => Operand::invalid(),
            },
            _ => Operand::invalid(),
        }
    }

    fn index(&mut self, x: &Expr, indices: &[Expr]) -> Operand {
        let operand = self.expr(x, None);
        match operand.mode {
            Mode::Type => {
                let args: Vec<Type> = indices.iter().map(|i| self.type_expr(i)).collect();
                match operand.ty {
                    Type::Named(id, _) => Operand::ty(Type::Named(id, args)),
                    other => Operand::ty(other),
                }
            }
            Mode::Value => {
                if let Type::Func(sig) = &operand.ty {
                    if !sig.type_params.is_empty() {
                        let args: Vec<Type> = indices.iter().map(|i| self.type_expr(i)).collect();
                        let map: Bindings = sig.type_params.iter().copied().zip(args).collect();
                        return Operand::value(Type::Func(Box::new(substitute_signature(sig, &map))));
                    }
                }
                let container = self.store.underlying(&operand.ty);
                let container = match container {
                    Type::Pointer(base) => self.store.underlying(&base),
                    other => other,
                };
                match container {
                    Type::Map(key, value) => {
                        for index in indices {
                            self.expr(index, Some(&*key));
                        }
                        Operand::comma_ok(*value)
                    }
                    Type::Slice(elem) | Type::Array(_, elem) => {
                        for index in indices {
                            self.expr(index, None);
                        }
                        Operand::value(*elem)
                    }
                    Type::Basic(kind) if kind.is_string() => {
                        for index in indices {
                            self.expr(index, None);
                        }
                        Operand::value(basic(BasicKind::Uint8))
                    }
                    _ => {
                        for index in indices {
                            self.expr(index, None);
                        }
                        Operand::invalid()
                    }
                }
            }
            _ => {
                for index in indices {
                    self.expr(index, None);
                }
                Operand::invalid()
            }
        }
    }

    fn call(&mut self, fun: &Expr, args: &[Expr], spread: bool, hint: Option<&Type>) -> Operand {
        let callee = self.expr(fun, None);
        match callee.mode {
            Mode::Type => {
                for arg in args {
                    self.expr(arg, Some(&callee.ty));
                }
                Operand::value(callee.ty)
            }
            Mode::Builtin(builtin) => self.builtin(builtin, args, hint),
            Mode::Value => {
                let Type::Func(sig) = self.store.underlying(&callee.ty) else {
                    for arg in args {
                        self.expr(arg, None);
                    }
                    return Operand::invalid();
                };
                let arg_types: Vec<Type> = if args.len() == 1 && sig.params.len() > 1 {
                    match self.value_type(&args[0], None) {
                        Type::Tuple(items) => items,
                        other => vec![other],
                    }
                } else {
                    args.iter()
                        .enumerate()
                        .map(|(i, arg)| {
                            let hint = param_type(&sig, i, spread);
                            self.value_type(arg, hint.as_ref())
                        })
                        .collect()
                };
                let sig = if sig.type_params.is_empty() {
                    *sig
                } else {
                    let mut map = Bindings::new();
                    for (i, arg) in arg_types.iter().enumerate() {
                        if let Some(param) = param_type(&sig, i, spread) {
                            let arg = self.store.default_type(arg);
                            unify(&param, &arg, &sig.type_params, &mut map);
                        }
                    }
                    substitute_signature(&sig, &map)
                };
                if sig.results.is_empty() {
                    Operand {
                        mode: Mode::NoValue,
                        ty: Type::Tuple(Vec::new()),
                        comma_ok: false,
                    }
                } else {
                    Operand::value(sig.call_type())
                }
            }
            _ => {
                for arg in args {
                    self.expr(arg, None);
                }
                Operand::invalid()
            }
        }
    }

    fn builtin(&mut self, builtin: Builtin, args: &[Expr], hint: Option<&Type>) -> Operand {
        let no_value = Operand {
            mode: Mode::NoValue,
            ty: Type::Tuple(Vec::new()),
            comma_ok: false,
        };
        match builtin {
            Builtin::Make | Builtin::New => {
                let Some((first, rest)) = args.split_first() else {
                    return Operand::invalid();
                };
                let ty = self.type_expr(first);
                for arg in rest {
                    self.expr(arg, None);
                }
                if builtin == Builtin::New {
                    Operand::value(Type::Pointer(Box::new(ty)))
                } else {
                    Operand::value(ty)
                }
            }
            Builtin::Append => {
                let Some((first, rest)) = args.split_first() else {
                    return Operand::invalid();
                };
                let slice = self.value_type(first, hint);
                let elem = match self.store.underlying(&slice) {
                    Type::Slice(elem) => Some(*elem),
                    _ => None,
                };
                for arg in rest {
                    self.expr(arg, elem.as_ref());
                }
                Operand::value(slice)
            }
            Builtin::Len | Builtin::Cap | Builtin::Copy => {
                for arg in args {
                    self.expr(arg, None);
                }
                Operand::value(basic(BasicKind::Int))
            }
            Builtin::Min | Builtin::Max => {
                let types: Vec<Type> = args.iter().map(|a| self.value_type(a, hint)).collect();
                let ty = types
                    .iter()
                    .find(|t| !matches!(t, Type::Basic(k) if k.is_untyped()))
                    .or(types.first())
                    .cloned()
                    .unwrap_or(Type::Invalid);
                Operand::value(ty)
            }
            Builtin::Complex => {
                for arg in args {
                    self.expr(arg, None);
                }
                Operand::value(basic(BasicKind::Complex128))
            }
            Builtin::Real | Builtin::Imag => {
                for arg in args {
                    self.expr(arg, None);
                }
                Operand::value(basic(BasicKind::Float64))
            }
            Builtin::Recover => Operand::value(Type::empty_interface()),
            Builtin::Panic
            | Builtin::Print
            | Builtin::Println
            | Builtin::Close
            | Builtin::Delete
            | Builtin::Clear => {
                for arg in args {
                    self.expr(arg, None);
                }
                no_value
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, x: &Expr, hint: Option<&Type>) -> Operand {
        match op {
            UnaryOp::Addr => {
                let inner_hint = match hint {
                    Some(Type::Pointer(base)) => Some((**base).clone()),
                    _ => None,
                };
                let ty = self.value_type(x, inner_hint.as_ref());
                Operand::value(Type::Pointer(Box::new(ty)))
            }
            UnaryOp::Recv => {
                let ty = self.value_type(x, None);
                match self.store.underlying(&ty) {
                    Type::Chan(_, elem) => Operand::comma_ok(*elem),
                    _ => Operand::invalid(),
                }
            }
            UnaryOp::Tilde => {
                self.expr(x, None);
                Operand::ty(Type::Interface(InterfaceType {
                    has_terms: true,
                    ..InterfaceType::default()
                }))
            }
            UnaryOp::Not | UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Xor => {
                Operand::value(self.value_type(x, hint))
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, x: &Expr, y: &Expr, hint: Option<&Type>) -> Operand {
        let left = self.expr(x, hint);
        let right = self.expr(y, hint);
        if left.mode == Mode::Type || right.mode == Mode::Type {
            return Operand::ty(Type::Interface(InterfaceType {
                has_terms: true,
                ..InterfaceType::default()
            }));
        }
        if op.is_comparison() {
            return Operand::value(basic(BasicKind::UntypedBool));
        }
        let ty = match (&left.ty, &right.ty) {
            (_, _) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => left.ty.clone(),
            (Type::Basic(kind), other) if kind.is_untyped() && !other.is_invalid() => other.clone(),
            _ => left.ty.clone(),
        };
        Operand::value(ty)
    }

    fn interface(&mut self, list: &FieldList) -> Operand {
        let mut iface = InterfaceType::default();
        for field in &list.fields {
            match (&field.names[..], &field.ty.kind) {
                ([name], ExprKind::FuncType(ty)) => {
                    self.scopes.push(Default::default());
                    let sig = self.signature(ty);
                    self.scopes.pop();
                    let method = self.store.new_obj(Object {
                        name: name.name.clone(),
                        kind: ObjKind::Func,
                        ty: Type::Func(Box::new(sig)),
                        pkg: Some(self.pkg),
                        level: Level::Package,
                        decl: Some(name.id),
                        recv: Some(Receiver {
                            named: None,
                            pointer: false,
                            interface: true,
                        }),
                    });
                    self.info.defs.insert(name.id, method);
                    iface.methods.push(method);
                }
                _ => {
                    let operand = self.expr(&field.ty, None);
                    let embedded_iface = operand.mode == Mode::Type
                        && matches!(self.store.underlying(&operand.ty), Type::Interface(ref e) if !e.has_terms);
                    if embedded_iface {
                        iface.embeds.push(operand.ty);
                    } else {
                        iface.has_terms = true;
                    }
                }
            }
        }
        Operand::ty(Type::Interface(iface))
    }
}
