use super::Printer;
use crate::syntax::ast::*;

const LOWEST_PREC: u8 = 0;
const UNARY_PREC: u8 = 6;
const HIGHEST_PREC: u8 = 7;

fn binary_parts(expr: &Expr) -> Option<(BinaryOp, &Expr, &Expr)> {
    match &expr.kind {
        ExprKind::Binary { op, x, y } => Some((*op, x, y)),
        _ => None,
    }
}

/// Scans a binary expression for mixed precedence levels and operator
/// pairs that would fuse into another token without a blank.
fn walk_binary(expr: &Expr) -> (bool, bool, u8) {
    let Some((op, x, y)) = binary_parts(expr) else {
        return (false, false, 0);
    };
    let prec = op.precedence();
    let mut has4 = prec == 4;
    let mut has5 = prec == 5;
    let mut max_problem = 0;

    if let Some((left_op, _, _)) = binary_parts(x) {
        if left_op.precedence() >= prec {
            let (h4, h5, problem) = walk_binary(x);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(problem);
        }
    }
    match &y.kind {
        ExprKind::Binary { op: right_op, .. } => {
            if right_op.precedence() > prec {
                let (h4, h5, problem) = walk_binary(y);
                has4 |= h4;
                has5 |= h5;
                max_problem = max_problem.max(problem);
            }
        }
        ExprKind::Star(_) if op == BinaryOp::Quo => max_problem = 5,
        ExprKind::Unary { op: unary, .. } => {
            let pair = format!("{}{}", op.text(), unary.text());
            match pair.as_str() {
                "&&" | "&^" => max_problem = 5,
                "++" | "--" => max_problem = max_problem.max(4),
                _ => {}
            }
        }
        _ => {}
    }
    (has4, has5, max_problem)
}

fn cutoff(expr: &Expr, depth: usize) -> u8 {
    let (has4, has5, max_problem) = walk_binary(expr);
    if max_problem > 0 {
        return max_problem + 1;
    }
    match (has4 && has5, depth == 1) {
        (true, true) => 5,
        (true, false) => 4,
        (false, true) => 6,
        (false, false) => 4,
    }
}

fn diff_prec(expr: &Expr, prec: u8) -> usize {
    match binary_parts(expr) {
        Some((op, _, _)) if op.precedence() == prec => 0,
        _ => 1,
    }
}

fn reduce_depth(depth: usize) -> usize {
    depth.saturating_sub(1).max(1)
}

fn is_binary(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Binary { .. })
}

impl Printer {
    pub(crate) fn expr(&mut self, expr: &Expr) {
        self.expr1(expr, LOWEST_PREC, 1);
    }

    fn expr0(&mut self, expr: &Expr, depth: usize) {
        self.expr1(expr, LOWEST_PREC, depth);
    }

    pub(crate) fn expr_list(&mut self, exprs: &[Expr], depth: usize) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr0(expr, depth);
        }
    }

    fn expr1(&mut self, expr: &Expr, prec1: u8, depth: usize) {
        match &expr.kind {
            ExprKind::Ident(ident) => self.write(&ident.name),
            ExprKind::BasicLit { value, .. } => self.write(value),
            ExprKind::Binary { .. } => {
                let cut = cutoff(expr, depth);
                self.binary(expr, prec1, cut, depth);
            }
            ExprKind::KeyValue { key, value } => {
                self.expr(key);
                self.write(": ");
                self.expr(value);
            }
            ExprKind::Star(inner) => {
                if UNARY_PREC < prec1 {
                    self.write("(*");
                    self.expr(inner);
                    self.write(")");
                } else {
                    self.write("*");
                    self.expr(inner);
                }
            }
            ExprKind::Unary { op, x } => {
                if UNARY_PREC < prec1 {
                    self.write("(");
                    self.expr(expr);
                    self.write(")");
                } else {
                    self.write(op.text());
                    if let ExprKind::Unary { op: inner, .. } = &x.kind {
                        if matches!((op, inner), (UnaryOp::Neg, UnaryOp::Neg) | (UnaryOp::Pos, UnaryOp::Pos)) {
                            self.write(" ");
                        }
                    }
                    self.expr1(x, UNARY_PREC, depth);
                }
            }
            ExprKind::Paren(inner) => {
                self.write("(");
                self.expr0(inner, reduce_depth(depth));
                self.write(")");
            }
            ExprKind::Selector { x, sel } => {
                self.expr1(x, HIGHEST_PREC, depth);
                self.write(".");
                self.write(&sel.name);
            }
            ExprKind::TypeAssert { x, ty } => {
                self.expr1(x, HIGHEST_PREC, depth);
                self.write(".(");
                match ty {
                    Some(ty) => self.expr(ty),
                    None => self.write("type"),
                }
                self.write(")");
            }
            ExprKind::Index { x, indices } => {
                self.expr1(x, HIGHEST_PREC, 1);
                self.write("[");
                self.expr_list(indices, depth + 1);
                self.write("]");
            }
            ExprKind::Slice {
                x, low, high, max, three,
            } => {
                self.expr1(x, HIGHEST_PREC, 1);
                self.write("[");
                let mut indices = vec![low.as_deref(), high.as_deref()];
                if *three {
                    indices.push(max.as_deref());
                }
                let count = indices.iter().flatten().count();
                let blanks = depth <= 1 && count > 1 && indices.iter().flatten().any(|e| is_binary(e));
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        if indices[i - 1].is_some() && blanks {
                            self.write(" ");
                        }
                        self.write(":");
                        if index.is_some() && blanks {
                            self.write(" ");
                        }
                    }
                    if let Some(index) = index {
                        self.expr0(index, depth + 1);
                    }
                }
                self.write("]");
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
                multiline,
            } => {
                let depth = if args.len() > 1 { depth + 1 } else { depth };
                if matches!(fun.kind, ExprKind::FuncType(_)) {
                    self.write("(");
                    self.expr(fun);
                    self.write(")");
                } else {
                    self.expr1(fun, HIGHEST_PREC, depth);
                }
                self.write("(");
                if *multiline && !args.is_empty() {
                    self.indent += 1;
                    for (i, arg) in args.iter().enumerate() {
                        self.newline();
                        self.expr0(arg, depth);
                        if *ellipsis && i + 1 == args.len() {
                            self.write("...");
                        }
                        self.write(",");
                    }
                    self.indent -= 1;
                    self.newline();
                } else {
                    self.expr_list(args, depth);
                    if *ellipsis {
                        self.write("...");
                    }
                }
                self.write(")");
            }
            ExprKind::CompositeLit {
                ty,
                elts,
                multiline,
            } => {
                if let Some(ty) = ty {
                    self.expr1(ty, HIGHEST_PREC, depth);
                }
                self.write("{");
                if *multiline && !elts.is_empty() {
                    self.element_lines(elts);
                    self.newline();
                } else {
                    self.expr_list(elts, 1);
                }
                self.write("}");
            }
            ExprKind::FuncLit(lit) => {
                self.write("func");
                self.signature(&lit.ty);
                self.write(" ");
                self.func_body(&lit.body);
            }
            ExprKind::Ellipsis(elt) => {
                self.write("...");
                if let Some(elt) = elt {
                    self.expr(elt);
                }
            }
            ExprKind::ArrayType { len, elem } => {
                self.write("[");
                if let Some(len) = len {
                    self.expr(len);
                }
                self.write("]");
                self.expr(elem);
            }
            ExprKind::StructType(fields) => self.field_block("struct", fields, false),
            ExprKind::InterfaceType(fields) => self.field_block("interface", fields, true),
            ExprKind::FuncType(ty) => {
                self.write("func");
                self.signature(ty);
            }
            ExprKind::MapType { key, value } => {
                self.write("map[");
                self.expr(key);
                self.write("]");
                self.expr(value);
            }
            ExprKind::ChanType { dir, value } => {
                self.write(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.expr(value);
            }
        }
    }

    fn binary(&mut self, expr: &Expr, prec1: u8, cutoff: u8, depth: usize) {
        let Some((op, x, y)) = binary_parts(expr) else {
            return;
        };
        let prec = op.precedence();
        if prec < prec1 {
            self.write("(");
            self.expr0(expr, reduce_depth(depth));
            self.write(")");
            return;
        }
        let blank = prec < cutoff;
        self.expr1(x, prec, depth + diff_prec(x, prec));
        if blank {
            self.write(" ");
        }
        self.write(op.text());
        if blank {
            self.write(" ");
        }
        self.expr1(y, prec + 1, depth + 1);
    }

    /// One element per line with a trailing comma. Values of consecutive
    /// single-line key/value pairs line up in a column.
    fn element_lines(&mut self, elts: &[Expr]) {
        self.indent += 1;
        let keys: Vec<Option<String>> = elts
            .iter()
            .map(|elt| match &elt.kind {
                ExprKind::KeyValue { key, value } => {
                    let key_text = self.render(|p| p.expr(key));
                    let value_text = self.render(|p| p.expr(value));
                    (!key_text.contains('\n') && !value_text.contains('\n')).then_some(key_text)
                }
                _ => None,
            })
            .collect();
        let widths = column_widths(&keys);
        for (i, elt) in elts.iter().enumerate() {
            self.newline();
            match (&elt.kind, &keys[i]) {
                (ExprKind::KeyValue { value, .. }, Some(key_text)) => {
                    self.write(key_text);
                    self.write(":");
                    let pad = widths[i].saturating_sub(key_text.chars().count()) + 1;
                    self.write(&" ".repeat(pad));
                    self.expr(value);
                }
                _ => self.expr(elt),
            }
            self.write(",");
        }
        self.indent -= 1;
    }
}

/// Width each cell is padded to: the widest cell of its run of
/// consecutive present cells.
pub(super) fn column_widths(cells: &[Option<String>]) -> Vec<usize> {
    let mut widths = vec![0; cells.len()];
    let mut start = 0;
    while start < cells.len() {
        if cells[start].is_none() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < cells.len() && cells[end].is_some() {
            end += 1;
        }
        let max = cells[start..end]
            .iter()
            .flatten()
            .map(|c| c.chars().count())
            .max()
            .unwrap_or(0);
        for width in &mut widths[start..end] {
            *width = max;
        }
        start = end;
    }
    widths
}
