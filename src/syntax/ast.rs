//! Go syntax tree.
//!
//! Every node that the rewrite engine may need to find again carries a
//! [`NodeId`]. Ids are unique within one parse and, when the loader hands
//! the parser a shared [`IdGen`], unique across a whole program.

use super::token::{Comment, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

/// Comments and spacing owned by a statement-level node in the destination
/// tree. Analysis trees only fill in `blank_before`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decorations {
    pub blank_before: bool,
    pub leading: Vec<String>,
    pub trailing: Option<String>,
}

impl Decorations {
    pub fn is_empty(&self) -> bool {
        !self.blank_before && self.leading.is_empty() && self.trailing.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct File {
    pub id: NodeId,
    pub package: Ident,
    /// Byte offset just past the package clause.
    pub header_end: usize,
    pub decls: Vec<Decl>,
    pub comments: Vec<Comment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub span: Span,
    pub decs: Decorations,
    /// Set once an edit touches this declaration; clean declarations are
    /// printed from the original source text.
    pub dirty: bool,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Func(FuncDecl),
    Gen(GenDecl),
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<FieldList>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenTok {
    Import,
    Const,
    Type,
    Var,
}

impl GenTok {
    pub fn text(self) -> &'static str {
        match self {
            GenTok::Import => "import",
            GenTok::Const => "const",
            GenTok::Type => "type",
            GenTok::Var => "var",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenDecl {
    pub tok: GenTok,
    pub grouped: bool,
    pub specs: Vec<Spec>,
    pub close_comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Spec {
    pub id: NodeId,
    pub kind: SpecKind,
    pub span: Span,
    pub decs: Decorations,
}

#[derive(Debug, Clone)]
pub enum SpecKind {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub name: Option<Ident>,
    /// Quoted path exactly as written.
    pub path: String,
}

impl ImportSpec {
    pub fn unquoted_path(&self) -> &str {
        self.path.trim_matches(|c| c == '"' || c == '`')
    }
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub type_params: Option<FieldList>,
    pub alias: bool,
    pub ty: Expr,
}

#[derive(Debug, Clone)]
pub struct FieldList {
    pub id: NodeId,
    pub fields: Vec<Field>,
    pub parens: bool,
    pub close_comments: Vec<String>,
}

impl FieldList {
    /// Number of declared entries, counting each name separately.
    pub fn arity(&self) -> usize {
        self.fields.iter().map(|f| f.names.len().max(1)).sum()
    }

    pub fn is_named(&self) -> bool {
        self.fields.iter().any(|f| !f.names.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: NodeId,
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub tag: Option<String>,
    pub span: Span,
    pub decs: Decorations,
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub id: NodeId,
    pub type_params: Option<FieldList>,
    pub params: FieldList,
    pub results: Option<FieldList>,
}

#[derive(Debug, Clone)]
pub struct FuncLit {
    pub ty: FuncType,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
    /// Comments between the last statement and the closing brace.
    pub close_comments: Vec<String>,
    /// Braces opened and closed on the same source line.
    pub one_line: bool,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(Ident),
    BasicLit {
        kind: LitKind,
        value: String,
    },
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
        multiline: bool,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    FuncLit(Box<FuncLit>),
    Paren(Box<Expr>),
    Selector {
        x: Box<Expr>,
        sel: Ident,
    },
    Index {
        x: Box<Expr>,
        indices: Vec<Expr>,
    },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
        three: bool,
    },
    /// `ty` is `None` for the `x.(type)` form of a type switch.
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
        multiline: bool,
    },
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    Ellipsis(Option<Box<Expr>>),
    /// `len` is `None` for slice types.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    StructType(FieldList),
    FuncType(FuncType),
    InterfaceType(FieldList),
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
}

impl Expr {
    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_ident().is_some_and(Ident::is_blank)
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    Xor,
    Addr,
    Recv,
    Tilde,
}

impl UnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Lss
            | BinaryOp::Leq
            | BinaryOp::Gtr
            | BinaryOp::Geq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gtr => ">",
            BinaryOp::Geq => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinaryOp),
}

impl AssignOp {
    pub fn text(self) -> String {
        match self {
            AssignOp::Assign => "=".to_string(),
            AssignOp::Define => ":=".to_string(),
            AssignOp::Op(op) => format!("{}=", op.text()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn text(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
    pub decs: Decorations,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub body: Block,
    /// Either another `If` statement or a `Block` statement.
    pub els: Option<Box<Stmt>>,
}

/// `list` is empty for the `default` clause.
#[derive(Debug, Clone)]
pub struct CaseClause {
    pub list: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub default: bool,
}

#[derive(Debug, Clone)]
pub struct CommClause {
    /// `None` for the `default` clause.
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct TypeSwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub assign: Box<Stmt>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct RangeStmt {
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    pub define: bool,
    pub x: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Decl(GenDecl),
    Empty,
    Labeled {
        label: Ident,
        stmt: Box<Stmt>,
    },
    Expr(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch {
        kind: BranchKind,
        label: Option<Ident>,
    },
    Block(Block),
    If(IfStmt),
    Case(CaseClause),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    Comm(CommClause),
    Select(Block),
    For(ForStmt),
    Range(RangeStmt),
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind) -> Self {
        Self {
            id,
            kind,
            span: Span::default(),
            decs: Decorations::default(),
        }
    }
}

impl File {
    pub fn func_decls(&self) -> impl Iterator<Item = (&Decl, &FuncDecl)> {
        self.decls.iter().filter_map(|decl| match &decl.kind {
            DeclKind::Func(func) => Some((decl, func)),
            DeclKind::Gen(_) => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportSpec> {
        self.decls
            .iter()
            .filter_map(|decl| match &decl.kind {
                DeclKind::Gen(gen) if gen.tok == GenTok::Import => Some(gen.specs.iter()),
                _ => None,
            })
            .flatten()
            .filter_map(|spec| match &spec.kind {
                SpecKind::Import(import) => Some(import),
                _ => None,
            })
    }
}
