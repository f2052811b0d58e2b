//! Source printer.
//!
//! Declarations nobody edited are copied from the original text byte for
//! byte, together with the gaps between them. Edited declarations are
//! printed again in gofmt layout: tab indentation, one statement per line,
//! comments restored from the decorations the destination tree carries.

mod expr;
mod stmt;

use super::ast::*;

pub(crate) struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new(indent: usize) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn blank_line(&mut self) {
        self.out.push('\n');
    }

    fn comment_lines(&mut self, texts: &[String]) {
        for text in texts {
            self.newline();
            self.write(text);
        }
    }

    /// Writes a trailing comment; extra lines continue at the current indent.
    fn trailing(&mut self, text: &str, pad: usize) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.write(&" ".repeat(pad.max(1)));
            self.write(first);
        }
        for line in lines {
            self.newline();
            self.write(line);
        }
    }

    /// Renders with a scratch printer at the same indentation.
    fn render(&self, f: impl FnOnce(&mut Printer)) -> String {
        let mut scratch = Printer::new(self.indent);
        f(&mut scratch);
        scratch.out
    }

    fn decl(&mut self, decl: &Decl) {
        for text in &decl.decs.leading {
            self.write(text);
            self.newline();
        }
        match &decl.kind {
            DeclKind::Func(func) => self.func_decl(func),
            DeclKind::Gen(gen) => self.gen_decl(gen),
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.write("func ");
        if let Some(recv) = &func.recv {
            self.write("(");
            self.fields_inline(recv);
            self.write(") ");
        }
        self.write(&func.name.name);
        self.signature(&func.ty);
        if let Some(body) = &func.body {
            self.write(" ");
            self.func_body(body);
        }
    }

    pub(crate) fn signature(&mut self, ty: &FuncType) {
        if let Some(type_params) = &ty.type_params {
            self.write("[");
            self.fields_inline(type_params);
            self.write("]");
        }
        self.write("(");
        self.fields_inline(&ty.params);
        self.write(")");
        if let Some(results) = &ty.results {
            let bare = results.fields.len() == 1 && !results.is_named() && !results.parens;
            if bare {
                self.write(" ");
                self.expr(&results.fields[0].ty);
            } else if !results.fields.is_empty() {
                self.write(" (");
                self.fields_inline(results);
                self.write(")");
            }
        }
    }

    /// Function bodies written on one line stay on one line while they
    /// hold at most one undecorated statement.
    pub(crate) fn func_body(&mut self, body: &Block) {
        let compact = body.one_line
            && body.stmts.len() <= 1
            && body.close_comments.is_empty()
            && body
                .stmts
                .iter()
                .all(|s| s.decs.leading.is_empty() && s.decs.trailing.is_none());
        if compact {
            match body.stmts.first() {
                None => {
                    self.write("{}");
                    return;
                }
                Some(stmt) => {
                    let text = self.render(|p| p.stmt(stmt));
                    if !text.contains('\n') {
                        self.write("{ ");
                        self.write(&text);
                        self.write(" }");
                        return;
                    }
                }
            }
        }
        self.block(body);
    }

    pub(crate) fn fields_inline(&mut self, list: &FieldList) {
        for (i, field) in list.fields.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.field_names(field);
            self.expr(&field.ty);
        }
    }

    fn field_names(&mut self, field: &Field) {
        if field.names.is_empty() {
            return;
        }
        let names: Vec<&str> = field.names.iter().map(|n| n.name.as_str()).collect();
        self.write(&names.join(", "));
        self.write(" ");
    }

    /// Struct fields and interface elements, one per line.
    pub(crate) fn field_block(&mut self, keyword: &str, list: &FieldList, methods: bool) {
        self.write(keyword);
        if list.fields.is_empty() && list.close_comments.is_empty() {
            self.write("{}");
            return;
        }
        self.write(" {");
        self.indent += 1;
        for field in &list.fields {
            self.comment_lines(&field.decs.leading);
            self.newline();
            if methods && field.names.len() == 1 {
                if let ExprKind::FuncType(ty) = &field.ty.kind {
                    self.write(&field.names[0].name);
                    self.signature(ty);
                    if let Some(text) = &field.decs.trailing {
                        self.trailing(text, 1);
                    }
                    continue;
                }
            }
            self.field_names(field);
            self.expr(&field.ty);
            if let Some(tag) = &field.tag {
                self.write(" ");
                self.write(tag);
            }
            if let Some(text) = &field.decs.trailing {
                self.trailing(text, 1);
            }
        }
        self.comment_lines(&list.close_comments);
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    pub(crate) fn gen_decl(&mut self, gen: &GenDecl) {
        self.write(gen.tok.text());
        self.write(" ");
        let single = !gen.grouped && gen.specs.len() == 1 && gen.close_comments.is_empty();
        if single {
            let spec = &gen.specs[0];
            self.spec(spec);
            if let Some(text) = &spec.decs.trailing {
                self.trailing(text, 1);
            }
            return;
        }
        self.write("(");
        if gen.specs.is_empty() && gen.close_comments.is_empty() {
            self.write(")");
            return;
        }
        self.indent += 1;
        for (i, spec) in gen.specs.iter().enumerate() {
            if i > 0 && spec.decs.blank_before {
                self.blank_line();
            }
            self.comment_lines(&spec.decs.leading);
            self.newline();
            self.spec(spec);
            if let Some(text) = &spec.decs.trailing {
                self.trailing(text, 1);
            }
        }
        self.comment_lines(&gen.close_comments);
        self.indent -= 1;
        self.newline();
        self.write(")");
    }

    fn spec(&mut self, spec: &Spec) {
        match &spec.kind {
            SpecKind::Import(import) => {
                if let Some(name) = &import.name {
                    self.write(&name.name);
                    self.write(" ");
                }
                self.write(&import.path);
            }
            SpecKind::Value(value) => {
                let names: Vec<&str> = value.names.iter().map(|n| n.name.as_str()).collect();
                self.write(&names.join(", "));
                if let Some(ty) = &value.ty {
                    self.write(" ");
                    self.expr(ty);
                }
                if !value.values.is_empty() {
                    self.write(" = ");
                    self.expr_list(&value.values, 1);
                }
            }
            SpecKind::Type(ty) => {
                self.write(&ty.name.name);
                if let Some(params) = &ty.type_params {
                    self.write("[");
                    self.fields_inline(params);
                    self.write("]");
                }
                self.write(if ty.alias { " = " } else { " " });
                self.expr(&ty.ty);
            }
        }
    }
}

/// Prints `file`, reusing `source` for every declaration not marked dirty.
/// Declarations without a source span are new and get a blank line before
/// them.
pub fn print_file(file: &File, source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 256);
    let mut cursor = file.header_end.min(source.len());
    out.push_str(&source[..cursor]);
    for decl in &file.decls {
        if decl.span.is_synthetic() {
            out.push_str("\n\n");
            out.push_str(&print_decl(decl));
            continue;
        }
        let start = decl.span.start.max(cursor);
        out.push_str(&source[cursor..start]);
        if decl.dirty {
            out.push_str(&print_decl(decl));
        } else {
            out.push_str(&source[start..decl.span.end]);
        }
        cursor = decl.span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

pub fn print_decl(decl: &Decl) -> String {
    let mut printer = Printer::new(0);
    printer.decl(decl);
    printer.out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new(0);
    printer.expr(expr);
    printer.out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    let mut printer = Printer::new(0);
    printer.stmt(stmt);
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::decorate::decorate;
    use crate::syntax::parser::{parse_expr, parse_file};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn reprint_all(source: &str) -> String {
        let mut ids = IdGen::default();
        let mut file = parse_file(source, &mut ids).expect("parses");
        decorate(&mut file, source);
        for decl in &mut file.decls {
            decl.dirty = true;
        }
        print_file(&file, source)
    }

    #[test]
    fn clean_file_prints_identically() {
        let source = "package p\n\n// A doc.\nfunc  a( ) {   }\n\nvar x = 1 // odd spacing kept\n";
        let mut ids = IdGen::default();
        let file = parse_file(source, &mut ids).expect("parses");
        assert_eq!(print_file(&file, source), source);
    }

    #[test]
    fn gofmt_formatted_function_survives_reprinting() {
        let source = indoc! {r#"
            package p

            import (
            	"fmt"
            	"os"
            )

            // Run does things.
            func Run(args []string) (n int, err error) {
            	// open it
            	f, err := os.Open(args[0]) // trailing
            	if err != nil {
            		return 0, err
            	}

            	defer func() { _ = f.Close() }()
            	for i, a := range args[1:] {
            		switch {
            		case i > 2 && a == "":
            			continue
            		default:
            			fmt.Println(i*2+1, a)
            		}
            	}
            	x := map[string]int{
            		"a":   1,
            		"bcd": 2,
            	}
            	return len(x), nil
            }
        "#};
        assert_eq!(reprint_all(source), source);
    }

    #[test]
    fn binary_spacing_follows_precedence() {
        let cases = [
            ("a+b*c", "a + b*c"),
            ("x==nil", "x == nil"),
            ("f(a+b, c)", "f(a+b, c)"),
            ("f(a + b)", "f(a + b)"),
            ("s[i+1 : j]", "s[i+1 : j]"),
            ("-x", "-x"),
        ];
        for (input, expected) in cases {
            let mut ids = IdGen::default();
            let expr = parse_expr(input, &mut ids).expect("parses");
            assert_eq!(print_expr(&expr), expected, "input {input}");
        }
    }

    #[test]
    fn labels_are_outdented() {
        let source = indoc! {r#"
            package p

            func f() {
            outer:
            	for {
            		break outer
            	}
            }
        "#};
        assert_eq!(reprint_all(source), source);
    }
}
