//! Imports for generated code.
//!
//! Names are settled while a replacement is built ([`package_name`]); the
//! import specs themselves are added once per file after every edit
//! ([`ensure_imports`]).

use super::dest::{DestFile, Required};
use crate::core::errors::{Error, Result};
use crate::loader::{FileRef, Program};
use crate::syntax::ast::*;
use crate::syntax::Span;
use crate::types::stdlib::is_standard;

/// Identifier the generated code in `file` should use for the package at
/// `path`. `visible` reports whether a name is bound at the edit site.
pub fn package_name(
    program: &Program,
    file: FileRef,
    dest: &mut DestFile,
    path: &str,
    visible: &dyn Fn(&str) -> bool,
) -> Result<String> {
    let ast = &program.file(file).ast;
    let shadowed = |name: &str| Error::Generation(format!("package {path} is shadowed by a local `{name}`"));

    if let Some(import) = ast.imports().find(|i| i.unquoted_path() == path) {
        let name = match &import.name {
            Some(alias) if alias.name == "_" || alias.name == "." => {
                return Err(Error::Generation(format!("{path} is imported as `{}`", alias.name)));
            }
            Some(alias) => alias.name.clone(),
            None => default_name(program, path),
        };
        return if visible(&name) { Err(shadowed(&name)) } else { Ok(name) };
    }
    if let Some(required) = dest.required.iter().find(|r| r.path == path) {
        let name = required.alias.clone().unwrap_or_else(|| default_name(program, path));
        return if visible(&name) { Err(shadowed(&name)) } else { Ok(name) };
    }

    let members = &program.store.package(program.units[file.unit].pkg).members;
    let taken = |name: &str| {
        visible(name)
            || members.contains_key(name)
            || ast.imports().any(|i| import_name(program, i) == name)
            || dest
                .required
                .iter()
                .any(|r| r.alias.as_deref().unwrap_or_else(|| last_segment(&r.path)) == name)
    };
    let default = default_name(program, path);
    if !taken(&default) {
        dest.require(Required {
            path: path.to_string(),
            alias: None,
        });
        return Ok(default);
    }
    let alias = format!("std{default}");
    if taken(&alias) {
        return Err(shadowed(&default));
    }
    dest.require(Required {
        path: path.to_string(),
        alias: Some(alias.clone()),
    });
    Ok(alias)
}

fn default_name(program: &Program, path: &str) -> String {
    program
        .store
        .package_by_path(path)
        .map(|pkg| program.store.package(pkg).name.clone())
        .unwrap_or_else(|| last_segment(path).to_string())
}

fn import_name(program: &Program, import: &ImportSpec) -> String {
    match &import.name {
        Some(alias) => alias.name.clone(),
        None => default_name(program, import.unquoted_path()),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Adds every `required` import `file` lacks. Specs join the first import
/// declaration, sorted into its standard-library run; a single import is
/// turned into a group, and a file without imports gets a new declaration.
pub fn ensure_imports(file: &mut File, ids: &mut IdGen, required: &[Required]) {
    let missing: Vec<&Required> = required
        .iter()
        .filter(|r| {
            !file
                .imports()
                .any(|i| i.unquoted_path() == r.path && i.name.as_ref().map(|n| &n.name) == r.alias.as_ref())
        })
        .collect();
    if missing.is_empty() {
        return;
    }

    let first = file
        .decls
        .iter()
        .position(|d| matches!(&d.kind, DeclKind::Gen(gen) if gen.tok == GenTok::Import));
    let Some(index) = first else {
        let specs: Vec<Spec> = missing.iter().map(|r| import_spec(r, ids)).collect();
        let decl = Decl {
            id: ids.next_id(),
            kind: DeclKind::Gen(GenDecl {
                tok: GenTok::Import,
                grouped: specs.len() > 1,
                specs,
                close_comments: Vec::new(),
            }),
            span: Span::default(),
            decs: Decorations::default(),
            dirty: true,
        };
        file.decls.insert(0, decl);
        return;
    };

    let decl = &mut file.decls[index];
    decl.dirty = true;
    let DeclKind::Gen(gen) = &mut decl.kind else {
        return;
    };
    gen.grouped = true;
    for required in missing {
        let position = insertion_point(&gen.specs, &required.path);
        gen.specs.insert(position, import_spec(required, ids));
    }
}

/// Alphabetical slot inside the first run of standard-library imports.
fn insertion_point(specs: &[Spec], path: &str) -> usize {
    let std_path = |spec: &Spec| match &spec.kind {
        SpecKind::Import(import) if is_standard(import.unquoted_path()) => Some(import.unquoted_path().to_string()),
        _ => None,
    };
    let Some(start) = specs.iter().position(|s| std_path(s).is_some()) else {
        return 0;
    };
    let mut index = start;
    while index < specs.len() {
        let Some(existing) = std_path(&specs[index]) else {
            break;
        };
        if index > start && specs[index].decs.blank_before {
            break;
        }
        if existing.as_str() > path {
            break;
        }
        index += 1;
    }
    index
}

fn import_spec(required: &Required, ids: &mut IdGen) -> Spec {
    Spec {
        id: ids.next_id(),
        kind: SpecKind::Import(ImportSpec {
            name: required.alias.as_ref().map(|alias| Ident {
                id: ids.next_id(),
                name: alias.clone(),
                span: Span::default(),
            }),
            path: format!("\"{}\"", required.path),
        }),
        span: Span::default(),
        decs: Decorations::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::decorate::decorate;
    use crate::syntax::parser::parse_file;
    use crate::syntax::printer::print_file;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn apply(source: &str, required: &[(&str, Option<&str>)]) -> String {
        let mut ids = IdGen::default();
        let mut file = parse_file(source, &mut ids).unwrap();
        decorate(&mut file, source);
        let required: Vec<Required> = required
            .iter()
            .map(|(path, alias)| Required {
                path: path.to_string(),
                alias: alias.map(str::to_string),
            })
            .collect();
        ensure_imports(&mut file, &mut ids, &required);
        print_file(&file, source)
    }

    #[test]
    fn joins_the_standard_library_run_in_order() {
        let source = indoc! {r#"
            package main

            import (
            	"fmt"
            	"os"

            	"example.com/lib"
            )

            func main() {}
        "#};
        assert_eq!(
            apply(source, &[("errors", None), ("log", None)]),
            indoc! {r#"
                package main

                import (
                	"errors"
                	"fmt"
                	"log"
                	"os"

                	"example.com/lib"
                )

                func main() {}
            "#}
        );
    }

    #[test]
    fn single_import_becomes_a_group() {
        let source = "package main\n\nimport \"os\"\n\nfunc main() {}\n";
        assert_eq!(
            apply(source, &[("log", Some("stdlog"))]),
            "package main\n\nimport (\n\tstdlog \"log\"\n\t\"os\"\n)\n\nfunc main() {}\n"
        );
    }

    #[test]
    fn files_without_imports_get_a_declaration() {
        let source = "package main\n\nfunc main() {}\n";
        assert_eq!(
            apply(source, &[("log", None)]),
            "package main\n\nimport \"log\"\n\nfunc main() {}\n"
        );
    }

    #[test]
    fn present_imports_are_left_alone() {
        let source = "package main\n\nimport \"log\"\n\nfunc main() {}\n";
        assert_eq!(apply(source, &[("log", None)]), source);
    }
}
