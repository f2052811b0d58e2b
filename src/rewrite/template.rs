//! Failure-path expression templates.
//!
//! `{{err}}` stands for the captured error and must appear; `{{func}}` is
//! replaced by the text of the failing callee, escaped for use inside a Go
//! string literal:
//!
//! ```text
//! fmt.Errorf("{{func}}: %w", {{err}})
//! ```

use crate::core::errors::{Error, Result};
use crate::syntax::ast::{ExprKind, IdGen};
use crate::syntax::node::{walk, NodeRef};
use crate::syntax::parser::parse_expr;
use crate::types::stdlib;

pub const DEFAULT: &str = "{{err}}";
const ERR: &str = "{{err}}";
const FUNC: &str = "{{func}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    /// Standard-library packages the template refers to by name.
    packages: Vec<String>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            text: DEFAULT.to_string(),
            packages: Vec::new(),
        }
    }
}

impl Template {
    pub fn new(text: &str) -> Result<Self> {
        let text = text.trim();
        if !text.contains(ERR) {
            return Err(Error::Template(format!("`{text}` does not mention {ERR}")));
        }
        let sample = text.replace(ERR, "err").replace(FUNC, "f");
        let expr = parse_expr(&sample, &mut IdGen::default())
            .map_err(|e| Error::Template(format!("`{text}` is not a Go expression: {e}")))?;
        let mut packages = Vec::new();
        walk(NodeRef::Expr(&expr), &mut |node, _| {
            if let NodeRef::Expr(e) = node {
                if let ExprKind::Selector { x, .. } = &e.kind {
                    if let Some(base) = x.as_ident() {
                        if stdlib::source(&base.name).is_some() && !packages.contains(&base.name) {
                            packages.push(base.name.clone());
                        }
                    }
                }
            }
            true
        });
        Ok(Self {
            text: text.to_string(),
            packages,
        })
    }

    pub fn is_default(&self) -> bool {
        self.text == DEFAULT
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn render(&self, err: &str, func: &str) -> String {
        self.text.replace(FUNC, &escape(func)).replace(ERR, err)
    }
}

/// Escapes text for a Go interpreted string literal.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_the_bare_error() {
        let template = Template::default();
        assert!(template.is_default());
        assert_eq!(template.render("err2", "os.Remove"), "err2");
        assert!(template.packages().is_empty());
    }

    #[test]
    fn wrapping_template_names_callee_and_packages() {
        let template = Template::new(r#"fmt.Errorf("{{func}} failed: %w", {{err}})"#).unwrap();
        assert_eq!(template.packages(), ["fmt".to_string()]);
        assert_eq!(
            template.render("err", r#"load("x")"#),
            r#"fmt.Errorf("load(\"x\") failed: %w", err)"#
        );
    }

    #[test]
    fn templates_must_mention_the_error_and_parse() {
        assert!(matches!(Template::new("errors.New(\"boom\")"), Err(Error::Template(_))));
        assert!(matches!(Template::new("fmt.Errorf({{err}}"), Err(Error::Template(_))));
    }
}
