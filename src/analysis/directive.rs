//! The `errfix:ignore` comment directive.
//!
//! A line comment carrying the marker suppresses every discard inside the
//! statement it is attached to, whether it sits on the line above or at
//! the end of the statement's line:
//!
//! ```go
//! // errfix:ignore -- best effort cleanup
//! os.Remove(tmp)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::loader::SourceFile;
use crate::syntax::ast::NodeId;

pub const MARKER: &str = "errfix:ignore";

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^//\s*(?:.*\s)?errfix:ignore(?:\s*--\s*(.*))?\s*$").expect("valid directive pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub reason: Option<String>,
}

/// Parses one comment. Only line comments can carry the directive.
pub fn parse_directive(comment: &str) -> Option<Directive> {
    DIRECTIVE.captures(comment.trim_end()).map(|captures| Directive {
        reason: captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|r| !r.is_empty()),
    })
}

/// Directive attached to `node` through the file's comment map.
pub fn directive_for(file: &SourceFile, node: NodeId) -> Option<Directive> {
    file.comments
        .texts(&file.ast, node)
        .into_iter()
        .find_map(|text| text.lines().find_map(parse_directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_marker_with_and_without_reason() {
        assert_eq!(parse_directive("// errfix:ignore"), Some(Directive { reason: None }));
        assert_eq!(
            parse_directive("//errfix:ignore -- cleanup is best effort"),
            Some(Directive {
                reason: Some("cleanup is best effort".to_string())
            })
        );
        assert!(parse_directive("// nolint errfix:ignore").is_some());
    }

    #[test]
    fn ignores_block_comments_and_near_misses() {
        assert_eq!(parse_directive("/* errfix:ignore */"), None);
        assert_eq!(parse_directive("// errfix:ignored"), None);
        assert_eq!(parse_directive("// see errfix docs"), None);
    }
}
