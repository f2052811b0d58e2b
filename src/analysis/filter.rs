//! File and symbol exclusion by shell-style glob.

use std::path::Path;

use glob::Pattern;

use crate::core::errors::Result;

/// Output routines whose errors are conventionally ignored.
pub const DEFAULT_SYMBOL_EXCLUSIONS: &[&str] = &[
    "fmt.Print*",
    "fmt.Fprint*",
    "(*bytes.Buffer).Write*",
    "(*strings.Builder).Write*",
    "math/rand.Read",
];

#[derive(Debug, Clone, Default)]
pub struct Filter {
    files: Vec<Pattern>,
    symbols: Vec<Pattern>,
}

impl Filter {
    pub fn new(file_globs: &[String], symbol_globs: &[String], default_exclusions: bool) -> Result<Self> {
        let files = file_globs
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let defaults = default_exclusions
            .then_some(DEFAULT_SYMBOL_EXCLUSIONS)
            .unwrap_or_default()
            .iter()
            .copied();
        let symbols = symbol_globs
            .iter()
            .map(String::as_str)
            .chain(defaults)
            .map(Pattern::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { files, symbols })
    }

    /// Matches against both the full path and the base name.
    pub fn excludes_file(&self, path: &Path) -> bool {
        let full = path.to_string_lossy();
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.files
            .iter()
            .any(|p| p.matches(&full) || p.matches(&base))
    }

    pub fn excludes_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|p| p.matches(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_globs_match_full_path_or_base_name() {
        let filter = Filter::new(&strings(&["*_gen.go", "*/internal/legacy/*"]), &[], false).unwrap();
        assert!(filter.excludes_file(Path::new("/src/app/model_gen.go")));
        assert!(filter.excludes_file(Path::new("/src/app/internal/legacy/old.go")));
        assert!(!filter.excludes_file(Path::new("/src/app/main.go")));
    }

    #[test]
    fn default_symbol_exclusions_can_be_disabled() {
        let with_defaults = Filter::new(&[], &[], true).unwrap();
        assert!(with_defaults.excludes_symbol("fmt.Println"));
        assert!(with_defaults.excludes_symbol("(*strings.Builder).WriteString"));
        assert!(!with_defaults.excludes_symbol("os.Remove"));

        let bare = Filter::new(&[], &strings(&["example.com/app.cleanup"]), false).unwrap();
        assert!(!bare.excludes_symbol("fmt.Println"));
        assert!(bare.excludes_symbol("example.com/app.cleanup"));
    }

    #[test]
    fn malformed_globs_are_reported() {
        assert!(Filter::new(&strings(&["[unclosed"]), &[], false).is_err());
    }
}
