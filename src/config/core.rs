use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::Filter;
use crate::core::errors::Result;
use crate::rewrite::template::Template;

/// How far the rewriter may go beyond the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Never change a signature; log where the error cannot be returned.
    Safe,
    /// Add `error` results up the call graph.
    #[default]
    Standard,
    /// Also turn panics in failing functions into error returns.
    Aggressive,
}

/// What happens to the rewritten sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Write,
    /// Print a unified diff instead of writing.
    DryRun,
    /// Only report discarded errors; exit 1 when any remain.
    Check,
}

/// Failure path used where an error cannot be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStrategy {
    /// `log.Fatal(err)`
    #[default]
    Fatal,
    /// `panic(err)`
    Panic,
    /// `fmt.Fprintln(os.Stderr, err)` then `os.Exit(1)`
    Exit,
}

/// Contents of `.errfix.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ErrfixConfig {
    #[serde(default)]
    pub level: Option<Level>,

    #[serde(default)]
    pub terminal: Option<TerminalStrategy>,

    /// Failure-path expression; must mention `{{err}}`
    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Exclusion globs
    #[serde(default)]
    pub exclude: Option<ExcludeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExcludeConfig {
    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub symbols: Vec<String>,

    /// Keep the built-in `fmt.Print*`-style exclusions (default: true)
    #[serde(default)]
    pub default_exclusions: Option<bool>,
}

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Settled configuration for one run: defaults, then the config file, then
/// command-line flags.
#[derive(Debug, Clone)]
pub struct FixConfig {
    pub root: PathBuf,
    pub level: Level,
    pub mode: Mode,
    pub terminal: TerminalStrategy,
    pub template: Template,
    pub exclude_files: Vec<String>,
    pub exclude_symbols: Vec<String>,
    pub default_exclusions: bool,
    pub max_iterations: usize,
    pub json: bool,
    pub verbose: bool,
}

impl FixConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            level: Level::default(),
            mode: Mode::default(),
            terminal: TerminalStrategy::default(),
            template: Template::default(),
            exclude_files: Vec::new(),
            exclude_symbols: Vec::new(),
            default_exclusions: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            json: false,
            verbose: false,
        }
    }

    /// Layers a config file over the current values. Exclusions add up.
    pub fn apply_file(&mut self, file: ErrfixConfig) -> Result<()> {
        if let Some(level) = file.level {
            self.level = level;
        }
        if let Some(terminal) = file.terminal {
            self.terminal = terminal;
        }
        if let Some(template) = file.template {
            self.template = Template::new(&template)?;
        }
        if let Some(max) = file.max_iterations {
            self.max_iterations = max.max(1);
        }
        if let Some(exclude) = file.exclude {
            self.exclude_files.extend(exclude.files);
            self.exclude_symbols.extend(exclude.symbols);
            if let Some(defaults) = exclude.default_exclusions {
                self.default_exclusions = defaults;
            }
        }
        Ok(())
    }

    pub fn filter(&self) -> Result<Filter> {
        Filter::new(&self.exclude_files, &self.exclude_symbols, self.default_exclusions)
    }
}
