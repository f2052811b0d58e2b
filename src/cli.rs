use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use crate::config::{discover_config, load_config_from, FixConfig, Level, Mode, TerminalStrategy};
use crate::core::errors::Result;
use crate::rewrite::Template;

#[derive(Parser, Debug)]
#[command(name = "errfix")]
#[command(about = "Find discarded Go errors and rewrite the code to check them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Go module or package directory to fix
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Never change function signatures; log errors that cannot be returned
    #[arg(long, conflicts_with = "aggressive")]
    pub safe: bool,

    /// Also turn panics into error returns in functions that gain an error result
    #[arg(long)]
    pub aggressive: bool,

    /// Skip files matching this glob (repeatable)
    #[arg(long = "exclude-file", value_name = "GLOB")]
    pub exclude_files: Vec<String>,

    /// Skip calls to symbols matching this glob, e.g. `os.Remove*` (repeatable)
    #[arg(long = "exclude-symbol", value_name = "GLOB")]
    pub exclude_symbols: Vec<String>,

    /// Also fix fmt.Print*, strings.Builder writes and similar calls
    #[arg(long = "no-default-exclusions")]
    pub no_default_exclusions: bool,

    /// Report discarded errors without changing anything; exit 1 if any remain
    #[arg(long, conflicts_with = "dry_run")]
    pub check: bool,

    /// Print a unified diff instead of writing files
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// What to do where an error cannot be returned
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub terminal: Option<TerminalStrategy>,

    /// Expression returned on failure; must mention {{err}}
    #[arg(long, value_name = "EXPR")]
    pub template: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (defaults to the nearest .errfix.toml above DIR)
    #[arg(long, value_name = "PATH", env = "ERRFIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    /// Settles the run configuration: defaults, the config file, then the
    /// flags given here.
    pub fn into_config(self) -> Result<FixConfig> {
        let mut config = FixConfig::new(&self.dir);

        let file = match &self.config {
            Some(path) => Some((path.clone(), load_config_from(path)?)),
            None => discover_config(&self.dir)?,
        };
        if let Some((path, file)) = file {
            debug!("using config {}", path.display());
            config.apply_file(file)?;
        }

        if self.safe {
            config.level = Level::Safe;
        } else if self.aggressive {
            config.level = Level::Aggressive;
        }
        if self.check {
            config.mode = Mode::Check;
        } else if self.dry_run {
            config.mode = Mode::DryRun;
        }
        if let Some(terminal) = self.terminal {
            config.terminal = terminal;
        }
        if let Some(template) = &self.template {
            config.template = Template::new(template)?;
        }
        config.exclude_files.extend(self.exclude_files);
        config.exclude_symbols.extend(self.exclude_symbols);
        if self.no_default_exclusions {
            config.default_exclusions = false;
        }
        config.json = self.json;
        config.verbose = self.verbosity > 0;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("errfix").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_map_onto_the_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let config = parse(&[
            root,
            "--aggressive",
            "--dry-run",
            "--terminal",
            "exit",
            "--exclude-file",
            "gen/*.go",
            "--exclude-file",
            "*_mock.go",
            "--exclude-symbol",
            "os.Remove*",
            "--no-default-exclusions",
            "-vv",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.level, Level::Aggressive);
        assert_eq!(config.mode, Mode::DryRun);
        assert_eq!(config.terminal, TerminalStrategy::Exit);
        assert_eq!(config.exclude_files, vec!["gen/*.go", "*_mock.go"]);
        assert_eq!(config.exclude_symbols, vec!["os.Remove*"]);
        assert!(!config.default_exclusions);
        assert!(config.verbose);
    }

    #[test]
    fn levels_and_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["errfix", ".", "--safe", "--aggressive"]).is_err());
        assert!(Cli::try_parse_from(["errfix", ".", "--check", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["errfix", ".", "--terminal", "abort"]).is_err());
    }

    #[test]
    fn flags_win_over_the_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".errfix.toml"),
            "level = \"safe\"\nterminal = \"panic\"\n\n[exclude]\nfiles = [\"legacy/*\"]\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let config = parse(&[root]).into_config().unwrap();
        assert_eq!(config.level, Level::Safe);
        assert_eq!(config.terminal, TerminalStrategy::Panic);

        let config = parse(&[root, "--terminal", "fatal", "--exclude-file", "x.go"])
            .into_config()
            .unwrap();
        assert_eq!(config.terminal, TerminalStrategy::Fatal);
        assert_eq!(config.exclude_files, vec!["legacy/*", "x.go"]);
    }

    #[test]
    fn templates_without_the_error_are_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        assert!(parse(&[root, "--template", "errors.New(\"x\")"]).into_config().is_err());
    }
}
