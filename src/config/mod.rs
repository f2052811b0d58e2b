//! Run configuration.
//!
//! Sources, later wins: built-in defaults, the nearest `.errfix.toml` above
//! the target directory (or the file given with `--config`), then
//! command-line flags.
//!
//! ```toml
//! level = "aggressive"
//! terminal = "exit"
//! template = 'fmt.Errorf("{{func}}: %w", {{err}})'
//!
//! [exclude]
//! files = ["*_gen.go"]
//! symbols = ["(*example.com/app.Logger).*"]
//! ```

mod core;
mod loader;

pub use self::core::{ErrfixConfig, ExcludeConfig, FixConfig, Level, Mode, TerminalStrategy, DEFAULT_MAX_ITERATIONS};
pub use self::loader::{discover_config, load_config_from, parse_config, CONFIG_FILE};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Error;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn file_values_layer_over_defaults() {
        let file = parse_config(indoc! {r#"
            level = "aggressive"
            terminal = "exit"
            max_iterations = 3

            [exclude]
            files = ["*_gen.go"]
            default_exclusions = false
        "#})
        .unwrap();
        let mut config = FixConfig::new(".");
        config.exclude_files.push("vendor/*".into());
        config.apply_file(file).unwrap();
        assert_eq!(config.level, Level::Aggressive);
        assert_eq!(config.terminal, TerminalStrategy::Exit);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.exclude_files, vec!["vendor/*".to_string(), "*_gen.go".to_string()]);
        assert!(!config.default_exclusions);
        assert!(config.template.is_default());
    }

    #[test]
    fn unknown_keys_and_bad_templates_are_rejected() {
        assert!(matches!(parse_config("levle = \"safe\""), Err(Error::Config(_))));
        let file = parse_config("template = \"errors.New(\\\"x\\\")\"").unwrap();
        assert!(matches!(FixConfig::new(".").apply_file(file), Err(Error::Template(_))));
    }

    #[test]
    fn discovery_walks_up_from_the_target() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "level = \"safe\"\n").unwrap();
        let nested = dir.path().join("cmd").join("tool");
        std::fs::create_dir_all(&nested).unwrap();

        let (path, config) = discover_config(&nested).unwrap().expect("config found");
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE);
        assert_eq!(config.level, Some(Level::Safe));
    }
}
