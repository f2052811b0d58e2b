use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use errfix::cli::Cli;
use errfix::config::Mode;
use errfix::observability::{init_logging, install_panic_hook};
use errfix::{Driver, Reporter};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    install_panic_hook();

    let config = cli.into_config().context("invalid configuration")?;
    let reporter = Reporter::new();

    let mut stdout = io::stdout().lock();
    Driver::new(&config, &reporter)
        .run(&mut stdout)
        .with_context(|| format!("errfix failed on {}", config.root.display()))?;

    if config.json {
        writeln!(stdout, "{}", reporter.to_json()?)?;
    } else if config.mode == Mode::Check {
        writeln!(stdout, "{}", reporter.render_text(&config.root))?;
    } else {
        eprintln!("{}", reporter.render_text(&config.root));
    }

    if config.mode == Mode::Check && reporter.outstanding() > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
