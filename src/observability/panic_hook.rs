//! Crash report printed instead of the default panic message.

use std::panic::PanicHookInfo;

use super::context::{current_context, iteration, RunContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Replaces the panic hook; call once at startup.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("{}", crash_report(info, &current_context(), iteration()));
    }));
}

fn crash_report(info: &PanicHookInfo<'_>, context: &RunContext, iteration: usize) -> String {
    let mut lines = vec![
        format!("errfix {VERSION} crashed on {}", std::env::consts::OS),
        format!("  panic: {}", panic_message(info)),
    ];
    if let Some(location) = info.location() {
        lines.push(format!(
            "  at: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ));
    }
    lines.extend(context_lines(context, iteration));
    if std::env::var_os("RUST_BACKTRACE").is_some() {
        lines.push(std::backtrace::Backtrace::capture().to_string());
    } else {
        lines.push("  run with RUST_BACKTRACE=1 for a stack trace".to_string());
    }
    lines.join("\n")
}

fn context_lines(context: &RunContext, iteration: usize) -> Vec<String> {
    let mut lines = Vec::new();
    match context.phase {
        Some(phase) => lines.push(format!("  phase: {phase} (iteration {iteration})")),
        None => lines.push("  phase: startup".to_string()),
    }
    if let Some(file) = &context.current_file {
        lines.push(format!("  file: {}", file.display()));
    }
    lines
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Phase;
    use std::path::PathBuf;

    #[test]
    fn context_lines_name_phase_and_file() {
        let context = RunContext {
            phase: Some(Phase::Injection),
            current_file: Some(PathBuf::from("pkg/a.go")),
        };
        assert_eq!(
            context_lines(&context, 2),
            vec!["  phase: injection (iteration 2)".to_string(), "  file: pkg/a.go".to_string()]
        );
        assert_eq!(context_lines(&RunContext::new(), 0), vec!["  phase: startup".to_string()]);
    }
}
