//! The fix loop: load, detect, propagate, inject, and repeat on the
//! rewritten sources until nothing changes.
//!
//! Every iteration works on a fresh load with the previous iteration's
//! output as an in-memory overlay. Nothing reaches the disk until the loop
//! is over, so a fatal error part way leaves the tree untouched.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::analysis::{Detector, InjectionPoint};
use crate::config::{FixConfig, Mode};
use crate::core::errors::Result;
use crate::io::{persist, Change};
use crate::loader::{Loader, Program};
use crate::observability::{set_iteration, set_phase, Phase};
use crate::reporter::{Finding, Reporter};
use crate::rewrite::{DestCache, Injector, Propagator};
use crate::syntax::ast::{Expr, ExprKind};
use crate::syntax::node::{path_to, NodeRef};
use crate::syntax::printer::print_expr;

pub struct Driver<'a> {
    config: &'a FixConfig,
    reporter: &'a Reporter,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a FixConfig, reporter: &'a Reporter) -> Self {
        Self { config, reporter }
    }

    /// Runs to a fixpoint (or the iteration bound), then persists. Diffs
    /// in dry-run mode go to `out`.
    pub fn run(&self, out: &mut dyn Write) -> Result<()> {
        let filter = self.config.filter()?;
        // path -> (content on disk, latest rewrite)
        let mut changes: IndexMap<PathBuf, (String, String)> = IndexMap::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;
            set_iteration(iterations);
            info!("iteration {iterations}");

            let mut program = {
                let _phase = set_phase(Phase::Loading);
                let overlay: HashMap<PathBuf, String> =
                    changes.iter().map(|(path, (_, text))| (path.clone(), text.clone())).collect();
                Loader::new(&self.config.root).with_overlay(overlay).load()?
            };
            if program.is_empty() {
                info!("no Go packages under {}", self.config.root.display());
                converged = true;
                break;
            }

            let points = {
                let _phase = set_phase(Phase::Detection);
                Detector::new(&program, &filter, self.config.verbose).detect()
            };
            debug!(count = points.len(), "discarded errors found");

            if self.config.mode == Mode::Check {
                for point in &points {
                    self.reporter.record_finding(finding(&program, point));
                }
                converged = true;
                break;
            }
            if points.is_empty() {
                converged = true;
                break;
            }

            let mut dests = DestCache::new();
            let plan = {
                let _phase = set_phase(Phase::Propagation);
                Propagator::new(&program, &filter, self.config.level, self.config.verbose).run(
                    &mut program,
                    &mut dests,
                    points,
                )?
            };
            let outcome = {
                let _phase = set_phase(Phase::Injection);
                Injector::new(self.config).run(&program, &mut dests, &plan)?
            };
            self.reporter.record_pass(&outcome, plan.skipped);
            self.reporter.record_changed_functions(&plan.mutated);

            let mut changed = false;
            for rendered in dests.finish() {
                if !rendered.changed() {
                    continue;
                }
                changed = true;
                changes
                    .entry(rendered.path)
                    .and_modify(|(_, text)| *text = rendered.text.clone())
                    .or_insert((rendered.original, rendered.text));
            }
            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!("still applying changes after {iterations} iterations");
        }
        self.reporter.finish(iterations, converged);

        let _phase = set_phase(Phase::Writing);
        let changes: Vec<Change> = changes
            .into_iter()
            .filter(|(_, (original, text))| original != text)
            .map(|(path, (original, text))| Change { path, original, text })
            .collect();
        persist(self.config.mode, &changes, &self.config.root, out, self.reporter)
    }
}

fn finding(program: &Program, point: &InjectionPoint) -> Finding {
    let source = program.file(point.file);
    let call = match path_to(NodeRef::File(&source.ast), point.call).and_then(|path| path.last().map(|(_, n)| *n)) {
        Some(NodeRef::Expr(Expr {
            kind: ExprKind::Call { fun, .. },
            ..
        })) => print_expr(fun),
        _ => String::from("?"),
    };
    Finding {
        path: source.path.clone(),
        line: point.position.line,
        column: point.position.column,
        kind: point.kind.label().to_string(),
        call,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;
    use indoc::indoc;
    use std::fs;

    const SOURCE: &str = indoc! {r#"
        package main

        import "os"

        func cleanup() {
            os.Remove("tmp")
        }

        func main() {
            cleanup()
        }
    "#};

    #[test]
    fn propagation_reaches_main_across_iterations() {
        let dir = testkit::module(&[("main.go", SOURCE)]);
        let config = FixConfig::new(dir.path());
        let reporter = Reporter::new();
        Driver::new(&config, &reporter).run(&mut Vec::new()).unwrap();

        let text = fs::read_to_string(dir.path().join("main.go")).unwrap();
        assert!(text.contains("func cleanup() error {"), "{text}");
        assert!(text.contains("if err := cleanup(); err != nil {\n\t\tlog.Fatal(err)\n\t}"), "{text}");
        let summary = reporter.summary();
        assert!(summary.converged);
        assert_eq!(summary.functions_changed, vec!["cleanup".to_string()]);
        assert_eq!(summary.modified.len(), 1);
    }

    #[test]
    fn check_mode_reports_without_writing() {
        let dir = testkit::module(&[("main.go", SOURCE)]);
        let mut config = FixConfig::new(dir.path());
        config.mode = Mode::Check;
        let reporter = Reporter::new();
        Driver::new(&config, &reporter).run(&mut Vec::new()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("main.go")).unwrap(), SOURCE);
        let findings = reporter.summary().findings;
        assert_eq!(findings.len(), 1);
        assert_eq!((findings[0].line, findings[0].call.as_str()), (6, "os.Remove"));
        assert_eq!(reporter.outstanding(), 1);
    }

    #[test]
    fn a_single_iteration_stops_short_of_the_fixpoint() {
        let dir = testkit::module(&[("main.go", SOURCE)]);
        let mut config = FixConfig::new(dir.path());
        config.max_iterations = 1;
        let reporter = Reporter::new();
        Driver::new(&config, &reporter).run(&mut Vec::new()).unwrap();
        let summary = reporter.summary();
        assert_eq!(summary.iterations, 1);
        assert!(!summary.converged);
    }

    #[test]
    fn parse_errors_leave_every_file_alone() {
        let broken = "package main\n\nfunc broken( {\n";
        let dir = testkit::module(&[("main.go", SOURCE), ("broken.go", broken)]);
        let config = FixConfig::new(dir.path());
        let reporter = Reporter::new();
        assert!(Driver::new(&config, &reporter).run(&mut Vec::new()).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("main.go")).unwrap(), SOURCE);
    }
}
