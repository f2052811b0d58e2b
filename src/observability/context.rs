//! Thread-local record of what the run is doing, for crash reports.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static ITERATION: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT: RefCell<RunContext> = const { RefCell::new(RunContext::new()) };
}

#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub phase: Option<Phase>,
    pub current_file: Option<PathBuf>,
}

impl RunContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
        }
    }
}

/// Stages of one fix iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Detection,
    Propagation,
    Injection,
    Writing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Detection => "detection",
            Self::Propagation => "propagation",
            Self::Injection => "injection",
            Self::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// Restores the previous context when dropped.
pub struct ContextGuard {
    previous: RunContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

#[must_use]
pub fn set_phase(phase: Phase) -> ContextGuard {
    CURRENT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    CURRENT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().current_file = Some(path.into());
        ContextGuard { previous }
    })
}

pub fn set_iteration(iteration: usize) {
    ITERATION.store(iteration, Ordering::Relaxed);
}

pub fn iteration() -> usize {
    ITERATION.load(Ordering::Relaxed)
}

#[must_use]
pub fn current_context() -> RunContext {
    CURRENT.with(|ctx| ctx.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_restore_the_previous_context() {
        let _outer = set_phase(Phase::Loading);
        {
            let _inner = set_phase(Phase::Injection);
            let _file = set_current_file("/tmp/a.go");
            let ctx = current_context();
            assert_eq!(ctx.phase, Some(Phase::Injection));
            assert_eq!(ctx.current_file, Some(PathBuf::from("/tmp/a.go")));
        }
        let ctx = current_context();
        assert_eq!(ctx.phase, Some(Phase::Loading));
        assert!(ctx.current_file.is_none());
    }

    #[test]
    fn phases_display_in_snake_case() {
        assert_eq!(Phase::Propagation.to_string(), "propagation");
        assert_eq!(Phase::Writing.to_string(), "writing");
    }
}
