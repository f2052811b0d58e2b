//! Finding discarded errors and the facts the rewriter needs about them.

pub mod detect;
pub mod directive;
pub mod enclosing;
pub mod filter;
pub mod registry;

pub use detect::{Callee, Detector, DiscardKind, InjectionPoint, Site, Suppression};
pub use enclosing::{enclosing_function, FuncContext, FuncKey};
pub use filter::Filter;
pub use registry::{Conflict, InterfaceRegistry};
