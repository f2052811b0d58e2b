//! Turning discarded errors into checked ones.
//!
//! A pass runs in two phases over one loaded program. [`propagate`] decides,
//! per enclosing function, how each discard is handled and widens
//! signatures where the error should travel upward. [`inject`] then writes
//! the checks. Both phases edit formatting-preserving destination trees
//! ([`dest`]); the analysis tree is only read, apart from the signature
//! changes phase one mirrors into it so later decisions see them.

pub mod dest;
pub mod imports;
pub mod inject;
pub mod mapper;
pub mod naming;
pub mod panics;
pub mod propagate;
pub mod snippet;
pub mod template;
pub mod zero;

pub use dest::{DestCache, Rendered};
pub use inject::{Injector, Outcome};
pub use propagate::{Handler, Plan, Propagator};
pub use template::Template;
