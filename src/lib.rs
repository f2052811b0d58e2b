//! errfix finds Go calls whose `error` result is thrown away and rewrites
//! the code to check it, widening function signatures up the call graph
//! where the error has to travel.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod driver;
pub mod io;
pub mod loader;
pub mod observability;
pub mod reporter;
pub mod rewrite;
pub mod syntax;
pub mod types;

#[cfg(test)]
pub(crate) mod testkit;

pub use crate::config::{FixConfig, Level, Mode, TerminalStrategy};
pub use crate::core::errors::{Error, Result};
pub use crate::driver::Driver;
pub use crate::reporter::{Finding, Reporter, Summary};
