//! File discovery and output.

pub mod persist;
pub mod walker;

pub use persist::{persist, render_diff, Change};
pub use walker::{find_go_files, is_test_file, GoFileWalker};
