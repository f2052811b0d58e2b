use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::core::ErrfixConfig;
use crate::core::errors::{Error, Result};

pub const CONFIG_FILE: &str = ".errfix.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse config from a TOML string
pub fn parse_config(contents: &str) -> Result<ErrfixConfig> {
    toml::from_str::<ErrfixConfig>(contents).map_err(|e| Error::Config(format!("failed to parse {CONFIG_FILE}: {e}")))
}

/// Read and parse an explicitly named config file
pub fn load_config_from(path: &Path) -> Result<ErrfixConfig> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_config(&contents).map_err(|e| match e {
        Error::Config(message) => Error::Config(format!("{}: {message}", path.display())),
        other => other,
    })
}

/// `start` and its parents, nearest first
pub(crate) fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Finds `.errfix.toml` by walking up from `start`. A file that exists but
/// does not parse is an error; no file at all is not.
pub fn discover_config(start: &Path) -> Result<Option<(PathBuf, ErrfixConfig)>> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for dir in directory_ancestors(start, MAX_TRAVERSAL_DEPTH) {
        let path = dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let config = parse_config(&contents)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                debug!("Loaded config from {}", path.display());
                return Ok(Some((path, config)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
            }
        }
    }
    debug!("No {CONFIG_FILE} found after checking {MAX_TRAVERSAL_DEPTH} directories");
    Ok(None)
}
