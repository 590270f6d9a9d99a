use crate::error::{BiletoError, Result};
use crate::storage::DATA_DIR;
use std::env;
use std::path::{Path, PathBuf};

/// Find the project root, the closest directory holding a `.bileto` folder
///
/// The search starts at `start_dir` (or the current directory) and walks up
/// the parents.
pub fn find_project_root(start_dir: Option<&str>) -> Result<PathBuf> {
    let start = match start_dir {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir()?,
    };

    let mut current: Option<&Path> = Some(&start);
    while let Some(dir) = current {
        if dir.join(DATA_DIR).is_dir() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(BiletoError::ProjectNotInitialized)
}

/// Parse a ticket reference such as `42` or `#42`
pub fn parse_ticket_number(reference: &str) -> Result<u64> {
    reference
        .trim()
        .trim_start_matches('#')
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| BiletoError::InvalidInput(format!("Invalid ticket number: {reference}")))
}
