// dbassist/src/config/locate.rs
use std::path::{Path, PathBuf};

/// Config file names tried in each directory, in priority order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["dbassist.toml", "dbassist.json"];

/// Walks upward from `start` looking for a config file.
///
/// The nearest directory wins; within a directory the TOML file wins over the JSON one.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    find_config_file_with(start, |candidate| candidate.is_file())
}

/// Same walk as [`find_config_file`] with an injectable existence check.
pub fn find_config_file_with<F>(start: &Path, mut exists: F) -> Option<PathBuf>
where
    F: FnMut(&Path) -> bool,
{
    let mut current = std::path::absolute(start).unwrap_or_else(|_| start.to_path_buf());

    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if exists(&candidate) {
                return Some(candidate);
            }
        }

        // Stop once the parent of the directory is the directory itself.
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return None,
        }
    }
}
