//! Publish-root enumeration.
//!
//! First stage of a publish run. Walks the directory being published and
//! produces the set of destination keys: every regular file, relative to the
//! root, with `/` separators. The key set is what the orchestrator fans out
//! over, and each key doubles as the object's path within the bucket.
//!
//! ## Rules
//!
//! - The config file (`sitedeploy.json`) is never published, at any depth.
//! - A root that does not exist yields the empty set: publishing a directory
//!   that was never built is a no-op, not a crash.
//! - Keys are identical regardless of how the root was spelled — trailing
//!   slash, no trailing slash, absolute, relative.

use crate::config::CONFIG_FILE_NAME;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error walking {0}: {1}")]
    Walk(String, walkdir::Error),
}

/// List every publishable file under `root` as a set of destination keys.
pub fn list_site_files(root: &Path) -> Result<BTreeSet<String>, ScanError> {
    let mut keys = BTreeSet::new();
    if !root.exists() {
        return Ok(keys);
    }

    for entry in WalkDir::new(root) {
        let entry =
            entry.map_err(|e| ScanError::Walk(root.display().to_string(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name() == CONFIG_FILE_NAME {
            continue;
        }
        // strip_prefix cannot fail: every entry sits under the walk root.
        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("walk entry outside root");
        keys.insert(destination_key(relative));
    }

    Ok(keys)
}

/// Join a relative path's components with `/`, whatever the platform.
fn destination_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
