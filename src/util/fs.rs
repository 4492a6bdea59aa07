//! Directory listing for template and document folders.

use crate::util::{SymMatchError, SymMatchResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists regular files in `dir` whose extension matches one of `extensions`
/// (case-insensitive), sorted by path. The listing is not recursive.
pub(crate) fn list_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
) -> SymMatchResult<Vec<PathBuf>> {
    let io_err = |err: std::io::Error| SymMatchError::Io {
        path: dir.to_path_buf(),
        reason: err.to_string(),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
