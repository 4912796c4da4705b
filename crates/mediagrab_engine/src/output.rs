use std::fs;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputDirError {
    #[error("{path} exists but is not a directory")]
    NotADirectory { path: String },
    #[error("output directory {path} is not usable: {source}")]
    Unusable {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Ensure the download directory exists and is writable; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), OutputDirError> {
    let unusable = |source: io::Error| OutputDirError::Unusable {
        path: dir.display().to_string(),
        source,
    };
    if dir.exists() {
        if !fs::metadata(dir).map_err(unusable)?.is_dir() {
            return Err(OutputDirError::NotADirectory {
                path: dir.display().to_string(),
            });
        }
    } else {
        fs::create_dir_all(dir).map_err(unusable)?;
    }
    // Writability probe; the temp file is removed on drop.
    NamedTempFile::new_in(dir).map_err(unusable)?;
    Ok(())
}
