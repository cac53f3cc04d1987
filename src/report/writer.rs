//! Atomic report output
//!
//! The report is written to `<out>.tmp`, synced, then renamed over the
//! destination, so readers only ever see a complete document.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Failure writing the rendered report
#[derive(Debug, thiserror::Error)]
#[error("failed to write report {path}: {source}")]
pub struct ReportWriteError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

/// Write `content` to `path`, creating parent directories as needed
pub fn write_report<P: AsRef<Path>>(path: P, content: &str) -> Result<(), ReportWriteError> {
    let path = path.as_ref();
    atomic_write(path, content).map_err(|source| ReportWriteError {
        path: path.display().to_string(),
        source,
    })
}

fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let result = File::create(&temp_path).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    });
    if result.is_err() {
        // the destination is untouched; drop the partial temp file
        let _ = fs::remove_file(&temp_path);
    }
    result
}
