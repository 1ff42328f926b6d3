use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{ReleaseError, Result};

/// Packs a build directory into an archive file
pub trait Archiver {
    fn archive(&self, source_dir: &Path, destination: &Path) -> Result<()>;
}

/// Archives with the system `zip` tool.
///
/// Zips from inside the source directory so that `manifest.json` sits at the
/// archive root, which is what the web store expects. An existing archive at
/// the destination is replaced rather than appended to.
///
/// Requires `zip` on PATH. A missing binary fails with exit code 127.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCommand;

impl Archiver for ZipCommand {
    fn archive(&self, source_dir: &Path, destination: &Path) -> Result<()> {
        let destination = absolute(destination)?;
        let command = format!("zip -r {} .", destination.display());

        if !source_dir.is_dir() {
            return Err(ReleaseError::command(
                &command,
                1,
                format!("build directory not found: {}", source_dir.display()),
            ));
        }

        match fs::remove_file(&destination) {
            Ok(()) => debug!(archive = %destination.display(), "removed stale archive"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let output = Command::new("zip")
            .arg("-q")
            .arg("-r")
            .arg(&destination)
            .arg(".")
            .current_dir(source_dir)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ReleaseError::command(&command, 127, format!("zip not found on PATH: {}", e))
                } else {
                    ReleaseError::command(&command, 1, e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(ReleaseError::command(
                &command,
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
