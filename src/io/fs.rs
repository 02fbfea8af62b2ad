use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Refuse to clobber an existing file unless `force` is set.
pub fn check_overwrite(target: &Path, force: bool) -> Result<()> {
    if !force && target.exists() {
        bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
    }
    Ok(())
}

/// Write-then-rename wrapper, so readers never observe a half-written output.
pub struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

impl PendingWrite {
    /// Open a temporary file next to `target`, creating parent directories.
    pub fn open(target: &Path, force: bool) -> Result<Self> {
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure_dir_exists(parent)?;
        check_overwrite(target, force)?;

        let tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        Ok(Self { target: target.to_path_buf(), tmp })
    }

    /// Flush and atomically move the temporary file into place.
    pub fn finalize(mut self) -> Result<()> {
        self.tmp.flush().context("Failed to flush temp file")?;
        self.tmp.as_file().sync_all().ok(); // best-effort fsync
        self.tmp.persist(&self.target)
            .with_context(|| format!("Failed to rename into {}", self.target.display()))?;
        if let Some(dir) = self.target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.tmp.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.tmp.flush() }
}

impl Seek for PendingWrite {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.tmp.as_file_mut().seek(pos)
    }
}
