use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Loads a file from disk for sending, pairing it with the bare filename
/// that goes out in the METADATA fragment (§5) — the full path is a local
/// concern, never put on the wire.
pub fn load_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let name = path
        .file_name()
        .context("path has no file name")?
        .to_string_lossy()
        .into_owned();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok((name, bytes))
}

/// Writes a received file to `name` in the current working directory and
/// returns the path written to.
pub fn save_file(name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = PathBuf::from(name);
    fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
