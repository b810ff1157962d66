//! Output file writes: temp sibling then rename, so a final name never holds a
//! half-written artifact.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;

/// Sibling path used while `path` is being written (`weights.bin` -> `weights.bin.tmp`).
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write raw bytes to `path` through a `.tmp` sibling and a rename.
///
/// The parent directory must already exist. On failure the temp file is
/// removed on a best-effort basis and the target is left untouched.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConvertError> {
    let tmp = tmp_path(path);
    if let Err(source) = std::fs::write(&tmp, data) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ConvertError::Io { path: tmp, source });
    }
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        ConvertError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Serialize `data` as two-space indented JSON and write it atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), ConvertError> {
    let mut json = serde_json::to_string_pretty(data)?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Read a whole file, tagging any failure with its path.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ConvertError> {
    std::fs::read(path).map_err(ConvertError::io(path))
}

/// Copy `from` to `to` byte for byte, atomically on the destination side.
pub fn copy_verbatim(from: &Path, to: &Path) -> Result<u64, ConvertError> {
    let bytes = read_bytes(from)?;
    atomic_write(to, &bytes)?;
    Ok(bytes.len() as u64)
}
