/// Filesystem helpers for dataset discovery
use std::fs;
use std::path::Path;

use crate::SegError;

/// Names of the non-hidden entries in `dir`, sorted.
///
/// Entries whose name starts with `.` are skipped.
pub fn list_visible_entries(dir: &Path) -> crate::Result<Vec<String>> {
    let io_err = |source| SegError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().into_string().map_err(|raw| SegError::Structure {
            path: dir.to_path_buf(),
            msg: format!("non UTF-8 entry name {:?}", raw),
        })?;
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    Ok(names)
}

/// Split a file name into (stem, extension) at the last dot.
///
/// A name without a dot has an empty extension: `"0.png"` gives
/// `("0", "png")`, `"README"` gives `("README", "")`.
pub fn split_stem_ext(name: &str) -> (String, String) {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    (stem, ext)
}

/// Stems and extensions of the visible files in `dir`, in sorted name order.
///
/// For a folder of `0.npy`, `1.npy`, ... this returns
/// `(["0", "1", ...], ["npy", "npy", ...])`.
pub fn filenames_and_exts(dir: &Path) -> crate::Result<(Vec<String>, Vec<String>)> {
    let (stems, exts) = list_visible_entries(dir)?
        .iter()
        .map(|name| split_stem_ext(name))
        .unzip();
    Ok((stems, exts))
}
