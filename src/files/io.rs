//! Read and atomic-write helpers.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read a whole file, mapping failures to `Error::FileRead`.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `contents` to `path` without ever leaving a partial file behind.
///
/// The data is written and synced to a dot-prefixed sibling temp file which
/// is then renamed over the target. Dot-prefixed names are skipped by
/// workspace enumeration, so a leftover temp file after a crash is never
/// mistaken for a document.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = temp_path_for(path);
    let write_err = |source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        warn!(
            "Could not move {} into place: {}",
            tmp_path.display(),
            e
        );
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Remove a file, mapping failures to `Error::FileWrite`.
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Hidden sibling path used while a file is being written.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
