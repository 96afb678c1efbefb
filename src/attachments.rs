use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{Error, Result};

/// Decides which files get attached to a message
///
/// An explicit list (even an empty one) is used as given, paths are not
/// checked here. Without one the regular files directly inside
/// `attachments_path` are used, in the order the directory lists them.
pub fn select(
    explicit: Option<&[PathBuf]>,
    attachments_path: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    if let Some(explicit) = explicit {
        debug!("Using {} explicitly provided attachment(s)", explicit.len());
        return Ok(explicit.to_vec());
    }
    let Some(dir) = attachments_path else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        warn!("Attachments path {dir:?} is not an existing directory. No files attached");
        return Ok(Vec::new());
    }
    scan_dir(dir)
}

fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |source| Error::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut result = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() {
            result.push(path);
        } else {
            debug!("Skipping {path:?} as it is not a regular file");
        }
    }
    debug!("Found {} attachment(s) in {dir:?}", result.len());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Directory with `f1.txt`, `f2.txt` and a subdirectory holding another file
    fn populated_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f1.txt"), "one").unwrap();
        fs::write(dir.path().join("f2.txt"), "two").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.txt"), "nested").unwrap();
        dir
    }

    #[test]
    fn explicit_empty_list_wins_over_directory() {
        let dir = populated_dir();

        let actual = select(Some(Vec::new().as_slice()), Some(dir.path())).unwrap();

        assert!(actual.is_empty());
    }

    #[test]
    fn explicit_list_is_returned_verbatim() {
        // Arrange
        let dir = populated_dir();
        let explicit = vec![
            PathBuf::from("does/not/exist.log"),
            dir.path().join("f2.txt"),
        ];

        // Act
        let actual = select(Some(explicit.as_slice()), Some(dir.path())).unwrap();

        // Assert
        assert_eq!(actual, explicit);
    }

    #[test]
    fn directory_scan_returns_files_only() {
        // Arrange
        let dir = populated_dir();

        // Act
        let mut actual = select(None, Some(dir.path())).unwrap();

        // Assert (listing order is platform dependent)
        actual.sort();
        assert_eq!(
            actual,
            vec![dir.path().join("f1.txt"), dir.path().join("f2.txt")]
        );
    }

    #[test]
    fn nothing_provided_is_empty() {
        let actual = select(None, None).unwrap();

        assert!(actual.is_empty());
    }

    #[test]
    fn missing_directory_degrades_to_empty() {
        let dir = TempDir::new().unwrap();

        let actual = select(None, Some(dir.path().join("missing").as_path())).unwrap();

        assert!(actual.is_empty());
    }

    #[test]
    fn file_as_attachments_path_degrades_to_empty() {
        let dir = populated_dir();

        let actual = select(None, Some(dir.path().join("f1.txt").as_path())).unwrap();

        assert!(actual.is_empty());
    }
}
