//! Version-pin file reading.

use std::path::{Path, PathBuf};

use sidecar_schema::{SchemaError, VersionTag};
use thiserror::Error;

/// Default name of the version-pin file, relative to the project directory.
pub const DEFAULT_VERSION_FILE: &str = ".sidecar-version";

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Cannot read version pin {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version pin {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Read and validate the release tag from a version-pin file.
pub fn read_version_tag(path: &Path) -> Result<VersionTag, VersionError> {
    let contents = std::fs::read_to_string(path).map_err(|source| VersionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    VersionTag::parse(&contents).map_err(|source| VersionError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_trimmed_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_VERSION_FILE);
        std::fs::write(&path, "v1.4.2\n").unwrap();
        assert_eq!(read_version_tag(&path).unwrap().as_str(), "v1.4.2");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_version_tag(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, VersionError::Unreadable { .. }));
    }

    #[test]
    fn test_blank_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_VERSION_FILE);
        std::fs::write(&path, "  \n").unwrap();
        let err = read_version_tag(&path).unwrap_err();
        assert!(matches!(
            err,
            VersionError::Invalid {
                source: SchemaError::EmptyField(_),
                ..
            }
        ));
    }
}
