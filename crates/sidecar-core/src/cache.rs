//! The sidecar cache directory.
//!
//! Each provisioned sidecar is one file named `{name}-{target}[.exe]` under
//! the cache root. A sidecar whose file exists is considered provisioned; the
//! contents are never re-validated.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sidecar_schema::{AssetEntry, PlatformTarget, SidecarName};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::Reporter;
use crate::io::download::{DownloadError, Fetcher};
use crate::io::extract::{ExtractError, extract_blocking};

/// Mode given to every written file before the owner-execute bit.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of [`SidecarCache::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The sidecar's destination already existed; nothing was fetched.
    AlreadyPresent(PathBuf),
    /// Files written by this call, the logical sidecar's own file included
    /// unless the archive lacked it.
    Written(Vec<PathBuf>),
}

/// Destination directory for sidecars.
#[derive(Debug, Clone)]
pub struct SidecarCache {
    root: PathBuf,
}

impl SidecarCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{name}-{target}` plus `.exe` on Windows targets.
    pub fn destination(&self, name: &SidecarName, target: &PlatformTarget) -> PathBuf {
        self.root.join(name.file_name_for(target))
    }

    pub fn is_present(&self, name: &SidecarName, target: &PlatformTarget) -> bool {
        self.destination(name, target).exists()
    }

    /// Create the cache root if it does not exist yet.
    pub fn create_root(&self) -> Result<(), SidecarError> {
        std::fs::create_dir_all(&self.root).map_err(|source| SidecarError::Io {
            path: self.root.clone(),
            source,
        })
    }

    /// Make sure `name` is present for `target`, downloading `url` and
    /// unpacking it according to `entry` when it is not.
    pub async fn ensure(
        &self,
        name: &SidecarName,
        target: &PlatformTarget,
        entry: &AssetEntry,
        url: &str,
        fetcher: &dyn Fetcher,
        reporter: &dyn Reporter,
    ) -> Result<CacheOutcome, SidecarError> {
        let dest = self.destination(name, target);
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "cache hit");
            return Ok(CacheOutcome::AlreadyPresent(dest));
        }

        self.create_root()?;
        let bytes = fetcher.fetch(name, url, reporter).await?;

        let written = match entry {
            AssetEntry::Raw { .. } => {
                self.write(&dest, &bytes, target)?;
                vec![dest]
            }
            AssetEntry::Archive {
                format, members, ..
            } => {
                reporter.extracting(name, *format);
                let extracted = extract_blocking(bytes, *format, members.wanted()).await?;

                let mut written: Vec<PathBuf> = Vec::new();
                for (member, destination) in members.iter() {
                    let Some(contents) = extracted.get(member) else {
                        continue;
                    };
                    let path = self.destination(destination, target);
                    if written.contains(&path) {
                        continue;
                    }
                    self.write(&path, contents, target)?;
                    written.push(path);
                }
                written
            }
        };

        Ok(CacheOutcome::Written(written))
    }

    /// Atomically write `contents` to `dest` inside the cache root, then mark
    /// it executable unless `target` is Windows.
    ///
    /// The bytes land in a temporary file first and are renamed into place,
    /// so an interrupted write never leaves a partial file at `dest`.
    pub fn write(
        &self,
        dest: &Path,
        contents: &[u8],
        target: &PlatformTarget,
    ) -> Result<(), SidecarError> {
        let io_err = |source| SidecarError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(contents).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        // Temporary files are created 0600.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
                .map_err(io_err)?;
        }
        tmp.persist(dest).map_err(|e| io_err(e.error))?;

        if !target.is_windows() {
            set_owner_executable(dest).map_err(io_err)?;
        }
        Ok(())
    }
}

/// OR the owner-execute bit (`0o100`) into the file's mode.
///
/// A no-op on hosts without Unix permissions.
pub fn set_owner_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o100);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use async_trait::async_trait;
    use bytes::Bytes;
    use sidecar_schema::{ArchiveFormat, MemberMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StaticFetcher {
        body: Option<Vec<u8>>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn ok(body: &[u8]) -> Self {
            Self {
                body: Some(body.to_vec()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(
            &self,
            _: &SidecarName,
            url: &str,
            _: &dyn Reporter,
        ) -> Result<Bytes, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.body {
                Some(body) => Ok(Bytes::from(body.clone())),
                None => Err(DownloadError::Status {
                    url: url.to_string(),
                    status: 503,
                }),
            }
        }
    }

    fn name(s: &str) -> SidecarName {
        SidecarName::new(s).unwrap()
    }

    fn target(s: &str) -> PlatformTarget {
        PlatformTarget::new(s).unwrap()
    }

    fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_destination_naming() {
        let cache = SidecarCache::new("/cache");
        assert_eq!(
            cache.destination(&name("sona"), &target("x86_64-pc-windows-msvc")),
            Path::new("/cache/sona-x86_64-pc-windows-msvc.exe")
        );
        assert_eq!(
            cache.destination(&name("sona"), &target("aarch64-apple-darwin")),
            Path::new("/cache/sona-aarch64-apple-darwin")
        );
    }

    #[tokio::test]
    async fn test_raw_asset_written_once() {
        let dir = tempdir().unwrap();
        let cache = SidecarCache::new(dir.path().join("binaries"));
        let fetcher = StaticFetcher::ok(b"#!/bin/sh\n");
        let linux = target("x86_64-unknown-linux-gnu");
        let entry = AssetEntry::raw("tool-linux-amd64").unwrap();

        let first = cache
            .ensure(&name("tool"), &linux, &entry, "http://x/tool", &fetcher, &NullReporter)
            .await
            .unwrap();
        let dest = dir.path().join("binaries/tool-x86_64-unknown-linux-gnu");
        assert_eq!(first, CacheOutcome::Written(vec![dest.clone()]));
        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\n");

        let second = cache
            .ensure(&name("tool"), &linux, &entry, "http://x/tool", &fetcher, &NullReporter)
            .await
            .unwrap();
        assert_eq!(second, CacheOutcome::AlreadyPresent(dest));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_archive_writes_every_mapped_member() {
        let dir = tempdir().unwrap();
        let cache = SidecarCache::new(dir.path());
        let archive = tar_gz(&[("pkg/bin/sona", b"engine"), ("pkg/ffmpeg", b"codec")]);
        let fetcher = StaticFetcher::ok(&archive);
        let mac = target("aarch64-apple-darwin");
        let members = MemberMap::new()
            .with("sona", name("sona"))
            .unwrap()
            .with("ffmpeg", name("ffmpeg"))
            .unwrap();
        let entry = AssetEntry::archive("sona.tar.gz", ArchiveFormat::TarGz, members).unwrap();

        let outcome = cache
            .ensure(&name("sona"), &mac, &entry, "http://x/sona.tar.gz", &fetcher, &NullReporter)
            .await
            .unwrap();

        let CacheOutcome::Written(paths) = outcome else {
            panic!("expected a fresh write");
        };
        assert_eq!(paths.len(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("sona-aarch64-apple-darwin")).unwrap(),
            b"engine"
        );
        assert_eq!(
            std::fs::read(dir.path().join("ffmpeg-aarch64-apple-darwin")).unwrap(),
            b"codec"
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let cache = SidecarCache::new(dir.path());
        let fetcher = StaticFetcher::failing();
        let entry = AssetEntry::raw("tool").unwrap();

        let err = cache
            .ensure(
                &name("tool"),
                &target("x86_64-unknown-linux-gnu"),
                &entry,
                "http://x/tool",
                &fetcher,
                &NullReporter,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SidecarError::Download(DownloadError::Status { status: 503, .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_execute_bit_is_ored_in() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, b"x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        set_owner_executable(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o744);
    }

    #[cfg(unix)]
    #[test]
    fn test_windows_target_is_not_made_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let cache = SidecarCache::new(dir.path());
        let win = target("x86_64-pc-windows-msvc");
        let dest = cache.destination(&name("tool"), &win);
        cache.write(&dest, b"MZ", &win).unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let cache = SidecarCache::new(dir.path());
        let linux = target("x86_64-unknown-linux-gnu");
        let dest = cache.destination(&name("tool"), &linux);
        cache.write(&dest, b"\x7fELF", &linux).unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o744);
    }
}
