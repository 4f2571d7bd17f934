//! Archive member extraction
//!
//! Pulls selected members out of an in-memory zip or tar.gz archive. Members
//! are matched by basename, so the directory layout inside the archive does
//! not matter.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read};

use bytes::Bytes;
use sidecar_schema::ArchiveFormat;
use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Upper bound on the buffer reserved from a member's declared size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Extracted member contents keyed by basename.
pub type Extracted = BTreeMap<String, Vec<u8>>;

/// Extract the members of `archive` whose basename is in `wanted`.
///
/// Directories are skipped and the first member with a given basename wins.
/// Wanted basenames that do not occur in the archive are simply absent from
/// the result.
pub fn extract(
    archive: &[u8],
    format: ArchiveFormat,
    wanted: &BTreeSet<String>,
) -> Result<Extracted, ExtractError> {
    let found = match format {
        ArchiveFormat::Zip => extract_zip(archive, wanted)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, wanted)?,
    };

    for missing in wanted.iter().filter(|name| !found.contains_key(*name)) {
        tracing::debug!(member = %missing, %format, "wanted member not found in archive");
    }

    Ok(found)
}

/// [`extract`] on the blocking thread pool.
pub async fn extract_blocking(
    archive: Bytes,
    format: ArchiveFormat,
    wanted: BTreeSet<String>,
) -> Result<Extracted, ExtractError> {
    tokio::task::spawn_blocking(move || extract(&archive, format, &wanted))
        .await
        .map_err(io::Error::other)?
}

// Declared sizes come from untrusted archive headers.
fn prealloc(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn extract_zip(archive: &[u8], wanted: &BTreeSet<String>) -> Result<Extracted, ExtractError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut found = Extracted::new();

    for i in 0..zip.len() {
        if found.len() == wanted.len() {
            break;
        }

        let mut file = zip.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let name = basename(file.name()).to_string();
        if !wanted.contains(&name) || found.contains_key(&name) {
            continue;
        }

        let mut contents = Vec::with_capacity(prealloc(file.size()));
        file.read_to_end(&mut contents)?;
        found.insert(name, contents);
    }

    Ok(found)
}

fn extract_tar_gz(archive: &[u8], wanted: &BTreeSet<String>) -> Result<Extracted, ExtractError> {
    let decoder = flate2::read::GzDecoder::new(archive);
    let mut tar = tar::Archive::new(decoder);
    let mut found = Extracted::new();

    for entry in tar.entries()? {
        if found.len() == wanted.len() {
            break;
        }

        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?;
        let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        if !wanted.contains(&name) || found.contains_key(&name) {
            continue;
        }

        let mut contents = Vec::with_capacity(prealloc(entry.size()));
        entry.read_to_end(&mut contents)?;
        found.insert(name, contents);
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn wanted(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn zip_bytes(entries: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for dir in dirs {
            writer.add_directory(*dir, options).unwrap();
        }
        for (path, data) in entries {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_cksum();
        builder
            .append_data(&mut dir, "release/", io::empty())
            .unwrap();

        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_zip_selects_by_basename_at_any_depth() {
        let archive = zip_bytes(
            &[
                ("sona-v1/bin/sona.exe", b"engine"),
                ("ffmpeg.exe", b"codec"),
                ("README.md", b"docs"),
            ],
            &["sona-v1/", "sona-v1/bin/"],
        );

        let out = extract(&archive, ArchiveFormat::Zip, &wanted(&["sona.exe", "ffmpeg.exe"])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["sona.exe"], b"engine");
        assert_eq!(out["ffmpeg.exe"], b"codec");
    }

    #[test]
    fn test_tar_gz_selects_by_basename_at_any_depth() {
        let archive = tar_gz_bytes(&[
            ("release/linux/sona", b"engine"),
            ("release/ffmpeg", b"codec"),
            ("release/LICENSE", b"mit"),
        ]);

        let out = extract(&archive, ArchiveFormat::TarGz, &wanted(&["sona", "ffmpeg"])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["sona"], b"engine");
        assert_eq!(out["ffmpeg"], b"codec");
    }

    #[test]
    fn test_first_match_wins() {
        let archive = tar_gz_bytes(&[("a/sona", b"first"), ("b/sona", b"second")]);
        let out = extract(&archive, ArchiveFormat::TarGz, &wanted(&["sona"])).unwrap();
        assert_eq!(out["sona"], b"first");

        let archive = zip_bytes(&[("a/sona", b"first"), ("b/sona", b"second")], &[]);
        let out = extract(&archive, ArchiveFormat::Zip, &wanted(&["sona"])).unwrap();
        assert_eq!(out["sona"], b"first");
    }

    #[test]
    fn test_missing_member_is_not_an_error() {
        let archive = zip_bytes(&[("sona.exe", b"engine")], &[]);
        let out = extract(&archive, ArchiveFormat::Zip, &wanted(&["sona.exe", "ffmpeg.exe"])).unwrap();
        assert!(out.contains_key("sona.exe"));
        assert!(!out.contains_key("ffmpeg.exe"));
    }

    #[test]
    fn test_directory_named_like_member_is_skipped() {
        let archive = zip_bytes(&[("pkg/sona/readme", b"x"), ("bin/sona", b"engine")], &["sona/"]);
        let out = extract(&archive, ArchiveFormat::Zip, &wanted(&["sona"])).unwrap();
        assert_eq!(out["sona"], b"engine");
    }

    #[test]
    fn test_corrupt_archives_are_errors() {
        let garbage = b"definitely not an archive";
        assert!(extract(garbage, ArchiveFormat::Zip, &wanted(&["x"])).is_err());
        assert!(extract(garbage, ArchiveFormat::TarGz, &wanted(&["x"])).is_err());
    }

    #[test]
    fn test_huge_declared_member_size_does_not_abort() {
        let mut header = tar::Header::new_gnu();
        header.set_path("bin/sona").unwrap();
        header.set_size(u64::MAX / 2);
        header.set_mode(0o755);
        header.set_cksum();

        let mut raw = header.as_bytes().to_vec();
        raw.extend_from_slice(b"engine");
        raw.resize(512 * 2, 0);
        raw.extend_from_slice(&[0; 1024]);

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw).unwrap();
        let archive = encoder.finish().unwrap();

        if let Ok(out) = extract(&archive, ArchiveFormat::TarGz, &wanted(&["sona"])) {
            assert!(out.get("sona").is_none_or(|contents| contents.len() <= raw.len()));
        }
    }

    #[test]
    fn test_prealloc_is_capped() {
        assert_eq!(prealloc(6), 6);
        assert_eq!(prealloc(u64::MAX), MAX_PREALLOC as usize);
    }

    #[tokio::test]
    async fn test_extract_blocking() {
        let archive = tar_gz_bytes(&[("tool", b"bin")]);
        let out = extract_blocking(Bytes::from(archive), ArchiveFormat::TarGz, wanted(&["tool"]))
            .await
            .unwrap();
        assert_eq!(out["tool"], b"bin");
    }
}
