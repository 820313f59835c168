//! Source tarball extraction.
//!
//! A release tarball is unpacked into a private temporary directory and must
//! contain exactly one top-level directory, the source root. Plain, gzip and
//! zstd tarballs are unpacked in-process with path traversal protection; any
//! other compression (the bzip2 and xz tarballs SpiderMonkey is released as)
//! is handed to the system `tar`.

use crate::error::{Result, UpdaterError};
use crate::interrupt;
use crate::runner::{CommandRunner, Invocation, run_checked};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: usize = 257;

/// Compression of a source tarball, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed POSIX tar.
    Tar,
    /// gzip-compressed tar.
    Gzip,
    /// zstd-compressed tar.
    Zstd,
    /// Anything else; unpacked by the system `tar`.
    External,
}

impl ArchiveFormat {
    /// Detects the format of the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn detect(path: &Utf8Path) -> Result<Self> {
        let mut header = Vec::with_capacity(USTAR_OFFSET + USTAR_MAGIC.len());
        File::open(path)
            .and_then(|file| {
                file.take((USTAR_OFFSET + USTAR_MAGIC.len()) as u64)
                    .read_to_end(&mut header)
            })
            .map_err(UpdaterError::filesystem("read", path))?;
        Ok(Self::from_header(&header))
    }

    /// Classifies an archive from its first bytes.
    #[must_use]
    pub fn from_header(header: &[u8]) -> Self {
        if header.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if header.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else if header.get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()) == Some(USTAR_MAGIC) {
            Self::Tar
        } else {
            Self::External
        }
    }
}

/// The single source directory of an unpacked tarball.
///
/// The temporary directory holding it is deleted when this value is dropped,
/// whichever way the caller leaves its scope.
#[derive(Debug)]
pub struct ExtractedRoot {
    path: Utf8PathBuf,
    _scratch: TempDir,
}

impl ExtractedRoot {
    /// Path of the source root inside the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Name of the top-level directory as it appeared in the tarball.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }
}

/// Unpacks `archive` into a fresh temporary directory and returns its single
/// top-level directory.
///
/// The existence check runs before any temporary directory is created.
///
/// # Errors
///
/// Returns [`UpdaterError::TarballNotFound`] if `archive` does not exist,
/// [`UpdaterError::AmbiguousArchive`] unless exactly one top-level entry was
/// unpacked, [`UpdaterError::RootNotDirectory`] if that entry is a file, and
/// extraction errors otherwise.
pub fn extract_single_root(runner: &dyn CommandRunner, archive: &Utf8Path) -> Result<ExtractedRoot> {
    if !archive.exists() {
        return Err(UpdaterError::TarballNotFound {
            path: archive.to_owned(),
        });
    }

    let scratch = tempfile::Builder::new().prefix("mozjs-update-").tempdir()?;
    let scratch_path = utf8(scratch.path())?;

    let format = ArchiveFormat::detect(archive)?;
    debug!("unpacking {archive} ({format:?}) into {scratch_path}");
    let open = || File::open(archive).map_err(UpdaterError::filesystem("open", archive));
    let interrupted = interrupt::flag();
    match format {
        ArchiveFormat::Tar => unpack_tar(open()?, scratch.path(), interrupted)?,
        ArchiveFormat::Gzip => {
            unpack_tar(flate2::read::GzDecoder::new(open()?), scratch.path(), interrupted)?;
        }
        ArchiveFormat::Zstd => {
            unpack_tar(zstd::Decoder::new(open()?)?, scratch.path(), interrupted)?;
        }
        ArchiveFormat::External => {
            run_checked(
                runner,
                &Invocation::new("tar").args(["-xf", archive.as_str(), "-C", scratch_path.as_str()]),
            )?;
        }
    }

    let entry = single_entry(&scratch_path)?;
    let path = scratch_path.join(&entry);
    if !path.is_dir() {
        return Err(UpdaterError::RootNotDirectory { entry });
    }

    Ok(ExtractedRoot {
        path,
        _scratch: scratch,
    })
}

/// Unpacks every entry of a tar stream below `dest`, stopping between
/// entries once `interrupted` is raised.
fn unpack_tar<R: Read>(reader: R, dest: &Path, interrupted: &AtomicBool) -> Result<()> {
    let mut archive = tar::Archive::new(BufReader::new(reader));
    archive.set_preserve_mtime(true);

    for entry_result in archive.entries()? {
        interrupt::check_flag(interrupted)?;
        let mut entry = entry_result?;
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }

        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;
        trace!("unpacking {}", entry_path.display());
        entry.unpack_in(dest)?;
    }

    Ok(())
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<()> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(UpdaterError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn single_entry(dir: &Utf8Path) -> Result<String> {
    let mut entries = dir
        .read_dir_utf8()
        .and_then(|listing| {
            listing
                .map(|entry| entry.map(|e| e.file_name().to_owned()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(UpdaterError::filesystem("read directory", dir))?;
    entries.sort();

    match entries.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(UpdaterError::AmbiguousArchive { entries }),
    }
}

pub(crate) fn utf8(path: &Path) -> Result<&Utf8Path> {
    Utf8Path::from_path(path).ok_or_else(|| UpdaterError::NonUtf8Path {
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockCommandRunner;
    use rstest::rstest;
    use std::path::PathBuf;

    fn tar_gz(dir: &Path, name: &str, files: &[(&str, &str)]) -> Utf8PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).expect("create archive");
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (entry, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry, contents.as_bytes())
                .expect("append");
        }
        builder
            .into_inner()
            .expect("tar finish")
            .finish()
            .expect("gzip finish");
        Utf8PathBuf::try_from(path).expect("utf-8 path")
    }

    #[rstest]
    #[case::gzip(&[0x1f, 0x8b, 0x08], ArchiveFormat::Gzip)]
    #[case::zstd(&[0x28, 0xb5, 0x2f, 0xfd, 0x00], ArchiveFormat::Zstd)]
    #[case::bzip2(b"BZh91AY&SY", ArchiveFormat::External)]
    #[case::xz(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00], ArchiveFormat::External)]
    #[case::empty(&[], ArchiveFormat::External)]
    fn detects_format_from_magic(#[case] header: &[u8], #[case] expected: ArchiveFormat) {
        assert_eq!(ArchiveFormat::from_header(header), expected);
    }

    #[test]
    fn detects_plain_tar_from_ustar_marker() {
        let mut header = vec![0_u8; 512];
        header[USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()].copy_from_slice(USTAR_MAGIC);
        assert_eq!(ArchiveFormat::from_header(&header), ArchiveFormat::Tar);
    }

    #[test]
    fn extracts_single_root_from_gzip_tarball() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(
            temp.path(),
            "mozjs.tar.gz",
            &[("mozjs-1.0/a.txt", "a"), ("mozjs-1.0/js/src/jsapi.h", "// jsapi")],
        );

        let runner = MockCommandRunner::new();
        let root = extract_single_root(&runner, &archive).expect("extraction should succeed");

        assert_eq!(root.name(), "mozjs-1.0");
        assert!(root.path().join("a.txt").is_file());
        assert!(root.path().join("js/src/jsapi.h").is_file());
    }

    #[test]
    fn scratch_directory_is_removed_on_drop() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(temp.path(), "mozjs.tar.gz", &[("mozjs-1.0/a.txt", "a")]);

        let runner = MockCommandRunner::new();
        let root = extract_single_root(&runner, &archive).expect("extraction should succeed");
        let scratch = root.path().parent().expect("root has a parent").to_owned();
        assert!(scratch.exists());

        drop(root);
        assert!(!scratch.exists());
    }

    #[test]
    fn rejects_multiple_top_level_directories() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(temp.path(), "two.tar.gz", &[("x/a.txt", "a"), ("y/b.txt", "b")]);

        let runner = MockCommandRunner::new();
        let err = extract_single_root(&runner, &archive).expect_err("two roots are ambiguous");
        assert!(matches!(
            err,
            UpdaterError::AmbiguousArchive { ref entries } if entries == &["x", "y"]
        ));
    }

    #[test]
    fn rejects_archive_without_entries() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(temp.path(), "empty.tar.gz", &[]);

        let runner = MockCommandRunner::new();
        let err = extract_single_root(&runner, &archive).expect_err("nothing to extract");
        assert!(matches!(
            err,
            UpdaterError::AmbiguousArchive { ref entries } if entries.is_empty()
        ));
        assert!(err.to_string().contains("found: nothing"));
    }

    #[test]
    fn unpacking_stops_once_interrupted() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(temp.path(), "mozjs.tar.gz", &[("mozjs-1.0/a.txt", "a")]);
        let dest = tempfile::tempdir().expect("dest dir");
        let interrupted = AtomicBool::new(true);

        let reader = flate2::read::GzDecoder::new(File::open(&archive).expect("open archive"));
        let err = unpack_tar(reader, dest.path(), &interrupted).expect_err("interrupted");

        assert!(matches!(err, UpdaterError::Interrupted));
        assert!(!dest.path().join("mozjs-1.0").exists());
    }

    #[test]
    fn rejects_single_top_level_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz(temp.path(), "file.tar.gz", &[("README", "hi")]);

        let runner = MockCommandRunner::new();
        let err = extract_single_root(&runner, &archive).expect_err("a file is not a root");
        assert!(matches!(err, UpdaterError::RootNotDirectory { ref entry } if entry == "README"));
    }

    #[test]
    fn missing_tarball_fails_before_running_anything() {
        let runner = MockCommandRunner::new();
        let err = extract_single_root(&runner, Utf8Path::new("/no/such/mozjs.tar.bz2"))
            .expect_err("missing tarball should fail");
        assert!(matches!(err, UpdaterError::TarballNotFound { .. }));
    }

    #[test]
    fn unknown_compression_is_delegated_to_system_tar() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = Utf8PathBuf::try_from(temp.path().join("mozjs.tar.bz2")).expect("utf-8");
        std::fs::write(&archive, b"BZh91AY&SY").expect("write archive");

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.program() == "tar"
                    && inv.arguments().first().map(String::as_str) == Some("-xf")
                    && inv.arguments().get(2).map(String::as_str) == Some("-C")
            })
            .times(1)
            .returning(|inv| {
                let dest = Utf8PathBuf::from(&inv.arguments()[3]);
                std::fs::create_dir_all(dest.join("mozjs-128.0")).expect("create root");
                Ok(crate::test_utils::success_output())
            });

        let root = extract_single_root(&runner, &archive).expect("extraction should succeed");
        assert_eq!(root.name(), "mozjs-128.0");
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("mozjs/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(&PathBuf::from(bad_path));
        assert!(
            matches!(result, Err(UpdaterError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(&PathBuf::from("./mozjs-1.0/js/src/jsapi.h")).is_ok());
    }
}
