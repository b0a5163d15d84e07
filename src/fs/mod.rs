use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Filesystem mutations performed when committing a rename plan.
pub trait Filesystem {
    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), CopyFileError>;
}

struct PosixFilesystem;

impl Filesystem for PosixFilesystem {
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), CopyFileError> {
        copy_file(src, dst)
    }
}

pub fn new_instance() -> Box<dyn Filesystem> {
    Box::new(PosixFilesystem {})
}

#[derive(Debug, Error)]
pub enum CollectFilesError {
    #[error("WalkDir failed: {0}")]
    WalkDir(#[from] walkdir::Error),
}

/// Returns the entries directly inside `dir` whose names end in `.{ext}`, sorted by name.
///
/// Behaves like globbing `dir/*.{ext}`: a missing `dir` is not an error and yields no files, and
/// entries are not filtered by file type.
pub fn collect_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, CollectFilesError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let suffix = format!(".{ext}");
    let mut files = vec![];
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix))
        {
            files.push(clean_path(entry.path()));
        }
    }
    Ok(files)
}

/// Lexically normalizes `path`: drops `.` components and resolves `..` against preceding names.
///
/// Paths are printed to the user, so `./subs/a.srt` is shown as `subs/a.srt`. An empty result
/// becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    // Normal components that a following `..` may cancel out.
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => {
                cleaned.pop();
                depth -= 1;
            }
            // `/..` is `/`.
            Component::ParentDir if cleaned.has_root() => {}
            Component::Normal(name) => {
                cleaned.push(name);
                depth += 1;
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// `dir.join(name)`, cleaned.
pub fn join_clean(dir: &Path, name: impl AsRef<Path>) -> PathBuf {
    clean_path(&dir.join(name))
}

#[derive(Debug, Error)]
pub enum CopyFileError {
    #[error("non-regular source file {} (mode {:o})", .path.display(), .mode)]
    NonRegularSource { path: PathBuf, mode: u32 },
    #[error("non-regular destination file {} (mode {:o})", .path.display(), .mode)]
    NonRegularDestination { path: PathBuf, mode: u32 },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Copies `src` to `dst`, which may already exist as a regular file.
///
/// Copying a file onto itself is a no-op. Otherwise a hard link is attempted first, falling back
/// to copying the contents if linking fails (e.g. across filesystems or when `dst` exists).
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), CopyFileError> {
    type Error = CopyFileError;

    let src_metadata = std::fs::metadata(src)?;
    if !src_metadata.is_file() {
        return Err(Error::NonRegularSource {
            path: src.to_path_buf(),
            mode: src_metadata.mode(),
        });
    }

    match std::fs::metadata(dst) {
        Ok(dst_metadata) => {
            if !dst_metadata.is_file() {
                return Err(Error::NonRegularDestination {
                    path: dst.to_path_buf(),
                    mode: dst_metadata.mode(),
                });
            }
            if is_same_file(&src_metadata, &dst_metadata) {
                return Ok(());
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    if std::fs::hard_link(src, dst).is_ok() {
        return Ok(());
    }
    Ok(copy_file_contents(src, dst)?)
}

fn is_same_file(a: &Metadata, b: &Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

/// Streams `src` into `dst`, creating or truncating `dst`, and syncs `dst` to disk.
fn copy_file_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut input = std::fs::File::open(src)?;
    let mut output = std::fs::File::create(dst)?;
    std::io::copy(&mut input, &mut output)?;
    output.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_files_missing_dir() {
        let tmp_dir = tempfile::tempdir().unwrap();
        assert!(
            collect_files(&tmp_dir.path().join("missing"), "srt")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn collect_files_filters_and_sorts() {
        let tmp_dir = tempfile::tempdir().unwrap();
        for name in ["b.mkv", "a.mkv", "c.srt", "d.mkv.part", "mkv"] {
            std::fs::write(tmp_dir.path().join(name), "").expect("failed to create test file");
        }
        std::fs::create_dir(tmp_dir.path().join("nested")).unwrap();
        std::fs::write(tmp_dir.path().join("nested").join("e.mkv"), "").unwrap();

        assert_eq!(
            collect_files(tmp_dir.path(), "mkv").unwrap(),
            vec![tmp_dir.path().join("a.mkv"), tmp_dir.path().join("b.mkv")]
        );
    }

    #[test]
    fn collect_files_cleans_paths() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let sub_dir = tmp_dir.path().join("subs");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("Show.x05.srt"), "").unwrap();

        assert_eq!(
            collect_files(&tmp_dir.path().join(".").join("subs"), "srt").unwrap(),
            vec![sub_dir.join("Show.x05.srt")]
        );
        assert_eq!(
            collect_files(&sub_dir.join("..").join("subs"), "srt").unwrap(),
            vec![sub_dir.join("Show.x05.srt")]
        );
    }

    #[test]
    fn clean_path_relative() {
        assert_eq!(
            clean_path(Path::new("./subs/Show.x05.srt")),
            Path::new("subs/Show.x05.srt")
        );
        assert_eq!(
            clean_path(Path::new("./Show.E05.mkv")),
            Path::new("Show.E05.mkv")
        );
        assert_eq!(clean_path(Path::new(".")), Path::new("."));
        assert_eq!(clean_path(Path::new("./subs/..")), Path::new("."));
        assert_eq!(clean_path(Path::new("../videos/./a.mkv")), Path::new("../videos/a.mkv"));
        assert_eq!(clean_path(Path::new("../../a.mkv")), Path::new("../../a.mkv"));
    }

    #[test]
    fn clean_path_absolute() {
        assert_eq!(clean_path(Path::new("/tmp/./x/../a.srt")), Path::new("/tmp/a.srt"));
        assert_eq!(clean_path(Path::new("/../a.srt")), Path::new("/a.srt"));
        assert_eq!(clean_path(Path::new("/")), Path::new("/"));
    }

    #[test]
    fn join_clean_current_dir() {
        assert_eq!(join_clean(Path::new("."), "Show.x05.mkv"), Path::new("Show.x05.mkv"));
        assert_eq!(
            join_clean(Path::new("./videos/"), "Show.x05.srt"),
            Path::new("videos/Show.x05.srt")
        );
    }

    #[test]
    fn copy_file_to_new_path() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        let dst = tmp_dir.path().join("dst.srt");
        std::fs::write(&src, "subtitle").unwrap();

        copy_file(&src, &dst).expect("copy failed");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "subtitle");
        assert_eq!(std::fs::read_to_string(&src).unwrap(), "subtitle");
    }

    #[test]
    fn copy_file_onto_itself_is_noop() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        std::fs::write(&src, "subtitle").unwrap();

        copy_file(&src, &src).expect("copy onto itself failed");
        assert_eq!(std::fs::read_to_string(&src).unwrap(), "subtitle");
    }

    #[test]
    fn copy_file_onto_hard_link_is_noop() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        let dst = tmp_dir.path().join("dst.srt");
        std::fs::write(&src, "subtitle").unwrap();
        std::fs::hard_link(&src, &dst).unwrap();

        copy_file(&src, &dst).expect("copy onto hard link failed");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "subtitle");
    }

    #[test]
    fn copy_file_overwrites_existing_destination() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        let dst = tmp_dir.path().join("dst.srt");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(&dst, "old and longer").unwrap();

        copy_file(&src, &dst).expect("copy failed");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn copy_file_non_regular_source_fails() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let dst = tmp_dir.path().join("dst.srt");

        assert!(matches!(
            copy_file(tmp_dir.path(), &dst),
            Err(CopyFileError::NonRegularSource { path, .. }) if path == tmp_dir.path()
        ));
        assert!(!dst.exists());
    }

    #[test]
    fn copy_file_non_regular_destination_fails() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        let dst = tmp_dir.path().join("dst.srt");
        std::fs::write(&src, "subtitle").unwrap();
        std::fs::create_dir(&dst).unwrap();

        assert!(matches!(
            copy_file(&src, &dst),
            Err(CopyFileError::NonRegularDestination { path, .. }) if path == dst
        ));
    }

    #[test]
    fn copy_file_missing_source_fails() {
        let tmp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            copy_file(
                &tmp_dir.path().join("missing.srt"),
                &tmp_dir.path().join("dst.srt")
            ),
            Err(CopyFileError::Io(_))
        ));
    }

    #[test]
    fn copy_file_contents_truncates_destination() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let src = tmp_dir.path().join("src.srt");
        let dst = tmp_dir.path().join("dst.srt");
        std::fs::write(&src, "short").unwrap();
        std::fs::write(&dst, "a much longer body").unwrap();

        copy_file_contents(&src, &dst).expect("copy failed");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "short");
    }
}
