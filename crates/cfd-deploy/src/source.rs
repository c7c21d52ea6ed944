//! Reading source directories and writing reconstructed files.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use cfd_types::FileRecord;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{DeployError, DeployResult};

/// Read every regular file under `root` as UTF-8 text.
///
/// Without `recursive`, only the top level is listed. Names are relative to
/// `root` with `/` separators, and the result is sorted by name. Symlinks are
/// not followed. Any failure, including a file that is not valid UTF-8,
/// aborts with [`DeployError::DirectoryRead`].
pub fn read_source_dir(root: &Path, recursive: bool) -> DeployResult<Vec<FileRecord>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            DeployError::DirectoryRead {
                path,
                source: io::Error::from(e),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = relative_name(root, entry.path());
        let text = fs::read_to_string(entry.path()).map_err(|source| DeployError::DirectoryRead {
            path: entry.path().to_path_buf(),
            source,
        })?;
        files.push(FileRecord::new(name, text));
    }

    // Walkdir sorts per directory; a global sort makes nested names line up
    // with the index order too.
    files.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(root = %root.display(), files = files.len(), "read source directory");
    Ok(files)
}

/// Write each file under `out_dir`, creating parent directories as needed.
///
/// Names must be relative and may not climb out of `out_dir`.
pub fn write_output_dir(out_dir: &Path, files: &[FileRecord]) -> DeployResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = output_path(out_dir, &file.name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DeployError::OutputWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, file.raw_content.as_bytes()).map_err(|source| {
            DeployError::OutputWrite {
                path: path.clone(),
                source,
            }
        })?;
        debug!(path = %path.display(), bytes = file.raw_content.len(), "wrote output file");
        written.push(path);
    }
    Ok(written)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn output_path(out_dir: &Path, name: &str) -> DeployResult<PathBuf> {
    let relative = Path::new(name);
    let safe = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(DeployError::OutputWrite {
            path: out_dir.join(name),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write outside the output directory: {name:?}"),
            ),
        });
    }
    Ok(out_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_top_level_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "console.log").unwrap();
        fs::write(dir.path().join("index.html"), "Hello World").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), "deep").unwrap();

        let files = read_source_dir(dir.path(), false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["index.html", "index.js"]);
        assert_eq!(files[0].raw_content, "Hello World");
    }

    #[test]
    fn recursive_uses_slash_separated_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b")).unwrap();
        fs::write(dir.path().join("a").join("b").join("c.txt"), "c").unwrap();
        fs::write(dir.path().join("z.txt"), "z").unwrap();

        let files = read_source_dir(dir.path(), true).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a/b/c.txt", "z.txt"]);
    }

    #[test]
    fn missing_directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source_dir(&dir.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, DeployError::DirectoryRead { .. }));
    }

    #[test]
    fn non_utf8_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00]).unwrap();
        let err = read_source_dir(dir.path(), false).unwrap_err();
        match err {
            DeployError::DirectoryRead { path, .. } => assert!(path.ends_with("bin.dat")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_directory_reads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_source_dir(dir.path(), true).unwrap().is_empty());
    }

    #[test]
    fn write_creates_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            FileRecord::new("a.txt", "Hello World"),
            FileRecord::new("sub/b.txt", "nested"),
        ];
        let written = write_output_dir(dir.path(), &files).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "Hello World");
        assert_eq!(
            fs::read_to_string(dir.path().join("sub").join("b.txt")).unwrap(),
            "nested"
        );
    }

    #[test]
    fn write_refuses_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../evil.txt", "/etc/passwd", "", "a/../../b"] {
            let err = write_output_dir(dir.path(), &[FileRecord::new(name, "x")]).unwrap_err();
            assert!(matches!(err, DeployError::OutputWrite { .. }), "{name}");
        }
    }

    #[test]
    fn read_then_write_reproduces_tree() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("css")).unwrap();
        fs::write(src.path().join("css").join("site.css"), "body{}").unwrap();
        fs::write(src.path().join("index.html"), "<html></html>").unwrap();

        let files = read_source_dir(src.path(), true).unwrap();
        let out = tempfile::tempdir().unwrap();
        write_output_dir(out.path(), &files).unwrap();

        assert_eq!(read_source_dir(out.path(), true).unwrap(), files);
    }
}
