use crate::error::{DocError, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Read a file as a list of lines without line terminators
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DocError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Write content by way of a temporary file in the same directory that is
/// renamed over the target, so readers never observe a half-written file.
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| DocError::Io(e.error))?;
    Ok(())
}

/// Write lines joined with `\n`, terminated by a final newline
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    write_atomically(path, &content)
}

/// Run `edit` over the lines of `path` and replace the file only when the
/// edit changed something. Returns whether the file was rewritten.
pub fn rewrite_lines<F>(path: &Path, edit: F) -> Result<bool>
where
    F: FnOnce(&[String]) -> Result<Option<Vec<String>>>,
{
    let original = read_lines(path)?;
    match edit(&original)? {
        Some(updated) if updated != original => {
            write_lines(path, &updated)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component where possible.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Identity key for a file: symlinks resolved when the file exists,
/// lexical normalisation otherwise.
pub fn canonical_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
}

/// Resolve an include target against the directory of the including file
pub fn resolve_relative(including_file: &Path, target: &str) -> PathBuf {
    let dir = including_file.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(target))
}

/// Recursively collect `.adoc` files below `dir`, sorted
pub fn scan_adoc_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(DocError::NotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    scan_directory_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "adoc"
        {
            files.push(path);
        }
    }

    Ok(())
}
