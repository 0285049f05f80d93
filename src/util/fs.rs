//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::{glob, Pattern};

use crate::util::process::find_executable;

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Resolve a configured executable to a concrete path the current user
/// may run.
///
/// Bare names (no directory component) are looked up in `PATH`, since
/// configurations routinely store `gcc` rather than `/usr/bin/gcc`. Paths
/// are checked with the same access test `which` applies to `PATH`
/// entries, so a file whose only execute bits belong to another user is
/// rejected.
pub fn resolve_executable(path: &Path) -> Option<PathBuf> {
    find_executable(path).filter(|resolved| resolved.is_file())
}

/// Whether `path` names a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    resolve_executable(path).is_some()
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// A trailing separator is dropped. `..` at the root stays at the root;
/// leading `..` of a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

/// Mark a file as executable (no-op on non-Unix platforms).
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Whether `file_name` is a shared or static library file for `lib`.
///
/// `lib` is a base name such as `libgfortran`. Accepted forms are
/// `libgfortran.so`, `libgfortran.so.5.0.0`, `libgfortran.a`,
/// `libgfortran.dylib` and `libgfortran.dll`.
pub fn is_library_file(file_name: &str, lib: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix(lib)
        .and_then(|r| r.strip_prefix('.'))
    else {
        return false;
    };

    match rest {
        "so" | "a" | "dylib" | "dll" => true,
        _ => rest.strip_prefix("so.").is_some_and(is_soversion),
    }
}

fn is_soversion(s: &str) -> bool {
    s.split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether `dir` holds a library file for any of `libs`.
pub fn dir_contains_any_library(dir: &Path, libs: &[&str]) -> bool {
    let escaped = Pattern::escape(&dir.to_string_lossy());

    libs.iter().any(|lib| {
        let pattern = format!("{}/{}.*", escaped, Pattern::escape(lib));
        let Ok(entries) = glob(&pattern) else {
            return false;
        };
        entries.filter_map(|e| e.ok()).any(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| is_library_file(name, lib))
        })
    })
}
