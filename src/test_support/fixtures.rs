//! Filesystem fixtures for compiler tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::util::fs::{set_executable, write_string};

/// Write an executable script `name` into `dir`.
pub fn fake_executable(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    write_string(&path, content).unwrap();
    set_executable(&path).unwrap();
    path
}

/// Library files placed by [`dirs_with_libfiles`], by directory.
const LIBFILES: &[(&str, &[&str])] = &[
    ("gcc/lib", &["libgcc.so", "libstdc++.so.6"]),
    ("gcc/lib64", &["libgfortran.so.5.0.0"]),
    ("llvm/lib", &["libc++.dylib"]),
    ("other/lib", &["libunrelated.so", "libstdc++-notes.txt"]),
    ("empty/lib", &[]),
];

/// A scratch tree of library directories.
///
/// The tree is removed when the fixture is dropped.
pub struct LibDirsFixture {
    root: TempDir,
    /// Every directory of the tree, in creation order
    pub all_dirs: Vec<PathBuf>,
    by_lib: BTreeMap<String, Vec<PathBuf>>,
}

impl LibDirsFixture {
    /// Absolute path of a directory of the tree, e.g. `gcc/lib`.
    pub fn dir(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Directories holding a file of library `lib`.
    pub fn dirs_for(&self, lib: &str) -> Vec<PathBuf> {
        self.by_lib.get(lib).cloned().unwrap_or_default()
    }
}

/// Create directories populated with fake runtime libraries.
pub fn dirs_with_libfiles() -> LibDirsFixture {
    let root = TempDir::new().unwrap();
    let mut all_dirs = Vec::new();
    let mut by_lib: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for (rel, files) in LIBFILES {
        let dir = root.path().join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        for file in *files {
            std::fs::write(dir.join(file), "").unwrap();
            if let Some((lib, _)) = file.split_once('.') {
                if lib.starts_with("lib") && !file.ends_with(".txt") {
                    by_lib.entry(lib.to_string()).or_default().push(dir.clone());
                }
            }
        }
        all_dirs.push(dir);
    }

    LibDirsFixture {
        root,
        all_dirs,
        by_lib,
    }
}
