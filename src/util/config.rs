//! Compiler configuration files.
//!
//! Compilers are declared in a `compilers.toml` file with one
//! `[[compiler]]` table per toolchain. Two locations are searched:
//! - Project: `.compilerkit/compilers.toml`
//! - Global: `~/.compilerkit/compilers.toml`
//!
//! The first file found is used; the files are not merged. An explicit
//! path overrides the search.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compiler::{Compiler, CompilerEntry, CompilerFactory};

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "compilers.toml";

/// Contents of a `compilers.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilersConfig {
    #[serde(rename = "compiler", default)]
    pub compilers: Vec<CompilerEntry>,
}

impl CompilersConfig {
    /// Load a compilers file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read compiler config: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse compiler config: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Build every configured compiler. The first invalid record is an
    /// error naming its position.
    pub fn compilers(&self) -> Result<Vec<Compiler>> {
        self.compilers
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                CompilerFactory::from_config_record(entry)
                    .with_context(|| format!("compiler entry #{} (`{}`)", i + 1, entry.spec))
            })
            .collect()
    }
}

/// Get the global compilerkit config directory (~/.compilerkit).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".compilerkit"))
}

/// Get the global compilers file path (~/.compilerkit/compilers.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Get the project compilers file path (.compilerkit/compilers.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".compilerkit").join(CONFIG_FILE_NAME)
}

/// Locate the compilers file to use.
///
/// `explicit` is returned as is, even if it does not exist, so that the
/// caller reports it. Otherwise the project file under `cwd` wins over
/// the global one.
pub fn find_config(cwd: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let project = project_config_path(cwd);
    if project.is_file() {
        return Some(project);
    }

    global_config_path().filter(|p| p.is_file())
}
