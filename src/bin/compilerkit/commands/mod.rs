//! Command implementations

pub mod flags;
pub mod list;
pub mod rpaths;
pub mod show;
pub mod verify;

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use compilerkit::util::config::find_config;
use compilerkit::util::diagnostic::suggestions;
use compilerkit::{Compiler, CompilerError, CompilersConfig};

/// Load every compiler from the compilers file in effect.
pub fn load_compilers(explicit: Option<&Path>) -> Result<Vec<Compiler>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let path = find_config(&cwd, explicit).ok_or_else(|| {
        anyhow!(
            "no compilers file found\n\
             help: {}",
            suggestions::NO_CONFIG
        )
    })?;
    tracing::debug!("using compilers from {}", path.display());

    CompilersConfig::load(&path)?
        .compilers()
        .map_err(|err| match err.downcast_ref::<CompilerError>() {
            // Point at the file and entry the bad record came from.
            Some(compiler_err) => compiler_err
                .to_diagnostic()
                .with_location(&path)
                .with_context(err.to_string())
                .into(),
            None => err,
        })
}

/// Pick the compiler selected by `query` (a name or `name@version`).
///
/// When several compilers share a name, the first configured one wins.
pub fn select(compilers: Vec<Compiler>, query: &str) -> Result<Compiler> {
    let mut matching = compilers.into_iter().filter(|c| c.spec.matches(query));
    let first = matching.next().ok_or_else(|| {
        anyhow!(
            "compiler `{}` not found\n\
             help: {}",
            query,
            suggestions::UNKNOWN_COMPILER
        )
    })?;

    let others = matching.count();
    if others > 0 {
        tracing::info!("`{}` matches {} compilers, using {}", query, others + 1, first.spec);
    }
    Ok(first)
}
