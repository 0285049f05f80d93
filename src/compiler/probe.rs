//! Implicit link directory discovery.
//!
//! A compiler driver adds its own runtime library directories to every
//! link. To find them we compile a trivial program with the verbose flag,
//! read the `-L` arguments off the printed link line, and keep the
//! directories that hold one of the compiler's runtime libraries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::environment::ModuleLoader;
use super::error::CompilerError;
use super::flags::{atoms_to_args, FlagCategory};
use super::{Compiler, Role};
use crate::util::fs::{dir_contains_any_library, normalize_path, write_string};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Directories that are searched by the loader anyway.
const SYSTEM_LINK_DIRS: &[&str] = &[
    "/lib",
    "/lib32",
    "/lib64",
    "/usr/lib",
    "/usr/lib32",
    "/usr/lib64",
    "/usr/local/lib",
    "/usr/local/lib64",
];

/// Libraries every toolchain may inject, in addition to family ones.
pub const COMMON_RPATH_LIBS: &[&str] = &["libc", "libc++", "libstdc++"];

/// Program compiled by the probe.
pub const DUMMY_SOURCE: &str =
    "int main(int argc, char* argv[]) { (void)argc; (void)argv; return 0; }\n";

/// How long the dummy compile may take.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Set of implicit link directories. Order carries no meaning.
pub type RPathSet = BTreeSet<PathBuf>;

static LINK_DIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `"-L/dir with space"`, `-L"/dir with space"` or `-L/dir`
    Regex::new(r#"(?:^|\s)(?:"-L([^"]+)"|-L"([^"]+)"|-L([^\s"]+))"#)
        .expect("link dir regex is valid")
});

/// Extract the distinct `-L` directories from verbose compiler output,
/// dropping the standard system directories.
///
/// Directories are normalized lexically first, so `/lib/../lib64` is
/// recognized as `/lib64`.
pub fn parse_link_dirs(output: &str) -> BTreeSet<PathBuf> {
    LINK_DIR_RE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| normalize_path(Path::new(m.as_str())))
        .filter(|dir| !is_system_dir(dir))
        .collect()
}

/// Whether `dir` is a system directory or a multiarch child of one
/// (`/usr/lib/x86_64-linux-gnu`).
fn is_system_dir(dir: &Path) -> bool {
    SYSTEM_LINK_DIRS.iter().any(|sys| {
        let sys = Path::new(sys);
        dir == sys
            || dir.parent() == Some(sys)
                && dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains("-linux-"))
    })
}

/// Keep the directories holding at least one of `libs`.
pub fn paths_containing_libs<'a, I>(dirs: I, libs: &[&str]) -> RPathSet
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    dirs.into_iter()
        .filter(|dir| dir.is_dir() && dir_contains_any_library(dir, libs))
        .cloned()
        .collect()
}

/// Runs the dummy compile for a compiler and interprets the result.
pub struct ImplicitPathProber<'a> {
    runner: &'a dyn CommandRunner,
    loader: &'a dyn ModuleLoader,
    timeout: Duration,
}

impl<'a> ImplicitPathProber<'a> {
    pub fn new(runner: &'a dyn CommandRunner, loader: &'a dyn ModuleLoader) -> Self {
        ImplicitPathProber {
            runner,
            loader,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The role used for probing: cc if configured, else cxx.
    pub fn probe_role(compiler: &Compiler) -> Option<(Role, &Path)> {
        [Role::Cc, Role::Cxx]
            .into_iter()
            .find_map(|role| compiler.role_path(role).map(|p| (role, p)))
    }

    /// Compile the dummy program in verbose mode and return what the
    /// compiler printed.
    ///
    /// Returns `Ok(None)` when the compiler has neither a C nor a C++ path,
    /// has no verbose flag, or could not be run at all. A nonzero exit
    /// still yields the captured text. Only environment activation errors
    /// are propagated.
    pub fn probe_output(&self, compiler: &Compiler) -> Result<Option<String>, CompilerError> {
        let Some((role, exe)) = Self::probe_role(compiler) else {
            tracing::debug!("{}: no C or C++ compiler to probe", compiler.spec);
            return Ok(None);
        };
        let Some(verbose_flag) = compiler.verbose_flag.as_deref() else {
            tracing::debug!("{}: no verbose flag, skipping probe", compiler.spec);
            return Ok(None);
        };

        let tmp = match tempfile::Builder::new()
            .prefix("compilerkit-implicit-link-info")
            .tempdir()
        {
            Ok(tmp) => tmp,
            Err(e) => {
                tracing::debug!("{}: cannot create probe directory: {}", compiler.spec, e);
                return Ok(None);
            }
        };

        let ext = if role == Role::Cc { "c" } else { "cc" };
        let source = tmp.path().join(format!("main.{}", ext));
        let output = tmp.path().join("output");
        if let Err(e) = write_string(&source, DUMMY_SOURCE) {
            tracing::debug!("{}: {:#}", compiler.spec, e);
            return Ok(None);
        }

        let mut cmd = ProcessBuilder::new(exe).timeout(self.timeout);
        for category in [role.compile_category(), FlagCategory::Cppflags, FlagCategory::Ldflags] {
            cmd = cmd.args(atoms_to_args(compiler.flags.get(category)));
        }
        let cmd = cmd.arg(verbose_flag).arg(&source).arg("-o").arg(&output);

        let _env = compiler.compiler_environment_with(self.loader)?;
        match self.runner.run(&cmd) {
            Ok(result) => {
                if !result.is_success() {
                    tracing::debug!(
                        "{}: `{}` exited with {:?}; parsing its output anyway",
                        compiler.spec,
                        cmd.display_command(),
                        result.code
                    );
                }
                Ok(Some(result.combined()))
            }
            Err(e) => {
                tracing::debug!("{}: probe failed: {:#}", compiler.spec, e);
                Ok(None)
            }
        }
    }

    /// Directories of the compiler's runtime libraries that the driver
    /// passes to the linker implicitly.
    pub fn probe(&self, compiler: &Compiler) -> Result<RPathSet, CompilerError> {
        if !compiler.implicit_rpaths_enabled() {
            return Ok(RPathSet::new());
        }
        let Some(output) = self.probe_output(compiler)? else {
            return Ok(RPathSet::new());
        };
        Ok(implicit_rpaths_from_output(compiler, &output))
    }
}

/// Interpret captured verbose output for `compiler`.
pub fn implicit_rpaths_from_output(compiler: &Compiler, output: &str) -> RPathSet {
    let link_dirs = parse_link_dirs(output);
    let libs: Vec<&str> = compiler
        .family
        .required_libs()
        .iter()
        .chain(COMMON_RPATH_LIBS)
        .copied()
        .collect();
    let rpaths = paths_containing_libs(&link_dirs, &libs);
    tracing::debug!(
        "{}: {} link dirs, {} implicit rpaths",
        compiler.spec,
        link_dirs.len(),
        rpaths.len()
    );
    rpaths
}
