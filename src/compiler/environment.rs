//! Scoped compiler environments.
//!
//! All reads and writes of the process environment made on behalf of a
//! compiler go through [`EnvironmentActivator`]. Activation takes a
//! process-wide lock, applies the compiler's variable changes and module
//! loads, and returns an [`EnvironmentGuard`] that restores the previous
//! environment when dropped, whether the scope ends normally or by error.
//!
//! Scopes may nest on one thread. Concurrent scopes on different threads
//! are serialized by the lock.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use super::error::CompilerError;
use crate::util::process::ProcessBuilder;

static ENV_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static ACTIVE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Environment changes a compiler needs when it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentMutation {
    /// Variables to set, overwriting existing values
    pub set: BTreeMap<String, String>,
    /// Variables to remove
    #[serde(deserialize_with = "deserialize_unset")]
    pub unset: Vec<String>,
    /// Path-like variables to prepend an entry to
    pub prepend_path: BTreeMap<String, String>,
    /// Path-like variables to append an entry to
    pub append_path: BTreeMap<String, String>,
}

impl EnvironmentMutation {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.prepend_path.is_empty()
            && self.append_path.is_empty()
    }

    /// Check that every name and value can be placed in the process
    /// environment.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self
            .set
            .iter()
            .chain(&self.prepend_path)
            .chain(&self.append_path)
        {
            check_variable(name, Some(value.as_str()))?;
        }
        for name in &self.unset {
            check_variable(name, None)?;
        }
        Ok(())
    }
}

/// Names must be non-empty and free of `=` and NUL; values free of NUL.
fn check_variable(name: &str, value: Option<&str>) -> Result<(), String> {
    if name.is_empty() {
        return Err("environment variable name is empty".to_string());
    }
    if name.contains(['=', '\0']) {
        return Err(format!(
            "invalid environment variable name `{}`",
            name.escape_debug()
        ));
    }
    if value.is_some_and(|v| v.contains('\0')) {
        return Err(format!("value of environment variable `{}` contains NUL", name));
    }
    Ok(())
}

/// `unset` may be written as a list of names or as a mapping whose keys
/// are the names.
fn deserialize_unset<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Unset {
        List(Vec<String>),
        Map(BTreeMap<String, IgnoredAny>),
    }

    Ok(match Unset::deserialize(deserializer)? {
        Unset::List(names) => names,
        Unset::Map(map) => map.into_keys().collect(),
    })
}

/// Verb passed to the module system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleVerb {
    Show,
    Load,
    Unload,
}

impl ModuleVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleVerb::Show => "show",
            ModuleVerb::Load => "load",
            ModuleVerb::Unload => "unload",
        }
    }
}

impl fmt::Display for ModuleVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a module command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleEffect {
    /// Text printed by the command
    pub output: String,
    /// Variables the command changed; `None` removes the variable
    pub changes: Vec<(String, Option<String>)>,
}

impl ModuleEffect {
    /// An effect that only sets variables.
    pub fn setting<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ModuleEffect {
            output: String::new(),
            changes: vars
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}

/// An external module system (Environment Modules, Lmod, ...).
///
/// Implementations report environment changes instead of applying them;
/// the activator applies them inside its scope.
pub trait ModuleLoader: Send + Sync {
    fn module(&self, verb: ModuleVerb, name: &str) -> Result<ModuleEffect>;
}

/// Runs the `module` shell function through a non-login `bash`.
///
/// The shell inherits this process's environment, including an exported
/// `module` function. The environment is dumped before and after the
/// command inside the same shell, so only what the module changed is
/// reported.
#[derive(Debug, Clone)]
pub struct ShellModuleLoader {
    shell: String,
}

impl Default for ShellModuleLoader {
    fn default() -> Self {
        ShellModuleLoader {
            shell: "bash".to_string(),
        }
    }
}

impl ShellModuleLoader {
    pub fn new(shell: impl Into<String>) -> Self {
        ShellModuleLoader {
            shell: shell.into(),
        }
    }
}

/// Separate module output from the environment dumps.
const ENV_BEFORE_MARKER: &str = "__COMPILERKIT_ENV_BEFORE__";
const ENV_AFTER_MARKER: &str = "__COMPILERKIT_ENV_AFTER__";

impl ModuleLoader for ShellModuleLoader {
    fn module(&self, verb: ModuleVerb, name: &str) -> Result<ModuleEffect> {
        let quoted = shell_quote(name);
        let script = match verb {
            ModuleVerb::Show => format!("module show {} 2>&1", quoted),
            ModuleVerb::Load | ModuleVerb::Unload => format!(
                "printf '{before}\\0'; env -0; module {verb} {name} >&2 || exit 1; \
                 printf '{after}\\0'; env -0",
                before = ENV_BEFORE_MARKER,
                after = ENV_AFTER_MARKER,
                verb = verb,
                name = quoted,
            ),
        };

        let output = ProcessBuilder::new(&self.shell)
            .args(["-c", script.as_str()])
            .exec()
            .with_context(|| format!("failed to run `module {} {}`", verb, name))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            bail!("`module {} {}` failed: {}", verb, name, stderr.trim());
        }

        match verb {
            ModuleVerb::Show => Ok(ModuleEffect {
                output: stdout,
                changes: Vec::new(),
            }),
            ModuleVerb::Load | ModuleVerb::Unload => {
                let dumps = stdout
                    .split_once(&format!("{}\0", ENV_BEFORE_MARKER))
                    .and_then(|(_, rest)| rest.split_once(&format!("{}\0", ENV_AFTER_MARKER)));
                let Some((before, after)) = dumps else {
                    bail!("`module {} {}` produced no environment dump", verb, name);
                };
                Ok(ModuleEffect {
                    output: stderr,
                    changes: environment_diff(before, after),
                })
            }
        }
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Variables every shell rewrites; never part of a module's effect.
const SHELL_VARS: [&str; 4] = ["_", "SHLVL", "PWD", "OLDPWD"];

/// Changes between two NUL-separated `env -0` dumps.
fn environment_diff(before: &str, after: &str) -> Vec<(String, Option<String>)> {
    let before = parse_env_dump(before);
    let after = parse_env_dump(after);

    let mut changes: Vec<(String, Option<String>)> = after
        .iter()
        .filter(|(k, v)| before.get(*k) != Some(*v))
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect();
    changes.extend(
        before
            .keys()
            .filter(|k| !after.contains_key(*k))
            .map(|k| (k.to_string(), None)),
    );
    changes.sort();
    changes
}

fn parse_env_dump(dump: &str) -> HashMap<&str, &str> {
    dump.split('\0')
        .filter_map(|entry| entry.split_once('='))
        .filter(|(k, _)| !k.is_empty() && !SHELL_VARS.contains(k))
        .collect()
}

/// Module names a `module show` listing declares as conflicting, in
/// either Tcl (`conflict gcc`) or Lua (`conflict("gcc")`) form.
fn module_conflicts(show_output: &str) -> Vec<String> {
    show_output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("conflict"))
        .filter(|rest| rest.starts_with(|c: char| c == '(' || c.is_whitespace()))
        .flat_map(|rest| {
            rest.split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '"' | '\''))
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies a compiler's environment for the duration of a scope.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentActivator<'a> {
    compiler: &'a str,
    mutation: &'a EnvironmentMutation,
    modules: &'a [String],
}

impl<'a> EnvironmentActivator<'a> {
    pub fn new(compiler: &'a str, mutation: &'a EnvironmentMutation, modules: &'a [String]) -> Self {
        EnvironmentActivator {
            compiler,
            mutation,
            modules,
        }
    }

    /// Enter the scope.
    ///
    /// Variables are changed in the order `set`, `unset`, `prepend_path`,
    /// `append_path`; modules are loaded afterwards. Before each load the
    /// module is shown and any module it conflicts with is unloaded. If a
    /// module command fails the environment is restored before the error
    /// is returned.
    pub fn activate(&self, loader: &dyn ModuleLoader) -> Result<EnvironmentGuard, CompilerError> {
        self.mutation.validate().map_err(|message| {
            CompilerError::invalid_config(format!("{}: {}", self.compiler, message))
        })?;

        let guard = EnvironmentGuard::enter();

        for (key, value) in &self.mutation.set {
            tracing::debug!("{}: set {}={}", self.compiler, key, value);
            std::env::set_var(key, value);
        }
        for key in &self.mutation.unset {
            tracing::debug!("{}: unset {}", self.compiler, key);
            std::env::remove_var(key);
        }
        for (key, entry) in &self.mutation.prepend_path {
            let value = join_path_entry(key, entry, true);
            std::env::set_var(key, value);
        }
        for (key, entry) in &self.mutation.append_path {
            let value = join_path_entry(key, entry, false);
            std::env::set_var(key, value);
        }

        for module in self.modules {
            let shown = self.run_module(loader, ModuleVerb::Show, module, module)?;
            for conflict in module_conflicts(&shown.output) {
                tracing::debug!("{}: module {} conflicts with {}", self.compiler, module, conflict);
                let effect = self.run_module(loader, ModuleVerb::Unload, &conflict, module)?;
                self.apply_effect(effect, module)?;
            }

            let effect = self.run_module(loader, ModuleVerb::Load, module, module)?;
            self.apply_effect(effect, module)?;
        }

        Ok(guard)
    }

    /// Run one module command on behalf of loading `module`.
    fn run_module(
        &self,
        loader: &dyn ModuleLoader,
        verb: ModuleVerb,
        name: &str,
        module: &str,
    ) -> Result<ModuleEffect, CompilerError> {
        tracing::debug!("{}: module {} {}", self.compiler, verb, name);
        loader
            .module(verb, name)
            .map_err(|e| self.module_error(module, format!("{:#}", e)))
    }

    fn apply_effect(&self, effect: ModuleEffect, module: &str) -> Result<(), CompilerError> {
        for (key, value) in &effect.changes {
            check_variable(key, value.as_deref())
                .map_err(|message| self.module_error(module, message))?;
        }
        for (key, value) in effect.changes {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
        Ok(())
    }

    fn module_error(&self, module: &str, message: String) -> CompilerError {
        CompilerError::ToolchainEnvironmentError {
            compiler: self.compiler.to_string(),
            module: module.to_string(),
            message,
        }
    }
}

fn join_path_entry(key: &str, entry: &str, prepend: bool) -> OsString {
    let mut paths: Vec<std::path::PathBuf> = std::env::var_os(key)
        .map(|current| std::env::split_paths(&current).collect())
        .unwrap_or_default();
    if prepend {
        paths.insert(0, entry.into());
    } else {
        paths.push(entry.into());
    }
    // Entries come from split_paths or config and cannot contain the separator
    // unless the user wrote one; fall back to the bare entry in that case.
    std::env::join_paths(paths).unwrap_or_else(|_| OsString::from(entry))
}

/// Restores the environment captured at activation when dropped.
pub struct EnvironmentGuard {
    snapshot: Vec<(OsString, OsString)>,
    _lock: Option<MutexGuard<'static, ()>>,
}

impl EnvironmentGuard {
    fn enter() -> Self {
        let lock = acquire_lock();
        EnvironmentGuard {
            snapshot: std::env::vars_os().collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        let before: HashMap<&OsString, &OsString> =
            self.snapshot.iter().map(|(k, v)| (k, v)).collect();

        for (key, _) in std::env::vars_os() {
            if !before.contains_key(&key) {
                std::env::remove_var(&key);
            }
        }
        for (key, value) in &self.snapshot {
            if std::env::var_os(key).as_ref() != Some(value) {
                std::env::set_var(key, value);
            }
        }

        release_lock();
    }
}

impl fmt::Debug for EnvironmentGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentGuard")
            .field("saved_vars", &self.snapshot.len())
            .finish()
    }
}

/// Take the process-wide lock unless this thread already holds it.
fn acquire_lock() -> Option<MutexGuard<'static, ()>> {
    let depth = ACTIVE_DEPTH.with(|d| {
        let depth = d.get();
        d.set(depth + 1);
        depth
    });
    if depth == 0 {
        Some(ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner))
    } else {
        None
    }
}

fn release_lock() {
    ACTIVE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
}

/// Run `f` while holding the environment lock.
///
/// For code that reads or writes environment variables outside an
/// activation and must not interleave with one, such as tests.
pub fn with_env_lock<R>(f: impl FnOnce() -> R) -> R {
    struct Release {
        _lock: Option<MutexGuard<'static, ()>>,
    }
    impl Drop for Release {
        fn drop(&mut self) {
            release_lock();
        }
    }
    let _release = Release {
        _lock: acquire_lock(),
    };
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockModuleLoader;

    fn mutation(set: &[(&str, &str)]) -> EnvironmentMutation {
        EnvironmentMutation {
            set: set
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_is_reverted_after_scope() {
        with_env_lock(|| {
            std::env::remove_var("COMPILERKIT_TEST_SET");
            let env = mutation(&[("COMPILERKIT_TEST_SET", "yes")]);
            let loader = MockModuleLoader::new();

            {
                let _guard = EnvironmentActivator::new("gcc@13.2.0", &env, &[])
                    .activate(&loader)
                    .unwrap();
                assert_eq!(std::env::var("COMPILERKIT_TEST_SET").unwrap(), "yes");
            }

            assert!(std::env::var_os("COMPILERKIT_TEST_SET").is_none());
        });
    }

    #[test]
    fn test_unset_and_overwrite_are_reverted() {
        with_env_lock(|| {
            std::env::set_var("COMPILERKIT_TEST_KEEP", "original");
            std::env::set_var("COMPILERKIT_TEST_DROP", "present");
            let env = EnvironmentMutation {
                set: [("COMPILERKIT_TEST_KEEP".to_string(), "changed".to_string())]
                    .into_iter()
                    .collect(),
                unset: vec!["COMPILERKIT_TEST_DROP".to_string()],
                ..Default::default()
            };
            let loader = MockModuleLoader::new();

            {
                let _guard = EnvironmentActivator::new("gcc@13.2.0", &env, &[])
                    .activate(&loader)
                    .unwrap();
                assert_eq!(std::env::var("COMPILERKIT_TEST_KEEP").unwrap(), "changed");
                assert!(std::env::var_os("COMPILERKIT_TEST_DROP").is_none());
            }

            assert_eq!(std::env::var("COMPILERKIT_TEST_KEEP").unwrap(), "original");
            assert_eq!(std::env::var("COMPILERKIT_TEST_DROP").unwrap(), "present");
            std::env::remove_var("COMPILERKIT_TEST_KEEP");
            std::env::remove_var("COMPILERKIT_TEST_DROP");
        });
    }

    #[test]
    fn test_prepend_and_append_path() {
        with_env_lock(|| {
            std::env::set_var("COMPILERKIT_TEST_PATH", "/usr/bin");
            let env = EnvironmentMutation {
                prepend_path: [("COMPILERKIT_TEST_PATH".to_string(), "/opt/gcc/bin".to_string())]
                    .into_iter()
                    .collect(),
                append_path: [("COMPILERKIT_TEST_PATH".to_string(), "/opt/extra/bin".to_string())]
                    .into_iter()
                    .collect(),
                ..Default::default()
            };
            let loader = MockModuleLoader::new();

            {
                let _guard = EnvironmentActivator::new("gcc@13.2.0", &env, &[])
                    .activate(&loader)
                    .unwrap();
                let value = std::env::var_os("COMPILERKIT_TEST_PATH").unwrap();
                let paths: Vec<_> = std::env::split_paths(&value).collect();
                assert_eq!(
                    paths,
                    vec![
                        std::path::PathBuf::from("/opt/gcc/bin"),
                        std::path::PathBuf::from("/usr/bin"),
                        std::path::PathBuf::from("/opt/extra/bin"),
                    ]
                );
            }

            assert_eq!(std::env::var("COMPILERKIT_TEST_PATH").unwrap(), "/usr/bin");
            std::env::remove_var("COMPILERKIT_TEST_PATH");
        });
    }

    #[test]
    fn test_module_changes_are_applied_and_reverted() {
        with_env_lock(|| {
            std::env::remove_var("COMPILERKIT_TEST_MODULE");
            let env = EnvironmentMutation::default();
            let modules = vec!["turn_on".to_string()];
            let loader = MockModuleLoader::new()
                .with_module("turn_on", ModuleEffect::setting([("COMPILERKIT_TEST_MODULE", "1")]));

            {
                let _guard = EnvironmentActivator::new("gcc@13.2.0", &env, &modules)
                    .activate(&loader)
                    .unwrap();
                assert_eq!(std::env::var("COMPILERKIT_TEST_MODULE").unwrap(), "1");
            }

            assert!(std::env::var_os("COMPILERKIT_TEST_MODULE").is_none());
            assert_eq!(
                loader.calls(),
                vec![
                    (ModuleVerb::Show, "turn_on".to_string()),
                    (ModuleVerb::Load, "turn_on".to_string()),
                ]
            );
        });
    }

    #[test]
    fn test_conflicting_modules_are_unloaded_first() {
        with_env_lock(|| {
            let env = EnvironmentMutation::default();
            let modules = vec!["gcc/13".to_string()];
            let effect = ModuleEffect {
                output: "module-whatis gcc 13\nconflict intel\nconflict(\"clang\", \"pgi\")\n\
                         conflicting-notes ignored\n"
                    .to_string(),
                changes: Vec::new(),
            };
            let loader = MockModuleLoader::new().with_module("gcc/13", effect);

            let _guard = EnvironmentActivator::new("gcc@13.2.0", &env, &modules)
                .activate(&loader)
                .unwrap();

            assert_eq!(
                loader.calls(),
                vec![
                    (ModuleVerb::Show, "gcc/13".to_string()),
                    (ModuleVerb::Unload, "intel".to_string()),
                    (ModuleVerb::Unload, "clang".to_string()),
                    (ModuleVerb::Unload, "pgi".to_string()),
                    (ModuleVerb::Load, "gcc/13".to_string()),
                ]
            );
        });
    }

    #[test]
    fn test_invalid_names_fail_instead_of_panicking() {
        with_env_lock(|| {
            let loader = MockModuleLoader::new();
            for env in [
                mutation(&[("", "x")]),
                mutation(&[("A=B", "1")]),
                mutation(&[("NUL_VALUE", "a\0b")]),
                EnvironmentMutation {
                    unset: vec!["BAD\0NAME".to_string()],
                    ..Default::default()
                },
            ] {
                let err = EnvironmentActivator::new("gcc@13.2.0", &env, &[])
                    .activate(&loader)
                    .unwrap_err();
                assert!(matches!(err, CompilerError::InvalidConfig { .. }), "{:?}", env);
            }

            let modules = vec!["broken".to_string()];
            let loader = MockModuleLoader::new()
                .with_module("broken", ModuleEffect::setting([("X=Y", "1")]));
            let err = EnvironmentActivator::new("gcc@13.2.0", &EnvironmentMutation::default(), &modules)
                .activate(&loader)
                .unwrap_err();
            assert!(matches!(
                err,
                CompilerError::ToolchainEnvironmentError { ref module, .. } if module == "broken"
            ));
            assert!(std::env::var_os("X").is_none());
        });
    }

    #[test]
    fn test_scopes_on_different_threads_are_serialized() {
        use std::sync::{mpsc, Arc};
        use std::thread;
        use std::time::Duration;

        let events = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();

        let holder = {
            let events = Arc::clone(&events);
            thread::spawn(move || {
                let env = mutation(&[("COMPILERKIT_TEST_THREAD_A", "1")]);
                let guard = EnvironmentActivator::new("a@1", &env, &[])
                    .activate(&MockModuleLoader::new())
                    .unwrap();
                entered_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
                events.lock().unwrap().push("a released");
                drop(guard);
            })
        };

        entered_rx.recv().unwrap();
        let env = mutation(&[("COMPILERKIT_TEST_THREAD_B", "1")]);
        let guard = EnvironmentActivator::new("b@1", &env, &[])
            .activate(&MockModuleLoader::new())
            .unwrap();
        events.lock().unwrap().push("b entered");
        let saw_a = std::env::var_os("COMPILERKIT_TEST_THREAD_A").is_some();
        let saw_b = std::env::var_os("COMPILERKIT_TEST_THREAD_B").is_some();
        drop(guard);
        holder.join().unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["a released", "b entered"]);
        assert!(!saw_a);
        assert!(saw_b);
    }

    #[test]
    fn test_module_failure_propagates_and_restores() {
        with_env_lock(|| {
            std::env::remove_var("COMPILERKIT_TEST_PARTIAL");
            let env = mutation(&[("COMPILERKIT_TEST_PARTIAL", "1")]);
            let modules = vec!["missing".to_string()];
            let loader = MockModuleLoader::new();

            let err = EnvironmentActivator::new("gcc@13.2.0", &env, &modules)
                .activate(&loader)
                .unwrap_err();

            assert!(matches!(
                err,
                CompilerError::ToolchainEnvironmentError { ref module, .. } if module == "missing"
            ));
            assert!(std::env::var_os("COMPILERKIT_TEST_PARTIAL").is_none());
        });
    }

    #[test]
    fn test_nested_scopes_do_not_deadlock() {
        with_env_lock(|| {
            std::env::remove_var("COMPILERKIT_TEST_OUTER");
            std::env::remove_var("COMPILERKIT_TEST_INNER");
            let outer = mutation(&[("COMPILERKIT_TEST_OUTER", "1")]);
            let inner = mutation(&[("COMPILERKIT_TEST_INNER", "1")]);
            let loader = MockModuleLoader::new();

            {
                let _outer = EnvironmentActivator::new("a@1", &outer, &[])
                    .activate(&loader)
                    .unwrap();
                {
                    let _inner = EnvironmentActivator::new("b@1", &inner, &[])
                        .activate(&loader)
                        .unwrap();
                    assert!(std::env::var_os("COMPILERKIT_TEST_OUTER").is_some());
                    assert!(std::env::var_os("COMPILERKIT_TEST_INNER").is_some());
                }
                assert!(std::env::var_os("COMPILERKIT_TEST_OUTER").is_some());
                assert!(std::env::var_os("COMPILERKIT_TEST_INNER").is_none());
            }

            assert!(std::env::var_os("COMPILERKIT_TEST_OUTER").is_none());
        });
    }

    #[test]
    fn test_unset_accepts_list_or_mapping() {
        let from_list: EnvironmentMutation =
            serde_json::from_str(r#"{"unset": ["CC", "CXX"]}"#).unwrap();
        assert_eq!(from_list.unset, vec!["CC", "CXX"]);

        let from_map: EnvironmentMutation =
            serde_json::from_str(r#"{"set": {"TEST": "yes"}, "unset": {"CC": null}}"#).unwrap();
        assert_eq!(from_map.unset, vec!["CC"]);
        assert_eq!(from_map.set.get("TEST").map(String::as_str), Some("yes"));
    }

    #[test]
    fn test_environment_diff() {
        let before = "PATH=/usr/bin:/bin\0HOME=/home/me\0GONE=1\0SHLVL=1\0_=/usr/bin/env\0";
        let after = "PATH=/opt/gcc/bin:/usr/bin:/bin\0HOME=/home/me\0LOADEDMODULES=gcc\0\
                     SHLVL=2\0_=/usr/bin/printf\0";

        assert_eq!(
            environment_diff(before, after),
            vec![
                ("GONE".to_string(), None),
                ("LOADEDMODULES".to_string(), Some("gcc".to_string())),
                ("PATH".to_string(), Some("/opt/gcc/bin:/usr/bin:/bin".to_string())),
            ]
        );
    }

    #[test]
    fn test_module_conflicts() {
        assert_eq!(module_conflicts("conflict gcc intel\n"), vec!["gcc", "intel"]);
        assert_eq!(module_conflicts("  conflict(\"gcc\")\n"), vec!["gcc"]);
        assert!(module_conflicts("conflicts_with_nothing\nprepend-path PATH /x\n").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_loader_ignores_login_profile() {
        with_env_lock(|| {
            let tmp = tempfile::TempDir::new().unwrap();
            std::fs::write(
                tmp.path().join(".bash_profile"),
                "PATH=/usr/bin:/bin\nexport COMPILERKIT_TEST_PROFILE=1\n",
            )
            .unwrap();

            let saved_home = std::env::var_os("HOME");
            let saved_path = std::env::var_os("PATH").unwrap_or_default();
            let mut path = OsString::from("/custom/bin:");
            path.push(&saved_path);
            std::env::set_var("HOME", tmp.path());
            std::env::set_var("PATH", &path);
            // An exported `module` function, as module systems install it.
            std::env::set_var(
                "BASH_FUNC_module%%",
                "() { if [ \"$1\" = load ]; then export COMPILERKIT_TEST_LOADED=\"$2\"; \
                 export PATH=\"/opt/$2/bin:$PATH\"; fi; }",
            );

            let env = EnvironmentMutation {
                prepend_path: [("PATH".to_string(), "/opt/gcc/bin".to_string())]
                    .into_iter()
                    .collect(),
                ..Default::default()
            };
            let modules = vec!["mod".to_string()];
            let result = EnvironmentActivator::new("gcc@13.2.0", &env, &modules)
                .activate(&ShellModuleLoader::default())
                .map(|_guard| {
                    (
                        std::env::var("PATH").unwrap_or_default(),
                        std::env::var("COMPILERKIT_TEST_LOADED").ok(),
                        std::env::var_os("COMPILERKIT_TEST_PROFILE"),
                    )
                });
            let restored_path = std::env::var_os("PATH");

            std::env::remove_var("BASH_FUNC_module%%");
            std::env::set_var("PATH", &saved_path);
            match saved_home {
                Some(home) => std::env::set_var("HOME", home),
                None => std::env::remove_var("HOME"),
            }

            let (scoped_path, loaded, profile) = result.unwrap();
            assert!(
                scoped_path.starts_with("/opt/mod/bin:/opt/gcc/bin:/custom/bin:"),
                "{}",
                scoped_path
            );
            assert_eq!(loaded.as_deref(), Some("mod"));
            assert!(profile.is_none());
            assert_eq!(restored_path, Some(path));
        });
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("gcc/13.2.0"), "'gcc/13.2.0'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
