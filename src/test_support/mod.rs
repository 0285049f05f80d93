//! Test utilities and mocks for compilerkit unit tests.
//!
//! This module provides stand-ins for the collaborators the compiler layer
//! talks to: a command runner that records invocations and returns canned
//! output, a module loader driven by a table, and filesystem fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use compilerkit::test_support::{mock_compiler, MockCommandRunner, MockModuleLoader};
//!
//! #[test]
//! fn test_example() {
//!     let runner = MockCommandRunner::with_handler(|_| CommandOutput::success("ld -L/opt/lib"));
//!     let loader = MockModuleLoader::new();
//!     let rpaths = mock_compiler().implicit_rpaths_with(&runner, &loader).unwrap();
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::compiler::{Compiler, CompilerSpec, ModuleEffect, ModuleLoader, ModuleVerb};
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};

pub use fixtures::*;

type Handler = dyn Fn(&ProcessBuilder) -> CommandOutput + Send + Sync;

/// Command runner that never spawns anything.
///
/// Every invocation is recorded as `(program, args)`. The output comes
/// from the handler, or is an empty success if there is none.
#[derive(Clone)]
pub struct MockCommandRunner {
    handler: Option<Arc<Handler>>,
    calls: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        MockCommandRunner {
            handler: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer each command with `handler(cmd)`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ProcessBuilder) -> CommandOutput + Send + Sync + 'static,
    {
        MockCommandRunner {
            handler: Some(Arc::new(handler)),
            ..MockCommandRunner::new()
        }
    }

    /// Commands run so far.
    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCommandRunner {
    fn default() -> Self {
        MockCommandRunner::new()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push((
            cmd.get_program().to_path_buf(),
            cmd.get_args().to_vec(),
        ));
        Ok(match &self.handler {
            Some(handler) => handler(cmd),
            None => CommandOutput::success(""),
        })
    }
}

/// Module loader backed by a table of known modules.
///
/// Showing or loading an unknown module fails, the way `module load`
/// does. `show` reports the module's output without its changes.
/// Unloading always succeeds and changes nothing.
#[derive(Debug, Clone, Default)]
pub struct MockModuleLoader {
    modules: HashMap<String, ModuleEffect>,
    calls: Arc<Mutex<Vec<(ModuleVerb, String)>>>,
}

impl MockModuleLoader {
    pub fn new() -> Self {
        MockModuleLoader::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, effect: ModuleEffect) -> Self {
        self.modules.insert(name.into(), effect);
        self
    }

    pub fn calls(&self) -> Vec<(ModuleVerb, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModuleLoader for MockModuleLoader {
    fn module(&self, verb: ModuleVerb, name: &str) -> Result<ModuleEffect> {
        self.calls.lock().unwrap().push((verb, name.to_string()));
        if verb == ModuleVerb::Unload {
            return Ok(ModuleEffect::default());
        }
        let Some(effect) = self.modules.get(name) else {
            bail!("Unable to locate a modulefile for '{}'", name);
        };
        Ok(match verb {
            ModuleVerb::Show => ModuleEffect {
                output: effect.output.clone(),
                changes: Vec::new(),
            },
            _ => effect.clone(),
        })
    }
}

/// A compiler of no known family with placeholder paths for every role.
///
/// Its verbose flag is `--verbose`; it supports none of the optional
/// flag properties.
pub fn mock_compiler() -> Compiler {
    let spec = CompilerSpec::parse("badcompiler@1.0.0").unwrap();
    let mut compiler = Compiler::new(spec, "debian6");
    compiler.target = Some("x86_64".to_string());
    compiler.cc = Some("cc-path".into());
    compiler.cxx = Some("cxx-path".into());
    compiler.f77 = Some("f77-path".into());
    compiler.fc = Some("fc-path".into());
    compiler.verbose_flag = Some("--verbose".to_string());
    compiler
}
