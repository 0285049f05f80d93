//! compilerkit - a model of native compiler toolchains
//!
//! This crate describes C, C++ and Fortran toolchains: it composes their
//! flags from configuration, discovers the library directories a driver
//! links against implicitly, scopes the environment a toolchain needs, and
//! verifies that its executables can be run.

pub mod compiler;
pub mod util;

/// Test utilities and mocks for compilerkit unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for process execution
/// and module loading, plus filesystem fixtures.
#[cfg(test)]
pub mod test_support;

pub use compiler::{
    Compiler, CompilerError, CompilerFactory, CompilerFamily, CompilerSpec, FlagCategory,
    FlagSet, Role,
};
pub use util::config::CompilersConfig;
