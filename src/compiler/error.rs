//! Compiler error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use super::Role;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error raised by compiler operations.
///
/// Probe failures are deliberately absent: a dummy compile that fails is
/// reported as "no result", never as an error.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CompilerError {
    /// The compiler family does not provide the requested flag.
    #[error("{compiler} does not support the {flag} flag: {reason}")]
    #[diagnostic(
        code(compilerkit::compiler::unsupported_flag),
        help("Use a newer compiler version or a different compiler family")
    )]
    UnsupportedCompilerFlag {
        compiler: String,
        flag: String,
        reason: String,
    },

    /// A configured executable is missing or not executable.
    #[error("{role} compiler of {compiler} is not accessible: {}", .path.display())]
    #[diagnostic(
        code(compilerkit::compiler::access),
        help("Fix the path in the compiler configuration or set the role to null")
    )]
    CompilerAccessError {
        compiler: String,
        role: Role,
        path: PathBuf,
    },

    /// Loading an environment module for the compiler failed.
    #[error("failed to load module `{module}` for {compiler}: {message}")]
    #[diagnostic(code(compilerkit::compiler::environment))]
    ToolchainEnvironmentError {
        compiler: String,
        module: String,
        message: String,
    },

    /// A configuration record is malformed.
    #[error("invalid compiler configuration: {message}")]
    #[diagnostic(code(compilerkit::config::invalid))]
    InvalidConfig { message: String },

    /// A compiler spec string could not be parsed.
    #[error("invalid compiler spec `{spec}`: {reason}")]
    #[diagnostic(
        code(compilerkit::config::invalid_spec),
        help("Compiler specs look like `gcc@13.2.0` or `clang@=17.0.6`")
    )]
    InvalidSpec { spec: String, reason: String },
}

impl CompilerError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        CompilerError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompilerError::UnsupportedCompilerFlag {
                compiler,
                flag,
                reason,
            } => Diagnostic::error(format!("{} does not support the {} flag", compiler, flag))
                .with_context(reason.clone())
                .with_suggestion(format!(
                    "Check `compilerkit flags {} <flag>` for other flags",
                    compiler
                )),

            CompilerError::CompilerAccessError {
                compiler,
                role,
                path,
            } => Diagnostic::error(format!(
                "{} compiler of {} is not accessible",
                role, compiler
            ))
            .with_context(format!("`{}` does not exist or is not executable", path.display()))
            .with_suggestion(suggestions::FIX_COMPILER_PATH)
            .with_suggestion(format!(
                "Set `{}` to null if {} has no {} compiler",
                role.key(),
                compiler,
                role
            )),

            CompilerError::ToolchainEnvironmentError {
                compiler,
                module,
                message,
            } => Diagnostic::error(format!("could not set up the environment of {}", compiler))
                .with_context(format!("module `{}`: {}", module, message))
                .with_suggestion(suggestions::CHECK_MODULES),

            CompilerError::InvalidConfig { message } => {
                Diagnostic::error("invalid compiler configuration")
                    .with_context(message.clone())
                    .with_suggestion(suggestions::CHECK_CONFIG)
            }

            CompilerError::InvalidSpec { spec, reason } => {
                Diagnostic::error(format!("invalid compiler spec `{}`", spec))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::SPEC_SYNTAX)
            }
        }
    }
}
