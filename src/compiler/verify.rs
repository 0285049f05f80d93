//! Executable verification.

use super::error::CompilerError;
use super::Compiler;
use crate::util::fs::is_executable;

/// Checks that every configured role of a compiler can be executed.
///
/// Roles without a path are skipped. Verification only reads the
/// filesystem and never touches the compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableVerifier;

impl ExecutableVerifier {
    /// Fail with [`CompilerError::CompilerAccessError`] on the first role
    /// whose path is missing or not executable, in the order cc, cxx, f77, fc.
    pub fn verify(&self, compiler: &Compiler) -> Result<(), CompilerError> {
        for (role, path) in compiler.role_paths() {
            if !is_executable(path) {
                tracing::debug!(
                    "{}: {} compiler `{}` is not executable",
                    compiler.spec,
                    role,
                    path.display()
                );
                return Err(CompilerError::CompilerAccessError {
                    compiler: compiler.spec.to_string(),
                    role,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}
