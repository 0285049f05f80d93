//! User-friendly diagnostic messages.
//!
//! Every error shown to a user carries the root cause, the context that
//! produced it, and what to try next.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a compiler path is wrong.
    pub const FIX_COMPILER_PATH: &str =
        "Point the role at an existing executable in compilers.toml";

    /// Suggestion when module loading fails.
    pub const CHECK_MODULES: &str =
        "Run `module load <name>` in a shell to check the module exists";

    /// Suggestion when a configuration record is malformed.
    pub const CHECK_CONFIG: &str =
        "Every [[compiler]] entry needs `spec` and `operating_system`";

    /// Suggestion when a spec string does not parse.
    pub const SPEC_SYNTAX: &str = "Write specs as <name>@<version>, e.g. gcc@13.2.0";

    /// Suggestion when no configuration file is found.
    pub const NO_CONFIG: &str =
        "Create .compilerkit/compilers.toml or pass --config <path>";

    /// Suggestion when a requested compiler is not configured.
    pub const UNKNOWN_COMPILER: &str = "Run `compilerkit list` to see configured compilers";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    /// Report the same problem at another severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

impl std::error::Error for Diagnostic {}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
