//! Compiler identity: `name@version` specs and lenient versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::CompilerError;

/// A compiler version such as `13.2.0`, `2021.1` or `13.2.0-suffix`.
///
/// Only the leading dotted numeric part takes part in ordering; the raw
/// string is kept for display and equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerVersion {
    raw: String,
    numbers: Vec<u64>,
}

impl CompilerVersion {
    pub fn parse(raw: &str) -> Result<Self, CompilerError> {
        let raw = raw.trim();
        let numbers = leading_numbers(raw);
        if numbers.is_empty() {
            return Err(CompilerError::InvalidSpec {
                spec: raw.to_string(),
                reason: "version must start with a number".to_string(),
            });
        }
        Ok(CompilerVersion {
            raw: raw.to_string(),
            numbers,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The numeric components used for ordering.
    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    /// Whether this version is at least `min` (missing components count as zero).
    pub fn at_least(&self, min: &[u64]) -> bool {
        compare_numbers(&self.numbers, min) != Ordering::Less
    }
}

/// Numeric prefix of a dotted version: `13.2.0-suffix` gives `[13, 2, 0]`.
fn leading_numbers(raw: &str) -> Vec<u64> {
    let mut numbers = Vec::new();
    for part in raw.split('.') {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        let Ok(n) = digits.parse::<u64>() else {
            break;
        };
        numbers.push(n);
        if digits.len() != part.len() {
            break;
        }
    }
    numbers
}

fn compare_numbers(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Render a version threshold like `[4, 3]` as `4.3`.
pub(crate) fn format_numbers(numbers: &[u64]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

impl PartialOrd for CompilerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompilerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_numbers(&self.numbers, &other.numbers).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compiler identity, written `name@version`.
///
/// An `=` after the `@` (`gcc@=13.2.0`) marks an exact version and is
/// accepted and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerSpec {
    pub name: String,
    pub version: CompilerVersion,
}

impl CompilerSpec {
    pub fn new(name: impl Into<String>, version: CompilerVersion) -> Self {
        CompilerSpec {
            name: name.into(),
            version,
        }
    }

    pub fn parse(spec: &str) -> Result<Self, CompilerError> {
        let invalid = |reason: &str| CompilerError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (name, version) = spec
            .trim()
            .split_once('@')
            .ok_or_else(|| invalid("missing `@<version>`"))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("missing compiler name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("compiler names may only contain letters, digits, `-` and `_`"));
        }

        // Detected package specs may carry variants after the version.
        let version = version.trim_start_matches('=');
        let version = version
            .split(|c: char| c.is_whitespace() || matches!(c, '+' | '~' | '%' | '^'))
            .next()
            .unwrap_or_default();
        if version.is_empty() {
            return Err(invalid("missing version after `@`"));
        }

        let version = CompilerVersion::parse(version).map_err(|_| invalid("version must start with a number"))?;
        Ok(CompilerSpec::new(name, version))
    }

    /// Whether `query` selects this compiler: either the bare name or the
    /// full `name@version`.
    pub fn matches(&self, query: &str) -> bool {
        match CompilerSpec::parse(query) {
            Ok(other) => other == *self,
            Err(_) => query.trim() == self.name,
        }
    }
}

impl FromStr for CompilerSpec {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompilerSpec::parse(s)
    }
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
