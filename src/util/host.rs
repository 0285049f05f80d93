//! Host operating system and target tags.

use std::fmt;
use std::path::Path;

/// Operating-system and target tags for the running machine.
///
/// Used to stamp detected compilers, which carry no architecture of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostArch {
    /// Operating system tag, e.g. `ubuntu22.04`
    pub operating_system: String,
    /// Target tag, e.g. `x86_64`
    pub target: String,
}

impl HostArch {
    pub fn new(operating_system: impl Into<String>, target: impl Into<String>) -> Self {
        HostArch {
            operating_system: operating_system.into(),
            target: target.into(),
        }
    }

    /// Detect the host.
    ///
    /// On Linux the OS tag is built from `/etc/os-release` (`ID` followed by
    /// `VERSION_ID`); elsewhere, or if that file is unreadable, Rust's OS
    /// name is used.
    pub fn detect() -> Self {
        let os = std::env::consts::OS;
        let operating_system = if os == "linux" {
            std::fs::read_to_string(Path::new("/etc/os-release"))
                .ok()
                .and_then(|contents| os_tag_from_release(&contents))
                .unwrap_or_else(|| os.to_string())
        } else {
            os.to_string()
        };

        HostArch::new(operating_system, std::env::consts::ARCH)
    }
}

impl fmt::Display for HostArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.operating_system, self.target)
    }
}

/// Build an OS tag from the contents of an `os-release` file.
pub fn os_tag_from_release(contents: &str) -> Option<String> {
    let mut id = None;
    let mut version = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim() {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version = Some(value.to_string()),
            _ => {}
        }
    }

    let id = id.filter(|s| !s.is_empty())?;
    Some(format!("{}{}", id, version.unwrap_or_default()))
}
