//! Building compilers from configuration records and detected packages.
//!
//! Construction is a pure transformation: nothing here touches the
//! filesystem or runs a process.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::environment::EnvironmentMutation;
use super::error::CompilerError;
use super::flags::{FlagSet, FlagValue};
use super::spec::CompilerSpec;
use super::{Compiler, Role};
use crate::util::host::HostArch;

/// Executable paths of a configuration record, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePaths {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub f77: Option<PathBuf>,
    pub fc: Option<PathBuf>,
}

/// A compiler configuration record.
///
/// ```toml
/// [[compiler]]
/// spec = "gcc@13.2.0"
/// operating_system = "ubuntu22.04"
/// paths = { cc = "/usr/bin/gcc", cxx = "/usr/bin/g++" }
/// flags = { cflags = "-O2 -g" }
/// modules = ["gcc/13.2.0"]
/// environment = { set = { GCC_HOME = "/opt/gcc" } }
/// ```
///
/// A record produced by [`Compiler::to_entry`] holds the canonical spec:
/// an exact-version `gcc@=13.2.0` is written back as `gcc@13.2.0`, which
/// selects the same compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerEntry {
    pub spec: String,
    pub operating_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub paths: RolePaths,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, Option<FlagValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentMutation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_rpaths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_rpaths: Option<bool>,
}

impl From<&Compiler> for CompilerEntry {
    fn from(compiler: &Compiler) -> Self {
        CompilerEntry {
            spec: compiler.spec.to_string(),
            operating_system: compiler.operating_system.clone(),
            target: compiler.target.clone(),
            paths: RolePaths {
                cc: compiler.cc.clone(),
                cxx: compiler.cxx.clone(),
                f77: compiler.f77.clone(),
                fc: compiler.fc.clone(),
            },
            flags: compiler.flags.to_config(),
            modules: (!compiler.modules.is_empty()).then(|| compiler.modules.clone()),
            environment: (!compiler.environment.is_empty()).then(|| compiler.environment.clone()),
            extra_rpaths: compiler.extra_rpaths.clone(),
            implicit_rpaths: compiler.implicit_rpaths,
        }
    }
}

/// Detected external packages, keyed by package name.
///
/// ```json
/// {"gcc": {"externals": [{"spec": "gcc@13.2.0 languages=c,c++",
///   "prefix": "/usr",
///   "extra_attributes": {"compilers": {"c": "/usr/bin/gcc", "cxx": "/usr/bin/g++"}}}]}}
/// ```
pub type DetectedPackages = BTreeMap<String, DetectedPackage>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPackage {
    #[serde(default)]
    pub externals: Vec<DetectedExternal>,
}

/// One installation found on the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedExternal {
    pub spec: String,
    #[serde(default)]
    pub prefix: Option<PathBuf>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub extra_attributes: DetectedAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedAttributes {
    pub compilers: DetectedCompilers,
    pub flags: BTreeMap<String, Option<FlagValue>>,
    pub environment: Option<EnvironmentMutation>,
    pub extra_rpaths: Vec<PathBuf>,
}

/// Compiler executables of a detected package, keyed by language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedCompilers {
    pub c: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub fortran: Option<PathBuf>,
}

/// Turns configuration data into [`Compiler`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerFactory;

impl CompilerFactory {
    /// Build a compiler from a configuration record.
    ///
    /// `spec` must parse, `operating_system` must be non-empty and every
    /// environment variable name must be settable. Absent flags, modules
    /// and environment default to empty.
    pub fn from_config_record(entry: &CompilerEntry) -> Result<Compiler, CompilerError> {
        let spec = CompilerSpec::parse(&entry.spec)?;
        if entry.operating_system.trim().is_empty() {
            return Err(CompilerError::invalid_config(format!(
                "{}: `operating_system` must not be empty",
                spec
            )));
        }

        let mut compiler = Compiler::new(spec, entry.operating_system.trim());
        compiler.target = entry.target.clone();
        for (role, path) in [
            (Role::Cc, &entry.paths.cc),
            (Role::Cxx, &entry.paths.cxx),
            (Role::F77, &entry.paths.f77),
            (Role::Fc, &entry.paths.fc),
        ] {
            compiler.set_role_path(role, path.clone());
        }
        compiler.flags = FlagSet::from_config(&entry.flags).map_err(|e| match e {
            CompilerError::InvalidConfig { message } => {
                CompilerError::invalid_config(format!("{}: {}", compiler.spec, message))
            }
            other => other,
        })?;
        compiler.modules = entry.modules.clone().unwrap_or_default();
        compiler.environment = entry.environment.clone().unwrap_or_default();
        compiler.environment.validate().map_err(|message| {
            CompilerError::invalid_config(format!("{}: environment: {}", compiler.spec, message))
        })?;
        compiler.extra_rpaths = entry.extra_rpaths.clone();
        compiler.implicit_rpaths = entry.implicit_rpaths;

        Ok(compiler)
    }

    /// Build a compiler from any serde value holding a record, optionally
    /// wrapped as `{"compiler": {...}}`.
    pub fn from_value(value: serde_json::Value) -> Result<Compiler, CompilerError> {
        let value = match value {
            serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("compiler") => {
                map.remove("compiler").unwrap_or_default()
            }
            other => other,
        };
        let entry: CompilerEntry = serde_json::from_value(value)
            .map_err(|e| CompilerError::invalid_config(e.to_string()))?;
        Self::from_config_record(&entry)
    }

    /// Compilers for detected packages.
    ///
    /// Installations without a C compiler are dropped, as are those whose
    /// spec does not parse. The `fortran` executable fills both Fortran
    /// roles. OS and target come from `host`.
    pub fn from_detected_packages(packages: &DetectedPackages, host: &HostArch) -> Vec<Compiler> {
        let mut compilers = Vec::new();

        for (package, detected) in packages {
            for external in &detected.externals {
                let spec = match CompilerSpec::parse(&external.spec) {
                    Ok(spec) => spec,
                    Err(e) => {
                        tracing::warn!("skipping detected {}: {}", package, e);
                        continue;
                    }
                };
                let paths = &external.extra_attributes.compilers;
                let Some(cc) = paths.c.clone() else {
                    tracing::warn!("skipping detected {}: no C compiler", spec);
                    continue;
                };

                let mut compiler = Compiler::new(spec, host.operating_system.clone());
                compiler.target = Some(host.target.clone());
                compiler.cc = Some(cc);
                compiler.cxx = paths.cxx.clone();
                compiler.f77 = paths.fortran.clone();
                compiler.fc = paths.fortran.clone();
                compiler.modules = external.modules.clone();
                compiler.environment = external
                    .extra_attributes
                    .environment
                    .clone()
                    .unwrap_or_default();
                if let Err(message) = compiler.environment.validate() {
                    tracing::warn!("skipping detected {}: {}", compiler.spec, message);
                    continue;
                }
                compiler.extra_rpaths = external.extra_attributes.extra_rpaths.clone();
                match FlagSet::from_config(&external.extra_attributes.flags) {
                    Ok(flags) => compiler.flags = flags,
                    Err(e) => {
                        tracing::warn!("skipping detected {}: {}", compiler.spec, e);
                        continue;
                    }
                }

                tracing::debug!("detected {} ({})", compiler.spec, package);
                compilers.push(compiler);
            }
        }

        compilers
    }

    /// Like [`CompilerFactory::from_detected_packages`] for an untyped
    /// value, optionally wrapped as `{"packages": {...}}`.
    pub fn from_packages_value(
        value: serde_json::Value,
        host: &HostArch,
    ) -> Result<Vec<Compiler>, CompilerError> {
        let value = match value {
            serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("packages") => {
                map.remove("packages").unwrap_or_default()
            }
            other => other,
        };
        let packages: DetectedPackages = serde_json::from_value(value)
            .map_err(|e| CompilerError::invalid_config(format!("detected packages: {}", e)))?;
        Ok(Self::from_detected_packages(&packages, host))
    }
}
