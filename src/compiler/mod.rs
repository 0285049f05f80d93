//! Compiler abstraction.
//!
//! A [`Compiler`] describes one native toolchain: up to four role
//! executables (C, C++, Fortran 77, Fortran 90) sharing a linker, the
//! user flags for each flag category, and the environment the toolchain
//! needs to run. On top of that it answers capability questions ("which
//! flag enables C++17?"), discovers the directories the driver links
//! against implicitly, and checks that its executables can be run.
//!
//! Compilers are built from configuration records or detected packages
//! by [`CompilerFactory`].

use std::fmt;
use std::path::{Path, PathBuf};

mod environment;
mod error;
mod factory;
mod family;
mod flags;
mod probe;
mod spec;
mod verify;

pub use environment::{
    with_env_lock, EnvironmentActivator, EnvironmentGuard, EnvironmentMutation, ModuleEffect,
    ModuleLoader, ModuleVerb, ShellModuleLoader,
};
pub use error::CompilerError;
pub use factory::{
    CompilerEntry, CompilerFactory, DetectedAttributes, DetectedCompilers, DetectedExternal,
    DetectedPackage, DetectedPackages, RolePaths,
};
pub use family::{CompilerFamily, FlagProperty, FlagSupport};
pub use flags::{atoms_to_args, compose_value, tokenize_flags, FlagCategory, FlagSet, FlagValue};
pub use probe::{
    implicit_rpaths_from_output, parse_link_dirs, paths_containing_libs, ImplicitPathProber,
    RPathSet, COMMON_RPATH_LIBS, DEFAULT_PROBE_TIMEOUT, DUMMY_SOURCE,
};
pub use spec::{CompilerSpec, CompilerVersion};
pub use verify::ExecutableVerifier;

use crate::util::process::{CommandRunner, SystemRunner};

/// One of the executables of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Cc,
    Cxx,
    F77,
    Fc,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Cc, Role::Cxx, Role::F77, Role::Fc];

    /// Key used in configuration records.
    pub fn key(&self) -> &'static str {
        match self {
            Role::Cc => "cc",
            Role::Cxx => "cxx",
            Role::F77 => "f77",
            Role::Fc => "fc",
        }
    }

    /// Flag category holding this role's compile flags.
    pub fn compile_category(&self) -> FlagCategory {
        match self {
            Role::Cc => FlagCategory::Cflags,
            Role::Cxx => FlagCategory::Cxxflags,
            Role::F77 | Role::Fc => FlagCategory::Fflags,
        }
    }

    fn pic_property(&self) -> FlagProperty {
        match self {
            Role::Cc => FlagProperty::CcPic,
            Role::Cxx => FlagProperty::CxxPic,
            Role::F77 => FlagProperty::F77Pic,
            Role::Fc => FlagProperty::FcPic,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Role::Cc => "C",
            Role::Cxx => "C++",
            Role::F77 => "Fortran 77",
            Role::Fc => "Fortran 90",
        })
    }
}

/// A configured toolchain.
///
/// Identity (`spec`, `family`) is fixed at construction. Paths and flags
/// are public and may be changed before the compiler is used, e.g. to
/// disable a role.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiler {
    pub spec: CompilerSpec,
    pub family: CompilerFamily,
    pub operating_system: String,
    pub target: Option<String>,

    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub f77: Option<PathBuf>,
    pub fc: Option<PathBuf>,

    pub flags: FlagSet,
    pub environment: EnvironmentMutation,
    pub modules: Vec<String>,

    /// Rpaths added on top of the discovered ones
    pub extra_rpaths: Vec<PathBuf>,
    /// `Some(false)` turns off implicit rpath discovery
    pub implicit_rpaths: Option<bool>,
    /// Flag making the driver print its link line; defaults from the family
    pub verbose_flag: Option<String>,
}

impl Compiler {
    /// A compiler with no paths, flags or environment.
    pub fn new(spec: CompilerSpec, operating_system: impl Into<String>) -> Self {
        let family = CompilerFamily::from_name(&spec.name);
        Compiler {
            spec,
            family,
            operating_system: operating_system.into(),
            target: None,
            cc: None,
            cxx: None,
            f77: None,
            fc: None,
            flags: FlagSet::new(),
            environment: EnvironmentMutation::default(),
            modules: Vec::new(),
            extra_rpaths: Vec::new(),
            implicit_rpaths: None,
            verbose_flag: family.verbose_flag().map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn version(&self) -> &CompilerVersion {
        &self.spec.version
    }

    pub fn role_path(&self, role: Role) -> Option<&Path> {
        match role {
            Role::Cc => self.cc.as_deref(),
            Role::Cxx => self.cxx.as_deref(),
            Role::F77 => self.f77.as_deref(),
            Role::Fc => self.fc.as_deref(),
        }
    }

    pub fn set_role_path(&mut self, role: Role, path: Option<PathBuf>) {
        let slot = match role {
            Role::Cc => &mut self.cc,
            Role::Cxx => &mut self.cxx,
            Role::F77 => &mut self.f77,
            Role::Fc => &mut self.fc,
        };
        *slot = path;
    }

    /// Configured roles and their paths, in role order.
    pub fn role_paths(&self) -> impl Iterator<Item = (Role, &Path)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.role_path(role).map(|p| (role, p)))
    }

    /// The flag implementing `property` for this compiler.
    ///
    /// Fails with [`CompilerError::UnsupportedCompilerFlag`] when the
    /// family lacks the property or the version is too old for it,
    /// whatever flags the user configured.
    pub fn flag(&self, property: FlagProperty) -> Result<&'static str, CompilerError> {
        match self.family.flag(property, self.version()) {
            FlagSupport::Supported(flag) => Ok(flag),
            FlagSupport::Unsupported(reason) => Err(CompilerError::UnsupportedCompilerFlag {
                compiler: self.spec.to_string(),
                flag: property.as_str().to_string(),
                reason,
            }),
        }
    }

    pub fn openmp_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Openmp)
    }

    pub fn cxx98_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Cxx98)
    }

    pub fn cxx11_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Cxx11)
    }

    pub fn cxx14_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Cxx14)
    }

    pub fn cxx17_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Cxx17)
    }

    pub fn cxx20_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::Cxx20)
    }

    pub fn c99_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::C99)
    }

    pub fn c11_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::C11)
    }

    pub fn c17_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::C17)
    }

    pub fn c23_flag(&self) -> Result<&'static str, CompilerError> {
        self.flag(FlagProperty::C23)
    }

    /// Position-independent code flag for `role`.
    pub fn pic_flag(&self, role: Role) -> Result<&'static str, CompilerError> {
        self.flag(role.pic_property())
    }

    /// Flags that link the C++ standard library.
    pub fn stdcxx_libs(&self) -> Result<&'static [&'static str], CompilerError> {
        self.family
            .stdcxx_libs()
            .ok_or_else(|| CompilerError::UnsupportedCompilerFlag {
                compiler: self.spec.to_string(),
                flag: "stdcxx_libs".to_string(),
                reason: format!("not available for {}", self.family),
            })
    }

    pub fn required_libs(&self) -> &'static [&'static str] {
        self.family.required_libs()
    }

    pub fn debug_flags(&self) -> &'static [&'static str] {
        self.family.debug_flags()
    }

    pub fn opt_flags(&self) -> &'static [&'static str] {
        self.family.opt_flags()
    }

    /// Prefix passing an argument through the driver to the linker.
    pub fn linker_arg(&self) -> &'static str {
        self.family.linker_arg()
    }

    /// Command-line words for an invocation of `role`: its category flags
    /// expanded in category order.
    pub fn invocation_flags(&self, role: Role) -> Vec<String> {
        let atoms = self.flags.for_role(role);
        atoms_to_args(&atoms).map(str::to_string).collect()
    }

    pub(crate) fn implicit_rpaths_enabled(&self) -> bool {
        self.implicit_rpaths.unwrap_or(true)
    }

    /// Directories the toolchain links against implicitly, discovered by
    /// compiling a dummy program.
    pub fn implicit_rpaths(&self) -> Result<RPathSet, CompilerError> {
        self.implicit_rpaths_with(&SystemRunner, &ShellModuleLoader::default())
    }

    pub fn implicit_rpaths_with(
        &self,
        runner: &dyn CommandRunner,
        loader: &dyn ModuleLoader,
    ) -> Result<RPathSet, CompilerError> {
        ImplicitPathProber::new(runner, loader).probe(self)
    }

    /// Extra rpaths followed by the implicit ones, without duplicates.
    pub fn all_rpaths(&self) -> Result<Vec<PathBuf>, CompilerError> {
        self.all_rpaths_with(&SystemRunner, &ShellModuleLoader::default())
    }

    pub fn all_rpaths_with(
        &self,
        runner: &dyn CommandRunner,
        loader: &dyn ModuleLoader,
    ) -> Result<Vec<PathBuf>, CompilerError> {
        let implicit = self.implicit_rpaths_with(runner, loader)?;
        let mut all: Vec<PathBuf> = Vec::with_capacity(self.extra_rpaths.len() + implicit.len());
        for path in self.extra_rpaths.iter().chain(&implicit) {
            if !all.contains(path) {
                all.push(path.clone());
            }
        }
        Ok(all)
    }

    /// Check that every configured executable exists and can be run.
    pub fn verify_executables(&self) -> Result<(), CompilerError> {
        ExecutableVerifier.verify(self)
    }

    /// Activate this compiler's environment until the guard is dropped.
    pub fn compiler_environment(&self) -> Result<EnvironmentGuard, CompilerError> {
        self.compiler_environment_with(&ShellModuleLoader::default())
    }

    pub fn compiler_environment_with(
        &self,
        loader: &dyn ModuleLoader,
    ) -> Result<EnvironmentGuard, CompilerError> {
        let name = self.spec.to_string();
        EnvironmentActivator::new(&name, &self.environment, &self.modules).activate(loader)
    }

    /// The configuration record describing this compiler.
    pub fn to_entry(&self) -> CompilerEntry {
        CompilerEntry::from(self)
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}
