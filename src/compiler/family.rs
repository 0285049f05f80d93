//! Compiler families and their capability tables.
//!
//! A family is a closed set of known vendors. Each carries fixed
//! attributes (verbose flag, runtime libraries) and a table mapping flag
//! properties to version-gated flag strings.

use std::fmt;
use std::str::FromStr;

use super::spec::{format_numbers, CompilerVersion};

macro_rules! gates {
    ($($since:expr => $flag:expr),* $(,)?) => {
        &[$(Gate { since: &$since, flag: $flag }),*]
    };
}

/// The vendor family of a compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerFamily {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Intel classic compilers (icc, icpc, ifort)
    Intel,
    /// Intel oneAPI compilers (icx, icpx, ifx)
    Oneapi,
    /// NVIDIA HPC SDK
    Nvhpc,
    /// Any other compiler; supports only the most basic flags
    Generic,
}

impl CompilerFamily {
    pub const ALL: [CompilerFamily; 7] = [
        CompilerFamily::Gcc,
        CompilerFamily::Clang,
        CompilerFamily::AppleClang,
        CompilerFamily::Intel,
        CompilerFamily::Oneapi,
        CompilerFamily::Nvhpc,
        CompilerFamily::Generic,
    ];

    /// Family for a compiler or package name. Unknown names map to
    /// [`CompilerFamily::Generic`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "gcc" => CompilerFamily::Gcc,
            "clang" | "llvm" => CompilerFamily::Clang,
            "apple-clang" => CompilerFamily::AppleClang,
            "intel" => CompilerFamily::Intel,
            "oneapi" | "intel-oneapi-compilers" => CompilerFamily::Oneapi,
            "nvhpc" => CompilerFamily::Nvhpc,
            _ => CompilerFamily::Generic,
        }
    }

    /// Get the family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Intel => "intel",
            CompilerFamily::Oneapi => "oneapi",
            CompilerFamily::Nvhpc => "nvhpc",
            CompilerFamily::Generic => "generic",
        }
    }

    /// Flag that makes the driver print its link line.
    pub fn verbose_flag(&self) -> Option<&'static str> {
        match self {
            CompilerFamily::Generic => None,
            _ => Some("-v"),
        }
    }

    /// Runtime libraries whose directories become implicit rpaths.
    pub fn required_libs(&self) -> &'static [&'static str] {
        match self {
            CompilerFamily::Gcc => &["libgcc", "libgfortran"],
            CompilerFamily::Clang | CompilerFamily::AppleClang => &["libclang"],
            CompilerFamily::Intel => &["libirc", "libifcore", "libifcoremt", "libirng"],
            CompilerFamily::Oneapi => &[
                "libirc",
                "libifcore",
                "libifcoremt",
                "libirng",
                "libsvml",
                "libintlc",
                "libimf",
                "libsycl",
                "libOpenCL",
            ],
            CompilerFamily::Nvhpc => &["libnvc", "libnvf"],
            CompilerFamily::Generic => &[],
        }
    }

    /// Flags that link the C++ standard library from a non-C++ driver.
    pub fn stdcxx_libs(&self) -> Option<&'static [&'static str]> {
        match self {
            CompilerFamily::Gcc | CompilerFamily::Clang => Some(&["-lstdc++"]),
            CompilerFamily::AppleClang => Some(&["-lc++"]),
            CompilerFamily::Intel | CompilerFamily::Oneapi => Some(&["-cxxlib"]),
            CompilerFamily::Nvhpc => Some(&["-c++libs"]),
            CompilerFamily::Generic => None,
        }
    }

    /// Flags accepted to request debug information.
    pub fn debug_flags(&self) -> &'static [&'static str] {
        match self {
            CompilerFamily::Gcc => &["-g", "-gstabs+", "-gstabs", "-gxcoff+", "-gxcoff", "-gvms"],
            CompilerFamily::Clang | CompilerFamily::AppleClang => &[
                "-gcodeview",
                "-gdwarf-2",
                "-gdwarf-3",
                "-gdwarf-4",
                "-gdwarf-5",
                "-gline-tables-only",
                "-gmodules",
                "-g",
            ],
            CompilerFamily::Intel | CompilerFamily::Oneapi => &["-debug", "-g", "-g0", "-g1", "-g2", "-g3"],
            CompilerFamily::Nvhpc => &["-g", "-gopt"],
            CompilerFamily::Generic => &["-g"],
        }
    }

    /// Flags accepted to select an optimization level.
    pub fn opt_flags(&self) -> &'static [&'static str] {
        match self {
            CompilerFamily::Gcc => &["-O", "-O0", "-O1", "-O2", "-O3", "-Os", "-Ofast", "-Og"],
            CompilerFamily::Clang | CompilerFamily::AppleClang => {
                &["-O0", "-O1", "-O2", "-O3", "-Ofast", "-Os", "-Oz", "-Og", "-O", "-O4"]
            }
            CompilerFamily::Intel | CompilerFamily::Oneapi => {
                &["-O", "-O0", "-O1", "-O2", "-O3", "-Ofast", "-Os"]
            }
            CompilerFamily::Nvhpc => &["-O", "-O0", "-O1", "-O2", "-O3", "-O4"],
            CompilerFamily::Generic => &["-O", "-O0", "-O1", "-O2", "-O3"],
        }
    }

    /// Prefix passing an argument through the driver to the linker.
    pub fn linker_arg(&self) -> &'static str {
        "-Wl,"
    }

    /// Linker flag selecting `RPATH` over `RUNPATH`.
    pub fn disable_new_dtags(&self) -> &'static str {
        match self {
            CompilerFamily::AppleClang => "",
            _ => "--disable-new-dtags",
        }
    }

    /// Linker flag selecting `RUNPATH` over `RPATH`.
    pub fn enable_new_dtags(&self) -> &'static str {
        match self {
            CompilerFamily::AppleClang => "",
            _ => "--enable-new-dtags",
        }
    }

    /// Look up `property` for a compiler of this family at `version`.
    pub fn flag(&self, property: FlagProperty, version: &CompilerVersion) -> FlagSupport {
        let gates = self.gates(property);

        match gates.iter().rev().find(|g| version.at_least(g.since)) {
            Some(gate) => FlagSupport::Supported(gate.flag),
            None => match gates.first() {
                Some(first) => FlagSupport::Unsupported(format!(
                    "requires {} {} or newer",
                    self,
                    format_numbers(first.since)
                )),
                None => FlagSupport::Unsupported(format!("not available for {}", self)),
            },
        }
    }

    fn gates(&self, property: FlagProperty) -> &'static [Gate] {
        use CompilerFamily as F;
        use FlagProperty as P;

        match (self, property) {
            (F::Gcc, P::Openmp) => gates![[] => "-fopenmp"],
            (F::Gcc, P::Cxx98) => gates![[] => "-std=c++98"],
            (F::Gcc, P::Cxx11) => gates![[4, 3] => "-std=c++0x", [4, 7] => "-std=c++11"],
            (F::Gcc, P::Cxx14) => gates![[4, 8] => "-std=c++1y", [4, 9] => "-std=c++14"],
            (F::Gcc, P::Cxx17) => gates![[5] => "-std=c++1z", [6] => "-std=c++17"],
            (F::Gcc, P::Cxx20) => gates![[8] => "-std=c++2a", [10] => "-std=c++20"],
            (F::Gcc, P::C99) => gates![[4, 5] => "-std=c99"],
            (F::Gcc, P::C11) => gates![[4, 7] => "-std=c11"],
            (F::Gcc, P::C17) => gates![[8] => "-std=c17"],
            (F::Gcc, P::C23) => gates![[9] => "-std=c2x", [14] => "-std=c23"],

            (F::Clang, P::Openmp) => gates![[] => "-fopenmp"],
            (F::Clang, P::Cxx98) => gates![[] => "-std=c++98"],
            (F::Clang, P::Cxx11) => gates![[3, 3] => "-std=c++11"],
            (F::Clang, P::Cxx14) => gates![[3, 4] => "-std=c++1y", [3, 5] => "-std=c++14"],
            (F::Clang, P::Cxx17) => gates![[3, 5] => "-std=c++1z", [5] => "-std=c++17"],
            (F::Clang, P::Cxx20) => gates![[5] => "-std=c++2a", [10] => "-std=c++20"],
            (F::Clang, P::C99) => gates![[] => "-std=c99"],
            (F::Clang, P::C11) => gates![[3, 1] => "-std=c11"],
            (F::Clang, P::C17) => gates![[6] => "-std=c17"],
            (F::Clang, P::C23) => gates![[9] => "-std=c2x", [18] => "-std=c23"],

            (F::AppleClang, P::Openmp) => gates![[] => "-Xpreprocessor -fopenmp"],
            (F::AppleClang, P::Cxx98) => gates![[] => "-std=c++98"],
            (F::AppleClang, P::Cxx11) => gates![[4] => "-std=c++11"],
            (F::AppleClang, P::Cxx14) => gates![[5, 1] => "-std=c++14"],
            (F::AppleClang, P::Cxx17) => gates![[6, 1] => "-std=c++1z", [10] => "-std=c++17"],
            (F::AppleClang, P::Cxx20) => gates![[10] => "-std=c++2a", [13] => "-std=c++20"],
            (F::AppleClang, P::C99) => gates![[] => "-std=c99"],
            (F::AppleClang, P::C11) => gates![[] => "-std=c11"],
            (F::AppleClang, P::C17) => gates![[11] => "-std=c17"],
            (F::AppleClang, P::C23) => gates![[11, 3] => "-std=c2x"],

            (F::Intel, P::Openmp) => gates![[] => "-openmp", [16] => "-qopenmp"],
            (F::Intel, P::Cxx98) => gates![[] => "-std=c++98"],
            (F::Intel, P::Cxx11) => gates![[11, 1] => "-std=c++0x", [13] => "-std=c++11"],
            (F::Intel, P::Cxx14) => gates![[15] => "-std=c++1y", [15, 0, 2] => "-std=c++14"],
            (F::Intel, P::Cxx17) => gates![[19] => "-std=c++17"],
            (F::Intel, P::Cxx20) => gates![[2021] => "-std=c++20"],
            (F::Intel, P::C99) => gates![[12] => "-std=c99"],
            (F::Intel, P::C11) => gates![[16] => "-std=c1x"],
            (F::Intel, P::C17) => gates![[2021] => "-std=c17"],

            (F::Oneapi, P::Openmp) => gates![[] => "-fiopenmp"],
            (F::Oneapi, P::Cxx98) => gates![[] => "-std=c++98"],
            (F::Oneapi, P::Cxx11) => gates![[] => "-std=c++11"],
            (F::Oneapi, P::Cxx14) => gates![[] => "-std=c++14"],
            (F::Oneapi, P::Cxx17) => gates![[] => "-std=c++17"],
            (F::Oneapi, P::Cxx20) => gates![[] => "-std=c++20"],
            (F::Oneapi, P::C99) => gates![[] => "-std=c99"],
            (F::Oneapi, P::C11) => gates![[] => "-std=c1x"],
            (F::Oneapi, P::C17) => gates![[] => "-std=c17"],
            (F::Oneapi, P::C23) => gates![[2022] => "-std=c2x"],

            (F::Nvhpc, P::Openmp) => gates![[] => "-mp"],
            (F::Nvhpc, P::Cxx11) => gates![[] => "--c++11"],
            (F::Nvhpc, P::Cxx14) => gates![[] => "--c++14"],
            (F::Nvhpc, P::Cxx17) => gates![[] => "--c++17"],
            (F::Nvhpc, P::Cxx20) => gates![[21, 3] => "--c++20"],
            (F::Nvhpc, P::C99) => gates![[] => "-c99"],
            (F::Nvhpc, P::C11) => gates![[] => "-c11"],
            (F::Nvhpc, P::C17) => gates![[21, 3] => "-c17"],
            (F::Nvhpc, P::CcPic | P::CxxPic | P::F77Pic | P::FcPic) => gates![[] => "-fpic"],

            (F::Generic, P::Cxx98) => gates![[] => ""],
            (_, P::CcPic | P::CxxPic | P::F77Pic | P::FcPic) => gates![[] => "-fPIC"],

            _ => &[],
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A version threshold: from `since` onwards the property maps to `flag`.
/// Versions below the first gate of a property do not support it.
#[derive(Debug, Clone, Copy)]
struct Gate {
    since: &'static [u64],
    flag: &'static str,
}

/// Result of a capability lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagSupport {
    Supported(&'static str),
    /// Unsupported, with a human-readable reason.
    Unsupported(String),
}

/// A flag property a caller can ask a compiler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagProperty {
    Openmp,
    Cxx98,
    Cxx11,
    Cxx14,
    Cxx17,
    Cxx20,
    C99,
    C11,
    C17,
    C23,
    CcPic,
    CxxPic,
    F77Pic,
    FcPic,
}

impl FlagProperty {
    pub const ALL: [FlagProperty; 14] = [
        FlagProperty::Openmp,
        FlagProperty::Cxx98,
        FlagProperty::Cxx11,
        FlagProperty::Cxx14,
        FlagProperty::Cxx17,
        FlagProperty::Cxx20,
        FlagProperty::C99,
        FlagProperty::C11,
        FlagProperty::C17,
        FlagProperty::C23,
        FlagProperty::CcPic,
        FlagProperty::CxxPic,
        FlagProperty::F77Pic,
        FlagProperty::FcPic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagProperty::Openmp => "openmp",
            FlagProperty::Cxx98 => "cxx98",
            FlagProperty::Cxx11 => "cxx11",
            FlagProperty::Cxx14 => "cxx14",
            FlagProperty::Cxx17 => "cxx17",
            FlagProperty::Cxx20 => "cxx20",
            FlagProperty::C99 => "c99",
            FlagProperty::C11 => "c11",
            FlagProperty::C17 => "c17",
            FlagProperty::C23 => "c23",
            FlagProperty::CcPic => "cc_pic",
            FlagProperty::CxxPic => "cxx_pic",
            FlagProperty::F77Pic => "f77_pic",
            FlagProperty::FcPic => "fc_pic",
        }
    }
}

impl FromStr for FlagProperty {
    type Err = String;

    /// Accepts `openmp` as well as the `openmp_flag` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix("_flag").unwrap_or(s);
        FlagProperty::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| format!("unknown flag property `{}`", s))
    }
}

impl fmt::Display for FlagProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
