//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// compilerkit - inspect and check native compiler toolchains
#[derive(Parser)]
#[command(name = "compilerkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Compilers file to use instead of searching for one
    #[arg(long, global = true, env = "COMPILERKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured compilers
    List(ListArgs),

    /// Show the configuration of a compiler
    Show(ShowArgs),

    /// Show the flags of a compiler
    Flags(FlagsArgs),

    /// Check that compiler executables exist and can be run
    Verify(VerifyArgs),

    /// Print the runtime library directories of a compiler
    Rpaths(RpathsArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Read detected packages (JSON) instead of the compilers file
    #[arg(long, value_name = "FILE")]
    pub detected: Option<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Compiler name or name@version
    pub spec: String,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Compiler name or name@version
    pub spec: String,

    /// Flag property to look up (e.g. openmp, cxx17, cc_pic)
    pub property: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Compiler name or name@version (default: all)
    pub spec: Option<String>,
}

#[derive(Args)]
pub struct RpathsArgs {
    /// Compiler name or name@version
    pub spec: String,

    /// Only print discovered directories, not extra_rpaths
    #[arg(long)]
    pub implicit_only: bool,

    /// Seconds to wait for the dummy compile
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}
