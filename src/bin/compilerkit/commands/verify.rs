//! `compilerkit verify` command

use std::path::Path;

use anyhow::{bail, Result};
use rayon::prelude::*;

use crate::cli::VerifyArgs;
use compilerkit::util::diagnostic::{emit, Severity};
use compilerkit::CompilerError;

pub fn execute(args: VerifyArgs, config: Option<&Path>, color: bool) -> Result<()> {
    let compilers = super::load_compilers(config)?;
    let compilers = match &args.spec {
        Some(query) => vec![super::select(compilers, query)?],
        None => compilers,
    };

    let results: Vec<Result<(), CompilerError>> = compilers
        .par_iter()
        .map(|compiler| compiler.verify_executables())
        .collect();

    let mut failed = 0;
    for (compiler, result) in compilers.iter().zip(results) {
        match result {
            Ok(()) => println!("{:>12} {}", "ok", compiler.spec),
            Err(err) => {
                failed += 1;
                println!("{:>12} {}", "FAILED", compiler.spec);
                emit(&err.to_diagnostic().with_severity(Severity::Warning), color);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} compilers failed verification", failed, compilers.len());
    }
    Ok(())
}
