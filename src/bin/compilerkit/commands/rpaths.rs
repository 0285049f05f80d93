//! `compilerkit rpaths` command

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::cli::RpathsArgs;
use compilerkit::compiler::{ImplicitPathProber, ShellModuleLoader};
use compilerkit::util::process::SystemRunner;

pub fn execute(args: RpathsArgs, config: Option<&Path>) -> Result<()> {
    let compiler = super::select(super::load_compilers(config)?, &args.spec)?;

    let loader = ShellModuleLoader::default();
    let prober = ImplicitPathProber::new(&SystemRunner, &loader)
        .with_timeout(Duration::from_secs(args.timeout));
    let implicit = prober.probe(&compiler)?;
    tracing::debug!("{}: {} implicit rpaths", compiler.spec, implicit.len());

    let mut printed = Vec::new();
    let extra = if args.implicit_only {
        &[][..]
    } else {
        compiler.extra_rpaths.as_slice()
    };
    for path in extra.iter().chain(&implicit) {
        if !printed.contains(path) {
            println!("{}", path.display());
            printed.push(path.clone());
        }
    }

    Ok(())
}
