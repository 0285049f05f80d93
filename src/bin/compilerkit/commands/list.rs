//! `compilerkit list` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ListArgs;
use compilerkit::util::fs::read_to_string;
use compilerkit::util::HostArch;
use compilerkit::{Compiler, CompilerFactory, Role};

pub fn execute(args: ListArgs, config: Option<&Path>) -> Result<()> {
    let compilers = match &args.detected {
        Some(path) => {
            let contents = read_to_string(path)?;
            let value: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse detected packages: {}", path.display()))?;
            CompilerFactory::from_packages_value(value, &HostArch::detect())?
        }
        None => super::load_compilers(config)?,
    };

    if compilers.is_empty() {
        println!("No compilers found");
        return Ok(());
    }

    for compiler in &compilers {
        print_compiler(compiler);
    }

    Ok(())
}

fn print_compiler(compiler: &Compiler) {
    let arch = match &compiler.target {
        Some(target) => format!("{}-{}", compiler.operating_system, target),
        None => compiler.operating_system.clone(),
    };
    println!("{} ({})", compiler.spec, arch);

    let roles: Vec<&str> = compiler.role_paths().map(|(role, _)| role.key()).collect();
    if roles.len() == Role::ALL.len() {
        println!("  roles: all");
    } else {
        println!("  roles: {}", roles.join(", "));
    }
}
