//! `compilerkit show` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ShowArgs;
use compilerkit::{FlagCategory, Role};

pub fn execute(args: ShowArgs, config: Option<&Path>) -> Result<()> {
    let compiler = super::select(super::load_compilers(config)?, &args.spec)?;

    println!("{}", compiler.spec);
    println!("  family:           {}", compiler.family);
    println!("  operating system: {}", compiler.operating_system);
    if let Some(target) = &compiler.target {
        println!("  target:           {}", target);
    }
    println!(
        "  verbose flag:     {}",
        compiler.verbose_flag.as_deref().unwrap_or("none")
    );

    println!();
    println!("Paths:");
    for role in Role::ALL {
        let path = compiler
            .role_path(role)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string());
        println!("  {:<4} {}", role.key(), path);
    }

    if !compiler.flags.is_empty() {
        println!();
        println!("Flags:");
        for category in FlagCategory::ALL {
            let atoms = compiler.flags.get(category);
            if !atoms.is_empty() {
                println!("  {:<9} {}", category, atoms.join(" "));
            }
        }
    }

    if !compiler.modules.is_empty() {
        println!();
        println!("Modules:");
        for module in &compiler.modules {
            println!("  {}", module);
        }
    }

    if !compiler.environment.is_empty() {
        println!();
        println!("Environment:");
        let env = toml::to_string_pretty(&compiler.environment)
            .context("failed to serialize environment")?;
        for line in env.lines().filter(|l| !l.is_empty()) {
            println!("  {}", line);
        }
    }

    Ok(())
}
