//! `compilerkit flags` command

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::cli::FlagsArgs;
use compilerkit::compiler::FlagProperty;

pub fn execute(args: FlagsArgs, config: Option<&Path>) -> Result<()> {
    let compiler = super::select(super::load_compilers(config)?, &args.spec)?;

    if let Some(property) = &args.property {
        let property: FlagProperty = property.parse().map_err(|e: String| anyhow!(e))?;
        println!("{}", compiler.flag(property)?);
        return Ok(());
    }

    println!("# Invocation flags for `{}`:", compiler.spec);
    for (role, _) in compiler.role_paths() {
        println!("  {:<4} {}", role.key(), compiler.invocation_flags(role).join(" "));
    }

    println!();
    println!("# Capabilities:");
    for property in FlagProperty::ALL {
        match compiler.flag(property) {
            Ok(flag) if flag.is_empty() => println!("  {:<8} (default)", property),
            Ok(flag) => println!("  {:<8} {}", property, flag),
            Err(err) => {
                tracing::debug!("{}", err);
                println!("  {:<8} unsupported", property);
            }
        }
    }

    Ok(())
}
