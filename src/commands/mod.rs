// src/commands/mod.rs
//! Command handlers for the alpaca CLI

mod info;
mod install;

pub use info::cmd_info;
pub use install::cmd_install;

use crate::cli::OptionArgs;
use alpaca::BuildOptions;
use anyhow::{Result, bail};

/// Turn `--with`/`--without` switches into build options
pub(crate) fn build_options(args: &OptionArgs) -> Result<BuildOptions> {
    let mut options = BuildOptions::new();

    for name in &args.with {
        options.insert(name.clone(), true);
    }

    for name in &args.without {
        if options.get(name) == Some(&true) {
            bail!("Option \"{}\" is both enabled and disabled", name);
        }
        options.insert(name.clone(), false);
    }

    Ok(options)
}
