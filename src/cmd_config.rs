//! Config subcommand handlers.

use std::path::Path;

use viewpump_config::{Config, ConfigValidator};

use crate::cli::ConfigAction;

/// Handle config subcommands.
pub(crate) fn handle_config_command(
    action: ConfigAction,
    path: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Check => config_check(path, config),
        ConfigAction::Show => config_show(config),
    }
}

fn config_check(path: &Path, config: &Config) -> anyhow::Result<()> {
    if path.exists() {
        println!("Checking {}", path.display());
    } else {
        println!("{} not found, checking defaults", path.display());
    }

    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        println!("  warning  {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("  error    {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("Configuration is valid.");
        Ok(())
    } else {
        anyhow::bail!("configuration has {} error(s)", result.errors.len())
    }
}

fn config_show(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
