use crate::output::print_json;
use clap::Subcommand;
use pagesmith_core::config::{ServiceConfig, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the configuration for missing credentials and odd values
    Check,

    /// Print the effective configuration (credentials omitted)
    Show,
}

pub fn run(config: &ServiceConfig, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Check => check(config, json),
        ConfigSubcommand::Show => show(config),
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn check(config: &ServiceConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config: &ServiceConfig) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    redacted.github.token.clear();
    redacted.llm.api_key.clear();
    redacted.secret.clear();
    print_json(&redacted)
}
