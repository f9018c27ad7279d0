//! Config subcommand handlers.

use unicast_config::{Provider, Receiver};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Starter config written by `config init`: one receiver, one provider.
fn starter_config() -> Config {
    Config {
        receivers: vec![Receiver {
            kind: "chromecast".into(),
            name: "Living Room".into(),
            address: "192.168.1.20".into(),
        }],
        providers: vec![Provider {
            kind: "kodi".into(),
            name: "Kodi".into(),
            address: "192.168.1.50".into(),
            port: 8080,
        }],
        ..Config::default()
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            unicast_config::save_config_to(&starter_config(), &path)?;

            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
                eprintln!("  Edit the receivers and providers, then run: unicast discover");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string(), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_is_valid() {
        let hub = starter_config().to_hub_config();
        assert!(hub.is_ok(), "starter config rejected: {hub:?}");
    }
}
