//! `mmsmedia` - extract the real photo, video or text from carrier MMS email.
//!
//! Reads one raw message, strips carrier noise using the configured rule
//! files and prints what was staged.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mmsmedia_core::{Session, SessionOptions, Settings, settings};
use mmsmedia_mime::Message;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use report::Report;

/// Extract user media from an MMS message delivered as email.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Raw RFC 5322 message (.eml) to process.
    file: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Keep staged files instead of purging them on exit.
    #[arg(long)]
    keep: bool,

    /// Directory holding default.json, aliases.json and carrier rule files.
    #[arg(long, env = "MMSMEDIA_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Directory under which staged files are written.
    #[arg(long, env = "MMSMEDIA_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Carrier id used when the envelope names no domain.
    #[arg(long)]
    carrier_default: Option<String>,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(dir) = &self.config_dir {
            settings.config_dir.clone_from(dir);
        }
        if let Some(dir) = &self.staging_dir {
            settings.staging_root.clone_from(dir);
        }
        if let Some(carrier) = &self.carrier_default {
            settings = settings.with_default_carrier(carrier);
        }
        settings
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so reports can be piped
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mmsmedia=info,mmsmedia_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if settings::install(cli.settings()).is_err() {
        warn!("Settings were already installed; keeping the existing ones");
    }
    let settings = Settings::global();
    info!("Using rules from {}", settings.config_dir.display());

    let raw = std::fs::read(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let message = Message::parse(&raw)
        .with_context(|| format!("Failed to parse {}", cli.file.display()))?;

    let session = Session::new(message, settings, SessionOptions::eager())
        .context("Failed to extract media")?;
    let report = Report::from_session(&session);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if cli.keep {
        info!("Keeping staged files in {}", session.staging_root().display());
    } else {
        session.purge().context("Failed to purge staged files")?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::try_parse_from([
            "mmsmedia",
            "message.eml",
            "--json",
            "--config-dir",
            "/etc/mmsmedia",
            "--staging-dir",
            "/var/tmp/mms",
            "--carrier-default",
            "Fallback.Example",
        ])
        .unwrap();

        assert!(cli.json);
        assert!(!cli.keep);
        let settings = cli.settings();
        assert_eq!(settings.config_dir, PathBuf::from("/etc/mmsmedia"));
        assert_eq!(settings.staging_root, PathBuf::from("/var/tmp/mms"));
        assert_eq!(settings.default_carrier, "fallback.example");
    }
}
