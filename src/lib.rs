//! Email notifications (typically "job finished" pings) through a Gmail account.
//!
//! Credentials and defaults live in a `KEY=value` file (`.env` by default) and
//! may be overridden by environment variables of the same name:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SYGMAIL_FROM` | Sender address, also the recipient when `SYGMAIL_TO` is unset |
//! | `SYGMAIL_APP_PASSWORD` | Gmail app password |
//! | `SYGMAIL_TO` | Recipient address |
//! | `SYGMAIL_SUBJECT` | Subject, default `Process Completed` |
//! | `SYGMAIL_CONTENTS` | Body, `{script_name}` is replaced with the program name |
//! | `SYGMAIL_ATTACHMENTS_PATH` | Directory whose files are attached by default |

mod attachments;
mod cli;
mod config;
mod error;
pub mod logging;
pub mod notification;
mod notifier;
mod settings;
mod utils;

use std::io::Write;

use anyhow::Context;
use log::info;

pub use attachments::select as select_attachments;
pub use cli::{
    Cli, Command, ConfigCommand, EnvArg, LogLevel, SendArgs, SetArgs, ShowArgs, CLI_DEFAULT_CONTENTS,
};
pub use config::{ConfigStore, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
pub use notification::email::{GmailMailer, Mailer, OutgoingMail};
pub use notifier::{Notifier, SendRequest};
pub use settings::{Key, Settings, DEFAULT_CONTENTS_TEMPLATE, DEFAULT_SUBJECT};

use crate::utils::mask_secret;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Send(args) => {
            let notifier = Notifier::open(args.env.store())
                .with_context(|| format!("Failed to load config from {:?}", args.env.env_path))?;
            notifier
                .send(&args.to_request())
                .context("Failed to send notification")?;
            info!("Notification sent");
            Ok(())
        }
        Command::Config(command) => {
            let stdout = std::io::stdout();
            run_config(command, &mut stdout.lock())
        }
    }
}

/// Handles the `config` subcommands, output is written to `out`
pub fn run_config(command: ConfigCommand, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Set(args) => {
            let mut notifier = Notifier::open(args.env.store())
                .with_context(|| format!("Failed to load config from {:?}", args.env.env_path))?;
            notifier
                .configure(args.to_settings(), true)
                .context("Failed to save config")?;
        }
        ConfigCommand::Reset(env) => {
            let mut notifier = Notifier::open(env.store())
                .with_context(|| format!("Failed to load config from {:?}", env.env_path))?;
            notifier
                .reset_subject_contents(true)
                .context("Failed to reset config")?;
        }
        ConfigCommand::Show(args) => {
            let stored = args
                .env
                .store()
                .load()
                .with_context(|| format!("Failed to load config from {:?}", args.env.env_path))?;
            show(&stored, args.raw, args.json, out)?;
        }
    }
    Ok(())
}

/// Prints resolved settings with the password masked, or with `raw` the stored ones as is
fn show(stored: &Settings, raw: bool, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let mut settings = if raw {
        stored.clone()
    } else {
        Settings::resolve(&Settings::default(), stored, &Settings::defaults())
    };
    if !raw {
        settings.app_password = Some(mask_secret(settings.app_password.as_deref()));
    }

    if json {
        serde_json::to_writer_pretty(&mut *out, &settings)
            .context("Failed to serialize settings")?;
        writeln!(out)?;
    } else {
        for key in Key::ALL {
            writeln!(out, "{key}={}", settings.get(key).unwrap_or_default())?;
        }
    }
    Ok(())
}
