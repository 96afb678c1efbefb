use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::{config::DEFAULT_CONFIG_PATH, ConfigStore, SendRequest, Settings};

/// Used for `send` when `--contents` is not given. Never written to the config file
pub const CLI_DEFAULT_CONTENTS: &str = "[sygmail notification]";

#[derive(Parser, Clone, Eq, PartialEq, Debug)]
#[command(
    name = "sygmail",
    author,
    version,
    about,
    long_about = "Send Gmail notifications, typically when a job has finished."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Set logging level to use
    #[arg(long, short, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    /// Also write logs to this file (rolled over when it gets large)
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Eq, PartialEq, Debug)]
pub enum Command {
    /// Send a notification email
    Send(SendArgs),

    /// Manage the stored configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Clone, Eq, PartialEq, Debug)]
pub enum ConfigCommand {
    /// Set config values
    Set(SetArgs),

    /// Show current config values
    Show(ShowArgs),

    /// Reset subject/contents to defaults
    Reset(EnvArg),
}

#[derive(Args, Clone, Eq, PartialEq, Debug)]
pub struct EnvArg {
    /// Path to the config file
    #[arg(long = "env", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub env_path: PathBuf,
}

impl EnvArg {
    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.env_path)
    }
}

#[derive(Args, Clone, Eq, PartialEq, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub env: EnvArg,

    /// From address
    #[arg(long = "from", value_name = "ADDR")]
    pub from_address: Option<String>,

    /// To address, defaults to the from address
    #[arg(long = "to", value_name = "ADDR")]
    pub to_address: Option<String>,

    /// Email subject
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Email contents
    #[arg(long, value_name = "TEXT")]
    pub contents: Option<String>,

    /// Attachment file paths. Given without any paths, nothing is attached
    #[arg(long, value_name = "PATH", num_args = 0..)]
    pub attachments: Option<Vec<PathBuf>>,

    /// Directory whose files are attached when `--attachments` is not used
    #[arg(long, value_name = "DIR")]
    pub attachments_path: Option<PathBuf>,
}

impl SendArgs {
    pub fn to_request(&self) -> SendRequest {
        SendRequest {
            fields: Settings {
                from_address: self.from_address.clone(),
                app_password: None,
                to_address: self.to_address.clone(),
                subject: self.subject.clone(),
                contents: Some(
                    self.contents
                        .clone()
                        .unwrap_or_else(|| CLI_DEFAULT_CONTENTS.to_string()),
                ),
                attachments_path: self.attachments_path.clone(),
            },
            attachments: self.attachments.clone(),
        }
    }
}

#[derive(Args, Clone, Eq, PartialEq, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub env: EnvArg,

    /// From address
    #[arg(long = "from", value_name = "ADDR")]
    pub from_address: Option<String>,

    /// Gmail app password
    #[arg(long, value_name = "SECRET")]
    pub app_password: Option<String>,

    /// To address
    #[arg(long = "to", value_name = "ADDR")]
    pub to_address: Option<String>,

    /// Email subject
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Email contents, `{script_name}` is replaced when sending
    #[arg(long, value_name = "TEXT")]
    pub contents: Option<String>,

    /// Directory whose files are attached by default
    #[arg(long, value_name = "DIR")]
    pub attachments_path: Option<PathBuf>,
}

impl SetArgs {
    pub fn to_settings(&self) -> Settings {
        Settings {
            from_address: self.from_address.clone(),
            app_password: self.app_password.clone(),
            to_address: self.to_address.clone(),
            subject: self.subject.clone(),
            contents: self.contents.clone(),
            attachments_path: self.attachments_path.clone(),
        }
    }
}

#[derive(Args, Clone, Eq, PartialEq, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub env: EnvArg,

    /// Show the stored values as is, secrets included
    #[arg(long)]
    pub raw: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exists to provide better help messages variants copied from LevelFilter as
/// that's the type that is actually needed
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum LogLevel {
    /// Nothing emitted in this mode
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
