use std::path::PathBuf;

use thiserror::Error;

use crate::Key;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A value needed to send was not found at any configuration level
    #[error("{0} is required but was not set (use `config set` or the environment)")]
    MissingField(Key),

    #[error("Failed to read {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read attachment {path:?}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid email address {address:?}")]
    InvalidAddress {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Invalid content type for attachment")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("Failed to build email message")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to send email via {relay}")]
    Transport {
        relay: String,
        source: lettre::transport::smtp::Error,
    },
}
