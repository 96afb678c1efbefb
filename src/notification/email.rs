use std::{fs, io::ErrorKind, path::PathBuf};

use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use log::{debug, info, warn};

use crate::{utils::make_single_line, Error, Result};

pub const GMAIL_RELAY: &str = "smtp.gmail.com";

/// Everything needed to send one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from_address: String,
    pub app_password: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Delivers a fully resolved message. Implementations must not retry
pub trait Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Sends through Gmail's SMTP relay authenticating with an app password
#[derive(Debug, Clone, Default)]
pub struct GmailMailer;

impl GmailMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Mailer for GmailMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = build_message(mail)?;
        let credentials = Credentials::new(mail.from_address.clone(), mail.app_password.clone());
        let transport_err = |source| Error::Transport {
            relay: GMAIL_RELAY.to_string(),
            source,
        };
        let transport = SmtpTransport::relay(GMAIL_RELAY)
            .map_err(transport_err)?
            .credentials(credentials)
            .build();
        info!(
            "Sending {:?} to {} via {}",
            make_single_line(&mail.subject),
            mail.to_address,
            GMAIL_RELAY
        );
        let response = transport.send(&message).map_err(transport_err)?;
        debug!("Relay responded with code {}", response.code());
        Ok(())
    }
}

/// Plain text body, with attachments turning it into a `multipart/mixed` message
///
/// Attachments that no longer exist are skipped with a warning so the
/// notification still goes out. Other read errors fail the message.
pub fn build_message(mail: &OutgoingMail) -> Result<Message> {
    let builder = Message::builder()
        .from(parse_mailbox(&mail.from_address)?)
        .to(parse_mailbox(&mail.to_address)?)
        .subject(mail.subject.clone());
    let body = SinglePart::plain(mail.body.clone());

    let content_type = ContentType::parse("application/octet-stream")?;
    let mut attachments = Vec::new();
    for path in &mail.attachments {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Missing attachment {path:?} ignored");
                continue;
            }
            Err(source) => {
                return Err(Error::Attachment {
                    path: path.clone(),
                    source,
                })
            }
        };
        debug!("Attaching {path:?}");
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        attachments.push(Attachment::new(filename).body(contents, content_type.clone()));
    }

    if attachments.is_empty() {
        return Ok(builder.singlepart(body)?);
    }
    let parts = attachments
        .into_iter()
        .fold(MultiPart::mixed().singlepart(body), |parts, part| {
            parts.singlepart(part)
        });
    Ok(builder.multipart(parts)?)
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|source| Error::InvalidAddress {
            address: address.to_string(),
            source,
        })
}
