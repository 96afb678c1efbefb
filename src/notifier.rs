use std::path::PathBuf;

use log::{debug, info};

use crate::{
    attachments,
    notification::email::{GmailMailer, Mailer, OutgoingMail},
    settings::{render_contents, DEFAULT_CONTENTS_TEMPLATE, DEFAULT_SUBJECT},
    utils::script_name,
    ConfigStore, Error, Key, Result, Settings,
};

/// Overrides for a single send. Nothing here is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub fields: Settings,

    /// `Some` (even empty) is used as is, `None` falls back to scanning `attachments_path`
    pub attachments: Option<Vec<PathBuf>>,
}

/// Sends notifications using settings held in a [`ConfigStore`]
pub struct Notifier<M = GmailMailer> {
    store: ConfigStore,
    settings: Settings,
    mailer: M,
    script_name: String,
}

impl Notifier<GmailMailer> {
    pub fn open(store: ConfigStore) -> Result<Self> {
        Self::with_mailer(store, GmailMailer::new())
    }
}

impl<M: Mailer> Notifier<M> {
    pub fn with_mailer(store: ConfigStore, mailer: M) -> Result<Self> {
        let settings = store.load()?;
        Ok(Self::from_parts(store, settings, mailer))
    }

    /// Uses `settings` as the stored layer instead of loading it
    pub fn from_parts(store: ConfigStore, settings: Settings, mailer: M) -> Self {
        Self {
            store,
            settings,
            mailer,
            script_name: script_name(),
        }
    }

    /// Replaces the value substituted for `{script_name}`
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// The stored layer as currently held in memory (no defaults applied)
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The effective settings with defaults applied
    pub fn resolved(&self) -> Settings {
        Settings::resolve(&Settings::default(), &self.settings, &Settings::defaults())
    }

    /// Applies `fields` that are set on top of the current settings
    pub fn configure(&mut self, fields: Settings, persist: bool) -> Result<()> {
        self.settings = self.settings.merged_with(&fields);
        debug!("Configured {:?}", fields.to_values().keys());
        if persist {
            self.store.save(&self.settings.to_values())?;
            info!("Saved settings to {:?}", self.store.path());
        }
        Ok(())
    }

    /// Puts subject and contents back to their defaults, other fields are kept
    pub fn reset_subject_contents(&mut self, persist: bool) -> Result<()> {
        self.settings.subject = Some(DEFAULT_SUBJECT.to_string());
        self.settings.contents = Some(DEFAULT_CONTENTS_TEMPLATE.to_string());
        if persist {
            self.store.reset(&[Key::Subject, Key::Contents])?;
            info!("Reset subject and contents in {:?}", self.store.path());
        }
        Ok(())
    }

    /// Resolves the message for `request` without sending it
    pub fn prepare(&self, request: &SendRequest) -> Result<OutgoingMail> {
        let resolved = Settings::resolve(&request.fields, &self.settings, &Settings::defaults());
        let from_address = resolved.from_address.ok_or(Error::MissingField(Key::From))?;
        let app_password = resolved
            .app_password
            .ok_or(Error::MissingField(Key::AppPassword))?;
        // `to_address` is only unset when `from_address` is, checked above
        let to_address = resolved.to_address.unwrap_or_else(|| from_address.clone());
        let attachments = attachments::select(
            request.attachments.as_deref(),
            resolved.attachments_path.as_deref(),
        )?;
        Ok(OutgoingMail {
            from_address,
            app_password,
            to_address,
            subject: resolved.subject.unwrap_or_default(),
            body: render_contents(
                resolved.contents.as_deref().unwrap_or_default(),
                &self.script_name,
            ),
            attachments,
        })
    }

    /// Sends once, errors from the mailer are returned without retry
    pub fn send(&self, request: &SendRequest) -> Result<()> {
        let mail = self.prepare(request)?;
        debug!(
            "Sending from {} to {} with {} attachment(s)",
            mail.from_address,
            mail.to_address,
            mail.attachments.len()
        );
        self.mailer.send(&mail)
    }
}
