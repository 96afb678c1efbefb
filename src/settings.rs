use std::{collections::BTreeMap, fmt::Display, path::PathBuf};

use serde::Serialize;

pub const DEFAULT_SUBJECT: &str = "Process Completed";
pub const DEFAULT_CONTENTS_TEMPLATE: &str = "{script_name} has finished running.";
pub const SCRIPT_NAME_TOKEN: &str = "{script_name}";

/// The recognized keys of the config file and environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    From,
    AppPassword,
    To,
    Subject,
    Contents,
    AttachmentsPath,
}

impl Key {
    pub const ALL: [Key; 6] = [
        Key::From,
        Key::AppPassword,
        Key::To,
        Key::Subject,
        Key::Contents,
        Key::AttachmentsPath,
    ];

    pub fn env_name(&self) -> &'static str {
        match self {
            Key::From => "SYGMAIL_FROM",
            Key::AppPassword => "SYGMAIL_APP_PASSWORD",
            Key::To => "SYGMAIL_TO",
            Key::Subject => "SYGMAIL_SUBJECT",
            Key::Contents => "SYGMAIL_CONTENTS",
            Key::AttachmentsPath => "SYGMAIL_ATTACHMENTS_PATH",
        }
    }

    /// Matches case-insensitively so `sygmail_from` is accepted too
    pub fn from_env_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.env_name().eq_ignore_ascii_case(name))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.env_name())
    }
}

/// One layer of configuration, or the effective result of merging layers
///
/// `None` means "not set at this level".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub from_address: Option<String>,
    pub app_password: Option<String>,
    pub to_address: Option<String>,
    pub subject: Option<String>,
    pub contents: Option<String>,
    pub attachments_path: Option<PathBuf>,
}

impl Settings {
    /// The built-in bottom layer
    pub fn defaults() -> Self {
        Self {
            subject: Some(DEFAULT_SUBJECT.to_string()),
            contents: Some(DEFAULT_CONTENTS_TEMPLATE.to_string()),
            ..Default::default()
        }
    }

    /// Merges the layers field by field, the first present value wins.
    ///
    /// Empty strings are treated as not set. `to_address` falls back to the
    /// resolved `from_address` when no layer provides one.
    pub fn resolve(explicit: &Settings, stored: &Settings, defaults: &Settings) -> Settings {
        let layers = [explicit, stored, defaults];
        let from_address = first_present(layers.map(|s| s.from_address.as_ref()));
        let to_address =
            first_present(layers.map(|s| s.to_address.as_ref())).or_else(|| from_address.clone());
        Settings {
            from_address,
            app_password: first_present(layers.map(|s| s.app_password.as_ref())),
            to_address,
            subject: first_present(layers.map(|s| s.subject.as_ref())),
            contents: first_present(layers.map(|s| s.contents.as_ref())),
            attachments_path: first_present(layers.map(|s| s.attachments_path.as_ref())),
        }
    }

    /// Overlays `explicit` on top of `self` without applying defaults
    pub fn merged_with(&self, explicit: &Settings) -> Settings {
        let layers = [explicit, self];
        Settings {
            from_address: first_present(layers.map(|s| s.from_address.as_ref())),
            app_password: first_present(layers.map(|s| s.app_password.as_ref())),
            to_address: first_present(layers.map(|s| s.to_address.as_ref())),
            subject: first_present(layers.map(|s| s.subject.as_ref())),
            contents: first_present(layers.map(|s| s.contents.as_ref())),
            attachments_path: first_present(layers.map(|s| s.attachments_path.as_ref())),
        }
    }

    pub fn get(&self, key: Key) -> Option<String> {
        match key {
            Key::From => self.from_address.clone(),
            Key::AppPassword => self.app_password.clone(),
            Key::To => self.to_address.clone(),
            Key::Subject => self.subject.clone(),
            Key::Contents => self.contents.clone(),
            Key::AttachmentsPath => self
                .attachments_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }

    pub fn set(&mut self, key: Key, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match key {
            Key::From => self.from_address = value,
            Key::AppPassword => self.app_password = value,
            Key::To => self.to_address = value,
            Key::Subject => self.subject = value,
            Key::Contents => self.contents = value,
            Key::AttachmentsPath => self.attachments_path = value.map(PathBuf::from),
        }
    }

    /// The set fields keyed by their config file name
    pub fn to_values(&self) -> BTreeMap<Key, String> {
        Key::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}

impl From<&BTreeMap<Key, String>> for Settings {
    fn from(values: &BTreeMap<Key, String>) -> Self {
        let mut result = Settings::default();
        for (key, value) in values {
            result.set(*key, Some(value.clone()));
        }
        result
    }
}

/// Returns the first layer that holds a non-empty value
pub fn first_present<T, const N: usize>(layers: [Option<&T>; N]) -> Option<T>
where
    T: Clone + IsBlank,
{
    layers
        .into_iter()
        .flatten()
        .find(|value| !value.is_blank())
        .cloned()
}

/// Values that count as "not set" even though they are present
pub trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl IsBlank for PathBuf {
    fn is_blank(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

/// Substitutes the script name token, nothing else in the text is interpreted
pub fn render_contents(contents: &str, script_name: &str) -> String {
    contents.replace(SCRIPT_NAME_TOKEN, script_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn layer(from: Option<&str>, to: Option<&str>, subject: Option<&str>) -> Settings {
        Settings {
            from_address: from.map(String::from),
            to_address: to.map(String::from),
            subject: subject.map(String::from),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(Some("explicit@x.com"), Some("stored@x.com"), "explicit@x.com")]
    #[case(None, Some("stored@x.com"), "stored@x.com")]
    #[case(Some(""), Some("stored@x.com"), "stored@x.com")]
    fn from_address_precedence(
        #[case] explicit: Option<&str>,
        #[case] stored: Option<&str>,
        #[case] expected: &str,
    ) {
        // Arrange
        let explicit = layer(explicit, None, None);
        let stored = layer(stored, None, None);

        // Act
        let actual = Settings::resolve(&explicit, &stored, &Settings::defaults());

        // Assert
        assert_eq!(actual.from_address.as_deref(), Some(expected));
    }

    #[rstest]
    #[case(Some("Explicit"), Some("Stored"), "Explicit")]
    #[case(None, Some("Stored"), "Stored")]
    #[case(None, None, DEFAULT_SUBJECT)]
    #[case(Some(""), None, DEFAULT_SUBJECT)]
    fn subject_precedence(
        #[case] explicit: Option<&str>,
        #[case] stored: Option<&str>,
        #[case] expected: &str,
    ) {
        let explicit = layer(None, None, explicit);
        let stored = layer(None, None, stored);

        let actual = Settings::resolve(&explicit, &stored, &Settings::defaults());

        assert_eq!(actual.subject.as_deref(), Some(expected));
    }

    #[test]
    fn every_field_takes_explicit_then_stored_then_default() {
        // Arrange
        let explicit = Settings {
            app_password: Some("explicit-pw".into()),
            attachments_path: Some("explicit/dir".into()),
            ..Default::default()
        };
        let stored = Settings {
            from_address: Some("stored@x.com".into()),
            app_password: Some("stored-pw".into()),
            contents: Some("stored contents".into()),
            attachments_path: Some("stored/dir".into()),
            ..Default::default()
        };
        let defaults = Settings {
            to_address: Some("default@x.com".into()),
            ..Settings::defaults()
        };

        // Act
        let actual = Settings::resolve(&explicit, &stored, &defaults);

        // Assert
        assert_eq!(
            actual,
            Settings {
                from_address: Some("stored@x.com".into()),
                app_password: Some("explicit-pw".into()),
                to_address: Some("default@x.com".into()),
                subject: Some(DEFAULT_SUBJECT.into()),
                contents: Some("stored contents".into()),
                attachments_path: Some("explicit/dir".into()),
            }
        );
    }

    #[test]
    fn to_address_falls_back_to_from_address() {
        let stored = layer(Some("me@x.com"), None, None);

        let actual = Settings::resolve(&Settings::default(), &stored, &Settings::defaults());

        assert_eq!(actual.to_address.as_deref(), Some("me@x.com"));
    }

    #[test]
    fn explicit_from_address_also_feeds_to_fallback() {
        let explicit = layer(Some("explicit@x.com"), None, None);
        let stored = layer(Some("stored@x.com"), None, None);

        let actual = Settings::resolve(&explicit, &stored, &Settings::defaults());

        assert_eq!(actual.to_address.as_deref(), Some("explicit@x.com"));
    }

    #[test]
    fn nothing_set_resolves_to_none() {
        let actual = Settings::resolve(
            &Settings::default(),
            &Settings::default(),
            &Settings::defaults(),
        );

        assert_eq!(actual.from_address, None);
        assert_eq!(actual.app_password, None);
        assert_eq!(actual.to_address, None);
        assert_eq!(actual.attachments_path, None);
    }

    #[test]
    fn merged_with_does_not_apply_defaults() {
        let stored = layer(Some("me@x.com"), None, None);
        let explicit = layer(None, Some("you@x.com"), None);

        let actual = stored.merged_with(&explicit);

        assert_eq!(actual, layer(Some("me@x.com"), Some("you@x.com"), None));
    }

    #[test]
    fn values_round_trip_through_settings() {
        let settings = Settings {
            from_address: Some("me@x.com".into()),
            app_password: Some("secret".into()),
            attachments_path: Some("out".into()),
            ..Default::default()
        };

        let values = settings.to_values();

        assert_eq!(values.len(), 3);
        assert_eq!(Settings::from(&values), settings);
    }

    #[rstest]
    #[case("SYGMAIL_FROM", Some(Key::From))]
    #[case("sygmail_app_password", Some(Key::AppPassword))]
    #[case("SYGMAIL_ATTACHMENTS_PATH", Some(Key::AttachmentsPath))]
    #[case("OTHER_KEY", None)]
    fn key_from_env_name(#[case] name: &str, #[case] expected: Option<Key>) {
        assert_eq!(Key::from_env_name(name), expected);
    }

    #[rstest]
    #[case("{script_name} has finished running.", "train.py has finished running.")]
    #[case("done: {script_name} / {script_name}", "done: train.py / train.py")]
    #[case("no token {here}", "no token {here}")]
    fn contents_rendering(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(render_contents(template, "train.py"), expected);
    }
}
