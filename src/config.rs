use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::debug;
use tempfile::NamedTempFile;

use crate::{Error, Key, Result, Settings};

pub const DEFAULT_CONFIG_PATH: &str = ".env";

/// A flat `KEY=value` file plus the process environment
///
/// Environment variables with a recognized name override the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        Ok(Settings::from(&self.load_values()?))
    }

    pub fn load_values(&self) -> Result<BTreeMap<Key, String>> {
        self.load_values_with(std::env::vars())
    }

    /// Same as [`Self::load_values`] but with the environment supplied by the caller
    pub fn load_values_with(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<BTreeMap<Key, String>> {
        let mut result = self.load_file()?;
        let env = env_values(vars);
        for (key, value) in env {
            debug!("{key} taken from the environment");
            result.insert(key, value);
        }
        Ok(result)
    }

    /// Values from the file only, a missing file is empty
    pub fn load_file(&self) -> Result<BTreeMap<Key, String>> {
        debug!("Loading config from: {:?}", self.path);
        let Some(contents) = self.read_existing()? else {
            debug!("No config file at {:?}", self.path);
            return Ok(BTreeMap::new());
        };
        Ok(parse_lines(&contents)
            .into_iter()
            .filter_map(|line| match line {
                Line::Entry { key, value, .. } if !value.is_empty() => Some((key, value)),
                _ => None,
            })
            .collect())
    }

    /// Rewrites the file with `values` for every recognized key.
    ///
    /// Lines that are not recognized keys are kept as they were. Recognized
    /// keys missing from `values` are removed.
    pub fn save(&self, values: &BTreeMap<Key, String>) -> Result<()> {
        debug!("Saving {} value(s) to {:?}", values.len(), self.path);
        let existing = self.read_existing()?.unwrap_or_default();
        let mut remaining = values.clone();
        let mut output = Vec::new();
        for line in parse_lines(&existing) {
            match line {
                Line::Entry { key, .. } => {
                    // Duplicates of a key collapse into the first occurrence
                    if let Some(value) = remaining.remove(&key) {
                        output.push(format_entry(key, &value));
                    }
                }
                Line::Other(raw) => output.push(raw),
            }
        }
        output.extend(
            remaining
                .iter()
                .map(|(key, value)| format_entry(*key, value)),
        );
        self.write_atomic(&output)
    }

    /// Removes only `keys` from the file, everything else is untouched
    pub fn reset(&self, keys: &[Key]) -> Result<()> {
        debug!("Clearing {keys:?} in {:?}", self.path);
        let Some(existing) = self.read_existing()? else {
            return Ok(());
        };
        let output: Vec<String> = parse_lines(&existing)
            .into_iter()
            .filter_map(|line| match line {
                Line::Entry { key, .. } if keys.contains(&key) => None,
                Line::Entry { raw, .. } | Line::Other(raw) => Some(raw),
            })
            .collect();
        self.write_atomic(&output)
    }

    fn read_existing(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes to a temporary file next to the target then moves it into place
    fn write_atomic(&self, lines: &[String]) -> Result<()> {
        let write_err = |source| Error::Write {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;
        let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
        for line in lines {
            writeln!(file, "{line}").map_err(write_err)?;
        }
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Entry { key: Key, value: String, raw: String },
    /// Comments, blank lines and keys that are not ours
    Other(String),
}

fn parse_lines(contents: &str) -> Vec<Line> {
    contents.lines().map(parse_line).collect()
}

fn parse_line(raw: &str) -> Line {
    let other = || Line::Other(raw.to_string());
    let stripped = raw.trim();
    if stripped.is_empty() || stripped.starts_with('#') {
        return other();
    }
    let Some((key, value)) = stripped.split_once('=') else {
        return other();
    };
    let key = key.trim();
    let key = key.strip_prefix("export ").unwrap_or(key).trim();
    match Key::from_env_name(key) {
        Some(key) => Line::Entry {
            key,
            value: unquote(value.trim()),
            raw: raw.to_string(),
        },
        None => other(),
    }
}

/// Double quoted values may use `\\`, `\"`, `\n` and `\r`. Single quotes are literal
fn unquote(value: &str) -> String {
    if let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return unescape(inner);
    }
    value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(value)
        .to_string()
}

fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some(escaped @ ('\\' | '"')) => result.push(escaped),
            // Unknown escapes are kept, e.g. Windows paths written by hand
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Quotes the value when reading it back raw would change it
fn format_entry(key: Key, value: &str) -> String {
    let needs_quotes = value.trim() != value
        || value.starts_with(['"', '\''])
        || value.contains(['\n', '\r']);
    if !needs_quotes {
        return format!("{}={value}", key.env_name());
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    format!("{}=\"{escaped}\"", key.env_name())
}

/// Recognized, non-empty variables. The uppercase name wins over the lowercase one
fn env_values(vars: impl IntoIterator<Item = (String, String)>) -> BTreeMap<Key, String> {
    let mut upper = BTreeMap::new();
    let mut lower = BTreeMap::new();
    for (name, value) in vars {
        if value.is_empty() {
            continue;
        }
        let Some(key) = Key::from_env_name(&name) else {
            continue;
        };
        if name == key.env_name() {
            upper.insert(key, value);
        } else {
            lower.insert(key, value);
        }
    }
    lower.extend(upper);
    lower
}
