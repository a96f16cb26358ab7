use std::{
    fmt::{Debug, Display},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use lettre::Address;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Interval;

/// Settings for one run of the mailer. Validated once at load and never changed afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub from: Contact,
    pub to: Contact,
    pub subject: String,

    /// SMTP server hostname, also used as the TLS and AUTH domain
    pub server: String,
    pub port: u16,
    pub credentials: SmtpCredentials,

    /// The log file being watched
    pub log_path: PathBuf,

    /// Time between checks of the log file
    pub interval: Interval,

    /// If true the log file is emptied after it has been sent successfully
    pub reset: bool,
}

impl Config {
    pub fn load_from(config_path: &Path) -> anyhow::Result<Config> {
        debug!("Loading Config from: {config_path:?}");
        let file_contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read contents of {config_path:?}"))?;
        let file: ConfigFile = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse contents of {config_path:?}"))?;
        let result = Config::try_from(file)
            .with_context(|| format!("Invalid configuration in {config_path:?}"))?;
        debug!("Config loaded: {result:?}");
        Ok(result)
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = anyhow::Error;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        Ok(Self {
            from: file.from.try_into().context("Invalid \"from\" contact")?,
            to: file.to.try_into().context("Invalid \"to\" contact")?,
            subject: file.subject,
            port: file
                .port
                .trim()
                .parse()
                .with_context(|| format!("Invalid port {:?}", file.port))?,
            server: file.server,
            credentials: SmtpCredentials {
                user: file.credentials.user,
                password: file.credentials.password,
            },
            log_path: PathBuf::from(file.logs),
            interval: file.interval.parse()?,
            reset: parse_flag(&file.reset)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: Address,
}

impl Display for Contact {
    /// Formats as `"name" <email>`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" <{}>", self.name, self.email)
    }
}

impl TryFrom<ContactEntry> for Contact {
    type Error = anyhow::Error;

    fn try_from(entry: ContactEntry) -> Result<Self, Self::Error> {
        let email = entry
            .email
            .trim()
            .parse()
            .with_context(|| format!("Invalid email address {:?}", entry.email))?;
        Ok(Self {
            name: entry.name,
            email,
        })
    }
}

#[derive(Clone)]
pub struct SmtpCredentials {
    pub user: String,
    pub password: String,
}

impl Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Accepts the same spellings as a boolean flag on the command line of most tools
fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => bail!("Invalid value for \"reset\": {other:?}, expected \"true\" or \"false\""),
    }
}

/// On disk layout of the configuration file
///
/// Every scalar is stored as text. Numbers and booleans are also accepted when reading.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub from: ContactEntry,
    pub to: ContactEntry,
    #[serde(deserialize_with = "scalar_as_string")]
    pub subject: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub server: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub port: String,
    pub credentials: CredentialsEntry,
    #[serde(deserialize_with = "scalar_as_string")]
    pub logs: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub interval: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub reset: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ContactEntry {
    #[serde(deserialize_with = "scalar_as_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct CredentialsEntry {
    #[serde(deserialize_with = "scalar_as_string")]
    pub user: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}
