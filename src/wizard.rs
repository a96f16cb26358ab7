use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::debug;

use crate::config::{ConfigFile, ContactEntry, CredentialsEntry};

/// Asks the operator for every setting and writes the configuration file.
///
/// Returns the path written, or `None` if the operator declined to overwrite an existing file.
pub fn generate<R, W>(
    mut input: R,
    mut output: W,
    default_path: &Path,
) -> anyhow::Result<Option<PathBuf>>
where
    R: BufRead,
    W: Write,
{
    let mut ask = |prompt: &str| -> anyhow::Result<String> {
        write!(output, "{prompt}").context("Failed to write prompt")?;
        output.flush().context("Failed to flush prompt")?;
        let mut line = String::new();
        input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    };

    let answer = ask(&format!(
        "Location to store configuration file (default: ./{}): ",
        default_path.display()
    ))?;
    let path = if answer.trim().is_empty() {
        default_path.to_path_buf()
    } else {
        PathBuf::from(answer)
    };

    if path.exists() {
        let answer = ask("Configuration file exists, overwrite? (y/n): ")?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            debug!("Not overwriting {path:?}");
            return Ok(None);
        }
    }

    let file = ConfigFile {
        from: ContactEntry {
            name: ask("Enter \"From\" name:\t")?,
            email: ask("Enter \"From\" email:\t")?,
        },
        to: ContactEntry {
            name: ask("Enter \"To\" name:\t")?,
            email: ask("Enter \"To\" email:\t")?,
        },
        subject: ask("Enter subject:\t\t")?,
        server: ask("Enter SMTP server:\t")?,
        port: ask("Port:\t\t\t")?,
        credentials: CredentialsEntry {
            user: ask("Username:\t\t")?,
            password: ask("Password:\t\t")?,
        },
        logs: ask("Location of logs:\t")?,
        interval: ask("Interval:\t\t")?,
        reset: (ask("Reset log file? (y/n):\t")? == "y").to_string(),
    };

    let contents =
        serde_json::to_string_pretty(&file).context("Failed to serialize configuration")?;
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write configuration file {path:?}"))?;
    writeln!(output, "Configuration file generated: {}.", path.display())
        .context("Failed to write confirmation")?;
    Ok(Some(path))
}
