use std::{borrow::Cow, fmt::Display};

use chrono::{DateTime, Local, TimeZone};

use crate::config::Config;

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const CONTAINER_OPEN: &str = "<div style=\"font-family: monospace;background: #ecf0f1;padding: 20px;border-radius: 9px;font-size: 150%;margin: 30px;\">";
const LINE_BREAK: &str = "<br>";
const FOOTER_PREFIX: &str =
    "<br><br>Generated by <a href=\"https://github.com/muhammadmuzzammil1998/Log-mailer\">Log Mailer</a> on ";
const CONTAINER_CLOSE: &str = "</div>";

/// Content-Type rides along as a second line under the MIME-Version entry
const MIME_VALUE: &str = "1.0\r\nContent-Type: text/html; charset=\"UTF-8\"";

/// A fully composed email, headers plus HTML body
///
/// The body is kept as bytes so log content that is not valid UTF-8 reaches the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: [(&'static str, String); 4],
    body: Vec<u8>,
}

impl Message {
    /// Composes the message stamped with the current local time
    pub fn compose(config: &Config, snapshot: &[u8]) -> Self {
        Self::compose_at(config, snapshot, &Local::now())
    }

    pub fn compose_at<Tz>(config: &Config, snapshot: &[u8], sent_at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let headers = [
            ("From", config.from.to_string()),
            ("To", config.to.to_string()),
            ("Subject", config.subject.clone()),
            ("MIME-Version", MIME_VALUE.to_string()),
        ];

        // HTML is passed through as is
        let mut body = Vec::with_capacity(snapshot.len() + 512);
        body.extend_from_slice(CONTAINER_OPEN.as_bytes());
        for line in split_lines(snapshot) {
            body.extend_from_slice(line);
            body.extend_from_slice(LINE_BREAK.as_bytes());
        }
        body.extend_from_slice(FOOTER_PREFIX.as_bytes());
        body.extend_from_slice(sent_at.format(TIMESTAMP_FORMAT).to_string().as_bytes());
        body.extend_from_slice(CONTAINER_CLOSE.as_bytes());

        Self { headers, body }
    }

    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as text, invalid UTF-8 replaced. Use [`Message::to_bytes`] for what is sent.
    pub fn body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Bytes handed to the SMTP server as the DATA payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.body.len() + 256);
        for (name, value) in self.headers.iter() {
            result.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Splits on `\n`, dropping a `\r` before it and the empty piece after a final newline
fn split_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let pieces = if bytes.is_empty() { None } else { Some(trimmed) };
    pieces
        .into_iter()
        .flat_map(|text| text.split(|b| *b == b'\n'))
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}
