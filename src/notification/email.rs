use std::time::Duration;

use anyhow::Context;
use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
    },
    SmtpTransport, Transport,
};
use log::{debug, info};

use crate::{config::Config, notification::Message};

/// Upper bound on each SMTP connection and command
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Anything able to deliver a composed message to the configured recipient
pub trait Dispatch {
    fn send(&self, message: &Message) -> anyhow::Result<()>;
}

pub struct Email {
    transport: SmtpTransport,
    envelope: Envelope,
    relay: String,
}

impl Email {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let relay = format!("{}:{}", config.server, config.port);
        debug!("Setting up SMTP transport for {relay}");

        let tls = TlsParameters::new(config.server.clone())
            .with_context(|| format!("Failed to set up TLS parameters for {:?}", config.server))?;
        let transport = SmtpTransport::builder_dangerous(&config.server)
            .port(config.port)
            .tls(Tls::Opportunistic(tls))
            .credentials(Credentials::new(
                config.credentials.user.clone(),
                config.credentials.password.clone(),
            ))
            .authentication(vec![Mechanism::Plain])
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        let envelope = Envelope::new(Some(config.from.email.clone()), vec![config.to.email.clone()])
            .context("Failed to build SMTP envelope")?;

        Ok(Self {
            transport,
            envelope,
            relay,
        })
    }
}

impl Dispatch for Email {
    fn send(&self, message: &Message) -> anyhow::Result<()> {
        self.transport
            .send_raw(&self.envelope, &message.to_bytes())
            .with_context(|| format!("Failed to send email via {}", self.relay))?;
        info!("Email sent:\n{message}\n");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        sync::mpsc::{self, Receiver},
        thread,
    };

    use super::*;
    use crate::notification::message::tests::test_config;

    /// A local port with nothing listening on it
    pub(crate) fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn unreachable_server_is_an_error() {
        // Arrange
        let mut config = test_config();
        config.server = "127.0.0.1".to_string();
        config.port = closed_port();
        let email = Email::new(&config).unwrap();
        let message = Message::compose(&config, b"a\n");

        // Act
        let actual = email.send(&message);

        // Assert
        let err = actual.unwrap_err();
        assert!(format!("{err}").contains("127.0.0.1"));
    }

    /// Minimal SMTP server for a single session. Reports the commands received and the DATA
    /// payload as soon as the message is accepted.
    fn smtp_server() -> (u16, Receiver<(Vec<String>, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let mut commands = Vec::new();
            writer.write_all(b"220 localhost ESMTP\r\n").unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                let verb = line.split(' ').next().unwrap_or("").to_ascii_uppercase();
                commands.push(line);
                let reply = match verb.as_str() {
                    "EHLO" => writer.write_all(b"250-localhost\r\n250 AUTH PLAIN\r\n"),
                    "AUTH" => writer.write_all(b"235 2.7.0 Authentication successful\r\n"),
                    "DATA" => {
                        writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").unwrap();
                        let mut payload = Vec::new();
                        loop {
                            let mut data_line = Vec::new();
                            if reader.read_until(b'\n', &mut data_line).unwrap_or(0) == 0
                                || data_line == b".\r\n"
                            {
                                break;
                            }
                            payload.extend_from_slice(&data_line);
                        }
                        // CRLF before the final dot belongs to the terminator
                        payload.truncate(payload.len().saturating_sub(2));
                        let _ = tx.send((commands.clone(), payload));
                        writer.write_all(b"250 2.0.0 Ok: queued\r\n")
                    }
                    "QUIT" => {
                        let _ = writer.write_all(b"221 2.0.0 Bye\r\n");
                        break;
                    }
                    _ => writer.write_all(b"250 2.0.0 Ok\r\n"),
                };
                reply.unwrap();
            }
        });
        (port, rx)
    }

    #[test]
    fn delivers_raw_message() {
        // Arrange
        let (port, rx) = smtp_server();
        let mut config = test_config();
        config.server = "127.0.0.1".to_string();
        config.port = port;
        let email = Email::new(&config).unwrap();
        let message = Message::compose(&config, b"a\nb\n");

        // Act
        let actual = email.send(&message);

        // Assert
        assert!(actual.is_ok(), "{actual:?}");
        let (commands, payload) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(commands[0].starts_with("EHLO "), "{commands:?}");
        // PLAIN initial response is base64 of "\0server@example.com\0hunter2"
        assert_eq!(
            commands[1..],
            [
                "AUTH PLAIN AHNlcnZlckBleGFtcGxlLmNvbQBodW50ZXIy",
                "MAIL FROM:<server@example.com>",
                "RCPT TO:<ops@example.com>",
                "DATA",
            ]
        );
        assert_eq!(payload, message.to_bytes());
    }
}
