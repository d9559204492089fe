//! Plaintext SMTP delivery through `lettre`.

use std::time::Duration;

use lettre::{Message, SmtpTransport, Transport};

use crate::core::errors::{DgmError, Result};
use crate::mail::MailTransport;

/// Port used when the server string does not carry one.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Unauthenticated, unencrypted SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpMailTransport {
    timeout: Option<Duration>,
}

impl Default for SmtpMailTransport {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SmtpMailTransport {
    /// Transport with the default 30 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-command network timeout. `None` waits forever.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl MailTransport for SmtpMailTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn deliver(&self, server: &str, message: &Message) -> Result<()> {
        let (host, port) = parse_server(server)?;
        let mailer = SmtpTransport::builder_dangerous(host)
            .port(port)
            .timeout(self.timeout)
            .build();
        mailer.send(message)?;
        Ok(())
    }
}

/// Split `host`, `host:port`, `[v6]` or `[v6]:port`. A bare address with
/// several colons is an IPv6 host on the default port.
pub fn parse_server(server: &str) -> Result<(&str, u16)> {
    let server = server.trim();
    let invalid = |details: String| DgmError::Mail {
        context: "server",
        details,
    };
    let parse_port = |port: &str| {
        port.parse::<u16>()
            .map_err(|err| invalid(format!("bad port in {server:?}: {err}")))
    };

    let (host, port) = if let Some(bracketed) = server.strip_prefix('[') {
        let Some((host, rest)) = bracketed.split_once(']') else {
            return Err(invalid(format!("unclosed '[' in {server:?}")));
        };
        match rest {
            "" => (host, DEFAULT_SMTP_PORT),
            _ => match rest.strip_prefix(':') {
                Some(port) => (host, parse_port(port)?),
                None => return Err(invalid(format!("junk after ']' in {server:?}"))),
            },
        }
    } else if server.matches(':').count() > 1 {
        (server, DEFAULT_SMTP_PORT)
    } else {
        match server.split_once(':') {
            Some((host, port)) => (host, parse_port(port)?),
            None => (server, DEFAULT_SMTP_PORT),
        }
    };

    if host.is_empty() {
        return Err(invalid(format!("no host in {server:?}")));
    }
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn server_without_port_uses_default() {
        assert_eq!(parse_server("mail.local").unwrap(), ("mail.local", 25));
        assert_eq!(parse_server(" mail.local:2525 ").unwrap(), ("mail.local", 2525));
    }

    #[test]
    fn ipv6_servers_keep_their_colons() {
        assert_eq!(parse_server("::1").unwrap(), ("::1", 25));
        assert_eq!(parse_server("[::1]").unwrap(), ("::1", 25));
        assert_eq!(parse_server("[fe80::2]:2525").unwrap(), ("fe80::2", 2525));
        assert!(parse_server("[::1").is_err());
        assert!(parse_server("[::1]2525").is_err());
        assert!(parse_server("[]:25").is_err());
    }

    #[test]
    fn malformed_server_is_rejected() {
        assert!(parse_server("mail.local:smtp").is_err());
        assert!(parse_server(":25").is_err());
        assert!(parse_server("").is_err());
    }

    /// Minimal SMTP peer: accepts one message and returns its DATA section.
    fn fake_relay() -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            writer.write_all(b"220 fake ESMTP\r\n").unwrap();

            let mut data = String::new();
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let command = line.trim_end().to_ascii_uppercase();
                if command.starts_with("EHLO") || command.starts_with("HELO") {
                    writer.write_all(b"250 fake\r\n").unwrap();
                } else if command.starts_with("DATA") {
                    writer.write_all(b"354 go ahead\r\n").unwrap();
                    loop {
                        line.clear();
                        reader.read_line(&mut line).unwrap();
                        if line.trim_end() == "." {
                            break;
                        }
                        data.push_str(&line);
                    }
                    writer.write_all(b"250 queued\r\n").unwrap();
                } else if command.starts_with("QUIT") {
                    writer.write_all(b"221 bye\r\n").unwrap();
                    break;
                } else {
                    writer.write_all(b"250 ok\r\n").unwrap();
                }
            }
            data
        });
        (port, handle)
    }

    #[test]
    fn delivers_over_plain_smtp() {
        let (port, relay) = fake_relay();
        let message = crate::mail::MailMessage::new(
            "dgm.lib@localhost",
            vec!["ops@example.com".to_string()],
            "relay check",
            "hello relay",
        )
        .build()
        .unwrap();

        SmtpMailTransport::new()
            .with_timeout(Some(Duration::from_secs(5)))
            .deliver(&format!("127.0.0.1:{port}"), &message)
            .unwrap();

        let data = relay.join().unwrap();
        assert!(data.contains("Subject: relay check"));
        assert!(data.contains("hello relay"));
    }

    #[test]
    fn refused_connection_is_mail_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let message = crate::mail::MailMessage::new("a@b.c", vec!["d@e.f".into()], "s", "b")
            .build()
            .unwrap();
        let err = SmtpMailTransport::new()
            .deliver(&format!("127.0.0.1:{port}"), &message)
            .unwrap_err();
        assert_eq!(err.code(), "DGM-3001");
    }
}
