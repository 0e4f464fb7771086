//! Minimal blocking IMAP4rev1 client.
//!
//! Only the commands the reader needs: LOGIN, SELECT, SEARCH UNSEEN,
//! FETCH RFC822, CLOSE and LOGOUT. Generic over the stream so the
//! production path can run over rustls and tests over an in-memory script.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::MailboxError;

/// Largest literal we accept from the server (50 MiB).
const MAX_LITERAL_BYTES: usize = 50 * 1024 * 1024;

/// The TLS stream used in production.
pub type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// One untagged response line plus any literals embedded in it.
#[derive(Debug, Clone, Default)]
pub struct ResponseLine {
    pub text: String,
    pub literals: Vec<Vec<u8>>,
}

/// Everything the server sent for one tagged command.
#[derive(Debug, Clone)]
pub struct Response {
    pub untagged: Vec<ResponseLine>,
    /// Tagged completion line with the tag stripped, e.g. `OK SEARCH completed`.
    pub status: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status
            .split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("OK"))
    }
}

/// An authenticated-or-not IMAP session over any byte stream.
pub struct ImapSession<S: Read + Write> {
    stream: BufReader<S>,
    tag_counter: u32,
}

impl ImapSession<TlsStream> {
    /// Open an implicit-TLS connection and read the server greeting.
    ///
    /// `read_timeout` of `None` leaves the socket's blocking default in place.
    pub fn connect_tls(
        host: &str,
        port: u16,
        read_timeout: Option<Duration>,
    ) -> Result<Self, MailboxError> {
        let tcp = TcpStream::connect((host, port)).map_err(|e| MailboxError::Connect {
            host: host.to_string(),
            port,
            reason: e.to_string(),
        })?;
        if read_timeout.is_some() {
            tcp.set_read_timeout(read_timeout)?;
        }

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| MailboxError::Tls(format!("invalid server name {host}: {e}")))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| MailboxError::Tls(e.to_string()))?;

        Self::greet(rustls::StreamOwned::new(conn, tcp))
    }
}

impl<S: Read + Write> ImapSession<S> {
    /// Wrap an established stream and consume the `* OK` greeting.
    pub fn greet(stream: S) -> Result<Self, MailboxError> {
        let mut session = Self {
            stream: BufReader::new(stream),
            tag_counter: 0,
        };
        let greeting = session.read_line()?;
        let upper = greeting.to_ascii_uppercase();
        if !(upper.starts_with("* OK") || upper.starts_with("* PREAUTH")) {
            return Err(MailboxError::Greeting(greeting));
        }
        debug!(greeting = %greeting, "IMAP connected");
        Ok(session)
    }

    /// Access the underlying stream (tests inspect what was written).
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn login(&mut self, username: &str, password: &SecretString) -> Result<(), MailboxError> {
        let command = format!(
            "LOGIN {} {}",
            quote(username),
            quote(password.expose_secret())
        );
        let response = self.command(&command)?;
        if !response.is_ok() {
            return Err(MailboxError::AuthFailed {
                username: username.to_string(),
                response: response.status,
            });
        }
        Ok(())
    }

    pub fn select(&mut self, mailbox: &str) -> Result<(), MailboxError> {
        self.command_ok("SELECT", &format!("SELECT {}", quote(mailbox)))
            .map(|_| ())
    }

    /// Sequence numbers of messages without `\Seen`, in server order.
    pub fn search_unseen(&mut self) -> Result<Vec<u32>, MailboxError> {
        let response = self.command_ok("SEARCH", "SEARCH UNSEEN")?;
        let mut ids = Vec::new();
        for line in &response.untagged {
            let mut words = line.text.split_whitespace();
            if words.next() == Some("*")
                && words.next().is_some_and(|w| w.eq_ignore_ascii_case("SEARCH"))
            {
                for word in words {
                    let id = word.parse().map_err(|_| {
                        MailboxError::Protocol(format!("bad SEARCH result: {}", line.text))
                    })?;
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Full RFC 822 form of one message. Servers set `\Seen` as a side effect.
    pub fn fetch_rfc822(&mut self, id: u32) -> Result<Vec<u8>, MailboxError> {
        let response = self.command_ok("FETCH", &format!("FETCH {id} RFC822"))?;
        response
            .untagged
            .into_iter()
            .filter(|line| line.text.to_ascii_uppercase().contains("FETCH"))
            .find_map(|line| line.literals.into_iter().next())
            .ok_or_else(|| MailboxError::Protocol(format!("FETCH {id} returned no message body")))
    }

    /// Leave the selected mailbox.
    pub fn close(&mut self) -> Result<(), MailboxError> {
        self.command_ok("CLOSE", "CLOSE").map(|_| ())
    }

    /// End the session. The server may answer `* BYE` and hang up.
    pub fn logout(&mut self) -> Result<(), MailboxError> {
        self.command_ok("LOGOUT", "LOGOUT").map(|_| ())
    }

    fn command_ok(&mut self, name: &str, command: &str) -> Result<Response, MailboxError> {
        let response = self.command(command)?;
        if response.is_ok() {
            Ok(response)
        } else {
            Err(MailboxError::CommandFailed {
                command: name.to_string(),
                response: response.status,
            })
        }
    }

    /// Send one tagged command and collect responses up to its completion.
    pub fn command(&mut self, command: &str) -> Result<Response, MailboxError> {
        self.tag_counter += 1;
        let tag = format!("A{:04}", self.tag_counter);
        let stream = self.stream.get_mut();
        stream.write_all(format!("{tag} {command}\r\n").as_bytes())?;
        stream.flush()?;

        let mut untagged = Vec::new();
        loop {
            let line = self.read_response_line()?;
            if let Some(status) = line
                .text
                .strip_prefix(tag.as_str())
                .and_then(|rest| rest.strip_prefix(' '))
            {
                return Ok(Response {
                    untagged,
                    status: status.to_string(),
                });
            }
            untagged.push(line);
        }
    }

    /// Read one logical response line, pulling in `{N}` literals as they appear.
    fn read_response_line(&mut self) -> Result<ResponseLine, MailboxError> {
        let mut line = ResponseLine::default();
        loop {
            let chunk = self.read_line()?;
            match literal_len(&chunk) {
                Some(len) => {
                    if len > MAX_LITERAL_BYTES {
                        return Err(MailboxError::Protocol(format!(
                            "literal of {len} bytes exceeds limit"
                        )));
                    }
                    let mut literal = vec![0u8; len];
                    self.stream.read_exact(&mut literal)?;
                    line.text.push_str(&chunk);
                    line.literals.push(literal);
                }
                None => {
                    line.text.push_str(&chunk);
                    return Ok(line);
                }
            }
        }
    }

    /// Read one CRLF-terminated line, without the terminator.
    fn read_line(&mut self) -> Result<String, MailboxError> {
        let mut buf = Vec::new();
        let n = self.stream.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(MailboxError::Protocol("IMAP connection closed".into()));
        }
        let text = String::from_utf8_lossy(&buf);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Size of a trailing `{N}` literal marker, if the line ends with one.
fn literal_len(line: &str) -> Option<usize> {
    let open = line.strip_suffix('}')?.rfind('{')?;
    line[open + 1..line.len() - 1].parse().ok()
}

/// IMAP quoted string.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
