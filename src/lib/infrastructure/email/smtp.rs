//! SMTP connector implementation

use std::fmt;

use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{SmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use tracing::{debug, warn};

use crate::domain::mail::{Connector, ServerConfig, Session, TransportError};

const MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Opens blocking SMTP sessions with lettre
#[derive(Debug, Clone, Default)]
pub struct SMTPConnector {
    hello_name: ClientId,
}

impl SMTPConnector {
    /// Create a connector that introduces itself as `hello_name` in EHLO
    pub fn new(hello_name: ClientId) -> Self {
        Self { hello_name }
    }

    fn tls_parameters(config: &ServerConfig) -> Result<TlsParameters, TransportError> {
        TlsParameters::builder(config.host().to_string())
            .dangerous_accept_invalid_certs(!config.verify_tls())
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))
    }
}

impl Connector for SMTPConnector {
    type Session = SMTPSession;

    #[mutants::skip]
    fn connect(&self, config: &ServerConfig) -> Result<SMTPSession, TransportError> {
        let connection = SmtpConnection::connect(
            (config.host(), config.port()),
            Some(config.timeout()),
            &self.hello_name,
            None,
            None,
        )
        .map_err(|e| TransportError::Connection(e.to_string()))?;

        // Wrapped straight away so a failed upgrade or login still closes it.
        let mut session = SMTPSession { connection };

        if config.use_tls() {
            if session.connection.can_starttls() {
                session
                    .connection
                    .starttls(&Self::tls_parameters(config)?, &self.hello_name)
                    .map_err(|e| TransportError::Connection(e.to_string()))?;
                debug!(host = config.host(), "connection upgraded to TLS");
            } else {
                warn!(host = config.host(), "server does not offer STARTTLS");
            }
        }

        let credentials = Credentials::new(
            config.address().to_string(),
            config.credential().expose().to_string(),
        );

        session
            .connection
            .auth(MECHANISMS, &credentials)
            .map_err(|e| TransportError::Authentication(e.to_string()))?;

        debug!(account = config.address(), "authenticated");

        Ok(session)
    }
}

/// An authenticated SMTP connection
pub struct SMTPSession {
    connection: SmtpConnection,
}

impl fmt::Debug for SMTPSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SMTPSession")
            .field("encrypted", &self.connection.is_encrypted())
            .finish()
    }
}

impl Session for SMTPSession {
    #[mutants::skip]
    fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<(), TransportError> {
        self.connection
            .send(envelope, message)
            .map(|response| debug!(code = %response.code(), "message accepted"))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn is_broken(&self) -> bool {
        self.connection.has_broken()
    }

    #[mutants::skip]
    fn close(&mut self) {
        if let Err(e) = self.connection.quit() {
            debug!(error = %e, "QUIT failed");
        }
    }
}

impl Drop for SMTPSession {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::{TcpListener, TcpStream},
        sync::{Arc, Mutex},
        thread,
        time::Duration,
    };

    use testresult::TestResult;

    use crate::domain::mail::{Draft, MailClient, RecipientKind, SendMode};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Answers one client like a plain-text server that accepts any login
    /// and refuses `rejected` at `RCPT TO`, logging every command line.
    fn serve(stream: TcpStream, rejected: &str, log: &Log) -> std::io::Result<()> {
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);

        writer.write_all(b"220 localhost ESMTP\r\n")?;

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }

            let command = line.trim_end().to_string();
            if let Ok(mut log) = log.lock() {
                log.push(command.clone());
            }

            let upper = command.to_ascii_uppercase();
            let reply: &[u8] = if upper.starts_with("EHLO") {
                b"250-localhost\r\n250 AUTH PLAIN LOGIN\r\n"
            } else if upper.starts_with("AUTH") {
                b"235 2.7.0 accepted\r\n"
            } else if upper.starts_with("RCPT") && command.contains(rejected) {
                b"550 5.1.1 no such user\r\n"
            } else if upper == "DATA" {
                writer.write_all(b"354 go ahead\r\n")?;
                loop {
                    line.clear();
                    if reader.read_line(&mut line)? == 0 || line == ".\r\n" {
                        break;
                    }
                }
                b"250 2.0.0 queued\r\n"
            } else if upper == "QUIT" {
                writer.write_all(b"221 bye\r\n")?;
                return Ok(());
            } else {
                b"250 ok\r\n"
            };

            writer.write_all(reply)?;
        }
    }

    fn fake_server(rejected: &'static str) -> TestResult<(u16, Log)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let log = Log::default();

        let server_log = Arc::clone(&log);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let _ = serve(stream, rejected, &server_log);
            }
        });

        Ok((port, log))
    }

    #[test]
    fn test_rejected_recipient_does_not_stop_individual_batch() -> TestResult {
        let (port, log) = fake_server("two@example.com")?;

        let config = ServerConfig::new("127.0.0.1", port, "me@example.com", "secret")
            .with_tls(false)
            .with_timeout(Duration::from_secs(5));

        let draft = Draft::builder()
            .set_subject("Reunión de equipo")
            .set_body("<h1>Agenda</h1>")
            .add_recipients(
                ["one@example.com", "two@example.com", "three@example.com"],
                RecipientKind::To,
            )
            .build();

        let report = MailClient::smtp(config).send(&draft, SendMode::Individual)?;

        assert_eq!(report.failed(), ["two@example.com"]);

        let log = log.lock().map_err(|e| e.to_string())?.clone();
        assert!(log.iter().any(|c| c == "RCPT TO:<three@example.com>"));
        assert_eq!(log.iter().filter(|c| *c == "DATA").count(), 2);

        Ok(())
    }

    #[test]
    fn test_connect_to_closed_port_is_a_connection_error() -> TestResult {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?.port()
        };

        let config = ServerConfig::new("127.0.0.1", port, "me@example.com", "secret")
            .with_timeout(Duration::from_secs(2));

        let result = SMTPConnector::default().connect(&config);

        assert!(matches!(result, Err(TransportError::Connection(_))));

        Ok(())
    }

    #[test]
    fn test_tls_parameters_build_for_host() {
        let config = ServerConfig::new("smtp.example.com", 587, "me@example.com", "secret")
            .with_verify_tls(false);

        assert!(SMTPConnector::tls_parameters(&config).is_ok());
    }
}
