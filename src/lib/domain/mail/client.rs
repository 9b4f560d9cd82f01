//! Mail client

use std::fmt;

use lettre::message::Mailbox;
use tracing::{debug, info, warn};

use crate::{
    domain::mail::{
        draft::LoadedAttachment,
        message::{compose, envelope, mailbox, Addressing},
        transport::Connection,
        Connector, Draft, SendError, ServerConfig, Session, TransportError,
    },
    infrastructure::email::smtp::SMTPConnector,
};

/// How a draft is delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
    /// One message per recipient, each addressed only to that recipient
    Individual,

    /// One message to every recipient, all of them in `Bcc`
    Bcc,
}

/// The recipients whose delivery could not be confirmed by one send
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendReport {
    failed: Vec<String>,
}

impl SendReport {
    /// Whether every recipient was accepted
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The failed recipients, in the order they were attempted
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    fn record(&mut self, recipient: &str) {
        self.failed.push(recipient.to_string());
    }
}

impl IntoIterator for SendReport {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.failed.into_iter()
    }
}

impl fmt::Display for SendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.failed.join(", "))
    }
}

/// Sends drafts through the server described by its [`ServerConfig`]
#[derive(Debug)]
pub struct MailClient<C: Connector> {
    config: ServerConfig,
    connector: C,
}

impl MailClient<SMTPConnector> {
    /// Create a client that talks SMTP
    pub fn smtp(config: ServerConfig) -> Self {
        Self::new(config, SMTPConnector::default())
    }
}

impl<C: Connector> MailClient<C> {
    /// Create a client over any connector
    pub fn new(config: ServerConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// The server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Send `draft` using `mode`.
    ///
    /// # Arguments
    /// * `draft` - The message to send. It is left untouched, so sending it
    ///   again resends the same content.
    /// * `mode` - See [`SendMode`].
    ///
    /// # Returns
    /// A [`SendReport`] of recipients that failed individually, or a
    /// [`SendError`] if the whole send was aborted. Nothing touches the
    /// network when validation or attachment reading fails.
    pub fn send(&self, draft: &Draft, mode: SendMode) -> Result<SendReport, SendError> {
        draft.validate()?;

        let attachments = draft.load_attachments()?;
        let sender = mailbox(self.config.address())?;

        info!(
            ?mode,
            recipients = draft.recipients().count(),
            attachments = attachments.len(),
            "sending draft"
        );

        let mut connection = Connection::open(&self.connector, &self.config)?;

        let report = match mode {
            SendMode::Individual => {
                self.send_individually(&mut connection, &sender, draft, &attachments)?
            }
            SendMode::Bcc => send_blind(&mut *connection, &sender, draft, &attachments)?,
        };

        if report.is_success() {
            info!("all recipients accepted");
        } else {
            warn!(failed = %report, "some recipients were not accepted");
        }

        Ok(report)
    }

    fn send_individually(
        &self,
        connection: &mut Connection<C::Session>,
        sender: &Mailbox,
        draft: &Draft,
        attachments: &[LoadedAttachment],
    ) -> Result<SendReport, SendError> {
        let mut report = SendReport::default();
        let mut broken = false;

        for recipient in draft.recipients() {
            let addressed = mailbox(recipient).and_then(|to| {
                let envelope = envelope(sender, std::slice::from_ref(&to))?;
                Ok((to, envelope))
            });

            let (to, envelope) = match addressed {
                Ok(addressed) => addressed,
                Err(e) => {
                    warn!(recipient, error = %e, "skipping recipient");
                    report.record(recipient);
                    continue;
                }
            };

            let message = compose(
                sender,
                Addressing::Single(&to),
                envelope,
                draft.subject(),
                draft.body(),
                attachments,
            )?;

            // A rejection can leave the server side closed; later recipients
            // get a fresh session.
            if broken {
                debug!(recipient, "reconnecting after a broken session");
                *connection = Connection::open(&self.connector, &self.config)?;
                broken = false;
            }

            match connection.send(message.envelope(), &message.formatted()) {
                Ok(()) => debug!(recipient, "message accepted"),
                Err(e) => {
                    warn!(recipient, error = %e, "message rejected");
                    report.record(recipient);
                    broken = connection.is_broken();
                }
            }
        }

        Ok(report)
    }
}

fn send_blind<S: Session>(
    session: &mut S,
    sender: &Mailbox,
    draft: &Draft,
    attachments: &[LoadedAttachment],
) -> Result<SendReport, SendError> {
    let recipients = draft
        .recipients()
        .map(mailbox)
        .collect::<Result<Vec<_>, TransportError>>()?;

    if recipients.is_empty() {
        debug!("no recipients, nothing to send");
        return Ok(SendReport::default());
    }

    let message = compose(
        sender,
        Addressing::Blind(&recipients),
        envelope(sender, &recipients)?,
        draft.subject(),
        draft.body(),
        attachments,
    )?;

    session.send(message.envelope(), &message.formatted())?;
    debug!(recipients = recipients.len(), "blind copy accepted");

    Ok(SendReport::default())
}
