//! MIME message assembly

use std::error::Error as StdError;

use lettre::{
    address::Envelope,
    message::{
        header::{ContentTransferEncoding, ContentType, Header, HeaderName, HeaderValue},
        Attachment, Body, Mailbox, MultiPart, SinglePart,
    },
    Address, Message,
};

use crate::domain::mail::{draft::LoadedAttachment, ComposeError, TransportError};

const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Visible `To` header for blind-copy messages, written as an empty RFC 5322
/// group so the real recipients stay hidden.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UndisclosedRecipients;

impl UndisclosedRecipients {
    const VALUE: &'static str = "Undisclosed recipients:;";
}

impl Header for UndisclosedRecipients {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("To")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if s.trim() == Self::VALUE {
            Ok(Self)
        } else {
            Err(format!("not an undisclosed recipients group: {s}").into())
        }
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), Self::VALUE.to_string())
    }
}

/// Who a message is addressed to in its headers
#[derive(Debug)]
pub(crate) enum Addressing<'a> {
    /// A single visible recipient
    Single(&'a Mailbox),

    /// Every recipient in `Bcc`, with an undisclosed-recipients `To`
    Blind(&'a [Mailbox]),
}

/// Parse an address for use as a header mailbox
pub(crate) fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .trim()
        .parse()
        .map_err(|e| TransportError::InvalidAddress(format!("{address}: {e}")))
}

/// Build the SMTP envelope for `recipients`
pub(crate) fn envelope(sender: &Mailbox, recipients: &[Mailbox]) -> Result<Envelope, TransportError> {
    let to: Vec<Address> = recipients.iter().map(|m| m.email.clone()).collect();

    Envelope::new(Some(sender.email.clone()), to)
        .map_err(|e| TransportError::InvalidAddress(e.to_string()))
}

/// Assemble a `multipart/mixed` message with one HTML part followed by every
/// attachment, base64 encoded.
pub(crate) fn compose(
    sender: &Mailbox,
    addressing: Addressing<'_>,
    envelope: Envelope,
    subject: &str,
    html: &str,
    attachments: &[LoadedAttachment],
) -> Result<Message, ComposeError> {
    let mut builder = Message::builder()
        .from(sender.clone())
        .subject(subject)
        .envelope(envelope);

    builder = match addressing {
        Addressing::Single(recipient) => builder.to(recipient.clone()),
        Addressing::Blind(recipients) => recipients
            .iter()
            .fold(builder.header(UndisclosedRecipients), |b, r| b.bcc(r.clone())),
    };

    let content_type = ContentType::parse(ATTACHMENT_CONTENT_TYPE)?;

    let mut multipart = MultiPart::mixed().singlepart(SinglePart::html(html.to_string()));

    for attachment in attachments {
        let body = Body::new_with_encoding(attachment.content.clone(), ContentTransferEncoding::Base64)
            .map_err(|_| ComposeError::Encoding(attachment.filename.clone()))?;

        multipart = multipart.singlepart(
            Attachment::new(attachment.filename.clone()).body(body, content_type.clone()),
        );
    }

    Ok(builder.multipart(multipart)?)
}
