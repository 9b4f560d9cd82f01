//! Error types for composing and sending mail

use std::{io, path::PathBuf, string::FromUtf8Error};

use lettre::message::header::ContentTypeErr;
use thiserror::Error;

/// A draft is missing something required before it can be sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The subject is empty
    #[error("you must add a subject to the email")]
    MissingSubject,

    /// The body is empty
    #[error("you must add content to the email")]
    MissingBody,
}

/// A template could not be turned into a body
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be read
    #[error("could not read template {path}")]
    Unreadable {
        /// The template path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The template bytes are not valid UTF-8
    #[error("template {path} is not valid UTF-8")]
    InvalidUtf8 {
        /// The template path
        path: PathBuf,
        /// The underlying decoding error
        #[source]
        source: FromUtf8Error,
    },
}

/// An attachment could not be read
#[derive(Debug, Error)]
#[error("could not read attachment {path}")]
pub struct AttachmentError {
    /// The attachment path
    pub path: PathBuf,

    /// The underlying I/O error
    #[source]
    pub source: io::Error,
}

/// The mail server could not be reached, refused us, or rejected a message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection or TLS upgrade failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server did not accept the message
    #[error("send failed: {0}")]
    Send(String),

    /// An address could not be used on the envelope
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A MIME message could not be assembled
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The message builder rejected the message
    #[error(transparent)]
    Build(#[from] lettre::error::Error),

    /// A content type could not be parsed
    #[error(transparent)]
    ContentType(#[from] ContentTypeErr),

    /// An attachment could not be encoded
    #[error("could not encode attachment {0}")]
    Encoding(String),
}

/// Errors that abort a send
#[derive(Debug, Error)]
pub enum SendError {
    /// The draft is incomplete
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An attachment could not be read
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// The transport failed for the whole batch
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The message could not be assembled
    #[error(transparent)]
    Compose(#[from] ComposeError),
}
