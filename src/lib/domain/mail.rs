//! Mail composition and delivery.

mod client;
mod config;
mod credential;
mod draft;
mod message;
mod template;
mod transport;

pub mod errors;

pub use client::{MailClient, SendMode, SendReport};
pub use config::ServerConfig;
pub use credential::Credential;
pub use draft::{Draft, DraftBuilder, RecipientKind, UnknownRecipientKind};
pub use errors::{
    AttachmentError, ComposeError, SendError, TemplateError, TransportError, ValidationError,
};
pub use template::{fill_placeholders, read_mistagged_utf8};
pub use transport::{Connector, Session};
