#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Compose HTML emails with attachments and deliver them over SMTP, either one
//! message per recipient or a single blind-copy message to the whole list.

pub mod domain;
pub mod infrastructure;

pub use domain::mail::{
    Draft, DraftBuilder, MailClient, RecipientKind, SendError, SendMode, SendReport, ServerConfig,
};
pub use infrastructure::email::smtp::SMTPConnector;
