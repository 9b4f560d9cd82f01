//! Transport seam between the send loop and the wire

use std::ops::{Deref, DerefMut};

use lettre::address::Envelope;
use tracing::debug;

#[cfg(test)]
use mockall::mock;

use crate::domain::mail::{ServerConfig, TransportError};

/// An open, authenticated connection to a mail server
pub trait Session {
    /// Submit one serialized message for the envelope's recipients.
    ///
    /// # Arguments
    /// * `envelope` - The sender and recipients given to the server.
    /// * `message` - The formatted RFC 5322 message.
    ///
    /// # Returns
    /// [`Ok`] when the server accepted the message, otherwise a
    /// [`TransportError`] describing the rejection.
    fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<(), TransportError>;

    /// Whether the session can no longer be used, typically because the
    /// server side tore it down after rejecting a message.
    fn is_broken(&self) -> bool;

    /// Release the connection. Called exactly once, by [`Connection`].
    fn close(&mut self);
}

/// Opens sessions against the server described by a [`ServerConfig`]
pub trait Connector {
    /// The session type this connector produces
    type Session: Session;

    /// Connect, upgrade to TLS when configured, and authenticate.
    ///
    /// # Returns
    /// An authenticated session, or a [`TransportError`] if connecting or
    /// authenticating failed.
    fn connect(&self, config: &ServerConfig) -> Result<Self::Session, TransportError>;
}

#[cfg(test)]
mock! {
    pub Session {}

    impl Session for Session {
        fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<(), TransportError>;
        fn is_broken(&self) -> bool;
        fn close(&mut self);
    }
}

#[cfg(test)]
mock! {
    pub Connector {}

    impl Connector for Connector {
        type Session = MockSession;

        fn connect(&self, config: &ServerConfig) -> Result<MockSession, TransportError>;
    }
}

/// A session held for the length of a scope.
///
/// Dropping the guard closes the session, so every exit path releases it.
#[derive(Debug)]
pub(crate) struct Connection<S: Session> {
    session: S,
}

impl<S: Session> Connection<S> {
    /// Acquire a session from `connector`
    pub(crate) fn open<C>(connector: &C, config: &ServerConfig) -> Result<Self, TransportError>
    where
        C: Connector<Session = S>,
    {
        debug!(host = config.host(), port = config.port(), "opening connection");

        Ok(Self {
            session: connector.connect(config)?,
        })
    }
}

impl<S: Session> Deref for Connection<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> DerefMut for Connection<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!("closing connection");
        self.session.close();
    }
}
