//! SMTP server configuration

use std::{num::ParseIntError, time::Duration};

use clap::Parser;

use crate::domain::mail::Credential;

/// Connection and authentication parameters for the outgoing mail server.
///
/// Immutable once built; the `with_*` methods return a new value. Nothing is
/// validated here, a bad host or port only shows up when connecting.
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
pub struct ServerConfig {
    /// The SMTP host
    #[arg(long = "smtp-host", env = "SMTP_HOST")]
    host: String,

    /// The SMTP port
    #[arg(long = "smtp-port", env = "SMTP_PORT", default_value_t = 587)]
    port: u16,

    /// The account address, used to log in and as the sender
    #[arg(long = "smtp-address", env = "SMTP_ADDRESS")]
    address: String,

    /// The account password
    #[arg(long = "smtp-password", env = "SMTP_PASSWORD", hide_env_values = true)]
    credential: Credential,

    /// Upgrade the connection with STARTTLS when the server offers it
    #[arg(
        long = "smtp-use-tls",
        env = "SMTP_USE_TLS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    use_tls: bool,

    /// Verify the server's TLS certificate
    #[arg(
        long = "smtp-verify-tls",
        env = "SMTP_VERIFY_TLS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    verify_tls: bool,

    /// Network timeout in seconds for connecting, reading and writing
    #[arg(
        long = "smtp-timeout",
        env = "SMTP_TIMEOUT",
        default_value = "30",
        value_parser = parse_seconds
    )]
    timeout: Duration,
}

fn parse_seconds(raw: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_secs(raw.parse()?))
}

impl ServerConfig {
    /// Default network timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new configuration with encryption and certificate
    /// verification enabled.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        address: impl Into<String>,
        credential: impl Into<Credential>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            address: address.into(),
            credential: credential.into(),
            use_tls: true,
            verify_tls: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Load the configuration from `SMTP_*` environment variables, reading a
    /// `.env` file first when one exists.
    pub fn from_env() -> Result<Self, clap::Error> {
        dotenvy::dotenv().ok();

        Self::try_parse_from([env!("CARGO_PKG_NAME")])
    }

    /// Enable or disable the STARTTLS upgrade
    #[must_use]
    pub fn with_tls(self, use_tls: bool) -> Self {
        Self { use_tls, ..self }
    }

    /// Enable or disable certificate verification
    #[must_use]
    pub fn with_verify_tls(self, verify_tls: bool) -> Self {
        Self { verify_tls, ..self }
    }

    /// Set the network timeout
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// The SMTP host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The SMTP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The account address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The account credential
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Whether to upgrade to TLS after connecting
    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Whether to verify the server certificate
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// The network timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
