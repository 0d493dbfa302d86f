//! The SMTP session driven by [`Smtp`](crate::Smtp)
//!
//! [`Smtp`](crate::Smtp) never speaks SMTP itself: it calls a [`Session`] in the
//! order connect, login, send, quit. [`SmtpSession`] is the implementation
//! backed by lettre's async connection.

use async_trait::async_trait;
use lettre::{transport::smtp::authentication::Credentials, Address};

pub use self::smtp::SmtpSession;

mod smtp;

/// A single stateful SMTP session
///
/// Errors are returned as the implementation produces them; the scoped client
/// keeps them as the source of its own [`Error`](crate::Error).
#[async_trait]
pub trait Session: Send {
    /// Response produced by a successful send
    type Ok: Send;
    /// Error produced by the session
    type Error: Into<Box<dyn std::error::Error + Send + Sync>>;

    /// Opens the connection, including any TLS negotiation
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Authenticates on an open connection
    async fn login(&mut self, credentials: &Credentials) -> Result<(), Self::Error>;

    /// Transmits a prepared message
    ///
    /// `sender` and `recipients`, when given, are used for the envelope instead
    /// of the addresses derived from the message headers.
    async fn send_message(
        &mut self,
        message: &lettre::Message,
        sender: Option<&Address>,
        recipients: Option<&[Address]>,
    ) -> Result<Self::Ok, Self::Error>;

    /// Closes the connection
    async fn quit(&mut self) -> Result<(), Self::Error>;

    /// Drops the connection without `QUIT`
    ///
    /// Used where awaiting isn't possible, such as when a scope is cancelled.
    /// Must leave the session able to connect again.
    fn close(&mut self);
}
