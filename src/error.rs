//! Error and result type for the scoped SMTP client

use std::{error::Error as StdError, fmt};

use crate::BoxError;

// Same layout as lettre's SMTP error: a boxed kind plus the collaborator's error as source.

/// The errors that may occur while managing a session or sending a message
///
/// Failures coming from the SMTP connection are kept untouched as the
/// [`source`](StdError::source) of the error, and can be downcast to
/// [`lettre::transport::smtp::Error`].
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the error was raised locally, before any network i/o
    pub fn is_validation(&self) -> bool {
        matches!(self.inner.kind, Kind::Validation)
    }

    /// Returns true if the connection to the server could not be established
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if the server rejected the credentials
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if the message could not be transmitted
    pub fn is_transmission(&self) -> bool {
        matches!(self.inner.kind, Kind::Transmission)
    }

    /// Returns true if closing the session failed
    pub fn is_disconnection(&self) -> bool {
        matches!(self.inner.kind, Kind::Disconnection)
    }

    /// Returns true if the error is caused by a timeout
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
                return io_err.kind() == std::io::ErrorKind::TimedOut;
            }
            if let Some(smtp_err) = err.downcast_ref::<lettre::transport::smtp::Error>() {
                if smtp_err.is_timeout() {
                    return true;
                }
            }

            source = err.source();
        }

        false
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Rejected locally, nothing was written to the network
    Validation,
    /// Connect, TLS handshake or greeting failed
    Connection,
    /// AUTH failed
    Authentication,
    /// MAIL, RCPT or DATA failed
    Transmission,
    /// QUIT failed
    Disconnection,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("aiomail::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Validation => f.write_str("validation error")?,
            Kind::Connection => f.write_str("connection error")?,
            Kind::Authentication => f.write_str("authentication error")?,
            Kind::Transmission => f.write_str("transmission error")?,
            Kind::Disconnection => f.write_str("disconnection error")?,
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

impl From<lettre::address::AddressError> for Error {
    fn from(err: lettre::address::AddressError) -> Self {
        validation(err)
    }
}

pub(crate) fn validation<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Validation, Some(e))
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, Some(e))
}

pub(crate) fn authentication<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Authentication, Some(e))
}

pub(crate) fn transmission<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transmission, Some(e))
}

pub(crate) fn disconnection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Disconnection, Some(e))
}
