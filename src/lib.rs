//! aiomail is a small scoped SMTP client built on top of [lettre].
//!
//! It bundles three things that are otherwise repeated in every project sending
//! mail over a single authenticated SMTP session:
//!
//! * connection defaults, the port being derived from the encryption mode
//!   (465 with implicit TLS, 25 otherwise)
//! * a scoped lifecycle: connect and authenticate on entry, `QUIT` on exit
//! * a one call [`Smtp::send`] which prepares the message lazily before
//!   handing it to the SMTP connection
//!
//! Protocol work (command sequencing, TLS, authentication mechanisms, MIME encoding)
//! is done by lettre.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aiomail::{ConnectionParameters, Message, Smtp};
//!
//! # async fn run() -> Result<(), aiomail::Error> {
//! let parameters = ConnectionParameters::builder("smtp.example.com")
//!     .user("user@example.com")
//!     .password("password")
//!     .build()?;
//!
//! let mut smtp = Smtp::new(parameters);
//! smtp.scope(|smtp| {
//!     Box::pin(async move {
//!         let mut message = Message::new("Sender <user@example.com>".parse()?)
//!             .receiver("Receiver <user@example.com>".parse()?)
//!             .subject("test")
//!             .text("test");
//!
//!         smtp.send(&mut message, None, None).await?;
//!         Ok::<_, aiomail::Error>(())
//!     })
//! })
//! .await
//! # }
//! ```
//!
//! ## Feature flags
//!
//! * **native-tls** (default): TLS through the system library
//! * **rustls-tls**: TLS through rustls and the webpki roots
//! * **tracing** (default): log the session lifecycle with `tracing`
//! * **serde**: deserialize [`ConnectionParameters`] from configuration files
//!
//! [lettre]: https://docs.rs/lettre

#![doc(html_root_url = "https://docs.rs/aiomail/0.1.0")]
#![warn(missing_docs)]
#![deny(unsafe_code, unstable_features, rust_2018_idioms)]

mod client;
pub mod error;
pub mod message;
mod parameters;
pub mod session;

pub use lettre::{
    message::Mailbox,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        extension::ClientId,
        response::Response,
    },
    Address,
};

pub use crate::{
    client::Smtp,
    error::Error,
    message::{Mail, Message, Receiver, Sender},
    parameters::{ConnectionParameters, ConnectionParametersBuilder, Options},
    session::{Session, SmtpSession},
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default port for plaintext SMTP
pub const SMTP_PORT: u16 = 25;
/// Default port for submission over implicit TLS
pub const SUBMISSIONS_PORT: u16 = 465;
/// Default port for submission followed by `STARTTLS`
pub const SUBMISSION_PORT: u16 = 587;
