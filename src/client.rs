use std::{fmt, panic::AssertUnwindSafe};

use futures_util::{future::BoxFuture, FutureExt};
use lettre::Address;

use crate::{
    error::{self, Error},
    message::Mail,
    parameters::ConnectionParameters,
    session::{Session, SmtpSession},
};

/// Scoped SMTP client
///
/// Holds the [`ConnectionParameters`] and a disconnected [`Session`]. The
/// session is opened by [`Smtp::enter`] and closed by [`Smtp::exit`], or both
/// are done around a closure by [`Smtp::scope`].
///
/// Sends on one client are sequential: the session is a single SMTP
/// conversation. Use one client per task to send concurrently.
pub struct Smtp<S = SmtpSession> {
    parameters: ConnectionParameters,
    session: S,
    entered: bool,
}

impl Smtp<SmtpSession> {
    /// Creates a client backed by lettre's SMTP connection
    ///
    /// No i/o happens before [`Smtp::enter`].
    pub fn new(parameters: ConnectionParameters) -> Self {
        let session = SmtpSession::new(&parameters);
        Self::with_session(parameters, session)
    }

    /// Creates a client from a connection URL
    ///
    /// See [`ConnectionParameters::from_url`].
    pub fn from_url(connection_url: &str) -> Result<Self, Error> {
        ConnectionParameters::from_url(connection_url).map(Self::new)
    }
}

impl<S> Smtp<S>
where
    S: Session,
{
    /// Creates a client driving the given session
    pub fn with_session(parameters: ConnectionParameters, session: S) -> Self {
        Smtp {
            parameters,
            session,
            entered: false,
        }
    }

    /// Parameters of the client
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    /// Port the session connects to
    pub fn effective_port(&self) -> u16 {
        self.parameters.effective_port()
    }

    /// Underlying session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Whether the session is open
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// Opens the session and authenticates
    ///
    /// Authentication only happens when a user is configured. If it fails, the
    /// connection is closed before the error is returned.
    pub async fn enter(&mut self) -> Result<&mut Self, Error> {
        if self.entered {
            return Err(error::validation("session is already open"));
        }

        self.session.connect().await.map_err(error::connection)?;

        if let Some(credentials) = self.parameters.credentials() {
            #[cfg(feature = "tracing")]
            tracing::debug!(user = ?self.parameters.user(), "authenticating");

            if let Err(err) = self.session.login(&credentials).await {
                if let Err(_quit) = self.session.quit().await {
                    #[cfg(feature = "tracing")]
                    {
                        let _quit: crate::BoxError = _quit.into();
                        tracing::debug!(
                            error = %_quit,
                            "failed to close session after login failure"
                        );
                    }
                }
                return Err(error::authentication(err));
            }
        }

        self.entered = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            host = self.parameters.host(),
            port = self.parameters.effective_port(),
            "session open"
        );
        Ok(self)
    }

    /// Closes the session
    ///
    /// Only the first call after a successful [`Smtp::enter`] sends `QUIT`,
    /// any other call does nothing.
    pub async fn exit(&mut self) -> Result<(), Error> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;

        #[cfg(feature = "tracing")]
        tracing::debug!(host = self.parameters.host(), "closing session");

        self.session.quit().await.map_err(error::disconnection)
    }

    /// Runs `body` inside an open session
    ///
    /// The session is closed whatever the outcome of `body`, including a
    /// panic, which resumes once the session is closed. An error from `body`
    /// takes precedence over an error closing the session.
    ///
    /// If the returned future is dropped before completion, the session is
    /// closed without `QUIT` through [`Session::close`] and the client can be
    /// entered again.
    ///
    /// ```rust,no_run
    /// # use aiomail::{ConnectionParameters, Message, Smtp};
    /// # async fn run(mut smtp: Smtp, mut message: Message) -> Result<(), aiomail::Error> {
    /// smtp.scope(|smtp| Box::pin(async move {
    ///     smtp.send(&mut message, None, None).await?;
    ///     Ok::<_, aiomail::Error>(())
    /// }))
    /// .await
    /// # }
    /// ```
    pub async fn scope<F, R, E>(&mut self, body: F) -> Result<R, E>
    where
        F: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, Result<R, E>>,
        E: From<Error>,
    {
        let mut guard = ScopeGuard {
            smtp: self,
            armed: true,
        };

        if let Err(err) = guard.smtp.enter().await {
            guard.armed = false;
            return Err(err.into());
        }

        let outcome = AssertUnwindSafe(body(&mut *guard.smtp))
            .catch_unwind()
            .await;
        let exited = guard.smtp.exit().await;
        guard.armed = false;

        match outcome {
            Err(panic) => std::panic::resume_unwind(panic),
            Ok(Err(err)) => {
                if let Err(_exit) = exited {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_exit, "failed to close session");
                }
                Err(err)
            }
            Ok(Ok(value)) => {
                exited?;
                Ok(value)
            }
        }
    }

    /// Sends a message through the open session
    ///
    /// The message is prepared first if it isn't yet. `sender` and `receivers`
    /// are handed to the session as they are; when unset, the session uses the
    /// envelope of the prepared message.
    ///
    /// Fails without any i/o if the session isn't open, `receivers` is an
    /// empty override, or the message can't be prepared.
    pub async fn send<M>(
        &mut self,
        message: &mut M,
        sender: Option<&Address>,
        receivers: Option<&[Address]>,
    ) -> Result<S::Ok, Error>
    where
        M: Mail + ?Sized,
    {
        if !self.entered {
            return Err(error::validation("session is not open"));
        }
        if receivers.is_some_and(<[Address]>::is_empty) {
            return Err(error::validation("empty receiver override"));
        }

        if !message.is_prepared() {
            message.prepare()?;
        }
        let email = message
            .prepared()
            .ok_or_else(|| error::validation("message has no transmittable representation"))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sender = ?sender.map(ToString::to_string),
            receivers = ?receivers.map(|r| r.len()),
            "sending message"
        );

        self.session
            .send_message(email, sender, receivers)
            .await
            .map_err(error::transmission)
    }
}

impl<S> fmt::Debug for Smtp<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Smtp")
            .field("parameters", &self.parameters)
            .field("entered", &self.entered)
            .finish_non_exhaustive()
    }
}

/// Closes the session of a [`Smtp::scope`] future dropped before completion
struct ScopeGuard<'a, S: Session> {
    smtp: &'a mut Smtp<S>,
    armed: bool,
}

impl<S: Session> Drop for ScopeGuard<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            host = self.smtp.parameters.host(),
            "scope cancelled, closing session without QUIT"
        );

        self.smtp.entered = false;
        self.smtp.session.close();
    }
}

impl<S> Drop for Smtp<S> {
    fn drop(&mut self) {
        if self.entered {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                host = self.parameters.host(),
                "client dropped with an open session, closing without QUIT"
            );
        }
    }
}
