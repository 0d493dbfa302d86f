use async_trait::async_trait;
use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::Credentials,
        client::{AsyncSmtpConnection, TlsParameters},
        response::Response,
    },
    Address,
};

use super::Session;
use crate::{BoxError, ConnectionParameters, Options};

/// Session over lettre's tokio 1.x SMTP connection
///
/// Created disconnected; [`Session::connect`] opens the connection, using
/// implicit TLS when enabled, or an upgrade through `STARTTLS` when
/// [`Options::starttls`] is set on a plaintext connection.
#[allow(missing_debug_implementations)]
pub struct SmtpSession {
    server: String,
    port: u16,
    tls: bool,
    options: Options,
    connection: Option<AsyncSmtpConnection>,
}

impl SmtpSession {
    /// Creates a disconnected session for the given parameters
    pub fn new(parameters: &ConnectionParameters) -> Self {
        SmtpSession {
            server: parameters.host().to_owned(),
            port: parameters.effective_port(),
            tls: parameters.tls(),
            options: parameters.options().clone(),
            connection: None,
        }
    }

    /// Hostname of the server
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Port the session connects to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the session uses implicit TLS
    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn tls_parameters(&self) -> Result<TlsParameters, BoxError> {
        TlsParameters::builder(self.server.clone())
            .dangerous_accept_invalid_certs(self.options.get_accept_invalid_certs())
            .dangerous_accept_invalid_hostnames(self.options.get_accept_invalid_hostnames())
            .build()
            .map_err(Into::into)
    }

    #[cfg(not(any(feature = "native-tls", feature = "rustls-tls")))]
    fn tls_parameters(&self) -> Result<TlsParameters, BoxError> {
        Err("TLS requested, but no TLS backend feature is enabled".into())
    }
}

fn not_connected() -> BoxError {
    "session is not connected".into()
}

#[async_trait]
impl Session for SmtpSession {
    type Ok = Response;
    type Error = BoxError;

    async fn connect(&mut self) -> Result<(), BoxError> {
        if self.connection.is_some() {
            return Err("session is already connected".into());
        }

        let wrapper = if self.tls {
            Some(self.tls_parameters()?)
        } else {
            None
        };
        let upgrade = if !self.tls && self.options.get_starttls() {
            Some(self.tls_parameters()?)
        } else {
            None
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(server = %self.server, port = self.port, tls = self.tls, "connecting");

        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (self.server.as_str(), self.port),
            self.options.get_timeout(),
            self.options.get_hello_name(),
            wrapper,
            self.options.get_local_address(),
        )
        .await?;

        if let Some(tls_parameters) = upgrade {
            if let Err(err) = connection
                .starttls(tls_parameters, self.options.get_hello_name())
                .await
            {
                connection.abort().await;
                return Err(err.into());
            }
        }

        self.connection = Some(connection);
        Ok(())
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<(), BoxError> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        connection
            .auth(self.options.get_mechanisms(), credentials)
            .await?;
        Ok(())
    }

    async fn send_message(
        &mut self,
        message: &lettre::Message,
        sender: Option<&Address>,
        recipients: Option<&[Address]>,
    ) -> Result<Response, BoxError> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;

        let envelope = match (sender, recipients) {
            (None, None) => message.envelope().clone(),
            (sender, recipients) => Envelope::new(
                sender.or_else(|| message.envelope().from()).cloned(),
                recipients.unwrap_or_else(|| message.envelope().to()).to_vec(),
            )?,
        };
        let email = message.formatted();

        Ok(connection.send(&envelope, &email).await?)
    }

    async fn quit(&mut self) -> Result<(), BoxError> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        match connection.quit().await {
            Ok(_) => Ok(()),
            Err(err) => {
                connection.abort().await;
                Err(err.into())
            }
        }
    }

    fn close(&mut self) {
        self.connection = None;
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parameters(tls: bool) -> ConnectionParameters {
        ConnectionParameters::builder("smtp.example.com")
            .tls(tls)
            .build()
            .unwrap()
    }

    #[test]
    fn new_session_is_disconnected() {
        let session = SmtpSession::new(&parameters(true));
        assert_eq!(session.server(), "smtp.example.com");
        assert_eq!(session.port(), 465);
        assert!(session.tls());
        assert!(!session.is_connected());

        let session = SmtpSession::new(&parameters(false));
        assert_eq!(session.port(), 25);
        assert!(!session.tls());
    }

    #[tokio::test]
    async fn operations_require_a_connection() {
        let mut session = SmtpSession::new(&parameters(true));

        let credentials = Credentials::new("user".into(), "password".into());
        assert!(session.login(&credentials).await.is_err());

        let email = lettre::Message::builder()
            .from("user@example.com".parse().unwrap())
            .to("root@example.com".parse().unwrap())
            .body(String::from("hello"))
            .unwrap();
        assert!(session.send_message(&email, None, None).await.is_err());
    }

    #[tokio::test]
    async fn quit_without_connection_is_a_noop() {
        let mut session = SmtpSession::new(&parameters(false));
        session.quit().await.unwrap();
        assert!(!session.is_connected());
    }

    #[test]
    fn close_without_connection_is_a_noop() {
        let mut session = SmtpSession::new(&parameters(false));
        session.close();
        session.close();
        assert!(!session.is_connected());
    }
}
