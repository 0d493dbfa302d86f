//! Messages accepted by [`Smtp::send`](crate::Smtp::send)
//!
//! Anything implementing [`Mail`] can be sent. [`Message`] is a plain data
//! struct rendered with lettre's message builder the first time it is
//! prepared; a [`lettre::Message`] is already rendered.

use lettre::message::{
    header::{ContentType, HeaderName, HeaderValue},
    Attachment, Mailbox, MultiPart, SinglePart,
};

use crate::{error, Error};

/// Identity of the author of a message
pub type Sender = Mailbox;
/// Identity of a recipient of a message
pub type Receiver = Mailbox;

/// A message which can be rendered into its transmittable form
pub trait Mail {
    /// Whether [`Mail::prepare`] already produced the transmittable representation
    fn is_prepared(&self) -> bool;

    /// Renders the transmittable representation
    ///
    /// Fails when the message can't be rendered, for example when it has no
    /// recipient.
    fn prepare(&mut self) -> Result<(), Error>;

    /// The transmittable representation, once prepared
    fn prepared(&self) -> Option<&lettre::Message>;
}

impl Mail for lettre::Message {
    fn is_prepared(&self) -> bool {
        true
    }

    fn prepare(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn prepared(&self) -> Option<&lettre::Message> {
        Some(self)
    }
}

#[derive(Clone, Debug)]
struct AttachmentData {
    filename: String,
    content_type: ContentType,
    content: Vec<u8>,
}

enum Body {
    Single(SinglePart),
    Multi(MultiPart),
}

/// An email, rendered lazily
///
/// Every setter discards a previous rendering, so a prepared message always
/// matches its fields.
///
/// ```rust
/// use aiomail::{Mail, Message};
///
/// # fn main() -> Result<(), aiomail::Error> {
/// let mut message = Message::new("Sender <user@example.com>".parse()?)
///     .receiver("Receiver <user@example.com>".parse()?)
///     .subject("test")
///     .text("test");
/// assert!(!message.is_prepared());
///
/// message.prepare()?;
/// assert!(message.is_prepared());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    sender: Sender,
    receivers: Vec<Receiver>,
    cc: Vec<Receiver>,
    bcc: Vec<Receiver>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    headers: Vec<(String, String)>,
    attachments: Vec<AttachmentData>,
    prepared: Option<lettre::Message>,
}

impl Message {
    /// Creates an empty message from `sender`
    pub fn new(sender: Sender) -> Self {
        Message {
            sender,
            receivers: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: None,
            text: None,
            html: None,
            headers: Vec::new(),
            attachments: Vec::new(),
            prepared: None,
        }
    }

    /// Add a `To` recipient
    pub fn receiver(mut self, receiver: Receiver) -> Self {
        self.receivers.push(receiver);
        self.reset()
    }

    /// Add several `To` recipients
    pub fn receivers<I: IntoIterator<Item = Receiver>>(mut self, receivers: I) -> Self {
        self.receivers.extend(receivers);
        self.reset()
    }

    /// Add a `Cc` recipient
    pub fn cc(mut self, receiver: Receiver) -> Self {
        self.cc.push(receiver);
        self.reset()
    }

    /// Add a `Bcc` recipient
    pub fn bcc(mut self, receiver: Receiver) -> Self {
        self.bcc.push(receiver);
        self.reset()
    }

    /// Add a `Reply-To` mailbox
    pub fn reply_to(mut self, mailbox: Mailbox) -> Self {
        self.reply_to.push(mailbox);
        self.reset()
    }

    /// Set the `Subject` header
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self.reset()
    }

    /// Set the plain text body
    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self.reset()
    }

    /// Set the html body
    ///
    /// With a text body too, both are sent as `multipart/alternative`.
    pub fn html<S: Into<String>>(mut self, html: S) -> Self {
        self.html = Some(html.into());
        self.reset()
    }

    /// Add a custom header
    ///
    /// The name must be printable ASCII without `:`, which is checked when
    /// the message is prepared.
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self.reset()
    }

    /// Attach a file
    pub fn attach<S: Into<String>>(
        mut self,
        filename: S,
        content_type: ContentType,
        content: Vec<u8>,
    ) -> Self {
        self.attachments.push(AttachmentData {
            filename: filename.into(),
            content_type,
            content,
        });
        self.reset()
    }

    /// Author of the message
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// `To` recipients
    pub fn get_receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    /// Subject, if any
    pub fn get_subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Rendered message, once prepared
    pub fn formatted(&self) -> Option<Vec<u8>> {
        self.prepared.as_ref().map(lettre::Message::formatted)
    }

    fn reset(mut self) -> Self {
        self.prepared = None;
        self
    }

    fn body(&self) -> Body {
        let content = match (&self.text, &self.html) {
            (Some(text), Some(html)) => Body::Multi(MultiPart::alternative_plain_html(
                text.clone(),
                html.clone(),
            )),
            (None, Some(html)) => Body::Single(SinglePart::html(html.clone())),
            (text, None) => Body::Single(SinglePart::plain(text.clone().unwrap_or_default())),
        };

        if self.attachments.is_empty() {
            return content;
        }

        let mut mixed = match content {
            Body::Single(part) => MultiPart::mixed().singlepart(part),
            Body::Multi(part) => MultiPart::mixed().multipart(part),
        };
        for attachment in &self.attachments {
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), attachment.content_type.clone()),
            );
        }
        Body::Multi(mixed)
    }
}

impl Mail for Message {
    fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    fn prepare(&mut self) -> Result<(), Error> {
        let mut builder = lettre::Message::builder().from(self.sender.clone());

        for receiver in &self.receivers {
            builder = builder.to(receiver.clone());
        }
        for receiver in &self.cc {
            builder = builder.cc(receiver.clone());
        }
        for receiver in &self.bcc {
            builder = builder.bcc(receiver.clone());
        }
        for mailbox in &self.reply_to {
            builder = builder.reply_to(mailbox.clone());
        }
        if let Some(ref subject) = self.subject {
            builder = builder.subject(subject.clone());
        }
        for (name, value) in &self.headers {
            let name = HeaderName::new_from_ascii(name.clone())
                .map_err(|e| error::validation(format!("invalid header name: {e}")))?;
            builder = builder.raw_header(HeaderValue::new(name, value.clone()));
        }

        let message = match self.body() {
            Body::Single(part) => builder.singlepart(part),
            Body::Multi(part) => builder.multipart(part),
        }
        .map_err(error::validation)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            from = %self.sender,
            recipients = message.envelope().to().len(),
            "message prepared"
        );

        self.prepared = Some(message);
        Ok(())
    }

    fn prepared(&self) -> Option<&lettre::Message> {
        self.prepared.as_ref()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn message() -> Message {
        Message::new("Sender <user@example.com>".parse().unwrap())
            .receiver("Receiver <user@example.com>".parse().unwrap())
            .subject("test")
            .text("test")
    }

    fn rendered(message: &Message) -> String {
        String::from_utf8(message.formatted().unwrap()).unwrap()
    }

    #[test]
    fn prepare_renders_headers() {
        let mut message = message();
        assert!(!message.is_prepared());
        assert!(message.formatted().is_none());

        message.prepare().unwrap();
        assert!(message.is_prepared());

        let email = rendered(&message);
        assert!(email.contains("Subject: test"));
        assert!(email.contains("user@example.com"));
        assert!(email.contains("Content-Type: text/plain"));
    }

    #[test]
    fn envelope_comes_from_headers() {
        let mut message = message()
            .cc("cc@example.com".parse().unwrap())
            .bcc("bcc@example.com".parse().unwrap());
        message.prepare().unwrap();

        let envelope = message.prepared().unwrap().envelope();
        assert_eq!(
            envelope.from().map(ToString::to_string),
            Some("user@example.com".to_owned())
        );
        let to: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
        assert_eq!(
            to,
            vec!["user@example.com", "cc@example.com", "bcc@example.com"]
        );
        assert!(!rendered(&message).contains("bcc@example.com"));
    }

    #[test]
    fn setters_discard_preparation() {
        let mut message = message();
        message.prepare().unwrap();
        assert!(message.is_prepared());

        let message = message.subject("updated");
        assert!(!message.is_prepared());
        assert_eq!(message.get_subject(), Some("updated"));
    }

    #[test]
    fn receivers_keep_insertion_order() {
        let message = message().receiver("Second <second@example.com>".parse().unwrap());

        let receivers: Vec<String> = message
            .get_receivers()
            .iter()
            .map(|receiver| receiver.email.to_string())
            .collect();
        assert_eq!(receivers, ["user@example.com", "second@example.com"]);
    }

    #[test]
    fn missing_receivers_is_a_validation_error() {
        let mut message = Message::new("user@example.com".parse().unwrap()).text("hello");

        let err = message.prepare().unwrap_err();
        assert!(err.is_validation());
        assert!(!message.is_prepared());
    }

    #[test]
    fn text_and_html_are_alternatives() {
        let mut message = message().html("<p>test</p>");
        message.prepare().unwrap();

        let email = rendered(&message);
        assert!(email.contains("multipart/alternative"));
        assert!(email.contains("text/html"));
    }

    #[test]
    fn attachments_make_a_mixed_message() {
        let mut message = message().attach(
            "notes.txt",
            ContentType::TEXT_PLAIN,
            b"meeting at noon".to_vec(),
        );
        message.prepare().unwrap();

        let email = rendered(&message);
        assert!(email.contains("multipart/mixed"));
        assert!(email.contains("notes.txt"));
    }

    #[test]
    fn custom_headers() {
        let mut message = message().header("X-Campaign", "spring");
        message.prepare().unwrap();
        assert!(rendered(&message).contains("X-Campaign: spring"));

        let mut message = message.header("Bad Name", "value");
        assert!(message.prepare().unwrap_err().is_validation());
    }

    #[test]
    fn lettre_messages_are_prepared() {
        let mut email = lettre::Message::builder()
            .from("user@example.com".parse().unwrap())
            .to("root@example.com".parse().unwrap())
            .body(String::from("hello"))
            .unwrap();

        assert!(email.is_prepared());
        email.prepare().unwrap();
        assert!(Mail::prepared(&email).is_some());
    }
}
