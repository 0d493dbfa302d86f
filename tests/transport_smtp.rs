// Needs an SMTP server accepting plaintext sessions on 127.0.0.1:2525
#[cfg(test)]
mod test {
    use aiomail::{ConnectionParameters, Mail, Message, Smtp};

    fn parameters() -> ConnectionParameters {
        ConnectionParameters::builder("127.0.0.1")
            .port(2525)
            .tls(false)
            .build()
            .unwrap()
    }

    fn message() -> Message {
        Message::new("user@localhost".parse().unwrap())
            .receiver("root@localhost".parse().unwrap())
            .subject("Hello")
            .text("Hello ß☺ example")
    }

    #[tokio::test]
    #[ignore = "needs an SMTP server on 127.0.0.1:2525"]
    async fn smtp_session_simple() {
        let mut smtp = Smtp::new(parameters());
        let mut message = message();

        smtp.enter().await.unwrap();
        let response = smtp.send(&mut message, None, None).await.unwrap();
        smtp.exit().await.unwrap();

        assert!(response.is_positive());
        assert!(message.is_prepared());
    }

    #[tokio::test]
    #[ignore = "needs an SMTP server on 127.0.0.1:2525"]
    async fn smtp_session_several_messages() {
        let mut smtp = Smtp::new(parameters());

        smtp.scope(|smtp| {
            Box::pin(async move {
                for i in 0..3 {
                    let mut message = message().subject(format!("Hello {i}"));
                    smtp.send(&mut message, None, None).await?;
                }
                Ok::<_, aiomail::Error>(())
            })
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn refused_connection() {
        // nothing listens on the discard port
        let parameters = ConnectionParameters::builder("127.0.0.1")
            .port(9)
            .tls(false)
            .build()
            .unwrap();
        let mut smtp = Smtp::new(parameters);

        let err = smtp.enter().await.unwrap_err();
        assert!(err.is_connection());
        assert!(!smtp.is_entered());
    }
}
