use aiomail::{ConnectionParameters, Message, Smtp};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let parameters = ConnectionParameters::builder("smtp.example.com")
        .port(465)
        .user("user@example.com")
        .password("password")
        .build()
        .unwrap();

    let mut message = Message::new("Sender <user@example.com>".parse().unwrap())
        .receiver("Receiver <user@example.com>".parse().unwrap())
        .subject("test")
        .text("test");

    // Connect and authenticate, send, then QUIT
    let mut smtp = Smtp::new(parameters);
    let result = smtp
        .scope(|smtp| {
            Box::pin(async move {
                smtp.send(&mut message, None, None).await?;
                Ok::<_, aiomail::Error>(())
            })
        })
        .await;

    match result {
        Ok(()) => println!("Email sent successfully!"),
        Err(e) => panic!("Could not send email: {e:?}"),
    }
}
