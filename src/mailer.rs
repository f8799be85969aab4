use anyhow::Context;
use axum::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::MailConfig;

/// Outbound mail seam. The SMTP implementation is the production one; tests
/// substitute recording or failing implementations.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Self> {
        let sender = cfg
            .default_sender
            .as_deref()
            .context("MAIL_DEFAULT_SENDER or MAIL_USERNAME must be set")?
            .parse::<Mailbox>()
            .context("invalid sender address")?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.server).port(cfg.port);
        if cfg.use_tls {
            let tls = TlsParameters::new(cfg.server.clone()).context("build TLS parameters")?;
            builder = builder.tls(Tls::Required(tls));
        }
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        let transport = builder
            .pool_config(PoolConfig::new().max_size(1))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(to.parse::<Mailbox>().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")?;

        self.transport.send(email).await.context("smtp send")?;
        debug!(to = %to, "email sent");
        Ok(())
    }
}

/// Mailer that drops messages on the floor. Backs `AppState::fake()`.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        debug!(to = %to, "noop mailer: dropping email");
        Ok(())
    }
}

pub const RESET_EMAIL_SUBJECT: &str = "Password Reset Request";

pub fn reset_email_body(reset_url: &str) -> String {
    format!(
        "To reset your password, visit the following link:\n\
        \n\
        {}\n\
        \n\
        This link is valid for 1 hour.\n\
        \n\
        If you did not make this request, please ignore this email.\n",
        reset_url
    )
}
