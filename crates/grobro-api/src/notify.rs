use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outgoing email, shaped after the Mailgun message fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Sends notification emails.
pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>>;
}

/// Send `email` on a detached task. Failures are logged and dropped; the
/// caller's work is already committed by the time this runs.
pub fn dispatch(notifier: Arc<dyn Notifier>, email: Email) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&email).await {
            Ok(()) => debug!("Notification sent to {}", email.to),
            Err(e) => warn!("Failed to notify {}: {:#}", email.to, e),
        }
    })
}

/// Mailgun HTTP API sender.
pub struct Mailgun {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl Mailgun {
    pub fn new(api_key: String, domain: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build mail client")?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("https://api.mailgun.net/v3/{}/messages", domain),
        })
    }
}

impl Notifier for Mailgun {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.client
                .post(&self.endpoint)
                .basic_auth("api", Some(&self.api_key))
                .form(&[
                    ("from", email.from.as_str()),
                    ("to", email.to.as_str()),
                    ("subject", email.subject.as_str()),
                    ("text", email.text.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}

/// Used when no mail provider is configured: the email only shows up in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            info!("Mail disabled; would send \"{}\" to {}", email.subject, email.to);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Email>>,
    }

    impl Notifier for Recorder {
        fn send<'a>(&'a self, email: &'a Email) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(email.clone());
                Ok(())
            })
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn send<'a>(&'a self, _email: &'a Email) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(anyhow::anyhow!("smtp down")) })
        }
    }

    fn email() -> Email {
        Email {
            from: "GroBro <bot@grobro.test>".into(),
            to: "seller@example.com".into(),
            subject: "Someone is interested in buying your mangoes!".into(),
            text: "Are these still available?".into(),
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_email() {
        let recorder = Arc::new(Recorder::default());
        dispatch(recorder.clone(), email()).await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[email()]);
    }

    #[tokio::test]
    async fn dispatch_swallows_send_failure() {
        // The task must complete normally even when the provider errors.
        dispatch(Arc::new(Broken), email()).await.unwrap();
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send(&email()).await.is_ok());
    }
}
