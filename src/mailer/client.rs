//! HTTP client for a Resend-style email API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{MailError, Mailer, OutgoingEmail};

pub struct EmailClient {
    base_url: String,
    api_key: String,
    from: String,
    http_client: Client,
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    bcc: &'a [String],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(base_url: &str, api_key: &str, from: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            http_client,
        }
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: &str,
        from: &str,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(base_url, api_key, from, http_client))
    }

    /// Bare sender address, without the display name.
    fn from_address(&self) -> &str {
        match (self.from.find('<'), self.from.rfind('>')) {
            (Some(start), Some(end)) if start < end => &self.from[start + 1..end],
            _ => self.from.as_str(),
        }
    }
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        // Recipients go in bcc so subscribers do not see each other.
        let body = SendEmailBody {
            from: &self.from,
            to: [self.from_address()],
            bcc: &email.recipients,
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(recipients = email.recipients.len(), "Email accepted for delivery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            recipients: vec!["a@example.fr".to_string(), "b@example.fr".to_string()],
            subject: "Nouveautés".to_string(),
            html: "<p>Bonjour</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_single_call_with_all_recipients() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("Authorization", "Bearer re_test"))
            .and(body_json(json!({
                "from": "Pâtisserie <news@example.fr>",
                "to": ["news@example.fr"],
                "bcc": ["a@example.fr", "b@example.fr"],
                "subject": "Nouveautés",
                "html": "<p>Bonjour</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmailClient::new(
            &server.uri(),
            "re_test",
            "Pâtisserie <news@example.fr>",
            Client::new(),
        );
        client.send(&email()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let client = EmailClient::new(&server.uri(), "re_test", "news@example.fr", Client::new());
        let err = client.send(&email()).await.unwrap_err();
        assert!(matches!(err, MailError::Api { status: 422, .. }));
    }

    #[test]
    fn test_from_address() {
        let client = EmailClient::new("http://x", "k", "Pâtisserie <news@example.fr>", Client::new());
        assert_eq!(client.from_address(), "news@example.fr");
        let client = EmailClient::new("http://x", "k", "news@example.fr", Client::new());
        assert_eq!(client.from_address(), "news@example.fr");
    }
}
