use super::{DeliveryError, DeliveryErrorKind, IDeliveryChannel, MessageId};
use crate::config::WhatsAppConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, warn};

/// Error codes of the WhatsApp Cloud API meaning the recipient can not be
/// reached, no matter how many times we try
const INVALID_RECIPIENT_CODES: [i64; 4] = [
    131026, // Message undeliverable
    131030, // Recipient phone number not in allowed list
    131009, // Parameter value is not valid
    131021, // Sender and recipient phone number are the same
];

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Sends text messages through the WhatsApp Business Cloud API
pub struct WhatsAppChannel {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn has_credentials(&self) -> bool {
        !self.config.access_token.trim().is_empty()
            && !self.config.phone_number_id.trim().is_empty()
    }
}

/// Maps a non success response of the API to a delivery error
fn classify_response(status: StatusCode, body: &str) -> DeliveryError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let code = parsed.as_ref().and_then(|res| res.error.code);
    let message = match &parsed {
        Some(res) if !res.error.message.is_empty() => match code {
            Some(code) => format!("{} ({}): {}", status, code, res.error.message),
            None => format!("{}: {}", status, res.error.message),
        },
        _ => format!("{}: {}", status, body),
    };

    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => DeliveryErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT => DeliveryErrorKind::Unknown,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryErrorKind::Unavailable,
        s if s.is_server_error() => DeliveryErrorKind::Unknown,
        s if s.is_client_error() => match code {
            Some(code) if INVALID_RECIPIENT_CODES.contains(&code) => {
                DeliveryErrorKind::InvalidDestination
            }
            _ => DeliveryErrorKind::Rejected,
        },
        _ => DeliveryErrorKind::Unknown,
    };
    DeliveryError::new(kind, message)
}

fn classify_request_error(e: reqwest::Error) -> DeliveryError {
    let kind = if e.is_timeout() {
        DeliveryErrorKind::Timeout
    } else if e.is_connect() {
        DeliveryErrorKind::Unavailable
    } else {
        DeliveryErrorKind::Unknown
    };
    DeliveryError::new(kind, e.to_string())
}

#[async_trait::async_trait]
impl IDeliveryChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, destination: &str, body: &str) -> Result<MessageId, DeliveryError> {
        if !self.has_credentials() {
            return Err(DeliveryError::new(
                DeliveryErrorKind::Unavailable,
                "WhatsApp credentials are not configured",
            ));
        }

        let to = destination.strip_prefix('+').unwrap_or(destination);
        let url = format!("{}/{}/messages", self.base_url(), self.config.phone_number_id);
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": body
            }
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = res.status();
        let text = res.text().await.map_err(classify_request_error)?;
        if !status.is_success() {
            let err = classify_response(status, &text);
            warn!("WhatsApp rejected message to {}: {}", destination, err);
            return Err(err);
        }

        match serde_json::from_str::<SendMessageResponse>(&text) {
            Ok(res) => match res.messages.into_iter().next() {
                Some(message) => Ok(MessageId(message.id)),
                None => Err(DeliveryError::new(
                    DeliveryErrorKind::Unknown,
                    format!("No message id in response: {}", text),
                )),
            },
            Err(e) => {
                error!("Unable to parse WhatsApp response: {}. Err: {:?}", text, e);
                Err(DeliveryError::new(
                    DeliveryErrorKind::Unknown,
                    format!("Unexpected response: {}", text),
                ))
            }
        }
    }

    async fn health_check(&self) -> bool {
        if !self.has_credentials() {
            return false;
        }
        let url = format!("{}/{}", self.base_url(), self.config.phone_number_id);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
        {
            Ok(res) => {
                if !res.status().is_success() {
                    warn!("WhatsApp health check returned status: {}", res.status());
                }
                res.status().is_success()
            }
            Err(e) => {
                warn!("WhatsApp health check failed. Err: {:?}", e);
                false
            }
        }
    }
}
