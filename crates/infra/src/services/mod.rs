mod log_channel;
mod rate_limiter;
mod whatsapp;

use crate::config::ChannelConfig;
use std::{fmt::Display, sync::Arc, time::Duration};

pub use log_channel::LogChannel;
pub use rate_limiter::RateLimiter;
pub use whatsapp::WhatsAppChannel;

/// Id the channel assigned to an accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// The recipient does not exist or can not receive messages
    InvalidDestination,
    /// The channel refused the message and will keep refusing it
    Rejected,
    RateLimited,
    Timeout,
    /// Unclassified failure, retried conservatively
    Unknown,
    /// The channel can not be reached at all
    Unavailable,
}

impl DeliveryErrorKind {
    /// Retrying will never succeed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidDestination | Self::Rejected)
    }

    /// Affects every reminder, not just the one being sent
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDestination => "invalid-destination",
            Self::Rejected => "rejected",
            Self::RateLimited => "rate-limited",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub message: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            DeliveryErrorKind::Timeout,
            format!("No response within {} ms", after.as_millis()),
        )
    }
}

/// An outbound messaging channel. Sends can not be rolled back.
#[async_trait::async_trait]
pub trait IDeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, destination: &str, body: &str) -> Result<MessageId, DeliveryError>;
    /// Cheap probe telling whether the channel is reachable with the
    /// configured credentials
    async fn health_check(&self) -> bool;
}

pub fn create_channel(
    config: &ChannelConfig,
    request_timeout: Duration,
) -> anyhow::Result<Arc<dyn IDeliveryChannel>> {
    let channel: Arc<dyn IDeliveryChannel> = match config {
        ChannelConfig::Log => Arc::new(LogChannel::new()),
        ChannelConfig::WhatsApp(config) => {
            Arc::new(WhatsAppChannel::new(config.clone(), request_timeout)?)
        }
    };
    Ok(channel)
}
