use super::{DeliveryError, IDeliveryChannel, MessageId};
use tracing::info;
use uuid::Uuid;

/// Dry run channel which only logs the messages it is asked to send
pub struct LogChannel {}

impl LogChannel {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl IDeliveryChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, destination: &str, body: &str) -> Result<MessageId, DeliveryError> {
        let message_id = MessageId(format!("log-{}", Uuid::new_v4()));
        info!(
            destination = destination,
            message_id = message_id.0.as_str(),
            "Reminder message: {}",
            body
        );
        Ok(message_id)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
