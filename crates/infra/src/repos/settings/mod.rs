mod inmemory;
mod postgres;

pub use inmemory::InMemorySettingsRepo;
pub use postgres::PostgresSettingsRepo;

pub const PAYMENT_OFFSETS_SETTING: &str = "payment_reminder_offsets";
pub const CONTRACT_EXPIRY_OFFSETS_SETTING: &str = "contract_expiry_reminder_offsets";

/// Key value settings editable by staff in the property system
#[async_trait::async_trait]
pub trait ISettingsRepo: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
}
