mod inmemory;
mod postgres;

pub use inmemory::InMemoryClientRepo;
pub use postgres::PostgresClientRepo;
use tenancy_reminders_domain::{Client, ID};

#[async_trait::async_trait]
pub trait IClientRepo: Send + Sync {
    async fn insert(&self, client: &Client) -> anyhow::Result<()>;
    async fn find(&self, client_id: &ID) -> Option<Client>;
    /// The oldest client whose stored phone equals one of `phones`
    async fn find_by_phones(&self, phones: &[String]) -> anyhow::Result<Option<Client>>;
}
