mod inmemory;
mod postgres;

pub use inmemory::InMemoryPropertyRepo;
pub use postgres::PostgresPropertyRepo;
use tenancy_reminders_domain::{Property, Unit, ID};

#[async_trait::async_trait]
pub trait IPropertyRepo: Send + Sync {
    async fn insert_property(&self, property: &Property) -> anyhow::Result<()>;
    async fn insert_unit(&self, unit: &Unit) -> anyhow::Result<()>;
    async fn find(&self, property_id: &ID) -> Option<Property>;
    async fn find_unit(&self, unit_id: &ID) -> Option<Unit>;
}
