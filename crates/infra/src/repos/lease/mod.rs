mod inmemory;
mod postgres;

pub use inmemory::InMemoryLeaseRepo;
pub use postgres::PostgresLeaseRepo;
use tenancy_reminders_domain::{Lease, LeaseStatus, ID};

#[async_trait::async_trait]
pub trait ILeaseRepo: Send + Sync {
    async fn insert(&self, lease: &Lease) -> anyhow::Result<()>;
    /// Leases of the client with the given status, most recently created first
    async fn find_by_client(&self, client_id: &ID, status: LeaseStatus)
        -> anyhow::Result<Vec<Lease>>;
}
