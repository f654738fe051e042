use super::ILeaseRepo;
use crate::repos::shared::inmemory_repo::*;
use std::sync::Mutex;
use tenancy_reminders_domain::{Lease, LeaseStatus, ID};

pub struct InMemoryLeaseRepo {
    leases: Mutex<Vec<Lease>>,
}

impl InMemoryLeaseRepo {
    pub fn new() -> Self {
        Self {
            leases: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ILeaseRepo for InMemoryLeaseRepo {
    async fn insert(&self, lease: &Lease) -> anyhow::Result<()> {
        insert(lease, &self.leases);
        Ok(())
    }

    async fn find_by_client(
        &self,
        client_id: &ID,
        status: LeaseStatus,
    ) -> anyhow::Result<Vec<Lease>> {
        let mut leases = find_by(&self.leases, |l| l.client_id == *client_id && l.status == status);
        leases.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(leases)
    }
}
