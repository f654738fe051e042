use super::IClientRepo;
use crate::repos::shared::inmemory_repo::*;
use std::sync::Mutex;
use tenancy_reminders_domain::{Client, ID};

pub struct InMemoryClientRepo {
    clients: Mutex<Vec<Client>>,
}

impl InMemoryClientRepo {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IClientRepo for InMemoryClientRepo {
    async fn insert(&self, client: &Client) -> anyhow::Result<()> {
        insert(client, &self.clients);
        Ok(())
    }

    async fn find(&self, client_id: &ID) -> Option<Client> {
        find(client_id, &self.clients)
    }

    async fn find_by_phones(&self, phones: &[String]) -> anyhow::Result<Option<Client>> {
        let mut clients = find_by(&self.clients, |c| match &c.phone {
            Some(phone) => phones.contains(phone),
            None => false,
        });
        clients.sort_by_key(|c| c.created);
        Ok(clients.into_iter().next())
    }
}
