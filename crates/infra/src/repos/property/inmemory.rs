use super::IPropertyRepo;
use crate::repos::shared::inmemory_repo::*;
use std::sync::Mutex;
use tenancy_reminders_domain::{Property, Unit, ID};

pub struct InMemoryPropertyRepo {
    properties: Mutex<Vec<Property>>,
    units: Mutex<Vec<Unit>>,
}

impl InMemoryPropertyRepo {
    pub fn new() -> Self {
        Self {
            properties: Mutex::new(Vec::new()),
            units: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IPropertyRepo for InMemoryPropertyRepo {
    async fn insert_property(&self, property: &Property) -> anyhow::Result<()> {
        insert(property, &self.properties);
        Ok(())
    }

    async fn insert_unit(&self, unit: &Unit) -> anyhow::Result<()> {
        insert(unit, &self.units);
        Ok(())
    }

    async fn find(&self, property_id: &ID) -> Option<Property> {
        find(property_id, &self.properties)
    }

    async fn find_unit(&self, unit_id: &ID) -> Option<Unit> {
        find(unit_id, &self.units)
    }
}
