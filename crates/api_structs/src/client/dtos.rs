use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tenancy_reminders_domain::{Client, ClientContext, Lease, LeaseStatus, Property, Unit, ID};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientDTO {
    pub id: ID,
    pub name: String,
    pub phone: Option<String>,
}

impl ClientDTO {
    pub fn new(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            phone: client.phone,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaseDTO {
    pub id: ID,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaseStatus,
}

impl LeaseDTO {
    pub fn new(lease: Lease) -> Self {
        Self {
            id: lease.id,
            contract_number: lease.contract_number,
            start_date: lease.start_date,
            end_date: lease.end_date,
            status: lease.status,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDTO {
    pub id: ID,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UnitDTO {
    pub id: ID,
    pub number: String,
}

/// `activeLease`, `property` and `unit` are null for clients without an
/// active lease
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientContextDTO {
    pub client: ClientDTO,
    pub active_lease: Option<LeaseDTO>,
    pub property: Option<PropertyDTO>,
    pub unit: Option<UnitDTO>,
}

impl ClientContextDTO {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            client: ClientDTO::new(ctx.client),
            active_lease: ctx.active_lease.map(LeaseDTO::new),
            property: ctx.property.map(|p: Property| PropertyDTO {
                id: p.id,
                name: p.name,
            }),
            unit: ctx.unit.map(|u: Unit| UnitDTO {
                id: u.id,
                number: u.number,
            }),
        }
    }
}
