use crate::shared::entity::{Entity, ID};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tenant of the property system. Owned by the wider property system and
/// only read here.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: ID,
    pub name: String,
    /// Phone number as it was typed in by staff, in any written format
    pub phone: Option<String>,
    pub created: i64,
}

impl Entity for Client {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: ID,
    pub name: String,
}

impl Entity for Property {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: ID,
    pub property_id: ID,
    pub number: String,
}

impl Entity for Unit {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaseStatus {
    Active,
    Expired,
    Terminated,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub id: ID,
    pub client_id: ID,
    pub property_id: ID,
    pub unit_id: Option<ID>,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaseStatus,
    pub created: i64,
}

impl Entity for Lease {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// A client together with the lease, property and unit it currently rents.
/// A client without an active lease is still a valid context, with the lease
/// related fields left empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientContext {
    pub client: Client,
    pub active_lease: Option<Lease>,
    pub property: Option<Property>,
    pub unit: Option<Unit>,
}

impl ClientContext {
    pub fn without_lease(client: Client) -> Self {
        Self {
            client,
            active_lease: None,
            property: None,
            unit: None,
        }
    }

    pub fn has_active_lease(&self) -> bool {
        self.active_lease.is_some()
    }
}
