mod client;
mod lease;
mod obligation;
mod property;
mod reminder;
mod settings;
mod shared;

use client::{InMemoryClientRepo, PostgresClientRepo};
use lease::{InMemoryLeaseRepo, PostgresLeaseRepo};
use obligation::PostgresObligationRepo;
use property::{InMemoryPropertyRepo, PostgresPropertyRepo};
use reminder::PostgresReminderRepo;
use settings::{InMemorySettingsRepo, PostgresSettingsRepo};
use sqlx::PgPool;
use std::sync::Arc;

pub use client::IClientRepo;
pub use lease::ILeaseRepo;
pub use obligation::{IObligationRepo, InMemoryObligationRepo};
pub use property::IPropertyRepo;
pub use reminder::{IReminderRepo, InMemoryReminderRepo, InsertOutcome, ReminderStateUpdate};
pub use settings::{ISettingsRepo, CONTRACT_EXPIRY_OFFSETS_SETTING, PAYMENT_OFFSETS_SETTING};

#[derive(Clone)]
pub struct Repos {
    pub reminders: Arc<dyn IReminderRepo>,
    pub obligations: Arc<dyn IObligationRepo>,
    pub clients: Arc<dyn IClientRepo>,
    pub leases: Arc<dyn ILeaseRepo>,
    pub properties: Arc<dyn IPropertyRepo>,
    pub settings: Arc<dyn ISettingsRepo>,
}

impl Repos {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self {
            reminders: Arc::new(PostgresReminderRepo::new(pool.clone())),
            obligations: Arc::new(PostgresObligationRepo::new(pool.clone())),
            clients: Arc::new(PostgresClientRepo::new(pool.clone())),
            leases: Arc::new(PostgresLeaseRepo::new(pool.clone())),
            properties: Arc::new(PostgresPropertyRepo::new(pool.clone())),
            settings: Arc::new(PostgresSettingsRepo::new(pool)),
        }
    }

    pub fn create_inmemory() -> Self {
        Self {
            reminders: Arc::new(InMemoryReminderRepo::new()),
            obligations: Arc::new(InMemoryObligationRepo::new()),
            clients: Arc::new(InMemoryClientRepo::new()),
            leases: Arc::new(InMemoryLeaseRepo::new()),
            properties: Arc::new(InMemoryPropertyRepo::new()),
            settings: Arc::new(InMemorySettingsRepo::new()),
        }
    }
}
