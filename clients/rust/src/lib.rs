mod base;
mod client;
mod reminder;
mod status;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIResponse};
use client::ClientContextClient;
use reminder::ReminderClient;
pub use reminder::ListRemindersInput;
use status::StatusClient;
use std::sync::Arc;

pub use tenancy_reminders_api_structs::dtos::*;
pub use tenancy_reminders_domain::{ReminderKind, ReminderState, ID};

// Domain
pub use tenancy_reminders_api_structs::dtos::ClientContextDTO as ClientContext;
pub use tenancy_reminders_api_structs::dtos::ReminderDTO as Reminder;

/// Tenancy Reminders Server SDK
///
/// The SDK contains methods for interacting with the tenancy reminders
/// server API.
#[derive(Clone)]
pub struct TenancyRemindersSDK {
    pub client: ClientContextClient,
    pub reminder: ReminderClient,
    pub status: StatusClient,
}

impl TenancyRemindersSDK {
    pub fn new(address: String) -> Self {
        let base = Arc::new(BaseClient::new(address));
        let client = ClientContextClient::new(base.clone());
        let reminder = ReminderClient::new(base.clone());
        let status = StatusClient::new(base);

        Self {
            client,
            reminder,
            status,
        }
    }
}
