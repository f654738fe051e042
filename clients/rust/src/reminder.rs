use crate::{APIResponse, BaseClient};
use reqwest::StatusCode;
use std::sync::Arc;
use tenancy_reminders_api_structs::*;
use tenancy_reminders_domain::ReminderState;

#[derive(Clone)]
pub struct ReminderClient {
    base: Arc<BaseClient>,
}

pub struct ListRemindersInput {
    pub state: ReminderState,
    pub limit: Option<i64>,
}

impl ReminderClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    /// Triggers a scheduler run on the server
    pub async fn schedule(&self) -> APIResponse<schedule_reminders::APIResponse> {
        self.base
            .post((), "reminders/schedule".into(), StatusCode::OK)
            .await
    }

    /// Triggers a delivery run on the server
    pub async fn deliver(&self) -> APIResponse<deliver_reminders::APIResponse> {
        self.base
            .post((), "reminders/deliver".into(), StatusCode::OK)
            .await
    }

    pub async fn list(&self, input: ListRemindersInput) -> APIResponse<list_reminders::APIResponse> {
        let mut path = format!("reminders?state={}", input.state.as_str());
        if let Some(limit) = input.limit {
            path = format!("{}&limit={}", path, limit);
        }
        self.base.get(path, StatusCode::OK).await
    }
}
