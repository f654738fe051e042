use crate::{APIResponse, BaseClient};
use reqwest::StatusCode;
use std::sync::Arc;
use tenancy_reminders_api_structs::*;

#[derive(Clone)]
pub struct ClientContextClient {
    base: Arc<BaseClient>,
}

impl ClientContextClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    /// Resolves the client owning `phone`, written in any format
    pub async fn get_by_phone(&self, phone: &str) -> APIResponse<get_client_by_phone::APIResponse> {
        let phone = phone
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .replace('+', "%2B");
        self.base
            .get(format!("clients/by-phone/{}", phone), StatusCode::OK)
            .await
    }
}
