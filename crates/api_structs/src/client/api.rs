use crate::dtos::ClientContextDTO;
use serde::{Deserialize, Serialize};
use tenancy_reminders_domain::ClientContext;

pub mod get_client_by_phone {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub phone: String,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub context: ClientContextDTO,
    }

    impl APIResponse {
        pub fn new(context: ClientContext) -> Self {
            Self {
                context: ClientContextDTO::new(context),
            }
        }
    }
}
