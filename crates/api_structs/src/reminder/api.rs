use crate::dtos::{ReminderDTO, ScheduleErrorDTO};
use serde::{Deserialize, Serialize};
use tenancy_reminders_domain::{ReminderRecord, ReminderState};

pub mod schedule_reminders {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub created: usize,
        pub skipped: usize,
        pub error_count: usize,
        pub errors: Vec<ScheduleErrorDTO>,
    }
}

pub mod deliver_reminders {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub sent: usize,
        pub failed: usize,
        pub still_pending: usize,
    }
}

pub mod list_reminders {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    pub struct QueryParams {
        pub state: ReminderState,
        pub limit: Option<i64>,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminders: Vec<ReminderDTO>,
    }

    impl APIResponse {
        pub fn new(reminders: Vec<ReminderRecord>) -> Self {
            Self {
                reminders: reminders.into_iter().map(ReminderDTO::new).collect(),
            }
        }
    }
}
