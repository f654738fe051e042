use serde::{Deserialize, Serialize};
use tenancy_reminders_domain::{ReminderKind, ReminderPayload, ReminderRecord, ReminderState, ID};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDTO {
    pub id: ID,
    pub idempotency_key: String,
    pub client_id: ID,
    pub recipient_phone: String,
    pub kind: ReminderKind,
    pub offset_days: i64,
    pub scheduled_for: i64,
    pub state: ReminderState,
    pub attempts: i64,
    pub payload: ReminderPayload,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<i64>,
    pub created: i64,
    pub sent_at: Option<i64>,
}

impl ReminderDTO {
    pub fn new(reminder: ReminderRecord) -> Self {
        Self {
            id: reminder.id,
            idempotency_key: reminder.idempotency_key.to_string(),
            client_id: reminder.client_id,
            recipient_phone: reminder.recipient_phone,
            kind: reminder.kind,
            offset_days: reminder.offset_days,
            scheduled_for: reminder.scheduled_for,
            state: reminder.state,
            attempts: reminder.attempts,
            payload: reminder.payload,
            last_error: reminder.last_error,
            last_attempt_at: reminder.last_attempt_at,
            created: reminder.created,
            sent_at: reminder.sent_at,
        }
    }
}

/// An obligation offset pair the scheduler was unable to process
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleErrorDTO {
    pub obligation_id: ID,
    pub offset_days: Option<i64>,
    pub message: String,
}
