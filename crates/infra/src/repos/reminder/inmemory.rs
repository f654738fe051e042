use super::{IReminderRepo, InsertOutcome, ReminderStateUpdate};
use crate::repos::shared::inmemory_repo::*;
use std::sync::Mutex;
use tenancy_reminders_domain::{IdempotencyKey, ReminderRecord, ReminderState, ID};

pub struct InMemoryReminderRepo {
    reminders: Mutex<Vec<ReminderRecord>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn exists(&self, key: &IdempotencyKey) -> anyhow::Result<bool> {
        Ok(!find_by(&self.reminders, |r| r.idempotency_key == *key).is_empty())
    }

    async fn insert(&self, reminder: &ReminderRecord) -> anyhow::Result<InsertOutcome> {
        // Check and insert under the same lock, like the unique index does
        let mut reminders = self.reminders.lock().unwrap();
        if reminders
            .iter()
            .any(|r| r.idempotency_key == reminder.idempotency_key)
        {
            return Ok(InsertOutcome::Duplicate);
        }
        reminders.push(reminder.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find(&self, reminder_id: &ID) -> Option<ReminderRecord> {
        find(reminder_id, &self.reminders)
    }

    async fn find_by_key(&self, key: &IdempotencyKey) -> Option<ReminderRecord> {
        find_by(&self.reminders, |r| r.idempotency_key == *key)
            .into_iter()
            .next()
    }

    async fn find_due(&self, now: i64, stuck_before: i64) -> anyhow::Result<Vec<ReminderRecord>> {
        let mut due = find_by(&self.reminders, |r| {
            r.scheduled_for <= now
                && match r.state {
                    ReminderState::Scheduled => true,
                    ReminderState::Pending => r
                        .last_attempt_at
                        .map(|attempted| attempted <= stuck_before)
                        .unwrap_or(true),
                    _ => false,
                }
        });
        due.sort_by_key(|r| r.scheduled_for);
        Ok(due)
    }

    async fn find_by_state(
        &self,
        state: ReminderState,
        limit: i64,
    ) -> anyhow::Result<Vec<ReminderRecord>> {
        let mut reminders = find_by(&self.reminders, |r| r.state == state);
        reminders.sort_by_key(|r| r.scheduled_for);
        reminders.truncate(limit.max(0) as usize);
        Ok(reminders)
    }

    async fn update_state(&self, update: &ReminderStateUpdate) -> anyhow::Result<bool> {
        Ok(update_one(
            &self.reminders,
            |r| {
                r.id == update.id
                    && r.state == update.expected_state
                    && r.attempts == update.expected_attempts
            },
            |r| {
                r.state = update.state;
                r.attempts = update.attempts;
                r.last_attempt_at = update.last_attempt_at;
                r.last_error = update.last_error.clone();
                r.sent_at = update.sent_at;
            },
        ))
    }
}
