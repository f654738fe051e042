mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderRepo;
pub use postgres::PostgresReminderRepo;
use tenancy_reminders_domain::{IdempotencyKey, ReminderRecord, ReminderState, ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A reminder with the same idempotency key already exists. Nothing was written.
    Duplicate,
}

/// Compare-and-set update of the delivery related fields of a reminder.
/// The update only applies when the stored reminder is still in
/// `expected_state` with `expected_attempts`, so two workers can never both
/// claim or finish the same reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderStateUpdate {
    pub id: ID,
    pub expected_state: ReminderState,
    pub expected_attempts: i64,
    pub state: ReminderState,
    pub attempts: i64,
    pub last_attempt_at: Option<i64>,
    pub last_error: Option<String>,
    pub sent_at: Option<i64>,
}

impl ReminderStateUpdate {
    /// Update persisting `reminder` which was in `previous` = (state, attempts)
    /// when it was read
    pub fn new(previous: (ReminderState, i64), reminder: &ReminderRecord) -> Self {
        Self {
            id: reminder.id.clone(),
            expected_state: previous.0,
            expected_attempts: previous.1,
            state: reminder.state,
            attempts: reminder.attempts,
            last_attempt_at: reminder.last_attempt_at,
            last_error: reminder.last_error.clone(),
            sent_at: reminder.sent_at,
        }
    }
}

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    async fn exists(&self, key: &IdempotencyKey) -> anyhow::Result<bool>;
    /// Inserts the reminder unless its idempotency key is taken
    async fn insert(&self, reminder: &ReminderRecord) -> anyhow::Result<InsertOutcome>;
    async fn find(&self, reminder_id: &ID) -> Option<ReminderRecord>;
    async fn find_by_key(&self, key: &IdempotencyKey) -> Option<ReminderRecord>;
    /// `Scheduled` reminders due at `now` and `Pending` reminders whose last
    /// attempt started before `stuck_before`, oldest first
    async fn find_due(&self, now: i64, stuck_before: i64) -> anyhow::Result<Vec<ReminderRecord>>;
    async fn find_by_state(
        &self,
        state: ReminderState,
        limit: i64,
    ) -> anyhow::Result<Vec<ReminderRecord>>;
    /// Returns `false` when the stored reminder did not match the expected
    /// state and attempts and nothing was written
    async fn update_state(&self, update: &ReminderStateUpdate) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReminderContext;
    use chrono::NaiveDate;
    use tenancy_reminders_domain::{ReminderKind, ReminderPayload};

    async fn create_contexts() -> Vec<ReminderContext> {
        let mut contexts = vec![ReminderContext::create_inmemory()];
        if let Some(ctx) = ReminderContext::create_postgres_for_tests().await {
            contexts.push(ctx);
        }
        contexts
    }

    fn reminder(obligation_id: &ID, offset_days: i64, scheduled_for: i64) -> ReminderRecord {
        ReminderRecord {
            id: Default::default(),
            idempotency_key: IdempotencyKey::new(
                ReminderKind::PaymentReminder,
                obligation_id,
                offset_days,
            ),
            client_id: Default::default(),
            recipient_phone: "+971501234567".into(),
            kind: ReminderKind::PaymentReminder,
            offset_days,
            scheduled_for,
            state: ReminderState::Scheduled,
            attempts: 0,
            payload: ReminderPayload {
                body: "Reminder".into(),
                obligation_id: obligation_id.clone(),
                obligation_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                client_name: "Client".into(),
                amount: Some(1000.0),
                currency: "AED".into(),
                property_name: Some("Tower".into()),
                unit_number: None,
                reference: None,
            },
            last_error: None,
            last_attempt_at: None,
            created: 0,
            sent_at: None,
        }
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn insert_is_unique_per_idempotency_key() {
        for ctx in create_contexts().await {
            let obligation_id = ID::default();
            let r1 = reminder(&obligation_id, 3, 100);
            assert!(!ctx.repos.reminders.exists(&r1.idempotency_key).await.unwrap());
            assert_eq!(
                ctx.repos.reminders.insert(&r1).await.unwrap(),
                InsertOutcome::Inserted
            );
            assert!(ctx.repos.reminders.exists(&r1.idempotency_key).await.unwrap());

            // Same key, different id
            let r2 = reminder(&obligation_id, 3, 200);
            assert_eq!(
                ctx.repos.reminders.insert(&r2).await.unwrap(),
                InsertOutcome::Duplicate
            );
            assert!(ctx.repos.reminders.find(&r2.id).await.is_none());

            let stored = ctx
                .repos
                .reminders
                .find_by_key(&r1.idempotency_key)
                .await
                .expect("To find reminder");
            assert_eq!(stored, r1);
        }
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn concurrent_inserts_create_one_reminder() {
        for ctx in create_contexts().await {
            let obligation_id = ID::default();
            let inserts = (0..10).map(|_| {
                let repo = ctx.repos.reminders.clone();
                let r = reminder(&obligation_id, 1, 100);
                async move { repo.insert(&r).await.unwrap() }
            });
            let outcomes = futures::future::join_all(inserts).await;
            let inserted = outcomes
                .iter()
                .filter(|o| **o == InsertOutcome::Inserted)
                .count();
            assert_eq!(inserted, 1);
        }
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn find_due_selects_scheduled_and_stuck_reminders() {
        for ctx in create_contexts().await {
            let now = 4_000_000_000_000;
            let obligation_id = ID::default();

            let due = reminder(&obligation_id, 7, now - 10);
            let future = reminder(&obligation_id, 3, now + 10);
            let mut sent = reminder(&obligation_id, 14, now - 20);
            sent.state = ReminderState::Sent;
            let mut stuck = reminder(&obligation_id, 1, now - 30);
            stuck.state = ReminderState::Pending;
            stuck.attempts = 1;
            stuck.last_attempt_at = Some(now - 1000);
            let mut in_flight = reminder(&obligation_id, 2, now - 40);
            in_flight.state = ReminderState::Pending;
            in_flight.attempts = 1;
            in_flight.last_attempt_at = Some(now - 5);

            for r in [&due, &future, &sent, &stuck, &in_flight] {
                ctx.repos.reminders.insert(r).await.unwrap();
            }

            let selected = ctx
                .repos
                .reminders
                .find_due(now, now - 100)
                .await
                .unwrap()
                .into_iter()
                .filter(|r| r.payload.obligation_id == obligation_id)
                .map(|r| r.id)
                .collect::<Vec<_>>();
            assert_eq!(selected, vec![stuck.id.clone(), due.id.clone()]);
        }
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn update_state_is_compare_and_set() {
        for ctx in create_contexts().await {
            let mut r = reminder(&ID::default(), 3, 100);
            ctx.repos.reminders.insert(&r).await.unwrap();

            let previous = (r.state, r.attempts);
            r.begin_attempt(150).unwrap();
            let claim = ReminderStateUpdate::new(previous, &r);
            assert!(ctx.repos.reminders.update_state(&claim).await.unwrap());
            // A second worker holding the same stale copy loses
            assert!(!ctx.repos.reminders.update_state(&claim).await.unwrap());

            let previous = (r.state, r.attempts);
            r.mark_sent(200).unwrap();
            assert!(ctx
                .repos
                .reminders
                .update_state(&ReminderStateUpdate::new(previous, &r))
                .await
                .unwrap());

            let stored = ctx.repos.reminders.find(&r.id).await.unwrap();
            assert_eq!(stored.state, ReminderState::Sent);
            assert_eq!(stored.attempts, 1);
            assert_eq!(stored.last_attempt_at, Some(150));
            assert_eq!(stored.sent_at, Some(200));

            // Sent reminders are never selected again
            assert!(ctx
                .repos
                .reminders
                .find_due(i64::MAX, i64::MAX)
                .await
                .unwrap()
                .iter()
                .all(|due| due.id != r.id));

            let sent = ctx
                .repos
                .reminders
                .find_by_state(ReminderState::Sent, 1000)
                .await
                .unwrap();
            assert!(sent.iter().any(|s| s.id == r.id));
        }
    }
}
