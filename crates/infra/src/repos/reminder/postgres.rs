use super::{IReminderRepo, InsertOutcome, ReminderStateUpdate};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use std::convert::TryFrom;
use tenancy_reminders_domain::{IdempotencyKey, ReminderPayload, ReminderRecord, ReminderState, ID};
use tracing::error;

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    reminder_uid: Uuid,
    idempotency_key: String,
    client_uid: Uuid,
    recipient_phone: String,
    kind: String,
    offset_days: i64,
    scheduled_for: i64,
    state: String,
    attempts: i64,
    payload: Json<ReminderPayload>,
    last_error: Option<String>,
    last_attempt_at: Option<i64>,
    created: i64,
    sent_at: Option<i64>,
}

impl TryFrom<ReminderRaw> for ReminderRecord {
    type Error = anyhow::Error;

    fn try_from(raw: ReminderRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.reminder_uid.into(),
            idempotency_key: raw.idempotency_key.into(),
            client_id: raw.client_uid.into(),
            recipient_phone: raw.recipient_phone,
            kind: raw.kind.parse()?,
            offset_days: raw.offset_days,
            scheduled_for: raw.scheduled_for,
            state: raw.state.parse()?,
            attempts: raw.attempts,
            payload: raw.payload.0,
            last_error: raw.last_error,
            last_attempt_at: raw.last_attempt_at,
            created: raw.created,
            sent_at: raw.sent_at,
        })
    }
}

fn into_reminders(rows: Vec<ReminderRaw>) -> Vec<ReminderRecord> {
    rows.into_iter()
        .filter_map(|raw| {
            let reminder_uid = raw.reminder_uid;
            ReminderRecord::try_from(raw)
                .map_err(|e| error!("Unable to read reminder {}. Err: {:?}", reminder_uid, e))
                .ok()
        })
        .collect()
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn exists(&self, key: &IdempotencyKey) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM reminders WHERE idempotency_key = $1)
            "#,
        )
        .bind(key.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, reminder: &ReminderRecord) -> anyhow::Result<InsertOutcome> {
        let res = sqlx::query(
            r#"
            INSERT INTO reminders
            (reminder_uid, idempotency_key, client_uid, recipient_phone, kind, offset_days,
             scheduled_for, state, attempts, payload, last_error, last_attempt_at, created, sent_at)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.idempotency_key.as_str())
        .bind(reminder.client_id.inner_ref())
        .bind(&reminder.recipient_phone)
        .bind(reminder.kind.as_str())
        .bind(reminder.offset_days)
        .bind(reminder.scheduled_for)
        .bind(reminder.state.as_str())
        .bind(reminder.attempts)
        .bind(Json(&reminder.payload))
        .bind(&reminder.last_error)
        .bind(reminder.last_attempt_at)
        .bind(reminder.created)
        .bind(reminder.sent_at)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find(&self, reminder_id: &ID) -> Option<ReminderRecord> {
        let raw = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        into_reminders(vec![raw]).pop()
    }

    async fn find_by_key(&self, key: &IdempotencyKey) -> Option<ReminderRecord> {
        let raw = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.idempotency_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        into_reminders(vec![raw]).pop()
    }

    async fn find_due(&self, now: i64, stuck_before: i64) -> anyhow::Result<Vec<ReminderRecord>> {
        let rows = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.scheduled_for <= $1 AND (
                r.state = 'scheduled' OR
                (r.state = 'pending' AND (r.last_attempt_at IS NULL OR r.last_attempt_at <= $2))
            )
            ORDER BY r.scheduled_for
            "#,
        )
        .bind(now)
        .bind(stuck_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_reminders(rows))
    }

    async fn find_by_state(
        &self,
        state: ReminderState,
        limit: i64,
    ) -> anyhow::Result<Vec<ReminderRecord>> {
        let rows = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.state = $1
            ORDER BY r.scheduled_for
            LIMIT $2
            "#,
        )
        .bind(state.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_reminders(rows))
    }

    async fn update_state(&self, update: &ReminderStateUpdate) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE reminders
            SET state = $4,
            attempts = $5,
            last_attempt_at = $6,
            last_error = $7,
            sent_at = $8
            WHERE reminder_uid = $1 AND state = $2 AND attempts = $3
            "#,
        )
        .bind(update.id.inner_ref())
        .bind(update.expected_state.as_str())
        .bind(update.expected_attempts)
        .bind(update.state.as_str())
        .bind(update.attempts)
        .bind(update.last_attempt_at)
        .bind(&update.last_error)
        .bind(update.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }
}
