use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use futures::{stream, StreamExt, TryStreamExt};
use tenancy_reminders_api_structs::dtos::ScheduleErrorDTO;
use tenancy_reminders_api_structs::schedule_reminders::APIResponse;
use tenancy_reminders_domain::{
    normalize_recipient, render_message, IdempotencyKey, Obligation, OffsetSet, PlannedReminder,
    ReminderPayload, ReminderPolicy, ReminderRecord, ReminderState, ID,
};
use tenancy_reminders_infra::{
    InsertOutcome, ReminderContext, CONTRACT_EXPIRY_OFFSETS_SETTING, PAYMENT_OFFSETS_SETTING,
};
use tracing::{error, info, warn};

/// Obligations expanded into reminders concurrently within one run
const SCHEDULE_CONCURRENCY: usize = 8;

pub async fn schedule_reminders_controller(
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = ScheduleRemindersUseCase {};

    execute(usecase, &ctx)
        .await
        .map(|report| HttpResponse::Ok().json(report.into_api_response()))
        .map_err(ApiError::from)
}

/// Turns the open obligations of the ledger into `Scheduled` reminders.
/// Running it again for the same day never creates a reminder twice.
#[derive(Debug)]
pub struct ScheduleRemindersUseCase {}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItemError {
    pub obligation_id: ID,
    pub offset_days: Option<i64>,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScheduleReport {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<ScheduleItemError>,
}

impl ScheduleReport {
    fn merge(&mut self, other: ScheduleReport) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    pub fn into_api_response(self) -> APIResponse {
        APIResponse {
            created: self.created,
            skipped: self.skipped,
            error_count: self.errors.len(),
            errors: self
                .errors
                .into_iter()
                .map(|e| ScheduleErrorDTO {
                    obligation_id: e.obligation_id,
                    offset_days: e.offset_days,
                    message: e.message,
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
pub enum UseCaseError {
    /// The obligations or the reminder ledger could not be reached. The run
    /// stops at the first such failure.
    StorageError,
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

/// Applies the offsets stored in the settings table on top of the
/// configured policy. Malformed values are ignored.
async fn load_policy(ctx: &ReminderContext) -> ReminderPolicy {
    let mut policy = ctx.config.policy.clone();
    let overrides = [
        (PAYMENT_OFFSETS_SETTING, &mut policy.payment.offsets),
        (
            CONTRACT_EXPIRY_OFFSETS_SETTING,
            &mut policy.contract_expiry.offsets,
        ),
    ];
    for (key, offsets) in overrides {
        match ctx.repos.settings.get(key).await {
            Ok(Some(value)) => match value.parse::<OffsetSet>() {
                Ok(parsed) => *offsets = parsed,
                Err(e) => warn!(
                    "Ignoring setting {} with value: {}. Err: {}",
                    key, value, e
                ),
            },
            Ok(None) => (),
            Err(e) => warn!(
                "Unable to read setting {}, using configured offsets. Err: {:?}",
                key, e
            ),
        }
    }
    policy
}

struct ObligationContext {
    client_name: String,
    recipient_phone: Option<String>,
    property_name: Option<String>,
    unit_number: Option<String>,
}

async fn load_obligation_context(
    obligation: &Obligation,
    ctx: &ReminderContext,
) -> Option<ObligationContext> {
    let client = ctx.repos.clients.find(&obligation.client_id).await?;
    let recipient_phone = client
        .phone
        .as_deref()
        .and_then(|phone| normalize_recipient(phone, &ctx.config.country_code));

    let property_name = match &obligation.property_id {
        Some(property_id) => ctx.repos.properties.find(property_id).await.map(|p| p.name),
        None => None,
    };
    let unit_number = match &obligation.unit_id {
        Some(unit_id) => ctx.repos.properties.find_unit(unit_id).await.map(|u| u.number),
        None => None,
    };

    Some(ObligationContext {
        client_name: client.name,
        recipient_phone,
        property_name,
        unit_number,
    })
}

fn build_reminder(
    obligation: &Obligation,
    planned: &PlannedReminder,
    obligation_ctx: &ObligationContext,
    recipient_phone: &str,
    policy: &ReminderPolicy,
    now: i64,
) -> ReminderRecord {
    let kind = obligation.kind.reminder_kind();
    let mut payload = ReminderPayload {
        body: String::new(),
        obligation_id: obligation.id.clone(),
        obligation_date: obligation.date,
        client_name: obligation_ctx.client_name.clone(),
        amount: obligation.amount,
        currency: policy.currency.clone(),
        property_name: obligation_ctx.property_name.clone(),
        unit_number: obligation_ctx.unit_number.clone(),
        reference: obligation.reference.clone(),
    };
    payload.body = render_message(kind, policy.locale, &payload, planned.offset_days);

    ReminderRecord {
        id: Default::default(),
        idempotency_key: IdempotencyKey::new(kind, &obligation.id, planned.offset_days),
        client_id: obligation.client_id.clone(),
        recipient_phone: recipient_phone.to_string(),
        kind,
        offset_days: planned.offset_days,
        scheduled_for: planned.scheduled_for,
        state: ReminderState::Scheduled,
        attempts: 0,
        payload,
        last_error: None,
        last_attempt_at: None,
        created: now,
        sent_at: None,
    }
}

/// Creates the reminders planned for a single obligation. Problems with the
/// obligation itself are recorded in the returned report, ledger failures
/// are returned as errors.
async fn schedule_obligation(
    obligation: Obligation,
    policy: &ReminderPolicy,
    now: i64,
    ctx: &ReminderContext,
) -> Result<ScheduleReport, UseCaseError> {
    let mut report = ScheduleReport::default();
    let planned = policy.plan(obligation.kind, obligation.date, policy.today(now));
    if planned.is_empty() {
        return Ok(report);
    }

    let obligation_ctx = match load_obligation_context(&obligation, ctx).await {
        Some(obligation_ctx) => obligation_ctx,
        None => {
            warn!(
                "Obligation {} references client {} which does not exist",
                obligation.id, obligation.client_id
            );
            report.errors.push(ScheduleItemError {
                obligation_id: obligation.id.clone(),
                offset_days: None,
                message: format!("Client {} was not found", obligation.client_id),
            });
            return Ok(report);
        }
    };

    let recipient_phone = match &obligation_ctx.recipient_phone {
        Some(phone) => phone.clone(),
        None => {
            warn!(
                "Skipping obligation {}: client {} has no usable phone number",
                obligation.id, obligation.client_id
            );
            report.skipped += planned.len();
            return Ok(report);
        }
    };

    for planned in planned {
        let kind = obligation.kind.reminder_kind();
        let key = IdempotencyKey::new(kind, &obligation.id, planned.offset_days);

        let exists = ctx.repos.reminders.exists(&key).await.map_err(|e| {
            error!("Unable to check reminder {}. Err: {:?}", key, e);
            UseCaseError::StorageError
        })?;
        if exists {
            report.skipped += 1;
            continue;
        }

        let reminder = build_reminder(
            &obligation,
            &planned,
            &obligation_ctx,
            &recipient_phone,
            policy,
            now,
        );
        let outcome = ctx.repos.reminders.insert(&reminder).await.map_err(|e| {
            error!("Unable to insert reminder {}. Err: {:?}", key, e);
            UseCaseError::StorageError
        })?;
        match outcome {
            InsertOutcome::Inserted => report.created += 1,
            // Another run created it after our existence check
            InsertOutcome::Duplicate => report.skipped += 1,
        }
    }

    Ok(report)
}

#[async_trait::async_trait(?Send)]
impl UseCase for ScheduleRemindersUseCase {
    type Response = ScheduleReport;

    type Error = UseCaseError;

    const NAME: &'static str = "ScheduleReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let policy = load_policy(ctx).await;
        let today = policy.today(now);

        let mut obligations = Vec::new();
        for kind in tenancy_reminders_domain::ObligationKind::all() {
            let (from, to) = policy.scan_window(kind, today);
            let mut found = ctx
                .repos
                .obligations
                .find_open_between(kind, from, to)
                .await
                .map_err(|e| {
                    error!("Unable to load {:?} obligations. Err: {:?}", kind, e);
                    UseCaseError::StorageError
                })?;
            obligations.append(&mut found);
        }

        let policy = &policy;
        let report = stream::iter(obligations)
            .map(|obligation| schedule_obligation(obligation, policy, now, ctx))
            .buffer_unordered(SCHEDULE_CONCURRENCY)
            .try_fold(ScheduleReport::default(), |mut report, item| async move {
                report.merge(item);
                Ok(report)
            })
            .await?;

        info!(
            created = report.created,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Scheduler run finished for {}",
            today
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::test_helpers::*;
    use std::sync::Arc;
    use tenancy_reminders_domain::{ObligationKind, ReminderKind};
    use tenancy_reminders_infra::{IReminderRepo, InMemoryReminderRepo, ReminderStateUpdate};

    /// Ledger that cannot be reached
    struct UnreachableReminderRepo;

    #[async_trait::async_trait]
    impl IReminderRepo for UnreachableReminderRepo {
        async fn exists(&self, _key: &IdempotencyKey) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn insert(&self, _reminder: &ReminderRecord) -> anyhow::Result<InsertOutcome> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn find(&self, _reminder_id: &ID) -> Option<ReminderRecord> {
            None
        }
        async fn find_by_key(&self, _key: &IdempotencyKey) -> Option<ReminderRecord> {
            None
        }
        async fn find_due(
            &self,
            _now: i64,
            _stuck_before: i64,
        ) -> anyhow::Result<Vec<ReminderRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn find_by_state(
            &self,
            _state: ReminderState,
            _limit: i64,
        ) -> anyhow::Result<Vec<ReminderRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn update_state(&self, _update: &ReminderStateUpdate) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    /// In-memory ledger that yields before every call so concurrent runs
    /// interleave between the existence check and the insert
    struct InterleavingReminderRepo(InMemoryReminderRepo);

    #[async_trait::async_trait]
    impl IReminderRepo for InterleavingReminderRepo {
        async fn exists(&self, key: &IdempotencyKey) -> anyhow::Result<bool> {
            tokio::task::yield_now().await;
            self.0.exists(key).await
        }
        async fn insert(&self, reminder: &ReminderRecord) -> anyhow::Result<InsertOutcome> {
            tokio::task::yield_now().await;
            self.0.insert(reminder).await
        }
        async fn find(&self, reminder_id: &ID) -> Option<ReminderRecord> {
            self.0.find(reminder_id).await
        }
        async fn find_by_key(&self, key: &IdempotencyKey) -> Option<ReminderRecord> {
            self.0.find_by_key(key).await
        }
        async fn find_due(
            &self,
            now: i64,
            stuck_before: i64,
        ) -> anyhow::Result<Vec<ReminderRecord>> {
            self.0.find_due(now, stuck_before).await
        }
        async fn find_by_state(
            &self,
            state: ReminderState,
            limit: i64,
        ) -> anyhow::Result<Vec<ReminderRecord>> {
            self.0.find_by_state(state, limit).await
        }
        async fn update_state(&self, update: &ReminderStateUpdate) -> anyhow::Result<bool> {
            self.0.update_state(update).await
        }
    }

    #[tokio::test]
    async fn end_to_end_payment_creates_single_reminder() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let obligation = seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
        assert!(report.errors.is_empty());

        let key = IdempotencyKey::new(ReminderKind::PaymentReminder, &obligation.id, 7);
        let reminder = ctx.repos.reminders.find_by_key(&key).await.unwrap();
        assert_eq!(reminder.offset_days, 7);
        assert_eq!(reminder.scheduled_for, at(2025, 3, 8, 9, 0));
        assert_eq!(reminder.state, ReminderState::Scheduled);
        assert_eq!(reminder.attempts, 0);
        assert_eq!(reminder.recipient_phone, "+971501234567");
        assert_eq!(reminder.payload.amount, Some(1000.0));
        assert_eq!(
            reminder.payload.body,
            "Dear Sara, this is a reminder that your rent payment of 1000.00 AED for Marina Heights unit 1204 is due on 15/03/2025 (in 7 days). Reference: PAY-77."
        );
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let mut ctx = setup_context(at(2025, 3, 1, 0, 0), &[14, 7, 3, 1]);
        ctx.config.policy.lookahead_days = 30;
        let seeded = seed_client(&ctx, Some("+971501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 13));
        seed_payment(&ctx, &seeded, date(2025, 3, 20));

        let first = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert!(first.created > 0);
        let after_first = ctx
            .repos
            .reminders
            .find_by_state(ReminderState::Scheduled, 1000)
            .await
            .unwrap();

        let second = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, first.created);
        let after_second = ctx
            .repos
            .reminders
            .find_by_state(ReminderState::Scheduled, 1000)
            .await
            .unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn prunes_offsets_already_in_the_past() {
        let mut ctx = setup_context(at(2025, 3, 10, 0, 0), &[14, 7, 3, 1]);
        ctx.config.policy.lookahead_days = 14;
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let obligation = seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 2);

        let mut offsets = ctx
            .repos
            .reminders
            .find_by_state(ReminderState::Scheduled, 1000)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.payload.obligation_id == obligation.id)
            .map(|r| r.offset_days)
            .collect::<Vec<_>>();
        offsets.sort();
        assert_eq!(offsets, vec![1, 3]);
    }

    #[tokio::test]
    async fn obligation_due_today_gets_no_reminder() {
        let mut ctx = setup_context(at(2025, 3, 15, 0, 0), &[14, 7, 3, 1]);
        ctx.config.policy.lookahead_days = 14;
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report, ScheduleReport::default());
    }

    #[tokio::test]
    async fn skips_clients_without_phone() {
        let mut ctx = setup_context(at(2025, 3, 10, 0, 0), &[14, 7, 3, 1]);
        ctx.config.policy.lookahead_days = 14;
        let without_phone = seed_client(&ctx, None).await;
        let bad_phone = seed_client(&ctx, Some("12")).await;
        let with_phone = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &without_phone, date(2025, 3, 15));
        seed_payment(&ctx, &bad_phone, date(2025, 3, 15));
        seed_payment(&ctx, &with_phone, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 4);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn missing_client_is_reported_without_aborting() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let mut orphan = payment(&seeded, date(2025, 3, 15));
        orphan.client_id = ID::default();
        ctx.obligations.insert(&orphan);
        seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].obligation_id, orphan.id);
    }

    #[tokio::test]
    async fn missing_property_renders_placeholder() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let mut obligation = payment(&seeded, date(2025, 3, 15));
        obligation.property_id = None;
        obligation.unit_id = Some(ID::default());
        ctx.obligations.insert(&obligation);

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
        let key = IdempotencyKey::new(ReminderKind::PaymentReminder, &obligation.id, 7);
        let reminder = ctx.repos.reminders.find_by_key(&key).await.unwrap();
        assert_eq!(reminder.payload.property_name, None);
        assert_eq!(reminder.payload.unit_number, None);
        assert!(reminder.payload.body.contains("for - unit -"));
    }

    #[tokio::test]
    async fn schedules_contract_expiry_at_its_own_hour() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let mut lease = payment(&seeded, date(2025, 3, 23));
        lease.kind = ObligationKind::ContractExpiry;
        lease.amount = None;
        lease.reference = Some("C-2024-17".into());
        ctx.obligations.insert(&lease);

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
        let key = IdempotencyKey::new(ReminderKind::ContractExpiryReminder, &lease.id, 15);
        let reminder = ctx.repos.reminders.find_by_key(&key).await.unwrap();
        assert_eq!(reminder.scheduled_for, at(2025, 3, 8, 10, 0));
        assert!(reminder.payload.body.contains("C-2024-17"));
    }

    #[tokio::test]
    async fn settings_override_configured_offsets() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        ctx.repos
            .settings
            .set(PAYMENT_OFFSETS_SETTING, "5")
            .await
            .unwrap();
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 15));
        let obligation = seed_payment(&ctx, &seeded, date(2025, 3, 13));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
        let key = IdempotencyKey::new(ReminderKind::PaymentReminder, &obligation.id, 5);
        assert!(ctx.repos.reminders.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_setting_is_ignored() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        ctx.repos
            .settings
            .set(PAYMENT_OFFSETS_SETTING, "seven")
            .await
            .unwrap();
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn unreachable_ledger_aborts_run() {
        let mut ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        ctx.repos.reminders = Arc::new(UnreachableReminderRepo);
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let res = execute(ScheduleRemindersUseCase {}, &ctx).await;
        assert!(matches!(res, Err(UseCaseError::StorageError)));
    }

    #[tokio::test]
    async fn offset_setting_beyond_ten_years_is_ignored() {
        let ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        ctx.repos
            .settings
            .set(PAYMENT_OFFSETS_SETTING, "100000000")
            .await
            .unwrap();
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 15));

        let report = execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn concurrent_runs_create_each_reminder_once() {
        let mut ctx = setup_context(at(2025, 3, 1, 0, 0), &[14, 7, 3, 1]);
        ctx.config.policy.lookahead_days = 30;
        ctx.repos.reminders = Arc::new(InterleavingReminderRepo(InMemoryReminderRepo::new()));
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        seed_payment(&ctx, &seeded, date(2025, 3, 20));

        let (first, second) = futures::join!(
            execute(ScheduleRemindersUseCase {}, &ctx),
            execute(ScheduleRemindersUseCase {}, &ctx)
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.created + second.created, 4);
        assert_eq!(first.skipped + second.skipped, 4);

        let mut keys = ctx
            .repos
            .reminders
            .find_by_state(ReminderState::Scheduled, 1000)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.offset_days)
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec![1, 3, 7, 14]);
    }
}
