use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tenancy_reminders_api_structs::deliver_reminders::APIResponse;
use tenancy_reminders_domain::{ReminderRecord, ReminderState};
use tenancy_reminders_infra::{DeliveryError, ReminderContext, ReminderStateUpdate};
use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};

pub async fn deliver_reminders_controller(
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = RunDueRemindersUseCase {};

    execute(usecase, &ctx)
        .await
        .map(|report| {
            HttpResponse::Ok().json(APIResponse {
                sent: report.sent,
                failed: report.failed,
                still_pending: report.still_pending,
            })
        })
        .map_err(ApiError::from)
}

/// Delivers every due reminder of the ledger through the delivery channel
#[derive(Debug)]
pub struct RunDueRemindersUseCase {}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Due reminders left for the next run
    pub still_pending: usize,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
    ChannelUnavailable(String),
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
            UseCaseError::ChannelUnavailable(msg) => Self::ServiceUnavailable(msg),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Sent,
    Failed,
    StillPending,
    /// Another run claimed the reminder first
    Claimed,
}

/// Shared state of one delivery run
struct Run<'a> {
    ctx: &'a ReminderContext,
    deadline: Instant,
    aborted: AtomicBool,
}

impl<'a> Run<'a> {
    fn may_start(&self) -> bool {
        !self.aborted.load(Ordering::SeqCst) && Instant::now() < self.deadline
    }

    /// Persists `reminder` if the stored copy still is in `previous` state
    async fn persist(
        &self,
        previous: (ReminderState, i64),
        reminder: &ReminderRecord,
    ) -> Result<bool, UseCaseError> {
        self.ctx
            .repos
            .reminders
            .update_state(&ReminderStateUpdate::new(previous, reminder))
            .await
            .map_err(|e| {
                error!("Unable to persist state of reminder {}. Err: {:?}", reminder.id, e);
                self.aborted.store(true, Ordering::SeqCst);
                UseCaseError::StorageError
            })
    }

    async fn fail(&self, mut reminder: ReminderRecord, error: String) -> Result<Outcome, UseCaseError> {
        let previous = (reminder.state, reminder.attempts);
        if reminder.mark_failed(error).is_err() {
            return Ok(Outcome::Claimed);
        }
        if !self.persist(previous, &reminder).await? {
            warn!("Reminder {} changed while it was being delivered", reminder.id);
            return Ok(Outcome::Claimed);
        }
        warn!(
            "Reminder {} failed after {} attempts: {}",
            reminder.id,
            reminder.attempts,
            reminder.last_error.as_deref().unwrap_or_default()
        );
        Ok(Outcome::Failed)
    }

    async fn deliver(&self, mut reminder: ReminderRecord) -> Result<Outcome, UseCaseError> {
        if !self.may_start() {
            return Ok(Outcome::StillPending);
        }
        let config = &self.ctx.config.delivery;

        // Reclaimed from a run that crashed after its last attempt
        if reminder.attempts >= config.max_attempts {
            let error = reminder
                .last_error
                .clone()
                .unwrap_or_else(|| "Delivery attempts exhausted".into());
            return self.fail(reminder, error).await;
        }

        loop {
            self.ctx.rate_limiter.acquire().await;
            if self.aborted.load(Ordering::SeqCst) {
                return Ok(Outcome::StillPending);
            }

            let previous = (reminder.state, reminder.attempts);
            if let Err(e) = reminder.begin_attempt(self.ctx.sys.get_timestamp_millis()) {
                warn!("{}", e);
                return Ok(Outcome::Claimed);
            }
            if !self.persist(previous, &reminder).await? {
                info!("Reminder {} was claimed by another run", reminder.id);
                return Ok(Outcome::Claimed);
            }

            let result = match timeout(
                config.request_timeout,
                self.ctx
                    .channel
                    .send(&reminder.recipient_phone, &reminder.payload.body),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::timeout(config.request_timeout)),
            };

            let previous = (reminder.state, reminder.attempts);
            let error = match result {
                Ok(message_id) => {
                    // Claimed above, so the reminder is pending
                    let _ = reminder.mark_sent(self.ctx.sys.get_timestamp_millis());
                    if !self.persist(previous, &reminder).await? {
                        warn!("Reminder {} changed while it was being delivered", reminder.id);
                    }
                    info!(
                        "Reminder {} sent to {} with message id: {}",
                        reminder.id, reminder.recipient_phone, message_id.0
                    );
                    return Ok(Outcome::Sent);
                }
                Err(e) => e,
            };

            if error.kind.is_systemic() {
                error!(
                    "Channel {} is unavailable, aborting the run: {}",
                    self.ctx.channel.name(),
                    error
                );
                self.aborted.store(true, Ordering::SeqCst);
                reminder.record_error(error.to_string());
                self.persist(previous, &reminder).await?;
                return Err(UseCaseError::ChannelUnavailable(error.to_string()));
            }

            if error.kind.is_terminal() || reminder.attempts >= config.max_attempts {
                return self.fail(reminder, error.to_string()).await;
            }

            warn!(
                "Attempt {} of reminder {} failed, retrying in {:?}: {}",
                reminder.attempts, reminder.id, config.retry_delay, error
            );
            reminder.record_error(error.to_string());
            if !self.persist(previous, &reminder).await? {
                return Ok(Outcome::Claimed);
            }
            tokio::time::sleep(config.retry_delay).await;
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for RunDueRemindersUseCase {
    type Response = DeliveryReport;

    type Error = UseCaseError;

    const NAME: &'static str = "RunDueReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let config = &ctx.config.delivery;
        if !ctx.channel.health_check().await {
            return Err(UseCaseError::ChannelUnavailable(format!(
                "Health check of channel {} failed",
                ctx.channel.name()
            )));
        }

        let now = ctx.sys.get_timestamp_millis();
        let stuck_before = now - config.stuck_threshold.as_millis() as i64;
        let due = ctx
            .repos
            .reminders
            .find_due(now, stuck_before)
            .await
            .map_err(|e| {
                error!("Unable to select due reminders. Err: {:?}", e);
                UseCaseError::StorageError
            })?;

        let run = Run {
            ctx,
            deadline: Instant::now() + config.run_deadline,
            aborted: AtomicBool::new(false),
        };
        let run = &run;
        let outcomes = stream::iter(due)
            .map(|reminder| run.deliver(reminder))
            .buffer_unordered(config.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut report = DeliveryReport::default();
        let mut systemic_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(Outcome::Sent) => report.sent += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::StillPending) => report.still_pending += 1,
                Ok(Outcome::Claimed) => (),
                Err(e) => {
                    report.still_pending += 1;
                    systemic_error.get_or_insert(e);
                }
            }
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            still_pending = report.still_pending,
            "Delivery run finished"
        );

        match systemic_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::schedule_reminders::ScheduleRemindersUseCase;
    use crate::reminder::test_helpers::*;
    use std::{sync::Arc, time::Duration};
    use tenancy_reminders_domain::{IdempotencyKey, ReminderKind};
    use tenancy_reminders_infra::{DeliveryErrorKind, StaticTimeSys};

    #[tokio::test]
    async fn end_to_end_scheduled_reminder_is_sent() {
        let mut ctx = setup_context(at(2025, 3, 8, 0, 0), &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::succeeding());
        let seeded = seed_client(&ctx, Some("0501234567")).await;
        let obligation = seed_payment(&ctx, &seeded, date(2025, 3, 15));
        execute(ScheduleRemindersUseCase {}, &ctx).await.unwrap();

        // Not due before 09:00
        ctx.sys = Arc::new(StaticTimeSys(at(2025, 3, 8, 8, 59)));
        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report, DeliveryReport::default());

        ctx.sys = Arc::new(StaticTimeSys(at(2025, 3, 8, 9, 1)));
        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(
            report,
            DeliveryReport {
                sent: 1,
                failed: 0,
                still_pending: 0
            }
        );

        let key = IdempotencyKey::new(ReminderKind::PaymentReminder, &obligation.id, 7);
        let reminder = ctx.repos.reminders.find_by_key(&key).await.unwrap();
        assert_eq!(reminder.state, ReminderState::Sent);
        assert_eq!(reminder.attempts, 1);
        assert_eq!(reminder.sent_at, Some(at(2025, 3, 8, 9, 1)));
        assert_eq!(channel.sent_to(), vec!["+971501234567".to_string()]);

        // Never sent twice
        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report, DeliveryReport::default());
        assert_eq!(channel.attempts(), 1);
    }

    #[tokio::test]
    async fn invalid_destination_fails_after_one_attempt() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        let channel =
            ctx.use_channel(ScriptedChannel::failing(DeliveryErrorKind::InvalidDestination));
        let reminder = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 0)).await;

        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(channel.attempts(), 1);

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.state, ReminderState::Failed);
        assert_eq!(stored.attempts, 1);
        assert!(stored
            .last_error
            .unwrap()
            .starts_with("invalid-destination"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_fail_after_max_attempts() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::hanging(Duration::from_secs(60)));
        let reminder = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 0)).await;

        let start = Instant::now();
        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(channel.attempts(), 3);
        // Three 10s timeouts separated by two 2s delays
        assert!(start.elapsed() >= Duration::from_secs(34));

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.state, ReminderState::Failed);
        assert_eq!(stored.attempts, 3);
        assert!(stored.last_error.unwrap().starts_with("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_until_sent() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::failing_times(
            2,
            DeliveryErrorKind::RateLimited,
        ));
        let reminder = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 0)).await;

        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(channel.attempts(), 3);

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.state, ReminderState::Sent);
        assert_eq!(stored.attempts, 3);
        assert_eq!(stored.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn run_deadline_leaves_unstarted_reminders() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        ctx.config.delivery.workers = 1;
        ctx.config.delivery.run_deadline = Duration::from_millis(1500);
        ctx.rate_limiter = Arc::new(tenancy_reminders_infra::RateLimiter::new(
            Duration::from_secs(1),
        ));
        ctx.use_channel(ScriptedChannel::succeeding());
        for minute in 0..4 {
            seed_due_reminder(&ctx, at(2025, 3, 8, 9, minute)).await;
        }

        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(
            report,
            DeliveryReport {
                sent: 3,
                failed: 0,
                still_pending: 1
            }
        );
        let left = ctx
            .repos
            .reminders
            .find_by_state(ReminderState::Scheduled, 10)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].scheduled_for, at(2025, 3, 8, 9, 3));
        assert_eq!(left[0].attempts, 0);
    }

    #[tokio::test]
    async fn unhealthy_channel_aborts_before_touching_reminders() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::unhealthy());
        let reminder = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 0)).await;

        let res = execute(RunDueRemindersUseCase {}, &ctx).await;
        assert!(matches!(res, Err(UseCaseError::ChannelUnavailable(_))));
        assert_eq!(channel.attempts(), 0);
        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.state, ReminderState::Scheduled);
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn unavailable_channel_aborts_the_run() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        ctx.config.delivery.workers = 1;
        let channel = ctx.use_channel(ScriptedChannel::failing(DeliveryErrorKind::Unavailable));
        let first = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 0)).await;
        let second = seed_due_reminder(&ctx, at(2025, 3, 8, 9, 1)).await;

        let res = execute(RunDueRemindersUseCase {}, &ctx).await;
        assert!(matches!(res, Err(UseCaseError::ChannelUnavailable(_))));
        assert_eq!(channel.attempts(), 1);

        // The attempt made is counted, the reminder is not failed
        let first = ctx.repos.reminders.find(&first.id).await.unwrap();
        assert_eq!(first.state, ReminderState::Pending);
        assert_eq!(first.attempts, 1);
        assert!(first.last_error.is_some());
        let second = ctx.repos.reminders.find(&second.id).await.unwrap();
        assert_eq!(second.state, ReminderState::Scheduled);
        assert_eq!(second.attempts, 0);
    }

    #[tokio::test]
    async fn reclaims_stuck_pending_reminders() {
        let now = at(2025, 3, 8, 12, 0);
        let mut ctx = setup_context(now, &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::succeeding());

        let mut stuck = due_reminder(&ctx, at(2025, 3, 8, 9, 0));
        stuck.state = ReminderState::Pending;
        stuck.attempts = 1;
        stuck.last_attempt_at = Some(now - 20 * 60 * 1000);
        let mut in_flight = due_reminder(&ctx, at(2025, 3, 8, 9, 0));
        in_flight.state = ReminderState::Pending;
        in_flight.attempts = 1;
        in_flight.last_attempt_at = Some(now - 60 * 1000);
        let mut exhausted = due_reminder(&ctx, at(2025, 3, 8, 9, 0));
        exhausted.state = ReminderState::Pending;
        exhausted.attempts = 3;
        exhausted.last_attempt_at = Some(now - 20 * 60 * 1000);
        exhausted.last_error = Some("timeout: No response within 10000 ms".into());
        for r in [&stuck, &in_flight, &exhausted] {
            ctx.repos.reminders.insert(r).await.unwrap();
        }

        let report = execute(RunDueRemindersUseCase {}, &ctx).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(channel.attempts(), 1);

        let stuck = ctx.repos.reminders.find(&stuck.id).await.unwrap();
        assert_eq!(stuck.state, ReminderState::Sent);
        assert_eq!(stuck.attempts, 2);
        let in_flight = ctx.repos.reminders.find(&in_flight.id).await.unwrap();
        assert_eq!(in_flight.state, ReminderState::Pending);
        assert_eq!(in_flight.attempts, 1);
        let exhausted = ctx.repos.reminders.find(&exhausted.id).await.unwrap();
        assert_eq!(exhausted.state, ReminderState::Failed);
        assert_eq!(exhausted.attempts, 3);
    }

    #[tokio::test]
    async fn overlapping_runs_send_each_reminder_once() {
        let mut ctx = setup_context(at(2025, 3, 8, 12, 0), &[7, 3, 1]);
        let channel = ctx.use_channel(ScriptedChannel::succeeding());
        for minute in 0..5 {
            seed_due_reminder(&ctx, at(2025, 3, 8, 9, minute)).await;
        }

        let (a, b) = futures::join!(
            execute(RunDueRemindersUseCase {}, &ctx),
            execute(RunDueRemindersUseCase {}, &ctx)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.sent + b.sent, 5);
        assert_eq!(channel.attempts(), 5);
    }
}
