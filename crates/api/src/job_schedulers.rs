use crate::{
    reminder::{
        run_due_reminders::RunDueRemindersUseCase, schedule_reminders::ScheduleRemindersUseCase,
    },
    shared::usecase::execute,
};
use actix_web::rt::time::{interval, sleep_until, Instant};
use std::time::Duration;
use tenancy_reminders_infra::ReminderContext;

pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Expands open obligations into reminders right away and then on every
/// configured interval
pub fn start_schedule_reminders_job(ctx: ReminderContext) {
    actix_web::rt::spawn(async move {
        let mut interval = interval(ctx.config.schedule_job_interval);
        loop {
            interval.tick().await;

            let usecase = ScheduleRemindersUseCase {};
            let _ = execute(usecase, &ctx).await;
        }
    });
}

/// Delivers due reminders at the start of every minute
pub fn start_deliver_reminders_job(ctx: ReminderContext) {
    actix_web::rt::spawn(async move {
        let now = ctx.sys.get_timestamp_millis();
        let secs_to_next_run = get_start_delay(now as usize, 0);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run as u64);

        sleep_until(start).await;
        let mut minutely_interval = interval(Duration::from_secs(60));
        loop {
            minutely_interval.tick().await;
            let context = ctx.clone();
            // Runs may overlap, the ledger only lets one of them claim a reminder
            actix_web::rt::spawn(async move {
                let usecase = RunDueRemindersUseCase {};
                let _ = execute(usecase, &context).await;
            });
        }
    });
}
