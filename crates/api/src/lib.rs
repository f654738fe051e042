mod client;
mod error;
mod job_schedulers;
mod reminder;
mod shared;
mod status;

use actix_web::{dev::Server, middleware, web, App, HttpServer};
use job_schedulers::{start_deliver_reminders_job, start_schedule_reminders_job};
use std::net::TcpListener;
use tenancy_reminders_infra::ReminderContext;
use tracing_actix_web::TracingLogger;

use reminder::{
    run_due_reminders::RunDueRemindersUseCase, schedule_reminders::ScheduleRemindersUseCase,
};
use shared::usecase::execute;

pub use reminder::{run_due_reminders::DeliveryReport, schedule_reminders::ScheduleReport};

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    client::configure_routes(cfg);
    reminder::configure_routes(cfg);
    status::configure_routes(cfg);
}

/// Runs the scheduler once outside of the server
pub async fn schedule_reminders(ctx: &ReminderContext) -> anyhow::Result<ScheduleReport> {
    execute(ScheduleRemindersUseCase {}, ctx)
        .await
        .map_err(|e| anyhow::anyhow!("Scheduler run failed: {:?}", e))
}

/// Runs the delivery worker once outside of the server
pub async fn deliver_reminders(ctx: &ReminderContext) -> anyhow::Result<DeliveryReport> {
    execute(RunDueRemindersUseCase {}, ctx)
        .await
        .map_err(|e| anyhow::anyhow!("Delivery run failed: {:?}", e))
}

pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    pub async fn new(context: ReminderContext) -> Result<Self, std::io::Error> {
        let (server, port) = Application::configure_server(context.clone()).await?;
        Application::start_job_schedulers(context);

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_job_schedulers(context: ReminderContext) {
        start_deliver_reminders_job(context.clone());
        start_schedule_reminders_job(context);
    }

    async fn configure_server(context: ReminderContext) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            let ctx = context.clone();

            App::new()
                .wrap(middleware::Compress::default())
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}
