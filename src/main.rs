mod telemetry;

use clap::{Parser, Subcommand};
use telemetry::{get_subscriber, init_subscriber};
use tenancy_reminders_api::{deliver_reminders, schedule_reminders, Application};
use tenancy_reminders_infra::{run_migration, setup_context};
use tracing::info;

#[derive(Parser)]
#[command(name = "tenancy_reminders", about = "Payment and contract expiry reminders")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run the scheduler and delivery jobs (default)
    Serve,
    /// Run the scheduler once and exit
    Schedule,
    /// Deliver the due reminders once and exit
    Deliver,
    /// Apply the database migrations and exit
    Migrate,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("tenancy_reminders".into(), "info".into());
    init_subscriber(subscriber);

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let context = setup_context().await?;
            let app = Application::new(context).await?;
            info!("Listening on port: {}", app.port());
            app.start().await?;
        }
        Command::Schedule => {
            let context = setup_context().await?;
            let report = schedule_reminders(&context).await?;
            info!(
                created = report.created,
                skipped = report.skipped,
                errors = report.errors.len(),
                "Scheduler run completed"
            );
        }
        Command::Deliver => {
            let context = setup_context().await?;
            let report = deliver_reminders(&context).await?;
            info!(
                sent = report.sent,
                failed = report.failed,
                still_pending = report.still_pending,
                "Delivery run completed"
            );
        }
        Command::Migrate => {
            run_migration().await?;
            info!("Migrations applied");
        }
    }
    Ok(())
}
