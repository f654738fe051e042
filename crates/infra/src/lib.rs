mod config;
mod repos;
mod services;
mod system;

pub use config::{ChannelConfig, Config, DeliveryConfig, WhatsAppConfig};
pub use repos::*;
pub use services::*;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};
use tracing::info;

#[derive(Clone)]
pub struct ReminderContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub channel: Arc<dyn IDeliveryChannel>,
    /// Shared by every delivery run of this process
    pub rate_limiter: Arc<RateLimiter>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl ReminderContext {
    fn with_repos(repos: Repos, config: Config, channel: Arc<dyn IDeliveryChannel>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.delivery.send_interval));
        Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            channel,
            rate_limiter,
        }
    }

    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let config = Config::new();
        let pool = connect(&params.postgres_connection_string).await?;
        sqlx::migrate!().run(&pool).await?;
        let channel = create_channel(&config.channel, config.delivery.request_timeout)?;
        Ok(Self::with_repos(
            Repos::create_postgres(pool),
            config,
            channel,
        ))
    }

    /// Context with in-memory repositories and the log channel
    pub fn create_inmemory() -> Self {
        let config = Config::new();
        Self::with_repos(
            Repos::create_inmemory(),
            config,
            Arc::new(LogChannel::new()),
        )
    }

    /// Postgres backed context when `DATABASE_URL` is set and reachable
    pub async fn create_postgres_for_tests() -> Option<Self> {
        let connection_string = std::env::var(PSQL_CONNECTION_STRING).ok()?;
        match Self::create(ContextParams {
            postgres_connection_string: connection_string,
        })
        .await
        {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!("Skipping postgres context. Err: {:?}", e);
                None
            }
        }
    }
}

const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

async fn connect(connection_string: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(connection_string)
        .await
}

/// Will setup the infrastructure context given the environment. Postgres is
/// used when `DATABASE_URL` is present, otherwise everything is kept in memory.
pub async fn setup_context() -> anyhow::Result<ReminderContext> {
    match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(postgres_connection_string) => {
            ReminderContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
        }
        Err(_) => {
            info!(
                "{} is not set, using in-memory repositories",
                PSQL_CONNECTION_STRING
            );
            let mut ctx = ReminderContext::create_inmemory();
            ctx.channel = create_channel(&ctx.config.channel, ctx.config.delivery.request_timeout)?;
            Ok(ctx)
        }
    }
}

pub async fn run_migration() -> anyhow::Result<()> {
    let connection_string = std::env::var(PSQL_CONNECTION_STRING)
        .map_err(|_| anyhow::anyhow!("{} env var to be present.", PSQL_CONNECTION_STRING))?;
    let pool = connect(&connection_string).await?;

    sqlx::migrate!().run(&pool).await?;
    Ok(())
}
