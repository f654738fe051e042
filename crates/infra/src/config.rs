use std::{fmt::Debug, str::FromStr, time::Duration};
use tenancy_reminders_domain::{
    KindPolicy, Locale, OffsetSet, ReminderPolicy, Tz, DEFAULT_CONTRACT_EXPIRY_OFFSETS,
    DEFAULT_CONTRACT_EXPIRY_SEND_HOUR, DEFAULT_COUNTRY_CODE, DEFAULT_CURRENCY,
    DEFAULT_PAYMENT_OFFSETS, DEFAULT_PAYMENT_SEND_HOUR,
};
use tracing::warn;

const DEFAULT_WHATSAPP_API_URL: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// Offsets, send hours, timezone and message settings used by the scheduler.
    /// The offsets can be overridden per run by the settings table.
    pub policy: ReminderPolicy,
    /// Country calling code assumed for phone numbers written without one
    pub country_code: String,
    pub delivery: DeliveryConfig,
    /// How often the in-process scheduler job runs when serving
    pub schedule_job_interval: Duration,
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Maximum number of delivery attempts of a single reminder
    pub max_attempts: i64,
    /// Fixed delay between two attempts of the same reminder
    pub retry_delay: Duration,
    /// Upper bound for a single send request
    pub request_timeout: Duration,
    /// One send is allowed per interval across all workers
    pub send_interval: Duration,
    pub workers: usize,
    /// Reminders not started within this duration are left for the next run
    pub run_deadline: Duration,
    /// `Pending` reminders whose last attempt is older than this are
    /// considered abandoned by a crashed run and are picked up again
    pub stuck_threshold: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            send_interval: Duration::from_millis(1000),
            workers: 4,
            run_deadline: Duration::from_secs(5 * 60),
            stuck_threshold: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub phone_number_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub enum ChannelConfig {
    /// Only logs the messages, nothing leaves the process
    Log,
    WhatsApp(WhatsAppConfig),
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Debug,
{
    match std::env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {:?}.",
                    key, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn kind_policy_from_env(
    offsets_key: &str,
    hour_key: &str,
    default_offsets: &[i64],
    default_hour: u32,
) -> KindPolicy {
    let default = KindPolicy {
        offsets: OffsetSet::new(default_offsets).expect("Compiled-in offsets to be valid"),
        send_hour: default_hour,
    };
    let offsets = match std::env::var(offsets_key) {
        Ok(value) => match value.parse::<OffsetSet>() {
            Ok(offsets) => offsets,
            Err(e) => {
                warn!(
                    "The given {}: {} is not valid ({}), falling back to the default: {:?}.",
                    offsets_key,
                    value,
                    e,
                    default.offsets.as_slice()
                );
                default.offsets.clone()
            }
        },
        Err(_) => default.offsets.clone(),
    };
    let send_hour = env_var_or(hour_key, default_hour);
    KindPolicy::new(offsets.clone(), send_hour).unwrap_or_else(|e| {
        warn!("{}, falling back to the default hour: {}.", e, default_hour);
        KindPolicy {
            offsets,
            send_hour: default_hour,
        }
    })
}

fn channel_from_env() -> ChannelConfig {
    let channel = std::env::var("DELIVERY_CHANNEL").unwrap_or_else(|_| "log".into());
    match channel.to_lowercase().as_str() {
        "whatsapp" => {
            let phone_number_id = std::env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default();
            let access_token = std::env::var("WHATSAPP_ACCESS_TOKEN").unwrap_or_default();
            if phone_number_id.trim().is_empty() || access_token.trim().is_empty() {
                warn!("WHATSAPP_PHONE_NUMBER_ID and WHATSAPP_ACCESS_TOKEN must be set to deliver through WhatsApp, the channel health check will fail.");
            }
            ChannelConfig::WhatsApp(WhatsAppConfig {
                api_url: std::env::var("WHATSAPP_API_URL")
                    .unwrap_or_else(|_| DEFAULT_WHATSAPP_API_URL.into()),
                phone_number_id,
                access_token,
            })
        }
        "log" => ChannelConfig::Log,
        other => {
            warn!(
                "The given DELIVERY_CHANNEL: {} is not supported, falling back to the log channel.",
                other
            );
            ChannelConfig::Log
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let policy = ReminderPolicy {
            payment: kind_policy_from_env(
                "PAYMENT_REMINDER_OFFSETS",
                "PAYMENT_REMINDER_HOUR",
                &DEFAULT_PAYMENT_OFFSETS,
                DEFAULT_PAYMENT_SEND_HOUR,
            ),
            contract_expiry: kind_policy_from_env(
                "CONTRACT_EXPIRY_REMINDER_OFFSETS",
                "CONTRACT_EXPIRY_REMINDER_HOUR",
                &DEFAULT_CONTRACT_EXPIRY_OFFSETS,
                DEFAULT_CONTRACT_EXPIRY_SEND_HOUR,
            ),
            timezone: env_var_or("REMINDER_TIMEZONE", Tz::UTC),
            lookahead_days: env_var_or("SCHEDULE_LOOKAHEAD_DAYS", 0),
            locale: env_var_or("MESSAGE_LOCALE", Locale::En),
            currency: env_var_or("CURRENCY", DEFAULT_CURRENCY.to_string()),
        };

        let default_delivery = DeliveryConfig::default();
        let delivery = DeliveryConfig {
            max_attempts: env_var_or("DELIVERY_MAX_ATTEMPTS", default_delivery.max_attempts)
                .max(1),
            retry_delay: Duration::from_secs(env_var_or(
                "DELIVERY_RETRY_DELAY_SECS",
                default_delivery.retry_delay.as_secs(),
            )),
            request_timeout: Duration::from_secs(env_var_or(
                "DELIVERY_REQUEST_TIMEOUT_SECS",
                default_delivery.request_timeout.as_secs(),
            )),
            send_interval: Duration::from_millis(env_var_or(
                "DELIVERY_SEND_INTERVAL_MILLIS",
                default_delivery.send_interval.as_millis() as u64,
            )),
            workers: env_var_or("DELIVERY_WORKERS", default_delivery.workers).max(1),
            run_deadline: Duration::from_secs(env_var_or(
                "DELIVERY_RUN_DEADLINE_SECS",
                default_delivery.run_deadline.as_secs(),
            )),
            stuck_threshold: Duration::from_secs(env_var_or(
                "DELIVERY_STUCK_THRESHOLD_SECS",
                default_delivery.stuck_threshold.as_secs(),
            )),
        };

        Self {
            port: env_var_or("PORT", 5000),
            policy,
            country_code: env_var_or("DEFAULT_COUNTRY_CODE", DEFAULT_COUNTRY_CODE.to_string()),
            delivery,
            schedule_job_interval: Duration::from_secs(env_var_or(
                "SCHEDULE_JOB_INTERVAL_SECS",
                60 * 60,
            )),
            channel: channel_from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
