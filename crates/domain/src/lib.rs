mod client;
mod message;
mod obligation;
mod phone;
mod policy;
mod reminder;
mod shared;

pub use client::{Client, ClientContext, Lease, LeaseStatus, Property, Unit};
pub use message::{render_message, Locale};
pub use obligation::{Obligation, ObligationKind, ObligationStatus};
pub use phone::{normalize_recipient, phone_candidates, DEFAULT_COUNTRY_CODE};
pub use policy::{
    KindPolicy, OffsetSet, PlannedReminder, PolicyParseError, ReminderPolicy,
    DEFAULT_CONTRACT_EXPIRY_OFFSETS, DEFAULT_CONTRACT_EXPIRY_SEND_HOUR, DEFAULT_CURRENCY,
    DEFAULT_PAYMENT_OFFSETS, DEFAULT_PAYMENT_SEND_HOUR,
};
pub use reminder::{
    IdempotencyKey, InvalidTransition, ParseReminderError, ReminderKind, ReminderPayload,
    ReminderRecord, ReminderState,
};
pub use shared::entity::{Entity, InvalidIDError, ID};

pub use chrono_tz::Tz;
