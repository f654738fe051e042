use crate::shared::entity::{Entity, ID};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderKind {
    PaymentReminder,
    ContractExpiryReminder,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentReminder => "payment",
            Self::ContractExpiryReminder => "contract-expiry",
        }
    }
}

impl Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseReminderError {
    #[error("Unknown reminder kind: {0}")]
    Kind(String),
    #[error("Unknown reminder state: {0}")]
    State(String),
}

impl FromStr for ReminderKind {
    type Err = ParseReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(Self::PaymentReminder),
            "contract-expiry" => Ok(Self::ContractExpiryReminder),
            _ => Err(ParseReminderError::Kind(s.to_string())),
        }
    }
}

/// Lifecycle of a `ReminderRecord`.
///
/// `Scheduled -> Pending -> {Sent | Failed}`. `Pending -> Pending` happens
/// for every retry or when a stuck record is reclaimed. `Sent` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderState {
    Scheduled,
    Pending,
    Sent,
    Failed,
}

impl ReminderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    pub fn can_transition_to(&self, next: ReminderState) -> bool {
        use ReminderState::*;
        matches!(
            (self, next),
            (Scheduled, Pending) | (Pending, Pending) | (Pending, Sent) | (Pending, Failed)
        )
    }
}

impl Display for ReminderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderState {
    type Err = ParseReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseReminderError::State(s.to_string())),
        }
    }
}

/// Deterministic key of a reminder derived from the obligation it belongs to
/// and the offset it fires at. The ledger enforces uniqueness on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(kind: ReminderKind, obligation_id: &ID, offset_days: i64) -> Self {
        Self(format!("{}:{}:{}", kind, obligation_id, offset_days))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdempotencyKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message and context captured when the reminder was scheduled, so that
/// delivery does not depend on the obligation being unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub body: String,
    pub obligation_id: ID,
    pub obligation_date: NaiveDate,
    pub client_name: String,
    pub amount: Option<f64>,
    pub currency: String,
    pub property_name: Option<String>,
    pub unit_number: Option<String>,
    pub reference: Option<String>,
}

#[derive(Error, Debug, PartialEq)]
#[error("Reminder {id} can not transition from {from} to {to}")]
pub struct InvalidTransition {
    pub id: ID,
    pub from: ReminderState,
    pub to: ReminderState,
}

/// A `ReminderRecord` is a single notification obligation of the ledger:
/// one message to one phone number at `scheduled_for`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRecord {
    pub id: ID,
    pub idempotency_key: IdempotencyKey,
    pub client_id: ID,
    /// Normalized `+<country code><national number>`
    pub recipient_phone: String,
    pub kind: ReminderKind,
    pub offset_days: i64,
    /// Millis timestamp at which the reminder becomes due. Never changes after
    /// creation.
    pub scheduled_for: i64,
    pub state: ReminderState,
    pub attempts: i64,
    pub payload: ReminderPayload,
    /// Last delivery error, kept for diagnostics of `Failed` reminders
    pub last_error: Option<String>,
    pub last_attempt_at: Option<i64>,
    pub created: i64,
    pub sent_at: Option<i64>,
}

impl Entity for ReminderRecord {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl ReminderRecord {
    fn transition(&mut self, to: ReminderState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Marks the start of a delivery attempt
    pub fn begin_attempt(&mut self, now: i64) -> Result<(), InvalidTransition> {
        self.transition(ReminderState::Pending)?;
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        Ok(())
    }

    pub fn mark_sent(&mut self, now: i64) -> Result<(), InvalidTransition> {
        self.transition(ReminderState::Sent)?;
        self.sent_at = Some(now);
        self.last_error = None;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: String) -> Result<(), InvalidTransition> {
        self.transition(ReminderState::Failed)?;
        self.last_error = Some(error);
        Ok(())
    }

    /// Records a transient error while the reminder stays `Pending`
    pub fn record_error(&mut self, error: String) {
        self.last_error = Some(error);
    }
}
