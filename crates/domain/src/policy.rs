use crate::{message::Locale, obligation::ObligationKind};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PAYMENT_OFFSETS: [i64; 4] = [14, 7, 3, 1];
pub const DEFAULT_CONTRACT_EXPIRY_OFFSETS: [i64; 5] = [90, 60, 30, 15, 7];
pub const DEFAULT_PAYMENT_SEND_HOUR: u32 = 9;
pub const DEFAULT_CONTRACT_EXPIRY_SEND_HOUR: u32 = 10;
pub const DEFAULT_CURRENCY: &str = "AED";
/// Offsets beyond ten years are rejected
pub const MAX_OFFSET_DAYS: i64 = 3650;

#[derive(Error, Debug, PartialEq)]
pub enum PolicyParseError {
    #[error("Offset `{0}` is not a number of days between 1 and 3650")]
    InvalidOffset(String),
    #[error("At least one offset must be given")]
    Empty,
    #[error("Hour {0} is not a valid hour of the day")]
    InvalidHour(u32),
}

/// Days before an obligation date at which reminders fire. Always non-empty,
/// sorted from the furthest offset to the nearest and free of duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetSet(Vec<i64>);

impl OffsetSet {
    pub fn new(offsets: &[i64]) -> Result<Self, PolicyParseError> {
        if let Some(invalid) = offsets.iter().find(|o| !(1..=MAX_OFFSET_DAYS).contains(*o)) {
            return Err(PolicyParseError::InvalidOffset(invalid.to_string()));
        }
        let offsets = offsets
            .iter()
            .copied()
            .sorted_by(|a, b| b.cmp(a))
            .dedup()
            .collect::<Vec<_>>();
        if offsets.is_empty() {
            return Err(PolicyParseError::Empty);
        }
        Ok(Self(offsets))
    }

    pub fn max(&self) -> i64 {
        self.0[0]
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Offsets that still lie in the future for an obligation `days_until`
    /// days away. Offsets further out than the obligation are already in the
    /// past and are never sent retroactively.
    pub fn applicable(&self, days_until: i64) -> Vec<i64> {
        self.0
            .iter()
            .copied()
            .filter(|offset| *offset <= days_until)
            .collect()
    }
}

impl FromStr for OffsetSet {
    type Err = PolicyParseError;

    /// Parses a comma separated list like `14,7,3,1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let offsets = s
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| {
                o.parse::<i64>()
                    .map_err(|_| PolicyParseError::InvalidOffset(o.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&offsets)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KindPolicy {
    pub offsets: OffsetSet,
    /// Local hour of the day at which reminders of this kind are sent
    pub send_hour: u32,
}

impl KindPolicy {
    pub fn new(offsets: OffsetSet, send_hour: u32) -> Result<Self, PolicyParseError> {
        if send_hour > 23 {
            return Err(PolicyParseError::InvalidHour(send_hour));
        }
        Ok(Self { offsets, send_hour })
    }
}

/// Everything a scheduler run needs to know about when reminders fire and
/// how they read. It is resolved once per run and passed by value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderPolicy {
    pub payment: KindPolicy,
    pub contract_expiry: KindPolicy,
    /// Timezone in which "today" and the send hours are evaluated
    pub timezone: Tz,
    /// Number of days ahead of today for which due reminders are already
    /// materialized
    pub lookahead_days: i64,
    pub locale: Locale,
    pub currency: String,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            payment: KindPolicy {
                offsets: OffsetSet(DEFAULT_PAYMENT_OFFSETS.to_vec()),
                send_hour: DEFAULT_PAYMENT_SEND_HOUR,
            },
            contract_expiry: KindPolicy {
                offsets: OffsetSet(DEFAULT_CONTRACT_EXPIRY_OFFSETS.to_vec()),
                send_hour: DEFAULT_CONTRACT_EXPIRY_SEND_HOUR,
            },
            timezone: Tz::UTC,
            lookahead_days: 0,
            locale: Locale::En,
            currency: DEFAULT_CURRENCY.into(),
        }
    }
}

/// A single reminder the scheduler should materialize for an obligation
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReminder {
    pub offset_days: i64,
    pub target_date: NaiveDate,
    pub scheduled_for: i64,
}

impl ReminderPolicy {
    pub fn for_kind(&self, kind: ObligationKind) -> &KindPolicy {
        match kind {
            ObligationKind::Payment => &self.payment,
            ObligationKind::ContractExpiry => &self.contract_expiry,
        }
    }

    pub fn today(&self, now: i64) -> NaiveDate {
        let now = DateTime::<Utc>::from_timestamp_millis(now).unwrap_or_default();
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Inclusive date window of obligations that can still receive a reminder
    /// of the given kind. Obligations dated today are out of range.
    pub fn scan_window(&self, kind: ObligationKind, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let max_offset = self.for_kind(kind).offsets.max() as u64;
        (
            today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
            today
                .checked_add_days(Days::new(max_offset))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    /// Millis timestamp of `date` at the send hour of `kind` in the policy timezone
    pub fn scheduled_for(&self, kind: ObligationKind, date: NaiveDate) -> i64 {
        let hour = self.for_kind(kind).send_hour;
        let local = date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN));
        // A send hour inside a DST gap moves to the first valid local instant
        (0..=3)
            .map(|hours| local + Duration::hours(hours))
            .find_map(|local| self.timezone.from_local_datetime(&local).earliest())
            .unwrap_or_else(|| self.timezone.from_utc_datetime(&local))
            .timestamp_millis()
    }

    /// Reminders to materialize today for an obligation of `kind` dated
    /// `obligation_date`.
    pub fn plan(
        &self,
        kind: ObligationKind,
        obligation_date: NaiveDate,
        today: NaiveDate,
    ) -> Vec<PlannedReminder> {
        let days_until = (obligation_date - today).num_days();
        let horizon = today
            .checked_add_days(Days::new(self.lookahead_days.max(0) as u64))
            .unwrap_or(NaiveDate::MAX);

        self.for_kind(kind)
            .offsets
            .applicable(days_until)
            .into_iter()
            .map(|offset_days| {
                let target_date =
                    obligation_date.checked_sub_days(Days::new(offset_days as u64));
                (offset_days, target_date)
            })
            .filter_map(|(offset_days, target_date)| Some((offset_days, target_date?)))
            .filter(|(_, target_date)| *target_date >= today && *target_date <= horizon)
            .map(|(offset_days, target_date)| PlannedReminder {
                offset_days,
                target_date,
                scheduled_for: self.scheduled_for(kind, target_date),
            })
            .collect()
    }
}
