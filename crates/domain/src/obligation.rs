use crate::{reminder::ReminderKind, shared::entity::ID};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObligationKind {
    /// A rent payment with a due date
    Payment,
    /// A lease contract with an end date
    ContractExpiry,
}

impl ObligationKind {
    pub fn reminder_kind(&self) -> ReminderKind {
        match self {
            Self::Payment => ReminderKind::PaymentReminder,
            Self::ContractExpiry => ReminderKind::ContractExpiryReminder,
        }
    }

    pub fn all() -> [ObligationKind; 2] {
        [Self::Payment, Self::ContractExpiry]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObligationStatus {
    Open,
    Closed,
}

/// An `Obligation` is a payment or a lease expiry owned by the property ledger.
/// It is only ever read by this system and is the input to reminder scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    pub id: ID,
    pub kind: ObligationKind,
    /// Due date for payments, end date for leases
    pub date: NaiveDate,
    pub status: ObligationStatus,
    /// Only present for payments
    pub amount: Option<f64>,
    pub client_id: ID,
    pub property_id: Option<ID>,
    pub unit_id: Option<ID>,
    /// Payment reference or contract number
    pub reference: Option<String>,
}

impl Obligation {
    pub fn is_open(&self) -> bool {
        self.status == ObligationStatus::Open
    }

    /// Whole days from `today` until the obligation date. Negative when the
    /// date has passed.
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.date - today).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obligation(date: NaiveDate) -> Obligation {
        Obligation {
            id: Default::default(),
            kind: ObligationKind::Payment,
            date,
            status: ObligationStatus::Open,
            amount: Some(1000.0),
            client_id: Default::default(),
            property_id: None,
            unit_id: None,
            reference: None,
        }
    }

    #[test]
    fn computes_days_until() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let o = obligation(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(o.days_until(today), 7);
        let o = obligation(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(o.days_until(today), -7);
    }

    #[test]
    fn maps_to_reminder_kind() {
        assert_eq!(
            ObligationKind::Payment.reminder_kind(),
            ReminderKind::PaymentReminder
        );
        assert_eq!(
            ObligationKind::ContractExpiry.reminder_kind(),
            ReminderKind::ContractExpiryReminder
        );
    }
}
