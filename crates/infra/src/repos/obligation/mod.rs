mod inmemory;
mod postgres;

pub use inmemory::InMemoryObligationRepo;
pub use postgres::PostgresObligationRepo;

use chrono::NaiveDate;
use tenancy_reminders_domain::{Obligation, ObligationKind};

/// Read access to the payment and lease ledger owned by the property system
#[async_trait::async_trait]
pub trait IObligationRepo: Send + Sync {
    /// Open obligations of `kind` dated within `[from, to]`, both inclusive
    async fn find_open_between(
        &self,
        kind: ObligationKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<Obligation>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_reminders_domain::{ObligationStatus, ID};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn obligation(kind: ObligationKind, date: NaiveDate, status: ObligationStatus) -> Obligation {
        Obligation {
            id: ID::default(),
            kind,
            date,
            status,
            amount: None,
            client_id: ID::default(),
            property_id: None,
            unit_id: None,
            reference: None,
        }
    }

    #[tokio::test]
    async fn finds_open_obligations_in_window() {
        let repo = InMemoryObligationRepo::new();
        let inside = obligation(ObligationKind::Payment, date(10), ObligationStatus::Open);
        let first_day = obligation(ObligationKind::Payment, date(9), ObligationStatus::Open);
        let last_day = obligation(ObligationKind::Payment, date(22), ObligationStatus::Open);
        let closed = obligation(ObligationKind::Payment, date(10), ObligationStatus::Closed);
        let outside = obligation(ObligationKind::Payment, date(23), ObligationStatus::Open);
        let other_kind = obligation(ObligationKind::ContractExpiry, date(10), ObligationStatus::Open);
        for o in [&inside, &first_day, &last_day, &closed, &outside, &other_kind] {
            repo.insert(o);
        }

        let found = repo
            .find_open_between(ObligationKind::Payment, date(9), date(22))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect::<Vec<_>>();
        assert_eq!(found.len(), 3);
        assert!(found.contains(&inside.id));
        assert!(found.contains(&first_day.id));
        assert!(found.contains(&last_day.id));
    }
}
