use super::IObligationRepo;
use crate::repos::shared::inmemory_repo::*;
use chrono::NaiveDate;
use std::sync::Mutex;
use tenancy_reminders_domain::{Obligation, ObligationKind};

/// Stands in for the payment and lease ledger. Unlike the trait, which is
/// read only, it can be filled with `insert`.
pub struct InMemoryObligationRepo {
    obligations: Mutex<Vec<Obligation>>,
}

impl InMemoryObligationRepo {
    pub fn new() -> Self {
        Self {
            obligations: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, obligation: &Obligation) {
        insert(obligation, &self.obligations);
    }
}

impl Default for InMemoryObligationRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IObligationRepo for InMemoryObligationRepo {
    async fn find_open_between(
        &self,
        kind: ObligationKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<Obligation>> {
        let mut obligations = find_by(&self.obligations, |o| {
            o.kind == kind && o.is_open() && o.date >= from && o.date <= to
        });
        obligations.sort_by_key(|o| o.date);
        Ok(obligations)
    }
}
