use super::IObligationRepo;
use chrono::NaiveDate;
use sqlx::{types::Uuid, FromRow, PgPool};
use tenancy_reminders_domain::{Obligation, ObligationKind, ObligationStatus};

/// Reads payments and leases straight from the property system tables
pub struct PostgresObligationRepo {
    pool: PgPool,
}

impl PostgresObligationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRaw {
    payment_uid: Uuid,
    client_uid: Uuid,
    property_uid: Option<Uuid>,
    unit_uid: Option<Uuid>,
    reference: Option<String>,
    amount: f64,
    due_date: NaiveDate,
}

#[derive(Debug, FromRow)]
struct LeaseRaw {
    lease_uid: Uuid,
    client_uid: Uuid,
    property_uid: Uuid,
    unit_uid: Option<Uuid>,
    contract_number: String,
    end_date: NaiveDate,
}

impl From<PaymentRaw> for Obligation {
    fn from(raw: PaymentRaw) -> Self {
        Self {
            id: raw.payment_uid.into(),
            kind: ObligationKind::Payment,
            date: raw.due_date,
            status: ObligationStatus::Open,
            amount: Some(raw.amount),
            client_id: raw.client_uid.into(),
            property_id: raw.property_uid.map(|id| id.into()),
            unit_id: raw.unit_uid.map(|id| id.into()),
            reference: raw.reference,
        }
    }
}

impl From<LeaseRaw> for Obligation {
    fn from(raw: LeaseRaw) -> Self {
        Self {
            id: raw.lease_uid.into(),
            kind: ObligationKind::ContractExpiry,
            date: raw.end_date,
            status: ObligationStatus::Open,
            amount: None,
            client_id: raw.client_uid.into(),
            property_id: Some(raw.property_uid.into()),
            unit_id: raw.unit_uid.map(|id| id.into()),
            reference: Some(raw.contract_number),
        }
    }
}

#[async_trait::async_trait]
impl IObligationRepo for PostgresObligationRepo {
    async fn find_open_between(
        &self,
        kind: ObligationKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<Obligation>> {
        let obligations = match kind {
            ObligationKind::Payment => sqlx::query_as::<_, PaymentRaw>(
                r#"
                SELECT p.payment_uid, p.client_uid, p.property_uid, p.unit_uid, p.reference, p.amount, p.due_date
                FROM payments AS p
                WHERE p.status = 'open' AND p.due_date BETWEEN $1 AND $2
                ORDER BY p.due_date
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|raw| raw.into())
            .collect(),
            ObligationKind::ContractExpiry => sqlx::query_as::<_, LeaseRaw>(
                r#"
                SELECT l.lease_uid, l.client_uid, l.property_uid, l.unit_uid, l.contract_number, l.end_date
                FROM leases AS l
                WHERE l.status = 'active' AND l.end_date BETWEEN $1 AND $2
                ORDER BY l.end_date
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|raw| raw.into())
            .collect(),
        };
        Ok(obligations)
    }
}
