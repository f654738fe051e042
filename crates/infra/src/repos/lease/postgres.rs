use super::ILeaseRepo;
use chrono::NaiveDate;
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::TryFrom;
use tenancy_reminders_domain::{Lease, LeaseStatus, ID};
use tracing::error;

pub struct PostgresLeaseRepo {
    pool: PgPool,
}

impl PostgresLeaseRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LeaseRaw {
    lease_uid: Uuid,
    client_uid: Uuid,
    property_uid: Uuid,
    unit_uid: Option<Uuid>,
    contract_number: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    created: i64,
}

impl TryFrom<LeaseRaw> for Lease {
    type Error = anyhow::Error;

    fn try_from(raw: LeaseRaw) -> Result<Self, Self::Error> {
        let status = LeaseStatus::parse(&raw.status)
            .ok_or_else(|| anyhow::anyhow!("Unknown lease status: {}", raw.status))?;
        Ok(Self {
            id: raw.lease_uid.into(),
            client_id: raw.client_uid.into(),
            property_id: raw.property_uid.into(),
            unit_id: raw.unit_uid.map(|id| id.into()),
            contract_number: raw.contract_number,
            start_date: raw.start_date,
            end_date: raw.end_date,
            status,
            created: raw.created,
        })
    }
}

#[async_trait::async_trait]
impl ILeaseRepo for PostgresLeaseRepo {
    async fn insert(&self, lease: &Lease) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leases
            (lease_uid, client_uid, property_uid, unit_uid, contract_number, start_date, end_date, status, created)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(lease.id.inner_ref())
        .bind(lease.client_id.inner_ref())
        .bind(lease.property_id.inner_ref())
        .bind(lease.unit_id.as_ref().map(|id| *id.inner_ref()))
        .bind(&lease.contract_number)
        .bind(lease.start_date)
        .bind(lease.end_date)
        .bind(lease.status.as_str())
        .bind(lease.created)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_client(
        &self,
        client_id: &ID,
        status: LeaseStatus,
    ) -> anyhow::Result<Vec<Lease>> {
        let rows = sqlx::query_as::<_, LeaseRaw>(
            r#"
            SELECT * FROM leases AS l
            WHERE l.client_uid = $1 AND l.status = $2
            ORDER BY l.created DESC
            "#,
        )
        .bind(client_id.inner_ref())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|raw| {
                let lease_uid = raw.lease_uid;
                Lease::try_from(raw)
                    .map_err(|e| error!("Unable to read lease {}. Err: {:?}", lease_uid, e))
                    .ok()
            })
            .collect())
    }
}
