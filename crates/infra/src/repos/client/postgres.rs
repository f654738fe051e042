use super::IClientRepo;
use sqlx::{types::Uuid, FromRow, PgPool};
use tenancy_reminders_domain::{Client, ID};

pub struct PostgresClientRepo {
    pool: PgPool,
}

impl PostgresClientRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ClientRaw {
    client_uid: Uuid,
    name: String,
    phone: Option<String>,
    created: i64,
}

impl From<ClientRaw> for Client {
    fn from(raw: ClientRaw) -> Self {
        Self {
            id: raw.client_uid.into(),
            name: raw.name,
            phone: raw.phone,
            created: raw.created,
        }
    }
}

#[async_trait::async_trait]
impl IClientRepo for PostgresClientRepo {
    async fn insert(&self, client: &Client) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients(client_uid, name, phone, created)
            VALUES($1, $2, $3, $4)
            "#,
        )
        .bind(client.id.inner_ref())
        .bind(&client.name)
        .bind(&client.phone)
        .bind(client.created)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, client_id: &ID) -> Option<Client> {
        let raw = sqlx::query_as::<_, ClientRaw>(
            r#"
            SELECT * FROM clients AS c
            WHERE c.client_uid = $1
            "#,
        )
        .bind(client_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        Some(raw.into())
    }

    async fn find_by_phones(&self, phones: &[String]) -> anyhow::Result<Option<Client>> {
        if phones.is_empty() {
            return Ok(None);
        }
        let raw = sqlx::query_as::<_, ClientRaw>(
            r#"
            SELECT * FROM clients AS c
            WHERE c.phone = ANY($1)
            ORDER BY c.created
            LIMIT 1
            "#,
        )
        .bind(phones.to_vec())
        .fetch_optional(&self.pool)
        .await?;
        Ok(raw.map(|raw| raw.into()))
    }
}
