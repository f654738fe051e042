use super::IPropertyRepo;
use sqlx::{types::Uuid, FromRow, PgPool};
use tenancy_reminders_domain::{Property, Unit, ID};

pub struct PostgresPropertyRepo {
    pool: PgPool,
}

impl PostgresPropertyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PropertyRaw {
    property_uid: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct UnitRaw {
    unit_uid: Uuid,
    property_uid: Uuid,
    number: String,
}

impl From<PropertyRaw> for Property {
    fn from(raw: PropertyRaw) -> Self {
        Self {
            id: raw.property_uid.into(),
            name: raw.name,
        }
    }
}

impl From<UnitRaw> for Unit {
    fn from(raw: UnitRaw) -> Self {
        Self {
            id: raw.unit_uid.into(),
            property_id: raw.property_uid.into(),
            number: raw.number,
        }
    }
}

#[async_trait::async_trait]
impl IPropertyRepo for PostgresPropertyRepo {
    async fn insert_property(&self, property: &Property) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO properties(property_uid, name)
            VALUES($1, $2)
            "#,
        )
        .bind(property.id.inner_ref())
        .bind(&property.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_unit(&self, unit: &Unit) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO units(unit_uid, property_uid, number)
            VALUES($1, $2, $3)
            "#,
        )
        .bind(unit.id.inner_ref())
        .bind(unit.property_id.inner_ref())
        .bind(&unit.number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, property_id: &ID) -> Option<Property> {
        let raw = sqlx::query_as::<_, PropertyRaw>(
            r#"
            SELECT * FROM properties AS p
            WHERE p.property_uid = $1
            "#,
        )
        .bind(property_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        Some(raw.into())
    }

    async fn find_unit(&self, unit_id: &ID) -> Option<Unit> {
        let raw = sqlx::query_as::<_, UnitRaw>(
            r#"
            SELECT * FROM units AS u
            WHERE u.unit_uid = $1
            "#,
        )
        .bind(unit_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        Some(raw.into())
    }
}
