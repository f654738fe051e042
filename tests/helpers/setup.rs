use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tenancy_reminders_api::Application;
use tenancy_reminders_domain::{
    Client, KindPolicy, Lease, LeaseStatus, Obligation, ObligationKind, ObligationStatus,
    OffsetSet, Property, Tz, Unit,
};
use tenancy_reminders_infra::{InMemoryObligationRepo, ReminderContext, StaticTimeSys};
use tenancy_reminders_sdk::TenancyRemindersSDK;

pub struct TestApp {
    pub ctx: ReminderContext,
    pub obligations: Arc<InMemoryObligationRepo>,
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .timestamp_millis()
}

/// In-memory context pinned to `now`, sending through the log channel
pub fn test_context(now: i64) -> TestApp {
    let mut ctx = ReminderContext::create_inmemory();
    let obligations = Arc::new(InMemoryObligationRepo::new());
    ctx.repos.obligations = obligations.clone();
    ctx.sys = Arc::new(StaticTimeSys(now));
    ctx.config.port = 0; // Random port
    ctx.config.country_code = "971".into();
    ctx.config.policy.payment = KindPolicy::new(OffsetSet::new(&[7, 3, 1]).unwrap(), 9).unwrap();
    ctx.config.policy.timezone = Tz::UTC;
    ctx.config.policy.lookahead_days = 0;
    ctx.config.policy.currency = "AED".into();

    TestApp { ctx, obligations }
}

pub struct Tenant {
    pub client: Client,
    pub property: Property,
    pub unit: Unit,
    pub lease: Lease,
}

pub async fn seed_tenant(app: &TestApp, phone: &str) -> Tenant {
    let client = Client {
        id: Default::default(),
        name: "Sara".into(),
        phone: Some(phone.into()),
        created: 0,
    };
    let property = Property {
        id: Default::default(),
        name: "Marina Heights".into(),
    };
    let unit = Unit {
        id: Default::default(),
        property_id: property.id.clone(),
        number: "1204".into(),
    };
    let lease = Lease {
        id: Default::default(),
        client_id: client.id.clone(),
        property_id: property.id.clone(),
        unit_id: Some(unit.id.clone()),
        contract_number: "LC-2024-17".into(),
        start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        status: LeaseStatus::Active,
        created: 0,
    };
    let repos = &app.ctx.repos;
    repos.clients.insert(&client).await.unwrap();
    repos.properties.insert_property(&property).await.unwrap();
    repos.properties.insert_unit(&unit).await.unwrap();
    repos.leases.insert(&lease).await.unwrap();

    Tenant {
        client,
        property,
        unit,
        lease,
    }
}

pub fn seed_payment(app: &TestApp, tenant: &Tenant, due: NaiveDate) -> Obligation {
    let obligation = Obligation {
        id: Default::default(),
        kind: ObligationKind::Payment,
        date: due,
        status: ObligationStatus::Open,
        amount: Some(1000.0),
        client_id: tenant.client.id.clone(),
        property_id: Some(tenant.property.id.clone()),
        unit_id: Some(tenant.unit.id.clone()),
        reference: Some("PAY-77".into()),
    };
    app.obligations.insert(&obligation);
    obligation
}

// Launch the application as a background task
pub async fn spawn_app(app: &TestApp) -> TenancyRemindersSDK {
    let application = Application::new(app.ctx.clone())
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}/api/v1", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TenancyRemindersSDK::new(address)
}
