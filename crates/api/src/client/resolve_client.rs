use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use tenancy_reminders_api_structs::get_client_by_phone::{APIResponse, PathParams};
use tenancy_reminders_domain::{phone_candidates, ClientContext, LeaseStatus};
use tenancy_reminders_infra::ReminderContext;
use tracing::{error, warn};

pub async fn get_client_by_phone_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let usecase = ResolveClientByPhoneUseCase {
        phone: path.into_inner().phone,
    };

    execute(usecase, &ctx)
        .await
        .map(|context| HttpResponse::Ok().json(APIResponse::new(context)))
        .map_err(ApiError::from)
}

/// Finds the client owning a phone number written in any format, together
/// with the lease, property and unit the client currently rents
#[derive(Debug)]
pub struct ResolveClientByPhoneUseCase {
    pub phone: String,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(String),
    StorageError,
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(phone) => Self::NotFound(format!(
                "A client with the phone number: {}, was not found.",
                phone
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ResolveClientByPhoneUseCase {
    type Response = ClientContext;

    type Error = UseCaseError;

    const NAME: &'static str = "ResolveClientByPhone";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let candidates = phone_candidates(&self.phone, &ctx.config.country_code);
        let client = ctx
            .repos
            .clients
            .find_by_phones(&candidates)
            .await
            .map_err(|e| {
                error!("Unable to look up client by phone. Err: {:?}", e);
                UseCaseError::StorageError
            })?
            .ok_or_else(|| UseCaseError::NotFound(self.phone.clone()))?;

        let lease = ctx
            .repos
            .leases
            .find_by_client(&client.id, LeaseStatus::Active)
            .await
            .map_err(|e| {
                error!("Unable to load leases of client {}. Err: {:?}", client.id, e);
                UseCaseError::StorageError
            })?
            .into_iter()
            .next();

        let lease = match lease {
            Some(lease) => lease,
            None => return Ok(ClientContext::without_lease(client)),
        };

        let property = ctx.repos.properties.find(&lease.property_id).await;
        if property.is_none() {
            warn!(
                "Lease {} references property {} which does not exist",
                lease.id, lease.property_id
            );
        }
        let unit = match &lease.unit_id {
            Some(unit_id) => ctx.repos.properties.find_unit(unit_id).await,
            None => None,
        };

        Ok(ClientContext {
            client,
            active_lease: Some(lease),
            property,
            unit,
        })
    }
}
