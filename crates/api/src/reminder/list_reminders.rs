use crate::error::ApiError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use tenancy_reminders_api_structs::list_reminders::{APIResponse, QueryParams};
use tenancy_reminders_domain::{ReminderRecord, ReminderState};
use tenancy_reminders_infra::ReminderContext;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

pub async fn list_reminders_controller(
    query: web::Query<QueryParams>,
    ctx: web::Data<ReminderContext>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let usecase = ListRemindersUseCase {
        state: query.state,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminders| HttpResponse::Ok().json(APIResponse::new(reminders)))
        .map_err(ApiError::from)
}

/// Lists the reminders of the ledger in a given state, for instance the
/// `Failed` ones that need manual follow up
#[derive(Debug)]
pub struct ListRemindersUseCase {
    pub state: ReminderState,
    pub limit: i64,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidLimit(i64),
    StorageError,
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidLimit(limit) => Self::BadClientData(format!(
                "The limit: {} must be between 1 and {}",
                limit, MAX_LIMIT
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ListRemindersUseCase {
    type Response = Vec<ReminderRecord>;

    type Error = UseCaseError;

    const NAME: &'static str = "ListReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(UseCaseError::InvalidLimit(self.limit));
        }

        ctx.repos
            .reminders
            .find_by_state(self.state, self.limit)
            .await
            .map_err(|e| {
                tracing::error!("Unable to list {} reminders. Err: {:?}", self.state, e);
                UseCaseError::StorageError
            })
    }
}
