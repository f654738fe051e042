use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

pub(crate) struct BaseClient {
    address: String,
    client: Client,
}

#[derive(Debug)]
pub enum APIError {
    Network,
    MalformedResponse,
    NotFound,
    BadClientData,
    /// The server could not reach the delivery channel or the ledger
    ServiceUnavailable,
    UnexpectedStatusCode(StatusCode),
}
pub type APIResponse<T> = Result<T, APIError>;

impl BaseClient {
    pub fn new(address: String) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: String) -> RequestBuilder {
        let url = format!("{}/{}", self.address, path);
        self.client.request(method, &url)
    }

    fn check_status_code(res: &Response, expected_status_code: StatusCode) -> Result<(), APIError> {
        let status = res.status();
        if status == expected_status_code {
            return Ok(());
        }
        Err(match status {
            StatusCode::NOT_FOUND => APIError::NotFound,
            StatusCode::BAD_REQUEST => APIError::BadClientData,
            StatusCode::SERVICE_UNAVAILABLE => APIError::ServiceUnavailable,
            _ => APIError::UnexpectedStatusCode(status),
        })
    }

    async fn handle_api_response<T: for<'de> Deserialize<'de>>(
        res: Response,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        Self::check_status_code(&res, expected_status_code)?;
        res.json::<T>()
            .await
            .map_err(|_| APIError::MalformedResponse)
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let res = match self.request(Method::GET, path).send().await {
            Ok(res) => res,
            Err(_) => return Err(APIError::Network),
        };
        Self::handle_api_response(res, expected_status_code).await
    }

    pub async fn post<T: for<'de> Deserialize<'de>, S: Serialize>(
        &self,
        body: S,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let res = match self.request(Method::POST, path).json(&body).send().await {
            Ok(res) => res,
            Err(_) => return Err(APIError::Network),
        };
        Self::handle_api_response(res, expected_status_code).await
    }
}
