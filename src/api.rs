//! Blocking client for the salary backend REST API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::contribute::NewSalaryStory;
use crate::ingest::{decode_batch, normalize_batch};
use crate::models::SalaryRecord;
use crate::session::Session;
use crate::store::StoreError;

pub const DEFAULT_API_URL: &str = "https://trucareer-server.vercel.app/api/v1";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the salary service: {message}")]
    Network { message: String },

    /// Non-2xx response. The message is the server's own, shown verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("not logged in (run `payscope login` first)")]
    MissingToken,

    #[error("invalid search: {0}")]
    InvalidQuery(String),

    #[error("could not configure HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// The `{ message, success }` reply used by mutating endpoints and errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    pub message: Option<String>,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Parameters of the server-side search. Only the designation is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    designation: String,
    experience: Option<String>,
    department: Option<String>,
    location: Option<String>,
    employment_type: Option<String>,
}

impl SearchQuery {
    pub fn new(designation: &str) -> Result<Self, ApiError> {
        let designation = designation.trim();
        if designation.is_empty() {
            return Err(ApiError::InvalidQuery("designation is required".to_string()));
        }
        Ok(Self {
            designation: designation.to_string(),
            experience: None,
            department: None,
            location: None,
            employment_type: None,
        })
    }

    pub fn experience(mut self, value: Option<String>) -> Self {
        self.experience = value;
        self
    }

    pub fn department(mut self, value: Option<String>) -> Self {
        self.department = value;
        self
    }

    pub fn location(mut self, value: Option<String>) -> Self {
        self.location = value;
        self
    }

    pub fn employment_type(mut self, value: Option<String>) -> Self {
        self.employment_type = value;
        self
    }

    /// Query string pairs; empty optional parameters are left out.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let optional = [
            ("experience", &self.experience),
            ("department", &self.department),
            ("location", &self.location),
            ("employmentType", &self.employment_type),
        ];
        std::iter::once(("designation", self.designation.as_str()))
            .chain(optional.into_iter().filter_map(|(key, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key, v))
            }))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SalaryApi {
    base_url: String,
    client: Client,
}

impl SalaryApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // --- Public salary data ---

    /// `GET /salary/salaries`: the full, unfiltered batch.
    pub fn list_salaries(&self) -> Result<Vec<SalaryRecord>, ApiError> {
        let endpoint = "/salary/salaries";
        let values: Vec<Value> = self.fetch_data(endpoint, self.client.get(self.url(endpoint)))?;
        Ok(normalize_batch(decode_batch(values)))
    }

    /// `GET /salary/search`: server-side filtered search.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SalaryRecord>, ApiError> {
        let endpoint = "/salary/search";
        let request = self.client.get(self.url(endpoint)).query(&query.pairs());
        let values: Vec<Value> = self.fetch_data(endpoint, request)?;
        Ok(normalize_batch(decode_batch(values)))
    }

    // --- Authenticated ---

    /// `POST /admin/create-salary` with a validated story.
    pub fn create_salary(
        &self,
        session: &Session,
        story: &NewSalaryStory,
    ) -> Result<ApiMessage, ApiError> {
        let endpoint = "/admin/create-salary";
        let token = session.bearer()?;
        let request = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(token)
            .json(story);
        let reply: ApiMessage = read_json(endpoint, send(endpoint, request)?)?;
        info!(designation = %story.designation, "salary story submitted");
        Ok(reply)
    }

    /// `GET /admin/salaries`, keeping only story submissions.
    pub fn stories(&self, session: &Session) -> Result<Vec<SalaryRecord>, ApiError> {
        let endpoint = "/admin/salaries";
        let token = session.bearer()?;
        let request = self.client.get(self.url(endpoint)).bearer_auth(token);
        let values: Vec<Value> = self.fetch_data(endpoint, request)?;
        let stories: Vec<SalaryRecord> = normalize_batch(decode_batch(values))
            .into_iter()
            .filter(SalaryRecord::is_story)
            .collect();
        debug!(count = stories.len(), "kept story submissions");
        Ok(stories)
    }

    /// `GET /user/profile`.
    pub fn profile(&self, session: &Session) -> Result<UserProfile, ApiError> {
        let endpoint = "/user/profile";
        let token = session.bearer()?;
        let request = self.client.get(self.url(endpoint)).bearer_auth(token);
        self.fetch_data(endpoint, request)
    }

    // --- Accounts ---

    /// `POST /auth/login`; returns the session token.
    pub fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let endpoint = "/auth/login";
        let request = self
            .client
            .post(self.url(endpoint))
            .json(&json!({ "email": email, "password": password }));
        let reply: Value = read_json(endpoint, send(endpoint, request)?)?;
        extract_token(&reply).ok_or_else(|| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: "no access token in login response".to_string(),
        })
    }

    /// `POST /auth/create-user`.
    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<ApiMessage, ApiError> {
        let endpoint = "/auth/create-user";
        let request = self
            .client
            .post(self.url(endpoint))
            .json(&json!({ "name": name, "email": email, "password": password }));
        read_json(endpoint, send(endpoint, request)?)
    }

    fn fetch_data<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = read_json(endpoint, send(endpoint, request)?)?;
        Ok(envelope.data.unwrap_or_default())
    }
}

fn send(endpoint: &str, request: RequestBuilder) -> Result<Response, ApiError> {
    debug!(endpoint, "sending request");
    request.send().map_err(|e| ApiError::Network {
        message: e.to_string(),
    })
}

fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().map_err(|e| ApiError::Network {
        message: e.to_string(),
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|reply| reply.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        debug!(endpoint, status = status.as_u16(), "request rejected");
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn extract_token(reply: &Value) -> Option<String> {
    ["/data/accessToken", "/data/token", "/accessToken", "/token"]
        .iter()
        .find_map(|pointer| reply.pointer(pointer).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
