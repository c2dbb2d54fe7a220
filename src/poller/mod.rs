use crate::error::{FetchError, ParseError};
use crate::record::Record;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;


/// Facility status endpoint of the DB FaSta API
pub const DEFAULT_ENDPOINT: &str = "http://adam.noncd.db.de/api/v1.0/facilities";

/// The API rejects requests without a user agent
pub const DEFAULT_USER_AGENT: &str = "Liftstream/1";

/// Source of the complete current facility dataset.
///
/// Implementations perform exactly one fetch per call and never touch the
/// state store; deciding what changed is the differ's job.
#[async_trait]
pub trait FacilitySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Record>, FetchError>;
}

/// HTTP client for the facility status API.
pub struct FacilityClient {
    http_client: Client,
    endpoint: String,
}

impl FacilityClient {
    pub fn new(endpoint: String, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FacilitySource for FacilityClient {
    async fn fetch(&self) -> Result<Vec<Record>, FetchError> {
        debug!(endpoint = %self.endpoint, "Requesting facilities");

        let response = self.http_client.get(&self.endpoint).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let records: Vec<Record> = serde_json::from_slice(&body).map_err(ParseError::upstream)?;

        debug!(facilities = records.len(), "Got facilities");
        Ok(records)
    }
}
