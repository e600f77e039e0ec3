use crate::error::{Error, Result};
use crate::protocol::medical::MedicalDataEnvelope;
use crate::protocol::rag::{RagRequest, RagResponse};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const MEDICAL_DATA_PATH: &str = "/api/medical-data";
const RAG_PATH: &str = "/api/rag";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP adapter for the emergency-response backend.
///
/// Stateless apart from the pooled client; every call is a single request
/// with no retry or backoff.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new client for the given backend base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_POOL_IDLE_TIMEOUT)
    }

    /// Create a new client with custom timeouts.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn with_timeouts(
        base_url: &str,
        timeout: Duration,
        pool_idle_timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(pool_idle_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Fetch the medical record for `name`.
    ///
    /// `name` is free text from conversation context; it gets no validation
    /// beyond URL encoding.
    ///
    /// # Errors
    /// Returns [`Error::MedicalLookup`] with the status code on any non-200
    /// response, or a transport/parse error.
    pub async fn fetch_medical_data(&self, name: &str) -> Result<MedicalDataEnvelope> {
        let mut url = self.base_url.join(MEDICAL_DATA_PATH)?;
        url.query_pairs_mut().append_pair("name", name);

        tracing::info!(%url, "fetching medical data");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::MedicalLookup { status: status.as_u16() });
        }

        Ok(response.json().await?)
    }

    /// Ask the emergency-information knowledge base a free-text question.
    ///
    /// # Errors
    /// Returns [`Error::EmergencyQuery`] carrying the status code and the
    /// response body text on any non-200 response, or a transport/parse
    /// error.
    pub async fn query_emergency_info(&self, query: &str) -> Result<String> {
        let url = self.base_url.join(RAG_PATH)?;

        let response = self
            .client
            .post(url)
            .json(&RagRequest::new(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EmergencyQuery { status: status.as_u16(), body });
        }

        let parsed: RagResponse = response.json().await?;
        Ok(parsed.into_answer())
    }
}
