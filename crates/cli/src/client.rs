//! API client for communicating with the instrumentor service

use anyhow::{Context, Result};
use instrumentor_lib::{reader::ClusterSnapshot, PodWorkload, WorkloadEvaluation};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the instrumentor evaluation API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Latest evaluation of every workload known to the service
    pub async fn list_workloads(&self) -> Result<Vec<WorkloadEvaluation>> {
        self.get("api/v1/workloads").await
    }

    pub async fn get_workload(&self, workload: &PodWorkload) -> Result<WorkloadEvaluation> {
        let path = format!(
            "api/v1/workloads/{}/{}/{}",
            workload.namespace, workload.kind, workload.name
        );
        self.get(&path).await
    }

    /// Evaluates a snapshot with the service's distro catalog
    pub async fn evaluate(&self, snapshot: &ClusterSnapshot) -> Result<Vec<WorkloadEvaluation>> {
        self.post("api/v1/evaluate", snapshot).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
