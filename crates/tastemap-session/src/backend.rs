use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tastemap_schema::{AddMember, CreatedGroup, Group, GroupEmbeddings, NewGroup};

use crate::error::{Result, SessionError};

/// Supplies the focal user's embedding plus every other member's.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn group_embeddings(&self, group_id: &str, focal_user_id: &str) -> Result<GroupEmbeddings>;
}

#[async_trait]
pub trait GroupService: Send + Sync {
    async fn group_detail(&self, group_id: &str) -> Result<Group>;
    async fn create_group(&self, group: &NewGroup) -> Result<CreatedGroup>;
}

#[async_trait]
pub trait MembershipService: Send + Sync {
    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth { pub endpoint: String, pub ok: bool, pub latency_ms: f64, pub error: Option<String> }

/// reqwest client for the platform's REST API. Timeouts are enforced by the
/// client; nothing here retries.
#[derive(Debug, Clone)]
pub struct HttpBackend { client: reqwest::Client, base_url: String }

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() { return Err(SessionError::Status { status: status.as_u16(), url: resp.url().to_string() }); }
        Ok(resp.json::<T>().await?)
    }

    pub async fn health(&self) -> BackendHealth {
        let endpoint = self.url("/health");
        let started = Instant::now();
        let outcome = self.client.get(&endpoint).send().await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(resp) if resp.status().is_success() => BackendHealth { endpoint, ok: true, latency_ms, error: None },
            Ok(resp) => BackendHealth { endpoint, ok: false, latency_ms, error: Some(format!("status {}", resp.status().as_u16())) },
            Err(e) => BackendHealth { endpoint, ok: false, latency_ms, error: Some(e.to_string()) },
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpBackend {
    async fn group_embeddings(&self, group_id: &str, focal_user_id: &str) -> Result<GroupEmbeddings> {
        let resp = self.client.get(self.url(&format!("/api/groups/{group_id}/embeddings")))
            .query(&[("current_user_id", focal_user_id)])
            .send().await?;
        Self::read(resp).await
    }
}

#[async_trait]
impl GroupService for HttpBackend {
    async fn group_detail(&self, group_id: &str) -> Result<Group> {
        let resp = self.client.get(self.url(&format!("/api/groups/{group_id}/detail"))).send().await?;
        Self::read(resp).await
    }

    async fn create_group(&self, group: &NewGroup) -> Result<CreatedGroup> {
        let resp = self.client.post(self.url("/api/groups")).json(group).send().await?;
        Self::read(resp).await
    }
}

#[async_trait]
impl MembershipService for HttpBackend {
    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        let body = AddMember { user_id: user_id.to_string() };
        let resp = self.client.post(self.url(&format!("/api/groups/{group_id}/members"))).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() { return Err(SessionError::Status { status: status.as_u16(), url: resp.url().to_string() }); }
        Ok(())
    }
}
