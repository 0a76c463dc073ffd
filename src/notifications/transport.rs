//! Transport to the remote notifications API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::NotificationError;
use super::models::{Notification, NotificationFilters, NotificationList, Pagination};

pub type TransportResult<T> = Result<T, NotificationError>;

/// Remote source of truth for notifications.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// List notifications matching `filters`, optionally paginated.
    async fn list(
        &self,
        filters: NotificationFilters,
        pagination: Option<Pagination>,
    ) -> TransportResult<NotificationList>;

    /// Fetch a single notification by id.
    async fn get(&self, id: &str) -> TransportResult<Notification>;

    /// Mark a notification as viewed. Returns the updated record.
    async fn mark_viewed(&self, notification: &Notification) -> TransportResult<Notification>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    #[serde(flatten)]
    filters: &'a NotificationFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct InfoRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id: &'a str,
    viewed_at: DateTime<Utc>,
}

/// HTTP client for the RPC-style notifications API.
pub struct HttpNotificationTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpNotificationTransport {
    /// Create a new transport.
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://docs.example.com/api")
    /// * `api_token` - Bearer token sent with every request, if any
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout_sec: u64,
    ) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, method: &str, body: &B) -> TransportResult<(StatusCode, Option<T>)>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url, method);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("POST {} -> {}", url, status);

        if status == StatusCode::NOT_FOUND {
            return Ok((status, None));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok((status, Some(envelope.data)))
    }
}

#[async_trait]
impl NotificationTransport for HttpNotificationTransport {
    async fn list(
        &self,
        filters: NotificationFilters,
        pagination: Option<Pagination>,
    ) -> TransportResult<NotificationList> {
        let body = ListRequest {
            filters: &filters,
            offset: pagination.map(|p| p.offset()),
            limit: pagination.map(|p| p.per_page),
        };
        match self.post("notifications.list", &body).await? {
            (_, Some(list)) => Ok(list),
            (status, None) => Err(NotificationError::Status {
                status: status.as_u16(),
                message: "notifications.list not found".to_string(),
            }),
        }
    }

    async fn get(&self, id: &str) -> TransportResult<Notification> {
        self.post("notifications.info", &InfoRequest { id })
            .await?
            .1
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))
    }

    async fn mark_viewed(&self, notification: &Notification) -> TransportResult<Notification> {
        let body = UpdateRequest {
            id: &notification.id,
            viewed_at: Utc::now(),
        };
        self.post("notifications.update", &body)
            .await?
            .1
            .ok_or_else(|| NotificationError::NotFound(notification.id.clone()))
    }
}
