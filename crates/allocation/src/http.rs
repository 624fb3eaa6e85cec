//! HTTP implementation of the allocation client.

use std::time::Duration;

use async_trait::async_trait;
use common::RoomId;
use reqwest::{Client, Response, StatusCode};

use crate::client::AllocationClient;
use crate::error::AllocationError;

/// Talks to the allocation service over HTTP.
///
/// Endpoints, relative to `base_url`:
/// - `GET  /api/rooms/allocate` → 200 with a JSON room id, or 204 / `null`
/// - `POST /api/rooms/{id}/confirm-availability`
/// - `POST /api/rooms/{id}/release`
#[derive(Debug, Clone)]
pub struct HttpAllocationClient {
    client: Client,
    base_url: String,
}

impl HttpAllocationClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wraps an already configured `reqwest` client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn room_url(&self, room_id: RoomId, action: &str) -> String {
        format!("{}/api/rooms/{}/{}", self.base_url, room_id, action)
    }

    async fn post(&self, operation: &'static str, url: String) -> Result<(), AllocationError> {
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(operation, response.status())?;
        Ok(())
    }
}

#[async_trait]
impl AllocationClient for HttpAllocationClient {
    #[tracing::instrument(skip(self))]
    async fn allocate(&self) -> Result<Option<RoomId>, AllocationError> {
        let url = format!("{}/api/rooms/allocate", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        check_status("allocate", response.status())?;
        parse_room(response).await
    }

    #[tracing::instrument(skip(self), fields(room_id = %room_id))]
    async fn confirm(&self, room_id: RoomId) -> Result<(), AllocationError> {
        self.post("confirm", self.room_url(room_id, "confirm-availability"))
            .await
    }

    #[tracing::instrument(skip(self), fields(room_id = %room_id))]
    async fn release(&self, room_id: RoomId) -> Result<(), AllocationError> {
        self.post("release", self.room_url(room_id, "release")).await
    }
}

fn transport_error(err: reqwest::Error) -> AllocationError {
    tracing::debug!(error = %err, "allocation request failed");
    AllocationError::RemoteUnavailable(err.to_string())
}

fn check_status(operation: &'static str, status: StatusCode) -> Result<(), AllocationError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(AllocationError::RemoteUnavailable(format!(
            "{operation} answered HTTP {}",
            status.as_u16()
        )))
    } else {
        Err(AllocationError::Rejected {
            operation,
            status: status.as_u16(),
        })
    }
}

async fn parse_room(response: Response) -> Result<Option<RoomId>, AllocationError> {
    let body = response.text().await.map_err(transport_error)?;
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let room: Option<i64> = serde_json::from_str(body)
        .map_err(|e| AllocationError::InvalidResponse(format!("{e}: {body}")))?;
    Ok(room.map(RoomId::new))
}
