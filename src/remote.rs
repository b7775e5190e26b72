use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const RECORD_TYPE: &str = "journal";

/// Failures from the remote record store. Callers log and drop these; local
/// state is left unchanged and the operation is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode remote payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Field payload of one journal record as the remote store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    pub uuid: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<RecordLocation>,
}

/// Identifiers the remote assigns once a record is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub record_name: String,
    pub change_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub record_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub data: RecordData,
}

/// A standing request to be told about create/update/delete on journal
/// records. Registration only; nothing here consumes the notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSubscription {
    pub id: String,
    pub record_type: String,
    pub fires_on: Vec<String>,
    pub content_available: bool,
    pub desired_keys: Vec<String>,
}

/// The remote record store the sync bridge talks to. Kept behind a trait so
/// tests can substitute an in-memory double.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn save_record(&self, data: &RecordData) -> Result<SavedRecord, RemoteError>;

    /// `owner == None` queries every record; `Some(owner)` restricts to
    /// records created by that identity.
    async fn query_records(&self, owner: Option<&str>) -> Result<Vec<RemoteRecord>, RemoteError>;

    async fn delete_record(&self, record_name: &str) -> Result<(), RemoteError>;

    async fn save_subscription(&self, subscription: &RecordSubscription)
        -> Result<(), RemoteError>;

    /// The caller's identity as assigned by the remote store.
    async fn user_record_id(&self) -> Result<String, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    record_name: String,
}

/// JSON-over-HTTP implementation against a configurable base URL. Timeouts
/// and retries are whatever the client defaults to.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        HttpRemoteStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn save_record(&self, data: &RecordData) -> Result<SavedRecord, RemoteError> {
        let response = self
            .client
            .post(self.endpoint(&format!("records/{RECORD_TYPE}")))
            .json(data)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn query_records(&self, owner: Option<&str>) -> Result<Vec<RemoteRecord>, RemoteError> {
        let mut request = self.client.get(self.endpoint(&format!("records/{RECORD_TYPE}")));
        if let Some(owner) = owner {
            request = request.query(&[("owner", owner)]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn delete_record(&self, record_name: &str) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("records/{RECORD_TYPE}/{record_name}")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(())
    }

    async fn save_subscription(
        &self,
        subscription: &RecordSubscription,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint("subscriptions"))
            .json(subscription)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(())
    }

    async fn user_record_id(&self) -> Result<String, RemoteError> {
        let response = self.client.get(self.endpoint("user")).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        let user: UserRecord = serde_json::from_slice(&response.bytes().await?)?;
        Ok(user.record_name)
    }
}
