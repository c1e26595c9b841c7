use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use keyshare_types::api::{
    DevicePublicKeyResponse, KeyGrantRequest, OrganizationBootstrapRequest, PublicKeyRequest,
    RegisterDeviceRequest,
};
use keyshare_types::{
    DeviceId, EncryptedKeyGrant, OrganizationId, OrganizationRecord, SessionToken, UserId,
    UserRecord,
};

use crate::directory::DirectoryClient;
use crate::error::DirectoryError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies longer than this are cut before they land in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// JSON-over-HTTP directory client. Every request carries the session
/// token as a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(config: HttpConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("keyshare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, token: &SessionToken, path: &str, body: &B) -> Result<T, DirectoryError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let req = self.client.post(self.url(path)).bearer_auth(token.expose()).json(body);
        send(req, path).await
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder, what: &str) -> Result<T, DirectoryError> {
    let resp = req.send().await?;
    let status = resp.status();

    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(DirectoryError::Unauthorized),
        StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(what.to_string())),
        _ => {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            Err(DirectoryError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectory {
    async fn fetch_user(&self, token: &SessionToken) -> Result<UserRecord, DirectoryError> {
        self.post(token, "/api/sync/me", &serde_json::json!({})).await
    }

    async fn register_device(
        &self,
        token: &SessionToken,
        device_public_key: &str,
        user_private_key_encrypted: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let body = RegisterDeviceRequest {
            public_key: device_public_key.to_string(),
            user_private_key_encrypted: user_private_key_encrypted.to_string(),
        };
        self.post(token, "/api/sync/device", &body).await
    }

    async fn fetch_device_public_key(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
    ) -> Result<Option<String>, DirectoryError> {
        let path = format!("/api/devices/{}/public_key", device_id);
        debug!(path = %path, "GET");
        let req = self.client.get(self.url(&path)).bearer_auth(token.expose());

        match send::<DevicePublicKeyResponse>(req, &path).await {
            Ok(resp) => Ok(resp.public_key.filter(|k| !k.is_empty())),
            Err(DirectoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn push_device_key_grant(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
        grant: &EncryptedKeyGrant,
    ) -> Result<UserRecord, DirectoryError> {
        let path = format!("/api/me/devices/{}/private_key_encrypted", device_id);
        self.post(token, &path, &KeyGrantRequest::from(grant)).await
    }

    async fn fetch_organization(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let path = format!("/api/sync/organizations/{}", org_id);
        self.post(token, &path, &serde_json::json!({})).await
    }

    async fn push_organization_bootstrap(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        public_key: &str,
        private_key_encrypted: &str,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let path = format!("/api/sync/organizations/{}/public_key", org_id);
        let body = OrganizationBootstrapRequest {
            public_key: public_key.to_string(),
            private_key_encrypted: private_key_encrypted.to_string(),
        };
        self.post(token, &path, &body).await
    }

    async fn push_organization_user_public_key(
        &self,
        token: &SessionToken,
        public_key: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let body = PublicKeyRequest {
            public_key: public_key.to_string(),
        };
        self.post(token, "/api/sync/public_key", &body).await
    }

    async fn push_org_key_grant(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        member_id: &UserId,
        grant: &EncryptedKeyGrant,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let path = format!(
            "/api/organizations/{}/users/{}/private_key_encrypted",
            org_id, member_id
        );
        self.post(token, &path, &KeyGrantRequest::from(grant)).await
    }
}
