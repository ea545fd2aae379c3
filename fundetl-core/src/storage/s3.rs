//! S3 object store over plain HTTPS PUT with Signature V4.
//!
//! Objects are addressed virtual-hosted style
//! (`https://{bucket}.s3.{region}.amazonaws.com/{key}`) unless a custom
//! endpoint is configured, in which case path style (`{endpoint}/{bucket}/{key}`)
//! is used so S3-compatible servers work too.

use super::sigv4::{self, SigningParams};
use super::{read_local, ObjectStore, ObjectUri, StoreError};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";
pub const REGION_VAR: &str = "AWS_REGION";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read the standard `AWS_*` variables, honouring a `.env` file.
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();
        let required = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StoreError::MissingCredentials(format!("{var} is not set")))
        };
        Ok(Self {
            access_key_id: required(ACCESS_KEY_VAR)?,
            secret_access_key: required(SECRET_KEY_VAR)?,
            session_token: std::env::var(SESSION_TOKEN_VAR).ok().filter(|v| !v.is_empty()),
        })
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Region from `AWS_REGION`, falling back to us-east-1.
pub fn region_from_env() -> String {
    std::env::var(REGION_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

/// Resolved request target for one object.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    url: String,
    host: String,
    canonical_uri: String,
}

pub struct S3Store {
    client: reqwest::blocking::Client,
    credentials: AwsCredentials,
    region: String,
    endpoint: Option<String>,
}

impl S3Store {
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            region: region.into(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        })
    }

    fn target(&self, uri: &ObjectUri) -> Result<Target, StoreError> {
        match &self.endpoint {
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", uri.bucket, self.region);
                let canonical_uri = sigv4::uri_encode_path(&format!("/{}", uri.key));
                Ok(Target {
                    url: format!("https://{host}{canonical_uri}"),
                    host,
                    canonical_uri,
                })
            }
            Some(endpoint) => {
                let parsed = reqwest::Url::parse(endpoint)
                    .map_err(|e| StoreError::Client(format!("bad endpoint '{endpoint}': {e}")))?;
                let host_name = parsed
                    .host_str()
                    .ok_or_else(|| StoreError::Client(format!("endpoint '{endpoint}' has no host")))?;
                let host = match parsed.port() {
                    Some(port) => format!("{host_name}:{port}"),
                    None => host_name.to_string(),
                };
                let canonical_uri =
                    sigv4::uri_encode_path(&format!("/{}/{}", uri.bucket, uri.key));
                Ok(Target {
                    url: format!("{endpoint}{canonical_uri}"),
                    host,
                    canonical_uri,
                })
            }
        }
    }
}

impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    fn put(&self, local: &Path, uri: &ObjectUri) -> Result<(), StoreError> {
        let body = read_local(local)?;
        let target = self.target(uri)?;
        let params = SigningParams {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.region,
        };
        let signed = sigv4::sign_put(
            &params,
            &target.host,
            &target.canonical_uri,
            &body,
            chrono::Utc::now(),
        );

        let size = body.len();
        let mut request = self
            .client
            .put(&target.url)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let resp = request.body(body).send().map_err(|e| StoreError::Transport {
            uri: uri.clone(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                uri: uri.clone(),
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        info!(%uri, bytes = size, "uploaded object");
        Ok(())
    }
}
