use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures::stream;

use super::object_backend::{Backend, BackendError, KeyBatches, Result};

/// Configuration for S3Backend.
#[derive(Debug, Clone)]
pub struct S3BackendConfig {
    /// The S3 bucket name.
    pub bucket: String,
    /// Optional key prefix within the bucket that acts as the backend root.
    pub root: Option<String>,
    /// Optional custom endpoint URL (for LocalStack/MinIO testing).
    pub endpoint_url: Option<String>,
    /// Optional region override.
    pub region: Option<String>,
    /// Optional static access key id and secret.
    pub credentials: Option<(String, String)>,
    /// Address buckets by path instead of by virtual host.
    pub force_path_style: bool,
}

impl S3BackendConfig {
    /// Create a new config with just a bucket name.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            root: None,
            endpoint_url: None,
            region: None,
            credentials: None,
            force_path_style: false,
        }
    }

    /// Set the root key prefix.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        let root = root.into();
        let root = root.trim_matches('/');
        self.root = if root.is_empty() {
            None
        } else {
            Some(root.to_string())
        };
        self
    }

    /// Set a custom endpoint URL (for LocalStack/MinIO).
    ///
    /// Custom endpoints are addressed path-style.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use static credentials instead of the default credential chain.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some((access_key_id.into(), secret_access_key.into()));
        self
    }
}

/// An S3-based implementation of `Backend`.
pub struct S3Backend {
    client: Client,
    bucket: String,
    root: Option<String>,
}

impl S3Backend {
    /// Create a new S3 backend with the given configuration.
    ///
    /// Uses the standard AWS credential chain (env vars, ~/.aws, IAM roles,
    /// etc.) unless static credentials are configured.
    pub async fn new(config: S3BackendConfig) -> Self {
        let mut aws_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            aws_config_loader = aws_config_loader.region(aws_config::Region::new(region.clone()));
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            aws_config_loader = aws_config_loader.endpoint_url(endpoint_url);
        }

        if let Some((access_key_id, secret_access_key)) = &config.credentials {
            aws_config_loader = aws_config_loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "workstate",
            ));
        }

        let aws_config = aws_config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.force_path_style)
            .build();
        let client = Client::from_conf(s3_config);

        Self {
            client,
            bucket: config.bucket,
            root: config.root,
        }
    }

    /// Build the full S3 key from a backend-relative key.
    fn full_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.root {
            Some(root) => format!("{}/{}", root, key),
            None => key.to_string(),
        }
    }

    /// Convert a full S3 key back to a backend-relative key.
    fn relative_key(root: Option<&str>, full_key: &str) -> Option<String> {
        match root {
            Some(root) => full_key
                .strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(str::to_string),
            None => Some(full_key.to_string()),
        }
    }
}

fn is_not_found<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(e) if e.raw().status().as_u16() == 404)
}

fn is_forbidden<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(e) if e.raw().status().as_u16() == 403)
}

fn map_sdk_error<E: std::fmt::Debug>(key: &str, err: SdkError<E>) -> BackendError {
    if is_not_found(&err) {
        BackendError::NotFound(key.to_string())
    } else if is_forbidden(&err) {
        BackendError::PermissionDenied(key.to_string())
    } else {
        BackendError::Other(format!("{:?}", err))
    }
}

/// Listing cursor threaded through the pagination stream.
struct ListState {
    client: Client,
    bucket: String,
    root: Option<String>,
    prefix: Option<String>,
    continuation_token: Option<String>,
    done: bool,
}

#[async_trait]
impl Backend for S3Backend {
    fn describe(&self) -> String {
        match &self.root {
            Some(root) => format!("s3://{}/{}", self.bucket, root),
            None => format!("s3://{}", self.bucket),
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<KeyBatches> {
        let list_prefix = match prefix {
            Some(p) => Some(format!("{}/", self.full_key(p.trim_end_matches('/')))),
            None => self.root.as_ref().map(|root| format!("{}/", root)),
        };

        let state = ListState {
            client: self.client.clone(),
            bucket: self.bucket.clone(),
            root: self.root.clone(),
            prefix: list_prefix,
            continuation_token: None,
            done: false,
        };

        let pages = stream::try_unfold(state, |mut state| async move {
            if state.done {
                return Ok::<_, BackendError>(None);
            }

            let mut request = state.client.list_objects_v2().bucket(&state.bucket);
            if let Some(prefix) = &state.prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = state.continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|err| {
                map_sdk_error(state.prefix.as_deref().unwrap_or(""), err)
            })?;

            let keys: Vec<String> = response
                .contents()
                .iter()
                .filter_map(|obj| obj.key())
                .filter_map(|key| S3Backend::relative_key(state.root.as_deref(), key))
                .collect();

            state.continuation_token = response.next_continuation_token().map(str::to_string);
            state.done = !response.is_truncated().unwrap_or(false)
                || state.continuation_token.is_none();

            Ok(Some((keys, state)))
        });

        Ok(Box::pin(pages))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let full_key = self.full_key(key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;

        Ok(data.into_bytes())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let full_key = self.full_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;

        Ok(())
    }

    async fn put_file(&self, key: &str, path: &Path) -> Result<()> {
        let full_key = self.full_key(key);
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| BackendError::Other(format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(body)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;

        Ok(())
    }

    async fn is_file(&self, key: &str) -> Result<bool> {
        if key.ends_with('/') {
            return Ok(false);
        }
        let full_key = self.full_key(key);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(map_sdk_error(key, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_root_is_trimmed() {
        let config = S3BackendConfig::new("bucket").with_root("/a/b/");
        assert_eq!(config.root.as_deref(), Some("a/b"));

        let config = S3BackendConfig::new("bucket").with_root("/");
        assert_eq!(config.root, None);
    }

    #[test]
    fn test_endpoint_forces_path_style() {
        let config = S3BackendConfig::new("bucket").with_endpoint_url("http://localhost:9000");
        assert!(config.force_path_style);
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(
            S3Backend::relative_key(Some("root"), "root/a/b.txt"),
            Some("a/b.txt".to_string())
        );
        assert_eq!(S3Backend::relative_key(Some("root"), "rootless/a"), None);
        assert_eq!(
            S3Backend::relative_key(None, "a/b.txt"),
            Some("a/b.txt".to_string())
        );
    }
}
