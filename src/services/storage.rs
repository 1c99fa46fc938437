use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::fmt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// State of an object at the time it was downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersion {
    pub etag: Option<String>,
    pub size: u64,
}

/// A conditional write was rejected because the object changed in the store.
#[derive(Debug, Clone)]
pub struct PreconditionFailed {
    pub key: String,
}

impl fmt::Display for PreconditionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precondition failed for `{}`", self.key)
    }
}

impl std::error::Error for PreconditionFailed {}

/// Remote object store scoped to a single container.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn container(&self) -> &str;

    /// Keys under `prefix`, in the order the store returns them.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Writes the object's bytes into `path`, replacing whatever the file held.
    async fn download(&self, key: &str, path: &Path) -> Result<ObjectVersion>;

    /// Overwrites `key` with the content of `path`. When `if_match` is set the
    /// write only succeeds if the stored ETag still matches; otherwise the
    /// returned error wraps [`PreconditionFailed`].
    async fn upload(&self, key: &str, path: &Path, if_match: Option<&str>) -> Result<()>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn container(&self) -> &str {
        &self.bucket
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        keys.push(key);
                    }
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn download(&self, key: &str, path: &Path) -> Result<ObjectVersion> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        let etag = res.e_tag().map(str::to_owned);
        let mut reader = res.body.into_async_read();
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .await?;

        let size = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok(ObjectVersion { etag, size })
    }

    async fn upload(&self, key: &str, path: &Path, if_match: Option<&str>) -> Result<()> {
        let body = ByteStream::from_path(path).await?;
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_if_match(if_match.map(str::to_owned))
            .body(body)
            .send()
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) => {
                let status = e.raw_response().map(|r| r.status().as_u16());
                if if_match.is_some() && status == Some(412) {
                    return Err(PreconditionFailed {
                        key: key.to_string(),
                    }
                    .into());
                }
                tracing::error!(
                    "S3 put_object failed: bucket={}, key={}, error={:?}",
                    self.bucket,
                    key,
                    e
                );
                Err(e.into())
            }
        }
    }
}
