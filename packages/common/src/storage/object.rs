use std::io::Cursor;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::path::{BlobHandle, BlobPath};
use super::traits::{BlobStore, BoxReader};
use crate::config::S3Config;

/// S3-compatible object store.
///
/// The bucket is expected to grant anonymous read through its bucket policy,
/// so making an object public only requires it to exist; the URL is
/// `{public_base_url}/{path}`.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(config: &S3Config, public_base_url: &str) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        match self.bucket.head_object(path.as_str()).await {
            Ok((_, status)) => Ok(status == 200),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn read(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        match self.bucket.get_object(path.as_str()).await {
            Ok(response) if response.status_code() == 404 => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Ok(response) => Ok(response.bytes().to_vec()),
            Err(e) if is_not_found(&e) => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError> {
        let data = self.read(path).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn write(
        &self,
        path: &BlobPath,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(path.as_str(), data, content_type)
            .await
            .map_err(backend)?;

        match response.status_code() {
            200..=299 => Ok(()),
            code => Err(StorageError::Backend(format!(
                "PUT {path} returned status {code}"
            ))),
        }
    }

    async fn make_public(&self, path: &BlobPath) -> Result<String, StorageError> {
        if !self.exists(path).await? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, path))
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        extensions: &[&str],
    ) -> Result<Vec<BlobHandle>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(backend)?;

        let mut handles: Vec<BlobHandle> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .filter_map(|object| {
                let path = BlobPath::parse(&object.key).ok()?;
                path.has_extension(extensions).then_some(BlobHandle {
                    path,
                    size: object.size,
                })
            })
            .collect();

        handles.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(handles)
    }
}
