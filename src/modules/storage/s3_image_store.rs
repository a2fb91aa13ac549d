//! S3/MinIO-compatible image store.
//!
//! Objects are written under `{public_prefix}/listings/` with a random name
//! and served straight from the bucket through the public endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ImageRef, ImageStore, ImageUpload};
use crate::core::config::ImageStoreConfig;
use crate::core::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Folder for listing images inside the public prefix
const LISTINGS_FOLDER: &str = "listings";

pub struct S3ImageStore {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    public_prefix: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    http_client: Client,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Internal(format!("Image store {} is not configured", name)))
}

impl S3ImageStore {
    /// Build the store from configuration without touching the network
    pub fn new(config: &ImageStoreConfig) -> Result<Self> {
        let endpoint = required(&config.endpoint, "endpoint")?.trim_end_matches('/');
        let access_key = required(&config.access_key, "access key")?;
        let secret_key = required(&config.secret_key, "secret key")?;
        let bucket_name = required(&config.bucket, "bucket")?;

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| AppError::Internal(format!("Invalid image store credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.to_string(),
        };

        // Path-style addressing (http://endpoint/bucket) for MinIO
        let bucket = Bucket::new(bucket_name, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Invalid image store bucket: {}", e)))?
            .with_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let public_endpoint = config
            .public_endpoint
            .as_deref()
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bucket,
            region,
            credentials,
            endpoint: endpoint.to_string(),
            public_endpoint,
            public_prefix: config.public_prefix.trim_matches('/').to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            region_name: config.region.clone(),
            http_client,
        })
    }

    /// Build the store and make sure the bucket exists and is publicly readable
    pub async fn connect(config: &ImageStoreConfig) -> Result<Self> {
        let store = Self::new(config)?;
        store.ensure_bucket_exists().await;
        store.set_public_read_policy().await;

        info!(
            "Image store ready: endpoint={}, bucket={}, public_prefix={}",
            store.endpoint,
            store.bucket.name(),
            store.public_prefix
        );
        Ok(store)
    }

    /// Create the bucket unless it already exists. Failures are logged only.
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created", self.bucket.name()),
            Err(e) => {
                let message = e.to_string();
                if message.contains("BucketAlreadyOwnedByYou")
                    || message.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Allow anonymous `GetObject` on the public prefix. Failures are logged only.
    async fn set_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/{}/*", bucket_name, self.public_prefix)]
            }]
        })
        .to_string();

        match self.put_bucket_policy(&bucket_name, &policy, Utc::now()).await {
            Ok(()) => info!("Public read enabled for {}/{}/*", bucket_name, self.public_prefix),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. Listing images may not load until \
                 anonymous download is enabled for {}/{}",
                bucket_name, e, bucket_name, self.public_prefix
            ),
        }
    }

    /// `PUT /{bucket}?policy`, signed with AWS Signature v4
    async fn put_bucket_policy(
        &self,
        bucket_name: &str,
        policy: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid image store endpoint: {}", e)))?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| AppError::Internal("Image store endpoint has no host".to_string()))?;
        let host = match endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "PUT\n/{bucket}\npolicy=\nhost:{host}\nx-amz-content-sha256:{hash}\nx-amz-date:{date}\n\n{signed}\n{hash}",
            bucket = bucket_name,
            host = host,
            hash = payload_hash,
            date = amz_date,
            signed = signed_headers,
        );

        let scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.secret_key, &date_stamp, &self.region_name, "s3")?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key, scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(format!("{}/{}?policy", self.endpoint, bucket_name))
            .header("Host", &host)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Policy request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::ExternalServiceError(format!(
            "Image store refused bucket policy: {} - {}",
            status, body
        )))
    }

    fn object_key(&self, id: Uuid, extension: &str) -> String {
        format!("{}/{}/{}.{}", self.public_prefix, LISTINGS_FOLDER, id, extension)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store(&self, upload: ImageUpload) -> Result<ImageRef> {
        let key = self.object_key(Uuid::new_v4(), upload.extension());

        self.bucket
            .put_object_with_content_type(&key, &upload.data, &upload.content_type)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to upload image '{}': {}", key, e))
            })?;

        debug!("Stored image '{}' ({} bytes)", key, upload.data.len());
        Ok(ImageRef {
            url: self.public_url(&key),
            filename: key,
        })
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        self.bucket.delete_object(filename).await.map_err(|e| {
            AppError::ExternalServiceError(format!("Failed to delete image '{}': {}", filename, e))
        })?;

        debug!("Deleted image '{}'", filename);
        Ok(())
    }
}

/// Derive the Signature v4 signing key for one day, region and service
fn signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
