#![doc = "S3 implementation of the core `Uploader` trait."]
//
//! # Uploader Integration (CLI <-> Core)
//!
//! Bridges the [`Uploader`] abstraction in `sugar-packager-core` to the AWS S3 SDK.
//! A client is built per call from the request's credentials and region, since the
//! bucket table decides the region only once the upload step runs.
//!
//! Every SDK or file error becomes an [`UploadFailure`] with exit code 1.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials as AwsCredentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use sugar_packager_core::contract::{PutObject, UploadReceipt, Uploader};
use sugar_packager_core::error::UploadFailure;

/// Exit code used for every failure coming out of the SDK.
const S3_FAILURE_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct S3Uploader;

impl S3Uploader {
    fn client(req: &PutObject) -> aws_sdk_s3::Client {
        let credentials = AwsCredentials::new(
            req.credentials.key.clone(),
            req.credentials.secret.clone(),
            req.credentials.token.clone(),
            None,
            "sugar-packager",
        );
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(req.region.clone()))
            .credentials_provider(credentials)
            .build();
        tracing::info!(region = %req.region, "[UPLOAD] Initialized S3 client");
        aws_sdk_s3::Client::from_conf(conf)
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn put_object(&self, req: PutObject) -> Result<UploadReceipt, UploadFailure> {
        tracing::info!(
            bucket = %req.bucket,
            key = %req.key,
            source = %req.source.display(),
            metadata_keys = req.metadata.len(),
            "[UPLOAD] Uploading package"
        );
        let client = Self::client(&req);

        let body = ByteStream::from_path(&req.source).await.map_err(|e| {
            tracing::debug!(error = %e, source = %req.source.display(), "[UPLOAD] Could not open package");
            UploadFailure::new(
                S3_FAILURE_CODE,
                format!("could not read package {}: {e}", req.source.display()),
            )
        })?;

        let metadata: HashMap<String, String> = req.metadata.into_iter().collect();
        let output = client
            .put_object()
            .bucket(&req.bucket)
            .key(&req.key)
            .body(body)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::debug!(error = %message, "[UPLOAD] put_object failed");
                UploadFailure::new(S3_FAILURE_CODE, message)
            })?;

        let receipt = UploadReceipt {
            e_tag: output.e_tag().unwrap_or("unknown").to_owned(),
            expiration: output.expiration().map(str::to_owned),
        };
        tracing::info!(e_tag = %receipt.e_tag, expiration = ?receipt.expiration, "[UPLOAD] put_object succeeded");
        Ok(receipt)
    }
}
