//! Resolve storage credentials: explicit `--aws-creds` first, then the AWS provider chain.
//!
//! Finding nothing is not an error here. The dispatcher decides later whether an upload
//! makes missing credentials fatal.

use async_trait::async_trait;
use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials;
use sugar_packager_core::contract::{CredentialSource, Credentials};
use sugar_packager_core::report::Reporter;
use tracing::{info, warn};

use crate::cli::Configuration;
use crate::error::CliError;

/// Environment variables, then `~/.aws/credentials`, then `~/.aws/config`.
///
/// Instance metadata and container endpoints are not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsCredentialChain;

#[async_trait]
impl CredentialSource for AwsCredentialChain {
    async fn provide(&self) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>> {
        let chain = CredentialsProviderChain::first_try(
            "Environment",
            EnvironmentVariableCredentialsProvider::new(),
        )
        .or_else("Profile", ProfileFileCredentialsProvider::builder().build());

        let creds = chain.provide_credentials().await?;
        Ok(Credentials::new(creds.access_key_id(), creds.secret_access_key())
            .with_token(creds.session_token().map(str::to_owned)))
    }
}

/// Split a `key:secret` pair on the first colon.
pub fn parse_explicit(raw: &str) -> Result<Credentials, CliError> {
    match raw.split_once(':') {
        Some((key, secret)) if !key.is_empty() && !secret.is_empty() => {
            Ok(Credentials::new(key, secret))
        }
        _ => Err(CliError::Config(
            "--aws-creds must be an AWS Access Key/Secret pair separated by \":\"".to_owned(),
        )),
    }
}

/// Credentials for this run, or `None` when no source has any.
///
/// Only a malformed `--aws-creds` value is an error.
pub async fn resolve_credentials<C>(
    config: &Configuration,
    source: &C,
    reporter: &Reporter,
) -> Result<Option<Credentials>, CliError>
where
    C: CredentialSource + ?Sized,
{
    if let Some(raw) = &config.aws_creds {
        let creds = parse_explicit(raw)?;
        info!(key = %creds.key, "[CREDS] Using credentials from --aws-creds");
        return Ok(Some(creds));
    }

    match source.provide().await {
        Ok(creds) => {
            info!(key = %creds.key, "[CREDS] Using credentials from provider chain");
            Ok(Some(creds))
        }
        Err(e) => {
            warn!(error = %e, "[CREDS] No credentials found in provider chain");
            reporter.log("Continuing without AWS credentials...", 1);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::UploadRequest;
    use std::path::PathBuf;
    use sugar_packager_core::contract::{MockCredentialSource, PackageKind};

    fn config_with(aws_creds: Option<&str>) -> Configuration {
        Configuration {
            sugar_path: Some(PathBuf::from("/srv/app")),
            name: None,
            destination: PathBuf::from("/out"),
            kind: PackageKind::Cloud,
            upload: UploadRequest::Absent,
            aws_creds: aws_creds.map(str::to_owned),
            s3bucket: "us".into(),
            verbosity: 1,
        }
    }

    #[test]
    fn explicit_pair_splits_on_first_colon() {
        let creds = parse_explicit("AKIA:se:cret").unwrap();
        assert_eq!(creds.key, "AKIA");
        assert_eq!(creds.secret, "se:cret");
        assert_eq!(creds.token, None);
    }

    #[test]
    fn malformed_pairs_are_config_errors() {
        for raw in ["AKIA", ":secret", "AKIA:", ":"] {
            assert!(
                matches!(parse_explicit(raw), Err(CliError::Config(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn explicit_flag_skips_provider_chain() {
        let mut source = MockCredentialSource::new();
        source.expect_provide().times(0);

        let creds = resolve_credentials(&config_with(Some("AKIA:secret")), &source, &Reporter::capturing(1))
            .await
            .unwrap();
        assert_eq!(creds, Some(Credentials::new("AKIA", "secret")));
    }

    #[tokio::test]
    async fn malformed_flag_is_fatal() {
        let mut source = MockCredentialSource::new();
        source.expect_provide().times(0);

        let err = resolve_credentials(&config_with(Some("no-colon")), &source, &Reporter::capturing(1))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn provider_chain_result_is_used() {
        let mut source = MockCredentialSource::new();
        source
            .expect_provide()
            .times(1)
            .returning(|| Ok(Credentials::new("FROMENV", "s")));

        let creds = resolve_credentials(&config_with(None), &source, &Reporter::capturing(1))
            .await
            .unwrap();
        assert_eq!(creds.map(|c| c.key), Some("FROMENV".to_owned()));
    }

    #[tokio::test]
    async fn empty_chain_continues_without_credentials() {
        let mut source = MockCredentialSource::new();
        source
            .expect_provide()
            .returning(|| Err("no providers in chain provided credentials".into()));

        let reporter = Reporter::capturing(1);
        let creds = resolve_credentials(&config_with(None), &source, &reporter)
            .await
            .unwrap();
        assert_eq!(creds, None);
        assert_eq!(reporter.lines(), vec!["Continuing without AWS credentials..."]);

        let silent = Reporter::capturing(0);
        resolve_credentials(&config_with(None), &source, &silent)
            .await
            .unwrap();
        assert!(silent.lines().is_empty());
    }
}
