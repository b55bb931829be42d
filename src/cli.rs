//! This module implements the command-line surface of sugar-packager: argument parsing,
//! validation of the flag combinations, and the [`run`] entrypoint that wires the real
//! collaborators into the dispatcher.
//!
//! The packaging, manifest and bucket logic lives in [`sugar_packager_core`]; this module
//! only turns raw arguments into a [`Configuration`].
//!
//! ## How To Use
//! - For command-line users: run the `sugar-packager` binary with `--help`.
//! - For programmatic/integration use: build a [`Configuration`] with [`parse_from`] and
//!   hand it to [`run`], or call [`crate::dispatch::dispatch`] with your own collaborators.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use sugar_packager_core::config::DEFAULT_BUCKET;
use sugar_packager_core::contract::PackageKind;
use sugar_packager_core::pack::ArchivePackager;
use sugar_packager_core::report::{Reporter, MAX_VERBOSITY};

use crate::credentials::{resolve_credentials, AwsCredentialChain};
use crate::dispatch::{dispatch, unix_timestamp, Outcome};
use crate::error::CliError;
use crate::upload::S3Uploader;

const AFTER_HELP: &str = "<sugar-path> is required unless an existing package is passed to --upload";

/// CLI for sugar-packager: package a local Sugar installation and optionally upload it.
#[derive(Parser, Debug)]
#[command(
    name = "sugar-packager",
    version,
    about = "Packages a local Sugar installation for upload and import to the SugarCRM Cloud environment.",
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// How much information to output. Valid values are 0-5. Use 0 to suppress all output except errors.
    #[arg(
        short = 'v',
        long,
        value_name = "verbosity",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_VERBOSITY))
    )]
    pub verbosity: u8,

    /// File name of the package to be created. Defaults to "<AWS Access Key>.<UNIX timestamp>.zip",
    /// or "<UNIX timestamp>.zip" if no AWS Access Key is found.
    #[arg(long, value_name = "package name")]
    pub name: Option<String>,

    /// Directory to write the package to. Defaults to the current directory.
    #[arg(long, value_name = "directory")]
    pub destination: Option<PathBuf>,

    /// Type of package to create. Valid types are "MySQL" or "Cloud".
    #[arg(long = "type", value_name = "package type", default_value = "Cloud")]
    pub kind: PackageKind,

    /// Upload the package being created OR specify an existing package to be uploaded.
    #[arg(long, value_name = "path to package")]
    pub upload: Option<Option<PathBuf>>,

    /// AWS Access Key/Secret pair, separated by ":". If no credentials are provided, attempts to load
    /// credentials from environment variables, then "~/.aws/credentials", then "~/.aws/config".
    #[arg(long, value_name = "key:secret")]
    pub aws_creds: Option<String>,

    /// S3 Bucket to upload package to. Valid buckets are "us", "eu", or "au".
    #[arg(long, value_name = "s3bucket", default_value = DEFAULT_BUCKET)]
    pub s3bucket: String,

    /// Path to the local Sugar installation.
    #[arg(value_name = "sugar-path")]
    pub sugar_path: Option<PathBuf>,
}

/// The three observable states of `--upload`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadRequest {
    /// Flag not given: pack only.
    #[default]
    Absent,
    /// `--upload` without a value: pack, then upload the package just created.
    PackThenUpload,
    /// `--upload <path>`: skip packing and upload this existing package.
    Existing(PathBuf),
}

impl UploadRequest {
    fn from_flag(flag: Option<Option<PathBuf>>) -> Self {
        match flag {
            None => UploadRequest::Absent,
            Some(None) => UploadRequest::PackThenUpload,
            Some(Some(path)) if path.as_os_str().is_empty() => UploadRequest::PackThenUpload,
            Some(Some(path)) => UploadRequest::Existing(path),
        }
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self, UploadRequest::Absent)
    }
}

/// The validated, defaulted options of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub sugar_path: Option<PathBuf>,
    /// Package file name; `None` means "derive it" (see [`crate::dispatch::default_package_name`]).
    pub name: Option<String>,
    pub destination: PathBuf,
    pub kind: PackageKind,
    pub upload: UploadRequest,
    /// Raw `key:secret` string, split by the credential resolver.
    pub aws_creds: Option<String>,
    pub s3bucket: String,
    pub verbosity: u8,
}

impl Configuration {
    /// Validate flag combinations and fill defaults. `cwd` is the default destination.
    pub fn from_cli(cli: Cli, cwd: &Path) -> Result<Self, CliError> {
        let upload = UploadRequest::from_flag(cli.upload);
        let sugar_path = cli.sugar_path.filter(|p| !p.as_os_str().is_empty());

        match (&sugar_path, &upload) {
            (Some(_), UploadRequest::Existing(_)) => {
                return Err(CliError::Usage(
                    "<sugar-path> and --upload <package> are mutually exclusive".to_owned(),
                ));
            }
            (None, UploadRequest::Existing(_)) | (Some(_), _) => {}
            (None, _) => {
                return Err(CliError::Usage(AFTER_HELP.to_owned()));
            }
        }

        Ok(Configuration {
            sugar_path,
            name: cli.name.filter(|n| !n.is_empty()),
            destination: cli.destination.unwrap_or_else(|| cwd.to_path_buf()),
            kind: cli.kind,
            upload,
            aws_creds: cli.aws_creds.filter(|c| !c.is_empty()),
            s3bucket: cli.s3bucket,
            verbosity: cli.verbosity,
        })
    }

    pub fn trace_loaded(&self) {
        tracing::info!(
            sugar_path = ?self.sugar_path,
            destination = %self.destination.display(),
            kind = %self.kind,
            upload = ?self.upload,
            s3bucket = %self.s3bucket,
            verbosity = self.verbosity,
            explicit_creds = self.aws_creds.is_some(),
            "Loaded Configuration"
        );
    }
}

/// What the process should do after parsing.
#[derive(Debug)]
pub enum Command {
    /// Help or version was requested: print this text and exit 0.
    Print(String),
    Run(Configuration),
}

/// Parse raw arguments (program name first) into a [`Command`].
///
/// Help and version short-circuit every other check. Parser errors and invalid flag
/// combinations both come back as [`CliError::Usage`].
pub fn parse_from<I, T>(args: I, cwd: &Path) -> Result<Command, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    Ok(Command::Print(e.render().to_string()))
                }
                _ => Err(CliError::Usage(usage_message(&e))),
            }
        }
    };
    Configuration::from_cli(cli, cwd).map(Command::Run)
}

/// First line of a clap error, without clap's own `error: ` prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_owned()
}

/// Full help text, as shown before every usage error.
pub fn usage_text() -> String {
    Cli::command().render_long_help().to_string()
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(config: Configuration) -> Result<Outcome, CliError> {
    tracing::info!("trace_initialised");
    config.trace_loaded();

    let reporter = Reporter::new(config.verbosity);
    let credentials = resolve_credentials(&config, &AwsCredentialChain, &reporter).await?;
    let packager = ArchivePackager::with_reporter(reporter.clone());

    dispatch(
        &config,
        credentials.as_ref(),
        &packager,
        &S3Uploader,
        &reporter,
        unix_timestamp(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, CliError> {
        let argv = std::iter::once("sugar-packager").chain(args.iter().copied());
        parse_from(argv, Path::new("/work"))
    }

    fn config(args: &[&str]) -> Configuration {
        match parse(args) {
            Ok(Command::Run(config)) => config,
            other => panic!("expected a runnable configuration, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_filled() {
        let config = config(&["/srv/app"]);
        assert_eq!(config.sugar_path, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.destination, PathBuf::from("/work"));
        assert_eq!(config.kind, PackageKind::Cloud);
        assert_eq!(config.upload, UploadRequest::Absent);
        assert_eq!(config.s3bucket, "us");
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.name, None);
        assert_eq!(config.aws_creds, None);
    }

    #[test]
    fn upload_flag_is_tri_state() {
        assert_eq!(config(&["/srv/app"]).upload, UploadRequest::Absent);
        assert_eq!(
            config(&["/srv/app", "--upload"]).upload,
            UploadRequest::PackThenUpload
        );
        assert_eq!(
            config(&["--upload", "pkg.zip"]).upload,
            UploadRequest::Existing(PathBuf::from("pkg.zip"))
        );
        assert_eq!(
            config(&["--upload=pkg.zip"]).upload,
            UploadRequest::Existing(PathBuf::from("pkg.zip"))
        );
    }

    #[test]
    fn sugar_path_with_explicit_upload_is_rejected() {
        for extra in [&[][..], &["--type", "MySQL"][..], &["--aws-creds", "K:S", "-v", "0"][..]] {
            let mut args = vec!["/srv/app", "--upload=pkg.zip"];
            args.extend_from_slice(extra);
            match parse(&args) {
                Err(CliError::Usage(msg)) => assert!(msg.contains("mutually exclusive"), "{msg}"),
                other => panic!("expected usage error, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_sugar_path_and_upload_is_rejected() {
        assert!(matches!(parse(&[]), Err(CliError::Usage(_))));
        assert!(matches!(parse(&["--type", "MySQL"]), Err(CliError::Usage(_))));
    }

    #[test]
    fn upload_sentinel_still_needs_sugar_path() {
        assert!(matches!(parse(&["--upload"]), Err(CliError::Usage(_))));
    }

    #[test]
    fn help_and_version_short_circuit_validation() {
        match parse(&["--help"]) {
            Ok(Command::Print(text)) => assert!(text.contains("sugar-path")),
            other => panic!("expected help text, got {other:?}"),
        }
        match parse(&["/srv/app", "--upload=pkg.zip", "-V"]) {
            Ok(Command::Print(text)) => assert!(text.contains(env!("CARGO_PKG_VERSION"))),
            other => panic!("expected version text, got {other:?}"),
        }
    }

    #[test]
    fn parser_errors_become_usage_errors() {
        for args in [
            &["/srv/app", "-v", "6"][..],
            &["/srv/app", "--type", "Oracle"][..],
            &["/srv/app", "--bogus"][..],
            &["/srv/app", "/srv/other"][..],
        ] {
            match parse(args) {
                Err(CliError::Usage(msg)) => assert!(!msg.starts_with("error:"), "{msg}"),
                other => panic!("expected usage error for {args:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn explicit_options_are_kept() {
        let config = config(&[
            "/srv/app",
            "--name",
            "custom.zip",
            "--destination",
            "/out",
            "--type",
            "MySQL",
            "--aws-creds",
            "AKIA:secret",
            "--s3bucket",
            "eu",
            "-v",
            "3",
        ]);
        assert_eq!(config.name.as_deref(), Some("custom.zip"));
        assert_eq!(config.destination, PathBuf::from("/out"));
        assert_eq!(config.kind, PackageKind::MySQL);
        assert_eq!(config.aws_creds.as_deref(), Some("AKIA:secret"));
        assert_eq!(config.s3bucket, "eu");
        assert_eq!(config.verbosity, 3);
    }

    #[test]
    fn unknown_bucket_is_not_a_parse_error() {
        assert_eq!(config(&["/srv/app", "--s3bucket", "xx"]).s3bucket, "xx");
    }
}
