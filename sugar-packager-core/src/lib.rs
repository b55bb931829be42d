#![doc = "sugar-packager-core: contracts, manifest model and archive packager for sugar-packager."]

//! This crate holds everything the `sugar-packager` binary orchestrates but does not
//! own: the collaborator traits ([`contract::Packager`], [`contract::Uploader`],
//! [`contract::CredentialSource`]), the package manifest, the zip packager and the
//! S3 bucket table.
//!
//! # Usage
//! The CLI crate depends on this one and wires the AWS-backed implementations in.
//! Mocks of every trait are exported behind the default `test-export-mocks` feature.

pub mod config;
pub mod contract;
pub mod error;
pub mod manifest;
pub mod pack;
pub mod report;

/// Name recorded in every manifest and printed by `--version`.
pub const APP_NAME: &str = "sugar-packager";
