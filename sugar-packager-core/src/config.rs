use tracing::{debug, warn};

/// Bucket identifier used when `--s3bucket` is not given.
pub const DEFAULT_BUCKET: &str = "us";

/// Identifiers accepted by `--s3bucket`.
pub const KNOWN_BUCKETS: [&str; 3] = ["us", "eu", "au"];

const IMPORT_BUCKET: &str = "sugarcrm-ms-imports-usw2-dev";
const IMPORT_REGION: &str = "us-west-2";

/// Concrete bucket and region an identifier resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: &'static str,
    pub region: &'static str,
}

/// Resolve a bucket identifier against the fixed table.
///
/// All three regions currently share the same import bucket.
pub fn lookup_bucket(id: &str) -> Option<S3Target> {
    let target = match id {
        "us" | "eu" | "au" => S3Target {
            bucket: IMPORT_BUCKET,
            region: IMPORT_REGION,
        },
        other => {
            warn!(bucket = other, known = ?KNOWN_BUCKETS, "Unknown S3 bucket identifier");
            return None;
        }
    };
    debug!(id, bucket = target.bucket, region = target.region, "Resolved S3 bucket");
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_identifier_resolves() {
        for id in KNOWN_BUCKETS {
            let target = lookup_bucket(id).expect("known bucket");
            assert_eq!(target.bucket, "sugarcrm-ms-imports-usw2-dev");
            assert_eq!(target.region, "us-west-2");
        }
    }

    #[test]
    fn unknown_and_differently_cased_identifiers_are_rejected() {
        assert_eq!(lookup_bucket("xx"), None);
        assert_eq!(lookup_bucket("US"), None);
        assert_eq!(lookup_bucket(""), None);
    }

    #[test]
    fn default_is_known() {
        assert!(KNOWN_BUCKETS.contains(&DEFAULT_BUCKET));
    }
}
