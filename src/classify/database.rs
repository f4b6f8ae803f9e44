//! Provider database model and loading.
//!
//! The database is a JSON document with three top-level categories (cdn,
//! waf, cloud), each holding four pattern tables keyed by provider name.
//! It is loaded once per run and never mutated afterwards; classification
//! consumes the compiled form built from it (see `matcher`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error_handling::DatabaseError;

/// Pattern table: provider name → pattern list.
pub type PatternTable = BTreeMap<String, Vec<String>>;

/// The four pattern tables of one category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryTables {
    /// CIDR ranges per provider
    #[serde(default)]
    pub ip: PatternTable,
    /// ASN strings per provider (with or without a leading "AS")
    #[serde(default)]
    pub asn: PatternTable,
    /// CNAME patterns per provider (substrings or regexes)
    #[serde(default)]
    pub cname: PatternTable,
    /// Geolocation keyword patterns per provider
    #[serde(default)]
    pub keys: PatternTable,
}

/// The full provider database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderDatabase {
    /// CDN providers
    #[serde(default)]
    pub cdn: CategoryTables,
    /// WAF providers
    #[serde(default)]
    pub waf: CategoryTables,
    /// Cloud-hosting providers
    #[serde(default)]
    pub cloud: CategoryTables,
}

impl ProviderDatabase {
    /// Loads the database from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, DatabaseError> {
        let file = File::open(path).map_err(|source| DatabaseError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Loads the database from any JSON reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, DatabaseError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_document() {
        let json = r#"{
            "cdn": {
                "cname": {"fastly": ["fastly.net"], "cloudflare": ["cdn.cloudflare.net"]},
                "ip": {"fastly": ["151.101.0.0/16"]},
                "asn": {"fastly": ["AS54113"]},
                "keys": {}
            },
            "waf": {
                "cname": {"akamai-waf": ["edgekey.net"]}
            },
            "cloud": {
                "ip": {"aws": ["3.0.0.0/9"]}
            }
        }"#;

        let db: ProviderDatabase = serde_json::from_str(json).expect("deserialize");
        assert_eq!(db.cdn.cname.len(), 2);
        assert_eq!(db.cdn.asn["fastly"], vec!["AS54113"]);
        assert!(db.waf.ip.is_empty());
        assert_eq!(db.cloud.ip["aws"], vec!["3.0.0.0/9"]);
    }

    #[test]
    fn test_deserialize_empty_document() {
        let db: ProviderDatabase = serde_json::from_str("{}").expect("deserialize");
        assert!(db.cdn.cname.is_empty());
        assert!(db.waf.keys.is_empty());
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = ProviderDatabase::from_path(Path::new("/nonexistent/sources.json"));
        assert!(matches!(result, Err(DatabaseError::ReadError { .. })));
    }

    #[test]
    fn test_from_path_round_trip() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"cdn": {{"cname": {{"fastly": ["fastly.net"]}}}}}}"#).expect("write");

        let db = ProviderDatabase::from_path(file.path()).expect("load");
        assert_eq!(db.cdn.cname["fastly"], vec!["fastly.net"]);
    }
}
