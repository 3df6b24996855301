//! Ingester configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aq_common::Location;
use ingestion::{CamsConfig, IngestionError, OpenAqConfig};
use serde::Deserialize;
use storage::S3Config;

const DEFAULT_ADS_URL: &str = "https://ads.atmosphere.copernicus.eu/api";
const DEFAULT_OPENAQ_URL: &str = "https://api.openaq.org";
const DEFAULT_TEXTURE_ROOT: &str = "./textures";

/// Settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    pub database_url: Option<String>,
    pub ads_url: String,
    pub ads_key: Option<String>,
    pub openaq_url: String,
    pub openaq_api_key: Option<String>,
    /// Local directory for texture images, used unless `s3` is set
    pub texture_root: PathBuf,
    pub s3: Option<S3Config>,
    pub insitu_cache_dir: Option<PathBuf>,
}

impl IngesterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let s3 = var("S3_BUCKET").map(|bucket| S3Config {
            endpoint: var("S3_ENDPOINT").unwrap_or_else(|| "http://minio:9000".to_string()),
            bucket,
            access_key_id: var("S3_ACCESS_KEY").unwrap_or_default(),
            secret_access_key: var("S3_SECRET_KEY").unwrap_or_default(),
            region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            allow_http: var("S3_ALLOW_HTTP").map(|v| v == "true").unwrap_or(false),
        });

        Self {
            database_url: var("DATABASE_URL"),
            ads_url: var("ADS_URL").unwrap_or_else(|| DEFAULT_ADS_URL.to_string()),
            ads_key: var("ADS_KEY"),
            openaq_url: var("OPENAQ_URL").unwrap_or_else(|| DEFAULT_OPENAQ_URL.to_string()),
            openaq_api_key: var("OPENAQ_API_KEY"),
            texture_root: var("TEXTURE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEXTURE_ROOT)),
            s3,
            insitu_cache_dir: var("INSITU_CACHE_DIR").map(PathBuf::from),
        }
    }

    pub fn database_url(&self) -> Result<&str, IngestionError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| missing("DATABASE_URL"))
    }

    pub fn cams(&self) -> Result<CamsConfig, IngestionError> {
        let key = self.ads_key.as_deref().ok_or_else(|| missing("ADS_KEY"))?;
        Ok(CamsConfig::new(self.ads_url.clone(), key))
    }

    pub fn openaq(&self, radius_m: u32) -> Result<OpenAqConfig, IngestionError> {
        let key = self
            .openaq_api_key
            .as_deref()
            .ok_or_else(|| missing("OPENAQ_API_KEY"))?;
        let mut config = OpenAqConfig::new(self.openaq_url.clone(), key);
        config.radius_m = radius_m;
        Ok(config)
    }
}

fn missing(name: &str) -> IngestionError {
    IngestionError::Configuration(format!("{} is not set", name))
}

#[derive(Debug, Deserialize)]
struct LocationsFile {
    locations: Vec<Location>,
}

/// Read a YAML location list:
///
/// ```yaml
/// locations:
///   - name: Paris
///     latitude: 48.8566
///     longitude: 2.3522
///     type: city
/// ```
pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read locations file {}", path.display()))?;
    let file: LocationsFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse locations file {}", path.display()))?;
    Ok(file.locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> IngesterConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngesterConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.ads_url, DEFAULT_ADS_URL);
        assert_eq!(config.openaq_url, DEFAULT_OPENAQ_URL);
        assert_eq!(config.texture_root, PathBuf::from("./textures"));
        assert!(config.s3.is_none());
        assert!(config.insitu_cache_dir.is_none());
    }

    #[test]
    fn test_missing_credentials_are_configuration_errors() {
        let config = config(&[("ADS_KEY", "  ")]);
        assert!(matches!(config.cams(), Err(IngestionError::Configuration(_))));
        assert!(matches!(
            config.openaq(25_000),
            Err(IngestionError::Configuration(_))
        ));
        assert!(matches!(
            config.database_url(),
            Err(IngestionError::Configuration(_))
        ));
    }

    #[test]
    fn test_provider_settings() {
        let config = config(&[
            ("ADS_URL", "http://ads.local"),
            ("ADS_KEY", "secret"),
            ("OPENAQ_API_KEY", "aq-key"),
            ("INSITU_CACHE_DIR", "/tmp/openaq"),
        ]);
        let cams = config.cams().unwrap();
        assert_eq!(cams.url, "http://ads.local");
        assert_eq!(cams.key, "secret");

        let openaq = config.openaq(10_000).unwrap();
        assert_eq!(openaq.api_key, "aq-key");
        assert_eq!(openaq.radius_m, 10_000);
        assert_eq!(config.insitu_cache_dir, Some(PathBuf::from("/tmp/openaq")));
    }

    #[test]
    fn test_s3_enabled_by_bucket() {
        let config = config(&[("S3_BUCKET", "textures"), ("S3_ALLOW_HTTP", "true")]);
        let s3 = config.s3.unwrap();
        assert_eq!(s3.bucket, "textures");
        assert_eq!(s3.region, "us-east-1");
        assert!(s3.allow_http);
    }

    #[test]
    fn test_load_locations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.yaml");
        std::fs::write(
            &path,
            "locations:\n  - name: Paris\n    latitude: 48.8566\n    longitude: 2.3522\n    type: city\n",
        )
        .unwrap();

        let locations = load_locations(&path).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "Paris");
        assert_eq!(locations[0].location_type, "city");
    }

    #[test]
    fn test_load_locations_rejects_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.yaml");
        std::fs::write(&path, "locations: [name").unwrap();
        assert!(load_locations(&path).is_err());
    }
}
