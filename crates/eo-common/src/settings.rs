use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{EoError, EoResult};

/// Environment variable overriding the configuration file location.
pub const CONFIG_FILE_ENV: &str = "EO_CONFIG_FILE";

const CONFIG_DIR: &str = "eoconfig";
const CONFIG_FILE: &str = "config_eo_service.yml";

/// Object storage endpoint and credentials for one platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageSection {
    pub endpoint_url_local: String,
    #[serde(default)]
    pub endpoint_url_ext: Option<String>,
    #[serde(default = "default_region")]
    pub region_name: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub bucket: String,
    #[serde(default)]
    pub output_directory: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Sentinel Hub API credentials.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentinelHubSettings {
    pub instance_id: String,
    pub sh_client_id: String,
    pub sh_client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlatformEntry {
    priority: i64,
    storage: StorageSection,
}

/// Resolved service configuration.
///
/// The YAML file maps platform names to a priority and a storage
/// section, with an optional `sentinel-hub` credentials block next to
/// them. The platform with the lowest priority number is selected.
#[derive(Debug, Clone)]
pub struct Settings {
    pub platform: String,
    pub priority: i64,
    pub storage: StorageSection,
    pub sentinel_hub: Option<SentinelHubSettings>,
}

impl Settings {
    /// Load from the default location, honouring `EO_CONFIG_FILE`.
    pub fn load() -> EoResult<Self> {
        Self::from_file(&Self::config_path()?)
    }

    /// `$EO_CONFIG_FILE` if set, otherwise `~/eoconfig/config_eo_service.yml`.
    pub fn config_path() -> EoResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = std::env::var("HOME")
            .map_err(|_| EoError::config("HOME is not set and EO_CONFIG_FILE is missing"))?;
        Ok(PathBuf::from(home).join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> EoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EoError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> EoResult<Self> {
        let doc: serde_yaml::Mapping = serde_yaml::from_str(content)?;

        let mut sentinel_hub = None;
        let mut best: Option<(String, PlatformEntry)> = None;

        for (key, value) in doc {
            let name = key
                .as_str()
                .ok_or_else(|| EoError::config("Configuration keys must be strings"))?
                .to_string();

            if name == "sentinel-hub" {
                let sh: SentinelHubSettings = serde_yaml::from_value(value).map_err(|e| {
                    EoError::config(format!("Invalid sentinel-hub section: {}", e))
                })?;
                sentinel_hub = Some(sh);
                continue;
            }

            let entry: PlatformEntry = serde_yaml::from_value(value)
                .map_err(|e| EoError::config(format!("Invalid platform section {}: {}", name, e)))?;
            let better = match &best {
                Some((_, current)) => entry.priority < current.priority,
                None => true,
            };
            if better {
                best = Some((name, entry));
            }
        }

        let (platform, entry) =
            best.ok_or_else(|| EoError::config("No storage platform configured"))?;

        Ok(Self {
            platform,
            priority: entry.priority,
            storage: entry.storage,
            sentinel_hub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
creodias:
  priority: 2
  storage:
    endpoint_url_local: https://s3.creodias.example
    aws_access_key_id: creo-key
    aws_secret_access_key: creo-secret
    bucket: eo-products

minio-local:
  priority: 1
  storage:
    endpoint_url_local: http://localhost:9000
    endpoint_url_ext: http://minio.example:9000
    region_name: eu-west-1
    aws_access_key_id: minioadmin
    aws_secret_access_key: minioadmin
    bucket: eo-products-dev
    output_directory: /tmp/eo

sentinel-hub:
  instance_id: abc123
  sh_client_id: client-id
  sh_client_secret: client-secret
"#;

    #[test]
    fn test_lowest_priority_wins() {
        let settings = Settings::from_yaml(YAML).unwrap();
        assert_eq!(settings.platform, "minio-local");
        assert_eq!(settings.priority, 1);
        assert_eq!(settings.storage.bucket, "eo-products-dev");
        assert_eq!(settings.storage.region_name, "eu-west-1");
    }

    #[test]
    fn test_sentinel_hub_section() {
        let settings = Settings::from_yaml(YAML).unwrap();
        let sh = settings.sentinel_hub.unwrap();
        assert_eq!(sh.sh_client_id, "client-id");
        assert_eq!(sh.sh_client_secret, "client-secret");
    }

    #[test]
    fn test_sentinel_hub_optional() {
        let yaml = r#"
only:
  priority: 1
  storage:
    endpoint_url_local: http://localhost:9000
    aws_access_key_id: key
    aws_secret_access_key: secret
    bucket: products
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert!(settings.sentinel_hub.is_none());
        assert_eq!(settings.storage.region_name, "us-east-1");
    }

    #[test]
    fn test_no_platform_is_an_error() {
        let yaml = r#"
sentinel-hub:
  instance_id: abc
  sh_client_id: id
  sh_client_secret: secret
"#;
        assert!(Settings::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_platform_section() {
        let yaml = r#"
broken:
  storage:
    endpoint_url_local: http://localhost:9000
"#;
        assert!(Settings::from_yaml(yaml).is_err());
    }
}
