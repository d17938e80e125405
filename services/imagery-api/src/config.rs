//! Service configuration.
//!
//! Values are resolved once at startup, in order of precedence: command-line
//! flags, environment variables (including a `.env` file), an optional YAML
//! file, then built-in defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use ranking::{DecodeConfig, RetryPolicy};
use storage::CatalogConfig;

/// Imagery API Server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "imagery-api")]
#[command(about = "Sentinel-2 imagery search and color ranking server")]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "IMAGERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "IMAGERY_LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port on all interfaces (used when no listen address is given)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Google Cloud project billed for catalog queries
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project_id: Option<String>,

    /// Geocoding API key
    #[arg(long, env = "GEOCODE_API_KEY")]
    pub geocode_api_key: Option<String>,

    /// Geocoding endpoint
    #[arg(long, env = "GEOCODE_URL")]
    pub geocode_url: Option<String>,

    /// Fully-qualified Sentinel-2 index table
    #[arg(long, env = "CATALOG_TABLE")]
    pub catalog_table: Option<String>,

    /// Maximum number of scenes per request
    #[arg(long, env = "SCENE_LIMIT")]
    pub scene_limit: Option<usize>,

    /// Raster decode endpoint
    #[arg(long, env = "DECODE_URL")]
    pub decode_url: Option<String>,

    /// Resolution level requested from the decode service
    #[arg(long, env = "DECODE_RESOLUTION_LEVEL", allow_hyphen_values = true)]
    pub decode_resolution_level: Option<i32>,

    /// Saturation cap applied to samples when ranking by color
    #[arg(long, env = "QUANTIFICATION_VALUE")]
    pub quantification_value: Option<i64>,

    /// Maximum concurrent decode requests
    #[arg(long, env = "MAX_CONCURRENT_DECODES")]
    pub max_concurrent_decodes: Option<usize>,

    /// Retries for a failed decode request
    #[arg(long, env = "DECODE_MAX_RETRIES")]
    pub decode_max_retries: Option<u32>,

    /// Timeout for outbound HTTP requests, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Static OAuth token for catalog queries (otherwise the metadata server is used)
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN")]
    pub access_token: Option<String>,
}

/// Immutable service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen: String,
    pub project_id: String,
    pub geocode_api_key: String,
    pub geocode_url: String,
    pub catalog_table: String,
    pub scene_limit: usize,
    pub decode_url: String,
    pub decode_resolution_level: i32,
    pub quantification_value: i64,
    pub max_concurrent_decodes: usize,
    pub decode_max_retries: u32,
    pub request_timeout_secs: u64,
    pub access_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            project_id: String::new(),
            geocode_api_key: String::new(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            catalog_table: CatalogConfig::default().table,
            scene_limit: 3,
            decode_url: DecodeConfig::default().url,
            decode_resolution_level: -1,
            quantification_value: 10000,
            max_concurrent_decodes: 8,
            decode_max_retries: 2,
            request_timeout_secs: 60,
            access_token: None,
        }
    }
}

impl ServiceConfig {
    /// Load a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Resolve the configuration from parsed arguments and validate it.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(listen) = &args.listen {
            self.listen = listen.clone();
        } else if let Some(port) = args.port {
            self.listen = format!("0.0.0.0:{}", port);
        }

        override_with(&mut self.project_id, &args.project_id);
        override_with(&mut self.geocode_api_key, &args.geocode_api_key);
        override_with(&mut self.geocode_url, &args.geocode_url);
        override_with(&mut self.catalog_table, &args.catalog_table);
        override_with(&mut self.scene_limit, &args.scene_limit);
        override_with(&mut self.decode_url, &args.decode_url);
        override_with(&mut self.decode_resolution_level, &args.decode_resolution_level);
        override_with(&mut self.quantification_value, &args.quantification_value);
        override_with(&mut self.max_concurrent_decodes, &args.max_concurrent_decodes);
        override_with(&mut self.decode_max_retries, &args.decode_max_retries);
        override_with(&mut self.request_timeout_secs, &args.request_timeout_secs);

        if args.access_token.is_some() {
            self.access_token = args.access_token.clone();
        }
    }

    /// Check required fields and ranges.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            bail!("GOOGLE_CLOUD_PROJECT environment variable must be set");
        }
        if self.geocode_api_key.trim().is_empty() {
            bail!("GEOCODE_API_KEY environment variable must be set");
        }
        self.listen_addr()?;
        if self.scene_limit == 0 {
            bail!("scene_limit must be at least 1");
        }
        if self.max_concurrent_decodes == 0 {
            bail!("max_concurrent_decodes must be at least 1");
        }
        if self.quantification_value <= 0 {
            bail!("quantification_value must be positive");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.listen))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            project_id: self.project_id.clone(),
            table: self.catalog_table.clone(),
            timeout: self.request_timeout(),
            ..CatalogConfig::default()
        }
    }

    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig {
            url: self.decode_url.clone(),
            timeout: self.request_timeout(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.decode_max_retries,
            ..RetryPolicy::default()
        }
    }
}

fn override_with<T: Clone>(field: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *field = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn required() -> Args {
        Args {
            project_id: Some("my-project".to_string()),
            geocode_api_key: Some("key".to_string()),
            ..Args::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_args(&required()).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.scene_limit, 3);
        assert_eq!(config.decode_resolution_level, -1);
        assert_eq!(config.quantification_value, 10000);
        assert_eq!(config.max_concurrent_decodes, 8);
        assert_eq!(
            config.catalog_table,
            "bigquery-public-data.cloud_storage_geo_index.sentinel_2_index"
        );
    }

    #[test]
    fn test_missing_project_rejected() {
        let args = Args {
            project_id: None,
            ..required()
        };
        let err = ServiceConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLOUD_PROJECT"));
    }

    #[test]
    fn test_missing_geocode_key_rejected() {
        let args = Args {
            geocode_api_key: Some("  ".to_string()),
            ..required()
        };
        let err = ServiceConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("GEOCODE_API_KEY"));
    }

    #[test]
    fn test_port_sets_listen_address() {
        let args = Args {
            port: Some(9090),
            ..required()
        };
        let config = ServiceConfig::from_args(&args).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9090");
    }

    #[test]
    fn test_listen_wins_over_port() {
        let args = Args {
            listen: Some("127.0.0.1:7000".to_string()),
            port: Some(9090),
            ..required()
        };
        let config = ServiceConfig::from_args(&args).unwrap();
        assert_eq!(config.listen_addr().unwrap().port(), 7000);
    }

    #[test]
    fn test_invalid_listen_rejected() {
        let args = Args {
            listen: Some("nowhere".to_string()),
            ..required()
        };
        assert!(ServiceConfig::from_args(&args).is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let args = Args {
            scene_limit: Some(0),
            ..required()
        };
        assert!(ServiceConfig::from_args(&args).is_err());

        let args = Args {
            max_concurrent_decodes: Some(0),
            ..required()
        };
        assert!(ServiceConfig::from_args(&args).is_err());
    }

    #[test]
    fn test_yaml_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "project_id: from-file\ngeocode_api_key: file-key\nscene_limit: 5\nmax_concurrent_decodes: 2"
        )
        .unwrap();

        let args = Args {
            config: Some(file.path().to_path_buf()),
            scene_limit: Some(7),
            ..Args::default()
        };
        let config = ServiceConfig::from_args(&args).unwrap();
        assert_eq!(config.project_id, "from-file");
        assert_eq!(config.scene_limit, 7);
        assert_eq!(config.max_concurrent_decodes, 2);
        assert_eq!(config.decode_resolution_level, -1);
    }

    #[test]
    fn test_negative_resolution_level_flag() {
        let args = Args::try_parse_from([
            "imagery-api",
            "--project-id",
            "p",
            "--geocode-api-key",
            "k",
            "--decode-resolution-level",
            "-1",
        ])
        .unwrap();
        assert_eq!(args.decode_resolution_level, Some(-1));
    }

    #[test]
    fn test_derived_client_configs() {
        let config = ServiceConfig::from_args(&Args {
            request_timeout_secs: Some(5),
            decode_max_retries: Some(4),
            ..required()
        })
        .unwrap();
        assert_eq!(config.catalog_config().project_id, "my-project");
        assert_eq!(config.catalog_config().timeout, Duration::from_secs(5));
        assert_eq!(config.decode_config().timeout, Duration::from_secs(5));
        assert_eq!(config.retry_policy().max_retries, 4);
    }
}
