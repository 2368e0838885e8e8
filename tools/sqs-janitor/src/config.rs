use crate::errors::JanitorError;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE_NAME: &str = ".sqsjanitor.toml";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub aws_region: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub max_workers: Option<usize>,
    pub call_timeout_seconds: Option<u64>,
    pub queue_name_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub aws: AwsConfig,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    pub max_workers: usize,
    pub call_timeout_seconds: u64,
    pub queue_name_prefix: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            call_timeout_seconds: 30,
            queue_name_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    aws: Option<PartialAwsConfig>,
    fetch: Option<PartialFetchConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAwsConfig {
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    profile: Option<String>,
    endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialFetchConfig {
    max_workers: Option<usize>,
    call_timeout_seconds: Option<u64>,
    queue_name_prefix: Option<String>,
}

/// Defaults, then the config file, then CLI flags. An explicit `--config`
/// must exist; the home-directory file is only read when present.
pub fn load_config(
    overrides: &CliOverrides,
    home_dir: Option<&Path>,
    fs: &dyn FileSystem,
) -> Result<(AppConfig, Option<PathBuf>), JanitorError> {
    let mut cfg = AppConfig::default();

    let source = match &overrides.config_path {
        Some(path) => Some(path.clone()),
        None => home_dir
            .map(|home| home.join(DEFAULT_CONFIG_FILE_NAME))
            .filter(|path| fs.exists(path)),
    };

    if let Some(path) = &source {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| JanitorError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok((cfg, source))
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(aws) = partial.aws {
        if aws.region.is_some() {
            cfg.aws.region = aws.region;
        }
        if aws.access_key_id.is_some() {
            cfg.aws.access_key_id = aws.access_key_id;
        }
        if aws.secret_access_key.is_some() {
            cfg.aws.secret_access_key = aws.secret_access_key;
        }
        if aws.profile.is_some() {
            cfg.aws.profile = aws.profile;
        }
        if aws.endpoint_url.is_some() {
            cfg.aws.endpoint_url = aws.endpoint_url;
        }
    }

    if let Some(fetch) = partial.fetch {
        if let Some(value) = fetch.max_workers {
            cfg.fetch.max_workers = value;
        }
        if let Some(value) = fetch.call_timeout_seconds {
            cfg.fetch.call_timeout_seconds = value;
        }
        if fetch.queue_name_prefix.is_some() {
            cfg.fetch.queue_name_prefix = fetch.queue_name_prefix;
        }
    }

    if let Some(logging) = partial.logging {
        cfg.logging = logging;
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(region) = &overrides.aws_region {
        cfg.aws.region = Some(region.clone());
    }
    if let Some(key) = &overrides.aws_access_key_id {
        cfg.aws.access_key_id = Some(key.clone());
    }
    if let Some(secret) = &overrides.aws_secret_access_key {
        cfg.aws.secret_access_key = Some(secret.clone());
    }
    if let Some(profile) = &overrides.aws_profile {
        cfg.aws.profile = Some(profile.clone());
    }
    if let Some(endpoint) = &overrides.endpoint_url {
        cfg.aws.endpoint_url = Some(endpoint.clone());
    }
    if let Some(max_workers) = overrides.max_workers {
        cfg.fetch.max_workers = max_workers;
    }
    if let Some(timeout) = overrides.call_timeout_seconds {
        cfg.fetch.call_timeout_seconds = timeout;
    }
    if let Some(prefix) = &overrides.queue_name_prefix {
        cfg.fetch.queue_name_prefix = Some(prefix.clone());
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), JanitorError> {
    if cfg.fetch.max_workers == 0 {
        return Err(JanitorError::InvalidConfig(
            "fetch.max_workers must be greater than zero".to_string(),
        ));
    }

    if cfg.fetch.call_timeout_seconds == 0 {
        return Err(JanitorError::InvalidConfig(
            "fetch.call_timeout_seconds must be greater than zero".to_string(),
        ));
    }

    if cfg
        .aws
        .region
        .as_deref()
        .is_some_and(|region| region.trim().is_empty())
    {
        return Err(JanitorError::InvalidConfig(
            "aws.region must not be empty".to_string(),
        ));
    }

    match (&cfg.aws.access_key_id, &cfg.aws.secret_access_key) {
        (Some(_), None) | (None, Some(_)) => Err(JanitorError::InvalidConfig(
            "aws.access_key_id and aws.secret_access_key must be set together".to_string(),
        )),
        _ => Ok(()),
    }
}
