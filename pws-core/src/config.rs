use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::LazyLock};

use crate::schema::FieldNaming;

pub const DEFAULT_INFLUXDB_HOST: &str = "http://localhost:8086";

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{16}$").expect("valid regex"));
static PWS_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));

/// Weather Underground credentials and station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WundergroundConfig {
    pub api_key: Option<String>,
    pub pws_name: Option<String>,
}

/// InfluxDB connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfluxDbConfig {
    /// Base URL; a path component names the database when `database` is unset.
    pub host: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// fields = ["temp_f", "relative_humidity", "wind_mph"]
/// naming = "alias"
///
/// [wunderground]
/// api_key = "..."
/// pws_name = "KCASANFR58"
///
/// [influxdb]
/// host = "http://localhost:8086"
/// database = "weather"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<FieldNaming>,
    #[serde(default)]
    pub wunderground: WundergroundConfig,
    #[serde(default)]
    pub influxdb: InfluxDbConfig,
}

/// Validated InfluxDB connection details.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxDbSettings {
    pub host: Url,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Validated configuration for a single publish run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub pws_name: String,
    pub fields: Vec<String>,
    pub naming: FieldNaming,
    /// `None` only in dry-run mode when no database was configured.
    pub influxdb: Option<InfluxDbSettings>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "pws-influx", "pws")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay every value set in `other` on top of `self`.
    pub fn merge(mut self, other: Config) -> Self {
        if !other.fields.is_empty() {
            self.fields = other.fields;
        }
        self.naming = other.naming.or(self.naming);

        let wu = other.wunderground;
        self.wunderground.api_key = wu.api_key.or(self.wunderground.api_key);
        self.wunderground.pws_name = wu.pws_name.or(self.wunderground.pws_name);

        let db = other.influxdb;
        self.influxdb.host = db.host.or(self.influxdb.host);
        self.influxdb.database = db.database.or(self.influxdb.database);
        self.influxdb.username = db.username.or(self.influxdb.username);
        self.influxdb.password = db.password.or(self.influxdb.password);

        self
    }

    /// Validate the configuration for a publish run.
    ///
    /// In dry-run mode the InfluxDB database may be left unset.
    pub fn settings(&self, dry_run: bool) -> Result<Settings> {
        let (Some(api_key), Some(pws_name)) =
            (&self.wunderground.api_key, &self.wunderground.pws_name)
        else {
            bail!(
                "Weather Underground API key and station name are required.\n\
                 Hint: run `pws configure` or pass --api-key and --pws-name."
            );
        };

        if !API_KEY_RE.is_match(api_key) {
            bail!(
                "API key \"{api_key}\" is not in a valid format (16-character alphanumeric string required)."
            );
        }

        if !PWS_NAME_RE.is_match(pws_name) {
            bail!(
                "Station name \"{pws_name}\" is not in a valid format \
                 (alphanumeric string including minus and underscore required)."
            );
        }

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        if fields.is_empty() {
            bail!(
                "No fields requested.\n\
                 Hint: pass --field-list (e.g. `--field-list temp_f,relative_humidity`) \
                 or run `pws fields` to list the available names."
            );
        }

        Ok(Settings {
            api_key: api_key.clone(),
            pws_name: pws_name.clone(),
            fields,
            naming: self.naming.unwrap_or_default(),
            influxdb: self.influxdb_settings(dry_run)?,
        })
    }

    fn influxdb_settings(&self, dry_run: bool) -> Result<Option<InfluxDbSettings>> {
        let raw = self.influxdb.host.as_deref().unwrap_or(DEFAULT_INFLUXDB_HOST);
        let host =
            Url::parse(raw).with_context(|| format!("InfluxDB host \"{raw}\" is not a valid URL"))?;

        if host.host_str().is_none_or(str::is_empty) {
            bail!("InfluxDB host \"{raw}\" is missing a proper host name.");
        }

        let from_path = host.path().trim_matches('/');
        let database = self
            .influxdb
            .database
            .clone()
            .filter(|db| !db.is_empty())
            .or_else(|| (!from_path.is_empty()).then(|| from_path.to_string()));

        match database {
            Some(database) => Ok(Some(InfluxDbSettings {
                host,
                database,
                username: self.influxdb.username.clone(),
                password: self.influxdb.password.clone(),
            })),
            None if dry_run => Ok(None),
            None => bail!(
                "InfluxDB database name is required when not in debug mode.\n\
                 Hint: pass --influxdb-name or append it to the host URL (e.g. http://localhost:8086/weather)."
            ),
        }
    }
}
