use std::{
    collections::{BTreeMap, BTreeSet as Set},
    path::{Path, PathBuf},
    str::FromStr,
};

use arkres_consts::consts;
use clap::{ArgAction, Parser};
use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use serde::{Deserialize, Serialize};

/// Key in the per-server pattern tables that applies to every server.
pub const ALL_SERVERS: &str = "*";

/// Command line overrides for the configuration. Every flag can also be set
/// through its `ARKRES_*` environment variable.
#[derive(Parser, Debug, Default, Clone)]
pub struct ConfigCli {
    /// Root directory for raw blobs, manifests, bundles and extracted assets.
    #[arg(long, env = "ARKRES_DATA_ROOT", help_heading = consts::CLAP_CONFIG_OPTIONS)]
    data_root: Option<PathBuf>,

    /// Number of concurrent workers per stage, default is `8`.
    #[arg(long, env = "ARKRES_WORKERS", help_heading = consts::CLAP_CONFIG_OPTIONS)]
    workers: Option<usize>,

    /// Convert supported audio clips to wave files.
    #[arg(long, action = ArgAction::SetTrue, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    convert_audio: bool,

    /// Also log bundles that are skipped because they are up to date.
    #[arg(long, action = ArgAction::SetTrue, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    verbose_export: bool,

    /// Use this resource version instead of asking the server for the latest one.
    #[arg(long, env = "ARKRES_RES_VERSION", help_heading = consts::CLAP_CONFIG_OPTIONS)]
    res_version: Option<String>,

    /// Only process the given server(s).
    #[arg(long = "server", short = 's', help_heading = consts::CLAP_CONFIG_OPTIONS)]
    servers: Vec<String>,

    /// Only extract bundles matching one of these patterns (`^` anchors to the start).
    #[arg(long, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    include: Vec<String>,

    /// Never extract bundles matching one of these patterns (`^` anchors to the start).
    #[arg(long, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    exclude: Vec<String>,
}

/// The pair of secrets used to decrypt encrypted game data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptKeys {
    pub key: String,
    pub iv_mask: String,
}

/// The configuration of a single server, resolved from the global config.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerSettings {
    pub decrypt: Option<DecryptKeys>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The servers to process, in order.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<String>,

    /// Root directory of all local state.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,

    /// Platform segment used in asset URLs.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Value of the `X-Unity-Version` request header.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unity_version: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Number of concurrent workers per stage.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_audio: Option<bool>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_export: Option<bool>,

    /// Pinned resource version, skips the version lookup.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Per-server `[key, iv-mask]` pair.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub decrypt_keys: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub include: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exclude: BTreeMap<String, Vec<String>>,

    /// Additional or replacement asset hosts per server.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub server_hosts: BTreeMap<String, String>,

    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

impl From<ConfigCli> for Config {
    fn from(cli: ConfigCli) -> Self {
        let all_servers = |patterns: Vec<String>| {
            if patterns.is_empty() {
                BTreeMap::new()
            } else {
                BTreeMap::from([(ALL_SERVERS.to_string(), patterns)])
            }
        };

        Self {
            servers: cli.servers,
            data_root: cli.data_root,
            workers: cli.workers,
            convert_audio: cli.convert_audio.then_some(true),
            verbose_export: cli.verbose_export.then_some(true),
            version: cli.res_version,
            include: all_servers(cli.include),
            exclude: all_servers(cli.exclude),
            ..Default::default()
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no file was found at {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read config from '{0}'")]
    ReadError(std::io::Error),
    #[error("failed to parse config of {1}: {0}")]
    ParseError(miette::Report, PathBuf),
    #[error("validation error of {1}: {0}")]
    ValidationError(miette::Report, PathBuf),
}

impl Config {
    /// Parse the given toml string and return a Config instance.
    ///
    /// # Returns
    ///
    /// The parsed config, and the unused keys
    ///
    /// # Errors
    ///
    /// Parsing errors
    pub fn from_toml(toml: &str) -> miette::Result<(Config, Set<String>)> {
        let de = toml_edit::de::Deserializer::from_str(toml).into_diagnostic()?;

        // Deserialize the config and collect unused keys
        let mut unused_keys = Set::new();
        let config: Config = serde_ignored::deserialize(de, |path| {
            unused_keys.insert(path.to_string());
        })
        .into_diagnostic()?;

        Ok((config, unused_keys))
    }

    /// Load the config from the given path.
    ///
    /// # Errors
    ///
    /// I/O errors, parsing errors or an invalid configuration
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let s = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::NotADirectory =>
            {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::ReadError(e)),
        };

        let (mut config, unused_keys) =
            Config::from_toml(&s).map_err(|e| ConfigError::ParseError(e, path.to_path_buf()))?;

        if !unused_keys.is_empty() {
            tracing::warn!(
                "Ignoring '{}' in {}",
                console::style(unused_keys.iter().join(", ")).yellow(),
                path.display()
            );
        }

        config.loaded_from.push(path.to_path_buf());

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e, path.to_path_buf()))?;

        Ok(config)
    }

    /// Load the configuration file and layer the command line on top of it.
    ///
    /// Without an explicit path `arkres.toml` in the working directory is
    /// used when it exists. An explicitly given file must exist.
    pub fn load(path: Option<&Path>, cli: &ConfigCli) -> Result<Config, ConfigError> {
        let file_config = match path {
            Some(path) => Self::from_path(path)?,
            None => match Self::from_path(Path::new(consts::CONFIG_FILE)) {
                Ok(config) => config,
                Err(ConfigError::FileNotFound(_)) => Config::default(),
                Err(e) => return Err(e),
            },
        };

        let config = file_config.merge_config(cli.clone().into());
        config.validate().map_err(|e| {
            ConfigError::ValidationError(
                e,
                config
                    .loaded_from
                    .first()
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(consts::CONFIG_FILE)),
            )
        })?;
        Ok(config)
    }

    /// Validate the config.
    pub fn validate(&self) -> miette::Result<()> {
        for server in self.servers() {
            if self.server_host(server).is_none() {
                return Err(miette!(
                    "unknown server '{server}', add its host to `server-hosts`"
                ));
            }
        }

        for (server, secrets) in &self.decrypt_keys {
            if secrets.len() > 2 {
                return Err(miette!(
                    "decrypt-keys.{server} expects `[key, iv-mask]`, found {} entries",
                    secrets.len()
                ));
            }
            if let Some(mask) = secrets.get(1).filter(|mask| !mask.is_empty()) {
                if mask.len() < 16 {
                    return Err(miette!(
                        "the iv mask of decrypt-keys.{server} must be at least 16 bytes long"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Merge the `other` config into `self`.
    /// The `other` config will have higher priority
    #[must_use]
    pub fn merge_config(mut self, mut other: Config) -> Self {
        self.decrypt_keys.append(&mut other.decrypt_keys);
        self.include.append(&mut other.include);
        self.exclude.append(&mut other.exclude);
        self.server_hosts.append(&mut other.server_hosts);
        other.loaded_from.extend(self.loaded_from);

        Self {
            servers: if other.servers.is_empty() {
                self.servers
            } else {
                other.servers
            },
            data_root: other.data_root.or(self.data_root),
            platform: other.platform.or(self.platform),
            unity_version: other.unity_version.or(self.unity_version),
            user_agent: other.user_agent.or(self.user_agent),
            workers: other.workers.or(self.workers),
            convert_audio: other.convert_audio.or(self.convert_audio),
            verbose_export: other.verbose_export.or(self.verbose_export),
            version: other.version.or(self.version),
            decrypt_keys: self.decrypt_keys,
            include: self.include,
            exclude: self.exclude,
            server_hosts: self.server_hosts,
            loaded_from: other.loaded_from,
        }
    }

    /// The servers to process, falling back to the built-in list.
    pub fn servers(&self) -> Vec<&str> {
        if self.servers.is_empty() {
            consts::DEFAULT_SERVERS.to_vec()
        } else {
            self.servers.iter().map(String::as_str).collect()
        }
    }

    pub fn data_root(&self) -> PathBuf {
        self.data_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(consts::DEFAULT_DATA_ROOT))
    }

    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or(consts::DEFAULT_PLATFORM)
    }

    pub fn unity_version(&self) -> &str {
        self.unity_version
            .as_deref()
            .unwrap_or(consts::DEFAULT_UNITY_VERSION)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or(consts::DEFAULT_USER_AGENT)
    }

    /// Number of workers per stage, never less than one.
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(consts::DEFAULT_WORKERS).max(1)
    }

    pub fn convert_audio(&self) -> bool {
        self.convert_audio.unwrap_or(false)
    }

    pub fn verbose_export(&self) -> bool {
        self.verbose_export.unwrap_or(false)
    }

    pub fn version_override(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The asset host of a server, configured hosts take precedence.
    pub fn server_host(&self, server: &str) -> Option<String> {
        self.server_hosts
            .get(server)
            .cloned()
            .or_else(|| consts::builtin_server_host(server).map(str::to_string))
    }

    /// Resolves the decrypt secrets and bundle patterns of one server.
    pub fn server_settings(&self, server: &str) -> ServerSettings {
        let secret = |idx: usize| {
            self.decrypt_keys
                .get(server)
                .and_then(|secrets| secrets.get(idx))
                .filter(|secret| !secret.is_empty())
                .cloned()
        };
        let decrypt = match (secret(0), secret(1)) {
            (Some(key), Some(iv_mask)) => Some(DecryptKeys { key, iv_mask }),
            _ => None,
        };

        let patterns = |table: &BTreeMap<String, Vec<String>>| {
            [ALL_SERVERS, server]
                .iter()
                .filter_map(|key| table.get(*key))
                .flatten()
                .cloned()
                .collect::<Vec<_>>()
        };

        ServerSettings {
            decrypt,
            include: patterns(&self.include),
            exclude: patterns(&self.exclude),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_config_parse() {
        let toml = r#"
servers = ["cn", "jp"]
data-root = "/srv/ark"
workers = 4
convert-audio = true
UNUSED = "unused"

[decrypt-keys]
cn = ["0123456789abcdef", "fedcba9876543210"]

[include]
cn = ["^gamedata"]

[exclude]
"*" = ["buff"]
"#;
        let (config, unused) = Config::from_toml(toml).unwrap();
        assert_eq!(config.servers(), vec!["cn", "jp"]);
        assert_eq!(config.data_root(), PathBuf::from("/srv/ark"));
        assert_eq!(config.workers(), 4);
        assert!(config.convert_audio());
        assert!(!config.verbose_export());
        assert!(unused.contains("UNUSED"));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.servers(), vec!["cn", "us", "jp"]);
        assert_eq!(config.data_root(), PathBuf::from("Data"));
        assert_eq!(config.platform(), "IOS");
        assert_eq!(config.workers(), 8);
        assert_eq!(config.version_override(), None);
        assert_eq!(
            config.server_host("us").as_deref(),
            Some("ark-us-static-online.yo-star.com")
        );
    }

    #[test]
    fn test_workers_floor() {
        let config = Config {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.workers(), 1);
    }

    #[rstest]
    #[case::unknown_server("servers = [\"kr\"]")]
    #[case::short_mask("[decrypt-keys]\ncn = [\"key\", \"short\"]")]
    #[case::too_many_secrets("[decrypt-keys]\ncn = [\"a\", \"0123456789abcdef\", \"c\"]")]
    fn test_validation_errors(#[case] toml: &str) {
        let (config, _) = Config::from_toml(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_server_host() {
        let toml = r#"
servers = ["kr"]

[server-hosts]
kr = "ark-kr.example.org"
"#;
        let (config, _) = Config::from_toml(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server_host("kr").as_deref(), Some("ark-kr.example.org"));
    }

    #[test]
    fn test_merge_cli_wins() {
        let (file, _) = Config::from_toml(
            r#"
servers = ["cn"]
workers = 2
version = "23-01-01-00-00-00-abcdef"

[include]
"*" = ["^art"]
"#,
        )
        .unwrap();

        let cli = ConfigCli::parse_from([
            "arkres",
            "--workers",
            "16",
            "--server",
            "jp",
            "--include",
            "^gamedata",
        ]);
        let merged = file.merge_config(cli.into());

        assert_eq!(merged.workers(), 16);
        assert_eq!(merged.servers(), vec!["jp"]);
        assert_eq!(merged.version_override(), Some("23-01-01-00-00-00-abcdef"));
        assert_eq!(merged.server_settings("jp").include, vec!["^gamedata"]);
    }

    #[test]
    fn test_missing_decrypt_secret_disables_decryption() {
        let (config, _) = Config::from_toml("[decrypt-keys]\nus = [\"only-a-key\"]").unwrap();
        assert_eq!(config.server_settings("us").decrypt, None);
        assert_eq!(config.server_settings("cn").decrypt, None);
    }

    #[test]
    fn test_resolved_server_settings() {
        let (config, _) = Config::from_toml(
            r#"
[decrypt-keys]
cn = ["0123456789abcdef", "fedcba9876543210"]

[include]
cn = ["^gamedata", "^avg"]

[exclude]
"*" = ["buff"]
cn = ["^gamedata/story"]
"#,
        )
        .unwrap();
        insta::assert_debug_snapshot!("resolved_server_settings", config.server_settings("cn"));
    }

    #[test]
    fn test_from_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_path(&dir.path().join("arkres.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_from_path_records_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arkres.toml");
        fs_err::write(&path, "workers = 3\n").unwrap();
        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.workers(), 3);
        assert_eq!(config.loaded_from, vec![path]);
    }
}
