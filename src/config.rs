//! User configuration: API keys, proxy credentials, storage paths, HTTP timeouts.
//!
//! The configuration is an explicit value handed to the ingesters and the
//! proxy session; nothing reads it from global state.
//!
//! The file is a small TOML subset parsed line by line:
//!
//! ```toml
//! [api-keys]
//! ads = "..."
//! crossref = "you@example.com"
//!
//! [proxy]
//! suffix = ".ezproxy.example.edu"
//! login-url = "https://login.example.edu/cas/login"
//! forward-url = "http://ezproxy.example.edu/connect"
//! username = "jdoe"
//! password = "hunter2"
//!
//! [proxy-inputs]
//! compositeAuthenticationSourceType = "PIN"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::proxy::ProxyConfig;
use crate::user_agent;

const APP_DIR_NAME: &str = "bibtools";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EXEMPT_HOSTS: &str = "arxiv.org";

const SECTION_API_KEYS: &str = "api-keys";
const SECTION_PROXY: &str = "proxy";
const SECTION_PROXY_INPUTS: &str = "proxy-inputs";
const SECTION_PATHS: &str = "paths";
const SECTION_HTTP: &str = "http";

const PROXY_KEYS: &[&str] = &[
    "suffix",
    "login-url",
    "forward-url",
    "username",
    "password",
    "user-agent",
    "exempt-hosts",
];

/// Errors raised while loading or querying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value the requested operation cannot do without is absent.
    #[error(
        "missing configuration value `{key}` in section [{section}]\n  Suggestion: add it to {}",
        config_path_hint()
    )]
    MissingKey { section: String, key: String },

    /// The configuration file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed.
    #[error("invalid config syntax on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A key that no section accepts.
    #[error("unknown configuration key `{key}` in section [{section}] on line {line}")]
    UnknownKey {
        section: String,
        key: String,
        line: usize,
    },
}

impl ConfigError {
    /// Creates a missing-key error.
    #[must_use]
    pub fn missing(section: &str, key: &str) -> Self {
        Self::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

fn config_path_hint() -> String {
    resolve_default_config_path().map_or_else(
        || format!("$XDG_CONFIG_HOME/{APP_DIR_NAME}/config.toml"),
        |path| path.display().to_string(),
    )
}

/// Connect/read timeouts applied to every HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_secs: u64,
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Parsed configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    api_keys: BTreeMap<String, String>,
    proxy: BTreeMap<String, String>,
    proxy_inputs: Vec<(String, String)>,
    data_dir: Option<PathBuf>,
    timeouts: HttpTimeouts,
}

impl Config {
    /// Loads the configuration from the default location.
    ///
    /// A missing file is not an error and yields an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        match resolve_default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Loads the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse_str(&raw)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] or [`ConfigError::UnknownKey`] on bad input.
    pub fn parse_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut section: Option<String> = None;

        for (line_index, raw_line) in raw.lines().enumerate() {
            let line_no = line_index + 1;
            let line = strip_inline_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(ConfigError::syntax(line_no, "unterminated section header"));
                };
                section = Some(name.trim().to_string());
                continue;
            }

            let Some((raw_key, raw_value)) = line.split_once('=') else {
                return Err(ConfigError::syntax(line_no, "expected key = value"));
            };
            let Some(section_name) = section.as_deref() else {
                return Err(ConfigError::syntax(
                    line_no,
                    "key = value must follow a [section] header",
                ));
            };

            let key = raw_key.trim();
            let value = raw_value.trim();
            config.apply(section_name, key, value, line_no)?;
        }

        Ok(config)
    }

    fn apply(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        line: usize,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey {
            section: section.to_string(),
            key: key.to_string(),
            line,
        };

        match section {
            SECTION_API_KEYS => {
                let parsed = parse_string_literal(value, line)?;
                self.api_keys.insert(key.to_string(), parsed);
            }
            SECTION_PROXY => {
                if !PROXY_KEYS.contains(&key) {
                    return Err(unknown());
                }
                let parsed = parse_string_literal(value, line)?;
                self.proxy.insert(key.to_string(), parsed);
            }
            SECTION_PROXY_INPUTS => {
                let parsed = parse_string_literal(value, line)?;
                self.proxy_inputs.push((key.to_string(), parsed));
            }
            SECTION_PATHS => match key {
                "data-dir" => {
                    self.data_dir = Some(PathBuf::from(parse_string_literal(value, line)?));
                }
                _ => return Err(unknown()),
            },
            SECTION_HTTP => match key {
                "connect-timeout-secs" => {
                    self.timeouts.connect_secs = parse_timeout_secs(value, line)?;
                }
                "read-timeout-secs" => {
                    self.timeouts.read_secs = parse_timeout_secs(value, line)?;
                }
                _ => return Err(unknown()),
            },
            _ => return Err(unknown()),
        }
        Ok(())
    }

    /// Sets an API key, replacing any previous value.
    #[must_use]
    pub fn with_api_key(mut self, service: &str, key: &str) -> Self {
        self.api_keys.insert(service.to_string(), key.to_string());
        self
    }

    /// Sets a `[proxy]` value, replacing any previous value.
    #[must_use]
    pub fn with_proxy_value(mut self, key: &str, value: &str) -> Self {
        self.proxy.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds an extra login-form input sent with the proxy credentials.
    #[must_use]
    pub fn with_proxy_input(mut self, name: &str, value: &str) -> Self {
        self.proxy_inputs.push((name.to_string(), value.to_string()));
        self
    }

    /// Overrides the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Returns the API key for `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when the key is absent; there is no default.
    pub fn api_key(&self, service: &str) -> Result<&str, ConfigError> {
        self.api_keys
            .get(service)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::missing(SECTION_API_KEYS, service))
    }

    /// Returns the HTTP timeouts.
    #[must_use]
    pub fn timeouts(&self) -> HttpTimeouts {
        self.timeouts
    }

    /// Builds the proxy configuration.
    ///
    /// Returns `Ok(None)` when no `[proxy]` section is present, in which case
    /// every request goes out directly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] naming the first absent required field
    /// when the section is present but incomplete.
    pub fn proxy_config(&self) -> Result<Option<ProxyConfig>, ConfigError> {
        if self.proxy.is_empty() {
            return Ok(None);
        }

        let required = |key: &str| {
            self.proxy
                .get(key)
                .cloned()
                .ok_or_else(|| ConfigError::missing(SECTION_PROXY, key))
        };

        let exempt_hosts = self
            .proxy
            .get("exempt-hosts")
            .map_or(DEFAULT_EXEMPT_HOSTS, String::as_str)
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Some(ProxyConfig {
            suffix: required("suffix")?,
            login_url: required("login-url")?,
            forward_url: required("forward-url")?,
            username: required("username")?,
            password: required("password")?,
            user_agent: self
                .proxy
                .get("user-agent")
                .cloned()
                .unwrap_or_else(user_agent::default_user_agent),
            extra_inputs: self.proxy_inputs.clone(),
            exempt_hosts,
        }))
    }

    /// Returns the data directory holding the database and the PDF library.
    ///
    /// Priority:
    /// 1. `[paths] data-dir`
    /// 2. `$XDG_DATA_HOME/bibtools`
    /// 3. `$HOME/.local/share/bibtools`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when none of these is available.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        if let Some(xdg_data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
            return Ok(PathBuf::from(xdg_data_home).join(APP_DIR_NAME));
        }
        env_var_non_empty_os("HOME")
            .map(|home| {
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join(APP_DIR_NAME)
            })
            .ok_or_else(|| ConfigError::missing(SECTION_PATHS, "data-dir"))
    }

    /// Returns the `SQLite` database path inside the data directory.
    ///
    /// # Errors
    ///
    /// See [`Config::data_dir`].
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("db.sqlite3"))
    }

    /// Returns the PDF library root inside the data directory.
    ///
    /// # Errors
    ///
    /// See [`Config::data_dir`].
    pub fn library_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("lib"))
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bibtools/config.toml`
/// 2. `$HOME/.config/bibtools/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(APP_DIR_NAME)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR_NAME)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str, line: usize) -> Result<String, ConfigError> {
    raw_value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| ConfigError::syntax(line, "expected double-quoted string"))
}

fn parse_timeout_secs(raw_value: &str, line: usize) -> Result<u64, ConfigError> {
    let value = raw_value
        .parse::<u64>()
        .map_err(|_| ConfigError::syntax(line, "expected a non-negative integer"))?;
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::syntax(
            line,
            format!("timeout {value} out of range 1..=3600"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
# personal settings
[api-keys]
ads = "ads-token"       # dev key
crossref = "me@example.com"

[proxy]
suffix = ".ezp.example.edu"
login-url = "https://login.example.edu/cas/login"
forward-url = "http://ezp.example.edu/connect"
username = "jdoe"
password = "p#ss"
user-agent = "Mozilla/5.0 (X11)"

[proxy-inputs]
compositeAuthenticationSourceType = "PIN"

[paths]
data-dir = "/tmp/bib-data"

[http]
connect-timeout-secs = 5
read-timeout-secs = 90
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse_str(FULL_CONFIG).unwrap();
        assert_eq!(config.api_key("ads").unwrap(), "ads-token");
        assert_eq!(config.api_key("crossref").unwrap(), "me@example.com");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/bib-data"));
        assert_eq!(
            config.timeouts(),
            HttpTimeouts {
                connect_secs: 5,
                read_secs: 90
            }
        );

        let proxy = config.proxy_config().unwrap().unwrap();
        assert_eq!(proxy.suffix, ".ezp.example.edu");
        assert_eq!(proxy.password, "p#ss", "hash inside quotes is not a comment");
        assert_eq!(proxy.user_agent, "Mozilla/5.0 (X11)");
        assert_eq!(proxy.exempt_hosts, vec!["arxiv.org".to_string()]);
        assert_eq!(
            proxy.extra_inputs,
            vec![(
                "compositeAuthenticationSourceType".to_string(),
                "PIN".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = Config::parse_str("[api-keys]\nads = \"x\"\n").unwrap();
        let err = config.api_key("crossref").unwrap_err();
        match &err {
            ConfigError::MissingKey { section, key } => {
                assert_eq!(section, "api-keys");
                assert_eq!(key, "crossref");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }
        assert!(err.to_string().contains("crossref"));
    }

    #[test]
    fn test_no_proxy_section_means_direct() {
        let config = Config::parse_str("[api-keys]\nads = \"x\"\n").unwrap();
        assert!(config.proxy_config().unwrap().is_none());
    }

    #[test]
    fn test_incomplete_proxy_section_names_missing_field() {
        let config = Config::parse_str("[proxy]\nsuffix = \".p.example\"\n").unwrap();
        let err = config.proxy_config().unwrap_err();
        assert!(
            matches!(&err, ConfigError::MissingKey { key, .. } if key == "login-url"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_exempt_hosts_list() {
        let config = Config::default()
            .with_proxy_value("suffix", ".p")
            .with_proxy_value("login-url", "https://l")
            .with_proxy_value("forward-url", "https://f")
            .with_proxy_value("username", "u")
            .with_proxy_value("password", "p")
            .with_proxy_value("exempt-hosts", "arxiv.org, example.org,,");
        let proxy = config.proxy_config().unwrap().unwrap();
        assert_eq!(proxy.exempt_hosts, vec!["arxiv.org", "example.org"]);
    }

    #[test]
    fn test_rejects_key_outside_section() {
        let err = Config::parse_str("ads = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_rejects_unknown_section_and_key() {
        let err = Config::parse_str("[colors]\nred = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { line: 2, .. }));

        let err = Config::parse_str("[proxy]\nport = \"8080\"").unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_rejects_unquoted_string() {
        let err = Config::parse_str("[api-keys]\nads = token").unwrap_err();
        assert!(err.to_string().contains("double-quoted"));
    }

    #[test]
    fn test_rejects_out_of_range_timeout() {
        let err = Config::parse_str("[http]\nread-timeout-secs = 0").unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = Config::parse_str("[http]\nread-timeout-secs = 4 trailing").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_rejects_unterminated_header() {
        let err = Config::parse_str("[proxy\n").unwrap_err();
        assert!(err.to_string().contains("section header"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api-keys]\ncrossref = \"key\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key("crossref").unwrap(), "key");
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_database_and_library_paths_live_in_data_dir() {
        let config = Config::default().with_data_dir("/data/bib");
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/data/bib/db.sqlite3")
        );
        assert_eq!(config.library_dir().unwrap(), PathBuf::from("/data/bib/lib"));
    }
}
