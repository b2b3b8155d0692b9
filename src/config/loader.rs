//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_LINK";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-link.toml";

/// Directory under the platform config dir
const APP_DIR_NAME: &str = "serial-link";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_LINK_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_LINK_CONFIG` environment variable (explicit path)
    /// 2. `./serial-link.toml` (current directory)
    /// 3. `~/.config/serial-link/serial-link.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\serial-link\serial-link.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        let _ = apply_env_overrides(&mut config);

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to the file it was loaded from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("No config file path set".to_string()))?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            self.config = load_from_file(path)?;
            apply_env_overrides(&mut self.config)?;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(key: &str) -> (String, Option<String>) {
    let var = format!("{}_{}", ENV_PREFIX, key);
    let value = std::env::var(&var).ok();
    (var, value)
}

fn parse_env<T: FromStr>(key: &str, message: &str) -> ConfigResult<Option<T>> {
    match env_var(key) {
        (_, None) => Ok(None),
        (var, Some(value)) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, message)),
    }
}

/// Turn `\n`, `\r`, `\t` and `\\` escapes into the characters they name, so
/// delimiters can be given on a single-line environment variable.
fn unescape_delimiter(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_LINK_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_LINK_SERIAL_DEVICE=/dev/ttyACM0`
/// - `SERIAL_LINK_SERIAL_BAUD_RATE=9600`
/// - `SERIAL_LINK_LINK_READ_DELIMITER=\r\n`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let (_, Some(val)) = env_var("SERIAL_DEVICE") {
        config.serial.device = val;
    }
    if let Some(val) = parse_env("SERIAL_BAUD_RATE", "Invalid baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = parse_env("SERIAL_READ_TIMEOUT_MS", "Invalid timeout")? {
        config.serial.read_timeout_ms = val;
    }

    // Link overrides
    if let Some(val) = parse_env("LINK_WRITE_INTERVAL_MS", "Invalid interval")? {
        config.link.write_interval_ms = val;
    }
    if let Some(val) = parse_env("LINK_RECONNECT_INTERVAL_MS", "Invalid interval")? {
        config.link.reconnect_interval_ms = val;
    }
    if let (_, Some(val)) = env_var("LINK_READ_DELIMITER") {
        config.link.read_delimiter = unescape_delimiter(&val);
    }
    if let (_, Some(val)) = env_var("LINK_WRITE_DELIMITER") {
        config.link.write_delimiter = unescape_delimiter(&val);
    }

    // Logging overrides
    if let (_, Some(val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let (var, Some(val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(ConfigError::env_parse(var, "Expected json, pretty or compact")),
        };
    }

    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.baud_rate, 115200);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("SERIAL_LINK_SERIAL_BAUD_RATE", "57600");
        env::set_var("SERIAL_LINK_LINK_READ_DELIMITER", "\\r\\n");
        env::set_var("SERIAL_LINK_LOGGING_FORMAT", "JSON");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.baud_rate, 57600);
        assert_eq!(loader.config().link.read_delimiter, "\r\n");
        assert_eq!(loader.config().logging.format, LogFormat::Json);

        env::remove_var("SERIAL_LINK_SERIAL_BAUD_RATE");
        env::remove_var("SERIAL_LINK_LINK_READ_DELIMITER");
        env::remove_var("SERIAL_LINK_LOGGING_FORMAT");
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        env::set_var("SERIAL_LINK_LINK_WRITE_INTERVAL_MS", "soon");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvParseError { ref var, .. } if var == "SERIAL_LINK_LINK_WRITE_INTERVAL_MS"
        ));

        env::remove_var("SERIAL_LINK_LINK_WRITE_INTERVAL_MS");
    }

    #[test]
    #[serial]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::with_defaults();
        loader.config_mut().serial.device = "/dev/ttyS3".to_string();
        loader.config_mut().link.write_interval_ms = 25;
        loader.save_to(&path).unwrap();

        let loaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loaded.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config().serial.device, "/dev/ttyS3");
        assert_eq!(loaded.config().link.write_interval_ms, 25);
    }

    #[test]
    #[serial]
    fn test_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[serial]\nbaud_rate = 9600\n").unwrap();

        let mut loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().serial.baud_rate, 9600);

        std::fs::write(&path, "[serial]\nbaud_rate = 19200\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 19200);
    }

    #[test]
    #[serial]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            ConfigLoader::load_from(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let malformed = dir.path().join("bad.toml");
        std::fs::write(&malformed, "[serial\nbaud_rate = ").unwrap();
        assert!(matches!(
            ConfigLoader::load_from(&malformed),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_without_path() {
        let loader = ConfigLoader {
            config_path: None,
            config: Config::default(),
        };
        assert!(matches!(
            loader.save(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_unescape_delimiter() {
        assert_eq!(unescape_delimiter("\\n"), "\n");
        assert_eq!(unescape_delimiter("\\r\\n"), "\r\n");
        assert_eq!(unescape_delimiter(";"), ";");
        assert_eq!(unescape_delimiter("\\\\"), "\\");
        assert_eq!(unescape_delimiter("\\x"), "\\x");
    }
}
