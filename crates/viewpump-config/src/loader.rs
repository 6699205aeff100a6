//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Default configuration file location (`~/.viewpump/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".viewpump").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".viewpump/config.toml"))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR_PATTERN.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.viewpump`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::schema::AllowConfig;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.pump.interval_ms, 20);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [session]
            script_timeout_ms = 5000
            webextension = "/usr/lib/viewpump/ext"
            allow = "none"

            [pump]
            interval_ms = 10

            [display]
            index = 42
            [display.virtual_screen]
            width = 800
            height = 600

            [host]
            program = "viewpump-webkit-host"
            args = ["--headless"]
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.session.script_timeout_ms, 5000);
        assert_eq!(config.session.allow, AllowConfig::Keyword("none".to_string()));
        assert_eq!(config.pump.interval_ms, 10);
        assert_eq!(config.display.index, 42);
        assert_eq!(config.display.virtual_screen.unwrap().width, 800);
        assert_eq!(config.host.program.as_deref(), Some("viewpump-webkit-host"));
        assert_eq!(config.host.args, vec!["--headless".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[pump]").unwrap();
        writeln!(file, "interval_ms = 50").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.pump.interval_ms, 50);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(ref p)) if p.contains("nonexistent")));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.session.event_prefix, "viewpump");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test sets a unique test-only env var
        unsafe {
            std::env::set_var("VIEWPUMP_TEST_HOST", "/opt/host");
        }
        let content = "program = \"${VIEWPUMP_TEST_HOST}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("/opt/host"));
        unsafe {
            std::env::remove_var("VIEWPUMP_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_VIEWPUMP_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }

    #[test]
    fn test_default_path() {
        let path = ConfigLoader::default_path();
        assert!(path.ends_with(".viewpump/config.toml"));
    }
}
