//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SpaConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from a TOML file.
///
/// Validation is left to the caller so command line overrides can be
/// applied first.
pub fn load_config(path: &Path) -> Result<SpaConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SpaConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::LoadMode;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.idle_secs, 60);
        assert_eq!(config.timeouts.max_header_bytes, 1 << 20);
        assert_eq!(config.site.mode, LoadMode::Filesystem);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [site]
            web_root = "/srv/app"
            mode = "ngsw"

            [timeouts]
            write_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.site.web_root, std::path::PathBuf::from("/srv/app"));
        assert_eq!(config.site.mode, LoadMode::Ngsw);
        assert_eq!(config.timeouts.write_secs, 10);
        assert_eq!(config.timeouts.read_header_secs, 5);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = parse_config("[site]\nmode = \"s3\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
