use crate::core::format::Format;
use crate::domain::ports::UnknownTagPolicy;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub store: StoreSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: String,
    /// Inferred from the file extension when absent.
    pub format: Option<Format>,
    #[serde(default)]
    pub unknown_tags: UnknownTagPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<String>, format: Option<Format>) -> Self {
        Self {
            store: StoreSection {
                path: path.into(),
                format,
                unknown_tags: UnknownTagPolicy::default(),
            },
            logging: LoggingSection::default(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| StoreError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.store.path)
    }

    /// The configured format, falling back to the file extension.
    pub fn format(&self) -> Result<Format> {
        if let Some(format) = self.store.format {
            return Ok(format);
        }
        Format::from_path(&self.path()).ok_or_else(|| StoreError::InvalidConfigValue {
            field: "store.format".to_string(),
            value: self.store.path.clone(),
            reason: "No format given and none could be inferred from the file extension"
                .to_string(),
        })
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<()> {
        validate_path("store.path", &self.store.path)?;
        self.format()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_config() {
        let toml_content = r#"
[store]
path = "data/products.xml"
format = "xml"
unknown_tags = "skip"

[logging]
verbose = true
"#;

        let config = StoreConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.path(), PathBuf::from("data/products.xml"));
        assert_eq!(config.format().unwrap(), Format::Xml);
        assert_eq!(config.store.unknown_tags, UnknownTagPolicy::Skip);
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_format_inferred_from_extension() {
        let config = StoreConfig::from_toml_str("[store]\npath = \"people.bin\"\n").unwrap();
        assert_eq!(config.format().unwrap(), Format::Binary);
        assert_eq!(config.store.unknown_tags, UnknownTagPolicy::Reject);
        assert!(config.validate().is_ok());

        let config = StoreConfig::from_toml_str("[store]\npath = \"people.csv\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FLATSTORE_TEST_DATA_DIR", "/tmp/flatstore");

        let config =
            StoreConfig::from_toml_str("[store]\npath = \"${FLATSTORE_TEST_DATA_DIR}/p.json\"\n")
                .unwrap();
        assert_eq!(config.store.path, "/tmp/flatstore/p.json");

        std::env::remove_var("FLATSTORE_TEST_DATA_DIR");
    }

    #[test]
    fn test_unset_variable_left_verbatim() {
        let config =
            StoreConfig::from_toml_str("[store]\npath = \"${FLATSTORE_SURELY_UNSET}/p.json\"\n")
                .unwrap();
        assert_eq!(config.store.path, "${FLATSTORE_SURELY_UNSET}/p.json");
    }

    #[test]
    fn test_empty_path_rejected() {
        let config = StoreConfig::from_toml_str("[store]\npath = \"\"\nformat = \"json\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[store]\npath = \"inventory.txt\"\n")
            .unwrap();

        let config = StoreConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.format().unwrap(), Format::Text);
    }
}
