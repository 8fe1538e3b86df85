use dramatis_engine::{QuotationMark, QuoteSystem, QuoteSystemError, QuoteType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read project file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse project file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// One quotation level as written in the project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLevel {
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub continuer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuoteConventions {
    pub levels: Vec<QuoteLevel>,
    #[serde(default)]
    pub dialogue_open: Option<String>,
    #[serde(default)]
    pub dialogue_close: Option<String>,
}

/// A dramatis project: which book to parse, where the character-verse control
/// file lives, and the translation's quotation conventions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub book_id: String,
    pub control_file: PathBuf,
    pub quotes: QuoteConventions,
}

impl ProjectConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: ProjectConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the control file path
        config.control_file =
            Self::expand_path(&config.control_file).unwrap_or(config.control_file);

        Ok(Some(config))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Build the validated engine quote system the project describes.
    pub fn quote_system(&self) -> Result<QuoteSystem, QuoteSystemError> {
        let levels = self
            .quotes
            .levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                QuotationMark::new(
                    &level.open,
                    &level.close,
                    &level.continuer,
                    i as u8 + 1,
                    QuoteType::Normal,
                )
            })
            .collect();
        match &self.quotes.dialogue_open {
            Some(open) => {
                QuoteSystem::with_dialogue(levels, open, self.quotes.dialogue_close.as_deref())
            }
            None => QuoteSystem::new(levels),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn sample_config() -> ProjectConfig {
        ProjectConfig {
            book_id: "MRK".to_string(),
            control_file: PathBuf::from("/tmp/character-verses.tsv"),
            quotes: QuoteConventions {
                levels: vec![
                    QuoteLevel {
                        open: "«".to_string(),
                        close: "»".to_string(),
                        continuer: "«".to_string(),
                    },
                    QuoteLevel {
                        open: "‹".to_string(),
                        close: "›".to_string(),
                        continuer: "«‹".to_string(),
                    },
                ],
                dialogue_open: Some("—".to_string()),
                dialogue_close: Some("—".to_string()),
            },
        }
    }

    #[test]
    fn test_serialization_roundtrip() {
        let original = sample_config();
        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: ProjectConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(original.book_id, deserialized.book_id);
        assert_eq!(original.control_file, deserialized.control_file);
        assert_eq!(original.quotes.levels.len(), deserialized.quotes.levels.len());
    }

    #[test]
    fn test_quote_system_from_config() {
        let system = sample_config().quote_system().unwrap();
        assert_eq!(system.defined_levels(), 2);
        assert_eq!(system.mark(1).open, "«");
        assert_eq!(system.mark(2).continuer, "«‹");
        assert_eq!(system.dialogue_open(), Some("—"));
    }

    #[test]
    fn test_invalid_quote_system_is_rejected() {
        let mut config = sample_config();
        config.quotes.levels.clear();
        assert!(config.quote_system().is_err());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent = temp_dir.path().join("nonexistent.toml");

        let result = ProjectConfig::load_from_path(&non_existent).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("project.toml");
        let config = sample_config();

        config.save_to_path(&config_file).unwrap();
        let loaded = ProjectConfig::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded.book_id, config.book_id);
        assert_eq!(loaded.quotes.dialogue_open.as_deref(), Some("—"));
    }

    #[test]
    fn test_control_file_path_expands_env_vars() {
        unsafe {
            env::set_var("DRAMATIS_DATA", "/custom/data");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("project.toml");
        let content = r#"
book_id = "MRK"
control_file = "$DRAMATIS_DATA/character-verses.tsv"

[quotes]
levels = [{ open = "«", close = "»", continuer = "«" }]
"#;
        std::fs::write(&config_file, content).unwrap();

        let loaded = ProjectConfig::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(
            loaded.control_file,
            PathBuf::from("/custom/data/character-verses.tsv")
        );

        unsafe {
            env::remove_var("DRAMATIS_DATA");
        }
    }

    #[test]
    fn test_dialogue_tokens_default_to_none() {
        let content = r#"
book_id = "GEN"
control_file = "/tmp/cv.tsv"

[quotes]
levels = [{ open = "“", close = "”" }]
"#;
        let config: ProjectConfig = toml::from_str(content).unwrap();
        assert!(config.quotes.dialogue_open.is_none());
        let system = config.quote_system().unwrap();
        assert!(!system.has_dialogue());
        assert_eq!(system.mark(1).continuer, "");
    }
}
