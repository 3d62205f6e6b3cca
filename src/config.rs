//! Configuration management for the decoder generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (decoders.toml)
//! - Environment variables (DECODERS_*)
//!
//! ## Example config file (decoders.toml):
//! ```toml
//! [generate]
//! pack = true
//! decoder_name = "ApiDecoder"
//! collision = "disambiguate"
//!
//! [generate.style]
//! tab_width = 4
//! single_quote = false
//!
//! [generate.validator]
//! draft = "draft7"
//! validate_formats = false
//!
//! [generate.naming]
//! acronyms = ["ID", "URL"]
//!
//! [paths]
//! input = "schema/definitions.json"
//! output = "src/generated"
//! ```

use std::path::{Path, PathBuf};

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codegen::config::GenerateOptions;
use crate::error::Result;

/// Config file name searched in the working directory
const CONFIG_FILE: &str = "decoders.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Default generation options; CLI flags override them
    #[serde(default)]
    pub generate: GenerateOptions,

    /// Default input and output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Default input and output locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl DecoderConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        let mut files = Vec::new();

        let config_locations = ["decoders.toml", ".decoders.toml", "config/decoders.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
            if Path::new(location).is_file() {
                files.push(PathBuf::from(location));
            }
        }

        if let Some(xdg_config) = Self::user_config_path() {
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config.clone()).required(false));
                files.push(xdg_config);
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
            let explicit = PathBuf::from(path);
            let explicit = if explicit.is_file() {
                explicit
            } else {
                explicit.with_extension("toml")
            };
            if explicit.is_file() {
                files.push(explicit);
            }
        }

        // DECODERS__GENERATE__PACK=false
        builder = builder.add_source(
            Environment::with_prefix("DECODERS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;

        // The layered loader lowercases keys; engine option names are case-sensitive
        let engine = Self::engine_tables(&files)?;
        if !engine.is_empty() {
            let current = &mut config.generate.validator.engine;
            current.retain(|key, _| !engine.keys().any(|name| name.to_lowercase() == *key));
            current.extend(engine);
        }

        Ok(config)
    }

    /// `[generate.validator.engine]` read verbatim from each file, later files winning
    fn engine_tables(files: &[PathBuf]) -> Result<Map<String, Value>> {
        let mut engine = Map::new();
        for file in files {
            let content = std::fs::read_to_string(file)?;
            let document: toml::Value =
                toml::from_str(&content).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
            let table = document
                .get("generate")
                .and_then(|g| g.get("validator"))
                .and_then(|v| v.get("engine"));
            if let Some(table) = table {
                if let Value::Object(options) = serde_json::to_value(table)? {
                    engine.extend(options);
                }
            }
        }
        Ok(engine)
    }

    /// Per-user config file in the XDG config directory
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "schema-decoders", "schema-decoders")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = self
            .to_toml()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::config::CollisionPolicy;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert!(config.generate.pack);
        assert!(config.paths.input.is_none());
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = DecoderConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[generate]"));
        assert!(toml_str.contains("[generate.style]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[generate]\npack = false\ncollision = \"disambiguate\"\n\n[generate.style]\ntab_width = 4\n",
        )
        .unwrap();

        let config = DecoderConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(!config.generate.pack);
        assert_eq!(config.generate.collision, CollisionPolicy::Disambiguate);
        assert_eq!(config.generate.style.tab_width, 4);
        assert!(config.generate.style.single_quote);
    }

    #[test]
    fn test_save_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = DecoderConfig::default();
        config.generate.decoder_name = Some("ApiDecoder".to_string());
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = DecoderConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.generate.decoder_name.as_deref(), Some("ApiDecoder"));
    }

    #[test]
    fn test_engine_option_names_keep_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "[generate.validator]\nvalidate_formats = false\n\n[generate.validator.engine]\nallErrors = true\nstrictTypes = \"log\"\n",
        )
        .unwrap();

        let config = DecoderConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(
            serde_json::Value::Object(config.generate.validator.engine.clone()),
            serde_json::json!({"allErrors": true, "strictTypes": "log"})
        );
        assert_eq!(
            config.generate.validator.engine_options(),
            serde_json::json!({"allErrors": true, "strictTypes": "log", "format": false})
        );
    }

    #[test]
    fn test_missing_explicit_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = DecoderConfig::load_from(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, crate::GenerateError::Config(_)));
    }
}
