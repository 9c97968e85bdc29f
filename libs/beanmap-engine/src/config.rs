use serde::Deserialize;

use beanmap_api::MapperError;

use crate::convention::ConventionOptions;

/// Mapper settings, parsed from TOML.
///
/// ```toml
/// [any_by_convention]
/// flattening = false
///
/// [converters]
/// numbers = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {
    /// Present: install a name-based any-by-convention fallback with these
    /// options.
    #[serde(default)]
    pub any_by_convention: Option<ConventionOptions>,

    #[serde(default)]
    pub converters: ConverterConfig,
}

/// Stock converter sets to register.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterConfig {
    #[serde(default)]
    pub numbers: bool,
}

impl MapperConfig {
    /// Load settings from a TOML file.
    pub fn load(path: &str) -> Result<Self, MapperError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MapperError::map_configuration(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self, MapperError> {
        toml::from_str(content).map_err(|e| MapperError::map_configuration(e.to_string()))
    }
}
