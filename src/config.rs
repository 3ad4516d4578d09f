use std::collections::BTreeMap;
use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::RetrieveError;
use crate::fs_util::DEFAULT_FILE_MODE;
use crate::schema::{ArtifactKind, SchemaTable};

pub const DEFAULT_CONFIG_FILE: &str = "basemount-retrieve.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    /// Artifact kind (`sample_sheet`, `run_info`, ...) to extra templates.
    #[serde(default)]
    pub extra_candidates: BTreeMap<String, Vec<String>>,
    /// Octal permission string, e.g. `"775"`.
    #[serde(default)]
    pub file_mode: Option<String>,
    #[serde(default)]
    pub rename: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub schema: SchemaTable,
    pub file_mode: u32,
    pub rename: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            schema: SchemaTable::builtin(),
            file_mode: DEFAULT_FILE_MODE,
            rename: false,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or the default file when present. Without either the
    /// built-in settings apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RetrieveError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| RetrieveError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RetrieveError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, RetrieveError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(RetrieveError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let mut schema = SchemaTable::builtin();
        for (kind, templates) in config.extra_candidates {
            let kind = kind.parse::<ArtifactKind>()?;
            schema.extend(kind, templates);
        }

        let file_mode = match config.file_mode {
            Some(mode) => parse_mode(&mode)?,
            None => DEFAULT_FILE_MODE,
        };

        Ok(ResolvedConfig {
            schema_version,
            schema,
            file_mode,
            rename: config.rename.unwrap_or(false),
        })
    }
}

fn parse_mode(value: &str) -> Result<u32, RetrieveError> {
    let digits = value.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| RetrieveError::ConfigParse(format!("invalid file_mode: {value}")))
}
