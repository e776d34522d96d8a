use rich_undo_engine::{TagTable, UndoOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config lists unknown tag: {0}")]
    UnknownTag(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub undo: UndoSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoSettings {
    /// Group consecutive typing and deleting into one step per word
    pub coalesce: bool,
    /// Tags whose application and removal never show up in history
    pub non_undoable_tags: Vec<String>,
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            coalesce: true,
            non_undoable_tags: Vec::new(),
        }
    }
}

impl Config {
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

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
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

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/rich-undo");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn undo_options(&self) -> UndoOptions {
        UndoOptions {
            coalesce: self.undo.coalesce,
        }
    }

    /// Mark the configured tags as not undoable
    ///
    /// Every name is checked first, so an unknown tag leaves the table untouched.
    pub fn apply_to_tag_table(&self, table: &mut TagTable) -> Result<(), ConfigError> {
        if let Some(unknown) = self
            .undo
            .non_undoable_tags
            .iter()
            .find(|name| table.lookup(name).is_none())
        {
            return Err(ConfigError::UnknownTag(unknown.clone()));
        }
        for name in &self.undo.non_undoable_tags {
            table
                .set_undoable(name, false)
                .map_err(|_| ConfigError::UnknownTag(name.clone()))?;
        }
        Ok(())
    }
}
