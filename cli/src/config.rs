//! Option layering: defaults, then the global file, then the user file, then
//! command-line flags.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const GLOBAL_CONFIG: &str = "/etc/rebl.toml";
pub const USER_CONFIG: &str = ".rebl.toml";

/// Fully resolved options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Accept the alternate syntax.
    pub terse: bool,
    /// Database used when a query names none.
    pub database: String,
    /// JSON document to seed the in-memory store with.
    pub data: Option<PathBuf>,
    pub colors: bool,
    pub json: bool,
    pub raw: bool,
    pub stream: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            terse: false,
            database: "test".to_string(),
            data: None,
            colors: true,
            json: false,
            raw: false,
            stream: false,
        }
    }
}

/// One layer of settings. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layer {
    pub terse: Option<bool>,
    pub database: Option<String>,
    pub data: Option<PathBuf>,
    pub colors: Option<bool>,
    pub json: Option<bool>,
    pub raw: Option<bool>,
    pub stream: Option<bool>,
}

impl Layer {
    fn apply(self, options: &mut Options) {
        if let Some(terse) = self.terse {
            options.terse = terse;
        }
        if let Some(database) = self.database {
            options.database = database;
        }
        if let Some(data) = self.data {
            options.data = Some(data);
        }
        if let Some(colors) = self.colors {
            options.colors = colors;
        }
        if let Some(json) = self.json {
            options.json = json;
        }
        if let Some(raw) = self.raw {
            options.raw = raw;
        }
        if let Some(stream) = self.stream {
            options.stream = stream;
        }
    }
}

/// Apply `layers` over the defaults, lowest priority first.
pub fn merge(layers: impl IntoIterator<Item = Layer>) -> Options {
    let mut options = Options::default();
    for layer in layers {
        layer.apply(&mut options);
    }
    options
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file {}", path.display())]
    #[diagnostic(code(rebl::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", path.display())]
    #[diagnostic(code(rebl::config::parse), help("options are: terse, database, data, colors, json, raw, stream"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Read one config file.
pub fn read_layer(path: &Path) -> Result<Layer, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_layer`], but a missing file is an empty layer.
fn read_optional_layer(path: &Path) -> Result<Layer, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file");
        return Ok(Layer::default());
    }
    read_layer(path)
}

/// The file layers to use: just `file` when given (and it must exist),
/// otherwise the global file followed by the user's.
pub fn file_layers(file: Option<&Path>) -> Result<Vec<Layer>, ConfigError> {
    match file {
        Some(file) => Ok(vec![read_layer(file)?]),
        None => {
            let mut layers = vec![read_optional_layer(Path::new(GLOBAL_CONFIG))?];
            if let Some(home) = dirs::home_dir() {
                layers.push(read_optional_layer(&home.join(USER_CONFIG))?);
            }
            Ok(layers)
        }
    }
}
