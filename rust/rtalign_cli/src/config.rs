use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};

use crate::cli::Cli;
use crate::errors::CliError;
use rtalign::CalibrationOptions;
use rtalign::calibration::DEFAULT_Q_VALUE_THRESHOLD;
use rtalign::collection::{
    DEFAULT_IDENTIFICATION_SUBDIR,
    DEFAULT_SPECTRUM_SUBDIR,
};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputConfig {
    pub root_dir: Option<PathBuf>,
    #[serde(default = "default_mgf_subdir")]
    pub mgf_subdir: String,
    #[serde(default = "default_pout_subdir")]
    pub pout_subdir: String,
    #[serde(default)]
    pub runs: RunSelection,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            mgf_subdir: default_mgf_subdir(),
            pout_subdir: default_pout_subdir(),
            runs: RunSelection::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum RunSelection {
    #[serde(rename = "glob")]
    Glob { pattern: String },
    #[serde(rename = "list")]
    List { names: Vec<String> },
}

impl Default for RunSelection {
    fn default() -> Self {
        Self::Glob {
            pattern: "*".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Defaults to the name of the root directory.
    pub collection_name: Option<String>,
    #[serde(default = "default_search_engine")]
    pub search_engine: String,
    #[serde(default = "default_q_value_threshold")]
    pub q_value_threshold: f64,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub modifications_file: Option<PathBuf>,
    #[serde(default)]
    pub plot: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            collection_name: None,
            search_engine: default_search_engine(),
            q_value_threshold: default_q_value_threshold(),
            top_n: None,
            modifications_file: None,
            plot: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Also write the flattened PSM table.
    #[serde(default)]
    pub dump_psms: bool,
    /// Adds a USI column to the PSM table.
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_mgf_subdir() -> String {
    DEFAULT_SPECTRUM_SUBDIR.to_string()
}

fn default_pout_subdir() -> String {
    DEFAULT_IDENTIFICATION_SUBDIR.to_string()
}

fn default_search_engine() -> String {
    "msgfplus".to_string()
}

fn default_q_value_threshold() -> f64 {
    DEFAULT_Q_VALUE_THRESHOLD
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
            source: e.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        })?;
        serde_json::from_str(&content).map_err(|e| CliError::ParseError { msg: e.to_string() })
    }

    /// Loads the config file (if any) and applies the command line overrides.
    pub fn with_cli_args(args: &Cli) -> Result<Self, CliError> {
        let mut config = match args.config.as_ref() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(root_dir) = args.root_dir.as_ref() {
            config.input.root_dir = Some(root_dir.clone());
        }
        if let Some(name) = args.name.as_ref() {
            config.analysis.collection_name = Some(name.clone());
        }
        if args.plot {
            config.analysis.plot = true;
        }
        if let Some(output_dir) = args.output_dir.as_ref() {
            match config.output.as_mut() {
                Some(output) => output.directory = output_dir.clone(),
                None => {
                    config.output = Some(OutputConfig {
                        directory: output_dir.clone(),
                        dump_psms: false,
                        project_id: None,
                    })
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.input.root_dir.is_none() {
            return Err(CliError::Config {
                source: "No root directory provided, please provide one in either the config file or with the --root-dir flag".to_string(),
            });
        }
        if self.output.is_none() {
            return Err(CliError::Config {
                source: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
            });
        }
        let q = self.analysis.q_value_threshold;
        if !(0.0..=1.0).contains(&q) {
            return Err(CliError::Config {
                source: format!("q_value_threshold must be within [0, 1], got {}", q),
            });
        }
        Ok(())
    }

    pub fn root_dir(&self) -> Result<&Path, CliError> {
        self.input.root_dir.as_deref().ok_or_else(|| CliError::Config {
            source: "No root directory provided".to_string(),
        })
    }

    pub fn output(&self) -> Result<&OutputConfig, CliError> {
        self.output.as_ref().ok_or_else(|| CliError::Config {
            source: "No output directory provided".to_string(),
        })
    }

    pub fn collection_name(&self) -> Result<String, CliError> {
        if let Some(name) = self.analysis.collection_name.as_ref() {
            return Ok(name.clone());
        }
        let root = self.root_dir()?;
        root.file_name()
            .map(|x| x.to_string_lossy().to_string())
            .ok_or_else(|| CliError::Config {
                source: format!(
                    "Unable to derive a collection name from {}, please set analysis.collection_name or --name",
                    root.display()
                ),
            })
    }

    pub fn calibration_options(&self) -> CalibrationOptions {
        CalibrationOptions {
            q_value_threshold: self.analysis.q_value_threshold,
            top_n: self.analysis.top_n,
        }
    }
}
