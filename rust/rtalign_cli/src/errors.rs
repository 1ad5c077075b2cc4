#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    Alignment {
        source: String,
    },
    Write {
        source: String,
        path: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error reading file {}: {}", path, source)
                } else {
                    write!(f, "Error reading file: {}", source)
                }
            }
            CliError::Alignment { source } => write!(f, "Error aligning runs: {}", source),
            CliError::Write { source, path } => {
                write!(f, "Error writing output {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<rtalign::RtAlignError> for CliError {
    fn from(e: rtalign::RtAlignError) -> Self {
        CliError::Alignment {
            source: e.to_string(),
        }
    }
}
