use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    TooFewFields {
        identifier: String,
        found: usize,
        expected: usize,
    },
    InvalidField {
        identifier: String,
        field: &'static str,
        value: String,
    },
}

impl Display for IdentifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewFields {
                identifier,
                found,
                expected,
            } => write!(
                f,
                "Identifier '{}' has {} underscore separated fields, expected at least {}",
                identifier, found, expected
            ),
            Self::InvalidField {
                identifier,
                field,
                value,
            } => write!(
                f,
                "Identifier '{}' has an invalid {} field: '{}'",
                identifier, field, value
            ),
        }
    }
}

#[derive(Debug)]
pub enum IdentificationReadingError {
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    Csv {
        source: csv::Error,
        path: PathBuf,
    },
    Identifier {
        source: IdentifierError,
        path: PathBuf,
        line: u64,
    },
}

#[derive(Debug)]
pub enum SpectrumMetadataError {
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    MissingField {
        field: &'static str,
        spectrum: usize,
        path: PathBuf,
    },
    InvalidValue {
        field: &'static str,
        value: String,
        spectrum: usize,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub enum ModificationConfigError {
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub enum RtAlignError {
    UnsupportedSearchEngine {
        name: String,
    },
    IdentificationReading(IdentificationReadingError),
    SpectrumMetadata(SpectrumMetadataError),
    ModificationConfig(ModificationConfigError),
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    InvalidRunPattern {
        pattern: String,
        msg: String,
    },
    EmptyRun {
        run: String,
    },
    UnknownRun {
        run: String,
    },
    Calibration(rtcal::CalibrationError),
}

impl Display for RtAlignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSearchEngine { name } => write!(
                f,
                "Unsupported search engine '{}' (supported: msgfplus)",
                name
            ),
            Self::EmptyRun { run } => write!(f, "Run '{}' has no PSMs", run),
            Self::UnknownRun { run } => write!(f, "Run '{}' is not part of the collection", run),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for RtAlignError {}

pub type Result<T> = std::result::Result<T, RtAlignError>;

impl From<IdentificationReadingError> for RtAlignError {
    fn from(x: IdentificationReadingError) -> Self {
        Self::IdentificationReading(x)
    }
}

impl From<SpectrumMetadataError> for RtAlignError {
    fn from(x: SpectrumMetadataError) -> Self {
        Self::SpectrumMetadata(x)
    }
}

impl From<ModificationConfigError> for RtAlignError {
    fn from(x: ModificationConfigError) -> Self {
        Self::ModificationConfig(x)
    }
}

impl From<rtcal::CalibrationError> for RtAlignError {
    fn from(x: rtcal::CalibrationError) -> Self {
        Self::Calibration(x)
    }
}

impl From<std::io::Error> for RtAlignError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}
