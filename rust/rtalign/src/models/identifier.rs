use crate::errors::{
    IdentifierError,
    RtAlignError,
};
use std::str::FromStr;

/// Search engines whose PSM identifier layout we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchEngine {
    /// MS-GF+ results rescored by percolator:
    /// `<run>_SII_<spectrum index>_<psm rank>_<scan>_<charge>_<rank>`
    #[default]
    MsgfPlus,
}

impl FromStr for SearchEngine {
    type Err = RtAlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msgfplus" => Ok(Self::MsgfPlus),
            _ => Err(RtAlignError::UnsupportedSearchEngine {
                name: s.to_string(),
            }),
        }
    }
}

impl SearchEngine {
    pub fn parse_identifier(&self, identifier: &str) -> Result<PsmIdentifier, IdentifierError> {
        match self {
            Self::MsgfPlus => PsmIdentifier::parse_msgfplus(identifier),
        }
    }
}

/// The pieces of a composite PSM identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsmIdentifier {
    pub run: String,
    pub scan: u32,
    pub charge: u8,
    pub rank: u32,
}

const MSGFPLUS_TRAILING_FIELDS: usize = 6;

fn parse_field<T: FromStr>(
    identifier: &str,
    field: &'static str,
    value: &str,
) -> Result<T, IdentifierError> {
    value.parse().map_err(|_| IdentifierError::InvalidField {
        identifier: identifier.to_string(),
        field,
        value: value.to_string(),
    })
}

impl PsmIdentifier {
    /// Parses the percolator `PSMId` written for MS-GF+ searches.
    ///
    /// The run name may itself contain underscores, so it is everything before
    /// the six fixed trailing fields.
    pub fn parse_msgfplus(identifier: &str) -> Result<Self, IdentifierError> {
        let fields: Vec<&str> = identifier.split('_').collect();
        let n = fields.len();
        if n <= MSGFPLUS_TRAILING_FIELDS {
            return Err(IdentifierError::TooFewFields {
                identifier: identifier.to_string(),
                found: n,
                expected: MSGFPLUS_TRAILING_FIELDS + 1,
            });
        }

        let run = fields[..n - MSGFPLUS_TRAILING_FIELDS].join("_");
        let scan = parse_field(identifier, "scan", fields[n - 3])?;
        let charge = parse_field(identifier, "charge", fields[n - 2])?;
        let rank = parse_field(identifier, "rank", fields[n - 1])?;

        Ok(Self {
            run,
            scan,
            charge,
            rank,
        })
    }

    pub fn to_usi(&self, project_id: &str) -> String {
        usi(project_id, &self.run, self.scan)
    }
}

/// Builds a HUPO-PSI Universal Spectrum Identifier for a scan.
pub fn usi(project_id: &str, run: &str, scan: u32) -> String {
    format!("mzspec:{}:{}:scan:{}", project_id, run, scan)
}
