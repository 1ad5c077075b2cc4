use crate::modifications::ModificationMapping;
use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::LazyLock;

static MODIFICATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("Modification pattern is a valid regex"));

/// A peptide sequence plus the modifications on it.
///
/// `modifications` is a `|` joined list of `position|label` pairs, where the
/// position is a 0 based offset into `sequence`. An empty string means the
/// peptide is unmodified.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Peptidoform {
    pub sequence: String,
    pub modifications: String,
}

/// A modification key that had no entry in the label table.
/// The raw key is kept as the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedModification {
    pub key: String,
    pub annotated_sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPeptidoform {
    pub peptidoform: Peptidoform,
    pub unmapped: Vec<UnmappedModification>,
}

/// Drops flanking residues, `K.PEPTIDE.R` -> `PEPTIDE`.
///
/// Dots inside modification brackets (eg. `[+15.995]`) are not separators.
fn strip_flanking_residues(annotated: &str) -> &str {
    let mut depth = 0usize;
    let mut dots = Vec::with_capacity(2);
    for (i, c) in annotated.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                dots.push(i);
                if dots.len() == 2 {
                    break;
                }
            }
            _ => {}
        }
    }

    match dots.as_slice() {
        [] => annotated,
        [first] => &annotated[first + 1..],
        [first, second, ..] => &annotated[first + 1..*second],
    }
}

impl Peptidoform {
    pub fn new(sequence: impl Into<String>, modifications: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            modifications: modifications.into(),
        }
    }

    /// Parses percolator style annotated peptides, eg. `K.PEPT[UNIMOD:4]IDE.K`.
    ///
    /// Bracket tokens are removed left to right. The position of each token is
    /// its offset in the original string minus the length of all tokens
    /// already removed to its left, so it points into the stripped sequence.
    pub fn parse_annotated(
        annotated: &str,
        mapping: Option<&ModificationMapping>,
    ) -> ParsedPeptidoform {
        let core = strip_flanking_residues(annotated);
        let mut sequence = String::with_capacity(core.len());
        let mut modifications: Vec<String> = Vec::new();
        let mut unmapped = Vec::new();
        let mut removed = 0;
        let mut last_end = 0;

        for caps in MODIFICATION_PATTERN.captures_iter(core) {
            let Some(token) = caps.get(0) else {
                continue;
            };
            let key = caps.get(1).map_or("", |m| m.as_str());
            let position = token.start() - removed;
            removed += token.len();

            sequence.push_str(&core[last_end..token.start()]);
            last_end = token.end();

            let label = match mapping {
                Some(mapping) => match mapping.get(key) {
                    Some(label) => label,
                    None => {
                        unmapped.push(UnmappedModification {
                            key: key.to_string(),
                            annotated_sequence: annotated.to_string(),
                        });
                        key
                    }
                },
                None => key,
            };
            modifications.push(format!("{}|{}", position, label));
        }
        sequence.push_str(&core[last_end..]);

        ParsedPeptidoform {
            peptidoform: Peptidoform {
                sequence,
                modifications: modifications.join("|"),
            },
            unmapped,
        }
    }

    pub fn is_modified(&self) -> bool {
        !self.modifications.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbamidomethyl() -> ModificationMapping {
        [("UNIMOD:4", "Carbamidomethyl"), ("UNIMOD:35", "Oxidation")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_parse_with_mapping() {
        let mapping = carbamidomethyl();
        let parsed = Peptidoform::parse_annotated("K.PEPT[UNIMOD:4]IDE.K", Some(&mapping));
        assert_eq!(parsed.peptidoform.sequence, "PEPTIDE");
        assert_eq!(parsed.peptidoform.modifications, "4|Carbamidomethyl");
        assert!(parsed.unmapped.is_empty());
    }

    #[test]
    fn test_parse_without_mapping_keeps_raw_key() {
        let parsed = Peptidoform::parse_annotated("K.PEPT[UNIMOD:4]IDE.K", None);
        assert_eq!(parsed.peptidoform.modifications, "4|UNIMOD:4");
        assert!(parsed.unmapped.is_empty());
    }

    #[test]
    fn test_positions_account_for_removed_tokens() {
        let mapping = carbamidomethyl();
        let parsed = Peptidoform::parse_annotated(
            "R.M[UNIMOD:35]PEC[UNIMOD:4]TIDEM[UNIMOD:35]K.A",
            Some(&mapping),
        );
        assert_eq!(parsed.peptidoform.sequence, "MPECTIDEMK");
        // Each token sits right after its residue in the stripped sequence
        assert_eq!(
            parsed.peptidoform.modifications,
            "1|Oxidation|4|Carbamidomethyl|9|Oxidation"
        );
    }

    #[test]
    fn test_unmapped_key_is_reported_and_kept() {
        let mapping = carbamidomethyl();
        let parsed = Peptidoform::parse_annotated("K.S[UNIMOD:21]PEPC[UNIMOD:4]K.-", Some(&mapping));
        assert_eq!(parsed.peptidoform.modifications, "1|UNIMOD:21|5|Carbamidomethyl");
        assert_eq!(
            parsed.unmapped,
            vec![UnmappedModification {
                key: "UNIMOD:21".to_string(),
                annotated_sequence: "K.S[UNIMOD:21]PEPC[UNIMOD:4]K.-".to_string(),
            }]
        );
    }

    #[test]
    fn test_unmodified() {
        let parsed = Peptidoform::parse_annotated("-.PEPTIDEK.-", None);
        assert_eq!(parsed.peptidoform, Peptidoform::new("PEPTIDEK", ""));
        assert!(!parsed.peptidoform.is_modified());
    }

    #[test]
    fn test_no_flanking_residues() {
        let parsed = Peptidoform::parse_annotated("PEPT[UNIMOD:4]IDE", None);
        assert_eq!(parsed.peptidoform.sequence, "PEPTIDE");
    }

    #[test]
    fn test_dots_inside_brackets_are_not_flanks() {
        let parsed = Peptidoform::parse_annotated("K.PEPM[+15.995]IDE.K", None);
        assert_eq!(parsed.peptidoform.sequence, "PEPMIDE");
        assert_eq!(parsed.peptidoform.modifications, "4|+15.995");
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let mapping = carbamidomethyl();
        for annotated in [
            "K.PEPT[UNIMOD:4]IDE.K",
            "R.M[UNIMOD:35]PEC[UNIMOD:4]TIDEM[UNIMOD:35]K.A",
            "-.PEPTIDEK.-",
        ] {
            let first = Peptidoform::parse_annotated(annotated, Some(&mapping));
            let second = Peptidoform::parse_annotated(&first.peptidoform.sequence, Some(&mapping));
            assert_eq!(second.peptidoform.sequence, first.peptidoform.sequence);
            assert_eq!(second.peptidoform.modifications, "");
        }
    }
}
