use super::peptidoform::Peptidoform;
use serde::{
    Deserialize,
    Serialize,
};

/// One identification (or, before identifications are merged in, one
/// acquired spectrum) for a single scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideSpectrumMatch {
    pub scan: u32,
    pub sequence: Option<String>,
    pub modifications: Option<String>,
    pub charge: Option<u8>,
    /// Seconds
    pub retention_time: Option<f64>,
    pub q_value: Option<f64>,
    pub score: Option<f64>,
}

impl PeptideSpectrumMatch {
    pub fn new(scan: u32) -> Self {
        Self {
            scan,
            ..Default::default()
        }
    }

    /// A spectrum with only its acquisition time known.
    pub fn unidentified(scan: u32, retention_time: f64) -> Self {
        Self {
            scan,
            retention_time: Some(retention_time),
            ..Default::default()
        }
    }

    pub fn set_peptidoform(&mut self, peptidoform: Peptidoform) {
        self.sequence = Some(peptidoform.sequence);
        self.modifications = Some(peptidoform.modifications);
    }

    /// The `(sequence, modifications)` key, `None` for unidentified spectra.
    /// A missing modification string is read as unmodified.
    pub fn peptidoform(&self) -> Option<Peptidoform> {
        let sequence = self.sequence.as_ref()?;
        Some(Peptidoform {
            sequence: sequence.clone(),
            modifications: self.modifications.clone().unwrap_or_default(),
        })
    }
}
