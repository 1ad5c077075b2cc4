mod identifier;
mod peptidoform;
mod psm;

pub use identifier::{
    PsmIdentifier,
    SearchEngine,
    usi,
};
pub use peptidoform::{
    ParsedPeptidoform,
    Peptidoform,
    UnmappedModification,
};
pub use psm::PeptideSpectrumMatch;
