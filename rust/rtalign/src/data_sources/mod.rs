pub mod mgf;
pub mod percolator;

pub use mgf::{
    SpectrumRetentionTime,
    read_mgf_retention_times,
};
pub use percolator::{
    IdentificationFile,
    IdentificationRecord,
    read_percolator_file,
};
