use crate::errors::SpectrumMetadataError;
use mzdata::io::mgf::MGFReader;
use mzdata::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{
    debug,
    info,
};

/// Acquisition time of one spectrum, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRetentionTime {
    pub scan: u32,
    pub retention_time: f64,
}

/// First scan of a `SCANS=` value; ranges such as `100-102` use `100`.
fn parse_scans_value(value: &str) -> Option<u32> {
    value.split(['-', ',']).next()?.trim().parse().ok()
}

/// Scan number from a native id (`... scan=123`) or a TPP style title
/// (`run.123.123.2`).
fn scan_from_title(title: &str) -> Option<u32> {
    if let Some(pos) = title.find("scan=") {
        let digits: String = title[pos + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        return digits.parse().ok();
    }
    let mut fields = title.rsplit('.');
    let _charge = fields.next()?;
    let _end = fields.next()?;
    fields.next()?.parse().ok()
}

/// Reads the scan number and retention time of every spectrum in an MGF file.
///
/// The scan comes from `SCANS=` (first scan of a range) and falls back to the
/// spectrum title. mzdata keeps `RTINSECONDS=` as a start time in minutes.
pub fn read_mgf_retention_times<T: AsRef<Path>>(
    file: T,
) -> Result<Vec<SpectrumRetentionTime>, SpectrumMetadataError> {
    let path = file.as_ref();
    let handle = File::open(path).map_err(|source| SpectrumMetadataError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    info!("Reading spectrum metadata from {}", path.display());

    let reader = MGFReader::new(handle);
    let mut out = Vec::new();
    for (spectrum_index, spectrum) in reader.enumerate() {
        let description = spectrum.description();
        let missing = |field| SpectrumMetadataError::MissingField {
            field,
            spectrum: spectrum_index,
            path: path.to_path_buf(),
        };

        let scans_param = description
            .params()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("scans"));
        let scan = match scans_param {
            Some(param) => {
                let value = param.value.to_string();
                parse_scans_value(&value).ok_or_else(|| SpectrumMetadataError::InvalidValue {
                    field: "SCANS",
                    value,
                    spectrum: spectrum_index,
                    path: path.to_path_buf(),
                })?
            }
            None => scan_from_title(&description.id).ok_or_else(|| missing("SCANS"))?,
        };

        let retention_time = spectrum.start_time() * 60.0;
        if !retention_time.is_finite() || retention_time <= 0.0 {
            return Err(missing("RTINSECONDS"));
        }
        out.push(SpectrumRetentionTime {
            scan,
            // Undo the minutes round trip
            retention_time: (retention_time * 1e6).round() / 1e6,
        });
    }

    debug!("Read {} spectra from {}", out.len(), path.display());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_mgf(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_retention_times() {
        let file = write_mgf(
            "BEGIN IONS\n\
             TITLE=run_a.101.101.2\n\
             PEPMASS=500.25\n\
             CHARGE=2+\n\
             SCANS=101\n\
             RTINSECONDS=120.5\n\
             100.1 20\n\
             200.2 40\n\
             END IONS\n\
             \n\
             BEGIN IONS\n\
             TITLE=second\n\
             PEPMASS=611.3\n\
             RTINSECONDS=130\n\
             SCANS=102-104\n\
             100.1 20\n\
             END IONS\n",
        );
        let spectra = read_mgf_retention_times(file.path()).unwrap();
        assert_eq!(
            spectra,
            vec![
                SpectrumRetentionTime {
                    scan: 101,
                    retention_time: 120.5
                },
                SpectrumRetentionTime {
                    scan: 102,
                    retention_time: 130.0
                },
            ]
        );
    }

    #[test]
    fn test_fixture_retention_times() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data")
            .join("mgf")
            .join("run_a.mgf");
        let spectra = read_mgf_retention_times(path).unwrap();
        let scans: Vec<u32> = spectra.iter().map(|s| s.scan).collect();
        assert_eq!(scans, vec![101, 102, 103, 104, 105, 107]);
        assert_eq!(spectra[3].retention_time, 640.0);
    }

    #[test]
    fn test_scan_fallbacks() {
        assert_eq!(parse_scans_value("102-104"), Some(102));
        assert_eq!(parse_scans_value("7"), Some(7));
        assert_eq!(parse_scans_value("abc"), None);
        assert_eq!(scan_from_title("run_a.205.205.3"), Some(205));
        assert_eq!(
            scan_from_title("controllerType=0 controllerNumber=1 scan=42"),
            Some(42)
        );
        assert_eq!(scan_from_title("no scan here"), None);
    }

    #[test]
    fn test_missing_retention_time_is_an_error() {
        let file = write_mgf("BEGIN IONS\nTITLE=x\nPEPMASS=500.0\nSCANS=3\n100.0 5\nEND IONS\n");
        let res = read_mgf_retention_times(file.path());
        assert!(matches!(
            res,
            Err(SpectrumMetadataError::MissingField {
                field: "RTINSECONDS",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let res = read_mgf_retention_times("/nonexistent/run.mgf");
        assert!(matches!(res, Err(SpectrumMetadataError::Io { .. })));
    }
}
