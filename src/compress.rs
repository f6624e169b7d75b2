//! On-demand gzip compression.
//!
//! Produces a gzip sibling of a file for upload, leaving the original
//! untouched. The sibling carries a recognizable suffix so leftovers from a
//! crashed run are obvious; in a normal run the orchestrator deletes it as
//! soon as the upload attempt finishes.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the original filename for the compressed sibling.
pub const COMPRESSED_SUFFIX: &str = ".sitedeploy.tmp.gz";

/// Gzip `path` into a sibling file and return the sibling's path.
///
/// Output is reproducible for identical input: fixed compression level, and
/// no mtime in the gzip header (flate2's default). The original file is only
/// ever read.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut compressed_path = path.as_os_str().to_os_string();
    compressed_path.push(COMPRESSED_SUFFIX);
    let compressed_path = PathBuf::from(compressed_path);

    debug!(
        source = %path.display(),
        target = %compressed_path.display(),
        "compressing"
    );

    let mut reader = BufReader::new(File::open(path)?);
    let writer = BufWriter::new(File::create(&compressed_path)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    Ok(compressed_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    const PAGE: &str = "<html><body><p>Some page content worth compressing.</p></body></html>";

    #[test]
    fn round_trips_to_original_bytes() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("webpage.html");
        fs::write(&source, PAGE).unwrap();

        let compressed = compress_file(&source).unwrap();

        let mut decoder = GzDecoder::new(File::open(&compressed).unwrap());
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, PAGE);
    }

    #[test]
    fn sibling_sits_next_to_original_with_suffix() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("webpage.html");
        fs::write(&source, PAGE).unwrap();

        let compressed = compress_file(&source).unwrap();
        assert_eq!(
            compressed,
            tmp.path().join(format!("webpage.html{COMPRESSED_SUFFIX}"))
        );
        assert!(compressed.exists());
    }

    #[test]
    fn original_file_left_intact() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("webpage.html");
        fs::write(&source, PAGE).unwrap();

        compress_file(&source).unwrap();
        assert_eq!(fs::read_to_string(&source).unwrap(), PAGE);
    }

    #[test]
    fn same_input_produces_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.html");
        let b = tmp.path().join("b.html");
        fs::write(&a, PAGE).unwrap();
        fs::write(&b, PAGE).unwrap();

        let ca = compress_file(&a).unwrap();
        let cb = compress_file(&b).unwrap();
        assert_eq!(fs::read(ca).unwrap(), fs::read(cb).unwrap());
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = compress_file(&tmp.path().join("missing.html"));
        assert!(result.is_err());
    }
}
