use std::fs::File;
use std::io;
use std::path::Path;

/// Content digest of a byte slice (hex-encoded BLAKE3).
#[must_use]
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Content digest of a file (hex-encoded BLAKE3), streamed from disk.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(File::open(path)?)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_WORLD: &str = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24";

    #[test]
    fn test_digest_bytes_known_value() {
        assert_eq!(digest_bytes(b"hello world"), HELLO_WORLD);
    }

    #[test]
    fn test_digest_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        assert_eq!(digest_file(file.path()).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_digest_differs_on_content_change() {
        assert_ne!(digest_bytes(b"{\"a\":1}"), digest_bytes(b"{\"a\":2}"));
    }

    #[test]
    fn test_digest_file_missing() {
        assert!(digest_file(Path::new("/nonexistent/popup.js")).is_err());
    }
}
