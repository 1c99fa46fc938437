use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncRead;

/// SHA-256 digest of a file's full byte content.
///
/// Only meaningful for equality comparison between two reads of the same
/// staged file; it is not an integrity guarantee towards the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub async fn of_reader<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let n = tokio::io::AsyncReadExt::read(&mut reader, &mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Hashes the current content of `path`. Fails if the file is missing or unreadable.
    pub async fn of_file(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Self::of_reader(file).await
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_of_bytes() {
        let hash = Fingerprint::of_bytes(b"hello world");
        // SHA-256 for "hello world"
        assert_eq!(
            hash.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_fingerprint_empty() {
        let hash = Fingerprint::of_bytes(b"");
        // SHA-256 for empty string
        assert_eq!(
            hash.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_fingerprint_of_reader_matches_bytes() {
        let data = b"hello world";
        let hash = Fingerprint::of_reader(&data[..]).await.unwrap();
        assert_eq!(hash, Fingerprint::of_bytes(data));
    }

    #[tokio::test]
    async fn test_fingerprint_tracks_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.txt");

        tokio::fs::write(&path, b"first").await.unwrap();
        let before = Fingerprint::of_file(&path).await.unwrap();
        assert_eq!(before, Fingerprint::of_file(&path).await.unwrap());

        tokio::fs::write(&path, b"second").await.unwrap();
        let after = Fingerprint::of_file(&path).await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Fingerprint::of_file(&dir.path().join("gone")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
