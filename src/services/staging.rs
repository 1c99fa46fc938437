use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "s3edit-";
const RECOVERED_PREFIX: &str = "s3edit-recovered-";
const MAX_ATTEMPTS: usize = 8;

/// Hands out one fresh local file per session.
///
/// Names are `s3edit-<suffix>` with a random alphanumeric suffix drawn from
/// the area's own generator. Uniqueness is probabilistic; `create_new` turns
/// an actual collision into a retry instead of sharing a file.
pub struct StagingArea {
    dir: PathBuf,
    suffix_len: usize,
    rng: StdRng,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, suffix_len: usize) -> Self {
        Self::with_rng(dir, suffix_len, StdRng::from_entropy())
    }

    pub fn with_rng(dir: impl Into<PathBuf>, suffix_len: usize, rng: StdRng) -> Self {
        Self {
            dir: dir.into(),
            suffix_len: suffix_len.max(1),
            rng,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn random_suffix(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(self.suffix_len)
            .map(char::from)
            .collect()
    }

    /// Creates an empty staged file. Fails before any remote call is made if
    /// the staging directory is not writable.
    pub fn allocate(&mut self) -> io::Result<StagedFile> {
        let mut last_err = None;
        for _ in 0..MAX_ATTEMPTS {
            let suffix = self.random_suffix();
            let path = self.dir.join(format!("{}{}", FILE_PREFIX, suffix));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    tracing::debug!("Staged file allocated at {}", path.display());
                    return Ok(StagedFile {
                        path,
                        suffix,
                        armed: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::other("staging path collision")))
    }
}

/// A session-owned local file. Removed when consumed by [`StagedFile::remove`]
/// or [`StagedFile::preserve`], and as a last resort on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    suffix: String,
    armed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. A file that is already gone counts as removed.
    pub fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Moves the file to a recovery name next to it so the content outlives
    /// the session. The staged path no longer exists afterwards.
    ///
    /// On failure the file is handed back untouched.
    pub fn preserve(mut self, key: &str) -> Result<PathBuf, (StagedFile, io::Error)> {
        let dir = self.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let target = dir.join(format!(
            "{}{}-{}",
            RECOVERED_PREFIX,
            recovery_name(key),
            self.suffix
        ));
        match std::fs::rename(&self.path, &target) {
            Ok(()) => {
                self.armed = false;
                Ok(target)
            }
            Err(e) => Err((self, e)),
        }
    }

    /// Leaves the file on disk and returns its path.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Last path segment of `key`, restricted to characters safe in a file name.
fn recovery_name(key: &str) -> String {
    let base = key.rsplit('/').find(|s| !s.is_empty()).unwrap_or("object");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(dir: &Path) -> StagingArea {
        StagingArea::with_rng(dir, 10, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_allocate_creates_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(dir.path());

        let a = staging.allocate().unwrap();
        let b = staging.allocate().unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().exists());
        assert!(b.path().exists());
        assert_eq!(a.path().parent(), Some(dir.path()));
    }

    #[test]
    fn test_suffix_is_alphanumeric_with_fixed_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(dir.path());
        let staged = staging.allocate().unwrap();

        let name = staged.path().file_name().unwrap().to_str().unwrap();
        let suffix = name.strip_prefix(FILE_PREFIX).unwrap();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_collision_is_retried() {
        let dir = tempfile::tempdir().unwrap();

        // Same seed as the area below, so its first draw is already taken.
        let taken = area(dir.path()).allocate().unwrap().keep();

        let mut staging = area(dir.path());
        let staged = staging.allocate().unwrap();
        assert_ne!(staged.path(), taken.as_path());
        assert!(taken.exists());
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(&dir.path().join("does-not-exist"));
        assert!(staging.allocate().is_err());
    }

    #[test]
    fn test_remove_and_drop_delete_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(dir.path());

        let staged = staging.allocate().unwrap();
        let path = staged.path().to_path_buf();
        staged.remove().unwrap();
        assert!(!path.exists());

        let staged = staging.allocate().unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(dir.path());
        let staged = staging.allocate().unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        assert!(staged.remove().is_ok());
    }

    #[test]
    fn test_preserve_moves_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = area(dir.path());
        let staged = staging.allocate().unwrap();
        let staged_path = staged.path().to_path_buf();
        std::fs::write(&staged_path, b"edited").unwrap();

        let recovered = staged.preserve("reports/q1 report.txt").unwrap();

        assert!(!staged_path.exists());
        assert_eq!(std::fs::read(&recovered).unwrap(), b"edited");
        let name = recovered.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("s3edit-recovered-q1_report.txt-"));
    }

    #[test]
    fn test_recovery_name() {
        assert_eq!(recovery_name("a/b/c.txt"), "c.txt");
        assert_eq!(recovery_name("dir/"), "dir");
        assert_eq!(recovery_name(""), "object");
    }
}
