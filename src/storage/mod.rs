// storage/mod.rs
//! The storage directory
//!
//! Uploads are written verbatim under generated names. There is no manifest; the directory
//! listing is the index.

pub mod naming;
pub mod profile;

use std::{
    io::{
        self,
        ErrorKind,
    },
    path::{
        Path,
        PathBuf,
    },
};

use thiserror::Error;
use tokio::{
    fs::{
        self,
        File,
        OpenOptions,
    },
    io::AsyncWriteExt,
};
use tracing::{
    debug,
    warn,
};

use naming::{
    extname,
    generate_filename,
    is_listed_audio,
    is_plain_filename,
};

/// Attempts at drawing an unused name before giving up
const NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("No unused filename after {0} attempts")]
    NamesExhausted(usize),
}

/// A file in the storage directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudio {
    pub filename:   String,
    pub size_bytes: u64,
}

impl StoredAudio {
    /// Extension carried over from the original upload, including the dot
    pub fn extension(&self) -> &str { extname(&self.filename) }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    /// Creates the storage directory and any missing parents
    pub async fn ensure(&self) -> io::Result<()> { fs::create_dir_all(&self.root).await }

    /// # Maps a requested filename onto the storage directory
    ///
    /// Returns `None` for anything that isn't a single visible path component, so requests can't
    /// escape the directory.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        is_plain_filename(filename).then(|| self.root.join(filename))
    }

    /// # Opens a new, uniquely named file for an upload
    ///
    /// The extension is taken from `original`. Files are created exclusively, so an existing file
    /// is never overwritten; a fresh name is drawn on collision.
    pub async fn create(&self, original: &str, limit: u64) -> Result<PendingFile, StorageError> {
        let ext = extname(original);

        for _ in 0..NAME_ATTEMPTS {
            let filename = generate_filename(ext);
            let path = self.root.join(&filename);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                | Ok(file) => {
                    debug!("Created {path:?} for upload '{original}'");
                    return Ok(PendingFile {
                        file,
                        path,
                        filename,
                        written: 0,
                        limit,
                        committed: false,
                    });
                },
                | Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("Generated name {filename} already exists, retrying");
                },
                | Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::NamesExhausted(NAME_ATTEMPTS))
    }

    /// # Lists stored audio files
    ///
    /// Only entries with a listed extension (mp3, wav) are returned, in directory enumeration
    /// order. Directories and entries that vanish mid-scan are skipped.
    pub async fn list_audio(&self) -> io::Result<Vec<StoredAudio>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                debug!("Skipping non-UTF-8 entry {:?}", entry.path());
                continue;
            };

            if !is_listed_audio(&filename) {
                continue;
            }

            let meta = match entry.metadata().await {
                | Ok(m) => m,
                | Err(e) => {
                    debug!("Skipping {filename}: {e}");
                    continue;
                },
            };

            if meta.is_dir() {
                continue;
            }

            files.push(StoredAudio {
                filename,
                size_bytes: meta.len(),
            });
        }

        Ok(files)
    }

    /// Removes a stored file
    pub async fn remove(&self, filename: &str) -> io::Result<()> {
        match self.resolve(filename) {
            | Some(path) => fs::remove_file(path).await,
            | None => Err(ErrorKind::InvalidInput.into()),
        }
    }
}

/// # An upload being written to the storage directory
///
/// The file is deleted when this is dropped without [`PendingFile::commit`], so rejected, failed,
/// or abandoned uploads never leave partial files behind.
#[derive(Debug)]
pub struct PendingFile {
    file:      File,
    path:      PathBuf,
    filename:  String,
    written:   u64,
    limit:     u64,
    committed: bool,
}

impl PendingFile {
    pub fn filename(&self) -> &str { &self.filename }

    /// Appends a chunk, failing once the running total passes the limit
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let total = self.written + chunk.len() as u64;
        if total > self.limit {
            return Err(StorageError::TooLarge { limit: self.limit });
        }

        self.file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    /// Flushes the file and keeps it
    pub async fn commit(mut self) -> Result<StoredAudio, StorageError> {
        self.file.flush().await?;
        self.committed = true;

        Ok(StoredAudio {
            filename:   std::mem::take(&mut self.filename),
            size_bytes: self.written,
        })
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        // Drop can't await; a single blocking unlink is acceptable here
        match std::fs::remove_file(&self.path) {
            | Ok(()) => debug!("Discarded partial upload {:?}", self.path),
            | Err(e) => warn!("Failed to discard partial upload {:?}: {e}", self.path),
        }
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn ensure_creates_nested_directories() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path().join("a/b/uploads"));

        storage.ensure().await.unwrap();
        assert!(storage.root().is_dir());

        // Idempotent
        storage.ensure().await.unwrap();
    }

    #[tokio::test]
    async fn committed_upload_persists() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path());

        let mut pending = storage.create("Track.MP3", 1024).await.unwrap();
        pending.write(b"hello ").await.unwrap();
        pending.write(b"world").await.unwrap();
        let stored = pending.commit().await.unwrap();

        assert!(stored.filename.ends_with(".MP3"));
        assert_eq!(stored.extension(), ".MP3");
        assert_eq!(stored.size_bytes, 11);

        let bytes = std::fs::read(tmp.path().join(&stored.filename)).unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn oversized_upload_leaves_nothing() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path());

        let mut pending = storage.create("big.wav", 4).await.unwrap();
        pending.write(b"abcd").await.unwrap();
        let err = pending.write(b"e").await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { limit: 4 }));
        drop(pending);

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dropped_upload_is_discarded() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path());

        let mut pending = storage.create("a.mp3", 1024).await.unwrap();
        pending.write(b"partial").await.unwrap();
        let path = tmp.path().join(pending.filename());
        assert!(path.exists());

        drop(pending);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn listing_filters_extensions() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path());

        for name in ["1-1.mp3", "1-2.WAV", "1-3.m4a", "notes.txt"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(tmp.path().join("folder.mp3")).unwrap();

        let mut names = storage
            .list_audio()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect::<Vec<_>>();
        names.sort();

        assert_eq!(names, vec!["1-1.mp3", "1-2.WAV"]);
    }

    #[tokio::test]
    async fn listing_missing_directory_errors() {
        let tmp = tempdir().unwrap();
        let storage = Storage::new(tmp.path().join("gone"));

        assert!(storage.list_audio().await.is_err());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let storage = Storage::new("/srv/uploads");

        assert_eq!(
            storage.resolve("1-2.mp3"),
            Some(PathBuf::from("/srv/uploads/1-2.mp3"))
        );
        assert_eq!(storage.resolve("../etc/passwd"), None);
        assert_eq!(storage.resolve(".."), None);
    }
}
