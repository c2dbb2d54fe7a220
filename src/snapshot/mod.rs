use crate::error::{PersistError, SnapshotError};
use crate::store::StateStore;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};


/// State file used to carry the store across restarts.
///
/// Holds the store's serialized form verbatim. A `.gz` extension selects
/// gzip compression; anything else is plain JSON.
#[derive(Clone, Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_compressed(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gz")
            .unwrap_or(false)
    }

    /// Read the file contents, or `None` if no state file exists yet
    pub fn read(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut bytes = Vec::new();
        let result = if self.is_compressed() {
            GzDecoder::new(file).read_to_end(&mut bytes)
        } else {
            let mut file = file;
            file.read_to_end(&mut bytes)
        };

        result.map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(Some(bytes))
    }

    /// Load the state file into `store`.
    ///
    /// A missing file leaves the store empty and is not an error. A corrupt
    /// file is: starting with unknown state would republish every facility.
    /// Returns the number of facilities restored.
    pub fn restore(&self, store: &StateStore) -> Result<usize, SnapshotError> {
        let bytes = match self.read()? {
            Some(bytes) => bytes,
            None => {
                info!(path = %self.path.display(), "No state file, starting with empty state");
                return Ok(0);
            }
        };

        store.load(&bytes).map_err(|source| SnapshotError::Parse {
            path: self.path.clone(),
            source,
        })?;

        info!(
            path = %self.path.display(),
            facilities = store.len(),
            "Restored state from file"
        );
        Ok(store.len())
    }

    /// Replace the state file with `bytes`.
    ///
    /// Uses atomic write: writes to .tmp file, fsyncs, then renames.
    pub fn write(&self, bytes: &[u8]) -> Result<(), PersistError> {
        let tmp_path = self.path.with_extension("tmp");
        let io_err = |source: io::Error| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        {
            let tmp_file = File::create(&tmp_path).map_err(io_err)?;

            let file = if self.is_compressed() {
                let mut encoder = GzEncoder::new(tmp_file, Compression::default());
                encoder.write_all(bytes).map_err(io_err)?;
                encoder.finish().map_err(io_err)?
            } else {
                let mut file = tmp_file;
                file.write_all(bytes).map_err(io_err)?;
                file
            };

            file.sync_all().map_err(io_err)?;
        }

        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "State file written");
        Ok(())
    }

    /// Write on the blocking pool without waiting for the result.
    ///
    /// Failures are logged; the in-memory state stays authoritative and the
    /// next change-bearing cycle rewrites the whole file anyway.
    pub fn persist_in_background(&self, bytes: Vec<u8>) -> tokio::task::JoinHandle<()> {
        let file = self.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = file.write(&bytes) {
                error!(error = %e, "Failed to persist state");
            }
        })
    }
}
