//! Directory-backed blob store.
//!
//! Stores one file per blob with a 2-level fan-out directory structure:
//! `{root}/blobs/{hex[0..2]}/{hex[2..4]}/{hex}`. Every accepted write appends
//! one journal line per blob to `{root}/journal.log`:
//!
//! ```text
//! <write sequence>\t<address hex>\t<escaped name>
//! ```
//!
//! The journal is what makes the write counter survive across processes.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cfd_crypto::ContentHasher;
use cfd_types::ContentAddress;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};
use crate::receipt::{WriteEvent, WriteReceipt};
use crate::traits::{validate_write, BackingStore};

const JOURNAL_FILE: &str = "journal.log";
const BLOB_DIR: &str = "blobs";

/// File-based backing store with 2-level fan-out directory layout.
///
/// Blob writes are atomic: data goes to a uniquely named temporary file in the
/// blob's directory and is then renamed into place, so a crash never leaves a
/// half-written blob visible to lookups. Writes through one handle are
/// serialized by an internal mutex; handles in other processes may write the
/// same root concurrently.
pub struct FileBackingStore {
    root: PathBuf,
    writes: Mutex<u64>,
}

impl FileBackingStore {
    /// Open (or create) a store rooted at the given directory.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(BLOB_DIR))?;
        let writes = read_journal_sequence(&root.join(JOURNAL_FILE))?;
        debug!(root = %root.display(), writes, "opened file backing store");
        Ok(Self {
            root,
            writes: Mutex::new(writes),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, address: &ContentAddress) -> PathBuf {
        let hex = address.to_hex();
        self.root
            .join(BLOB_DIR)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex)
    }

    fn put_blob(&self, address: &ContentAddress, data: &[u8]) -> StoreResult<bool> {
        let path = self.blob_path(address);
        if path.exists() {
            return Ok(false);
        }
        let parent = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(data)?;
        // Same bytes under the same name, so losing a race to another writer
        // only replaces the blob with itself.
        tmp.persist(&path).map_err(io::Error::from)?;
        Ok(true)
    }
}

impl BackingStore for FileBackingStore {
    fn write(&self, names: &[&str], contents: &[&[u8]]) -> StoreResult<WriteReceipt> {
        validate_write(names, contents)?;

        let mut writes = self.writes.lock().expect("lock poisoned");
        let sequence = *writes + 1;

        // A failure below returns before the journal append, so the write is
        // not charged. Blobs already put stay stored.
        let mut events = Vec::with_capacity(contents.len());
        for (name, data) in names.iter().zip(contents) {
            let address = ContentHasher::CHUNK.hash(data);
            let newly_stored = self.put_blob(&address, data)?;
            events.push(WriteEvent {
                name: (*name).to_string(),
                address,
                size: data.len() as u64,
                newly_stored,
            });
        }

        let mut journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(JOURNAL_FILE))?;
        let mut lines = String::new();
        for event in &events {
            lines.push_str(&format!(
                "{sequence}\t{}\t{}\n",
                event.address.to_hex(),
                event.name.escape_default()
            ));
        }
        journal.write_all(lines.as_bytes())?;
        journal.sync_data()?;

        *writes = sequence;
        debug!(sequence, blobs = events.len(), "file store write committed");
        Ok(WriteReceipt { sequence, events })
    }

    fn address_of(&self, blob: &[u8]) -> StoreResult<ContentAddress> {
        let address = ContentHasher::CHUNK.hash(blob);
        match fs::metadata(self.blob_path(&address)) {
            Ok(_) => Ok(address),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ContentAddress::null()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn read(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(address)) {
            Ok(data) => {
                // Verify-on-read: a blob that no longer hashes to its address
                // is corruption, never returned to the caller.
                let computed = ContentHasher::CHUNK.hash(&data);
                if computed != *address {
                    error!(expected = %address, actual = %computed, "blob corruption detected on read");
                    return Err(StoreError::HashMismatch {
                        address: *address,
                        computed,
                    });
                }
                Ok(Some(data))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write_count(&self) -> u64 {
        *self.writes.lock().expect("lock poisoned")
    }
}

impl std::fmt::Debug for FileBackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackingStore")
            .field("root", &self.root)
            .field("write_count", &self.write_count())
            .finish()
    }
}

/// Highest write sequence recorded in the journal, or 0 if there is none.
fn read_journal_sequence(path: &Path) -> StoreResult<u64> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StoreError::Io(e)),
    };

    let mut highest = 0;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let field = line.split('\t').next().unwrap_or_default();
        let sequence: u64 = field.parse().map_err(|_| StoreError::CorruptJournal {
            line: i + 1,
            reason: format!("bad write sequence {field:?}"),
        })?;
        highest = highest.max(sequence);
    }
    Ok(highest)
}
