//! Directory-backed source
//!
//! Stores each key as a UTF-8 file inside a root directory. Asynchronous
//! reads run on a dedicated thread per key and are joined on demand.

#[cfg(feature = "prefetch")]
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(feature = "prefetch")]
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::cache::Source;

// == Public Constants ==
/// Longest file name most file systems accept
const MAX_FILE_NAME: usize = 255;

/// Temp files are named `.{key}.tmp`
const TEMP_NAME_OVERHEAD: usize = ".".len() + ".tmp".len();

/// Maximum allowed key length in bytes; the temp file name must still fit
pub const MAX_KEY_LENGTH: usize = MAX_FILE_NAME - TEMP_NAME_OVERHEAD;

// == Key Validation ==
/// Checks that `key` can be used as a file name inside the root directory.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    if key.starts_with('.') {
        return Some("Key cannot start with '.'".to_string());
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
    {
        return Some("Key may only contain [A-Za-z0-9_.-]".to_string());
    }
    None
}

// == File Source ==
/// A [`Source`] that keeps one file per key under `root`.
///
/// Reading a key with no file creates an empty one. Writes go to a temporary
/// file that is then renamed over the target.
#[derive(Debug)]
pub struct FileSource {
    root: PathBuf,
    #[cfg(feature = "prefetch")]
    pending: HashMap<String, JoinHandle<io::Result<String>>>,
}

impl FileSource {
    // == Constructor ==
    /// Opens `root` as a source, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            #[cfg(feature = "prefetch")]
            pending: HashMap::new(),
        })
    }

    /// Returns the directory holding the values.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        match validate_key(key) {
            Some(reason) => Err(io::Error::new(io::ErrorKind::InvalidInput, reason)),
            None => Ok(self.root.join(key)),
        }
    }
}

fn read_or_create(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::write(path, "")?;
            Ok(String::new())
        }
        Err(err) => Err(err),
    }
}

impl Source<String, String> for FileSource {
    type Error = io::Error;

    fn read(&mut self, key: &String) -> io::Result<String> {
        let path = self.path_for(key)?;
        read_or_create(&path)
    }

    fn write(&mut self, key: &String, value: &String) -> io::Result<()> {
        let path = self.path_for(key)?;
        // Keys never start with '.', so the temp name cannot collide with a value
        let tmp = self.root.join(format!(".{}.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    #[cfg(feature = "prefetch")]
    fn read_async(&mut self, key: &String) -> io::Result<()> {
        let path = self.path_for(key)?;
        let handle = thread::Builder::new()
            .name(format!("prefetch-{}", key))
            .spawn(move || read_or_create(&path))?;
        self.pending.insert(key.clone(), handle);
        Ok(())
    }

    #[cfg(feature = "prefetch")]
    fn wait_for_async_read(&mut self, key: &String) -> io::Result<String> {
        match self.pending.remove(key) {
            Some(handle) => handle
                .join()
                .map_err(|_| io::Error::other(format!("prefetch of {} panicked", key)))?,
            None => self.read(key),
        }
    }
}
