//! Macro storage - one text file per macro, named by number
//!
//! Files in the macro directory are named `0`, `1`, `2`, ... A new macro takes
//! the lowest number not already in use, so deleting a macro frees its number
//! for the next recording.

use crate::codec::{self, Strictness};
use crate::session::Macro;
use joymacro_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Whole-file storage backend
pub trait Storage {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;
    /// Replace the file at `path`; readers see either the old or the new content
    fn write_whole(&self, path: &Path, text: &str) -> Result<()>;
    /// Names of the regular files directly inside `dir`
    fn list(&self, dir: &Path) -> Result<Vec<String>>;
    fn remove(&self, path: &Path) -> Result<()>;
    fn create_dir(&self, dir: &Path) -> Result<()>;
}

/// Local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

fn io_err(path: &Path, e: std::io::Error) -> Error {
    Error::io(&path.display().to_string(), e)
}

impl Storage for FsStorage {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn write_whole(&self, path: &Path, text: &str) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::io(&path.display().to_string(), "not a file path"))?;
        let tmp = path.with_file_name(format!(".{}.tmp", name));
        fs::write(&tmp, text).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err(path, e)
        })
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let entry = entry.map_err(|e| io_err(dir, e))?;
            if !entry.file_type().map_err(|e| io_err(dir, e))?.is_file() {
                continue;
            }
            if let Some(s) = entry.file_name().to_str() {
                names.push(s.to_string());
            }
        }
        Ok(names)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| io_err(path, e))
    }

    fn create_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
    }
}

/// Numbered macro files in one directory
pub struct MacroLibrary<S: Storage = FsStorage> {
    storage: S,
    dir: PathBuf,
    strictness: Strictness,
}

impl MacroLibrary<FsStorage> {
    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(FsStorage, dir)
    }
}

impl<S: Storage> MacroLibrary<S> {
    pub fn new(storage: S, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        storage.create_dir(&dir)?;
        Ok(Self {
            storage,
            dir,
            strictness: Strictness::default(),
        })
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, number: u32) -> PathBuf {
        self.dir.join(number.to_string())
    }

    /// Stored macro numbers, ascending. Files not named by a plain number
    /// are ignored.
    pub fn list(&self) -> Result<Vec<u32>> {
        let mut numbers: Vec<u32> = self
            .storage
            .list(&self.dir)?
            .iter()
            .filter_map(|name| {
                name.parse::<u32>()
                    .ok()
                    .filter(|n| n.to_string() == *name)
            })
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Lowest number not yet taken
    pub fn next_number(&self) -> Result<u32> {
        let mut next = 0;
        for n in self.list()? {
            if n != next {
                break;
            }
            next += 1;
        }
        Ok(next)
    }

    /// Write `m` under the next free number and return that number
    pub fn save(&self, m: &Macro) -> Result<u32> {
        let number = self.next_number()?;
        let path = self.file_path(number);
        self.storage.write_whole(&path, &codec::encode_macro(m))?;
        info!(number, events = m.len(), path = %path.display(), "macro saved");
        Ok(number)
    }

    pub fn load(&self, number: u32) -> Result<Macro> {
        let path = self.file_path(number);
        let lines = self.storage.read_lines(&path)?;
        let decoded = codec::decode(&lines, self.strictness)?;
        if decoded.skipped > 0 {
            warn!(number, skipped = decoded.skipped, "macro loaded with malformed lines dropped");
        }
        Ok(decoded.into_macro())
    }

    pub fn delete(&self, number: u32) -> Result<()> {
        self.storage.remove(&self.file_path(number))
    }
}
