//! In-memory view of the names present at the destination root.

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use coalesce_core::{Error, Result};

/// What currently occupies a destination name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Where to read the occupant's content. For entries planned in a dry
    /// run this is the source path, since nothing was written.
    pub content: PathBuf,
    /// Whether the occupant is a directory.
    pub is_dir: bool,
    /// Whether the name was already taken when the run started.
    pub preexisting: bool,
}

/// Names at the destination root, loaded once and updated as the run claims
/// new ones.
#[derive(Debug)]
pub struct DestinationIndex {
    root: PathBuf,
    names: HashSet<OsString>,
    slots: HashMap<OsString, Slot>,
}

impl DestinationIndex {
    /// Snapshot the destination's immediate children. A destination that does
    /// not exist yet yields an empty index.
    pub fn load(root: &Path) -> Result<Self> {
        let mut index = Self::empty(root);
        if !root.exists() {
            return Ok(index);
        }

        let entries = fs::read_dir(root).map_err(|e| Error::io(root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(root, e))?;
            let path = entry.path();
            index.insert(
                entry.file_name(),
                Slot {
                    is_dir: path.is_dir(),
                    content: path,
                    preexisting: true,
                },
            );
        }
        Ok(index)
    }

    /// An index with no names.
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            names: HashSet::new(),
            slots: HashMap::new(),
        }
    }

    /// Full destination path for `name`.
    pub fn path_of(&self, name: &OsStr) -> PathBuf {
        self.root.join(name)
    }

    /// All taken names.
    pub fn names(&self) -> &HashSet<OsString> {
        &self.names
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.names.contains(name)
    }

    pub fn slot(&self, name: &OsStr) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Record that this run now occupies `name`.
    pub fn claim(&mut self, name: &OsStr, content: PathBuf, is_dir: bool) {
        self.insert(
            name.to_os_string(),
            Slot {
                content,
                is_dir,
                preexisting: false,
            },
        );
    }

    fn insert(&mut self, name: OsString, slot: Slot) {
        self.names.insert(name.clone());
        self.slots.insert(name, slot);
    }
}
