//! Note storage.
//!
//! Paths are vault-relative and `/`-separated regardless of platform.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("note not found: {0}")]
    NotFound(NotePath),
    #[error("note already exists: {0}")]
    AlreadyExists(NotePath),
    #[error("vault refused to write {0}")]
    ReadOnly(NotePath),
    #[error("path leaves the vault: {0}")]
    InvalidPath(NotePath),
    #[error("vault I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Vault-relative path of a note.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotePath(String);

impl NotePath {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        Self(path.trim_matches('/').to_owned())
    }

    /// `{folder}/{name}`, or just `name` for the vault root.
    pub fn join(folder: &str, name: &str) -> Self {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{folder}/{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, extension included.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension.
    pub fn basename(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => Some(&name[dot + 1..]),
            _ => None,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("md"))
    }

    /// Containing folder; `None` at the vault root.
    pub fn parent(&self) -> Option<&str> {
        self.0.rfind('/').map(|slash| &self.0[..slash])
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NotePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for NotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Host file store the notes live in.
pub trait Vault {
    /// Whether a note or folder exists at `path`.
    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &NotePath) -> Result<String, VaultError>;

    /// Replaces the content of an existing note.
    fn modify(&self, path: &NotePath, content: &str) -> Result<(), VaultError>;

    /// Creates a new note. Fails with [`VaultError::AlreadyExists`] rather
    /// than overwriting.
    fn create(&self, path: &NotePath, content: &str) -> Result<(), VaultError>;

    /// Creates `path` and any missing parents. Existing folders are fine.
    fn create_folder(&self, path: &str) -> Result<(), VaultError>;
}

/// In-memory vault.
#[derive(Default)]
pub struct MemoryVault {
    files: RefCell<BTreeMap<NotePath, String>>,
    folders: RefCell<BTreeSet<String>>,
    writes: Cell<usize>,
    read_only: Cell<bool>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed for tests and demos.
    pub fn with_note(self, path: impl Into<NotePath>, content: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), content.into());
        self
    }

    /// Number of successful `modify` and `create` calls.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Makes every later write fail with [`VaultError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    pub fn paths(&self) -> Vec<NotePath> {
        self.files.borrow().keys().cloned().collect()
    }

    pub fn is_folder(&self, path: &str) -> bool {
        self.folders.borrow().contains(path.trim_matches('/'))
    }

    fn check_writable(&self, path: &NotePath) -> Result<(), VaultError> {
        if self.read_only.get() {
            return Err(VaultError::ReadOnly(path.clone()));
        }
        Ok(())
    }
}

impl Vault for MemoryVault {
    fn exists(&self, path: &str) -> bool {
        let path = NotePath::new(path);
        self.files.borrow().contains_key(&path) || self.is_folder(path.as_str())
    }

    fn read(&self, path: &NotePath) -> Result<String, VaultError> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(path.clone()))
    }

    fn modify(&self, path: &NotePath, content: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        let mut files = self.files.borrow_mut();
        let slot = files
            .get_mut(path)
            .ok_or_else(|| VaultError::NotFound(path.clone()))?;
        content.clone_into(slot);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn create(&self, path: &NotePath, content: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        if self.exists(path.as_str()) {
            return Err(VaultError::AlreadyExists(path.clone()));
        }
        self.files
            .borrow_mut()
            .insert(path.clone(), content.to_owned());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let path = NotePath::new(path);
        let mut folders = self.folders.borrow_mut();
        let mut current = String::new();
        for segment in path.as_str().split('/').filter(|segment| !segment.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            folders.insert(current.clone());
        }
        Ok(())
    }
}

/// Vault backed by a directory on disk.
#[derive(Clone, Debug)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a vault path under the root. Only plain segments are accepted,
    /// so `..`, `.` and drive prefixes cannot reach outside it.
    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let note = NotePath::new(path);
        let mut resolved = self.root.clone();
        for segment in note.as_str().split('/').filter(|segment| !segment.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                _ => return Err(VaultError::InvalidPath(note)),
            }
        }
        Ok(resolved)
    }

    fn io_error(path: PathBuf) -> impl FnOnce(io::Error) -> VaultError {
        move |source| VaultError::Io { path, source }
    }
}

impl Vault for FsVault {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|resolved| resolved.exists())
    }

    fn read(&self, path: &NotePath) -> Result<String, VaultError> {
        let resolved = self.resolve(path.as_str())?;
        fs::read_to_string(&resolved).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => VaultError::NotFound(path.clone()),
            _ => VaultError::Io {
                path: resolved,
                source,
            },
        })
    }

    fn modify(&self, path: &NotePath, content: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path.as_str())?;
        if !resolved.is_file() {
            return Err(VaultError::NotFound(path.clone()));
        }
        fs::write(&resolved, content).map_err(Self::io_error(resolved))
    }

    fn create(&self, path: &NotePath, content: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path.as_str())?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resolved)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.clone()),
                _ => VaultError::Io {
                    path: resolved.clone(),
                    source,
                },
            })?;
        file.write_all(content.as_bytes())
            .map_err(Self::io_error(resolved))
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        fs::create_dir_all(&resolved).map_err(Self::io_error(resolved))
    }
}
