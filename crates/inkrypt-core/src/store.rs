//! Locally persisted collections.
//!
//! Mirrors a browser-scoped key-value store: every collection lives under one
//! key as a JSON array. Reads fail closed, a missing or unreadable collection
//! is an empty one. There is no locking and no atomicity between keys; two
//! writers racing on the same key resolve as last write wins.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::records::Address;

/// Key of the plain-string active wallet address.
pub const WALLET_ADDRESS_KEY: &str = "walletAddress";

/// The three collections the account page reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Posts,
    Drafts,
    OngoingInscriptions,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Posts,
        Collection::Drafts,
        Collection::OngoingInscriptions,
    ];

    /// Storage key of the collection.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Drafts => "drafts",
            Collection::OngoingInscriptions => "ongoingInscriptions",
        }
    }
}

/// String-valued key-value storage backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

fn check_quota(
    quota: Option<usize>,
    key: &str,
    value: &str,
    others: usize,
) -> Result<(), StoreError> {
    if let Some(quota) = quota {
        let needed = others + key.len() + value.len();
        if needed > quota {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                quota,
            });
        }
    }
    Ok(())
}

/// In-memory store, used by tests and as a scratch backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of keys plus values, in bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota: Some(quota),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let others: usize = self
            .entries
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota, key, value, others)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Directory-backed store holding one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, quota: None })
    }

    /// Limit the total size of the stored files, in bytes.
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn usage_excluding(&self, key: &str) -> Result<usize, StoreError> {
        let skip = self.path(key);
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem_len = path
                .file_stem()
                .map(|s| s.len())
                .unwrap_or_default();
            total += stem_len + entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.quota.is_some() {
            check_quota(self.quota, key, value, self.usage_excluding(key)?)?;
        }
        let target = self.path(key);
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Typed accessor over the persisted collections.
#[derive(Debug)]
pub struct LocalStore<S> {
    backend: S,
}

impl<S: KeyValueStore> LocalStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_inner(self) -> S {
        self.backend
    }

    /// Read a collection, failing closed.
    ///
    /// A missing key, unreadable backend or malformed value yields an empty
    /// sequence. Rows that do not parse as `T` are skipped.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let rows = match self.read_raw(collection) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("treating `{}` as empty: {err}", collection.key());
                return Vec::new();
            }
        };
        rows.into_iter()
            .enumerate()
            .filter_map(|(idx, row)| match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("skipping row {idx} of `{}`: {err}", collection.key());
                    None
                }
            })
            .collect()
    }

    /// Read a collection as raw JSON rows, surfacing malformed values.
    ///
    /// Read-modify-write paths use this so a collection that cannot be parsed
    /// is never replaced by a filtered copy of nothing.
    pub fn read_raw(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let key = collection.key();
        let Some(stored) = self.backend.get(key)? else {
            debug!("`{key}` not present");
            return Ok(Vec::new());
        };
        serde_json::from_str(&stored).map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })
    }

    /// Replace a collection with `rows`.
    pub fn write<T: Serialize>(&self, collection: Collection, rows: &[T]) -> Result<(), StoreError> {
        let key = collection.key();
        let encoded = serde_json::to_string(rows).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &encoded)?;
        debug!("wrote {} rows to `{key}`", rows.len());
        Ok(())
    }

    /// The stored active wallet address, if any.
    pub fn active_address(&self) -> Option<Address> {
        match self.backend.get(WALLET_ADDRESS_KEY) {
            Ok(value) => value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(Address::from),
            Err(err) => {
                warn!("unable to read `{WALLET_ADDRESS_KEY}`: {err}");
                None
            }
        }
    }

    pub fn set_active_address(&self, address: Option<&Address>) -> Result<(), StoreError> {
        match address {
            Some(address) => self.backend.set(WALLET_ADDRESS_KEY, address.as_str()),
            None => self.backend.remove(WALLET_ADDRESS_KEY),
        }
    }
}
