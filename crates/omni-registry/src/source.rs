//! Registry and asset-metadata source traits.
//!
//! The scanner reads through these seams so it can run against the node
//! client in production and against in-memory sources in tests.

use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::Arc;

use omni_core::AssetId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RegistryError, RegistryResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Descriptive metadata for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub unit_name: String,
}

/// Asset metadata lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Asset {0} not found")]
    NotFound(AssetId),

    #[error("Asset lookup unavailable: {0}")]
    Unavailable(String),
}

/// Contract-managed key-value registry of listings.
pub trait RegistrySource: Send + Sync {
    /// Every current entry key, raw bytes.
    fn list_keys(&self) -> BoxFuture<'_, RegistryResult<Vec<Vec<u8>>>>;

    /// Raw value stored under `key`.
    fn fetch_value<'a>(&'a self, key: &'a [u8]) -> BoxFuture<'a, RegistryResult<Vec<u8>>>;
}

/// External asset metadata lookup.
pub trait AssetInfoSource: Send + Sync {
    fn get_asset_info(&self, asset_id: AssetId) -> BoxFuture<'_, Result<AssetInfo, LookupError>>;
}

/// Arc wrappers for trait objects.
pub type DynRegistrySource = Arc<dyn RegistrySource>;
pub type DynAssetInfoSource = Arc<dyn AssetInfoSource>;

// =============================================================================
// In-memory sources
// =============================================================================

/// In-memory registry for tests and offline tooling.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Keys whose value fetch fails.
    unreadable: Mutex<Vec<Vec<u8>>>,
    /// Fail enumeration.
    offline: Mutex<bool>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Make fetching `key` fail while it stays enumerable.
    pub fn set_unreadable(&self, key: impl Into<Vec<u8>>) {
        self.unreadable.lock().push(key.into());
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }
}

impl RegistrySource for InMemoryRegistry {
    fn list_keys(&self) -> BoxFuture<'_, RegistryResult<Vec<Vec<u8>>>> {
        Box::pin(async move {
            if *self.offline.lock() {
                return Err(RegistryError::HttpClient("registry offline".to_string()));
            }
            Ok(self.entries.lock().keys().cloned().collect())
        })
    }

    fn fetch_value<'a>(&'a self, key: &'a [u8]) -> BoxFuture<'a, RegistryResult<Vec<u8>>> {
        Box::pin(async move {
            if self.unreadable.lock().iter().any(|k| k == key) {
                return Err(RegistryError::HttpClient("box read failed".to_string()));
            }
            self.entries
                .lock()
                .get(key)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound(format!("box {key:?}")))
        })
    }
}

/// In-memory asset metadata.
#[derive(Debug, Default)]
pub struct InMemoryAssetInfo {
    assets: Mutex<HashMap<AssetId, AssetInfo>>,
    unavailable: Mutex<bool>,
}

impl InMemoryAssetInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, asset_id: AssetId, name: &str, unit_name: &str) {
        self.assets.lock().insert(
            asset_id,
            AssetInfo {
                name: name.to_string(),
                unit_name: unit_name.to_string(),
            },
        );
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }
}

impl AssetInfoSource for InMemoryAssetInfo {
    fn get_asset_info(&self, asset_id: AssetId) -> BoxFuture<'_, Result<AssetInfo, LookupError>> {
        Box::pin(async move {
            if *self.unavailable.lock() {
                return Err(LookupError::Unavailable("lookup offline".to_string()));
            }
            self.assets
                .lock()
                .get(&asset_id)
                .cloned()
                .ok_or(LookupError::NotFound(asset_id))
        })
    }
}
