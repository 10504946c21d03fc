//! Listing Discovery Scanner.
//!
//! Each scan re-enumerates the registry from scratch: list every key, decode
//! every value, join with asset metadata. Malformed or unreadable entries are
//! skipped, never fatal; only failing to enumerate the registry fails a scan.

use omni_core::{Address, AssetId, DecodeError, DecodeResult, ListingRecord, MicroAlgos};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RegistryResult;
use crate::source::{AssetInfo, DynAssetInfoSource, DynRegistrySource, LookupError};

/// Unit label used when asset metadata is unavailable.
pub const PLACEHOLDER_UNIT: &str = "ASA";

/// Display model of one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingView {
    pub asset_id: AssetId,
    pub seller: Address,
    pub price: MicroAlgos,
    pub creator: Address,
    pub royalty_bps: u64,
    pub asset_name: String,
    pub unit_name: String,
}

impl ListingView {
    fn new(record: ListingRecord, info: AssetInfo) -> Self {
        Self {
            asset_id: record.asset_id,
            seller: record.seller,
            price: record.price,
            creator: record.creator,
            royalty_bps: record.royalty_bps,
            asset_name: info.name,
            unit_name: info.unit_name,
        }
    }

    /// Price in whole units.
    pub fn price_algos(&self) -> Decimal {
        self.price.to_algos()
    }

    pub fn record(&self) -> ListingRecord {
        ListingRecord {
            asset_id: self.asset_id,
            seller: self.seller,
            price: self.price,
            creator: self.creator,
            royalty_bps: self.royalty_bps,
        }
    }
}

/// Placeholder metadata: `"Asset #<id>"` / `"ASA"`.
pub fn placeholder_info(asset_id: AssetId) -> AssetInfo {
    AssetInfo {
        name: format!("Asset #{asset_id}"),
        unit_name: PLACEHOLDER_UNIT.to_string(),
    }
}

/// Why an entry was left out of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Malformed(DecodeError),
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub key: Vec<u8>,
    pub reason: SkipReason,
}

/// Full result of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub listings: Vec<ListingView>,
    pub skipped: Vec<SkippedEntry>,
    /// Listings shown with placeholder metadata.
    pub placeholders: usize,
}

impl ScanReport {
    pub fn entries_seen(&self) -> usize {
        self.listings.len() + self.skipped.len()
    }

    pub fn malformed(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Malformed(_)))
            .count()
    }

    pub fn unreadable(&self) -> usize {
        self.skipped.len() - self.malformed()
    }
}

/// Scans the registry and joins entries with asset metadata.
#[derive(Clone)]
pub struct ListingScanner {
    registry: DynRegistrySource,
    assets: DynAssetInfoSource,
}

impl ListingScanner {
    pub fn new(registry: DynRegistrySource, assets: DynAssetInfoSource) -> Self {
        Self { registry, assets }
    }

    /// Current listings.
    pub async fn scan(&self) -> RegistryResult<Vec<ListingView>> {
        Ok(self.scan_report().await?.listings)
    }

    /// Current listings plus what was skipped and why.
    pub async fn scan_report(&self) -> RegistryResult<ScanReport> {
        let keys = self.registry.list_keys().await?;
        let mut report = ScanReport::default();

        for key in keys {
            let value = match self.registry.fetch_value(&key).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = ?key, error = %e, "Skipping unreadable registry entry");
                    report.skipped.push(SkippedEntry {
                        key,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            let record = match DecodeResult::from_entry(&key, &value) {
                DecodeResult::Valid(record) => record,
                DecodeResult::Skip(reason) => {
                    debug!(key = ?key, reason = %reason, "Skipping malformed registry entry");
                    report.skipped.push(SkippedEntry {
                        key,
                        reason: SkipReason::Malformed(reason),
                    });
                    continue;
                }
            };

            let (info, placeholder) = self.resolve_info(record.asset_id).await;
            if placeholder {
                report.placeholders += 1;
            }
            report.listings.push(ListingView::new(record, info));
        }

        info!(
            listings = report.listings.len(),
            skipped = report.skipped.len(),
            placeholders = report.placeholders,
            "Listing scan complete"
        );
        Ok(report)
    }

    async fn resolve_info(&self, asset_id: AssetId) -> (AssetInfo, bool) {
        match self.assets.get_asset_info(asset_id).await {
            Ok(info) if !info.name.is_empty() && !info.unit_name.is_empty() => (info, false),
            Ok(info) => {
                let fallback = placeholder_info(asset_id);
                let placeholder = info.name.is_empty() && info.unit_name.is_empty();
                let info = AssetInfo {
                    name: if info.name.is_empty() { fallback.name } else { info.name },
                    unit_name: if info.unit_name.is_empty() {
                        fallback.unit_name
                    } else {
                        info.unit_name
                    },
                };
                (info, placeholder)
            }
            Err(LookupError::NotFound(_)) => {
                debug!(asset_id = %asset_id, "Asset metadata not found, using placeholder");
                (placeholder_info(asset_id), true)
            }
            Err(e) => {
                warn!(
                    asset_id = %asset_id,
                    error = %e,
                    "Asset metadata lookup failed, using placeholder"
                );
                (placeholder_info(asset_id), true)
            }
        }
    }
}
