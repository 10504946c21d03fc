//! Transaction Group Composer.
//!
//! Builds one [`OperationGroup`] per marketplace action, every member tagged
//! with the credential context that must sign it. Composition is purely
//! local: it validates caller input, never touches the network, and never
//! signs. The network remains the final authority on listing state.

use omni_core::{
    AppId, Address, AssetId, ListingRecord, MicroAlgos, SignedCredentialContext, MAX_ROYALTY_BPS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::abi::{Method, MethodCallBuilder};
use crate::error::{CompositionError, CompositionResult};
use crate::group::{GroupMember, MarketAction, MemberRole, OperationGroup};
use crate::params::SuggestedParams;
use crate::transaction::{AssetParams, BoxReference, Transaction, TxType};

/// Default number of rounds a composed group stays valid.
pub const DEFAULT_VALIDITY_WINDOW: u64 = 1000;

/// Maximum note size accepted by the network.
pub const MAX_NOTE_LEN: usize = 1024;

/// Maximum asset name length (bytes).
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// Maximum asset unit name length (bytes).
pub const MAX_UNIT_NAME_LEN: usize = 8;

/// Maximum asset URL length (bytes).
pub const MAX_ASSET_URL_LEN: usize = 96;

// =============================================================================
// Storage cost
// =============================================================================

fn default_box_flat() -> u64 {
    2_500
}

fn default_box_per_byte() -> u64 {
    400
}

fn default_key_bytes() -> u64 {
    8
}

fn default_value_bytes() -> u64 {
    80
}

fn default_asset_opt_in() -> u64 {
    100_000
}

/// Custody storage cost charged for a new listing.
///
/// The composer pays `box_flat + box_per_byte * (key_bytes + value_bytes) +
/// asset_opt_in` with every list action. Values are taken from the contract's
/// published fee schedule and may be overridden from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCostSchedule {
    #[serde(default = "default_box_flat")]
    pub box_flat: u64,
    #[serde(default = "default_box_per_byte")]
    pub box_per_byte: u64,
    #[serde(default = "default_key_bytes")]
    pub key_bytes: u64,
    #[serde(default = "default_value_bytes")]
    pub value_bytes: u64,
    #[serde(default = "default_asset_opt_in")]
    pub asset_opt_in: u64,
}

impl Default for StorageCostSchedule {
    fn default() -> Self {
        Self {
            box_flat: default_box_flat(),
            box_per_byte: default_box_per_byte(),
            key_bytes: default_key_bytes(),
            value_bytes: default_value_bytes(),
            asset_opt_in: default_asset_opt_in(),
        }
    }
}

impl StorageCostSchedule {
    /// Total payment attached to a list action.
    pub fn listing_cost(&self) -> CompositionResult<MicroAlgos> {
        self.key_bytes
            .checked_add(self.value_bytes)
            .and_then(|bytes| bytes.checked_mul(self.box_per_byte))
            .and_then(|v| v.checked_add(self.box_flat))
            .and_then(|v| v.checked_add(self.asset_opt_in))
            .map(MicroAlgos::new)
            .ok_or_else(|| CompositionError::InvalidAmount("storage cost overflows".to_string()))
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Best-effort local knowledge of a listing at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    /// Read from the registry.
    Known(ListingRecord),
    /// Registry was read and holds no entry for the asset.
    Absent,
    /// Registry state was not available.
    Unknown,
}

impl ListingState {
    pub fn record(&self) -> Option<&ListingRecord> {
        match self {
            Self::Known(record) => Some(record),
            Self::Absent | Self::Unknown => None,
        }
    }
}

/// Arguments of a list action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub asset_id: AssetId,
    pub price: MicroAlgos,
    pub creator: Address,
    pub royalty_bps: u64,
}

/// Optional extras for a buy action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuyOptions {
    /// Prepend a zero-amount self transfer so the buyer can receive the asset.
    pub opt_in: bool,
}

/// New asset to create, described with an ARC-69 metadata note.
#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub name: String,
    pub unit_name: String,
    /// Content location, e.g. `ipfs://<cid>`.
    pub url: String,
    pub total: u64,
    pub decimals: u64,
    /// ARC-69 metadata, serialized into the note.
    pub metadata: serde_json::Value,
}

impl MintRequest {
    /// Note bytes: the metadata with `"standard": "arc69"` filled in.
    pub fn note(&self) -> CompositionResult<Vec<u8>> {
        let mut metadata = match &self.metadata {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            _ => {
                return Err(CompositionError::InvalidAssetParams(
                    "metadata must be a JSON object".to_string(),
                ))
            }
        };
        metadata
            .entry("standard")
            .or_insert_with(|| serde_json::Value::String("arc69".to_string()));
        serde_json::to_vec(&metadata)
            .map_err(|e| CompositionError::InvalidAssetParams(e.to_string()))
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Builds operation groups against one marketplace application.
#[derive(Debug, Clone)]
pub struct Composer {
    app_id: AppId,
    custody: Address,
    storage: StorageCostSchedule,
    validity_window: u64,
}

impl Composer {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            custody: app_id.address(),
            storage: StorageCostSchedule::default(),
            validity_window: DEFAULT_VALIDITY_WINDOW,
        }
    }

    pub fn with_storage_cost(mut self, storage: StorageCostSchedule) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_validity_window(mut self, rounds: u64) -> Self {
        self.validity_window = rounds.max(1);
        self
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Contract-controlled escrow account.
    pub fn custody_address(&self) -> Address {
        self.custody
    }

    pub fn storage_cost(&self) -> &StorageCostSchedule {
        &self.storage
    }

    /// List: `[axfer asset -> custody, pay storage -> custody, list_asset]`.
    pub fn compose_list(
        &self,
        seller: SignedCredentialContext,
        request: ListRequest,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        if request.price.is_zero() {
            return Err(CompositionError::InvalidPrice);
        }
        if request.royalty_bps > MAX_ROYALTY_BPS {
            return Err(CompositionError::InvalidRoyalty {
                bps: request.royalty_bps,
            });
        }
        let storage_payment = self.storage.listing_cost()?;

        let transfer = Transaction {
            asset_amount: 1,
            asset_receiver: Some(self.custody),
            xfer_asset: request.asset_id.index(),
            tx_type: TxType::AssetTransfer,
            ..self.base(seller.address, params, 0)
        };
        let payment = Transaction {
            amount: storage_payment.get(),
            receiver: Some(self.custody),
            tx_type: TxType::Payment,
            ..self.base(seller.address, params, 0)
        };
        let (app_args, foreign_assets, accounts) =
            MethodCallBuilder::new(Method::ListAsset, seller.address)
                .asset(request.asset_id)
                .uint64(request.price.get())
                .account(request.creator)
                .uint64(request.royalty_bps)
                .finish();
        let call = self.method_call(
            Method::ListAsset,
            seller.address,
            request.asset_id,
            params,
            app_args,
            foreign_assets,
            accounts,
        );

        let members = vec![
            GroupMember::new(transfer, seller, MemberRole::AssetTransfer),
            GroupMember::new(payment, seller, MemberRole::StoragePayment),
            GroupMember::new(
                call,
                seller,
                MemberRole::MethodCall {
                    method: Method::ListAsset,
                    references: vec![0, 1],
                },
            ),
        ];
        self.finish(
            MarketAction::List {
                asset_id: request.asset_id,
                price: request.price,
            },
            members,
        )
    }

    /// Buy: `[opt-in?, pay price -> custody, buy_asset]`.
    pub fn compose_buy(
        &self,
        buyer: SignedCredentialContext,
        asset_id: AssetId,
        price: MicroAlgos,
        listing: ListingState,
        options: BuyOptions,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        if price.is_zero() {
            return Err(CompositionError::InvalidPrice);
        }
        ensure_listed(asset_id, &listing)?;
        if let Some(record) = listing.record() {
            if record.price != price {
                warn!(
                    asset_id = %asset_id,
                    listed = %record.price,
                    offered = %price,
                    "Buy price differs from listed price"
                );
            }
        }

        let mut members = Vec::with_capacity(3);
        if options.opt_in {
            members.push(GroupMember::new(
                self.opt_in_txn(buyer.address, asset_id, params),
                buyer,
                MemberRole::OptIn,
            ));
        }

        let payment = Transaction {
            amount: price.get(),
            receiver: Some(self.custody),
            tx_type: TxType::Payment,
            ..self.base(buyer.address, params, 0)
        };
        let payment_index = members.len();
        members.push(GroupMember::new(payment, buyer, MemberRole::Payment));

        let mut builder = MethodCallBuilder::new(Method::BuyAsset, buyer.address).asset(asset_id);
        match listing.record() {
            Some(record) => {
                builder = builder
                    .reference_account(record.seller)
                    .reference_account(record.creator);
            }
            None => warn!(
                asset_id = %asset_id,
                "Listing state unknown, seller and creator are not referenced and payouts will fail"
            ),
        }
        let (app_args, foreign_assets, accounts) = builder.finish();
        let call = self.method_call(
            Method::BuyAsset,
            buyer.address,
            asset_id,
            params,
            app_args,
            foreign_assets,
            accounts,
        );
        members.push(GroupMember::new(
            call,
            buyer,
            MemberRole::MethodCall {
                method: Method::BuyAsset,
                references: vec![payment_index],
            },
        ));

        self.finish(MarketAction::Buy { asset_id, price }, members)
    }

    /// Cancel: `[cancel_listing]`.
    ///
    /// A sender other than the known seller is logged but still composed;
    /// the contract enforces seller authority.
    pub fn compose_cancel(
        &self,
        sender: SignedCredentialContext,
        asset_id: AssetId,
        listing: ListingState,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        ensure_listed(asset_id, &listing)?;
        if let Some(record) = listing.record() {
            if record.seller != sender.address {
                warn!(
                    asset_id = %asset_id,
                    seller = %record.seller,
                    sender = %sender.address,
                    "Cancel requested by an address other than the listed seller"
                );
            }
        }

        let (app_args, foreign_assets, accounts) =
            MethodCallBuilder::new(Method::CancelListing, sender.address)
                .asset(asset_id)
                .finish();
        let call = self.method_call(
            Method::CancelListing,
            sender.address,
            asset_id,
            params,
            app_args,
            foreign_assets,
            accounts,
        );
        let members = vec![GroupMember::new(
            call,
            sender,
            MemberRole::MethodCall {
                method: Method::CancelListing,
                references: Vec::new(),
            },
        )];
        self.finish(MarketAction::Cancel { asset_id }, members)
    }

    /// Opt-in: a single zero-amount self transfer.
    pub fn compose_opt_in(
        &self,
        account: SignedCredentialContext,
        asset_id: AssetId,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        let members = vec![GroupMember::new(
            self.opt_in_txn(account.address, asset_id, params),
            account,
            MemberRole::OptIn,
        )];
        self.finish(MarketAction::OptIn { asset_id }, members)
    }

    /// Mint: a single asset creation carrying an ARC-69 note.
    ///
    /// Manager, reserve, freeze and clawback are all the creator.
    pub fn compose_mint(
        &self,
        creator: SignedCredentialContext,
        request: &MintRequest,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        validate_mint(request)?;
        let note = request.note()?;
        if note.len() > MAX_NOTE_LEN {
            return Err(CompositionError::NoteTooLarge {
                len: note.len(),
                max: MAX_NOTE_LEN,
            });
        }

        let asset_params = AssetParams {
            name: request.name.clone(),
            url: request.url.clone(),
            clawback: Some(creator.address),
            decimals: request.decimals,
            default_frozen: false,
            freeze: Some(creator.address),
            manager: Some(creator.address),
            reserve: Some(creator.address),
            total: request.total,
            unit_name: request.unit_name.clone(),
        };
        let create = Transaction {
            asset_params: Some(asset_params),
            note,
            tx_type: TxType::AssetConfig,
            ..self.base(creator.address, params, 0)
        };
        let members = vec![GroupMember::new(create, creator, MemberRole::AssetCreate)];
        self.finish(MarketAction::Mint, members)
    }

    /// Admin withdrawal of accumulated platform fees.
    pub fn compose_withdraw(
        &self,
        admin: SignedCredentialContext,
        amount: MicroAlgos,
        params: &SuggestedParams,
    ) -> CompositionResult<OperationGroup> {
        if amount.is_zero() {
            return Err(CompositionError::InvalidAmount(
                "withdrawal amount must be positive".to_string(),
            ));
        }
        let (app_args, foreign_assets, accounts) =
            MethodCallBuilder::new(Method::AdminWithdraw, admin.address)
                .uint64(amount.get())
                .finish();
        let call = Transaction {
            app_args,
            foreign_assets,
            accounts,
            app_id: self.app_id.index(),
            tx_type: TxType::AppCall,
            ..self.base(
                admin.address,
                params,
                Method::AdminWithdraw.inner_txn_budget(),
            )
        };
        let members = vec![GroupMember::new(
            call,
            admin,
            MemberRole::MethodCall {
                method: Method::AdminWithdraw,
                references: Vec::new(),
            },
        )];
        self.finish(MarketAction::Withdraw { amount }, members)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn base(&self, sender: Address, params: &SuggestedParams, inner: u64) -> Transaction {
        Transaction {
            fee: params.pooled_fee(inner),
            first_valid: params.last_round,
            last_valid: params.last_round.saturating_add(self.validity_window),
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            sender,
            ..Default::default()
        }
    }

    fn opt_in_txn(
        &self,
        account: Address,
        asset_id: AssetId,
        params: &SuggestedParams,
    ) -> Transaction {
        Transaction {
            asset_receiver: Some(account),
            xfer_asset: asset_id.index(),
            tx_type: TxType::AssetTransfer,
            ..self.base(account, params, 0)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn method_call(
        &self,
        method: Method,
        sender: Address,
        asset_id: AssetId,
        params: &SuggestedParams,
        app_args: Vec<serde_bytes::ByteBuf>,
        foreign_assets: Vec<u64>,
        accounts: Vec<Address>,
    ) -> Transaction {
        Transaction {
            app_args,
            foreign_assets,
            accounts,
            boxes: vec![BoxReference::own(asset_id.to_key().to_vec())],
            app_id: self.app_id.index(),
            tx_type: TxType::AppCall,
            ..self.base(sender, params, method.inner_txn_budget())
        }
    }

    fn finish(
        &self,
        action: MarketAction,
        members: Vec<GroupMember>,
    ) -> CompositionResult<OperationGroup> {
        let group = OperationGroup::new(action, members)?;
        debug!(
            action = %action,
            members = group.len(),
            group_id = %group.group_id(),
            "Composed operation group"
        );
        Ok(group)
    }
}

fn ensure_listed(asset_id: AssetId, listing: &ListingState) -> CompositionResult<()> {
    match listing {
        ListingState::Absent => Err(CompositionError::UnknownListing { asset_id }),
        ListingState::Known(record) if record.asset_id != asset_id => {
            Err(CompositionError::UnknownListing { asset_id })
        }
        _ => Ok(()),
    }
}

fn validate_mint(request: &MintRequest) -> CompositionResult<()> {
    if request.total == 0 {
        return Err(CompositionError::InvalidAssetParams(
            "total supply must be positive".to_string(),
        ));
    }
    if request.decimals > 19 {
        return Err(CompositionError::InvalidAssetParams(format!(
            "decimals {} exceeds 19",
            request.decimals
        )));
    }
    if request.name.len() > MAX_ASSET_NAME_LEN {
        return Err(CompositionError::InvalidAssetParams(format!(
            "name is {} bytes (max {MAX_ASSET_NAME_LEN})",
            request.name.len()
        )));
    }
    if request.unit_name.len() > MAX_UNIT_NAME_LEN {
        return Err(CompositionError::InvalidAssetParams(format!(
            "unit name is {} bytes (max {MAX_UNIT_NAME_LEN})",
            request.unit_name.len()
        )));
    }
    if request.url.len() > MAX_ASSET_URL_LEN {
        return Err(CompositionError::InvalidAssetParams(format!(
            "url is {} bytes (max {MAX_ASSET_URL_LEN})",
            request.url.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Digest32;

    const APP: u64 = 1001;

    fn params() -> SuggestedParams {
        SuggestedParams {
            min_fee: 1000,
            last_round: 5000,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: Digest32([7u8; 32]),
        }
    }

    fn seller() -> SignedCredentialContext {
        SignedCredentialContext::standard(Address::new([1u8; 32]))
    }

    fn buyer() -> SignedCredentialContext {
        SignedCredentialContext::enclave(Address::new([2u8; 32]))
    }

    fn record() -> ListingRecord {
        ListingRecord {
            asset_id: AssetId::new(743543992),
            seller: seller().address,
            price: MicroAlgos::new(10_000_000),
            creator: seller().address,
            royalty_bps: 500,
        }
    }

    fn list_request() -> ListRequest {
        ListRequest {
            asset_id: AssetId::new(743543992),
            price: MicroAlgos::new(10_000_000),
            creator: seller().address,
            royalty_bps: 500,
        }
    }

    #[test]
    fn test_default_storage_cost() {
        let cost = StorageCostSchedule::default().listing_cost().unwrap();
        assert_eq!(cost, MicroAlgos::new(2_500 + 400 * 88 + 100_000));
    }

    #[test]
    fn test_list_group_layout() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_list(seller(), list_request(), &params())
            .unwrap();

        let roles: Vec<&str> = group.members().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["axfer", "mbr_pay", "method_call"]);

        let custody = AppId::new(APP).address();
        let transfer = &group.members()[0].txn;
        assert_eq!(transfer.tx_type, TxType::AssetTransfer);
        assert_eq!(transfer.xfer_asset, 743543992);
        assert_eq!(transfer.asset_amount, 1);
        assert_eq!(transfer.asset_receiver, Some(custody));

        let payment = &group.members()[1].txn;
        assert_eq!(payment.tx_type, TxType::Payment);
        assert_eq!(payment.receiver, Some(custody));
        assert_eq!(payment.amount, 137_700);

        let call = &group.members()[2].txn;
        assert_eq!(call.tx_type, TxType::AppCall);
        assert_eq!(call.app_id, APP);
        assert_eq!(call.app_args[0].as_slice(), Method::ListAsset.selector().as_slice());
        assert_eq!(call.app_args[2].as_slice(), &10_000_000u64.to_be_bytes());
        // creator == seller resolves to the sender slot
        assert_eq!(call.app_args[3].as_slice(), &[0u8]);
        assert_eq!(call.app_args[4].as_slice(), &500u64.to_be_bytes());
        assert_eq!(call.foreign_assets, vec![743543992]);
        assert_eq!(call.boxes, vec![BoxReference::own(AssetId::new(743543992).to_key().to_vec())]);
        assert_eq!(call.fee, 2000);

        assert_eq!(
            group.method_call().map(|(i, m, r)| (i, m, r.to_vec())),
            Some((2, Method::ListAsset, vec![0, 1]))
        );
        for member in group.members() {
            assert_eq!(member.signer, seller());
            assert_eq!(member.txn.group, Some(group.group_id()));
            assert_eq!(member.txn.first_valid, 5000);
            assert_eq!(member.txn.last_valid, 6000);
        }
    }

    #[test]
    fn test_list_rejects_zero_price_and_bad_royalty() {
        let composer = Composer::new(AppId::new(APP));
        let mut request = list_request();
        request.price = MicroAlgos::ZERO;
        assert_eq!(
            composer.compose_list(seller(), request, &params()).unwrap_err(),
            CompositionError::InvalidPrice
        );

        let mut request = list_request();
        request.royalty_bps = 10_001;
        assert_eq!(
            composer.compose_list(seller(), request, &params()).unwrap_err(),
            CompositionError::InvalidRoyalty { bps: 10_001 }
        );
    }

    #[test]
    fn test_configured_storage_cost_is_paid() {
        let schedule = StorageCostSchedule {
            asset_opt_in: 0,
            ..StorageCostSchedule::default()
        };
        let composer = Composer::new(AppId::new(APP)).with_storage_cost(schedule);
        let group = composer
            .compose_list(seller(), list_request(), &params())
            .unwrap();
        assert_eq!(group.members()[1].txn.amount, 37_700);
    }

    #[test]
    fn test_buy_group_layout() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_buy(
                buyer(),
                AssetId::new(743543992),
                MicroAlgos::new(10_000_000),
                ListingState::Known(record()),
                BuyOptions::default(),
                &params(),
            )
            .unwrap();

        assert_eq!(group.len(), 2);
        let payment = &group.members()[0].txn;
        assert_eq!(payment.amount, 10_000_000);
        assert_eq!(payment.receiver, Some(AppId::new(APP).address()));

        let call = &group.members()[1].txn;
        assert_eq!(call.app_args[0].as_slice(), Method::BuyAsset.selector().as_slice());
        assert_eq!(call.accounts, vec![seller().address]);
        assert_eq!(call.fee, 5000);
        assert_eq!(
            group.method_call().map(|(_, _, r)| r.to_vec()),
            Some(vec![0])
        );
        assert!(group.members().iter().all(|m| m.signer == buyer()));
    }

    #[test]
    fn test_buy_with_opt_in_keeps_binding() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_buy(
                buyer(),
                AssetId::new(743543992),
                MicroAlgos::new(10_000_000),
                ListingState::Unknown,
                BuyOptions { opt_in: true },
                &params(),
            )
            .unwrap();

        let roles: Vec<&str> = group.members().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["opt_in", "pay", "method_call"]);
        let opt_in = &group.members()[0].txn;
        assert_eq!(opt_in.asset_receiver, Some(buyer().address));
        assert_eq!(opt_in.asset_amount, 0);
        assert_eq!(
            group.method_call().map(|(_, _, r)| r.to_vec()),
            Some(vec![1])
        );
    }

    #[test]
    fn test_buy_without_listing_state_references_no_payees() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_buy(
                buyer(),
                AssetId::new(743543992),
                MicroAlgos::new(10_000_000),
                ListingState::Unknown,
                BuyOptions::default(),
                &params(),
            )
            .unwrap();
        assert!(group.members()[1].txn.accounts.is_empty());

        let mut other = record();
        other.creator = Address::new([6u8; 32]);
        let group = composer
            .compose_buy(
                buyer(),
                AssetId::new(743543992),
                MicroAlgos::new(10_000_000),
                ListingState::Known(other),
                BuyOptions::default(),
                &params(),
            )
            .unwrap();
        assert_eq!(
            group.members()[1].txn.accounts,
            vec![other.seller, other.creator]
        );
    }

    #[test]
    fn test_buy_fails_fast() {
        let composer = Composer::new(AppId::new(APP));
        assert_eq!(
            composer
                .compose_buy(
                    buyer(),
                    AssetId::new(9),
                    MicroAlgos::new(1),
                    ListingState::Absent,
                    BuyOptions::default(),
                    &params(),
                )
                .unwrap_err(),
            CompositionError::UnknownListing {
                asset_id: AssetId::new(9)
            }
        );
        assert_eq!(
            composer
                .compose_buy(
                    buyer(),
                    AssetId::new(9),
                    MicroAlgos::ZERO,
                    ListingState::Unknown,
                    BuyOptions::default(),
                    &params(),
                )
                .unwrap_err(),
            CompositionError::InvalidPrice
        );
    }

    #[test]
    fn test_buy_price_mismatch_still_composes() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_buy(
                buyer(),
                AssetId::new(743543992),
                MicroAlgos::new(1),
                ListingState::Known(record()),
                BuyOptions::default(),
                &params(),
            )
            .unwrap();
        assert_eq!(group.members()[0].txn.amount, 1);
    }

    #[test]
    fn test_cancel_by_non_seller_still_composes() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_cancel(
                buyer(),
                AssetId::new(743543992),
                ListingState::Known(record()),
                &params(),
            )
            .unwrap();
        assert_eq!(group.len(), 1);
        let call = &group.members()[0].txn;
        assert_eq!(call.sender, buyer().address);
        assert_eq!(call.group, None);
        assert_eq!(call.fee, 3000);
        assert_eq!(
            call.app_args[0].as_slice(),
            Method::CancelListing.selector().as_slice()
        );
    }

    #[test]
    fn test_cancel_absent_listing() {
        let composer = Composer::new(AppId::new(APP));
        assert!(matches!(
            composer.compose_cancel(seller(), AssetId::new(5), ListingState::Absent, &params()),
            Err(CompositionError::UnknownListing { .. })
        ));
    }

    #[test]
    fn test_mint_note_and_params() {
        let composer = Composer::new(AppId::new(APP));
        let request = MintRequest {
            name: "Sunset".to_string(),
            unit_name: "OMNI".to_string(),
            url: "ipfs://bafy".to_string(),
            total: 1000,
            decimals: 0,
            metadata: serde_json::json!({"description": "a sunset", "mime_type": "image/png"}),
        };
        let group = composer.compose_mint(seller(), &request, &params()).unwrap();
        let create = &group.members()[0].txn;
        assert_eq!(create.tx_type, TxType::AssetConfig);

        let asset = create.asset_params.as_ref().unwrap();
        assert_eq!(asset.total, 1000);
        assert_eq!(asset.manager, Some(seller().address));
        assert_eq!(asset.clawback, Some(seller().address));

        let note: serde_json::Value = serde_json::from_slice(&create.note).unwrap();
        assert_eq!(note["standard"], "arc69");
        assert_eq!(note["description"], "a sunset");
    }

    #[test]
    fn test_mint_validation() {
        let composer = Composer::new(AppId::new(APP));
        let base = MintRequest {
            name: "x".to_string(),
            unit_name: "X".to_string(),
            url: String::new(),
            total: 1,
            decimals: 0,
            metadata: serde_json::Value::Null,
        };

        let zero = MintRequest { total: 0, ..base.clone() };
        assert!(matches!(
            composer.compose_mint(seller(), &zero, &params()),
            Err(CompositionError::InvalidAssetParams(_))
        ));

        let long_unit = MintRequest {
            unit_name: "TOOLONGUNIT".to_string(),
            ..base.clone()
        };
        assert!(composer.compose_mint(seller(), &long_unit, &params()).is_err());

        let big_note = MintRequest {
            metadata: serde_json::json!({"description": "x".repeat(2000)}),
            ..base
        };
        assert!(matches!(
            composer.compose_mint(seller(), &big_note, &params()),
            Err(CompositionError::NoteTooLarge { .. })
        ));
    }

    #[test]
    fn test_withdraw() {
        let composer = Composer::new(AppId::new(APP));
        let group = composer
            .compose_withdraw(seller(), MicroAlgos::new(500_000), &params())
            .unwrap();
        let call = &group.members()[0].txn;
        assert_eq!(call.app_args[1].as_slice(), &500_000u64.to_be_bytes());
        assert!(call.boxes.is_empty());
        assert!(composer
            .compose_withdraw(seller(), MicroAlgos::ZERO, &params())
            .is_err());
    }
}
