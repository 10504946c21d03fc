//! In-memory ledger and key-holding backends for end-to-end tests.
//!
//! `SimLedger` plays node, contract and registry at once: it verifies every
//! signature, checks group binding, applies a group atomically against the
//! marketplace rules and confirms it one round later.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use omni_client::{MarketConfig, MarketplaceClient};
use omni_core::{Address, AppId, AssetId, ListingRecord};
use omni_executor::{
    BackendError, EnclaveBackend, EnclaveSignItem, LedgerClient, LedgerError, SignerRegistry,
    StandardBackend, SubmitError,
};
use omni_registry::{
    AssetInfo, AssetInfoSource, BoxFuture, LookupError, NodeStatus, PendingTransaction,
    RegistryError, RegistryResult, RegistrySource,
};
use omni_txn::{
    compute_group_id, Digest32, Method, SignedTransaction, StorageCostSchedule, SuggestedParams,
    Transaction, TxId, TxType,
};
use parking_lot::Mutex;

pub const APP_ID: u64 = 743500000;
pub const START_ROUND: u64 = 40_000;
pub const MIN_FEE: u64 = 1000;

pub fn keypair(seed: u8) -> (SigningKey, Address) {
    let key = SigningKey::from_bytes(&[seed; 32]);
    let address = Address::new(key.verifying_key().to_bytes());
    (key, address)
}

// =============================================================================
// Ledger simulator
// =============================================================================

#[derive(Debug, Clone, Default)]
struct State {
    round: u64,
    boxes: BTreeMap<Vec<u8>, Vec<u8>>,
    holdings: HashMap<(Address, u64), u64>,
    assets: HashMap<u64, AssetInfo>,
    next_asset: u64,
    /// Accepted groups by lead transaction id, with their confirmation round.
    pending: HashMap<TxId, u64>,
    withdrawn: u64,
}

#[derive(Debug, Default)]
struct Faults {
    drop_next_response: bool,
    stall: bool,
    unreadable: Vec<Vec<u8>>,
}

pub struct SimLedger {
    app_id: AppId,
    custody: Address,
    admin: Address,
    storage_cost: u64,
    state: Mutex<State>,
    faults: Mutex<Faults>,
    submissions: Mutex<usize>,
}

impl SimLedger {
    pub fn new(admin: Address) -> Self {
        let app_id = AppId::new(APP_ID);
        let storage_cost = StorageCostSchedule::default()
            .listing_cost()
            .map(|c| c.get())
            .unwrap_or_default();
        Self {
            app_id,
            custody: app_id.address(),
            admin,
            storage_cost,
            state: Mutex::new(State {
                round: START_ROUND,
                next_asset: 900_000_000,
                ..State::default()
            }),
            faults: Mutex::new(Faults::default()),
            submissions: Mutex::new(0),
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn round(&self) -> u64 {
        self.state.lock().round
    }

    pub fn submissions(&self) -> usize {
        *self.submissions.lock()
    }

    /// Give `owner` units of an existing asset (opting it in).
    pub fn fund_asset(&self, owner: Address, asset_id: AssetId, amount: u64) {
        *self
            .state
            .lock()
            .holdings
            .entry((owner, asset_id.index()))
            .or_insert(0) += amount;
    }

    pub fn holding(&self, owner: Address, asset_id: AssetId) -> Option<u64> {
        self.state
            .lock()
            .holdings
            .get(&(owner, asset_id.index()))
            .copied()
    }

    pub fn register_asset(&self, asset_id: AssetId, name: &str, unit_name: &str) {
        self.state.lock().assets.insert(
            asset_id.index(),
            AssetInfo {
                name: name.to_string(),
                unit_name: unit_name.to_string(),
            },
        );
    }

    pub fn listing(&self, asset_id: AssetId) -> Option<ListingRecord> {
        let state = self.state.lock();
        let value = state.boxes.get(asset_id.to_key().as_slice())?;
        ListingRecord::decode(asset_id, value).ok()
    }

    /// Write a registry entry directly, bypassing the contract.
    pub fn put_raw_entry(&self, key: Vec<u8>, value: Vec<u8>) {
        self.state.lock().boxes.insert(key, value);
    }

    pub fn set_unreadable(&self, key: Vec<u8>) {
        self.faults.lock().unreadable.push(key);
    }

    /// Apply the next accepted group but lose the node's answer.
    pub fn drop_next_response(&self) {
        self.faults.lock().drop_next_response = true;
    }

    /// Accept groups without ever confirming them.
    pub fn stall_confirmations(&self, stall: bool) {
        self.faults.lock().stall = stall;
    }

    pub fn withdrawn(&self) -> u64 {
        self.state.lock().withdrawn
    }

    fn params(&self) -> SuggestedParams {
        SuggestedParams {
            min_fee: MIN_FEE,
            last_round: self.round(),
            genesis_id: "simnet-v1".to_string(),
            genesis_hash: Digest32([7u8; 32]),
        }
    }

    fn submit(&self, bytes: &[u8]) -> Result<TxId, String> {
        let group = SignedTransaction::decode_group(bytes).map_err(|e| e.to_string())?;
        if group.is_empty() {
            return Err("empty group".to_string());
        }
        check_binding(&group)?;
        for (i, stxn) in group.iter().enumerate() {
            verify_signature(stxn).map_err(|e| format!("member {i}: {e}"))?;
        }
        let lead = group[0].txn.tx_id().map_err(|e| e.to_string())?;
        let stall = self.faults.lock().stall;

        let mut state = self.state.lock();
        if state.pending.contains_key(&lead) {
            return Err(format!("transaction already in ledger: {lead}"));
        }
        let mut next = state.clone();
        self.check_fees(&group)?;
        for i in 0..group.len() {
            self.apply(&mut next, &group, i)
                .map_err(|e| format!("logic eval error: member {i}: {e}"))?;
        }
        let confirm_at = if stall { u64::MAX } else { next.round + 1 };
        next.pending.insert(lead, confirm_at);
        *state = next;
        Ok(lead)
    }

    fn check_fees(&self, group: &[SignedTransaction]) -> Result<(), String> {
        let mut required = 0;
        let mut paid = 0;
        for stxn in group {
            required += MIN_FEE;
            paid += stxn.txn.fee;
            if stxn.txn.tx_type == TxType::AppCall {
                let method = stxn
                    .txn
                    .app_args
                    .first()
                    .and_then(|s| Method::from_selector(s))
                    .ok_or("unknown method selector")?;
                required += MIN_FEE * method.inner_txn_budget();
            }
        }
        if paid < required {
            return Err(format!("fee too small: paid {paid}, need {required}"));
        }
        Ok(())
    }

    fn apply(
        &self,
        state: &mut State,
        group: &[SignedTransaction],
        i: usize,
    ) -> Result<(), String> {
        let txn = &group[i].txn;
        if state.round < txn.first_valid || state.round > txn.last_valid {
            return Err("txn dead: round outside validity window".to_string());
        }
        match txn.tx_type {
            TxType::Payment => {
                txn.receiver.ok_or("payment without receiver")?;
                Ok(())
            }
            TxType::AssetTransfer => {
                let receiver = txn.asset_receiver.unwrap_or(txn.sender);
                transfer(
                    state,
                    txn.xfer_asset,
                    txn.sender,
                    receiver,
                    txn.asset_amount,
                    self.custody,
                )
            }
            TxType::AssetConfig => {
                let params = txn.asset_params.as_ref().ok_or("asset config without params")?;
                let id = state.next_asset;
                state.next_asset += 1;
                state.holdings.insert((txn.sender, id), params.total);
                state.assets.insert(
                    id,
                    AssetInfo {
                        name: params.name.clone(),
                        unit_name: params.unit_name.clone(),
                    },
                );
                Ok(())
            }
            TxType::AppCall => self.call(state, group, i),
        }
    }

    fn call(&self, state: &mut State, group: &[SignedTransaction], i: usize) -> Result<(), String> {
        let txn = &group[i].txn;
        if txn.app_id != self.app_id.index() {
            return Err("call to a different application".to_string());
        }
        let method = txn
            .app_args
            .first()
            .and_then(|s| Method::from_selector(s))
            .ok_or("unknown method selector")?;
        let preceding = |back: usize| -> Result<&Transaction, String> {
            i.checked_sub(back)
                .map(|j| &group[j].txn)
                .ok_or_else(|| format!("{method} is missing a transaction argument"))
        };

        match method {
            Method::ListAsset => {
                let asset = arg_asset(txn, 1)?;
                let price = arg_u64(txn, 2)?;
                let creator = arg_account(txn, 3)?;
                let royalty_bps = arg_u64(txn, 4)?;
                let key = require_box(txn, asset)?;
                let transfer = preceding(2)?;
                let payment = preceding(1)?;
                if transfer.tx_type != TxType::AssetTransfer
                    || transfer.asset_receiver != Some(self.custody)
                    || transfer.asset_amount != 1
                    || transfer.xfer_asset != asset
                {
                    return Err("asset must be escrowed with the listing".to_string());
                }
                if payment.tx_type != TxType::Payment
                    || payment.receiver != Some(self.custody)
                    || payment.amount < self.storage_cost
                {
                    return Err("storage payment missing or too small".to_string());
                }
                if price == 0 {
                    return Err("price must be positive".to_string());
                }
                if state.boxes.contains_key(&key) {
                    return Err("asset already listed".to_string());
                }
                let record = ListingRecord {
                    asset_id: AssetId::new(asset),
                    seller: txn.sender,
                    price: omni_core::MicroAlgos::new(price),
                    creator,
                    royalty_bps,
                };
                state.boxes.insert(key, record.encode().to_vec());
                Ok(())
            }
            Method::BuyAsset => {
                let asset = arg_asset(txn, 1)?;
                let key = require_box(txn, asset)?;
                let record = stored_record(state, &key, asset)?;
                let payment = preceding(1)?;
                if payment.tx_type != TxType::Payment
                    || payment.receiver != Some(self.custody)
                    || payment.sender != txn.sender
                    || payment.amount != record.price.get()
                {
                    return Err("payment does not match the listing price".to_string());
                }
                if !state.holdings.contains_key(&(txn.sender, asset)) {
                    return Err("buyer is not opted in to the asset".to_string());
                }
                transfer(state, asset, self.custody, txn.sender, 1, self.custody)?;
                state.boxes.remove(&key);
                Ok(())
            }
            Method::CancelListing => {
                let asset = arg_asset(txn, 1)?;
                let key = require_box(txn, asset)?;
                let record = stored_record(state, &key, asset)?;
                if record.seller != txn.sender {
                    return Err("only the seller can cancel".to_string());
                }
                state.holdings.entry((record.seller, asset)).or_insert(0);
                transfer(state, asset, self.custody, record.seller, 1, self.custody)?;
                state.boxes.remove(&key);
                Ok(())
            }
            Method::AdminWithdraw => {
                let amount = arg_u64(txn, 1)?;
                if txn.sender != self.admin {
                    return Err("unauthorized".to_string());
                }
                state.withdrawn += amount;
                Ok(())
            }
        }
    }
}

fn transfer(
    state: &mut State,
    asset: u64,
    from: Address,
    to: Address,
    amount: u64,
    custody: Address,
) -> Result<(), String> {
    if amount == 0 {
        if from == to {
            state.holdings.entry((to, asset)).or_insert(0);
            return Ok(());
        }
        return Err("zero transfer to another account".to_string());
    }
    if to != custody && !state.holdings.contains_key(&(to, asset)) {
        return Err("receiver is not opted in".to_string());
    }
    let balance = state.holdings.entry((from, asset)).or_insert(0);
    if *balance < amount {
        return Err(format!("underflow on asset {asset}"));
    }
    *balance -= amount;
    *state.holdings.entry((to, asset)).or_insert(0) += amount;
    Ok(())
}

fn stored_record(state: &State, key: &[u8], asset: u64) -> Result<ListingRecord, String> {
    let value = state.boxes.get(key).ok_or("listing not found")?;
    ListingRecord::decode(AssetId::new(asset), value).map_err(|e| e.to_string())
}

fn require_box(txn: &Transaction, asset: u64) -> Result<Vec<u8>, String> {
    let key = AssetId::new(asset).to_key().to_vec();
    if txn.boxes.iter().any(|b| b.app_index == 0 && b.name == key) {
        Ok(key)
    } else {
        Err("listing box not referenced".to_string())
    }
}

fn arg_bytes(txn: &Transaction, i: usize) -> Result<&[u8], String> {
    txn.app_args
        .get(i)
        .map(|a| a.as_slice())
        .ok_or_else(|| format!("missing argument {i}"))
}

fn arg_u64(txn: &Transaction, i: usize) -> Result<u64, String> {
    let bytes: [u8; 8] = arg_bytes(txn, i)?
        .try_into()
        .map_err(|_| format!("argument {i} is not a uint64"))?;
    Ok(u64::from_be_bytes(bytes))
}

fn arg_asset(txn: &Transaction, i: usize) -> Result<u64, String> {
    let index = *arg_bytes(txn, i)?.first().ok_or("empty asset argument")?;
    txn.foreign_assets
        .get(index as usize)
        .copied()
        .ok_or_else(|| format!("asset index {index} out of range"))
}

fn arg_account(txn: &Transaction, i: usize) -> Result<Address, String> {
    let index = *arg_bytes(txn, i)?.first().ok_or("empty account argument")? as usize;
    if index == 0 {
        return Ok(txn.sender);
    }
    txn.accounts
        .get(index - 1)
        .copied()
        .ok_or_else(|| format!("account index {index} out of range"))
}

fn check_binding(group: &[SignedTransaction]) -> Result<(), String> {
    if group.len() == 1 {
        return Ok(());
    }
    let ids = group
        .iter()
        .map(|s| {
            let mut txn = s.txn.clone();
            txn.group = None;
            txn.tx_id()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    let expected = compute_group_id(&ids).map_err(|e| e.to_string())?;
    if group.iter().all(|s| s.txn.group == Some(expected)) {
        Ok(())
    } else {
        Err("incomplete group".to_string())
    }
}

fn verify_signature(stxn: &SignedTransaction) -> Result<(), String> {
    let key = VerifyingKey::from_bytes(stxn.txn.sender.as_bytes()).map_err(|e| e.to_string())?;
    let signature = Signature::from_slice(&stxn.signature).map_err(|e| e.to_string())?;
    let message = stxn.txn.bytes_to_sign().map_err(|e| e.to_string())?;
    key.verify(&message, &signature)
        .map_err(|_| "invalid signature".to_string())
}

impl LedgerClient for SimLedger {
    fn suggested_params(&self) -> BoxFuture<'_, Result<SuggestedParams, LedgerError>> {
        Box::pin(async move { Ok(self.params()) })
    }

    fn send_raw_group(&self, signed_group: Vec<u8>) -> BoxFuture<'_, Result<TxId, SubmitError>> {
        Box::pin(async move {
            *self.submissions.lock() += 1;
            let result = self.submit(&signed_group).map_err(SubmitError::Rejected);
            let mut faults = self.faults.lock();
            if result.is_ok() && faults.drop_next_response {
                faults.drop_next_response = false;
                return Err(SubmitError::Transport("connection reset by peer".to_string()));
            }
            result
        })
    }

    fn pending_status(
        &self,
        tx_id: TxId,
    ) -> BoxFuture<'_, Result<PendingTransaction, LedgerError>> {
        Box::pin(async move {
            let state = self.state.lock();
            match state.pending.get(&tx_id) {
                Some(&at) if at <= state.round => Ok(PendingTransaction {
                    confirmed_round: Some(at),
                    pool_error: String::new(),
                }),
                Some(_) => Ok(PendingTransaction::default()),
                None => Err(LedgerError(format!("transaction {tx_id} not found"))),
            }
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move {
            Ok(NodeStatus {
                last_round: self.round(),
            })
        })
    }

    fn wait_for_block_after(&self, round: u64) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.round = state.round.max(round + 1);
            Ok(NodeStatus {
                last_round: state.round,
            })
        })
    }
}

impl RegistrySource for SimLedger {
    fn list_keys(&self) -> BoxFuture<'_, RegistryResult<Vec<Vec<u8>>>> {
        Box::pin(async move { Ok(self.state.lock().boxes.keys().cloned().collect()) })
    }

    fn fetch_value<'a>(&'a self, key: &'a [u8]) -> BoxFuture<'a, RegistryResult<Vec<u8>>> {
        Box::pin(async move {
            if self.faults.lock().unreadable.iter().any(|k| k == key) {
                return Err(RegistryError::Http {
                    status: 500,
                    message: "box read failed".to_string(),
                });
            }
            self.state
                .lock()
                .boxes
                .get(key)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound("box not found".to_string()))
        })
    }
}

impl AssetInfoSource for SimLedger {
    fn get_asset_info(&self, asset_id: AssetId) -> BoxFuture<'_, Result<AssetInfo, LookupError>> {
        Box::pin(async move {
            self.state
                .lock()
                .assets
                .get(&asset_id.index())
                .cloned()
                .ok_or(LookupError::NotFound(asset_id))
        })
    }
}

// =============================================================================
// Signing backends
// =============================================================================

/// Wallet holding ed25519 keys for several accounts.
#[derive(Default)]
pub struct KeyWallet {
    keys: Mutex<HashMap<Address, SigningKey>>,
    refuse: Mutex<bool>,
}

impl KeyWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Address, key: SigningKey) {
        self.keys.lock().insert(address, key);
    }

    /// Decline every request from now on.
    pub fn refuse_all(&self, refuse: bool) {
        *self.refuse.lock() = refuse;
    }
}

impl StandardBackend for KeyWallet {
    fn sign<'a>(
        &'a self,
        transactions: &'a [Transaction],
        indexes: &'a [usize],
    ) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>, BackendError>> {
        Box::pin(async move {
            if *self.refuse.lock() {
                return Ok(vec![None; indexes.len()]);
            }
            let keys = self.keys.lock();
            indexes
                .iter()
                .map(|&i| -> Result<Option<Vec<u8>>, BackendError> {
                    let txn = &transactions[i];
                    let Some(key) = keys.get(&txn.sender) else {
                        return Ok(None);
                    };
                    sign_encoded(key, txn).map(Some)
                })
                .collect()
        })
    }
}

/// Enclave-style backend with a single key.
pub struct EnclaveKey {
    key: SigningKey,
}

impl EnclaveKey {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }
}

impl EnclaveBackend for EnclaveKey {
    fn sign(
        &self,
        items: Vec<EnclaveSignItem>,
    ) -> BoxFuture<'_, Result<Vec<Option<String>>, BackendError>> {
        Box::pin(async move {
            items
                .iter()
                .map(|item| -> Result<Option<String>, BackendError> {
                    if !item.is_required() {
                        return Ok(None);
                    }
                    let raw = BASE64
                        .decode(&item.txn)
                        .map_err(|e| BackendError(e.to_string()))?;
                    let txn = Transaction::decode(&raw).map_err(|e| BackendError(e.to_string()))?;
                    Ok(Some(BASE64.encode(sign_encoded(&self.key, &txn)?)))
                })
                .collect()
        })
    }
}

fn sign_encoded(key: &SigningKey, txn: &Transaction) -> Result<Vec<u8>, BackendError> {
    let message = txn.bytes_to_sign().map_err(|e| BackendError(e.to_string()))?;
    let signature = key.sign(&message);
    SignedTransaction::new(txn.clone(), signature.to_bytes().to_vec())
        .encode()
        .map_err(|e| BackendError(e.to_string()))
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub ledger: Arc<SimLedger>,
    pub wallet: Arc<KeyWallet>,
    pub signers: Arc<SignerRegistry>,
    pub client: MarketplaceClient,
    pub seller: Address,
    pub buyer: Address,
    pub rival: Address,
    pub admin: Address,
}

pub fn harness() -> Harness {
    let (seller_key, seller) = keypair(1);
    let (buyer_key, buyer) = keypair(2);
    let (rival_key, rival) = keypair(3);
    let (admin_key, admin) = keypair(9);

    let ledger = Arc::new(SimLedger::new(admin));
    let wallet = Arc::new(KeyWallet::new());
    let signers = Arc::new(SignerRegistry::new());
    for (key, address) in [
        (seller_key, seller),
        (buyer_key, buyer),
        (rival_key, rival),
        (admin_key, admin),
    ] {
        wallet.insert(address, key);
        signers.associate_standard(address, wallet.clone());
    }

    let config = MarketConfig {
        app_id: APP_ID,
        ..MarketConfig::default()
    };
    let client = MarketplaceClient::with_parts(
        config,
        ledger.clone(),
        ledger.clone(),
        ledger.clone(),
        signers.clone(),
    )
    .expect("valid config");

    Harness {
        ledger,
        wallet,
        signers,
        client,
        seller,
        buyer,
        rival,
        admin,
    }
}
